//! Contract tests for the EODData remote source
//!
//! A canned HTTP transport stands in for the web service so the tests can
//! check the exact requests sent and how each response shape is mapped.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use eodfeed_core::{
    Credentials, EodDataClient, Error, HttpClient, HttpError, HttpRequest, HttpResponse, Period,
    RemoteSource,
};

const LOGIN_OK: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<LOGINRESPONSE xmlns="http://ws.eoddata.com/Data" Source="Data.asmx" Message="Login successful" Token="TOKEN-1" />"#;

const EXCHANGES: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<RESPONSE xmlns="http://ws.eoddata.com/Data" Source="Data.asmx" Message="Success">
  <EXCHANGES>
    <EXCHANGE Code="NYSE" Name="New York Stock Exchange" LastTradeDateTime="2024-06-10T16:00:00" Country="US" Currency="USD" Advances="1650" Declines="1320" Suffix="" TimeZone="Eastern Standard Time" IsIntraday="true" IntradayStartDate="2008-01-02T00:00:00" />
    <EXCHANGE Code="LSE" Name="London Stock Exchange" LastTradeDateTime="2024-06-10T16:30:00" Country="GB" Currency="GBP" Advances="0" Declines="0" Suffix=".L" TimeZone="GMT Standard Time" IsIntraday="false" />
  </EXCHANGES>
</RESPONSE>"#;

const QUOTES: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<RESPONSE xmlns="http://ws.eoddata.com/Data" Source="Data.asmx" Message="Success">
  <QUOTES>
    <QUOTE Symbol="ABC" DateTime="2024-01-02T00:00:00" Open="10.5" High="11.25" Low="10.0" Close="11.0" Volume="120000" OpenInterest="0" />
    <QUOTE Symbol="ABC" DateTime="2024-01-03T00:00:00" Open="11.0" High="11.5" Low="10.75" Close="11.2" Volume="98000" />
  </QUOTES>
</RESPONSE>"#;

/// Canned transport keyed by the service method at the end of the URL.
#[derive(Default)]
struct CannedHttp {
    responses: BTreeMap<String, Result<HttpResponse, HttpError>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl CannedHttp {
    fn respond(mut self, method: &str, body: &str) -> Self {
        self.responses
            .insert(method.to_owned(), Ok(HttpResponse::ok(body)));
        self
    }

    fn respond_with(mut self, method: &str, response: Result<HttpResponse, HttpError>) -> Self {
        self.responses.insert(method.to_owned(), response);
        self
    }

    fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().expect("request log").clone()
    }

    fn calls_to(&self, method: &str) -> Vec<HttpRequest> {
        self.requests()
            .into_iter()
            .filter(|request| request.url.ends_with(&format!("/{method}")))
            .collect()
    }
}

impl HttpClient for CannedHttp {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        let method = request
            .url
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_owned();
        self.requests.lock().expect("request log").push(request);
        self.responses
            .get(&method)
            .cloned()
            .unwrap_or_else(|| Err(HttpError::new(format!("no canned response for {method}"))))
    }
}

fn client(http: CannedHttp) -> (EodDataClient<Arc<CannedHttp>>, Arc<CannedHttp>) {
    let http = Arc::new(http);
    let client = EodDataClient::with_http_client(
        Arc::clone(&http),
        Credentials::new("member", "s3cret"),
    )
    .with_base_url("http://eoddata.test/data.asmx/");
    (client, http)
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

// =============================================================================
// Session
// =============================================================================

#[test]
fn when_several_calls_are_made_then_login_happens_once_and_token_is_reused() {
    // Given: A service that accepts the login
    let (client, http) = client(
        CannedHttp::default()
            .respond("Login", LOGIN_OK)
            .respond("ExchangeList", EXCHANGES),
    );

    // When: Exchanges are listed twice
    let first = client.exchanges().expect("first");
    let second = client.exchanges().expect("second");

    // Then: One login carried the credentials; both calls carried the token
    assert_eq!(first, second);
    let logins = http.calls_to("Login");
    assert_eq!(logins.len(), 1);
    assert_eq!(logins[0].url, "http://eoddata.test/data.asmx/Login");
    assert_eq!(logins[0].query_value("Username"), Some("member"));
    assert_eq!(logins[0].query_value("Password"), Some("s3cret"));
    let listings = http.calls_to("ExchangeList");
    assert_eq!(listings.len(), 2);
    assert!(listings
        .iter()
        .all(|request| request.query_value("Token") == Some("TOKEN-1")));
    assert!(client.session().is_authenticated());
}

#[test]
fn when_credentials_are_rejected_then_authentication_error_carries_raw_body() {
    // Given: A service that rejects the login
    let rejected = r#"<LOGINRESPONSE Message="Invalid username or password" Token="" />"#;
    let (client, http) = client(CannedHttp::default().respond("Login", rejected));

    // When: Any call is made
    let error = client.exchanges().expect_err("login should fail");

    // Then: The failure is an authentication error with the vendor message
    match &error {
        Error::Authentication { message, raw } => {
            assert_eq!(message, "Invalid username or password");
            assert_eq!(raw.as_deref(), Some(rejected));
        }
        other => panic!("expected Authentication, got {other:?}"),
    }
    assert!(http.calls_to("ExchangeList").is_empty());
    assert!(!client.session().is_authenticated());
}

#[test]
fn when_credentials_debug_printed_then_password_is_redacted() {
    let credentials = Credentials::new("member", "s3cret");
    let printed = format!("{credentials:?}");

    assert!(!printed.contains("s3cret"));
}

// =============================================================================
// Parsing
// =============================================================================

#[test]
fn when_exchange_list_is_returned_then_records_are_mapped() {
    // Given: A service with two exchanges
    let (client, _http) = client(
        CannedHttp::default()
            .respond("Login", LOGIN_OK)
            .respond("ExchangeList", EXCHANGES),
    );

    // When: Exchanges are listed
    let exchanges = client.exchanges().expect("exchanges");

    // Then: Typed fields are filled and empty attributes become None
    assert_eq!(exchanges.len(), 2);
    let nyse = &exchanges[0];
    assert_eq!(nyse.code, "NYSE");
    assert_eq!(nyse.timezone, "Eastern Standard Time");
    assert!(nyse.is_intraday);
    assert_eq!(nyse.suffix, None);
    assert_eq!(nyse.advances, Some(1650));
    assert_eq!(
        nyse.last_trade,
        date(2024, 6, 10).and_hms_opt(16, 0, 0)
    );
    assert_eq!(exchanges[1].suffix.as_deref(), Some(".L"));
}

#[test]
fn when_quotes_are_returned_then_bars_are_mapped() {
    // Given: A service with two quotes
    let (client, _http) = client(
        CannedHttp::default()
            .respond("Login", LOGIN_OK)
            .respond("SymbolHistoryPeriodByDateRange", QUOTES),
    );

    // When: History is fetched
    let bars = client
        .history("NYSE", "ABC", date(2024, 1, 1), Some(date(2024, 1, 3)), Period::Daily)
        .expect("history");

    // Then: Values and the optional open interest are mapped
    assert_eq!(bars.len(), 2);
    assert_eq!(bars[0].close, 11.0);
    assert_eq!(bars[0].volume, 120_000);
    assert_eq!(bars[0].open_interest, Some(0));
    assert_eq!(bars[1].open_interest, None);
    assert_eq!(bars[1].date_time, date(2024, 1, 3).and_hms_opt(0, 0, 0).expect("time"));
}

// =============================================================================
// Request shape
// =============================================================================

#[test]
fn when_end_is_given_then_date_range_method_is_called_with_vendor_dates() {
    // Given: A logged-in client
    let (client, http) = client(
        CannedHttp::default()
            .respond("Login", LOGIN_OK)
            .respond("SymbolHistoryPeriodByDateRange", QUOTES),
    );

    // When: A bounded weekly window is requested
    client
        .history("NYSE", "ABC", date(2024, 1, 1), Some(date(2024, 3, 31)), Period::Weekly)
        .expect("history");

    // Then: Parameters follow the vendor's names and formats
    let calls = http.calls_to("SymbolHistoryPeriodByDateRange");
    assert_eq!(calls.len(), 1);
    let request = &calls[0];
    assert_eq!(request.query_value("Token"), Some("TOKEN-1"));
    assert_eq!(request.query_value("Exchange"), Some("NYSE"));
    assert_eq!(request.query_value("Symbol"), Some("ABC"));
    assert_eq!(request.query_value("StartDate"), Some("20240101"));
    assert_eq!(request.query_value("EndDate"), Some("20240331"));
    assert_eq!(request.query_value("Period"), Some("w"));
}

#[test]
fn when_end_is_open_then_single_date_method_is_called() {
    // Given: A logged-in client
    let (client, http) = client(
        CannedHttp::default()
            .respond("Login", LOGIN_OK)
            .respond("SymbolHistoryPeriod", QUOTES),
    );

    // When: An open-ended hourly window is requested
    client
        .history("NYSE", "ABC", date(2024, 1, 2), None, Period::Hourly)
        .expect("history");

    // Then: The start is sent as Date and no end is sent
    let calls = http.calls_to("SymbolHistoryPeriod");
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].query_value("Date"), Some("20240102"));
    assert_eq!(calls[0].query_value("EndDate"), None);
    assert_eq!(calls[0].query_value("Period"), Some("h"));
    assert!(http.calls_to("SymbolHistoryPeriodByDateRange").is_empty());
}

// =============================================================================
// Failures
// =============================================================================

#[test]
fn when_call_reports_failure_then_remote_error_carries_raw_body() {
    // Given: A service that rejects the symbol list
    let failed = r#"<RESPONSE Message="Invalid Exchange Code" />"#;
    let (client, _http) = client(
        CannedHttp::default()
            .respond("Login", LOGIN_OK)
            .respond("SymbolList", failed),
    );

    // When: Symbols are listed
    let error = client.symbols("XXXX").expect_err("should fail");

    // Then: The vendor message and body are kept
    match &error {
        Error::RemoteRequest { method, message, .. } => {
            assert_eq!(method, "SymbolList");
            assert_eq!(message, "Invalid Exchange Code");
        }
        other => panic!("expected RemoteRequest, got {other:?}"),
    }
    assert_eq!(error.raw_response(), Some(failed));
}

#[test]
fn when_http_status_is_not_success_then_remote_error_names_the_status() {
    // Given: A service answering 500
    let (client, http) = client(
        CannedHttp::default()
            .respond("Login", LOGIN_OK)
            .respond_with(
                "ExchangeList",
                Ok(HttpResponse {
                    status: 500,
                    body: String::from("Internal Server Error"),
                }),
            ),
    );

    // When: Exchanges are listed
    let error = client.exchanges().expect_err("should fail");

    // Then: The status is reported with the body, and there is no retry
    assert!(matches!(
        &error,
        Error::RemoteRequest { message, .. } if message == "HTTP status 500"
    ));
    assert_eq!(error.raw_response(), Some("Internal Server Error"));
    assert_eq!(http.calls_to("ExchangeList").len(), 1);
}

#[test]
fn when_transport_fails_then_remote_error_is_returned() {
    // Given: A transport that cannot reach the service
    let (client, _http) = client(CannedHttp::default().respond_with(
        "Login",
        Err(HttpError::new("connection refused")),
    ));

    // When: Any call is made
    let error = client.exchanges().expect_err("should fail");

    // Then: The transport message is surfaced without a raw body
    assert!(matches!(
        &error,
        Error::RemoteRequest { message, raw: None, .. } if message == "connection refused"
    ));
}
