//! EODData web service client over its HTTP GET binding.
//!
//! | Method | Parameters |
//! |--------|------------|
//! | `Login` | `Username`, `Password` |
//! | `ExchangeList` | `Token` |
//! | `SymbolList` | `Token`, `Exchange` |
//! | `SymbolHistoryPeriod` | `Token`, `Exchange`, `Symbol`, `Date`, `Period` |
//! | `SymbolHistoryPeriodByDateRange` | `Token`, `Exchange`, `Symbol`, `StartDate`, `EndDate`, `Period` |
//!
//! Dates are sent as `YYYYMMDD`. Every response carries a root `Message`
//! attribute; anything not containing "success" is a failed call.

use std::collections::BTreeMap;
use std::env;

use chrono::NaiveDate;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::{debug, info};

use crate::domain::Period;
use crate::remote::fields::{self, FieldMapping};
use crate::remote::http_client::{HttpClient, HttpRequest, ReqwestHttpClient, DEFAULT_TIMEOUT_MS};
use crate::remote::session::{Credentials, Session};
use crate::remote::{RawBar, RawExchange, RawSymbol, RemoteSource};
use crate::Error;

pub const DEFAULT_BASE_URL: &str = "http://ws.eoddata.com/data.asmx";
pub const BASE_URL_ENV: &str = "EODDATA_BASE_URL";

/// EODData collaborator implementing [`RemoteSource`].
#[derive(Debug)]
pub struct EodDataClient<H = ReqwestHttpClient> {
    http: H,
    base_url: String,
    session: Session,
    timeout_ms: u64,
}

impl EodDataClient<ReqwestHttpClient> {
    pub fn new(credentials: Credentials) -> Self {
        Self::with_http_client(ReqwestHttpClient::default(), credentials)
    }

    /// Client built from `EODDATA_USERNAME`, `EODDATA_PASSWORD` and the
    /// optional `EODDATA_BASE_URL`.
    pub fn from_env() -> Result<Self, Error> {
        let client = Self::new(Credentials::from_env()?);
        Ok(match env::var(BASE_URL_ENV) {
            Ok(base_url) if !base_url.trim().is_empty() => client.with_base_url(base_url.trim()),
            _ => client,
        })
    }
}

impl<H: HttpClient> EodDataClient<H> {
    pub fn with_http_client(http: H, credentials: Credentials) -> Self {
        Self {
            http,
            base_url: DEFAULT_BASE_URL.to_owned(),
            session: Session::new(credentials),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Log in unless the session already holds a token.
    pub fn ensure_authenticated(&self) -> Result<String, Error> {
        self.session
            .ensure_authenticated(|credentials| self.login(credentials))
    }

    fn login(&self, credentials: &Credentials) -> Result<String, Error> {
        let request = self
            .request("Login")
            .with_query("Username", credentials.username())
            .with_query("Password", credentials.password());
        let body = self.send("Login", request)?;
        let document = XmlDocument::parse("Login", &body, None)?;

        if !document.is_success() {
            return Err(Error::Authentication {
                message: document.message().unwrap_or("login rejected").to_owned(),
                raw: Some(body),
            });
        }

        match document.root.get("Token").filter(|token| !token.is_empty()) {
            Some(token) => {
                info!("logged in to EODData");
                Ok(token.clone())
            }
            None => Err(Error::Authentication {
                message: String::from("login response carried no token"),
                raw: Some(body),
            }),
        }
    }

    fn call(
        &self,
        method: &str,
        params: &[(&str, String)],
        record_tag: &str,
        mappings: &[FieldMapping],
    ) -> Result<Vec<fields::NormalizedRecord>, Error> {
        let token = self.ensure_authenticated()?;
        let mut request = self.request(method).with_query("Token", token);
        for (name, value) in params {
            request = request.with_query(*name, value.clone());
        }

        let body = self.send(method, request)?;
        let document = XmlDocument::parse(method, &body, Some(record_tag))?;
        if !document.is_success() {
            return Err(Error::remote_with_raw(
                method,
                document
                    .message()
                    .unwrap_or("response carried no status message")
                    .to_owned(),
                body,
            ));
        }

        let mut records = Vec::with_capacity(document.records.len());
        for attributes in &document.records {
            let record = fields::normalize(mappings, attributes).map_err(|err| {
                Error::remote_with_raw(method, format!("{record_tag}: {err}"), body.clone())
            })?;
            records.push(record);
        }

        debug!(method, records = records.len(), "EODData call succeeded");
        Ok(records)
    }

    fn request(&self, method: &str) -> HttpRequest {
        HttpRequest::get(format!("{}/{method}", self.base_url))
            .with_header("accept", "text/xml")
            .with_timeout_ms(self.timeout_ms)
    }

    fn send(&self, method: &str, request: HttpRequest) -> Result<String, Error> {
        let response = self
            .http
            .execute(request)
            .map_err(|err| Error::remote(method, err.message()))?;

        if !response.is_success() {
            return Err(Error::remote_with_raw(
                method,
                format!("HTTP status {}", response.status),
                response.body,
            ));
        }
        Ok(response.body)
    }
}

impl<H: HttpClient> RemoteSource for EodDataClient<H> {
    fn exchanges(&self) -> Result<Vec<RawExchange>, Error> {
        const METHOD: &str = "ExchangeList";
        self.call(METHOD, &[], "EXCHANGE", fields::EXCHANGE_FIELDS)?
            .iter()
            .map(|record| {
                RawExchange::from_record(record)
                    .map_err(|err| Error::remote(METHOD, err.to_string()))
            })
            .collect()
    }

    fn symbols(&self, exchange: &str) -> Result<Vec<RawSymbol>, Error> {
        const METHOD: &str = "SymbolList";
        self.call(
            METHOD,
            &[("Exchange", exchange.to_owned())],
            "SYMBOL",
            fields::SYMBOL_FIELDS,
        )?
        .iter()
        .map(|record| {
            RawSymbol::from_record(record).map_err(|err| Error::remote(METHOD, err.to_string()))
        })
        .collect()
    }

    fn history(
        &self,
        exchange: &str,
        symbol: &str,
        start: NaiveDate,
        end: Option<NaiveDate>,
        period: Period,
    ) -> Result<Vec<RawBar>, Error> {
        let (method, params) = match end {
            None => (
                "SymbolHistoryPeriod",
                vec![
                    ("Exchange", exchange.to_owned()),
                    ("Symbol", symbol.to_owned()),
                    ("Date", vendor_date(start)),
                    ("Period", period.vendor_code().to_owned()),
                ],
            ),
            Some(end) => (
                "SymbolHistoryPeriodByDateRange",
                vec![
                    ("Exchange", exchange.to_owned()),
                    ("Symbol", symbol.to_owned()),
                    ("StartDate", vendor_date(start)),
                    ("EndDate", vendor_date(end)),
                    ("Period", period.vendor_code().to_owned()),
                ],
            ),
        };

        info!(method, exchange, symbol, %start, period = %period, "fetching history");
        self.call(method, &params, "QUOTE", fields::QUOTE_FIELDS)?
            .iter()
            .map(|record| {
                RawBar::from_record(record).map_err(|err| Error::remote(method, err.to_string()))
            })
            .collect()
    }
}

fn vendor_date(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// Root attributes plus the attributes of every record element.
#[derive(Debug, Default)]
struct XmlDocument {
    root: BTreeMap<String, String>,
    records: Vec<BTreeMap<String, String>>,
}

impl XmlDocument {
    fn parse(method: &str, xml: &str, record_tag: Option<&str>) -> Result<Self, Error> {
        let malformed = |detail: String| {
            Error::remote_with_raw(method, format!("malformed XML: {detail}"), xml)
        };

        let mut reader = Reader::from_str(xml);
        let mut document = XmlDocument::default();
        let mut seen_root = false;

        loop {
            match reader.read_event() {
                Ok(Event::Start(element)) | Ok(Event::Empty(element)) => {
                    if !seen_root {
                        document.root = attributes(&element).map_err(&malformed)?;
                        seen_root = true;
                    } else if record_tag
                        .is_some_and(|tag| element.local_name().as_ref() == tag.as_bytes())
                    {
                        document
                            .records
                            .push(attributes(&element).map_err(&malformed)?);
                    }
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(err) => return Err(malformed(err.to_string())),
            }
        }

        if !seen_root {
            return Err(malformed(String::from("document has no root element")));
        }
        Ok(document)
    }

    fn message(&self) -> Option<&str> {
        self.root.get("Message").map(String::as_str)
    }

    fn is_success(&self) -> bool {
        self.message()
            .is_some_and(|message| message.to_ascii_lowercase().contains("success"))
    }
}

fn attributes(element: &BytesStart<'_>) -> Result<BTreeMap<String, String>, String> {
    let mut values = BTreeMap::new();
    for attribute in element.attributes() {
        let attribute = attribute.map_err(|err| err.to_string())?;
        let name = String::from_utf8_lossy(attribute.key.local_name().as_ref()).into_owned();
        let value = attribute
            .unescape_value()
            .map_err(|err| err.to_string())?
            .into_owned();
        values.insert(name, value);
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_root_and_record_attributes() {
        let xml = r#"<?xml version="1.0" encoding="utf-8"?>
<RESPONSE xmlns="http://ws.eoddata.com/Data" Source="Data.asmx" Message="Success">
  <SYMBOLS>
    <SYMBOL Code="ABC" Name="ABC &amp; Sons" LongName="" />
    <SYMBOL Code="XYZ" Name="XYZ Corp" LongName="XYZ Corporation" />
  </SYMBOLS>
</RESPONSE>"#;

        let document = XmlDocument::parse("SymbolList", xml, Some("SYMBOL")).expect("parsed");

        assert!(document.is_success());
        assert_eq!(document.records.len(), 2);
        assert_eq!(
            document.records[0].get("Name").map(String::as_str),
            Some("ABC & Sons")
        );
    }

    #[test]
    fn non_success_message_is_detected() {
        let xml = r#"<RESPONSE Message="Invalid Token" />"#;
        let document = XmlDocument::parse("ExchangeList", xml, Some("EXCHANGE")).expect("parsed");

        assert!(!document.is_success());
        assert_eq!(document.message(), Some("Invalid Token"));
    }

    #[test]
    fn empty_body_is_malformed() {
        let err = XmlDocument::parse("ExchangeList", "", None).expect_err("no root");
        assert!(matches!(err, Error::RemoteRequest { .. }));
    }

    #[test]
    fn formats_vendor_dates() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 5).expect("date");
        assert_eq!(vendor_date(date), "20240105");
    }
}
