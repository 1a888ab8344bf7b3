//! # Remote Data Source
//!
//! Contract of the service that supplies raw market data, and the EODData
//! implementation of it.
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`fields`] | Vendor attribute mapping and type coercion |
//! | [`session`] | Credentials and explicit session token handling |
//! | [`http_client`] | Blocking HTTP transport abstraction |
//! | [`eoddata`] | [`EodDataClient`] over the EODData HTTP GET binding |
//!
//! Raw records keep exchange-local wall-clock times; the manager attaches
//! timezones. Calls are blocking and never retried here.

pub mod eoddata;
pub mod fields;
pub mod http_client;
pub mod session;

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};

use crate::domain::Period;
use crate::Error;
use fields::{FieldError, NormalizedRecord};

pub use eoddata::EodDataClient;
pub use http_client::{HttpClient, HttpError, HttpRequest, HttpResponse, ReqwestHttpClient};
pub use session::{Credentials, Session};

/// Exchange record as reported by the remote source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawExchange {
    pub code: String,
    pub name: String,
    pub country: Option<String>,
    pub currency: Option<String>,
    pub suffix: Option<String>,
    pub timezone: String,
    pub is_intraday: bool,
    pub intraday_start: Option<NaiveDateTime>,
    pub last_trade: Option<NaiveDateTime>,
    pub advances: Option<i64>,
    pub declines: Option<i64>,
}

impl RawExchange {
    pub fn from_record(record: &NormalizedRecord) -> Result<Self, FieldError> {
        Ok(Self {
            code: required(record.text("code")?, "code")?,
            name: required(record.text("name")?, "name")?,
            country: record.text("country")?,
            currency: record.text("currency")?,
            suffix: record.text("suffix")?,
            timezone: required(record.text("timezone")?, "timezone")?,
            is_intraday: record.flag("is_intraday")?.unwrap_or(false),
            intraday_start: record.timestamp("intraday_start_date")?,
            last_trade: record.timestamp("last_trade_date_time")?,
            advances: record.integer("advances")?,
            declines: record.integer("declines")?,
        })
    }
}

/// Symbol record as reported by the remote source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSymbol {
    pub code: String,
    pub name: String,
    pub long_name: Option<String>,
}

impl RawSymbol {
    pub fn from_record(record: &NormalizedRecord) -> Result<Self, FieldError> {
        Ok(Self {
            code: required(record.text("code")?, "code")?,
            name: required(record.text("name")?, "name")?,
            long_name: record.text("long_name")?,
        })
    }
}

/// One history bar stamped in exchange-local wall-clock time.
#[derive(Debug, Clone, PartialEq)]
pub struct RawBar {
    pub symbol: String,
    pub date_time: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
    pub open_interest: Option<u64>,
}

impl RawBar {
    pub fn from_record(record: &NormalizedRecord) -> Result<Self, FieldError> {
        Ok(Self {
            symbol: required(record.text("symbol")?, "symbol")?,
            date_time: required(record.timestamp("date_time")?, "date_time")?,
            open: required(record.decimal("open")?, "open")?,
            high: required(record.decimal("high")?, "high")?,
            low: required(record.decimal("low")?, "low")?,
            close: required(record.decimal("close")?, "close")?,
            volume: required(record.count("volume")?, "volume")?,
            open_interest: record.count("open_interest")?,
        })
    }
}

fn required<T>(value: Option<T>, field: &'static str) -> Result<T, FieldError> {
    value.ok_or(FieldError::Missing { vendor: field })
}

/// Source of raw exchanges, symbols and history bars.
///
/// Dates passed to [`RemoteSource::history`] are exchange-local calendar
/// dates; `end = None` asks for everything from `start` onwards.
pub trait RemoteSource {
    fn exchanges(&self) -> Result<Vec<RawExchange>, Error>;

    fn symbols(&self, exchange: &str) -> Result<Vec<RawSymbol>, Error>;

    fn history(
        &self,
        exchange: &str,
        symbol: &str,
        start: NaiveDate,
        end: Option<NaiveDate>,
        period: Period,
    ) -> Result<Vec<RawBar>, Error>;
}

impl<T: RemoteSource + ?Sized> RemoteSource for Arc<T> {
    fn exchanges(&self) -> Result<Vec<RawExchange>, Error> {
        (**self).exchanges()
    }

    fn symbols(&self, exchange: &str) -> Result<Vec<RawSymbol>, Error> {
        (**self).symbols(exchange)
    }

    fn history(
        &self,
        exchange: &str,
        symbol: &str,
        start: NaiveDate,
        end: Option<NaiveDate>,
        period: Period,
    ) -> Result<Vec<RawBar>, Error> {
        (**self).history(exchange, symbol, start, end, period)
    }
}

impl<T: RemoteSource + ?Sized> RemoteSource for &T {
    fn exchanges(&self) -> Result<Vec<RawExchange>, Error> {
        (**self).exchanges()
    }

    fn symbols(&self, exchange: &str) -> Result<Vec<RawSymbol>, Error> {
        (**self).symbols(exchange)
    }

    fn history(
        &self,
        exchange: &str,
        symbol: &str,
        start: NaiveDate,
        end: Option<NaiveDate>,
        period: Period,
    ) -> Result<Vec<RawBar>, Error> {
        (**self).history(exchange, symbol, start, end, period)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn builds_raw_bar_from_quote_attributes() {
        let attributes: BTreeMap<String, String> = [
            ("Symbol", "ABC"),
            ("DateTime", "2024-01-02T00:00:00"),
            ("Open", "10.5"),
            ("High", "11"),
            ("Low", "10"),
            ("Close", "10.75"),
            ("Volume", "125000"),
            ("OpenInterest", ""),
        ]
        .into_iter()
        .map(|(key, value)| (key.to_owned(), value.to_owned()))
        .collect();

        let record = fields::normalize(fields::QUOTE_FIELDS, &attributes).expect("normalized");
        let bar = RawBar::from_record(&record).expect("bar");

        assert_eq!(bar.symbol, "ABC");
        assert_eq!(bar.volume, 125_000);
        assert_eq!(bar.open_interest, None);
        assert_eq!(bar.close, 10.75);
    }
}
