use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime};
use chrono_tz::Tz;
use eodfeed_warehouse::{ExchangeRecord, SymbolRecord, WarehouseError};
use serde::Serialize;

use crate::timezone::localize;

/// Exchange metadata.
///
/// `intraday_start` and `last_trade` are exchange-local wall-clock times;
/// the `*_at` accessors attach the resolved timezone.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Exchange {
    pub code: String,
    pub name: String,
    pub country: Option<String>,
    pub currency: Option<String>,
    pub suffix: Option<String>,
    /// Timezone label as reported by the vendor.
    pub timezone_label: String,
    /// Resolved timezone, `None` when the label has no mapping.
    pub timezone: Option<Tz>,
    pub is_intraday: bool,
    pub intraday_start: Option<NaiveDateTime>,
    pub last_trade: Option<NaiveDateTime>,
    pub advances: Option<i64>,
    pub declines: Option<i64>,
}

impl Exchange {
    pub fn last_trade_at(&self) -> Option<DateTime<Tz>> {
        let tz = self.timezone?;
        self.last_trade.map(|local| localize(tz, local))
    }

    pub fn intraday_start_at(&self) -> Option<DateTime<Tz>> {
        let tz = self.timezone?;
        self.intraday_start.map(|local| localize(tz, local))
    }

    pub fn to_record(&self) -> ExchangeRecord {
        ExchangeRecord {
            code: self.code.clone(),
            name: self.name.clone(),
            country: self.country.clone(),
            currency: self.currency.clone(),
            suffix: self.suffix.clone(),
            timezone: self.timezone_label.clone(),
            is_intraday: self.is_intraday,
            intraday_start_us: self.intraday_start.map(wall_clock_micros),
            last_trade_us: self.last_trade.map(wall_clock_micros),
            advances: self.advances,
            declines: self.declines,
        }
    }

    /// Rebuild an exchange from its cached row. `timezone` is the resolution
    /// of the row's label.
    pub fn from_record(
        key: &str,
        record: ExchangeRecord,
        timezone: Option<Tz>,
    ) -> Result<Self, WarehouseError> {
        let intraday_start = record
            .intraday_start_us
            .map(|us| wall_clock_from_micros(key, us))
            .transpose()?;
        let last_trade = record
            .last_trade_us
            .map(|us| wall_clock_from_micros(key, us))
            .transpose()?;

        Ok(Self {
            code: record.code,
            name: record.name,
            country: record.country,
            currency: record.currency,
            suffix: record.suffix,
            timezone_label: record.timezone,
            timezone,
            is_intraday: record.is_intraday,
            intraday_start,
            last_trade,
            advances: record.advances,
            declines: record.declines,
        })
    }
}

/// Exchanges keyed by code.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ExchangeTable(BTreeMap<String, Exchange>);

impl ExchangeTable {
    pub fn get(&self, code: &str) -> Option<&Exchange> {
        self.0.get(code)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.0.contains_key(code)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Exchange> {
        self.0.values()
    }

    pub fn to_records(&self) -> Vec<ExchangeRecord> {
        self.iter().map(Exchange::to_record).collect()
    }
}

impl FromIterator<Exchange> for ExchangeTable {
    fn from_iter<I: IntoIterator<Item = Exchange>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|exchange| (exchange.code.clone(), exchange))
                .collect(),
        )
    }
}

impl IntoIterator for ExchangeTable {
    type Item = Exchange;
    type IntoIter = std::collections::btree_map::IntoValues<String, Exchange>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_values()
    }
}

/// Symbol listing entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SymbolInfo {
    pub code: String,
    pub name: String,
    pub long_name: Option<String>,
}

impl From<SymbolRecord> for SymbolInfo {
    fn from(value: SymbolRecord) -> Self {
        Self {
            code: value.code,
            name: value.name,
            long_name: value.long_name,
        }
    }
}

impl From<&SymbolInfo> for SymbolRecord {
    fn from(value: &SymbolInfo) -> Self {
        Self {
            code: value.code.clone(),
            name: value.name.clone(),
            long_name: value.long_name.clone(),
        }
    }
}

/// Symbols of one exchange keyed by code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SymbolTable(BTreeMap<String, SymbolInfo>);

impl SymbolTable {
    pub fn get(&self, code: &str) -> Option<&SymbolInfo> {
        self.0.get(code)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.0.contains_key(code)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SymbolInfo> {
        self.0.values()
    }

    pub fn to_records(&self) -> Vec<SymbolRecord> {
        self.iter().map(SymbolRecord::from).collect()
    }
}

impl FromIterator<SymbolInfo> for SymbolTable {
    fn from_iter<I: IntoIterator<Item = SymbolInfo>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|symbol| (symbol.code.clone(), symbol))
                .collect(),
        )
    }
}

impl From<Vec<SymbolRecord>> for SymbolTable {
    fn from(value: Vec<SymbolRecord>) -> Self {
        value.into_iter().map(SymbolInfo::from).collect()
    }
}

fn wall_clock_micros(local: NaiveDateTime) -> i64 {
    local.and_utc().timestamp_micros()
}

fn wall_clock_from_micros(key: &str, micros: i64) -> Result<NaiveDateTime, WarehouseError> {
    DateTime::from_timestamp_micros(micros)
        .map(|instant| instant.naive_utc())
        .ok_or_else(|| WarehouseError::CorruptEntry {
            key: key.to_owned(),
            reason: format!("exchange timestamp {micros}us is out of range"),
        })
}
