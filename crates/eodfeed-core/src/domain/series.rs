use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use eodfeed_warehouse::{BarRecord, WarehouseError};
use serde::Serialize;

use crate::domain::{Bound, Period};

/// OHLCV values of one bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BarFields {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
    pub open_interest: Option<u64>,
}

/// One bar stamped in exchange-local time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bar {
    pub ts: DateTime<Tz>,
    #[serde(flatten)]
    pub fields: BarFields,
}

impl Bar {
    pub const fn new(ts: DateTime<Tz>, fields: BarFields) -> Self {
        Self { ts, fields }
    }

    fn key(&self) -> i64 {
        self.ts.timestamp_micros()
    }
}

/// Ordered price history of one (exchange, symbol, period).
///
/// Timestamps are unique and ascending; every constructor restores that
/// order, keeping the last bar seen for a repeated timestamp.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistorySeries {
    exchange: String,
    symbol: String,
    period: Period,
    timezone: Tz,
    bars: Vec<Bar>,
}

impl HistorySeries {
    pub fn new(
        exchange: impl Into<String>,
        symbol: impl Into<String>,
        period: Period,
        timezone: Tz,
        bars: impl IntoIterator<Item = Bar>,
    ) -> Self {
        let mut by_ts = BTreeMap::new();
        for bar in bars {
            let bar = Bar::new(bar.ts.with_timezone(&timezone), bar.fields);
            by_ts.insert(bar.key(), bar);
        }

        Self {
            exchange: exchange.into(),
            symbol: symbol.into(),
            period,
            timezone,
            bars: by_ts.into_values().collect(),
        }
    }

    pub fn empty(
        exchange: impl Into<String>,
        symbol: impl Into<String>,
        period: Period,
        timezone: Tz,
    ) -> Self {
        Self::new(exchange, symbol, period, timezone, Vec::new())
    }

    pub fn exchange(&self) -> &str {
        &self.exchange
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub const fn period(&self) -> Period {
        self.period
    }

    pub const fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first(&self) -> Option<&Bar> {
        self.bars.first()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Bar> {
        self.bars.iter()
    }

    pub fn into_bars(self) -> Vec<Bar> {
        self.bars
    }

    /// Combine with `newer`, preferring its values where timestamps collide.
    pub fn merge(&self, newer: &HistorySeries) -> HistorySeries {
        self.with_bars(self.bars.iter().chain(newer.bars.iter()).copied())
    }

    /// Bars inside `[start, end]` compared on exchange-local wall-clock time.
    /// `None` leaves the window open-ended.
    pub fn select(&self, start: &Bound, end: Option<&Bound>) -> HistorySeries {
        self.with_bars(self.bars.iter().copied().filter(|bar| {
            let local = bar.ts.naive_local();
            start.admits_from(local) && end.map_or(true, |end| end.admits_until(local))
        }))
    }

    /// Drop bars stamped after `end`.
    pub fn truncate_after(&mut self, end: &Bound) {
        self.bars.retain(|bar| end.admits_until(bar.ts.naive_local()));
    }

    pub fn to_records(&self) -> Vec<BarRecord> {
        self.bars
            .iter()
            .map(|bar| BarRecord {
                ts_us: bar.key(),
                open: bar.fields.open,
                high: bar.fields.high,
                low: bar.fields.low,
                close: bar.fields.close,
                volume: i64::try_from(bar.fields.volume).unwrap_or(i64::MAX),
                open_interest: bar
                    .fields
                    .open_interest
                    .map(|value| i64::try_from(value).unwrap_or(i64::MAX)),
            })
            .collect()
    }

    pub fn from_records(
        key: &str,
        exchange: impl Into<String>,
        symbol: impl Into<String>,
        period: Period,
        timezone: Tz,
        records: Vec<BarRecord>,
    ) -> Result<Self, WarehouseError> {
        let corrupt = |reason: String| WarehouseError::CorruptEntry {
            key: key.to_owned(),
            reason,
        };

        let mut bars = Vec::with_capacity(records.len());
        for record in records {
            let ts = DateTime::<Utc>::from_timestamp_micros(record.ts_us).ok_or_else(|| {
                corrupt(format!("bar timestamp {}us is out of range", record.ts_us))
            })?;
            let volume = u64::try_from(record.volume)
                .map_err(|_| corrupt(format!("negative volume {}", record.volume)))?;
            let open_interest = record
                .open_interest
                .map(|value| {
                    u64::try_from(value)
                        .map_err(|_| corrupt(format!("negative open interest {value}")))
                })
                .transpose()?;

            bars.push(Bar::new(
                ts.with_timezone(&timezone),
                BarFields {
                    open: record.open,
                    high: record.high,
                    low: record.low,
                    close: record.close,
                    volume,
                    open_interest,
                },
            ));
        }

        Ok(Self::new(exchange, symbol, period, timezone, bars))
    }

    fn with_bars(&self, bars: impl IntoIterator<Item = Bar>) -> HistorySeries {
        HistorySeries::new(
            self.exchange.clone(),
            self.symbol.clone(),
            self.period,
            self.timezone,
            bars,
        )
    }
}

impl<'a> IntoIterator for &'a HistorySeries {
    type Item = &'a Bar;
    type IntoIter = std::slice::Iter<'a, Bar>;

    fn into_iter(self) -> Self::IntoIter {
        self.bars.iter()
    }
}
