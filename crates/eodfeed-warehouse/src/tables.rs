//! Typed table records and their DuckDB row mapping.
//!
//! Each cache entry kind owns one table. Rows are scoped by `cache_key`, so an
//! entry is replaced wholesale by deleting its rows and inserting the new set.

use std::fmt::{Display, Formatter};

use ::duckdb::{params, Connection};
use serde::Serialize;

/// Shape of the rows stored under a cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    Exchanges,
    Symbols,
    History,
}

impl TableKind {
    pub const ALL: [Self; 3] = [Self::Exchanges, Self::Symbols, Self::History];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Exchanges => "exchanges",
            Self::Symbols => "symbols",
            Self::History => "history",
        }
    }

    pub(crate) const fn table_name(self) -> &'static str {
        match self {
            Self::Exchanges => "exchanges",
            Self::Symbols => "symbols",
            Self::History => "bars",
        }
    }
}

impl Display for TableKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exchange metadata row. Timestamps are exchange-local wall-clock
/// microseconds since the epoch; the zone follows from `timezone`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeRecord {
    pub code: String,
    pub name: String,
    pub country: Option<String>,
    pub currency: Option<String>,
    pub suffix: Option<String>,
    /// Vendor timezone label, e.g. "Eastern Standard Time".
    pub timezone: String,
    pub is_intraday: bool,
    pub intraday_start_us: Option<i64>,
    pub last_trade_us: Option<i64>,
    pub advances: Option<i64>,
    pub declines: Option<i64>,
}

/// Symbol listing row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolRecord {
    pub code: String,
    pub name: String,
    pub long_name: Option<String>,
}

/// OHLCV row indexed by `ts_us` (UTC microseconds since the epoch).
#[derive(Debug, Clone, PartialEq)]
pub struct BarRecord {
    pub ts_us: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
    pub open_interest: Option<i64>,
}

/// A table that can be persisted under a single cache key.
pub trait CacheTable: Sized {
    const KIND: TableKind;

    fn row_count(&self) -> usize;

    fn insert_rows(&self, connection: &Connection, key: &str) -> Result<(), ::duckdb::Error>;

    fn load_rows(connection: &Connection, key: &str) -> Result<Self, ::duckdb::Error>;
}

impl CacheTable for Vec<ExchangeRecord> {
    const KIND: TableKind = TableKind::Exchanges;

    fn row_count(&self) -> usize {
        self.len()
    }

    fn insert_rows(&self, connection: &Connection, key: &str) -> Result<(), ::duckdb::Error> {
        let mut statement = connection.prepare(
            "INSERT INTO exchanges \
             (cache_key, code, name, country, currency, suffix, timezone, is_intraday, \
              intraday_start_us, last_trade_us, advances, declines) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )?;
        for row in self {
            statement.execute(params![
                key,
                row.code,
                row.name,
                row.country,
                row.currency,
                row.suffix,
                row.timezone,
                row.is_intraday,
                row.intraday_start_us,
                row.last_trade_us,
                row.advances,
                row.declines,
            ])?;
        }
        Ok(())
    }

    fn load_rows(connection: &Connection, key: &str) -> Result<Self, ::duckdb::Error> {
        let mut statement = connection.prepare(
            "SELECT code, name, country, currency, suffix, timezone, is_intraday, \
             intraday_start_us, last_trade_us, advances, declines \
             FROM exchanges WHERE cache_key = ? ORDER BY code",
        )?;
        let rows = statement.query_map(params![key], |row| {
            Ok(ExchangeRecord {
                code: row.get(0)?,
                name: row.get(1)?,
                country: row.get(2)?,
                currency: row.get(3)?,
                suffix: row.get(4)?,
                timezone: row.get(5)?,
                is_intraday: row.get(6)?,
                intraday_start_us: row.get(7)?,
                last_trade_us: row.get(8)?,
                advances: row.get(9)?,
                declines: row.get(10)?,
            })
        })?;
        rows.collect()
    }
}

impl CacheTable for Vec<SymbolRecord> {
    const KIND: TableKind = TableKind::Symbols;

    fn row_count(&self) -> usize {
        self.len()
    }

    fn insert_rows(&self, connection: &Connection, key: &str) -> Result<(), ::duckdb::Error> {
        let mut statement = connection.prepare(
            "INSERT INTO symbols (cache_key, code, name, long_name) VALUES (?, ?, ?, ?)",
        )?;
        for row in self {
            statement.execute(params![key, row.code, row.name, row.long_name])?;
        }
        Ok(())
    }

    fn load_rows(connection: &Connection, key: &str) -> Result<Self, ::duckdb::Error> {
        let mut statement = connection.prepare(
            "SELECT code, name, long_name FROM symbols WHERE cache_key = ? ORDER BY code",
        )?;
        let rows = statement.query_map(params![key], |row| {
            Ok(SymbolRecord {
                code: row.get(0)?,
                name: row.get(1)?,
                long_name: row.get(2)?,
            })
        })?;
        rows.collect()
    }
}

impl CacheTable for Vec<BarRecord> {
    const KIND: TableKind = TableKind::History;

    fn row_count(&self) -> usize {
        self.len()
    }

    fn insert_rows(&self, connection: &Connection, key: &str) -> Result<(), ::duckdb::Error> {
        let mut statement = connection.prepare(
            "INSERT INTO bars (cache_key, ts_us, open, high, low, close, volume, open_interest) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )?;
        for row in self {
            statement.execute(params![
                key,
                row.ts_us,
                row.open,
                row.high,
                row.low,
                row.close,
                row.volume,
                row.open_interest,
            ])?;
        }
        Ok(())
    }

    fn load_rows(connection: &Connection, key: &str) -> Result<Self, ::duckdb::Error> {
        let mut statement = connection.prepare(
            "SELECT ts_us, open, high, low, close, volume, open_interest \
             FROM bars WHERE cache_key = ? ORDER BY ts_us",
        )?;
        let rows = statement.query_map(params![key], |row| {
            Ok(BarRecord {
                ts_us: row.get(0)?,
                open: row.get(1)?,
                high: row.get(2)?,
                low: row.get(3)?,
                close: row.get(4)?,
                volume: row.get(5)?,
                open_interest: row.get(6)?,
            })
        })?;
        rows.collect()
    }
}
