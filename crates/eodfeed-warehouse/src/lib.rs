//! # eodfeed Warehouse
//!
//! DuckDB-backed cache store for eodfeed.
//!
//! ## Overview
//!
//! One DuckDB file holds every cache entry of one data-source namespace
//! (`{cache_dir}/{name}.duckdb`). An entry is addressed by a path-like key
//! (`"exchanges"`, `"symbols/NYSE"`, `"history/NYSE/ABC/period_daily"`) and
//! stores a table of typed rows together with the time it was last written.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use eodfeed_warehouse::{Expiration, SymbolRecord, Warehouse, WarehouseConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let warehouse = Warehouse::open(WarehouseConfig::default())?;
//!
//!     let symbols = vec![SymbolRecord {
//!         code: "ABC".to_string(),
//!         name: "ABC Corp".to_string(),
//!         long_name: None,
//!     }];
//!     warehouse.write("symbols/NYSE", &symbols)?;
//!
//!     if warehouse.is_fresh("symbols/NYSE", Some(Expiration::ONE_DAY))? {
//!         let cached: Option<Vec<SymbolRecord>> = warehouse.read("symbols/NYSE")?;
//!         println!("{} cached symbols", cached.map_or(0, |rows| rows.len()));
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Tables
//!
//! | Table | Description |
//! |-------|-------------|
//! | `cache_entries` | One row per key: kind, row count, last write time |
//! | `exchanges` | Exchange metadata rows |
//! | `symbols` | Symbol listing rows |
//! | `bars` | OHLCV rows keyed by `(cache_key, ts_us)` |
//!
//! ## Concurrency
//!
//! A `Warehouse` owns a single connection and is meant for one process with a
//! single writer. Several warehouses writing the same key of one namespace
//! race: the last completed write replaces the whole entry. Nothing here
//! guards against that.

pub mod expiration;
pub mod migrations;
pub mod tables;

use std::env;
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use ::duckdb::{params, Connection};
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

pub use expiration::{Expiration, ParseExpirationError};
pub use tables::{BarRecord, CacheTable, ExchangeRecord, SymbolRecord, TableKind};

/// Errors raised by cache persistence.
#[derive(Debug, Error)]
pub enum WarehouseError {
    /// `DuckDB` database error.
    #[error(transparent)]
    DuckDb(#[from] ::duckdb::Error),

    /// I/O error (cache directory creation).
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The entry exists but holds a different table kind.
    #[error("cache entry '{key}' holds {found} rows, expected {expected}")]
    KindMismatch {
        key: String,
        expected: TableKind,
        found: String,
    },

    /// The entry metadata cannot be interpreted.
    #[error("cache entry '{key}' is corrupt: {reason}")]
    CorruptEntry { key: String, reason: String },
}

/// Column compression forced on the cache database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    /// Let DuckDB pick per column.
    #[default]
    Auto,
    Uncompressed,
    Rle,
    Dictionary,
    Bitpacking,
    Zstd,
}

impl Compression {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Uncompressed => "uncompressed",
            Self::Rle => "rle",
            Self::Dictionary => "dictionary",
            Self::Bitpacking => "bitpacking",
            Self::Zstd => "zstd",
        }
    }
}

impl Display for Compression {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Compression {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "uncompressed" | "none" => Ok(Self::Uncompressed),
            "rle" => Ok(Self::Rle),
            "dictionary" => Ok(Self::Dictionary),
            "bitpacking" => Ok(Self::Bitpacking),
            "zstd" => Ok(Self::Zstd),
            other => Err(format!(
                "unknown compression '{other}', expected auto, uncompressed, rle, dictionary, bitpacking or zstd"
            )),
        }
    }
}

/// Configuration for the cache database.
#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    /// Directory holding cache databases.
    pub cache_dir: PathBuf,
    /// Data-source namespace; one database file per name.
    pub name: String,
    /// Path to the `DuckDB` database file.
    pub db_path: PathBuf,
    /// Storage compression applied when the connection is opened.
    pub compression: Compression,
}

impl WarehouseConfig {
    pub const DEFAULT_NAME: &'static str = "eoddata";

    /// Configuration for `name` inside `cache_dir`.
    pub fn in_dir(cache_dir: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        let cache_dir = cache_dir.into();
        let name = name.into();
        let db_path = cache_dir.join(format!("{name}.duckdb"));
        Self {
            cache_dir,
            name,
            db_path,
            compression: Compression::Auto,
        }
    }

    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self::in_dir(resolve_cache_dir(), Self::DEFAULT_NAME)
    }
}

/// Summary of one cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntrySummary {
    pub key: String,
    pub kind: String,
    pub row_count: i64,
    pub written_at: DateTime<Utc>,
}

/// Key-addressed table cache persisted in DuckDB.
pub struct Warehouse {
    config: WarehouseConfig,
    connection: Connection,
}

impl Warehouse {
    /// Open (creating if needed) the cache database described by `config`.
    pub fn open(config: WarehouseConfig) -> Result<Self, WarehouseError> {
        if let Some(parent) = config.db_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let connection = Connection::open(&config.db_path)?;
        configure_connection(&connection, config.compression)?;
        migrations::apply_migrations(&connection)?;
        debug!(path = %config.db_path.display(), "opened cache warehouse");

        Ok(Self { config, connection })
    }

    /// Open a throwaway in-memory cache.
    pub fn open_in_memory() -> Result<Self, WarehouseError> {
        let connection = Connection::open_in_memory()?;
        migrations::apply_migrations(&connection)?;
        Ok(Self {
            config: WarehouseConfig::in_dir(PathBuf::new(), ":memory:"),
            connection,
        })
    }

    pub fn config(&self) -> &WarehouseConfig {
        &self.config
    }

    pub fn db_path(&self) -> &Path {
        self.config.db_path.as_path()
    }

    /// Read the table stored under `key`, or `None` when the key is absent.
    pub fn read<T: CacheTable>(&self, key: &str) -> Result<Option<T>, WarehouseError> {
        let Some((kind, _)) = self.entry_meta(key)? else {
            return Ok(None);
        };

        if kind != T::KIND.as_str() {
            return Err(WarehouseError::KindMismatch {
                key: key.to_owned(),
                expected: T::KIND,
                found: kind,
            });
        }

        Ok(Some(T::load_rows(&self.connection, key)?))
    }

    /// Replace whatever is stored under `key` with `table` and stamp the
    /// write time. The replacement is atomic.
    pub fn write<T: CacheTable>(&self, key: &str, table: &T) -> Result<(), WarehouseError> {
        let written_at = Utc::now();
        self.connection.execute_batch("BEGIN TRANSACTION")?;
        let result = (|| -> Result<(), WarehouseError> {
            for kind in TableKind::ALL {
                let delete = format!("DELETE FROM {} WHERE cache_key = ?", kind.table_name());
                self.connection.execute(delete.as_str(), params![key])?;
            }

            table.insert_rows(&self.connection, key)?;

            let row_count = i64::try_from(table.row_count()).unwrap_or(i64::MAX);
            self.connection.execute(
                "INSERT OR REPLACE INTO cache_entries (cache_key, kind, row_count, written_at_us) \
                 VALUES (?, ?, ?, ?)",
                params![key, T::KIND.as_str(), row_count, written_at.timestamp_micros()],
            )?;
            Ok(())
        })();

        finalize_transaction(&self.connection, result)?;
        info!(key, kind = %T::KIND, rows = table.row_count(), "cache entry written");
        Ok(())
    }

    /// Whether an entry exists under `key`.
    pub fn exists(&self, key: &str) -> Result<bool, WarehouseError> {
        Ok(self.entry_meta(key)?.is_some())
    }

    /// Time of the last write to `key`.
    pub fn last_modified(&self, key: &str) -> Result<Option<DateTime<Utc>>, WarehouseError> {
        let Some((_, written_at_us)) = self.entry_meta(key)? else {
            return Ok(None);
        };

        DateTime::from_timestamp_micros(written_at_us)
            .map(Some)
            .ok_or_else(|| WarehouseError::CorruptEntry {
                key: key.to_owned(),
                reason: format!("write time {written_at_us}us is out of range"),
            })
    }

    /// Whether `key` exists and is fresh enough to be served without a refetch.
    pub fn is_fresh(
        &self,
        key: &str,
        expiration: Option<Expiration>,
    ) -> Result<bool, WarehouseError> {
        self.is_fresh_at(key, expiration, Utc::now())
    }

    /// [`Warehouse::is_fresh`] evaluated at `now`.
    pub fn is_fresh_at(
        &self,
        key: &str,
        expiration: Option<Expiration>,
        now: DateTime<Utc>,
    ) -> Result<bool, WarehouseError> {
        let Some(written_at) = self.last_modified(key)? else {
            return Ok(false);
        };
        Ok(within_expiration(written_at, now, expiration))
    }

    /// List every cache entry ordered by key.
    pub fn entries(&self) -> Result<Vec<EntrySummary>, WarehouseError> {
        let mut statement = self.connection.prepare(
            "SELECT cache_key, kind, row_count, written_at_us FROM cache_entries ORDER BY cache_key",
        )?;
        let rows = statement.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, i64>(3)?,
            ))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (key, kind, row_count, written_at_us) = row?;
            let written_at = DateTime::from_timestamp_micros(written_at_us).ok_or_else(|| {
                WarehouseError::CorruptEntry {
                    key: key.clone(),
                    reason: format!("write time {written_at_us}us is out of range"),
                }
            })?;
            entries.push(EntrySummary {
                key,
                kind,
                row_count,
                written_at,
            });
        }
        Ok(entries)
    }

    /// Delete the entry stored under `key`. Returns whether anything was removed.
    pub fn remove(&self, key: &str) -> Result<bool, WarehouseError> {
        self.connection.execute_batch("BEGIN TRANSACTION")?;
        let result = (|| -> Result<bool, WarehouseError> {
            for kind in TableKind::ALL {
                let delete = format!("DELETE FROM {} WHERE cache_key = ?", kind.table_name());
                self.connection.execute(delete.as_str(), params![key])?;
            }
            let removed = self
                .connection
                .execute("DELETE FROM cache_entries WHERE cache_key = ?", params![key])?;
            Ok(removed > 0)
        })();

        finalize_transaction(&self.connection, result)
    }

    fn entry_meta(&self, key: &str) -> Result<Option<(String, i64)>, WarehouseError> {
        let mut statement = self
            .connection
            .prepare("SELECT kind, written_at_us FROM cache_entries WHERE cache_key = ?")?;
        let mut rows = statement.query(params![key])?;
        match rows.next()? {
            Some(row) => Ok(Some((row.get(0)?, row.get(1)?))),
            None => Ok(None),
        }
    }
}

/// Freshness rule: no expiration means forever, otherwise the elapsed time
/// since the write must be strictly less than the expiration.
pub fn within_expiration(
    written_at: DateTime<Utc>,
    now: DateTime<Utc>,
    expiration: Option<Expiration>,
) -> bool {
    let Some(expiration) = expiration else {
        return true;
    };

    let elapsed = now.signed_duration_since(written_at);
    match chrono::Duration::from_std(expiration.as_duration()) {
        Ok(limit) => elapsed < limit,
        // Longer than chrono can represent: nothing written so far is stale.
        Err(_) => true,
    }
}

/// Finalize a transaction, committing on success or rolling back on failure.
fn finalize_transaction<T>(
    connection: &Connection,
    result: Result<T, WarehouseError>,
) -> Result<T, WarehouseError> {
    match result {
        Ok(value) => {
            connection.execute_batch("COMMIT")?;
            Ok(value)
        }
        Err(error) => {
            let _ = connection.execute_batch("ROLLBACK");
            Err(error)
        }
    }
}

fn configure_connection(
    connection: &Connection,
    compression: Compression,
) -> Result<(), ::duckdb::Error> {
    connection.execute_batch("PRAGMA disable_progress_bar;")?;
    if compression != Compression::Auto {
        let pragma = format!("PRAGMA force_compression='{}';", compression.as_str());
        connection.execute_batch(pragma.as_str())?;
    }
    Ok(())
}

/// Resolve the per-user cache directory.
fn resolve_cache_dir() -> PathBuf {
    if let Some(path) = non_empty_env("EODFEED_CACHE_DIR") {
        return path;
    }

    if cfg!(target_os = "windows") {
        if let Some(local) = non_empty_env("LOCALAPPDATA") {
            return local.join("eodfeed");
        }
    } else if cfg!(target_os = "macos") {
        if let Some(home) = non_empty_env("HOME") {
            return home.join("Library").join("Caches").join("eodfeed");
        }
    } else {
        if let Some(xdg) = non_empty_env("XDG_CACHE_HOME") {
            return xdg.join("eodfeed");
        }
        if let Some(home) = non_empty_env("HOME") {
            return home.join(".cache").join("eodfeed");
        }
    }

    PathBuf::from(".eodfeed-cache")
}

fn non_empty_env(name: &str) -> Option<PathBuf> {
    env::var_os(name)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
}
