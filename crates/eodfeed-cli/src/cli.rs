//! CLI argument definitions for eodfeed.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `exchanges` | List exchanges with their timezone and last trade |
//! | `symbols` | List the symbols of one exchange |
//! | `history` | Fetch price history of one symbol |
//! | `stream` | Stream several histories as timestamp-ordered NDJSON events |
//! | `cache` | Inspect or prune the local cache |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--format` | `json` | Output format (json, ndjson, table) |
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--no-cache` | `false` | Always ask the remote service |
//! | `--cache-dir` | per-user cache dir | Directory holding the cache database |
//! | `--name` | `eoddata` | Cache namespace (database file name) |
//! | `--compression` | `auto` | Storage compression for the cache |
//!
//! # Examples
//!
//! ```bash
//! # January 2024 daily bars
//! eodfeed history NYSE IBM --start 2024-01-01 --end 2024-01-31
//!
//! # Two symbols merged by timestamp
//! eodfeed stream NYSE:IBM NASDAQ:MSFT --start 2024-01-01
//!
//! # What is cached
//! eodfeed cache list --format table
//! ```

use std::path::PathBuf;
use std::str::FromStr;

use clap::{Args, Parser, Subcommand, ValueEnum};
use eodfeed_core::{Bound, Compression, Expiration, Period};

/// EODData market data with an incremental local cache.
///
/// Credentials are read from EODDATA_USERNAME and EODDATA_PASSWORD. Set
/// EODFEED_LOG (for example `EODFEED_LOG=debug`) to see cache decisions on
/// stderr.
#[derive(Debug, Parser)]
#[command(name = "eodfeed", author, version, about = "EODData market data CLI")]
pub struct Cli {
    /// Output format for results.
    ///
    /// - json: Single JSON document (default)
    /// - ndjson: One JSON object per row
    /// - table: Aligned columns
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Skip the local cache entirely.
    #[arg(long, global = true, default_value_t = false)]
    pub no_cache: bool,

    /// Directory holding the cache database.
    #[arg(long, global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Cache namespace; the database file is `<cache-dir>/<name>.duckdb`.
    #[arg(long, global = true, default_value = "eoddata")]
    pub name: String,

    /// Storage compression (auto, uncompressed, rle, dictionary, bitpacking, zstd).
    #[arg(long, global = true, default_value = "auto")]
    pub compression: Compression,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Aligned columns for terminal display.
    Table,
    /// Single JSON document.
    Json,
    /// Newline-delimited JSON (one object per row).
    Ndjson,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List exchanges.
    Exchanges(ExchangesArgs),
    /// List the symbols of an exchange.
    Symbols(SymbolsArgs),
    /// Fetch price history of one symbol.
    History(HistoryArgs),
    /// Stream several histories merged by timestamp as NDJSON.
    Stream(StreamArgs),
    /// Inspect or prune the local cache.
    Cache(CacheArgs),
}

#[derive(Debug, Args)]
pub struct ExchangesArgs {
    /// Reuse cached exchanges younger than this (e.g. 1d, 12h, 30 min).
    #[arg(long, default_value = "1d")]
    pub expiration: Expiration,
}

#[derive(Debug, Args)]
pub struct SymbolsArgs {
    /// Exchange code (e.g. NYSE).
    pub exchange: String,

    /// Reuse cached symbols younger than this (e.g. 1d, 12h, 30 min).
    #[arg(long, default_value = "1d")]
    pub expiration: Expiration,
}

#[derive(Debug, Args)]
pub struct WindowArgs {
    /// First date or exchange-local date-time (YYYY-MM-DD[THH:MM[:SS]]).
    #[arg(long)]
    pub start: Bound,

    /// Last date or date-time; defaults to the exchange's last trade.
    #[arg(long)]
    pub end: Option<Bound>,

    /// Bar period (1min, 5min, 10min, 15min, 30min, hourly, daily, weekly,
    /// monthly, quarterly, yearly).
    #[arg(long, default_value = "daily")]
    pub period: Period,
}

#[derive(Debug, Args)]
pub struct HistoryArgs {
    /// Exchange code (e.g. NYSE).
    pub exchange: String,

    /// Symbol code (e.g. IBM).
    pub symbol: String,

    #[command(flatten)]
    pub window: WindowArgs,
}

#[derive(Debug, Args)]
pub struct StreamArgs {
    /// Instruments as EXCHANGE:SYMBOL.
    #[arg(required = true, num_args = 1..)]
    pub instruments: Vec<Instrument>,

    #[command(flatten)]
    pub window: WindowArgs,
}

#[derive(Debug, Args)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub command: CacheCommand,
}

#[derive(Debug, Subcommand)]
pub enum CacheCommand {
    /// List cache entries with their kind, row count and write time.
    List,
    /// Delete one cache entry.
    Remove {
        /// Entry key as shown by `cache list`.
        key: String,
    },
}

/// `EXCHANGE:SYMBOL` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instrument {
    pub exchange: String,
    pub symbol: String,
}

impl FromStr for Instrument {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.split_once(':') {
            Some((exchange, symbol))
                if !exchange.trim().is_empty() && !symbol.trim().is_empty() =>
            {
                Ok(Self {
                    exchange: exchange.trim().to_owned(),
                    symbol: symbol.trim().to_owned(),
                })
            }
            _ => Err(format!("expected EXCHANGE:SYMBOL, got '{value}'")),
        }
    }
}
