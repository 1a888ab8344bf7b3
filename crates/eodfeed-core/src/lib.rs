//! # eodfeed Core
//!
//! EODData market data client with an incremental local cache.
//!
//! ## Overview
//!
//! - **Domain models** for exchanges, symbols and timezone-aware history
//! - **Remote source contract** and the EODData HTTP client behind it
//! - **Timezone resolution** from vendor labels to IANA zones
//! - **Manager** that clamps, fetches and localizes history
//! - **Cache-aware manager** that fills only the missing parts of a window
//! - **Reader** facade with lazy row streams
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`cached`] | Cache-aware manager over the DuckDB warehouse |
//! | [`domain`] | Exchanges, symbols, bars, periods, window bounds |
//! | [`error`] | Error taxonomy |
//! | [`manager`] | Uncached manager and the [`MarketData`] trait |
//! | [`reader`] | [`DataReader`] facade and [`HistoryStream`] |
//! | [`remote`] | Remote source contract and EODData client |
//! | [`stream`] | Timestamp-ordered merge of several streams |
//! | [`timezone`] | Vendor timezone labels and DST-safe localization |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use eodfeed_core::{Bound, DataReader, Period, ReaderConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let reader = DataReader::from_env(ReaderConfig::default())?;
//!     let series = reader.history(
//!         "NYSE",
//!         "IBM",
//!         "2024-01-01".parse::<Bound>()?,
//!         Some("2024-01-31".parse::<Bound>()?),
//!         Period::Daily,
//!     )?;
//!
//!     for bar in &series {
//!         println!("{} close {:.2}", bar.ts, bar.fields.close);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │   DataReader    │
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │  CachedManager  │────▶│    Warehouse     │
//! └────────┬────────┘     │    (DuckDB)      │
//!          │              └──────────────────┘
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │     Manager     │────▶│ TimezoneResolver │
//! └────────┬────────┘     └──────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │  RemoteSource   │────▶│ HTTP Client      │
//! │ (EodDataClient) │     │ (reqwest)        │
//! └─────────────────┘     └──────────────────┘
//! ```
//!
//! ## Errors and retries
//!
//! Nothing in this crate retries. Remote failures surface as
//! [`Error::RemoteRequest`] or [`Error::Authentication`] with the raw
//! response attached; cache failures surface as [`Error::CacheIo`].
//!
//! ## Concurrency
//!
//! All calls block. A cache namespace supports a single writer; see the
//! `eodfeed-warehouse` crate docs.

pub mod cached;
pub mod domain;
pub mod error;
pub mod manager;
pub mod reader;
pub mod remote;
pub mod stream;
pub mod timezone;

// Domain models
pub use domain::{
    Bar, BarFields, Bound, CacheKey, Exchange, ExchangeTable, HistorySeries, Period, SymbolInfo,
    SymbolTable,
};

// Error types
pub use error::{Error, GapSide, ResolutionError, Result, ValidationError};

// Managers
pub use cached::{CachedManager, UncoveredWindowPolicy};
pub use manager::{HistoryRequest, HistoryWindow, Manager, MarketData, Prepared};

// Facade
pub use reader::{CacheBackend, DataReader, HistoryStream, ReaderConfig};
pub use stream::{BarEvent, EventSource, Interleave};

// Remote source
pub use remote::{
    Credentials, EodDataClient, HttpClient, HttpError, HttpRequest, HttpResponse, RawBar,
    RawExchange, RawSymbol, RemoteSource, ReqwestHttpClient, Session,
};

pub use timezone::TimezoneResolver;

// Warehouse (re-exported from eodfeed-warehouse)
pub use eodfeed_warehouse::{
    Compression, EntrySummary, Expiration, ParseExpirationError, Warehouse, WarehouseConfig,
    WarehouseError,
};
