//! Public entry point.
//!
//! [`DataReader`] picks the uncached [`Manager`] or the [`CachedManager`]
//! according to [`ReaderConfig`] and exposes history both as a whole series
//! and as a lazy row stream.

use chrono::DateTime;
use chrono_tz::Tz;
use eodfeed_warehouse::{Warehouse, WarehouseConfig};
use tracing::debug;

use crate::cached::{CachedManager, UncoveredWindowPolicy};
use crate::domain::{Bar, BarFields, Bound, ExchangeTable, HistorySeries, Period, SymbolTable};
use crate::manager::{HistoryRequest, Manager, MarketData};
use crate::remote::{EodDataClient, RemoteSource};
use crate::stream::{EventSource, Interleave};
use crate::{Error, Expiration};

/// Where fetched data is kept between calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheBackend {
    /// Every call goes to the remote source.
    None,
    /// DuckDB cache described by [`ReaderConfig::warehouse`].
    #[default]
    Persistent,
}

/// Reader configuration.
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    pub backend: CacheBackend,
    pub warehouse: WarehouseConfig,
    /// Expiration for exchange and symbol lookups made on behalf of history
    /// requests. `None` keeps them forever.
    pub metadata_expiration: Option<Expiration>,
    pub uncovered_window: UncoveredWindowPolicy,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::default(),
            warehouse: WarehouseConfig::default(),
            metadata_expiration: Some(Expiration::ONE_DAY),
            uncovered_window: UncoveredWindowPolicy::default(),
        }
    }
}

impl ReaderConfig {
    pub fn uncached() -> Self {
        Self {
            backend: CacheBackend::None,
            ..Self::default()
        }
    }

    pub fn persistent(warehouse: WarehouseConfig) -> Self {
        Self {
            backend: CacheBackend::Persistent,
            warehouse,
            ..Self::default()
        }
    }
}

/// History request facade over a plain or cache-aware manager.
pub struct DataReader {
    source: Box<dyn MarketData>,
}

impl DataReader {
    /// Reader over the EODData service using credentials from the
    /// environment.
    pub fn from_env(config: ReaderConfig) -> Result<Self, Error> {
        Self::with_remote(EodDataClient::from_env()?, config)
    }

    pub fn with_remote<R>(remote: R, config: ReaderConfig) -> Result<Self, Error>
    where
        R: RemoteSource + 'static,
    {
        let manager = Manager::new(remote);
        let source: Box<dyn MarketData> = match config.backend {
            CacheBackend::None => Box::new(manager),
            CacheBackend::Persistent => {
                let warehouse = Warehouse::open(config.warehouse)?;
                debug!(path = %warehouse.db_path().display(), "using persistent cache");
                Box::new(
                    CachedManager::new(manager, warehouse)
                        .with_metadata_expiration(config.metadata_expiration)
                        .with_uncovered_window(config.uncovered_window),
                )
            }
        };
        Ok(Self { source })
    }

    pub fn exchanges(&self, expiration: Option<Expiration>) -> Result<ExchangeTable, Error> {
        self.source.exchanges(expiration)
    }

    pub fn symbols(
        &self,
        exchange: &str,
        expiration: Option<Expiration>,
    ) -> Result<SymbolTable, Error> {
        self.source.symbols(exchange, expiration)
    }

    /// History of `symbol` on `exchange` over `[start, end]`.
    pub fn history(
        &self,
        exchange: &str,
        symbol: &str,
        start: Bound,
        end: Option<Bound>,
        period: Period,
    ) -> Result<HistorySeries, Error> {
        let request = HistoryRequest::new(exchange, symbol, start)?
            .with_end(end)
            .with_period(period);
        self.source.history(&request)
    }

    /// Lazy `(timestamp, fields)` rows of a history request. The fetch runs
    /// on the first pull; every call starts a fresh fetch.
    pub fn stream_history(
        &self,
        exchange: &str,
        symbol: &str,
        start: Bound,
        end: Option<Bound>,
        period: Period,
    ) -> Result<HistoryStream<'_>, Error> {
        let request = HistoryRequest::new(exchange, symbol, start)?
            .with_end(end)
            .with_period(period);
        Ok(HistoryStream::new(self.source.as_ref(), request))
    }

    /// Several histories merged by timestamp into one event stream.
    pub fn stream_many(
        &self,
        instruments: &[(&str, &str)],
        start: Bound,
        end: Option<Bound>,
        period: Period,
    ) -> Result<Interleave<EventSource<'_>>, Error> {
        let mut sources = Vec::with_capacity(instruments.len());
        for (exchange, symbol) in instruments {
            let stream = self.stream_history(exchange, symbol, start, end, period)?;
            sources.push(EventSource::new(stream));
        }
        Ok(Interleave::new(sources))
    }
}

enum StreamState {
    Pending,
    Streaming(std::vec::IntoIter<Bar>),
    Finished,
}

/// Lazy row iterator over one history request.
pub struct HistoryStream<'a> {
    source: &'a dyn MarketData,
    request: HistoryRequest,
    state: StreamState,
}

impl<'a> HistoryStream<'a> {
    pub fn new(source: &'a dyn MarketData, request: HistoryRequest) -> Self {
        Self {
            source,
            request,
            state: StreamState::Pending,
        }
    }

    pub fn request(&self) -> &HistoryRequest {
        &self.request
    }
}

impl Iterator for HistoryStream<'_> {
    type Item = Result<(DateTime<Tz>, BarFields), Error>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match &mut self.state {
                StreamState::Pending => match self.source.history(&self.request) {
                    Ok(series) => {
                        self.state = StreamState::Streaming(series.into_bars().into_iter());
                    }
                    Err(error) => {
                        self.state = StreamState::Finished;
                        return Some(Err(error));
                    }
                },
                StreamState::Streaming(bars) => match bars.next() {
                    Some(bar) => return Some(Ok((bar.ts, bar.fields))),
                    None => {
                        self.state = StreamState::Finished;
                        return None;
                    }
                },
                StreamState::Finished => return None,
            }
        }
    }
}
