//! Cache-aware market data.
//!
//! Exchanges and symbols are cached wholesale and refetched once stale.
//! History entries are extended incrementally:
//!
//! ```text
//!   request        [start ..................................... end]
//!   cached                 [first ............. last]
//!   front fill     [start .. first]
//!   back fill                                   [last ......... end]
//! ```
//!
//! Fetched rows are merged into the full cached series with the newly
//! fetched values winning on equal timestamps, and the merged series is
//! written back before the selected window is returned.

use eodfeed_warehouse::{BarRecord, ExchangeRecord, SymbolRecord, Warehouse};
use tracing::{debug, info};

use crate::domain::{Bound, CacheKey, Exchange, ExchangeTable, HistorySeries, SymbolTable};
use crate::manager::{HistoryRequest, HistoryWindow, Manager, MarketData, Prepared};
use crate::remote::RemoteSource;
use crate::{Error, Expiration, GapSide};

/// What to do when a history entry exists but none of its rows fall inside
/// the requested window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UncoveredWindowPolicy {
    /// Return the empty selection without contacting the remote source.
    #[default]
    ReturnEmpty,
    /// Treat the request as a cache miss and fetch the whole window.
    Refetch,
}

/// [`Manager`] backed by a [`Warehouse`].
pub struct CachedManager<R> {
    manager: Manager<R>,
    warehouse: Warehouse,
    metadata_expiration: Option<Expiration>,
    uncovered_window: UncoveredWindowPolicy,
}

impl<R: RemoteSource> CachedManager<R> {
    pub fn new(manager: Manager<R>, warehouse: Warehouse) -> Self {
        Self {
            manager,
            warehouse,
            metadata_expiration: Some(Expiration::ONE_DAY),
            uncovered_window: UncoveredWindowPolicy::default(),
        }
    }

    /// Expiration applied to the exchange and symbol lookups made while
    /// resolving history requests.
    pub fn with_metadata_expiration(mut self, expiration: Option<Expiration>) -> Self {
        self.metadata_expiration = expiration;
        self
    }

    pub fn with_uncovered_window(mut self, policy: UncoveredWindowPolicy) -> Self {
        self.uncovered_window = policy;
        self
    }

    pub fn manager(&self) -> &Manager<R> {
        &self.manager
    }

    pub fn warehouse(&self) -> &Warehouse {
        &self.warehouse
    }

    fn cached_exchanges(&self, key: &CacheKey) -> Result<Option<ExchangeTable>, Error> {
        let Some(records) = self.warehouse.read::<Vec<ExchangeRecord>>(key.as_str())? else {
            return Ok(None);
        };

        let resolver = self.manager.resolver();
        let mut exchanges = Vec::with_capacity(records.len());
        for record in records {
            let timezone = resolver.vendor_timezone(&record.timezone);
            exchanges.push(Exchange::from_record(key.as_str(), record, timezone)?);
        }
        Ok(Some(exchanges.into_iter().collect()))
    }

    fn cached_history(
        &self,
        key: &CacheKey,
        window: &HistoryWindow,
    ) -> Result<Option<HistorySeries>, Error> {
        let Some(records) = self.warehouse.read::<Vec<BarRecord>>(key.as_str())? else {
            return Ok(None);
        };

        Ok(Some(HistorySeries::from_records(
            key.as_str(),
            window.exchange.clone(),
            window.symbol.clone(),
            window.period,
            window.timezone,
            records,
        )?))
    }

    /// Fetch the whole window and persist it, merging into whatever the
    /// entry already holds.
    fn fetch_and_store(
        &self,
        key: &CacheKey,
        window: &HistoryWindow,
    ) -> Result<HistorySeries, Error> {
        let fetched = self
            .manager
            .fetch_window(window, &window.start, window.end.as_ref())?;
        if fetched.is_empty() {
            debug!(%key, "nothing fetched, cache left untouched");
            return Ok(fetched);
        }

        let base = self
            .cached_history(key, window)?
            .unwrap_or_else(|| window.empty_series());
        self.store_merged(key, &base, &fetched)?;
        Ok(fetched)
    }

    fn store_merged(
        &self,
        key: &CacheKey,
        base: &HistorySeries,
        fetched: &HistorySeries,
    ) -> Result<HistorySeries, Error> {
        let merged = base.merge(fetched);
        self.warehouse.write(key.as_str(), &merged.to_records())?;
        info!(
            %key,
            fetched = fetched.len(),
            total = merged.len(),
            "merged history into cache"
        );
        Ok(merged)
    }

    /// Fetch `[start, end]`, merge it into `full` and `selected`. A failed
    /// fetch becomes [`Error::GapFill`] carrying `selected`.
    fn fill_gap(
        &self,
        side: GapSide,
        key: &CacheKey,
        window: &HistoryWindow,
        range: (&Bound, &Bound),
        full: &mut HistorySeries,
        selected: &mut HistorySeries,
    ) -> Result<(), Error> {
        let (start, end) = range;
        debug!(%key, %side, %start, %end, "filling gap");

        let fetched = match self.manager.fetch_window(window, start, Some(end)) {
            Ok(fetched) => fetched,
            Err(source) => {
                return Err(Error::GapFill {
                    side,
                    partial: Box::new(selected.clone()),
                    source: Box::new(source),
                });
            }
        };

        if !fetched.is_empty() {
            *full = self.store_merged(key, full, &fetched)?;
            *selected = selected.merge(&fetched);
        }
        Ok(())
    }
}

impl<R: RemoteSource> MarketData for CachedManager<R> {
    fn exchanges(&self, expiration: Option<Expiration>) -> Result<ExchangeTable, Error> {
        let key = CacheKey::exchanges();
        if self.warehouse.is_fresh(key.as_str(), expiration)? {
            if let Some(exchanges) = self.cached_exchanges(&key)? {
                debug!(%key, "cache hit");
                return Ok(exchanges);
            }
        }

        debug!(%key, "cache stale or missing, refreshing");
        let exchanges = self.manager.exchanges(expiration)?;
        self.warehouse.write(key.as_str(), &exchanges.to_records())?;
        Ok(exchanges)
    }

    fn symbols(
        &self,
        exchange: &str,
        expiration: Option<Expiration>,
    ) -> Result<SymbolTable, Error> {
        let exchange = crate::domain::exchange_code(exchange)?;
        let key = CacheKey::symbols(&exchange);
        if self.warehouse.is_fresh(key.as_str(), expiration)? {
            if let Some(records) = self.warehouse.read::<Vec<SymbolRecord>>(key.as_str())? {
                debug!(%key, "cache hit");
                return Ok(SymbolTable::from(records));
            }
        }

        debug!(%key, "cache stale or missing, refreshing");
        let symbols = self.manager.symbols(&exchange, expiration)?;
        self.warehouse.write(key.as_str(), &symbols.to_records())?;
        Ok(symbols)
    }

    fn history(&self, request: &HistoryRequest) -> Result<HistorySeries, Error> {
        let window = match self.manager.prepare(self, request, self.metadata_expiration)? {
            Prepared::Empty(series) => return Ok(series),
            Prepared::Ready(window) => window,
        };
        let key = window.cache_key();

        let Some(mut full) = self.cached_history(&key, &window)? else {
            debug!(%key, "cache miss");
            return self.fetch_and_store(&key, &window);
        };

        let search_end = window.search_end();
        let mut selected = full.select(&window.start, Some(&search_end));
        if selected.is_empty() {
            debug!(%key, policy = ?self.uncovered_window, "cached entry does not cover window");
            return match self.uncovered_window {
                UncoveredWindowPolicy::ReturnEmpty => Ok(selected),
                UncoveredWindowPolicy::Refetch => self.fetch_and_store(&key, &window),
            };
        }

        let front = selected
            .first()
            .filter(|bar| bar.ts.date_naive() > window.start.date())
            .map(|bar| Bound::DateTime(bar.ts.naive_local()));
        if let Some(first) = front {
            self.fill_gap(
                GapSide::Front,
                &key,
                &window,
                (&window.start, &first),
                &mut full,
                &mut selected,
            )?;
        }

        let back = selected
            .last()
            .filter(|bar| bar.ts.date_naive() < search_end.date())
            .map(|bar| Bound::DateTime(bar.ts.naive_local()));
        if let Some(last) = back {
            self.fill_gap(
                GapSide::Back,
                &key,
                &window,
                (&last, &search_end),
                &mut full,
                &mut selected,
            )?;
        }

        Ok(selected.select(&window.start, Some(&search_end)))
    }
}
