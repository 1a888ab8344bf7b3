//! Uncached market data orchestration.
//!
//! [`Manager`] turns raw records from a [`RemoteSource`] into typed tables
//! and timezone-aware history. History requests are resolved against a
//! catalog ([`MarketData`]) for exchange and symbol metadata, which lets the
//! cache-aware manager reuse the same window logic with cached metadata.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use chrono::NaiveDateTime;
use chrono_tz::Tz;
use tracing::{debug, info, warn};

use crate::domain::{
    clamp_end, exchange_code, symbol_code, Bar, BarFields, Bound, CacheKey, Exchange,
    ExchangeTable, HistorySeries, Period, SymbolInfo, SymbolTable,
};
use crate::remote::{RawExchange, RemoteSource};
use crate::timezone::{localize, now_in, TimezoneResolver};
use crate::{Error, Expiration, ValidationError};

/// Market data operations shared by the plain and cache-aware managers.
pub trait MarketData {
    /// All exchanges keyed by code.
    fn exchanges(&self, expiration: Option<Expiration>) -> Result<ExchangeTable, Error>;

    /// Symbols listed on `exchange`.
    fn symbols(&self, exchange: &str, expiration: Option<Expiration>)
        -> Result<SymbolTable, Error>;

    /// Price history for `request`, stamped in the exchange timezone.
    fn history(&self, request: &HistoryRequest) -> Result<HistorySeries, Error>;
}

/// History request as given by a caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRequest {
    pub exchange: String,
    pub symbol: String,
    pub start: Bound,
    pub end: Option<Bound>,
    pub period: Period,
}

impl HistoryRequest {
    pub fn new(exchange: &str, symbol: &str, start: Bound) -> Result<Self, ValidationError> {
        Ok(Self {
            exchange: exchange_code(exchange)?,
            symbol: symbol_code(symbol)?,
            start,
            end: None,
            period: Period::Daily,
        })
    }

    pub fn with_end(mut self, end: Option<Bound>) -> Self {
        self.end = end;
        self
    }

    pub fn with_period(mut self, period: Period) -> Self {
        self.period = period;
        self
    }

    /// Normalized copy, rejecting bad codes and inverted windows.
    pub fn validated(&self) -> Result<Self, ValidationError> {
        if let Some(end) = self.end {
            if end.upper_extent() < self.start.lower_extent() {
                return Err(ValidationError::InvertedRange {
                    start: self.start.to_string(),
                    end: end.to_string(),
                });
            }
        }

        Ok(Self {
            exchange: exchange_code(&self.exchange)?,
            symbol: symbol_code(&self.symbol)?,
            ..self.clone()
        })
    }
}

/// A history request resolved against exchange metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryWindow {
    pub exchange: String,
    pub symbol: String,
    pub period: Period,
    pub timezone: Tz,
    pub start: Bound,
    /// Requested end after clamping to the exchange's last trade.
    pub end: Option<Bound>,
}

impl HistoryWindow {
    pub fn cache_key(&self) -> CacheKey {
        CacheKey::history(&self.exchange, &self.symbol, self.period)
    }

    /// Upper edge used when selecting cached rows: the end, or "now" at the
    /// exchange when the request is open-ended.
    pub fn search_end(&self) -> Bound {
        self.end
            .unwrap_or_else(|| Bound::DateTime(now_in(self.timezone)))
    }

    pub fn empty_series(&self) -> HistorySeries {
        HistorySeries::empty(
            self.exchange.clone(),
            self.symbol.clone(),
            self.period,
            self.timezone,
        )
    }
}

/// Outcome of resolving a request.
#[derive(Debug, Clone, PartialEq)]
pub enum Prepared {
    /// Nothing to fetch: the symbol is not listed, or the window starts
    /// after the exchange's last trade.
    Empty(HistorySeries),
    Ready(HistoryWindow),
}

/// Talks to the remote source and shapes its records.
pub struct Manager<R> {
    remote: R,
    resolver: TimezoneResolver,
    last_trade_marks: Mutex<BTreeMap<String, NaiveDateTime>>,
}

impl<R: RemoteSource> Manager<R> {
    pub fn new(remote: R) -> Self {
        Self::with_resolver(remote, TimezoneResolver::default())
    }

    pub fn with_resolver(remote: R, resolver: TimezoneResolver) -> Self {
        Self {
            remote,
            resolver,
            last_trade_marks: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    pub fn resolver(&self) -> &TimezoneResolver {
        &self.resolver
    }

    /// Validate `request`, resolve its timezone and clamp its end using the
    /// metadata in `catalog`.
    pub fn prepare(
        &self,
        catalog: &dyn MarketData,
        request: &HistoryRequest,
        metadata_expiration: Option<Expiration>,
    ) -> Result<Prepared, Error> {
        let request = request.validated()?;

        let exchanges = catalog.exchanges(metadata_expiration)?;
        let timezone = self.resolver.resolve(&exchanges, &request.exchange)?;

        let symbols = catalog.symbols(&request.exchange, metadata_expiration)?;
        if !symbols.contains(&request.symbol) {
            debug!(
                exchange = %request.exchange,
                symbol = %request.symbol,
                "symbol not listed, returning empty history"
            );
            return Ok(Prepared::Empty(HistorySeries::empty(
                request.exchange,
                request.symbol,
                request.period,
                timezone,
            )));
        }

        let reported = exchanges
            .get(&request.exchange)
            .and_then(|exchange| exchange.last_trade);
        let last_trade = self.observed_last_trade(&request.exchange, reported);
        let end = clamp_end(request.end, last_trade);
        if end != request.end {
            debug!(
                exchange = %request.exchange,
                requested = ?request.end.map(|bound| bound.to_string()),
                clamped = ?end.map(|bound| bound.to_string()),
                "clamped end to last trade"
            );
        }
        if let Some(end) = end.filter(|end| end.upper_extent() < request.start.lower_extent()) {
            debug!(
                exchange = %request.exchange,
                symbol = %request.symbol,
                start = %request.start,
                last_trade = %end,
                "window starts after last trade, returning empty history"
            );
            return Ok(Prepared::Empty(HistorySeries::empty(
                request.exchange,
                request.symbol,
                request.period,
                timezone,
            )));
        }

        Ok(Prepared::Ready(HistoryWindow {
            exchange: request.exchange,
            symbol: request.symbol,
            period: request.period,
            timezone,
            start: request.start,
            end,
        }))
    }

    /// Fetch `[start, end]` of `window` from the remote source.
    ///
    /// Bars past `end` are dropped; the remote side sometimes appends one
    /// extra trailing period.
    pub fn fetch_window(
        &self,
        window: &HistoryWindow,
        start: &Bound,
        end: Option<&Bound>,
    ) -> Result<HistorySeries, Error> {
        let raw = self.remote.history(
            &window.exchange,
            &window.symbol,
            start.date(),
            end.map(Bound::date),
            window.period,
        )?;

        if raw.is_empty() {
            debug!(key = %window.cache_key(), %start, "remote returned no rows");
            return Ok(window.empty_series());
        }

        let tz = window.timezone;
        let bars = raw.into_iter().map(|bar| {
            Bar::new(
                localize(tz, bar.date_time),
                BarFields {
                    open: bar.open,
                    high: bar.high,
                    low: bar.low,
                    close: bar.close,
                    volume: bar.volume,
                    open_interest: bar.open_interest,
                },
            )
        });
        let mut series = HistorySeries::new(
            window.exchange.clone(),
            window.symbol.clone(),
            window.period,
            tz,
            bars,
        );
        if let Some(end) = end {
            series.truncate_after(end);
        }

        info!(key = %window.cache_key(), rows = series.len(), "fetched history");
        Ok(series)
    }

    fn build_exchange(&self, raw: RawExchange) -> Exchange {
        let timezone = self.resolver.vendor_timezone(&raw.timezone);
        if timezone.is_none() {
            warn!(
                exchange = %raw.code,
                label = %raw.timezone,
                "no timezone mapping for vendor label"
            );
        }

        let last_trade = self.observed_last_trade(&raw.code, raw.last_trade);
        Exchange {
            code: raw.code,
            name: raw.name,
            country: raw.country,
            currency: raw.currency,
            suffix: raw.suffix,
            timezone_label: raw.timezone,
            timezone,
            is_intraday: raw.is_intraday,
            intraday_start: raw.intraday_start,
            last_trade,
            advances: raw.advances,
            declines: raw.declines,
        }
    }

    /// Fold `reported` into the session high-water mark of `exchange` and
    /// return the mark. A value older than the mark is ignored.
    fn observed_last_trade(
        &self,
        exchange: &str,
        reported: Option<NaiveDateTime>,
    ) -> Option<NaiveDateTime> {
        let mut marks = self
            .last_trade_marks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let mark = marks.get(exchange).copied();

        match (mark, reported) {
            (Some(mark), Some(reported)) if reported < mark => {
                warn!(
                    exchange,
                    %mark,
                    %reported,
                    "last trade moved backwards, keeping the later value"
                );
                Some(mark)
            }
            (_, Some(reported)) => {
                marks.insert(exchange.to_owned(), reported);
                Some(reported)
            }
            (mark, None) => mark,
        }
    }
}

impl<R: RemoteSource> MarketData for Manager<R> {
    fn exchanges(&self, _expiration: Option<Expiration>) -> Result<ExchangeTable, Error> {
        let raw = self.remote.exchanges()?;
        info!(count = raw.len(), "fetched exchanges");
        Ok(raw
            .into_iter()
            .map(|exchange| self.build_exchange(exchange))
            .collect())
    }

    fn symbols(
        &self,
        exchange: &str,
        _expiration: Option<Expiration>,
    ) -> Result<SymbolTable, Error> {
        let exchange = exchange_code(exchange)?;
        let raw = self.remote.symbols(&exchange)?;
        info!(exchange = %exchange, count = raw.len(), "fetched symbols");
        Ok(raw
            .into_iter()
            .map(|symbol| SymbolInfo {
                code: symbol.code,
                name: symbol.name,
                long_name: symbol.long_name,
            })
            .collect())
    }

    fn history(&self, request: &HistoryRequest) -> Result<HistorySeries, Error> {
        match self.prepare(self, request, None)? {
            Prepared::Empty(series) => Ok(series),
            Prepared::Ready(window) => {
                self.fetch_window(&window, &window.start, window.end.as_ref())
            }
        }
    }
}
