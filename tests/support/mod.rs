//! Shared fixtures: a scripted remote source and cache helpers.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{Datelike, NaiveDate, NaiveDateTime, Weekday};
use eodfeed_core::{
    CachedManager, Error, Manager, Period, RawBar, RawExchange, RawSymbol, RemoteSource,
    Warehouse, WarehouseConfig,
};
use tempfile::TempDir;

const HOLIDAYS: [(i32, u32, u32); 2] = [(2024, 1, 1), (2024, 1, 15)];

/// One recorded `history` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryCall {
    pub exchange: String,
    pub symbol: String,
    pub start: NaiveDate,
    pub end: Option<NaiveDate>,
    pub period: Period,
}

#[derive(Debug, Default)]
struct MockState {
    exchanges: Vec<RawExchange>,
    symbols: BTreeMap<String, Vec<RawSymbol>>,
    bars: BTreeMap<(String, String), Vec<RawBar>>,
    trailing_extra: bool,
    fail_history: Option<String>,
    exchange_calls: usize,
    symbol_calls: usize,
    history_calls: Vec<HistoryCall>,
}

/// In-memory remote source that serves scripted data and records calls.
#[derive(Debug, Default)]
pub struct MockRemote {
    state: Mutex<MockState>,
}

impl MockRemote {
    /// NYSE (Eastern time) listing ABC and XYZ with trading-day bars from
    /// 2024-01-02 through 2024-06-28, last trade at `last_trade`.
    pub fn nyse(last_trade: NaiveDateTime) -> Arc<Self> {
        let remote = Arc::new(Self::default());
        remote.set_exchanges(vec![exchange(
            "NYSE",
            "Eastern Standard Time",
            Some(last_trade),
        )]);
        remote.set_symbols("NYSE", &["ABC", "XYZ"]);
        let (from, to) = (date(2024, 1, 2), date(2024, 6, 28));
        remote.set_bars("NYSE", "ABC", daily_bars("ABC", from, to, 0.0));
        remote.set_bars("NYSE", "XYZ", daily_bars("XYZ", from, to, 500.0));
        remote
    }

    pub fn set_exchanges(&self, exchanges: Vec<RawExchange>) {
        self.lock().exchanges = exchanges;
    }

    pub fn set_symbols(&self, exchange: &str, codes: &[&str]) {
        let symbols = codes
            .iter()
            .map(|code| RawSymbol {
                code: (*code).to_owned(),
                name: format!("{code} Corp"),
                long_name: None,
            })
            .collect();
        self.lock().symbols.insert(exchange.to_owned(), symbols);
    }

    pub fn set_bars(&self, exchange: &str, symbol: &str, bars: Vec<RawBar>) {
        self.lock()
            .bars
            .insert((exchange.to_owned(), symbol.to_owned()), bars);
    }

    /// Shift every close of `symbol` by `delta`.
    pub fn reprice(&self, exchange: &str, symbol: &str, delta: f64) {
        if let Some(bars) = self
            .lock()
            .bars
            .get_mut(&(exchange.to_owned(), symbol.to_owned()))
        {
            for bar in bars {
                bar.close += delta;
            }
        }
    }

    /// Return one bar past the requested end date, like the live service
    /// occasionally does.
    pub fn with_trailing_extra(&self) {
        self.lock().trailing_extra = true;
    }

    pub fn fail_history(&self, message: &str) {
        self.lock().fail_history = Some(message.to_owned());
    }

    pub fn heal(&self) {
        self.lock().fail_history = None;
    }

    pub fn history_calls(&self) -> Vec<HistoryCall> {
        self.lock().history_calls.clone()
    }

    pub fn exchange_calls(&self) -> usize {
        self.lock().exchange_calls
    }

    pub fn symbol_calls(&self) -> usize {
        self.lock().symbol_calls
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().expect("mock state lock")
    }
}

impl RemoteSource for MockRemote {
    fn exchanges(&self) -> Result<Vec<RawExchange>, Error> {
        let mut state = self.lock();
        state.exchange_calls += 1;
        Ok(state.exchanges.clone())
    }

    fn symbols(&self, exchange: &str) -> Result<Vec<RawSymbol>, Error> {
        let mut state = self.lock();
        state.symbol_calls += 1;
        Ok(state.symbols.get(exchange).cloned().unwrap_or_default())
    }

    fn history(
        &self,
        exchange: &str,
        symbol: &str,
        start: NaiveDate,
        end: Option<NaiveDate>,
        period: Period,
    ) -> Result<Vec<RawBar>, Error> {
        let mut state = self.lock();
        state.history_calls.push(HistoryCall {
            exchange: exchange.to_owned(),
            symbol: symbol.to_owned(),
            start,
            end,
            period,
        });

        if let Some(message) = state.fail_history.clone() {
            return Err(Error::RemoteRequest {
                method: String::from("SymbolHistoryPeriodByDateRange"),
                message,
                raw: Some(String::from("<RESPONSE Message=\"Service Unavailable\" />")),
            });
        }

        let all = state
            .bars
            .get(&(exchange.to_owned(), symbol.to_owned()))
            .cloned()
            .unwrap_or_default();
        let mut selected: Vec<RawBar> = all
            .iter()
            .filter(|bar| {
                let day = bar.date_time.date();
                day >= start && end.map_or(true, |end| day <= end)
            })
            .cloned()
            .collect();

        if state.trailing_extra {
            if let Some(end) = end {
                if let Some(extra) = all.iter().find(|bar| bar.date_time.date() > end) {
                    selected.push(extra.clone());
                }
            }
        }
        Ok(selected)
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub fn midnight(y: i32, m: u32, d: u32) -> NaiveDateTime {
    date(y, m, d).and_hms_opt(0, 0, 0).expect("valid time")
}

pub fn exchange(code: &str, timezone: &str, last_trade: Option<NaiveDateTime>) -> RawExchange {
    RawExchange {
        code: code.to_owned(),
        name: format!("{code} Exchange"),
        country: Some(String::from("US")),
        currency: Some(String::from("USD")),
        suffix: None,
        timezone: timezone.to_owned(),
        is_intraday: false,
        intraday_start: None,
        last_trade,
        advances: None,
        declines: None,
    }
}

/// Weekday bars between `from` and `to`, skipping US market holidays of
/// January 2024. Closes count up from `base + 1`.
pub fn daily_bars(symbol: &str, from: NaiveDate, to: NaiveDate, base: f64) -> Vec<RawBar> {
    trading_days(from, to)
        .into_iter()
        .enumerate()
        .map(|(index, day)| {
            let close = base + index as f64 + 1.0;
            RawBar {
                symbol: symbol.to_owned(),
                date_time: day.and_hms_opt(0, 0, 0).expect("valid time"),
                open: close - 0.5,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: 1_000 + index as u64,
                open_interest: None,
            }
        })
        .collect()
}

pub fn trading_days(from: NaiveDate, to: NaiveDate) -> Vec<NaiveDate> {
    from.iter_days()
        .take_while(|day| *day <= to)
        .filter(|day| !matches!(day.weekday(), Weekday::Sat | Weekday::Sun))
        .filter(|day| {
            !HOLIDAYS
                .iter()
                .any(|(y, m, d)| *day == date(*y, *m, *d))
        })
        .collect()
}

/// A cache-aware manager over `remote` with its DuckDB file in a fresh
/// temporary directory. Keep the returned directory alive for the test.
pub fn cached_manager(remote: Arc<MockRemote>) -> (CachedManager<Arc<MockRemote>>, TempDir) {
    let temp = tempfile::tempdir().expect("tempdir");
    let warehouse = Warehouse::open(WarehouseConfig::in_dir(temp.path(), "eoddata"))
        .expect("warehouse open");
    (CachedManager::new(Manager::new(remote), warehouse), temp)
}
