//! # Domain Models
//!
//! Typed market data handled by eodfeed.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Exchange`] / [`ExchangeTable`] | Exchange metadata keyed by code |
//! | [`SymbolInfo`] / [`SymbolTable`] | Symbol listing of one exchange |
//! | [`HistorySeries`] | Unique, ascending bars for (exchange, symbol, period) |
//! | [`Bar`] / [`BarFields`] | One OHLCV observation |
//! | [`Period`] | Bar granularity with its vendor code |
//! | [`Bound`] | Exchange-local window edge (date or date-time) |
//! | [`CacheKey`] | Path-like key of a cache entry |

mod bound;
mod code;
mod models;
mod period;
mod series;

use std::fmt::{Display, Formatter};

pub use bound::{clamp_end, Bound};
pub use code::{exchange_code, symbol_code};
pub use models::{Exchange, ExchangeTable, SymbolInfo, SymbolTable};
pub use period::Period;
pub use series::{Bar, BarFields, HistorySeries};

/// Key of one cache entry: `exchanges`, `symbols/{exchange}` or
/// `history/{exchange}/{symbol}/period_{period}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn exchanges() -> Self {
        Self(String::from("exchanges"))
    }

    pub fn symbols(exchange: &str) -> Self {
        Self(format!("symbols/{exchange}"))
    }

    pub fn history(exchange: &str, symbol: &str, period: Period) -> Self {
        Self(format!("history/{exchange}/{symbol}/period_{period}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_keys_follow_path_layout() {
        assert_eq!(CacheKey::exchanges().as_str(), "exchanges");
        assert_eq!(CacheKey::symbols("NYSE").as_str(), "symbols/NYSE");
        assert_eq!(
            CacheKey::history("NYSE", "ABC", Period::Daily).as_str(),
            "history/NYSE/ABC/period_daily"
        );
    }
}
