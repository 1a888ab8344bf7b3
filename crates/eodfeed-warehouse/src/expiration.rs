//! Expiration windows for cached entries.

use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

const SECOND: u64 = 1;
const MINUTE: u64 = 60 * SECOND;
const HOUR: u64 = 60 * MINUTE;
const DAY: u64 = 24 * HOUR;

/// Invalid expiration literal.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid expiration '{value}', expected <n><unit> with unit s, m, h or d (e.g. '1d', '30 min')")]
pub struct ParseExpirationError {
    pub value: String,
}

/// How long a cache entry stays fresh after it was written.
///
/// `Option<Expiration>::None` is used throughout the workspace to mean
/// "cached forever, never refetch".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Expiration(Duration);

impl Expiration {
    pub const ONE_DAY: Self = Self(Duration::from_secs(DAY));

    pub const fn new(duration: Duration) -> Self {
        Self(duration)
    }

    pub const fn from_secs(secs: u64) -> Self {
        Self(Duration::from_secs(secs))
    }

    pub const fn as_duration(self) -> Duration {
        self.0
    }
}

impl Default for Expiration {
    fn default() -> Self {
        Self::ONE_DAY
    }
}

impl From<Duration> for Expiration {
    fn from(value: Duration) -> Self {
        Self(value)
    }
}

impl Display for Expiration {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let secs = self.0.as_secs();
        if secs > 0 && secs % DAY == 0 {
            write!(f, "{}d", secs / DAY)
        } else if secs > 0 && secs % HOUR == 0 {
            write!(f, "{}h", secs / HOUR)
        } else if secs > 0 && secs % MINUTE == 0 {
            write!(f, "{}m", secs / MINUTE)
        } else {
            write!(f, "{secs}s")
        }
    }
}

impl FromStr for Expiration {
    type Err = ParseExpirationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let error = || ParseExpirationError {
            value: value.to_owned(),
        };

        let trimmed = value.trim();
        let split = trimmed
            .find(|ch: char| !ch.is_ascii_digit())
            .ok_or_else(error)?;
        let (amount, unit) = trimmed.split_at(split);
        let amount: u64 = amount.parse().map_err(|_| error())?;

        let scale = match unit.trim().to_ascii_lowercase().as_str() {
            "s" | "sec" | "secs" | "second" | "seconds" => SECOND,
            "m" | "min" | "mins" | "minute" | "minutes" => MINUTE,
            "h" | "hr" | "hrs" | "hour" | "hours" => HOUR,
            "d" | "day" | "days" => DAY,
            _ => return Err(error()),
        };

        amount
            .checked_mul(scale)
            .map(|secs| Self(Duration::from_secs(secs)))
            .ok_or_else(error)
    }
}
