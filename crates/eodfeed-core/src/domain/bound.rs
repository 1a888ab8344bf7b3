use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::ValidationError;

const DATE_TIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Exchange-local edge of a history window.
///
/// A calendar date matches any time on that date; a date-time matches
/// instants on or past (or up to) the given wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Bound {
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl Bound {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
            return Ok(Self::Date(date));
        }

        DATE_TIME_FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
            .map(Self::DateTime)
            .ok_or_else(|| ValidationError::InvalidBound {
                value: input.to_owned(),
            })
    }

    /// Calendar date of the bound.
    pub fn date(&self) -> NaiveDate {
        match self {
            Self::Date(date) => *date,
            Self::DateTime(date_time) => date_time.date(),
        }
    }

    /// Earliest wall-clock time the bound covers.
    pub fn lower_extent(&self) -> NaiveDateTime {
        match self {
            Self::Date(date) => date.and_time(NaiveTime::default()),
            Self::DateTime(date_time) => *date_time,
        }
    }

    /// Latest wall-clock time the bound covers.
    pub fn upper_extent(&self) -> NaiveDateTime {
        match self {
            Self::Date(date) => date
                .and_hms_micro_opt(23, 59, 59, 999_999)
                .unwrap_or_else(|| date.and_time(NaiveTime::default())),
            Self::DateTime(date_time) => *date_time,
        }
    }

    /// Whether `local` lies on or after this bound used as a window start.
    pub fn admits_from(&self, local: NaiveDateTime) -> bool {
        match self {
            Self::Date(date) => local.date() >= *date,
            Self::DateTime(date_time) => local >= *date_time,
        }
    }

    /// Whether `local` lies on or before this bound used as a window end.
    pub fn admits_until(&self, local: NaiveDateTime) -> bool {
        match self {
            Self::Date(date) => local.date() <= *date,
            Self::DateTime(date_time) => local <= *date_time,
        }
    }
}

/// Clamp a requested window end to the exchange's last posted trade.
///
/// A missing end becomes the last trade itself; an end reaching past the
/// last trade is pulled back to it. Without a last trade nothing changes.
pub fn clamp_end(end: Option<Bound>, last_trade: Option<NaiveDateTime>) -> Option<Bound> {
    let Some(last_trade) = last_trade else {
        return end;
    };

    match end {
        None => Some(Bound::DateTime(last_trade)),
        Some(end) if end.upper_extent() > last_trade => Some(Bound::DateTime(last_trade)),
        Some(end) => Some(end),
    }
}

impl Display for Bound {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Date(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            Self::DateTime(date_time) => write!(f, "{}", date_time.format("%Y-%m-%dT%H:%M:%S")),
        }
    }
}

impl FromStr for Bound {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl From<NaiveDate> for Bound {
    fn from(value: NaiveDate) -> Self {
        Self::Date(value)
    }
}

impl From<NaiveDateTime> for Bound {
    fn from(value: NaiveDateTime) -> Self {
        Self::DateTime(value)
    }
}

impl TryFrom<String> for Bound {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Bound> for String {
    fn from(value: Bound) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(value: &str) -> NaiveDate {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").expect("date")
    }

    fn at(value: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S").expect("date time")
    }

    #[test]
    fn parses_dates_and_date_times() {
        assert_eq!(Bound::parse("2024-01-05"), Ok(Bound::Date(date("2024-01-05"))));
        assert_eq!(
            Bound::parse("2024-01-05T09:30"),
            Ok(Bound::DateTime(at("2024-01-05T09:30:00")))
        );
        assert_eq!(
            Bound::parse("2024-01-05 16:00:00"),
            Ok(Bound::DateTime(at("2024-01-05T16:00:00")))
        );
        assert!(Bound::parse("05/01/2024").is_err());
    }

    #[test]
    fn date_bound_matches_whole_day() {
        let bound = Bound::Date(date("2024-01-05"));

        assert!(bound.admits_from(at("2024-01-05T00:00:00")));
        assert!(bound.admits_until(at("2024-01-05T23:59:00")));
        assert!(!bound.admits_from(at("2024-01-04T23:59:59")));
        assert!(!bound.admits_until(at("2024-01-06T00:00:00")));
    }

    #[test]
    fn date_time_bound_is_inclusive() {
        let bound = Bound::DateTime(at("2024-01-05T12:00:00"));

        assert!(bound.admits_until(at("2024-01-05T12:00:00")));
        assert!(!bound.admits_until(at("2024-01-05T12:00:01")));
        assert!(bound.admits_from(at("2024-01-05T12:00:00")));
    }

    #[test]
    fn clamps_end_to_last_trade() {
        let last_trade = at("2024-06-10T00:00:00");

        assert_eq!(
            clamp_end(Some(Bound::Date(date("2024-06-15"))), Some(last_trade)),
            Some(Bound::DateTime(last_trade))
        );
        assert_eq!(
            clamp_end(None, Some(last_trade)),
            Some(Bound::DateTime(last_trade))
        );
        assert_eq!(
            clamp_end(Some(Bound::Date(date("2024-06-01"))), Some(last_trade)),
            Some(Bound::Date(date("2024-06-01")))
        );
        assert_eq!(clamp_end(None, None), None);
    }
}
