//! Exchange timezone resolution.
//!
//! EODData reports Windows-style timezone labels ("Eastern Standard Time").
//! [`TimezoneResolver`] translates them to IANA zones through a fixed table
//! that callers may extend.

use std::collections::BTreeMap;

use chrono::{DateTime, LocalResult, NaiveDateTime, Offset, TimeZone};
use chrono_tz::Tz;

use crate::domain::ExchangeTable;
use crate::ResolutionError;

const VENDOR_TIMEZONES: &[(&str, Tz)] = &[
    ("Eastern Standard Time", Tz::America__New_York),
    ("US Eastern Standard Time", Tz::America__Indiana__Indianapolis),
    ("Central Standard Time", Tz::America__Chicago),
    ("Mountain Standard Time", Tz::America__Denver),
    ("Pacific Standard Time", Tz::America__Los_Angeles),
    ("Atlantic Standard Time", Tz::America__Halifax),
    ("Canada Central Standard Time", Tz::America__Regina),
    ("E. South America Standard Time", Tz::America__Sao_Paulo),
    ("Argentina Standard Time", Tz::America__Argentina__Buenos_Aires),
    ("SA Pacific Standard Time", Tz::America__Bogota),
    ("Central Standard Time (Mexico)", Tz::America__Mexico_City),
    ("GMT Standard Time", Tz::Europe__London),
    ("Greenwich Standard Time", Tz::Atlantic__Reykjavik),
    ("W. Europe Standard Time", Tz::Europe__Berlin),
    ("Romance Standard Time", Tz::Europe__Paris),
    ("Central Europe Standard Time", Tz::Europe__Budapest),
    ("Central European Standard Time", Tz::Europe__Warsaw),
    ("E. Europe Standard Time", Tz::Europe__Chisinau),
    ("FLE Standard Time", Tz::Europe__Helsinki),
    ("GTB Standard Time", Tz::Europe__Bucharest),
    ("Russian Standard Time", Tz::Europe__Moscow),
    ("South Africa Standard Time", Tz::Africa__Johannesburg),
    ("Egypt Standard Time", Tz::Africa__Cairo),
    ("Israel Standard Time", Tz::Asia__Jerusalem),
    ("Arabian Standard Time", Tz::Asia__Dubai),
    ("Arab Standard Time", Tz::Asia__Riyadh),
    ("India Standard Time", Tz::Asia__Kolkata),
    ("China Standard Time", Tz::Asia__Shanghai),
    ("Taipei Standard Time", Tz::Asia__Taipei),
    ("Singapore Standard Time", Tz::Asia__Singapore),
    ("Tokyo Standard Time", Tz::Asia__Tokyo),
    ("Korea Standard Time", Tz::Asia__Seoul),
    ("SE Asia Standard Time", Tz::Asia__Bangkok),
    ("AUS Eastern Standard Time", Tz::Australia__Sydney),
    ("E. Australia Standard Time", Tz::Australia__Brisbane),
    ("W. Australia Standard Time", Tz::Australia__Perth),
    ("New Zealand Standard Time", Tz::Pacific__Auckland),
    ("UTC", Tz::UTC),
    ("Coordinated Universal Time", Tz::UTC),
];

/// Maps exchange codes to timezones through their vendor labels.
#[derive(Debug, Clone)]
pub struct TimezoneResolver {
    mapping: BTreeMap<String, Tz>,
}

impl TimezoneResolver {
    pub fn new() -> Self {
        Self {
            mapping: VENDOR_TIMEZONES
                .iter()
                .map(|(label, tz)| ((*label).to_owned(), *tz))
                .collect(),
        }
    }

    /// Add or replace the zone for a vendor label.
    pub fn with_mapping(mut self, label: impl Into<String>, tz: Tz) -> Self {
        self.mapping.insert(label.into(), tz);
        self
    }

    /// Zone for a vendor label, `None` when the label is not mapped.
    pub fn vendor_timezone(&self, label: &str) -> Option<Tz> {
        self.mapping.get(label.trim()).copied()
    }

    /// Zone of `exchange` according to `exchanges`.
    pub fn resolve(
        &self,
        exchanges: &ExchangeTable,
        exchange: &str,
    ) -> Result<Tz, ResolutionError> {
        let record = exchanges
            .get(exchange)
            .ok_or_else(|| ResolutionError::UnknownExchange {
                code: exchange.to_owned(),
            })?;

        record
            .timezone
            .or_else(|| self.vendor_timezone(&record.timezone_label))
            .ok_or_else(|| ResolutionError::UnmappedTimezone {
                exchange: exchange.to_owned(),
                label: record.timezone_label.clone(),
            })
    }
}

impl Default for TimezoneResolver {
    fn default() -> Self {
        Self::new()
    }
}

/// Attach `tz` to an exchange-local wall-clock time.
///
/// Ambiguous times (DST fall-back) take the earlier instant; times skipped
/// by a DST jump are read with the offset in force just before the jump.
pub fn localize(tz: Tz, local: NaiveDateTime) -> DateTime<Tz> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(at) => at,
        LocalResult::Ambiguous(earliest, _) => earliest,
        LocalResult::None => {
            let offset = tz.offset_from_utc_datetime(&local).fix();
            tz.from_utc_datetime(&(local - offset))
        }
    }
}

/// Current wall-clock time at `tz`.
pub fn now_in(tz: Tz) -> NaiveDateTime {
    chrono::Utc::now().with_timezone(&tz).naive_local()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Exchange;
    use chrono::NaiveDate;

    fn exchange(code: &str, label: &str, timezone: Option<Tz>) -> Exchange {
        Exchange {
            code: code.into(),
            name: code.into(),
            country: None,
            currency: None,
            suffix: None,
            timezone_label: label.into(),
            timezone,
            is_intraday: false,
            intraday_start: None,
            last_trade: None,
            advances: None,
            declines: None,
        }
    }

    fn local(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .and_then(|date| date.and_hms_opt(h, min, 0))
            .expect("valid local time")
    }

    #[test]
    fn maps_vendor_labels() {
        let resolver = TimezoneResolver::new();

        assert_eq!(
            resolver.vendor_timezone("Eastern Standard Time"),
            Some(Tz::America__New_York)
        );
        assert_eq!(
            resolver.vendor_timezone("GMT Standard Time"),
            Some(Tz::Europe__London)
        );
        assert_eq!(resolver.vendor_timezone("Mars Standard Time"), None);
    }

    #[test]
    fn resolves_known_exchange() {
        let table: ExchangeTable = vec![exchange("NYSE", "Eastern Standard Time", None)]
            .into_iter()
            .collect();

        let tz = TimezoneResolver::new()
            .resolve(&table, "NYSE")
            .expect("resolved");
        assert_eq!(tz, Tz::America__New_York);
    }

    #[test]
    fn unknown_exchange_and_unmapped_label_fail() {
        let table: ExchangeTable = vec![exchange("MARS", "Olympus Mons Time", None)]
            .into_iter()
            .collect();
        let resolver = TimezoneResolver::new();

        assert!(matches!(
            resolver.resolve(&table, "NYSE"),
            Err(ResolutionError::UnknownExchange { .. })
        ));
        assert!(matches!(
            resolver.resolve(&table, "MARS"),
            Err(ResolutionError::UnmappedTimezone { .. })
        ));

        let extended = resolver.with_mapping("Olympus Mons Time", Tz::UTC);
        assert_eq!(extended.resolve(&table, "MARS"), Ok(Tz::UTC));
    }

    #[test]
    fn localize_handles_dst_transitions() {
        let tz = Tz::America__New_York;

        let ambiguous = localize(tz, local(2024, 11, 3, 1, 30));
        assert_eq!(ambiguous.to_rfc3339(), "2024-11-03T01:30:00-04:00");

        let skipped = localize(tz, local(2024, 3, 10, 2, 30));
        assert_eq!(skipped.to_rfc3339(), "2024-03-10T03:30:00-04:00");
    }
}
