//! Vendor attribute to normalized field mapping.
//!
//! Each record kind has a static table naming the vendor attribute, the
//! normalized field it fills, the coercion applied to the text value and
//! whether the field must be present. Empty attributes count as absent.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use thiserror::Error;

/// Conversion applied to a vendor attribute value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coercion {
    Text,
    /// `"true"` / `"false"`, case-insensitive.
    Flag,
    Integer,
    Decimal,
    /// Exchange-local date or date-time without offset.
    Timestamp,
}

impl Coercion {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Flag => "flag",
            Self::Integer => "integer",
            Self::Decimal => "decimal",
            Self::Timestamp => "timestamp",
        }
    }

    fn apply(self, raw: &str) -> Option<FieldValue> {
        match self {
            Self::Text => Some(FieldValue::Text(raw.to_owned())),
            Self::Flag => match raw.to_ascii_lowercase().as_str() {
                "true" => Some(FieldValue::Flag(true)),
                "false" => Some(FieldValue::Flag(false)),
                _ => None,
            },
            Self::Integer => raw
                .parse::<i64>()
                .ok()
                .or_else(|| {
                    // Volumes occasionally arrive as "1234.0".
                    raw.parse::<f64>()
                        .ok()
                        .filter(|value| value.fract() == 0.0 && value.is_finite())
                        .map(|value| value as i64)
                })
                .map(FieldValue::Integer),
            Self::Decimal => raw
                .parse::<f64>()
                .ok()
                .filter(|value| value.is_finite())
                .map(FieldValue::Decimal),
            Self::Timestamp => parse_vendor_timestamp(raw).map(FieldValue::Timestamp),
        }
    }
}

impl Display for Coercion {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of a field mapping table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldMapping {
    pub vendor: &'static str,
    pub field: &'static str,
    pub coercion: Coercion,
    pub required: bool,
}

const fn required(vendor: &'static str, field: &'static str, coercion: Coercion) -> FieldMapping {
    FieldMapping {
        vendor,
        field,
        coercion,
        required: true,
    }
}

const fn optional(vendor: &'static str, field: &'static str, coercion: Coercion) -> FieldMapping {
    FieldMapping {
        vendor,
        field,
        coercion,
        required: false,
    }
}

pub const EXCHANGE_FIELDS: &[FieldMapping] = &[
    required("Code", "code", Coercion::Text),
    required("Name", "name", Coercion::Text),
    optional("Country", "country", Coercion::Text),
    optional("Currency", "currency", Coercion::Text),
    optional("Suffix", "suffix", Coercion::Text),
    required("TimeZone", "timezone", Coercion::Text),
    optional("IsIntraday", "is_intraday", Coercion::Flag),
    optional("IntradayStartDate", "intraday_start_date", Coercion::Timestamp),
    optional("LastTradeDateTime", "last_trade_date_time", Coercion::Timestamp),
    optional("Advances", "advances", Coercion::Integer),
    optional("Declines", "declines", Coercion::Integer),
];

pub const SYMBOL_FIELDS: &[FieldMapping] = &[
    required("Code", "code", Coercion::Text),
    required("Name", "name", Coercion::Text),
    optional("LongName", "long_name", Coercion::Text),
];

pub const QUOTE_FIELDS: &[FieldMapping] = &[
    required("Symbol", "symbol", Coercion::Text),
    required("DateTime", "date_time", Coercion::Timestamp),
    required("Open", "open", Coercion::Decimal),
    required("High", "high", Coercion::Decimal),
    required("Low", "low", Coercion::Decimal),
    required("Close", "close", Coercion::Decimal),
    required("Volume", "volume", Coercion::Integer),
    optional("OpenInterest", "open_interest", Coercion::Integer),
];

/// A coerced field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Flag(bool),
    Integer(i64),
    Decimal(f64),
    Timestamp(NaiveDateTime),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("required attribute '{vendor}' is missing")]
    Missing { vendor: &'static str },
    #[error("attribute '{vendor}' value '{value}' is not a valid {expected}")]
    Invalid {
        vendor: &'static str,
        value: String,
        expected: Coercion,
    },
    #[error("field '{field}' holds a different type than requested")]
    WrongType { field: &'static str },
    #[error("field '{field}' value {value} is out of range")]
    OutOfRange { field: &'static str, value: i64 },
}

/// Record with normalized field names and coerced values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedRecord {
    values: BTreeMap<&'static str, FieldValue>,
}

impl NormalizedRecord {
    pub fn get(&self, field: &'static str) -> Option<&FieldValue> {
        self.values.get(field)
    }

    pub fn text(&self, field: &'static str) -> Result<Option<String>, FieldError> {
        match self.values.get(field) {
            None => Ok(None),
            Some(FieldValue::Text(value)) => Ok(Some(value.clone())),
            Some(_) => Err(FieldError::WrongType { field }),
        }
    }

    pub fn flag(&self, field: &'static str) -> Result<Option<bool>, FieldError> {
        match self.values.get(field) {
            None => Ok(None),
            Some(FieldValue::Flag(value)) => Ok(Some(*value)),
            Some(_) => Err(FieldError::WrongType { field }),
        }
    }

    pub fn integer(&self, field: &'static str) -> Result<Option<i64>, FieldError> {
        match self.values.get(field) {
            None => Ok(None),
            Some(FieldValue::Integer(value)) => Ok(Some(*value)),
            Some(_) => Err(FieldError::WrongType { field }),
        }
    }

    pub fn count(&self, field: &'static str) -> Result<Option<u64>, FieldError> {
        self.integer(field)?
            .map(|value| u64::try_from(value).map_err(|_| FieldError::OutOfRange { field, value }))
            .transpose()
    }

    pub fn decimal(&self, field: &'static str) -> Result<Option<f64>, FieldError> {
        match self.values.get(field) {
            None => Ok(None),
            Some(FieldValue::Decimal(value)) => Ok(Some(*value)),
            Some(_) => Err(FieldError::WrongType { field }),
        }
    }

    pub fn timestamp(&self, field: &'static str) -> Result<Option<NaiveDateTime>, FieldError> {
        match self.values.get(field) {
            None => Ok(None),
            Some(FieldValue::Timestamp(value)) => Ok(Some(*value)),
            Some(_) => Err(FieldError::WrongType { field }),
        }
    }
}

/// Apply `mappings` to the raw attributes of one vendor record.
pub fn normalize(
    mappings: &[FieldMapping],
    attributes: &BTreeMap<String, String>,
) -> Result<NormalizedRecord, FieldError> {
    let mut record = NormalizedRecord::default();

    for mapping in mappings {
        let raw = attributes
            .get(mapping.vendor)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty());

        match raw {
            Some(raw) => {
                let value = mapping
                    .coercion
                    .apply(raw)
                    .ok_or_else(|| FieldError::Invalid {
                        vendor: mapping.vendor,
                        value: raw.to_owned(),
                        expected: mapping.coercion,
                    })?;
                record.values.insert(mapping.field, value);
            }
            None if mapping.required => {
                return Err(FieldError::Missing {
                    vendor: mapping.vendor,
                });
            }
            None => {}
        }
    }

    Ok(record)
}

fn parse_vendor_timestamp(raw: &str) -> Option<NaiveDateTime> {
    const DATE_TIME_FORMATS: [&str; 3] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y%m%d %H:%M:%S",
    ];

    DATE_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .or_else(|| {
            ["%Y-%m-%d", "%Y%m%d"]
                .iter()
                .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
                .map(|date| date.and_time(NaiveTime::default()))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attributes(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
            .collect()
    }

    #[test]
    fn normalizes_exchange_attributes() {
        let record = normalize(
            EXCHANGE_FIELDS,
            &attributes(&[
                ("Code", "NYSE"),
                ("Name", "New York Stock Exchange"),
                ("TimeZone", "Eastern Standard Time"),
                ("IsIntraday", "True"),
                ("LastTradeDateTime", "2024-06-10T16:00:00"),
                ("Advances", "1200"),
                ("Suffix", ""),
            ]),
        )
        .expect("normalized");

        assert_eq!(record.text("code"), Ok(Some("NYSE".to_owned())));
        assert_eq!(record.flag("is_intraday"), Ok(Some(true)));
        assert_eq!(record.integer("advances"), Ok(Some(1_200)));
        assert_eq!(record.text("suffix"), Ok(None));
        assert!(record.timestamp("last_trade_date_time").expect("ts").is_some());
    }

    #[test]
    fn missing_required_attribute_is_reported() {
        let err = normalize(SYMBOL_FIELDS, &attributes(&[("Code", "ABC")]))
            .expect_err("name is required");
        assert_eq!(err, FieldError::Missing { vendor: "Name" });
    }

    #[test]
    fn invalid_value_names_expected_coercion() {
        let err = normalize(
            QUOTE_FIELDS,
            &attributes(&[
                ("Symbol", "ABC"),
                ("DateTime", "2024-01-02T00:00:00"),
                ("Open", "abc"),
            ]),
        )
        .expect_err("open must be decimal");
        assert!(matches!(
            err,
            FieldError::Invalid {
                vendor: "Open",
                expected: Coercion::Decimal,
                ..
            }
        ));
    }

    #[test]
    fn timestamps_accept_date_only_and_fractional_seconds() {
        assert!(parse_vendor_timestamp("2024-01-02").is_some());
        assert!(parse_vendor_timestamp("2024-01-02T09:30:00.000").is_some());
        assert!(parse_vendor_timestamp("20240102").is_some());
        assert!(parse_vendor_timestamp("yesterday").is_none());
    }

    #[test]
    fn negative_counts_are_rejected() {
        let record = normalize(
            QUOTE_FIELDS,
            &attributes(&[
                ("Symbol", "ABC"),
                ("DateTime", "2024-01-02"),
                ("Open", "1"),
                ("High", "1"),
                ("Low", "1"),
                ("Close", "1"),
                ("Volume", "-5"),
            ]),
        )
        .expect("normalized");

        assert!(matches!(
            record.count("volume"),
            Err(FieldError::OutOfRange { field: "volume", value: -5 })
        ));
    }
}
