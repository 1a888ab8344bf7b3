use std::fmt::{Display, Formatter};

use eodfeed_warehouse::{ParseExpirationError, WarehouseError};
use thiserror::Error;

use crate::domain::HistorySeries;

/// Validation errors for caller-supplied values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{kind} code cannot be empty")]
    EmptyCode { kind: &'static str },
    #[error("{kind} code contains invalid character '{ch}' at index {index}")]
    CodeInvalidChar {
        kind: &'static str,
        ch: char,
        index: usize,
    },

    #[error(
        "invalid period '{value}', expected one of 1min, 5min, 10min, 15min, 30min, hourly, daily, weekly, monthly, quarterly, yearly"
    )]
    InvalidPeriod { value: String },

    #[error("invalid date bound '{value}', expected YYYY-MM-DD or YYYY-MM-DDTHH:MM[:SS]")]
    InvalidBound { value: String },
    #[error("start bound {start} is later than end bound {end}")]
    InvertedRange { start: String, end: String },

    #[error(transparent)]
    InvalidExpiration(#[from] ParseExpirationError),
}

/// Failure to map an exchange to its timezone.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    #[error("unknown exchange '{code}'")]
    UnknownExchange { code: String },
    #[error("exchange '{exchange}' reports timezone '{label}' which has no known mapping")]
    UnmappedTimezone { exchange: String, label: String },
}

/// Which end of a cached window a gap fill was extending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GapSide {
    Front,
    Back,
}

impl GapSide {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Front => "front",
            Self::Back => "back",
        }
    }
}

impl Display for GapSide {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Top-level error type for eodfeed operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Remote service rejected the credentials.
    #[error("authentication failed: {message}")]
    Authentication {
        message: String,
        raw: Option<String>,
    },

    /// A remote call failed or returned a non-success status.
    #[error("remote call {method} failed: {message}")]
    RemoteRequest {
        method: String,
        message: String,
        raw: Option<String>,
    },

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    /// Local cache could not be read or written.
    #[error("cache i/o failed: {0}")]
    CacheIo(#[from] WarehouseError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A front or back fill fetch failed after the cached window was
    /// selected. `partial` holds the cached rows for the request; the cache
    /// was left untouched by the failed step.
    #[error("{side} gap fill failed: {source}")]
    GapFill {
        side: GapSide,
        partial: Box<HistorySeries>,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    pub(crate) fn remote(method: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RemoteRequest {
            method: method.into(),
            message: message.into(),
            raw: None,
        }
    }

    pub(crate) fn remote_with_raw(
        method: impl Into<String>,
        message: impl Into<String>,
        raw: impl Into<String>,
    ) -> Self {
        Self::RemoteRequest {
            method: method.into(),
            message: message.into(),
            raw: Some(raw.into()),
        }
    }

    /// Raw remote response attached for diagnostics, if any.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            Self::Authentication { raw, .. } | Self::RemoteRequest { raw, .. } => raw.as_deref(),
            Self::GapFill { source, .. } => source.raw_response(),
            _ => None,
        }
    }

    /// Data that was still available when the request failed part way.
    pub fn partial(&self) -> Option<&HistorySeries> {
        match self {
            Self::GapFill { partial, .. } => Some(partial.as_ref()),
            _ => None,
        }
    }
}

impl From<ParseExpirationError> for Error {
    fn from(value: ParseExpirationError) -> Self {
        Self::Validation(ValidationError::from(value))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
