use eodfeed_core::{Error, ValidationError, WarehouseError};
use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("command error: {0}")]
    Command(String),

    #[error(transparent)]
    Market(Error),

    #[error(transparent)]
    Cache(#[from] WarehouseError),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<Error> for CliError {
    fn from(error: Error) -> Self {
        match error {
            Error::Validation(error) => Self::Validation(error),
            Error::CacheIo(error) => Self::Cache(error),
            other => Self::Market(other),
        }
    }
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) => 2,
            Self::Command(_) => 2,
            Self::Market(Error::Authentication { .. }) => 3,
            Self::Market(Error::GapFill { .. }) => 5,
            Self::Market(Error::Resolution(_)) => 6,
            Self::Market(_) => 4,
            Self::Cache(_) => 7,
            Self::Serialization(_) => 8,
            Self::Io(_) => 10,
        }
    }
}
