mod cache;
mod exchanges;
mod history;
mod stream;
mod symbols;

use eodfeed_core::{DataReader, ReaderConfig, WarehouseConfig};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::cli::{Cli, Command};
use crate::error::CliError;

/// What a command produced: the JSON document, its rows for ndjson and
/// table output, and an error to report after rendering whatever was
/// still available.
pub struct CommandOutput {
    pub data: Value,
    pub rows: Vec<Value>,
    pub failure: Option<CliError>,
}

impl CommandOutput {
    pub fn new(data: Value, rows: Vec<Value>) -> Self {
        Self {
            data,
            rows,
            failure: None,
        }
    }

    /// Output whose document is the list of rows itself.
    pub fn listing<T: Serialize>(items: impl IntoIterator<Item = T>) -> Result<Self, CliError> {
        let rows = items
            .into_iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(Value::Array(rows.clone()), rows))
    }

    pub fn with_failure(mut self, failure: CliError) -> Self {
        self.failure = Some(failure);
        self
    }
}

/// Run the selected command. `None` means the command wrote its own output.
pub fn run(cli: &Cli) -> Result<Option<CommandOutput>, CliError> {
    let output = match &cli.command {
        Command::Exchanges(args) => exchanges::run(args, &reader(cli)?)?,
        Command::Symbols(args) => symbols::run(args, &reader(cli)?)?,
        Command::History(args) => history::run(args, &reader(cli)?)?,
        Command::Stream(args) => {
            stream::run(args, &reader(cli)?)?;
            return Ok(None);
        }
        Command::Cache(args) => cache::run(args, warehouse_config(cli))?,
    };
    Ok(Some(output))
}

fn warehouse_config(cli: &Cli) -> WarehouseConfig {
    let cache_dir = match &cli.cache_dir {
        Some(dir) => dir.clone(),
        None => WarehouseConfig::default().cache_dir,
    };
    WarehouseConfig::in_dir(cache_dir, cli.name.as_str()).with_compression(cli.compression)
}

fn reader(cli: &Cli) -> Result<DataReader, CliError> {
    let warehouse = warehouse_config(cli);
    let config = if cli.no_cache {
        ReaderConfig {
            warehouse,
            ..ReaderConfig::uncached()
        }
    } else {
        debug!(path = %warehouse.db_path.display(), "using cache");
        ReaderConfig::persistent(warehouse)
    };
    Ok(DataReader::from_env(config)?)
}
