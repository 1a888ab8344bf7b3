use eodfeed_core::{Warehouse, WarehouseConfig};
use serde_json::json;
use tracing::info;

use crate::cli::{CacheArgs, CacheCommand};
use crate::error::CliError;

use super::CommandOutput;

pub fn run(args: &CacheArgs, config: WarehouseConfig) -> Result<CommandOutput, CliError> {
    let warehouse = Warehouse::open(config)?;

    match &args.command {
        CacheCommand::List => CommandOutput::listing(warehouse.entries()?),
        CacheCommand::Remove { key } => {
            let removed = warehouse.remove(key)?;
            let summary = json!({ "key": key, "removed": removed });
            let output = CommandOutput::new(summary.clone(), vec![summary]);
            if removed {
                info!(%key, "removed cache entry");
                Ok(output)
            } else {
                Ok(output.with_failure(CliError::Command(format!("no cache entry '{key}'"))))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eodfeed_core::{SymbolInfo, SymbolTable};
    use tempfile::tempdir;

    #[test]
    fn lists_then_removes_entries() {
        let temp = tempdir().expect("tempdir");
        let config = WarehouseConfig::in_dir(temp.path(), "eoddata");
        {
            let warehouse = Warehouse::open(config.clone()).expect("open");
            let symbols: SymbolTable = vec![SymbolInfo {
                code: String::from("ABC"),
                name: String::from("ABC Corp"),
                long_name: None,
            }]
            .into_iter()
            .collect();
            warehouse
                .write("symbols/NYSE", &symbols.to_records())
                .expect("write");
        }

        let listed = run(&CacheArgs { command: CacheCommand::List }, config.clone()).expect("list");
        assert_eq!(listed.rows.len(), 1);
        assert_eq!(listed.rows[0]["key"], "symbols/NYSE");
        assert_eq!(listed.rows[0]["row_count"], 1);

        let remove = CacheArgs {
            command: CacheCommand::Remove {
                key: String::from("symbols/NYSE"),
            },
        };
        let removed = run(&remove, config.clone()).expect("remove");
        assert!(removed.failure.is_none());

        let again = run(&remove, config).expect("remove again");
        assert!(matches!(again.failure, Some(CliError::Command(_))));
    }
}
