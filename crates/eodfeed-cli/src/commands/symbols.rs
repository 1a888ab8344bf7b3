use eodfeed_core::DataReader;

use crate::cli::SymbolsArgs;
use crate::error::CliError;

use super::CommandOutput;

pub fn run(args: &SymbolsArgs, reader: &DataReader) -> Result<CommandOutput, CliError> {
    let symbols = reader.symbols(&args.exchange, Some(args.expiration))?;
    CommandOutput::listing(symbols.iter())
}
