use eodfeed_core::DataReader;

use crate::cli::ExchangesArgs;
use crate::error::CliError;

use super::CommandOutput;

pub fn run(args: &ExchangesArgs, reader: &DataReader) -> Result<CommandOutput, CliError> {
    let exchanges = reader.exchanges(Some(args.expiration))?;
    CommandOutput::listing(exchanges.iter())
}
