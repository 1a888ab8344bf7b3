use eodfeed_core::{DataReader, Error, HistorySeries};
use tracing::warn;

use crate::cli::HistoryArgs;
use crate::error::CliError;

use super::CommandOutput;

pub fn run(args: &HistoryArgs, reader: &DataReader) -> Result<CommandOutput, CliError> {
    let window = &args.window;
    let result = reader.history(
        &args.exchange,
        &args.symbol,
        window.start,
        window.end,
        window.period,
    );

    match result {
        Ok(series) => series_output(&series),
        // A failed gap fill still returns the rows that were already cached.
        Err(error @ Error::GapFill { .. }) => {
            let output = match error.partial() {
                Some(partial) => {
                    warn!(rows = partial.len(), %error, "returning cached rows only");
                    series_output(partial)?
                }
                None => CommandOutput::new(serde_json::Value::Null, Vec::new()),
            };
            Ok(output.with_failure(CliError::from(error)))
        }
        Err(error) => Err(error.into()),
    }
}

fn series_output(series: &HistorySeries) -> Result<CommandOutput, CliError> {
    let rows = series
        .iter()
        .map(serde_json::to_value)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(CommandOutput::new(serde_json::to_value(series)?, rows))
}
