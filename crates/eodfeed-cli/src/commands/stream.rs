//! NDJSON event stream over several instruments.
//!
//! Each line is one [`BarEvent`](eodfeed_core::BarEvent). An instrument that
//! fails is reported once on stderr; the others keep streaming and the
//! command exits with the first failure afterwards.

use std::io::{self, Write};

use tracing::warn;

use eodfeed_core::DataReader;

use crate::cli::StreamArgs;
use crate::error::CliError;

pub fn run(args: &StreamArgs, reader: &DataReader) -> Result<(), CliError> {
    let instruments: Vec<(&str, &str)> = args
        .instruments
        .iter()
        .map(|instrument| (instrument.exchange.as_str(), instrument.symbol.as_str()))
        .collect();
    let window = &args.window;
    let events = reader.stream_many(&instruments, window.start, window.end, window.period)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut first_failure = None;
    let mut emitted = 0_usize;

    for item in events {
        match item {
            Ok(event) => {
                writeln!(out, "{}", serde_json::to_string(&event)?)?;
                emitted += 1;
            }
            Err(error) => {
                warn!(%error, "instrument stream failed");
                eprintln!("error: {error}");
                first_failure.get_or_insert(error);
            }
        }
    }
    out.flush()?;

    match first_failure {
        Some(error) => {
            warn!(emitted, "stream finished with failures");
            Err(error.into())
        }
        None => Ok(()),
    }
}
