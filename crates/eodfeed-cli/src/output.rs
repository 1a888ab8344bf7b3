use std::io::{self, Write};

use serde_json::Value;

use crate::cli::OutputFormat;
use crate::commands::CommandOutput;
use crate::error::CliError;

pub fn render(output: &CommandOutput, format: OutputFormat, pretty: bool) -> Result<(), CliError> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match format {
        OutputFormat::Json => {
            let payload = if pretty {
                serde_json::to_string_pretty(&output.data)?
            } else {
                serde_json::to_string(&output.data)?
            };
            writeln!(out, "{payload}")?;
        }
        OutputFormat::Ndjson => {
            for row in &output.rows {
                writeln!(out, "{}", serde_json::to_string(row)?)?;
            }
        }
        OutputFormat::Table => {
            for line in table_lines(&output.rows) {
                writeln!(out, "{line}")?;
            }
        }
    }

    out.flush()?;
    Ok(())
}

/// Rows of JSON objects as left-aligned columns; the header comes from the
/// first row's keys.
fn table_lines(rows: &[Value]) -> Vec<String> {
    let Some(Value::Object(first)) = rows.first() else {
        return vec![String::from("(no rows)")];
    };
    let columns: Vec<&str> = first.keys().map(String::as_str).collect();

    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            columns
                .iter()
                .map(|column| cell(row.get(*column)))
                .collect()
        })
        .collect();

    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(index, column)| {
            cells
                .iter()
                .map(|row| row[index].chars().count())
                .chain(std::iter::once(column.len()))
                .max()
                .unwrap_or_default()
        })
        .collect();

    let rule: Vec<String> = widths.iter().map(|width| "-".repeat(*width)).collect();
    let mut lines = Vec::with_capacity(cells.len() + 2);
    lines.push(format_row(&columns, &widths));
    lines.push(format_row(&rule.iter().map(String::as_str).collect::<Vec<_>>(), &widths));
    for row in &cells {
        lines.push(format_row(&row.iter().map(String::as_str).collect::<Vec<_>>(), &widths));
    }
    lines
}

fn format_row(values: &[&str], widths: &[usize]) -> String {
    values
        .iter()
        .zip(widths)
        .map(|(value, width)| format!("{value:<width$}", width = *width))
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_owned()
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn aligns_columns_from_first_row() {
        let rows = vec![
            json!({"code": "NYSE", "name": "New York Stock Exchange", "suffix": null}),
            json!({"code": "LSE", "name": "London", "suffix": ".L"}),
        ];

        let lines = table_lines(&rows);

        assert_eq!(lines[0], "code  name                     suffix");
        assert_eq!(lines[2], "NYSE  New York Stock Exchange");
        assert_eq!(lines[3], "LSE   London                   .L");
    }

    #[test]
    fn empty_rows_render_placeholder() {
        assert_eq!(table_lines(&[]), vec![String::from("(no rows)")]);
    }
}
