//! Output formatting utilities

use anyhow::{Context, Result, anyhow, bail};
use colored::Colorize;
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{self, IsTerminal, Write};
use std::path::Path;
use std::str::FromStr;
use tabled::builder::Builder;
use tabled::settings::Style;

/// Output format options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Csv,
    Ndjson,
    Json,
    Table,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "ndjson" | "jsonl" => Ok(Self::Ndjson),
            "json" => Ok(Self::Json),
            "table" => Ok(Self::Table),
            other => bail!("Unknown output format '{}' (expected csv, ndjson, json or table)", other),
        }
    }
}

/// Set up color output based on user preference
pub fn setup_colors(mode: &str) {
    match mode.to_lowercase().as_str() {
        "always" => colored::control::set_override(true),
        "never" => colored::control::set_override(false),
        _ => colored::control::set_override(io::stdout().is_terminal()),
    }
}

/// Format an error for display, including its causes
pub fn format_error(error: &anyhow::Error) -> String {
    format!("{} {:#}", "Error:".red().bold(), error)
}

/// Format a warning for display
pub fn format_warning(warning: &str) -> String {
    format!("{} {}", "Warning:".yellow().bold(), warning)
}

/// Format a success message for display
pub fn format_success(message: &str) -> String {
    format!("{} {}", "Success:".green().bold(), message)
}

/// Write output to a file or stdout
pub fn write_output(content: &str, output_file: Option<&Path>) -> Result<()> {
    if let Some(path) = output_file {
        let mut file = File::create(path)
            .with_context(|| format!("Failed to create output file: {}", path.display()))?;
        file.write_all(content.as_bytes())
            .with_context(|| format!("Failed to write to output file: {}", path.display()))?;
        eprintln!(
            "{}",
            format_success(&format!("Output written to {}", path.display()))
        );
    } else {
        print!("{}", content);
    }
    Ok(())
}

/// Render row records in the given format
///
/// `columns` fixes the column order, so headers are written even when there
/// are no rows.
pub fn format_records(
    columns: &[&str],
    records: &[Map<String, Value>],
    format: OutputFormat,
) -> Result<String> {
    match format {
        OutputFormat::Csv => format_csv(columns, records),
        OutputFormat::Ndjson => {
            let mut out = String::new();
            for record in records {
                out.push_str(&serde_json::to_string(record).context("Failed to serialize row")?);
                out.push('\n');
            }
            Ok(out)
        }
        OutputFormat::Json => {
            let rows = Value::Array(records.iter().cloned().map(Value::Object).collect());
            let mut out = serde_json::to_string_pretty(&rows).context("Failed to serialize rows")?;
            out.push('\n');
            Ok(out)
        }
        OutputFormat::Table => Ok(format_table(columns, records)),
    }
}

fn format_csv(columns: &[&str], records: &[Map<String, Value>]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(columns).context("Failed to write CSV header")?;
    for record in records {
        writer
            .write_record(columns.iter().map(|c| cell(record.get(*c))))
            .context("Failed to write CSV row")?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow!("Failed to flush CSV output: {}", e.error()))?;
    String::from_utf8(bytes).context("CSV output is not valid UTF-8")
}

fn format_table(columns: &[&str], records: &[Map<String, Value>]) -> String {
    let mut builder = Builder::default();
    builder.push_record(columns.iter().map(|c| c.to_string()));
    for record in records {
        builder.push_record(columns.iter().map(|c| cell(record.get(*c))));
    }
    let mut table = builder.build();
    table.with(Style::modern());
    format!("{}\n", table)
}

/// Text of one cell: strings unquoted, null as empty, anything else as JSON
fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
