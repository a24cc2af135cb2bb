//! CLI command implementations
//!
//! Each command loads the manifest, opens the table and writes JSON lines to
//! its output. Commands take their input and output streams as arguments;
//! `run` wires them to stdin and stdout.

use std::io::{self, BufRead, Write};
use std::path::Path;

use serde_json::{json, Value};

use crate::table::SCHEMA_FILE;

use super::args::{Cli, Command};
use super::errors::{CliError, CliResult};
use super::io::{read_lines, write_error, write_response, InputLine};
use super::manifest::TableManifest;

/// Reserved input key carrying a record's timestamp in milliseconds. Not a
/// valid column name, so it never collides with a field.
pub const TIMESTAMP_KEY: &str = "@timestamp_ms";

/// Main CLI entry point
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    let stdin = io::stdin();
    let stdout = io::stdout();
    run_command(cli.command, stdin.lock(), &mut stdout.lock())
}

/// Run one command against the given streams
pub fn run_command<R: BufRead, W: Write>(cmd: Command, input: R, out: &mut W) -> CliResult<()> {
    match cmd {
        Command::Init { config } => init(&config, out),
        Command::Ingest {
            config,
            from_ms,
            to_ms,
        } => ingest(&config, from_ms, to_ms.unwrap_or(u64::MAX), input, out),
        Command::Read { config, offset } => read(&config, offset, out),
        Command::Inspect { config } => inspect(&config, out),
    }
}

/// Creates the data directory and `schema.json` of a durable table.
pub fn init<W: Write>(config_path: &Path, out: &mut W) -> CliResult<()> {
    let manifest = TableManifest::load(config_path)?;
    if !manifest.table.storage_mode.is_durable() {
        return Err(CliError::config("init requires \"storage_mode\": \"durable\""));
    }

    let data_dir = manifest.table.data_path();
    if is_initialized(data_dir) {
        return Err(CliError::AlreadyInitialized(data_dir.to_path_buf()));
    }

    let table = manifest.open()?;
    write_response(
        out,
        json!({
            "initialized": true,
            "data_dir": data_dir.display().to_string(),
            "record_size": table.record_size(),
        }),
    )
}

/// Registers the manifest's monitors, appends every input line, then
/// reports the alerts raised over `[from_ms, to_ms)`.
///
/// A line that cannot be appended gets an error response and ingestion
/// continues. A fatal table error ends the command.
pub fn ingest<R: BufRead, W: Write>(
    config_path: &Path,
    from_ms: u64,
    to_ms: u64,
    input: R,
    out: &mut W,
) -> CliResult<()> {
    let manifest = TableManifest::load(config_path)?;
    require_initialized(&manifest)?;

    let table = manifest.open()?;
    let registered = manifest.register(&table)?;
    write_response(out, json!({ "registered": registered }))?;

    for line in read_lines(input) {
        let mut object = match line? {
            InputLine::Object(object) => object,
            InputLine::Invalid(reason) => {
                write_error(out, "TAIL_CLI_INVALID_LINE", &reason)?;
                continue;
            }
        };

        let timestamp = match object.remove(TIMESTAMP_KEY) {
            None => None,
            Some(value) => match value.as_u64() {
                Some(ms) => Some(ms.saturating_mul(1_000_000)),
                None => {
                    let message = format!("{} must be a non-negative integer", TIMESTAMP_KEY);
                    write_error(out, "TAIL_CLI_INVALID_LINE", &message)?;
                    continue;
                }
            },
        };

        match table.append_json(&object, timestamp) {
            Ok(offset) => write_response(out, json!({ "offset": offset }))?,
            Err(err) if err.is_fatal() => return Err(err.into()),
            Err(err) => write_error(out, err.code().code(), &err.to_string())?,
        }
    }

    let alerts = table.evaluate_triggers(from_ms, to_ms);
    write_response(
        out,
        json!({
            "alerts": alerts,
            "tail": table.num_records(),
            "metrics": table.metrics().snapshot(),
        }),
    )
}

/// Prints the record at `offset`, or `"visible": false` if it is not
/// committed.
pub fn read<W: Write>(config_path: &Path, offset: u64, out: &mut W) -> CliResult<()> {
    let manifest = TableManifest::load(config_path)?;
    require_initialized(&manifest)?;

    let table = manifest.open()?;
    let data = match table.ptr(offset) {
        Some(record) => {
            let mut data = record.to_json();
            data["visible"] = Value::Bool(true);
            data
        }
        None => json!({ "offset": offset, "visible": false }),
    };
    write_response(out, data)
}

/// Prints the tail, columns and catalog of a table.
pub fn inspect<W: Write>(config_path: &Path, out: &mut W) -> CliResult<()> {
    let manifest = TableManifest::load(config_path)?;
    require_initialized(&manifest)?;

    let table = manifest.open()?;
    write_response(
        out,
        json!({
            "tail": table.num_records(),
            "record_count": table.record_count(),
            "record_size": table.record_size(),
            "columns": table.schema().definitions(),
            "catalog": table.catalog(),
        }),
    )
}

fn is_initialized(data_dir: &Path) -> bool {
    data_dir.join(SCHEMA_FILE).exists()
}

/// Durable tables must be created with `init` first.
fn require_initialized(manifest: &TableManifest) -> CliResult<()> {
    let data_dir = manifest.table.data_path();
    if manifest.table.storage_mode.is_durable() && !is_initialized(data_dir) {
        return Err(CliError::NotInitialized(data_dir.to_path_buf()));
    }
    Ok(())
}
