//! CLI module for tailstore
//!
//! Provides command-line interface for:
//! - init: Create a durable table from a manifest
//! - ingest: Append JSON-lines records and report alerts
//! - read: Print one committed record
//! - inspect: Print tail, schema and catalog

mod args;
mod commands;
mod errors;
mod io;
mod manifest;

pub use args::{Cli, Command};
pub use commands::{ingest, init, inspect, read, run, run_command, TIMESTAMP_KEY};
pub use errors::{CliError, CliResult};
pub use io::{read_lines, write_error, write_response, InputLine};
pub use manifest::{FilterSpec, IndexSpec, Registered, TableManifest, TriggerSpec};
