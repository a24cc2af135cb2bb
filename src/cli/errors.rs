//! CLI error types
//!
//! Every CLI error ends the command with a non-zero exit status. Table
//! errors keep their own `TAIL_` code.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::table::TableError;

/// CLI error
#[derive(Debug, Error)]
pub enum CliError {
    /// Manifest missing, malformed or inconsistent
    #[error("TAIL_CLI_CONFIG_ERROR: {0}")]
    Config(String),

    /// stdin/stdout failure
    #[error("TAIL_CLI_IO_ERROR: {0}")]
    Io(#[from] io::Error),

    #[error("TAIL_CLI_IO_ERROR: JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TAIL_CLI_ALREADY_INITIALIZED: Table already exists at {}", .0.display())]
    AlreadyInitialized(PathBuf),

    #[error("TAIL_CLI_NOT_INITIALIZED: No table at {}. Run 'tailstore init' first.", .0.display())]
    NotInitialized(PathBuf),

    #[error("{0}")]
    Table(#[from] TableError),
}

impl CliError {
    /// Config error
    pub fn config(message: impl Into<String>) -> Self {
        CliError::Config(message.into())
    }

    /// Error code string
    pub fn code(&self) -> &'static str {
        match self {
            CliError::Config(_) => "TAIL_CLI_CONFIG_ERROR",
            CliError::Io(_) | CliError::Json(_) => "TAIL_CLI_IO_ERROR",
            CliError::AlreadyInitialized(_) => "TAIL_CLI_ALREADY_INITIALIZED",
            CliError::NotInitialized(_) => "TAIL_CLI_NOT_INITIALIZED",
            CliError::Table(err) => err.code().code(),
        }
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;
