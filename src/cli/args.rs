//! CLI argument definitions using clap
//!
//! Commands:
//! - tailstore init --config <path>
//! - tailstore ingest --config <path> [--from-ms <ms>] [--to-ms <ms>]
//! - tailstore read --config <path> --offset <n>
//! - tailstore inspect --config <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// tailstore - a schema-typed event store with live monitoring
#[derive(Parser, Debug)]
#[command(name = "tailstore")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a durable table from a manifest
    Init {
        /// Path to the table manifest
        #[arg(long, default_value = "./tailstore.json")]
        config: PathBuf,
    },

    /// Append JSON-lines records from stdin and report alerts
    Ingest {
        /// Path to the table manifest
        #[arg(long, default_value = "./tailstore.json")]
        config: PathBuf,

        /// Start of the trigger evaluation range, in ms since the epoch
        #[arg(long, default_value_t = 0)]
        from_ms: u64,

        /// End of the trigger evaluation range (exclusive); unbounded if unset
        #[arg(long)]
        to_ms: Option<u64>,
    },

    /// Print one committed record
    Read {
        /// Path to the table manifest
        #[arg(long, default_value = "./tailstore.json")]
        config: PathBuf,

        /// Byte offset of the record
        #[arg(long)]
        offset: u64,
    },

    /// Print the tail, schema and catalog of a table
    Inspect {
        /// Path to the table manifest
        #[arg(long, default_value = "./tailstore.json")]
        config: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ingest() {
        let cli = Cli::try_parse_from(["tailstore", "ingest", "--config", "t.json", "--to-ms", "500"])
            .unwrap();
        match cli.command {
            Command::Ingest {
                config,
                from_ms,
                to_ms,
            } => {
                assert_eq!(config, PathBuf::from("t.json"));
                assert_eq!(from_ms, 0);
                assert_eq!(to_ms, Some(500));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_read_requires_offset() {
        assert!(Cli::try_parse_from(["tailstore", "read"]).is_err());
    }
}
