//! tailstore CLI entry point
//!
//! Parses arguments and dispatches to the CLI module. Errors go to stderr and
//! the process exits non-zero.

use tailstore::cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
