//! CLI module for dirsearch
//!
//! Provides command-line interface for:
//! - search: Run a filter against a fixture partition
//! - explain: Show the plan a filter would run with

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{build_request, explain, parse_filter, run, run_command, search};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{read_request, write_error, write_response};
