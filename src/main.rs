//! dirsearch CLI entry point
//!
//! Installs the log subscriber (stderr, `RUST_LOG`, default `warn`),
//! then delegates everything to the CLI module. Errors are printed to
//! stderr and the process exits non-zero.

use dirsearch::cli;
use tracing_subscriber::EnvFilter;

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = cli::run() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
