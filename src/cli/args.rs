//! CLI argument definitions using clap
//!
//! Commands:
//! - dirsearch search --fixture <path> [--filter <json>] [--size-limit <n>]
//! - dirsearch explain --fixture <path> [--filter <json>] [--json]
//!
//! Without `--filter`, a search request is read from stdin.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// dirsearch - index-driven LDAP filter evaluation over a partition
#[derive(Parser, Debug)]
#[command(name = "dirsearch")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a search and print matching entries
    Search {
        /// Path to the partition fixture (schema, partition, entries)
        #[arg(long, default_value = "./partition.json")]
        fixture: PathBuf,

        /// Filter as JSON; read a request from stdin when absent
        #[arg(long)]
        filter: Option<String>,

        /// Maximum number of entries to return (0 means no limit)
        #[arg(long)]
        size_limit: Option<u64>,
    },

    /// Describe how a search would run without running it
    Explain {
        /// Path to the partition fixture (schema, partition, entries)
        #[arg(long, default_value = "./partition.json")]
        fixture: PathBuf,

        /// Filter as JSON; read a request from stdin when absent
        #[arg(long)]
        filter: Option<String>,

        /// Print the plan as JSON instead of text
        #[arg(long)]
        json: bool,
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
    fn test_parse_search() {
        let cli = Cli::try_parse_from([
            "dirsearch",
            "search",
            "--fixture",
            "p.json",
            "--filter",
            r#"{"presence":{"attribute":"cn"}}"#,
            "--size-limit",
            "3",
        ])
        .unwrap();
        match cli.command {
            Command::Search {
                fixture,
                filter,
                size_limit,
            } => {
                assert_eq!(fixture, PathBuf::from("p.json"));
                assert!(filter.is_some());
                assert_eq!(size_limit, Some(3));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_explain_defaults() {
        let cli = Cli::try_parse_from(["dirsearch", "explain"]).unwrap();
        match cli.command {
            Command::Explain {
                fixture,
                filter,
                json,
            } => {
                assert_eq!(fixture, PathBuf::from("./partition.json"));
                assert!(filter.is_none());
                assert!(!json);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
