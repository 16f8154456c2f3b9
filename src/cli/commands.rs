//! CLI command implementations
//!
//! Both commands load the fixture, build the partition, then plan the
//! request against it. Nothing is persisted between runs.

use std::path::Path;

use serde_json::{json, Value};

use crate::config::PartitionFixture;
use crate::search::{ExprNode, SearchEngine, SearchRequest};

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::{read_request, write_error, write_lines, write_response, write_text};

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command).or_else(|e| {
        write_error(&e)?;
        Err(e)
    })
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Search {
            fixture,
            filter,
            size_limit,
        } => {
            let request = build_request(filter.as_deref(), size_limit)?;
            search(&fixture, &request)
        }
        Command::Explain {
            fixture,
            filter,
            json,
        } => {
            let request = build_request(filter.as_deref(), None)?;
            explain(&fixture, &request, json)
        }
    }
}

/// Builds a request from `--filter`, or from stdin when it is absent.
/// `size_limit` overrides whatever the request carries.
pub fn build_request(filter: Option<&str>, size_limit: Option<u64>) -> CliResult<SearchRequest> {
    let mut request = match filter {
        Some(filter) => SearchRequest::new(parse_filter(filter)?),
        None => parse_request(read_request()?)?,
    };
    if size_limit.is_some() {
        request.size_limit = size_limit;
    }
    Ok(request)
}

/// Parses a filter expression from JSON
pub fn parse_filter(json: &str) -> CliResult<ExprNode> {
    serde_json::from_str(json)
        .map_err(|e| CliError::invalid_request(format!("Invalid filter: {}", e)))
}

fn parse_request(value: Value) -> CliResult<SearchRequest> {
    serde_json::from_value(value)
        .map_err(|e| CliError::invalid_request(format!("Invalid search request: {}", e)))
}

/// Runs the search and prints one entry per line, then a summary.
///
/// Entries printed before a failure stay printed; the error follows them.
pub fn search(fixture_path: &Path, request: &SearchRequest) -> CliResult<()> {
    let fixture = PartitionFixture::load(fixture_path)?;
    let default_limit = fixture.partition.size_limit;
    let (schema, store) = fixture.open()?;

    let engine = SearchEngine::new(&store, &schema).with_default_size_limit(default_limit);
    let plan = engine.plan(request)?;
    let scan_type = plan.scan_type.as_str();
    let mut cursor = plan.open()?;

    write_lines(
        cursor
            .by_ref()
            .map(|r| r.map(|entry| entry.to_json()).map_err(CliError::from)),
    )?;

    write_response(json!({
        "scan_type": scan_type,
        "returned": cursor.returned(),
        "scanned": cursor.scanned(),
        "size_limit_reached": cursor.size_limit_reached(),
    }))
}

/// Prints the explain plan, as text or JSON
pub fn explain(fixture_path: &Path, request: &SearchRequest, as_json: bool) -> CliResult<()> {
    let fixture = PartitionFixture::load(fixture_path)?;
    let default_limit = fixture.partition.size_limit;
    let (schema, store) = fixture.open()?;

    let engine = SearchEngine::new(&store, &schema).with_default_size_limit(default_limit);
    let plan = engine.explain(request);

    if as_json {
        write_response(serde_json::to_value(&plan)?)
    } else {
        write_text(&plan.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_flag_builds_request() {
        let request = build_request(
            Some(r#"{"and":[{"equality":{"attribute":"cn","value":"alice"}},{"presence":{"attribute":"sn"}}]}"#),
            Some(4),
        )
        .unwrap();
        assert_eq!(
            request,
            SearchRequest::new(ExprNode::and(vec![
                ExprNode::eq("cn", "alice"),
                ExprNode::present("sn"),
            ]))
            .with_size_limit(4)
        );
    }

    #[test]
    fn test_invalid_filter_rejected() {
        let err = parse_filter(r#"{"between":{"attribute":"cn"}}"#).unwrap_err();
        assert_eq!(err.code_str(), "DIR_CLI_INVALID_REQUEST");
    }

    #[test]
    fn test_request_size_limit_kept_without_override() {
        let request = parse_request(json!({
            "filter": { "presence": { "attribute": "cn" } },
            "size_limit": 2
        }))
        .unwrap();
        assert_eq!(request.size_limit, Some(2));
    }

    #[test]
    fn test_missing_fixture_is_config_error() {
        let request = SearchRequest::new(ExprNode::present("cn"));
        let err = search(Path::new("/nonexistent/partition.json"), &request).unwrap_err();
        assert_eq!(err.code_str(), "DIR_CLI_CONFIG_ERROR");
        assert_eq!(err.cause_code(), Some("DIR_CONFIG_IO"));
    }
}
