//! JSON I/O handling for CLI
//!
//! - Input: a single search request object on stdin
//! - Output: one JSON object per line on stdout
//! - UTF-8 only

use std::io::{self, Read, Write};

use serde_json::Value;

use super::errors::{CliError, CliResult};

/// Read all of stdin as one JSON value
pub fn read_request() -> CliResult<Value> {
    let mut input = String::new();
    io::stdin().lock().read_to_string(&mut input)?;

    if input.trim().is_empty() {
        return Err(CliError::invalid_request("Empty input"));
    }

    let value: Value = serde_json::from_str(&input)?;
    Ok(value)
}

fn write_line(out: &mut impl Write, value: &Value) -> CliResult<()> {
    serde_json::to_writer(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

/// Write a success response to stdout
pub fn write_response(data: Value) -> CliResult<()> {
    let response = serde_json::json!({
        "status": "ok",
        "data": data
    });

    let mut stdout = io::stdout().lock();
    write_line(&mut stdout, &response)?;
    stdout.flush()?;

    Ok(())
}

/// Write an error response to stdout
pub fn write_error(err: &CliError) -> CliResult<()> {
    let mut response = serde_json::json!({
        "status": "error",
        "code": err.code_str(),
        "message": err.message()
    });
    if let Some(cause) = err.cause_code() {
        response["cause"] = Value::from(cause);
    }

    let mut stdout = io::stdout().lock();
    write_line(&mut stdout, &response)?;
    stdout.flush()?;

    Ok(())
}

/// Write one JSON value per line to stdout
pub fn write_lines<I>(values: I) -> CliResult<()>
where
    I: IntoIterator<Item = CliResult<Value>>,
{
    let mut stdout = io::stdout().lock();
    for value in values {
        write_line(&mut stdout, &value?)?;
    }
    stdout.flush()?;

    Ok(())
}

/// Write plain text to stdout
pub fn write_text(text: &str) -> CliResult<()> {
    let mut stdout = io::stdout().lock();
    write!(stdout, "{}", text)?;
    stdout.flush()?;

    Ok(())
}
