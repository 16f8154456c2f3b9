//! CLI-specific error types
//!
//! All CLI errors end the process with a non-zero status.

use std::fmt;
use std::io;

use crate::config::ConfigError;
use crate::search::SearchError;

/// CLI error codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Fixture or partition config could not be loaded
    ConfigError,
    /// I/O error (stdin/stdout)
    IoError,
    /// Filter or request JSON is invalid
    InvalidRequest,
    /// Search was rejected or aborted
    SearchFailed,
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "DIR_CLI_CONFIG_ERROR",
            Self::IoError => "DIR_CLI_IO_ERROR",
            Self::InvalidRequest => "DIR_CLI_INVALID_REQUEST",
            Self::SearchFailed => "DIR_CLI_SEARCH_FAILED",
        }
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
    /// Code of the library error this wraps, if any
    cause: Option<&'static str>,
}

impl CliError {
    /// Create a new CLI error
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            cause: None,
        }
    }

    /// I/O error
    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    /// Invalid request
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::InvalidRequest, msg)
    }

    /// Get the error code
    pub fn code(&self) -> &CliErrorCode {
        &self.code
    }

    /// Get the error code string
    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    /// Code of the underlying library error
    pub fn cause_code(&self) -> Option<&'static str> {
        self.cause
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cause {
            Some(cause) => write!(f, "{} ({}): {}", self.code.code(), cause, self.message),
            None => write!(f, "{}: {}", self.code.code(), self.message),
        }
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::io_error(format!("JSON error: {}", e))
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        Self {
            code: CliErrorCode::ConfigError,
            message: e.to_string(),
            cause: Some(e.code()),
        }
    }
}

impl From<SearchError> for CliError {
    fn from(e: SearchError) -> Self {
        Self {
            code: CliErrorCode::SearchFailed,
            message: e.to_string(),
            cause: Some(e.code()),
        }
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;
