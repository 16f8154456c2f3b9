//! Schema error types
//!
//! Error codes:
//! - DIR_UNKNOWN_ATTRIBUTE
//! - DIR_SCHEMA_MISMATCH
//! - DIR_UNKNOWN_MATCHING_RULE
//! - DIR_MALFORMED_SCHEMA

use thiserror::Error;

/// Result type for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Schema resolution and normalization errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// Attribute name or OID absent from the schema
    #[error("Unknown attribute type: {0}")]
    UnknownAttribute(String),

    /// Value does not fit the attribute's syntax
    #[error("Value '{value}' cannot be normalized: {reason}")]
    SchemaMismatch { value: String, reason: String },

    /// Definition references a rule the registry does not know
    #[error("Unknown matching rule '{rule}' on attribute '{attribute}'")]
    UnknownMatchingRule { attribute: String, rule: String },

    /// Definition is structurally invalid
    #[error("Malformed schema ({source_name}): {reason}")]
    MalformedSchema { source_name: String, reason: String },
}

impl SchemaError {
    /// Create a schema mismatch error
    pub fn mismatch(value: impl Into<String>, reason: impl Into<String>) -> Self {
        SchemaError::SchemaMismatch {
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a malformed schema error
    pub fn malformed(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        SchemaError::MalformedSchema {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }

    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            SchemaError::UnknownAttribute(_) => "DIR_UNKNOWN_ATTRIBUTE",
            SchemaError::SchemaMismatch { .. } => "DIR_SCHEMA_MISMATCH",
            SchemaError::UnknownMatchingRule { .. } => "DIR_UNKNOWN_MATCHING_RULE",
            SchemaError::MalformedSchema { .. } => "DIR_MALFORMED_SCHEMA",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            SchemaError::UnknownAttribute("x".into()).code(),
            "DIR_UNKNOWN_ATTRIBUTE"
        );
        assert_eq!(SchemaError::mismatch("a", "b").code(), "DIR_SCHEMA_MISMATCH");
        assert_eq!(SchemaError::malformed("f", "r").code(), "DIR_MALFORMED_SCHEMA");
    }

    #[test]
    fn test_error_display() {
        let err = SchemaError::mismatch("abc", "not an integer");
        let display = format!("{}", err);
        assert!(display.contains("abc"));
        assert!(display.contains("not an integer"));
    }
}
