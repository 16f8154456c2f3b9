//! Search error types
//!
//! Error codes:
//! - DIR_UNKNOWN_ATTRIBUTE
//! - DIR_NO_MATCHING_RULE
//! - DIR_UNSUPPORTED_MATCH
//! - DIR_SCHEMA_MISMATCH
//! - DIR_STORAGE_ERROR
//!
//! No search error is retried. Each aborts the search that raised it.

use thiserror::Error;

use crate::index::IndexError;
use crate::schema::SchemaError;

/// Result type for search operations
pub type SearchResult<T> = Result<T, SearchError>;

/// Errors raised while building or running a search
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SearchError {
    /// Filter references an attribute absent from the schema
    #[error("Unknown attribute '{0}'")]
    UnknownAttribute(String),

    /// Attribute has neither an ordering nor an equality rule
    #[error("Attribute '{attribute}' has no matching rule usable for {assertion}")]
    NoMatchingRule {
        attribute: String,
        assertion: &'static str,
    },

    /// No usable rule for this kind of assertion
    #[error("Unsupported {assertion} match on '{attribute}': {reason}")]
    UnsupportedMatch {
        attribute: String,
        assertion: &'static str,
        reason: String,
    },

    /// A value failed normalization under the attribute's syntax
    #[error("Schema mismatch for value '{value}': {reason}")]
    SchemaMismatch { value: String, reason: String },

    /// Index or master table failure
    #[error("Storage failure: {0}")]
    Storage(String),

    /// Any other schema failure
    #[error(transparent)]
    Schema(SchemaError),

    /// Any other index failure
    #[error(transparent)]
    Index(IndexError),
}

impl SearchError {
    /// Create an unsupported match error
    pub fn unsupported(
        attribute: impl Into<String>,
        assertion: &'static str,
        reason: impl Into<String>,
    ) -> Self {
        SearchError::UnsupportedMatch {
            attribute: attribute.into(),
            assertion,
            reason: reason.into(),
        }
    }

    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            SearchError::UnknownAttribute(_) => "DIR_UNKNOWN_ATTRIBUTE",
            SearchError::NoMatchingRule { .. } => "DIR_NO_MATCHING_RULE",
            SearchError::UnsupportedMatch { .. } => "DIR_UNSUPPORTED_MATCH",
            SearchError::SchemaMismatch { .. } => "DIR_SCHEMA_MISMATCH",
            SearchError::Storage(_) => "DIR_STORAGE_ERROR",
            SearchError::Schema(e) => e.code(),
            SearchError::Index(e) => e.code(),
        }
    }

    /// Storage failures are fatal; the rest describe a bad request
    pub fn is_fatal(&self) -> bool {
        matches!(self, SearchError::Storage(_))
    }
}

impl From<SchemaError> for SearchError {
    fn from(e: SchemaError) -> Self {
        match e {
            SchemaError::UnknownAttribute(name) => SearchError::UnknownAttribute(name),
            SchemaError::SchemaMismatch { value, reason } => {
                SearchError::SchemaMismatch { value, reason }
            }
            other => SearchError::Schema(other),
        }
    }
}

impl From<IndexError> for SearchError {
    fn from(e: IndexError) -> Self {
        match e {
            IndexError::Schema(schema) => schema.into(),
            IndexError::Storage(reason) => SearchError::Storage(reason),
            other => SearchError::Index(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(
            SearchError::UnknownAttribute("x".into()).code(),
            "DIR_UNKNOWN_ATTRIBUTE"
        );
        assert_eq!(
            SearchError::NoMatchingRule {
                attribute: "photo".into(),
                assertion: "less_eq"
            }
            .code(),
            "DIR_NO_MATCHING_RULE"
        );
        assert_eq!(
            SearchError::unsupported("cn", "substring", "no rule").code(),
            "DIR_UNSUPPORTED_MATCH"
        );
    }

    #[test]
    fn test_schema_errors_flatten() {
        let err: SearchError = SchemaError::UnknownAttribute("foo".into()).into();
        assert_eq!(err, SearchError::UnknownAttribute("foo".into()));

        let err: SearchError = IndexError::Schema(SchemaError::mismatch("abc", "nan")).into();
        assert_eq!(err.code(), "DIR_SCHEMA_MISMATCH");
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_storage_is_fatal() {
        let err: SearchError = IndexError::storage("disk gone").into();
        assert_eq!(err.code(), "DIR_STORAGE_ERROR");
        assert!(err.is_fatal());
    }
}
