//! Index and store error types
//!
//! Error codes:
//! - DIR_SCHEMA_MISMATCH / DIR_UNKNOWN_ATTRIBUTE (from schema resolution)
//! - DIR_STORAGE_ERROR
//! - DIR_DUPLICATE_INDEX
//! - DIR_DUPLICATE_ENTRY
//! - DIR_NOT_INDEXABLE

use thiserror::Error;

use crate::entry::EntryId;
use crate::schema::SchemaError;

/// Result type for index operations
pub type IndexResult<T> = Result<T, IndexError>;

/// Index, master table and store errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexError {
    /// Value or attribute does not fit the schema
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Underlying storage failure
    #[error("Storage failure: {0}")]
    Storage(String),

    /// An index already exists for the attribute
    #[error("Attribute '{0}' is already indexed")]
    DuplicateIndex(String),

    /// The master table already holds the id
    #[error("Entry {0} already exists")]
    DuplicateEntry(EntryId),

    /// Attribute has no equality rule to build index keys with
    #[error("Attribute '{0}' has no equality matching rule and cannot be indexed")]
    NotIndexable(String),
}

impl IndexError {
    /// Create a storage error
    pub fn storage(reason: impl Into<String>) -> Self {
        IndexError::Storage(reason.into())
    }

    /// Storage error for a poisoned lock
    pub(crate) fn poisoned(what: &str) -> Self {
        IndexError::Storage(format!("{} lock poisoned by a failed writer", what))
    }

    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            IndexError::Schema(e) => e.code(),
            IndexError::Storage(_) => "DIR_STORAGE_ERROR",
            IndexError::DuplicateIndex(_) => "DIR_DUPLICATE_INDEX",
            IndexError::DuplicateEntry(_) => "DIR_DUPLICATE_ENTRY",
            IndexError::NotIndexable(_) => "DIR_NOT_INDEXABLE",
        }
    }

    /// Storage failures are fatal for the operation that hit them
    pub fn is_fatal(&self) -> bool {
        matches!(self, IndexError::Storage(_))
    }
}
