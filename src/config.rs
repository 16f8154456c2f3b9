//! Partition configuration
//!
//! A partition config names the partition, its user indexes and an
//! optional default size limit:
//!
//! ```json
//! {
//!   "id": "people",
//!   "indexes": [
//!     { "attribute": "cn" },
//!     { "attribute": "name", "include_descendants": true }
//!   ],
//!   "size_limit": 500
//! }
//! ```
//!
//! A fixture bundles a schema, a partition config and its entries, and is
//! what the CLI searches.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::entry::Entry;
use crate::index::{IndexError, Store};
use crate::schema::{AttributeTypeDef, AttributeTypeRegistry, SchemaError, SchemaLoader};

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("Failed to read '{path}': {reason}")]
    Io { path: String, reason: String },

    /// File is not valid JSON for the expected shape
    #[error("Invalid JSON in '{path}': {reason}")]
    Parse { path: String, reason: String },

    /// Semantic problem in an otherwise well-formed config
    #[error("Invalid partition config: {0}")]
    Invalid(String),

    /// Schema definitions do not load
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Index creation or entry loading failed
    #[error(transparent)]
    Index(#[from] IndexError),
}

impl ConfigError {
    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            ConfigError::Io { .. } => "DIR_CONFIG_IO",
            ConfigError::Parse { .. } => "DIR_CONFIG_PARSE",
            ConfigError::Invalid(_) => "DIR_CONFIG_INVALID",
            ConfigError::Schema(e) => e.code(),
            ConfigError::Index(e) => e.code(),
        }
    }
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> ConfigResult<T> {
    let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// One user index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Attribute name or OID
    pub attribute: String,
    /// Also index values of subtypes (default: false)
    #[serde(default)]
    pub include_descendants: bool,
}

/// Partition configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionConfig {
    /// Partition id
    pub id: String,
    /// User indexes
    #[serde(default)]
    pub indexes: Vec<IndexConfig>,
    /// Default size limit for searches that set none
    #[serde(default)]
    pub size_limit: Option<u64>,
}

impl PartitionConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let config: PartitionConfig = read_json(path)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.id.trim().is_empty() {
            return Err(ConfigError::Invalid("partition id must not be empty".into()));
        }
        if self.indexes.iter().any(|i| i.attribute.trim().is_empty()) {
            return Err(ConfigError::Invalid("index attribute must not be empty".into()));
        }
        Ok(())
    }

    /// Creates an empty store with the configured indexes
    pub fn open_store(&self, schema: &AttributeTypeRegistry) -> ConfigResult<Store> {
        self.validate()?;
        let store = Store::new(self.id.clone());
        for index in &self.indexes {
            store.add_index(&index.attribute, index.include_descendants, schema)?;
        }
        Ok(store)
    }
}

/// Schema, partition and entries in one document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartitionFixture {
    /// Attribute type definitions
    pub schema: Vec<AttributeTypeDef>,
    /// Partition configuration
    pub partition: PartitionConfig,
    /// Entries to load
    #[serde(default)]
    pub entries: Vec<Entry>,
}

impl PartitionFixture {
    /// Load a fixture from file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        read_json(path)
    }

    /// Parses a fixture from a JSON string
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        serde_json::from_str(json).map_err(|e| ConfigError::Parse {
            path: "<json>".into(),
            reason: e.to_string(),
        })
    }

    /// Builds the schema and a populated store
    pub fn open(self) -> ConfigResult<(AttributeTypeRegistry, Store)> {
        let schema = SchemaLoader::from_definitions(&self.schema)?;
        let store = self.partition.open_store(&schema)?;
        let count = self.entries.len();
        for entry in self.entries {
            store.add_entry(entry, &schema)?;
        }
        info!(
            partition = %self.partition.id,
            entries = count,
            indexes = self.partition.indexes.len(),
            "partition loaded"
        );
        Ok((schema, store))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn fixture_json() -> serde_json::Value {
        json!({
            "schema": [
                { "oid": "2.5.4.41", "names": ["name"], "equality": "caseIgnoreMatch" },
                { "oid": "2.5.4.3", "names": ["cn"], "superior": "name" }
            ],
            "partition": {
                "id": "people",
                "indexes": [{ "attribute": "name", "include_descendants": true }]
            },
            "entries": [
                { "id": 1, "dn": "cn=a", "attributes": { "CN": ["Alice"] } }
            ]
        })
    }

    #[test]
    fn test_partition_defaults() {
        let config: PartitionConfig = serde_json::from_value(json!({ "id": "p" })).unwrap();
        assert!(config.indexes.is_empty());
        assert_eq!(config.size_limit, None);
    }

    #[test]
    fn test_load_partition_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "id": "people", "indexes": [{{ "attribute": "cn" }}], "size_limit": 5 }}"#
        )
        .unwrap();

        let config = PartitionConfig::load(file.path()).unwrap();
        assert_eq!(config.id, "people");
        assert_eq!(config.indexes[0].attribute, "cn");
        assert!(!config.indexes[0].include_descendants);
        assert_eq!(config.size_limit, Some(5));
    }

    #[test]
    fn test_empty_id_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{ "id": " " }}"#).unwrap();
        let err = PartitionConfig::load(file.path()).unwrap_err();
        assert_eq!(err.code(), "DIR_CONFIG_INVALID");
    }

    #[test]
    fn test_missing_file() {
        let err = PartitionConfig::load(Path::new("/nonexistent/partition.json")).unwrap_err();
        assert_eq!(err.code(), "DIR_CONFIG_IO");
    }

    #[test]
    fn test_fixture_opens_populated_store() {
        let fixture = PartitionFixture::from_json(&fixture_json().to_string()).unwrap();
        let (_schema, store) = fixture.open().unwrap();

        assert_eq!(store.partition_id(), "people");
        assert_eq!(store.master_table().count().unwrap(), 1);
        let idx = store.index_for("name").unwrap().unwrap();
        assert!(idx.includes_descendants());
        assert_eq!(idx.count().unwrap(), 1);
    }

    #[test]
    fn test_fixture_unknown_index_attribute() {
        let mut value = fixture_json();
        value["partition"]["indexes"] = json!([{ "attribute": "shoeSize" }]);
        let fixture = PartitionFixture::from_json(&value.to_string()).unwrap();
        let err = fixture.open().unwrap_err();
        assert_eq!(err.code(), "DIR_UNKNOWN_ATTRIBUTE");
    }

    #[test]
    fn test_fixture_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", fixture_json()).unwrap();
        let fixture = PartitionFixture::load(file.path()).unwrap();
        assert_eq!(fixture.entries.len(), 1);
    }
}
