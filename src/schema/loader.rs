//! Schema loader
//!
//! Attribute type definitions are plain JSON:
//!
//! ```json
//! [
//!   { "oid": "2.5.4.41", "names": ["name"], "equality": "caseIgnoreMatch",
//!     "substring": "caseIgnoreSubstringsMatch" },
//!   { "oid": "2.5.4.3", "names": ["cn", "commonName"], "superior": "name" }
//! ]
//! ```
//!
//! Definitions may appear in any order; a type is registered once its
//! superior is. Cycles or dangling superiors fail loading.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::errors::{SchemaError, SchemaResult};
use super::registry::{AttributeTypeRegistry, SchemaRegistry};
use super::types::{AttributeType, MatchingRule};

/// Serialized attribute type definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeTypeDef {
    /// Numeric OID
    pub oid: String,
    /// Names, primary first
    #[serde(default)]
    pub names: Vec<String>,
    /// Superior type name or OID
    #[serde(default)]
    pub superior: Option<String>,
    /// Equality rule name
    #[serde(default)]
    pub equality: Option<String>,
    /// Ordering rule name
    #[serde(default)]
    pub ordering: Option<String>,
    /// Substring rule name
    #[serde(default)]
    pub substring: Option<String>,
}

impl AttributeTypeDef {
    /// Resolves rule names into an `AttributeType`
    pub fn resolve(&self) -> SchemaResult<AttributeType> {
        if self.oid.trim().is_empty() {
            return Err(SchemaError::malformed("<definition>", "empty OID"));
        }
        let rule = |name: &Option<String>| -> SchemaResult<Option<MatchingRule>> {
            match name {
                None => Ok(None),
                Some(n) => MatchingRule::by_name(n).map(Some).ok_or_else(|| {
                    SchemaError::UnknownMatchingRule {
                        attribute: self.oid.clone(),
                        rule: n.clone(),
                    }
                }),
            }
        };
        Ok(AttributeType {
            oid: self.oid.clone(),
            names: self.names.clone(),
            superior: self.superior.clone(),
            equality: rule(&self.equality)?,
            ordering: rule(&self.ordering)?,
            substring: rule(&self.substring)?,
        })
    }
}

/// Loads attribute type definitions into a registry
pub struct SchemaLoader;

impl SchemaLoader {
    /// Builds a registry from definitions in any order.
    pub fn from_definitions(defs: &[AttributeTypeDef]) -> SchemaResult<AttributeTypeRegistry> {
        let mut registry = AttributeTypeRegistry::new();
        let mut pending: Vec<&AttributeTypeDef> = defs.iter().collect();

        while !pending.is_empty() {
            let before = pending.len();
            let mut deferred = Vec::new();

            for def in pending {
                let ready = match &def.superior {
                    None => true,
                    Some(sup) => registry.resolve_attribute_type(sup).is_ok(),
                };
                if ready {
                    registry.register(def.resolve()?)?;
                } else {
                    deferred.push(def);
                }
            }

            if deferred.len() == before {
                let oids: Vec<_> = deferred.iter().map(|d| d.oid.as_str()).collect();
                return Err(SchemaError::malformed(
                    "<definitions>",
                    format!("unresolvable superiors for {}", oids.join(", ")),
                ));
            }
            pending = deferred;
        }

        Ok(registry)
    }

    /// Parses definitions from a JSON string
    pub fn from_json(json: &str) -> SchemaResult<AttributeTypeRegistry> {
        let defs: Vec<AttributeTypeDef> = serde_json::from_str(json)
            .map_err(|e| SchemaError::malformed("<json>", format!("Invalid JSON: {}", e)))?;
        Self::from_definitions(&defs)
    }

    /// Loads definitions from a JSON file
    pub fn from_file(path: &Path) -> SchemaResult<AttributeTypeRegistry> {
        let content = fs::read_to_string(path).map_err(|e| {
            SchemaError::malformed(
                path.display().to_string(),
                format!("Failed to read file: {}", e),
            )
        })?;
        Self::from_json(&content).map_err(|e| match e {
            SchemaError::MalformedSchema { reason, .. } => {
                SchemaError::malformed(path.display().to_string(), reason)
            }
            other => other,
        })
    }
}
