//! Directory entries and attribute values
//!
//! An `Entry` is what the master table stores under an `EntryId`.
//! Attribute descriptions are keyed lowercased, exactly as written by the
//! client (a name or an OID); resolution against the schema happens when
//! the entry is stored and when it is evaluated.

mod value;

pub use value::Value;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::schema::AttributeType;

/// Entry identifier, the master table key
pub type EntryId = u64;

/// A directory entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Identifier in the master table
    pub id: EntryId,
    /// Distinguished name
    #[serde(default)]
    pub dn: String,
    /// Attribute description (lowercased) -> values
    #[serde(default, deserialize_with = "lowercase_keys")]
    attributes: BTreeMap<String, Vec<Value>>,
}

impl Entry {
    /// Creates an entry with no attributes
    pub fn new(id: EntryId, dn: impl Into<String>) -> Self {
        Self {
            id,
            dn: dn.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Adds a value to an attribute
    pub fn with_value(mut self, attribute: &str, raw: impl Into<String>) -> Self {
        self.add_value(attribute, raw);
        self
    }

    /// Adds a value to an attribute
    pub fn add_value(&mut self, attribute: &str, raw: impl Into<String>) {
        self.attributes
            .entry(attribute.to_lowercase())
            .or_default()
            .push(Value::new(raw));
    }

    /// Returns the values stored under an attribute type (by any of its
    /// names or its OID), not including subtypes.
    pub fn values_of(&self, at: &AttributeType) -> Option<&[Value]> {
        at.identifiers()
            .find_map(|id| self.attributes.get(&id.to_lowercase()))
            .map(Vec::as_slice)
    }

    /// Returns true if the entry has at least one value of the type
    pub fn has(&self, at: &AttributeType) -> bool {
        self.values_of(at).map_or(false, |v| !v.is_empty())
    }

    /// Iterates attribute descriptions and their values
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &[Value])> {
        self.attributes
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Returns a JSON view of the entry for output
    pub fn to_json(&self) -> serde_json::Value {
        let attrs: serde_json::Map<String, serde_json::Value> = self
            .attributes
            .iter()
            .map(|(k, vals)| {
                let raws = vals
                    .iter()
                    .map(|v| serde_json::Value::String(v.raw().to_string()))
                    .collect();
                (k.clone(), serde_json::Value::Array(raws))
            })
            .collect();
        serde_json::json!({ "id": self.id, "dn": self.dn, "attributes": attrs })
    }
}

fn lowercase_keys<'de, D>(deserializer: D) -> Result<BTreeMap<String, Vec<Value>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = BTreeMap::<String, Vec<Value>>::deserialize(deserializer)?;
    let mut attributes: BTreeMap<String, Vec<Value>> = BTreeMap::new();
    for (k, mut vals) in raw {
        attributes.entry(k.to_lowercase()).or_default().append(&mut vals);
    }
    Ok(attributes)
}
