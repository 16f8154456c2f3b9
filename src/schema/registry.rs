//! Attribute type registry
//!
//! The registry is the schema facade consumed by the index and search
//! subsystems. It is passed explicitly to every component that needs it.

use std::collections::HashMap;
use std::sync::Arc;

use super::errors::{SchemaError, SchemaResult};
use super::types::AttributeType;

/// Read-only schema lookups used by the search engine
pub trait SchemaRegistry {
    /// Resolves an attribute name or OID to its type
    fn resolve_attribute_type(&self, name: &str) -> SchemaResult<Arc<AttributeType>>;

    /// Returns every transitive subtype of `at` (empty if none)
    fn descendants_of(&self, at: &AttributeType) -> Vec<Arc<AttributeType>>;

    /// Returns true if `candidate` is a transitive subtype of `ancestor`
    fn is_descendant_of(&self, candidate: &AttributeType, ancestor: &AttributeType) -> bool {
        self.descendants_of(ancestor)
            .iter()
            .any(|d| d.oid == candidate.oid)
    }
}

/// In-memory registry keyed by lowercased name and by OID
#[derive(Debug, Default)]
pub struct AttributeTypeRegistry {
    /// name or OID -> type
    by_id: HashMap<String, Arc<AttributeType>>,
    /// OID -> OIDs of direct subtypes, in registration order
    children: HashMap<String, Vec<String>>,
    /// OIDs in registration order
    order: Vec<String>,
}

impl AttributeTypeRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a resolved attribute type.
    ///
    /// The superior, if any, must already be registered. Rules the type does
    /// not declare are inherited from its superior.
    pub fn register(&mut self, mut at: AttributeType) -> SchemaResult<Arc<AttributeType>> {
        at.names = at.names.iter().map(|n| n.to_lowercase()).collect();

        if self.by_id.contains_key(&at.oid) {
            return Err(SchemaError::malformed(
                at.oid.clone(),
                "attribute type registered twice",
            ));
        }
        for name in &at.names {
            if self.by_id.contains_key(name) {
                return Err(SchemaError::malformed(
                    at.oid.clone(),
                    format!("name '{}' already in use", name),
                ));
            }
        }

        if let Some(sup_id) = at.superior.clone() {
            let sup = self.resolve_attribute_type(&sup_id).map_err(|_| {
                SchemaError::malformed(
                    at.oid.clone(),
                    format!("superior '{}' is not registered", sup_id),
                )
            })?;
            at.superior = Some(sup.oid.clone());
            at.equality = at.equality.or_else(|| sup.equality.clone());
            at.ordering = at.ordering.or_else(|| sup.ordering.clone());
            at.substring = at.substring.or_else(|| sup.substring.clone());
            self.children
                .entry(sup.oid.clone())
                .or_default()
                .push(at.oid.clone());
        }

        let at = Arc::new(at);
        for id in at.identifiers() {
            self.by_id.insert(id.to_string(), Arc::clone(&at));
        }
        self.order.push(at.oid.clone());
        Ok(at)
    }

    /// Returns the number of registered types
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns true if no type is registered
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Iterates registered types in registration order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<AttributeType>> {
        self.order.iter().filter_map(|oid| self.by_id.get(oid))
    }
}

impl SchemaRegistry for AttributeTypeRegistry {
    fn resolve_attribute_type(&self, name: &str) -> SchemaResult<Arc<AttributeType>> {
        self.by_id
            .get(&name.to_lowercase())
            .or_else(|| self.by_id.get(name))
            .cloned()
            .ok_or_else(|| SchemaError::UnknownAttribute(name.to_string()))
    }

    fn descendants_of(&self, at: &AttributeType) -> Vec<Arc<AttributeType>> {
        // Depth-first, preserving registration order among siblings
        let mut result = Vec::new();
        let mut stack: Vec<&String> = match self.children.get(&at.oid) {
            Some(c) => c.iter().rev().collect(),
            None => return result,
        };
        while let Some(oid) = stack.pop() {
            if let Some(d) = self.by_id.get(oid) {
                result.push(Arc::clone(d));
            }
            if let Some(grand) = self.children.get(oid) {
                stack.extend(grand.iter().rev());
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::types::MatchingRule;

    fn at(oid: &str, names: &[&str], sup: Option<&str>, eq: Option<&str>) -> AttributeType {
        AttributeType {
            oid: oid.into(),
            names: names.iter().map(|s| s.to_string()).collect(),
            superior: sup.map(Into::into),
            equality: eq.and_then(MatchingRule::by_name),
            ordering: None,
            substring: None,
        }
    }

    fn registry() -> AttributeTypeRegistry {
        let mut reg = AttributeTypeRegistry::new();
        reg.register(at("2.5.4.41", &["name"], None, Some("caseIgnoreMatch")))
            .unwrap();
        reg.register(at("2.5.4.3", &["cn", "commonName"], Some("name"), None))
            .unwrap();
        reg.register(at("2.5.4.4", &["sn", "surname"], Some("name"), None))
            .unwrap();
        reg.register(at("1.9.1", &["nickCn"], Some("cn"), None)).unwrap();
        reg
    }

    #[test]
    fn test_resolve_by_name_and_oid() {
        let reg = registry();
        let by_name = reg.resolve_attribute_type("CommonName").unwrap();
        let by_oid = reg.resolve_attribute_type("2.5.4.3").unwrap();
        assert_eq!(by_name.oid, by_oid.oid);
    }

    #[test]
    fn test_unknown_attribute() {
        let reg = registry();
        let err = reg.resolve_attribute_type("nope").unwrap_err();
        assert_eq!(err.code(), "DIR_UNKNOWN_ATTRIBUTE");
    }

    #[test]
    fn test_rules_inherited_from_superior() {
        let reg = registry();
        let cn = reg.resolve_attribute_type("cn").unwrap();
        assert_eq!(cn.equality.as_ref().unwrap().name, "caseIgnoreMatch");
    }

    #[test]
    fn test_descendants_transitive() {
        let reg = registry();
        let name = reg.resolve_attribute_type("name").unwrap();
        let oids: Vec<_> = reg
            .descendants_of(&name)
            .iter()
            .map(|d| d.oid.clone())
            .collect();
        assert_eq!(oids, vec!["2.5.4.3", "1.9.1", "2.5.4.4"]);

        let sn = reg.resolve_attribute_type("sn").unwrap();
        assert!(reg.descendants_of(&sn).is_empty());
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut reg = registry();
        let err = reg
            .register(at("9.9", &["cn"], None, None))
            .unwrap_err();
        assert_eq!(err.code(), "DIR_MALFORMED_SCHEMA");
    }

    #[test]
    fn test_unregistered_superior_rejected() {
        let mut reg = AttributeTypeRegistry::new();
        let err = reg
            .register(at("9.9", &["x"], Some("missing"), None))
            .unwrap_err();
        assert_eq!(err.code(), "DIR_MALFORMED_SCHEMA");
    }
}
