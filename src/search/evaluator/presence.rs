//! Presence

use crate::index::{Index, Store};
use crate::schema::{NormalizedValue, SchemaRegistry};

use crate::search::errors::SearchResult;
use crate::search::index_entry::IndexEntry;

use super::assertion::AttributeAssertion;

/// `(attr=*)`
#[derive(Debug)]
pub struct PresenceEvaluator<'a> {
    assertion: AttributeAssertion<'a>,
    presence: &'a Index,
    /// Presence index key, when the attribute is indexed
    key: Option<NormalizedValue>,
    estimate: u64,
}

impl<'a> PresenceEvaluator<'a> {
    /// Resolves the attribute. No matching rule is needed.
    pub fn new(
        attribute: &str,
        store: &'a Store,
        schema: &dyn SchemaRegistry,
    ) -> SearchResult<Self> {
        let assertion = AttributeAssertion::resolve(attribute, store, schema)?;
        let presence = store.presence_index();
        let key = store
            .usable_index_for(assertion.attribute(), schema)?
            .map(|idx| NormalizedValue::Text(idx.attribute().oid.clone()));
        let estimate = match &key {
            Some(k) => presence.count_of(k)?,
            None => u64::MAX,
        };
        Ok(Self {
            assertion,
            presence,
            key,
            estimate,
        })
    }

    /// Presence index key, if the presence index answers this assertion
    pub fn key(&self) -> Option<&NormalizedValue> {
        self.key.as_ref()
    }

    /// The partition's presence index
    pub fn presence_index(&self) -> &'a Index {
        self.presence
    }

    /// Asserted attribute
    pub fn assertion(&self) -> &AttributeAssertion<'a> {
        &self.assertion
    }

    /// Expected number of matches
    pub fn estimate(&self) -> u64 {
        self.estimate
    }

    /// True if the candidate has any value of the attribute or a subtype
    pub fn evaluate(&self, candidate: &mut IndexEntry) -> SearchResult<bool> {
        if let Some(key) = &self.key {
            return Ok(self.presence.forward(key, candidate.id())?);
        }
        let Some(entry) = self.assertion.entry(candidate)? else {
            return Ok(false);
        };
        self.assertion.any_value(&entry, |_| Ok(true))
    }
}
