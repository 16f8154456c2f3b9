//! Equality and approximate match

use std::sync::Arc;

use tracing::trace;

use crate::index::{Index, Store};
use crate::schema::{MatchingRule, NormalizedValue, SchemaRegistry};

use crate::search::errors::{SearchError, SearchResult};
use crate::search::index_entry::IndexEntry;

use super::assertion::AttributeAssertion;

/// `(attr=value)`, and `(attr~=value)` which is evaluated the same way
#[derive(Debug)]
pub struct EqualityEvaluator<'a> {
    assertion: AttributeAssertion<'a>,
    rule: MatchingRule,
    value: NormalizedValue,
    index: Option<Arc<Index>>,
    estimate: u64,
}

impl<'a> EqualityEvaluator<'a> {
    /// Resolves the attribute's equality rule and normalizes the assertion
    pub fn new(
        attribute: &str,
        raw: &str,
        kind: &'static str,
        store: &'a Store,
        schema: &dyn SchemaRegistry,
    ) -> SearchResult<Self> {
        let assertion = AttributeAssertion::resolve(attribute, store, schema)?;
        let rule = assertion.attribute().equality.clone().ok_or_else(|| {
            SearchError::unsupported(assertion.name(), kind, "attribute has no equality rule")
        })?;
        let value = rule.normalize(raw)?;
        let index = store.usable_index_for(assertion.attribute(), schema)?;
        let estimate = match &index {
            Some(idx) => idx.count_of(&value)?,
            None => u64::MAX,
        };
        Ok(Self {
            assertion,
            rule,
            value,
            index,
            estimate,
        })
    }

    /// Normalized assertion value
    pub fn value(&self) -> &NormalizedValue {
        &self.value
    }

    /// Index answering this assertion, if any
    pub fn index(&self) -> Option<&Arc<Index>> {
        self.index.as_ref()
    }

    /// Asserted attribute
    pub fn assertion(&self) -> &AttributeAssertion<'a> {
        &self.assertion
    }

    /// Expected number of matches
    pub fn estimate(&self) -> u64 {
        self.estimate
    }

    /// True if the candidate holds the asserted value
    pub fn evaluate(&self, candidate: &mut IndexEntry) -> SearchResult<bool> {
        if let Some(idx) = &self.index {
            let found = idx.forward(&self.value, candidate.id())?;
            if found {
                candidate.set_key(self.value.clone());
            }
            return Ok(found);
        }

        let Some(entry) = self.assertion.entry(candidate)? else {
            return Ok(false);
        };
        let normalizer = self.rule.normalizer;
        let found = self.assertion.any_value(&entry, |v| {
            Ok(self.rule.compare(&*v.normalize(normalizer)?, &self.value).is_eq())
        })?;
        if found {
            candidate.set_key(self.value.clone());
        }
        trace!(id = candidate.id(), attribute = self.assertion.name(), found, "equality");
        Ok(found)
    }
}
