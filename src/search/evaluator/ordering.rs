//! GreaterEq and LessEq
//!
//! The rule is the attribute's ordering rule, else its equality rule. A
//! value `v` satisfies LessEq iff `compare(v, assertion) <= 0`, and
//! GreaterEq iff `compare(v, assertion) >= 0`.

use std::sync::Arc;

use tracing::debug;

use crate::index::{Index, Store};
use crate::schema::{MatchingRule, NormalizedValue, SchemaRegistry};

use crate::search::errors::{SearchError, SearchResult};
use crate::search::index_entry::IndexEntry;

use super::assertion::AttributeAssertion;

/// Which side of the assertion value matches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// `>=`
    GreaterEq,
    /// `<=`
    LessEq,
}

impl Direction {
    /// Assertion kind name
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::GreaterEq => "greater_eq",
            Direction::LessEq => "less_eq",
        }
    }
}

/// `(attr>=value)` or `(attr<=value)`
#[derive(Debug)]
pub struct OrderingEvaluator<'a> {
    assertion: AttributeAssertion<'a>,
    direction: Direction,
    rule: MatchingRule,
    value: NormalizedValue,
    index: Option<Arc<Index>>,
    estimate: u64,
}

impl<'a> OrderingEvaluator<'a> {
    /// Resolves the ordering rule and normalizes the assertion
    pub fn new(
        attribute: &str,
        raw: &str,
        direction: Direction,
        store: &'a Store,
        schema: &dyn SchemaRegistry,
    ) -> SearchResult<Self> {
        let assertion = AttributeAssertion::resolve(attribute, store, schema)?;
        let at = assertion.attribute();
        let rule = at
            .ordering
            .clone()
            .or_else(|| at.equality.clone())
            .ok_or_else(|| SearchError::NoMatchingRule {
                attribute: at.name().to_string(),
                assertion: direction.as_str(),
            })?;
        let value = rule.normalize(raw)?;

        // Index keys follow the equality rule; they answer ordering only if
        // both rules normalize and compare alike
        let index = store.usable_index_for(at, schema)?.filter(|idx| {
            let compatible = idx.rule().normalizer == rule.normalizer
                && idx.comparator() == rule.comparator;
            if !compatible {
                debug!(
                    attribute = at.name(),
                    rule = rule.name,
                    "index order differs from ordering rule"
                );
            }
            compatible
        });
        let estimate = match (&index, direction) {
            (Some(idx), Direction::GreaterEq) => idx.greater_or_eq_count(&value)?,
            (Some(idx), Direction::LessEq) => idx.less_or_eq_count(&value)?,
            (None, _) => u64::MAX,
        };

        Ok(Self {
            assertion,
            direction,
            rule,
            value,
            index,
            estimate,
        })
    }

    /// Comparison direction
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Normalized assertion value
    pub fn value(&self) -> &NormalizedValue {
        &self.value
    }

    /// Rule values are compared with
    pub fn rule(&self) -> &MatchingRule {
        &self.rule
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

    fn satisfies(&self, v: &NormalizedValue) -> bool {
        let ord = self.rule.compare(v, &self.value);
        match self.direction {
            Direction::GreaterEq => ord.is_ge(),
            Direction::LessEq => ord.is_le(),
        }
    }

    /// True if some value of the candidate is on the asserted side
    pub fn evaluate(&self, candidate: &mut IndexEntry) -> SearchResult<bool> {
        if let Some(idx) = &self.index {
            let id = candidate.id();
            let found = match self.direction {
                Direction::GreaterEq => idx.reverse_greater_or_eq(id, &self.value)?,
                Direction::LessEq => idx.reverse_less_or_eq(id, &self.value)?,
            };
            return Ok(found);
        }

        let Some(entry) = self.assertion.entry(candidate)? else {
            return Ok(false);
        };
        let normalizer = self.rule.normalizer;
        let mut matched = None;
        let found = self.assertion.any_value(&entry, |v| {
            let normalized = v.normalize(normalizer)?;
            if self.satisfies(&normalized) {
                matched = Some(normalized.into_owned());
                return Ok(true);
            }
            Ok(false)
        })?;
        if let Some(key) = matched {
            candidate.set_key(key);
        }
        Ok(found)
    }
}
