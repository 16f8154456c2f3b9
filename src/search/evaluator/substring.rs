//! Substring match
//!
//! The pattern `initial*any1*...*anyN*final` is normalized segment by
//! segment with the substring rule's normalizer and compiled into an
//! anchored regex over normalized values.

use std::sync::Arc;

use regex::Regex;

use crate::index::{Index, Store};
use crate::schema::{MatchingRule, NormalizedValue, Normalizer, SchemaRegistry};

use crate::search::errors::{SearchError, SearchResult};
use crate::search::index_entry::IndexEntry;

use super::assertion::AttributeAssertion;

const KIND: &str = "substring";

/// `(attr=initial*any*final)`
#[derive(Debug)]
pub struct SubstringEvaluator<'a> {
    assertion: AttributeAssertion<'a>,
    rule: MatchingRule,
    initial: Option<String>,
    matcher: Regex,
    index: Option<Arc<Index>>,
    estimate: u64,
}

impl<'a> SubstringEvaluator<'a> {
    /// Resolves the substring rule and compiles the pattern
    pub fn new(
        attribute: &str,
        initial: Option<&str>,
        any: &[String],
        final_: Option<&str>,
        store: &'a Store,
        schema: &dyn SchemaRegistry,
    ) -> SearchResult<Self> {
        let assertion = AttributeAssertion::resolve(attribute, store, schema)?;
        let at = assertion.attribute();
        let rule = at.substring.clone().ok_or_else(|| {
            SearchError::unsupported(at.name(), KIND, "attribute has no substring rule")
        })?;
        if !rule.normalizer.is_textual() {
            return Err(SearchError::unsupported(
                at.name(),
                KIND,
                format!("{} does not produce text", rule.name),
            ));
        }

        let normalizer = rule.normalizer;
        // Stored values are trimmed, so the outermost edges of the pattern are too
        let last = any.len().saturating_sub(1);
        let any = any
            .iter()
            .enumerate()
            .map(|(i, s)| {
                let trim_start = initial.is_none() && i == 0;
                let trim_end = final_.is_none() && i == last;
                normalizer.normalize_segment(s, trim_start, trim_end)
            })
            .collect::<Result<Vec<_>, _>>()?;
        let initial = initial
            .map(|s| normalizer.normalize_segment(s, true, false))
            .transpose()?;
        let final_ = final_
            .map(|s| normalizer.normalize_segment(s, false, true))
            .transpose()?;
        let matcher = compile(initial.as_deref(), &any, final_.as_deref())
            .map_err(|e| SearchError::unsupported(at.name(), KIND, e.to_string()))?;

        let index = store
            .usable_index_for(at, schema)?
            .filter(|idx| idx.rule().normalizer == normalizer);
        let estimate = match &index {
            Some(idx) => idx.count()?,
            None => u64::MAX,
        };

        Ok(Self {
            assertion,
            rule,
            initial,
            matcher,
            index,
            estimate,
        })
    }

    /// Normalized initial component, usable as an index scan prefix
    pub fn prefix(&self) -> Option<&str> {
        self.initial.as_deref()
    }

    /// Index whose keys this pattern can be matched against, if any
    pub fn index(&self) -> Option<&Arc<Index>> {
        self.index.as_ref()
    }

    /// Asserted attribute
    pub fn assertion(&self) -> &AttributeAssertion<'a> {
        &self.assertion
    }

    /// Upper bound of matches
    pub fn estimate(&self) -> u64 {
        self.estimate
    }

    /// True if a normalized value matches the pattern
    pub fn matches(&self, value: &NormalizedValue) -> bool {
        value.as_text().map_or(false, |t| self.matcher.is_match(t))
    }

    /// True if some value of the candidate matches the pattern
    pub fn evaluate(&self, candidate: &mut IndexEntry) -> SearchResult<bool> {
        if let Some(idx) = &self.index {
            let keys = idx.reverse_lookup(candidate.id())?;
            return match keys.into_iter().find(|k| self.matches(k)) {
                Some(key) => {
                    candidate.set_key(key);
                    Ok(true)
                }
                None => Ok(false),
            };
        }

        let Some(entry) = self.assertion.entry(candidate)? else {
            return Ok(false);
        };
        let normalizer: Normalizer = self.rule.normalizer;
        self.assertion
            .any_value(&entry, |v| Ok(self.matches(&*v.normalize(normalizer)?)))
    }
}

fn compile(initial: Option<&str>, any: &[String], final_: Option<&str>) -> Result<Regex, regex::Error> {
    let mut pattern = String::from("(?s)^");
    if let Some(i) = initial {
        pattern.push_str(&regex::escape(i));
    }
    pattern.push_str(".*");
    for a in any {
        pattern.push_str(&regex::escape(a));
        pattern.push_str(".*");
    }
    if let Some(f) = final_ {
        pattern.push_str(&regex::escape(f));
    }
    pattern.push('$');
    Regex::new(&pattern)
}
