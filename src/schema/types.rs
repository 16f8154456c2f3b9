//! Attribute types and matching rules
//!
//! A matching rule pairs a `Normalizer` (raw value -> canonical form) with a
//! `Comparator` (total order over canonical forms). Both are closed enums so
//! every rule the registry can hand out is known at compile time.

use std::cmp::Ordering;
use std::fmt;

use super::errors::{SchemaError, SchemaResult};

/// Canonical, comparable form of an attribute value.
///
/// Ordering is deterministic: Integer < Text. Within one index every key is
/// produced by the same normalizer, so keys never mix variants.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NormalizedValue {
    /// Numeric value
    Integer(i64),
    /// String value
    Text(String),
}

impl NormalizedValue {
    /// Returns the text form, if this is a text value
    pub fn as_text(&self) -> Option<&str> {
        match self {
            NormalizedValue::Text(s) => Some(s),
            NormalizedValue::Integer(_) => None,
        }
    }
}

impl fmt::Display for NormalizedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NormalizedValue::Integer(i) => write!(f, "{}", i),
            NormalizedValue::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Value normalizers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Normalizer {
    /// Keeps the value byte for byte
    NoOp,
    /// Trims and collapses inner whitespace runs to a single space
    DeepTrim,
    /// `DeepTrim` followed by lowercasing
    DeepTrimToLower,
    /// Parses a signed decimal integer
    Numeric,
    /// Accepts TRUE / FALSE in any case
    Boolean,
}

impl Normalizer {
    /// Normalizes a raw value.
    ///
    /// Fails with a schema mismatch when the value does not fit the syntax.
    pub fn normalize(&self, raw: &str) -> SchemaResult<NormalizedValue> {
        match self {
            Normalizer::NoOp => Ok(NormalizedValue::Text(raw.to_string())),
            Normalizer::DeepTrim => Ok(NormalizedValue::Text(deep_trim(raw))),
            Normalizer::DeepTrimToLower => {
                Ok(NormalizedValue::Text(deep_trim(raw).to_lowercase()))
            }
            Normalizer::Numeric => {
                let trimmed = raw.trim();
                trimmed
                    .parse::<i64>()
                    .map(NormalizedValue::Integer)
                    .map_err(|_| SchemaError::mismatch(raw, "not an integer"))
            }
            Normalizer::Boolean => match raw.trim().to_ascii_uppercase().as_str() {
                "TRUE" => Ok(NormalizedValue::Text("TRUE".to_string())),
                "FALSE" => Ok(NormalizedValue::Text("FALSE".to_string())),
                _ => Err(SchemaError::mismatch(raw, "not a boolean")),
            },
        }
    }

    /// Returns true if this normalizer produces text values
    pub fn is_textual(&self) -> bool {
        !matches!(self, Normalizer::Numeric)
    }

    /// Normalizes one substring assertion component.
    ///
    /// Case folding follows the normalizer and inner whitespace collapses.
    /// Edge spaces are kept unless the edge is trimmed with `trim_start` or
    /// `trim_end`, which callers set for the outer edges of the pattern.
    pub fn normalize_segment(
        &self,
        raw: &str,
        trim_start: bool,
        trim_end: bool,
    ) -> SchemaResult<String> {
        let trim = |s: String| -> String {
            let s = if trim_start { s.trim_start() } else { s.as_str() };
            let s = if trim_end { s.trim_end() } else { s };
            s.to_string()
        };
        match self {
            Normalizer::NoOp => Ok(raw.to_string()),
            Normalizer::DeepTrim => Ok(trim(collapse_whitespace(raw))),
            Normalizer::DeepTrimToLower => Ok(trim(collapse_whitespace(raw)).to_lowercase()),
            Normalizer::Boolean => Ok(trim(raw.to_ascii_uppercase())),
            Normalizer::Numeric => Err(SchemaError::mismatch(
                raw,
                "substring components need a textual syntax",
            )),
        }
    }
}

fn deep_trim(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn collapse_whitespace(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut in_space = false;
    for c in raw.chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}

/// Comparators over normalized values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparator {
    /// Code point order on text
    Lexical,
    /// Numeric order on integers
    Numeric,
}

impl Comparator {
    /// Compares two normalized values.
    pub fn compare(&self, a: &NormalizedValue, b: &NormalizedValue) -> Ordering {
        match (self, a, b) {
            (Comparator::Numeric, NormalizedValue::Integer(x), NormalizedValue::Integer(y)) => {
                x.cmp(y)
            }
            (Comparator::Lexical, NormalizedValue::Text(x), NormalizedValue::Text(y)) => x.cmp(y),
            // Mixed variants only occur when a caller bypasses the normalizer
            _ => a.cmp(b),
        }
    }
}

/// A schema matching rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchingRule {
    /// Rule name, e.g. `caseIgnoreMatch`
    pub name: &'static str,
    /// Normalizer applied to values before comparison
    pub normalizer: Normalizer,
    /// Comparator over normalized values
    pub comparator: Comparator,
}

/// The standard rules known to the registry.
const RULES: &[MatchingRule] = &[
    MatchingRule::new("caseIgnoreMatch", Normalizer::DeepTrimToLower, Comparator::Lexical),
    MatchingRule::new("caseIgnoreOrderingMatch", Normalizer::DeepTrimToLower, Comparator::Lexical),
    MatchingRule::new("caseIgnoreSubstringsMatch", Normalizer::DeepTrimToLower, Comparator::Lexical),
    MatchingRule::new("caseExactMatch", Normalizer::DeepTrim, Comparator::Lexical),
    MatchingRule::new("caseExactOrderingMatch", Normalizer::DeepTrim, Comparator::Lexical),
    MatchingRule::new("caseExactSubstringsMatch", Normalizer::DeepTrim, Comparator::Lexical),
    MatchingRule::new("integerMatch", Normalizer::Numeric, Comparator::Numeric),
    MatchingRule::new("integerOrderingMatch", Normalizer::Numeric, Comparator::Numeric),
    MatchingRule::new("booleanMatch", Normalizer::Boolean, Comparator::Lexical),
    MatchingRule::new("octetStringMatch", Normalizer::NoOp, Comparator::Lexical),
    MatchingRule::new("octetStringOrderingMatch", Normalizer::NoOp, Comparator::Lexical),
];

impl MatchingRule {
    /// Creates a rule
    pub const fn new(name: &'static str, normalizer: Normalizer, comparator: Comparator) -> Self {
        Self {
            name,
            normalizer,
            comparator,
        }
    }

    /// Looks up a standard rule by name (case-insensitive)
    pub fn by_name(name: &str) -> Option<MatchingRule> {
        RULES
            .iter()
            .find(|r| r.name.eq_ignore_ascii_case(name))
            .cloned()
    }

    /// Normalizes a raw value with this rule's normalizer
    pub fn normalize(&self, raw: &str) -> SchemaResult<NormalizedValue> {
        self.normalizer.normalize(raw)
    }

    /// Compares two normalized values with this rule's comparator
    pub fn compare(&self, a: &NormalizedValue, b: &NormalizedValue) -> Ordering {
        self.comparator.compare(a, b)
    }
}

/// Schema identity of an attribute. Immutable once resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeType {
    /// Numeric OID
    pub oid: String,
    /// Names, lowercased; the first one is the primary name
    pub names: Vec<String>,
    /// OID of the direct superior type, if any
    pub superior: Option<String>,
    /// Equality rule
    pub equality: Option<MatchingRule>,
    /// Ordering rule
    pub ordering: Option<MatchingRule>,
    /// Substring rule
    pub substring: Option<MatchingRule>,
}

impl AttributeType {
    /// Returns the primary name, falling back to the OID
    pub fn name(&self) -> &str {
        self.names.first().map(String::as_str).unwrap_or(&self.oid)
    }

    /// Returns true if `id` is one of this type's names or its OID
    pub fn is_known_as(&self, id: &str) -> bool {
        self.oid == id || self.names.iter().any(|n| n.eq_ignore_ascii_case(id))
    }

    /// Returns every identifier this type answers to (names then OID)
    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.names
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(self.oid.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deep_trim_to_lower() {
        let v = Normalizer::DeepTrimToLower.normalize("  Alice   Smith ").unwrap();
        assert_eq!(v, NormalizedValue::Text("alice smith".into()));
    }

    #[test]
    fn test_normalization_idempotent() {
        for n in [Normalizer::DeepTrim, Normalizer::DeepTrimToLower, Normalizer::NoOp] {
            let once = n.normalize(" Bob  Jones").unwrap();
            let twice = n.normalize(once.as_text().unwrap()).unwrap();
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_numeric_rejects_text() {
        let err = Normalizer::Numeric.normalize("forty").unwrap_err();
        assert_eq!(err.code(), "DIR_SCHEMA_MISMATCH");
        assert_eq!(
            Normalizer::Numeric.normalize(" 42 ").unwrap(),
            NormalizedValue::Integer(42)
        );
    }

    #[test]
    fn test_numeric_comparator_is_not_lexical() {
        let nine = NormalizedValue::Integer(9);
        let ten = NormalizedValue::Integer(10);
        assert_eq!(Comparator::Numeric.compare(&nine, &ten), Ordering::Less);
    }

    #[test]
    fn test_rule_lookup() {
        let rule = MatchingRule::by_name("CASEIGNOREMATCH").unwrap();
        assert_eq!(rule.normalizer, Normalizer::DeepTrimToLower);
        assert!(MatchingRule::by_name("noSuchMatch").is_none());
    }

    #[test]
    fn test_segment_keeps_boundary_space() {
        let seg = Normalizer::DeepTrimToLower.normalize_segment(" Ali ", false, false).unwrap();
        assert_eq!(seg, " ali ");
    }

    #[test]
    fn test_segment_trims_value_edges() {
        let n = Normalizer::DeepTrimToLower;
        assert_eq!(n.normalize_segment("  Al  ", true, false).unwrap(), "al ");
        assert_eq!(n.normalize_segment("  CE  ", false, true).unwrap(), " ce");
        assert_eq!(n.normalize_segment(" Ann  Lee ", true, true).unwrap(), "ann lee");
        assert_eq!(Normalizer::NoOp.normalize_segment(" a ", true, true).unwrap(), " a ");
    }
}
