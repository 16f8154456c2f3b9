//! Attribute values with a memoized normalized form

use std::borrow::Cow;
use std::fmt;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::schema::{NormalizedValue, Normalizer, SchemaResult};

/// A raw attribute value.
///
/// The first successful normalization is cached together with the
/// normalizer that produced it. Asking again with the same normalizer
/// returns the cached form; a different normalizer computes a fresh one
/// without replacing the cache.
#[derive(Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Value {
    raw: String,
    normalized: OnceLock<(Normalizer, NormalizedValue)>,
}

impl Value {
    /// Wraps a raw value
    pub fn new(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            normalized: OnceLock::new(),
        }
    }

    /// Returns the raw value as supplied
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Returns the normalized form under `normalizer`.
    pub fn normalize(&self, normalizer: Normalizer) -> SchemaResult<Cow<'_, NormalizedValue>> {
        if let Some((cached_by, cached)) = self.normalized.get() {
            if *cached_by == normalizer {
                return Ok(Cow::Borrowed(cached));
            }
            return normalizer.normalize(&self.raw).map(Cow::Owned);
        }

        let value = normalizer.normalize(&self.raw)?;
        // A concurrent reader may have cached under another normalizer first
        let (cached_by, cached) = self.normalized.get_or_init(|| (normalizer, value.clone()));
        if *cached_by == normalizer {
            Ok(Cow::Borrowed(cached))
        } else {
            Ok(Cow::Owned(value))
        }
    }

    /// Returns true if a normalized form is cached
    pub fn is_normalized(&self) -> bool {
        self.normalized.get().is_some()
    }
}

impl Clone for Value {
    fn clone(&self) -> Self {
        let normalized = OnceLock::new();
        if let Some(cached) = self.normalized.get() {
            let _ = normalized.set(cached.clone());
        }
        Self {
            raw: self.raw.clone(),
            normalized,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for Value {}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.raw)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl From<String> for Value {
    fn from(raw: String) -> Self {
        Value::new(raw)
    }
}

impl From<&str> for Value {
    fn from(raw: &str) -> Self {
        Value::new(raw)
    }
}

impl From<Value> for String {
    fn from(value: Value) -> Self {
        value.raw
    }
}
