//! Schema facade for dirsearch
//!
//! Resolves attribute names to attribute types and attribute types to
//! their matching rules. The registry is built once and passed explicitly
//! to the store and to every search; there is no process-wide schema.
//!
//! # Invariants
//!
//! - Attribute types are immutable once registered
//! - A subtype inherits each matching rule it does not declare
//! - Normalization is deterministic and idempotent

mod errors;
mod loader;
mod registry;
mod types;

pub use errors::{SchemaError, SchemaResult};
pub use loader::{AttributeTypeDef, SchemaLoader};
pub use registry::{AttributeTypeRegistry, SchemaRegistry};
pub use types::{AttributeType, Comparator, MatchingRule, NormalizedValue, Normalizer};
