//! Attribute resolution shared by the leaf evaluators

use std::sync::Arc;

use crate::entry::{Entry, Value};
use crate::index::{MasterTable, Store};
use crate::schema::{AttributeType, SchemaRegistry};

use crate::search::errors::SearchResult;
use crate::search::index_entry::IndexEntry;

/// Resolved attribute of a leaf assertion
#[derive(Debug)]
pub struct AttributeAssertion<'a> {
    attribute: Arc<AttributeType>,
    /// The asserted type first, then its descendants
    types: Vec<Arc<AttributeType>>,
    master: &'a MasterTable,
}

impl<'a> AttributeAssertion<'a> {
    /// Resolves `name` and collects its descendant types
    pub fn resolve(
        name: &str,
        store: &'a Store,
        schema: &dyn SchemaRegistry,
    ) -> SearchResult<Self> {
        let attribute = schema.resolve_attribute_type(name)?;
        let mut types = vec![Arc::clone(&attribute)];
        types.extend(schema.descendants_of(&attribute));
        Ok(Self {
            attribute,
            types,
            master: store.master_table(),
        })
    }

    /// Asserted attribute type
    pub fn attribute(&self) -> &Arc<AttributeType> {
        &self.attribute
    }

    /// Primary name of the asserted attribute
    pub fn name(&self) -> &str {
        self.attribute.name()
    }

    /// Loads the candidate's entry; `None` if it vanished from the table
    pub fn entry(&self, candidate: &mut IndexEntry) -> SearchResult<Option<Arc<Entry>>> {
        candidate.resolve_entry(self.master)
    }

    /// Tests `check` against the values of the attribute, then of each
    /// descendant. Stops at the first value that passes.
    pub fn any_value<F>(&self, entry: &Entry, mut check: F) -> SearchResult<bool>
    where
        F: FnMut(&Value) -> SearchResult<bool>,
    {
        for at in &self.types {
            let Some(values) = entry.values_of(at) else {
                continue;
            };
            for value in values {
                if check(value)? {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }
}
