//! Search candidates

use std::sync::Arc;

use crate::entry::{Entry, EntryId};
use crate::index::MasterTable;
use crate::schema::NormalizedValue;

use super::errors::SearchResult;

/// One candidate: an id plus whatever evaluators learned about it.
///
/// The id is fixed at construction. `key` and the cached entry are filled
/// at most once each; the entry is never re-fetched once resolved.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    key: Option<NormalizedValue>,
    id: EntryId,
    entry: Option<Arc<Entry>>,
}

impl IndexEntry {
    /// Candidate known only by id
    pub fn new(id: EntryId) -> Self {
        Self {
            key: None,
            id,
            entry: None,
        }
    }

    /// Candidate whose entry is already loaded (full scans)
    pub fn with_entry(entry: Arc<Entry>) -> Self {
        Self {
            key: None,
            id: entry.id,
            entry: Some(entry),
        }
    }

    /// Candidate id
    pub fn id(&self) -> EntryId {
        self.id
    }

    /// Normalized value that matched, when an evaluator recorded one
    pub fn key(&self) -> Option<&NormalizedValue> {
        self.key.as_ref()
    }

    pub(crate) fn set_key(&mut self, key: NormalizedValue) {
        self.key = Some(key);
    }

    /// Entry, if already resolved
    pub fn cached_entry(&self) -> Option<&Arc<Entry>> {
        self.entry.as_ref()
    }

    /// Returns the entry, fetching it from the master table on first use.
    ///
    /// `None` means the id is no longer in the table.
    pub fn resolve_entry(&mut self, master: &MasterTable) -> SearchResult<Option<Arc<Entry>>> {
        if let Some(entry) = &self.entry {
            return Ok(Some(Arc::clone(entry)));
        }
        let fetched = master.get(self.id)?;
        if let Some(entry) = &fetched {
            self.entry = Some(Arc::clone(entry));
        }
        Ok(fetched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::Entry;
    use crate::index::Store;
    use crate::schema::AttributeTypeRegistry;

    #[test]
    fn test_resolve_caches_entry() {
        let store = Store::new("t");
        let schema = AttributeTypeRegistry::new();
        store.add_entry(Entry::new(7, "cn=x"), &schema).unwrap();

        let mut candidate = IndexEntry::new(7);
        assert!(candidate.cached_entry().is_none());
        let entry = candidate.resolve_entry(store.master_table()).unwrap().unwrap();
        assert_eq!(entry.dn, "cn=x");

        store.delete_entry(7).unwrap();
        // Cached copy survives the delete
        assert!(candidate.resolve_entry(store.master_table()).unwrap().is_some());
        assert_eq!(candidate.id(), 7);
    }

    #[test]
    fn test_missing_id_resolves_to_none() {
        let store = Store::new("t");
        let mut candidate = IndexEntry::new(1);
        assert!(candidate.resolve_entry(store.master_table()).unwrap().is_none());
        assert!(candidate.cached_entry().is_none());
    }
}
