//! Master table: entry id -> entry
//!
//! Writers publish a new version of the table; readers clone the current
//! `Arc` and never block on each other.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use crate::entry::{Entry, EntryId};

use super::cursor::MasterCursor;
use super::errors::{IndexError, IndexResult};

type Table = BTreeMap<EntryId, Arc<Entry>>;

/// The partition's table of full entries, in id order
#[derive(Debug, Default)]
pub struct MasterTable {
    entries: RwLock<Arc<Table>>,
}

impl MasterTable {
    /// Creates an empty table
    pub fn new() -> Self {
        Self::default()
    }

    fn snapshot(&self) -> IndexResult<Arc<Table>> {
        self.entries
            .read()
            .map(|guard| Arc::clone(&*guard))
            .map_err(|_| IndexError::poisoned("master table"))
    }

    fn write<R, F: FnOnce(&mut Table) -> R>(&self, f: F) -> IndexResult<R> {
        let mut guard = self
            .entries
            .write()
            .map_err(|_| IndexError::poisoned("master table"))?;
        Ok(f(Arc::make_mut(&mut *guard)))
    }

    /// Looks up an entry by id
    pub fn get(&self, id: EntryId) -> IndexResult<Option<Arc<Entry>>> {
        Ok(self.snapshot()?.get(&id).cloned())
    }

    /// Returns true if the id is present
    pub fn contains(&self, id: EntryId) -> IndexResult<bool> {
        Ok(self.snapshot()?.contains_key(&id))
    }

    /// Number of entries
    pub fn count(&self) -> IndexResult<u64> {
        Ok(self.snapshot()?.len() as u64)
    }

    /// Opens a cursor over all entries in id order
    pub fn cursor(&self) -> IndexResult<MasterCursor> {
        Ok(MasterCursor::new(self.snapshot()?))
    }

    pub(crate) fn insert(&self, entry: Arc<Entry>) -> IndexResult<()> {
        self.write(|table| {
            table.insert(entry.id, entry);
        })
    }

    pub(crate) fn remove(&self, id: EntryId) -> IndexResult<Option<Arc<Entry>>> {
        self.write(|table| table.remove(&id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::cursor::Cursor;

    #[test]
    fn test_get_and_count() {
        let table = MasterTable::new();
        table.insert(Arc::new(Entry::new(2, "cn=b"))).unwrap();
        table.insert(Arc::new(Entry::new(1, "cn=a"))).unwrap();

        assert_eq!(table.count().unwrap(), 2);
        assert_eq!(table.get(1).unwrap().unwrap().dn, "cn=a");
        assert!(table.get(3).unwrap().is_none());
    }

    #[test]
    fn test_cursor_in_id_order() {
        let table = MasterTable::new();
        for id in [5, 1, 3] {
            table.insert(Arc::new(Entry::new(id, ""))).unwrap();
        }
        let mut cursor = table.cursor().unwrap();
        let mut ids = Vec::new();
        while let Some((id, _)) = cursor.advance().unwrap() {
            ids.push(id);
        }
        assert_eq!(ids, vec![1, 3, 5]);
    }

    #[test]
    fn test_cursor_unaffected_by_later_delete() {
        let table = MasterTable::new();
        table.insert(Arc::new(Entry::new(1, ""))).unwrap();
        let mut cursor = table.cursor().unwrap();
        table.remove(1).unwrap();

        assert!(cursor.advance().unwrap().is_some());
        assert!(!table.contains(1).unwrap());
    }
}
