//! Forward-only cursors over index and master table snapshots
//!
//! A cursor pins the snapshot that was current when it was opened, so it
//! sees a point-in-time view even while writers publish newer versions.
//! Closing drops the pinned snapshot; closing twice is a no-op.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;
use std::sync::Arc;

use crate::entry::{Entry, EntryId};
use crate::schema::NormalizedValue;

use super::btree::IndexTree;
use super::errors::IndexResult;

/// A forward-only, closeable sequence
pub trait Cursor {
    /// Element type
    type Item;

    /// Moves to the next element. Returns `None` once exhausted or closed.
    fn advance(&mut self) -> IndexResult<Option<Self::Item>>;

    /// Releases the underlying snapshot
    fn close(&mut self);

    /// Returns true once `close` has been called
    fn is_closed(&self) -> bool;
}

/// Cursor over one of the two sets of an `IndexTree`
pub struct SetCursor<T: Ord + Clone> {
    snapshot: Option<Arc<IndexTree>>,
    select: fn(&IndexTree) -> &BTreeSet<T>,
    position: Bound<T>,
}

/// Cursor over (value, id) pairs, ascending by value then id
pub type IndexCursor = SetCursor<(NormalizedValue, EntryId)>;

/// Cursor over (id, value) pairs, ascending by id then value
pub type ReverseIndexCursor = SetCursor<(EntryId, NormalizedValue)>;

impl<T: Ord + Clone> SetCursor<T> {
    pub(crate) fn new(
        snapshot: Arc<IndexTree>,
        select: fn(&IndexTree) -> &BTreeSet<T>,
        start: Bound<T>,
    ) -> Self {
        Self {
            snapshot: Some(snapshot),
            select,
            position: start,
        }
    }
}

impl<T: Ord + Clone> Cursor for SetCursor<T> {
    type Item = T;

    fn advance(&mut self) -> IndexResult<Option<T>> {
        let Some(tree) = &self.snapshot else {
            return Ok(None);
        };
        let set = (self.select)(tree);
        let next = set
            .range((self.position.clone(), Bound::Unbounded))
            .next()
            .cloned();
        if let Some(item) = &next {
            self.position = Bound::Excluded(item.clone());
        }
        Ok(next)
    }

    fn close(&mut self) {
        self.snapshot = None;
    }

    fn is_closed(&self) -> bool {
        self.snapshot.is_none()
    }
}

/// Cursor over the master table in id order
pub struct MasterCursor {
    snapshot: Option<Arc<BTreeMap<EntryId, Arc<Entry>>>>,
    position: Bound<EntryId>,
}

impl MasterCursor {
    pub(crate) fn new(snapshot: Arc<BTreeMap<EntryId, Arc<Entry>>>) -> Self {
        Self {
            snapshot: Some(snapshot),
            position: Bound::Unbounded,
        }
    }
}

impl Cursor for MasterCursor {
    type Item = (EntryId, Arc<Entry>);

    fn advance(&mut self) -> IndexResult<Option<Self::Item>> {
        let Some(table) = &self.snapshot else {
            return Ok(None);
        };
        let next = table
            .range((self.position, Bound::Unbounded))
            .next()
            .map(|(id, entry)| (*id, Arc::clone(entry)));
        if let Some((id, _)) = &next {
            self.position = Bound::Excluded(*id);
        }
        Ok(next)
    }

    fn close(&mut self) {
        self.snapshot = None;
    }

    fn is_closed(&self) -> bool {
        self.snapshot.is_none()
    }
}
