//! Entry-filtering cursor
//!
//! Drives the candidate stream (a bounded id set or a full master-table
//! scan) through the root evaluator and yields matching entries. The cursor
//! is single-pass and forward-only; to search again, plan again.
//!
//! An error ends the sequence: it is returned once, the underlying cursors
//! are released and every later call returns `None`.

use std::collections::btree_set;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::entry::{Entry, EntryId};
use crate::index::{Cursor, MasterCursor, MasterTable};

use super::errors::SearchResult;
use super::evaluator::Evaluator;
use super::index_entry::IndexEntry;
use super::planner::CandidateSet;

enum Candidates {
    Ids(btree_set::IntoIter<EntryId>),
    Scan(MasterCursor),
}

/// Lazily filtered sequence of matching entries
pub struct EntryFilteringCursor<'a> {
    candidates: Option<Candidates>,
    evaluator: Evaluator<'a>,
    master: &'a MasterTable,
    size_limit: Option<u64>,
    returned: u64,
    scanned: u64,
    limit_reached: bool,
}

impl<'a> EntryFilteringCursor<'a> {
    /// Opens the cursor. An unbounded candidate set opens a master table scan.
    ///
    /// A size limit of zero means no limit.
    pub fn open(
        candidates: CandidateSet,
        evaluator: Evaluator<'a>,
        master: &'a MasterTable,
        size_limit: Option<u64>,
    ) -> SearchResult<Self> {
        let candidates = match candidates {
            CandidateSet::Bounded(ids) => Candidates::Ids(ids.into_iter()),
            CandidateSet::Unbounded => Candidates::Scan(master.cursor()?),
        };
        Ok(Self {
            candidates: Some(candidates),
            evaluator,
            master,
            size_limit: size_limit.filter(|limit| *limit > 0),
            returned: 0,
            scanned: 0,
            limit_reached: false,
        })
    }

    /// True if candidates come from a full master table scan
    pub fn is_full_scan(&self) -> bool {
        matches!(self.candidates, Some(Candidates::Scan(_)))
    }

    /// Candidates evaluated so far
    pub fn scanned(&self) -> u64 {
        self.scanned
    }

    /// Entries yielded so far
    pub fn returned(&self) -> u64 {
        self.returned
    }

    /// True if the cursor stopped at the size limit with more matches left
    pub fn size_limit_reached(&self) -> bool {
        self.limit_reached
    }

    /// Releases the candidate stream. Closing twice is a no-op.
    pub fn close(&mut self) {
        if let Some(candidates) = self.candidates.take() {
            if let Candidates::Scan(mut scan) = candidates {
                scan.close();
            }
            debug!(
                scanned = self.scanned,
                returned = self.returned,
                "search cursor closed"
            );
        }
    }

    /// True once closed, exhausted or failed
    pub fn is_closed(&self) -> bool {
        self.candidates.is_none()
    }

    fn next_candidate(&mut self) -> SearchResult<Option<IndexEntry>> {
        let next = match self.candidates.as_mut() {
            None => None,
            Some(Candidates::Ids(ids)) => ids.next().map(IndexEntry::new),
            Some(Candidates::Scan(scan)) => scan
                .advance()?
                .map(|(_, entry)| IndexEntry::with_entry(entry)),
        };
        Ok(next)
    }

    fn next_match(&mut self) -> SearchResult<Option<Arc<Entry>>> {
        while let Some(mut candidate) = self.next_candidate()? {
            self.scanned += 1;
            if !self.evaluator.evaluate(&mut candidate)? {
                continue;
            }
            // Ids taken from an older index snapshot may be gone by now
            if let Some(entry) = candidate.resolve_entry(self.master)? {
                return Ok(Some(entry));
            }
        }
        Ok(None)
    }

    fn step(&mut self) -> SearchResult<Option<Arc<Entry>>> {
        if let Some(limit) = self.size_limit {
            if self.returned >= limit {
                // Only a match past the limit means the result was truncated
                self.limit_reached = self.next_match()?.is_some();
                self.close();
                return Ok(None);
            }
        }
        let next = self.next_match()?;
        match next {
            Some(_) => self.returned += 1,
            None => self.close(),
        }
        Ok(next)
    }

    /// Returns the next matching entry, `None` once done
    pub fn next_entry(&mut self) -> SearchResult<Option<Arc<Entry>>> {
        if self.is_closed() {
            return Ok(None);
        }
        match self.step() {
            Ok(next) => Ok(next),
            Err(e) => {
                warn!(code = e.code(), error = %e, "search aborted");
                self.close();
                Err(e)
            }
        }
    }
}

impl Iterator for EntryFilteringCursor<'_> {
    type Item = SearchResult<Arc<Entry>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_entry().transpose()
    }
}

impl Drop for EntryFilteringCursor<'_> {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::ast::ExprNode;
    use crate::search::fixtures;
    use crate::search::planner::CursorBuilder;

    fn ids(cursor: &mut EntryFilteringCursor<'_>) -> Vec<EntryId> {
        cursor.map(|r| r.unwrap().id).collect()
    }

    #[test]
    fn test_bounded_cursor_skips_full_scan() {
        let (schema, store) = fixtures::people(&["cn"]);
        let plan = CursorBuilder::new(&store, &schema)
            .build(&ExprNode::and(vec![ExprNode::eq("cn", "alice"), ExprNode::eq("sn", "x")]))
            .unwrap();
        let mut cursor =
            EntryFilteringCursor::open(plan.candidates, plan.evaluator, store.master_table(), None)
                .unwrap();
        assert!(!cursor.is_full_scan());
        assert_eq!(ids(&mut cursor), vec![3]);
        assert_eq!(cursor.scanned(), 2);
        assert!(cursor.is_closed());
    }

    #[test]
    fn test_full_scan_cursor() {
        let (schema, store) = fixtures::people(&[]);
        let plan = CursorBuilder::new(&store, &schema)
            .build(&ExprNode::le("age", "40"))
            .unwrap();
        let mut cursor =
            EntryFilteringCursor::open(plan.candidates, plan.evaluator, store.master_table(), None)
                .unwrap();
        assert!(cursor.is_full_scan());
        assert_eq!(ids(&mut cursor), vec![1]);
        assert_eq!(cursor.scanned(), 3);
    }

    #[test]
    fn test_size_limit() {
        let (schema, store) = fixtures::people(&[]);
        let plan = CursorBuilder::new(&store, &schema)
            .build(&ExprNode::present("cn"))
            .unwrap();
        let mut cursor = EntryFilteringCursor::open(
            plan.candidates,
            plan.evaluator,
            store.master_table(),
            Some(2),
        )
        .unwrap();
        assert_eq!(ids(&mut cursor), vec![1, 2]);
        assert!(cursor.size_limit_reached());
    }

    #[test]
    fn test_size_limit_equal_to_match_count() {
        let (schema, store) = fixtures::people(&[]);
        let plan = CursorBuilder::new(&store, &schema)
            .build(&ExprNode::present("age"))
            .unwrap();
        let mut cursor = EntryFilteringCursor::open(
            plan.candidates,
            plan.evaluator,
            store.master_table(),
            Some(2),
        )
        .unwrap();
        assert_eq!(ids(&mut cursor), vec![1, 2]);
        assert_eq!(cursor.returned(), 2);
        assert!(!cursor.size_limit_reached());
        assert!(cursor.is_closed());
    }

    #[test]
    fn test_close_twice_is_noop() {
        let (schema, store) = fixtures::people(&[]);
        let plan = CursorBuilder::new(&store, &schema)
            .build(&ExprNode::present("cn"))
            .unwrap();
        let mut cursor =
            EntryFilteringCursor::open(plan.candidates, plan.evaluator, store.master_table(), None)
                .unwrap();
        assert!(cursor.next_entry().unwrap().is_some());
        cursor.close();
        cursor.close();
        assert!(cursor.is_closed());
        assert!(cursor.next_entry().unwrap().is_none());
        assert!(!cursor.size_limit_reached());
    }

    #[test]
    fn test_deleted_candidate_is_skipped() {
        let (schema, store) = fixtures::people(&["cn"]);
        let plan = CursorBuilder::new(&store, &schema)
            .build(&ExprNode::eq("cn", "alice"))
            .unwrap();
        assert_eq!(plan.candidates.len(), Some(2));
        // Candidates were computed before the delete
        store.delete_entry(1).unwrap();
        let mut cursor =
            EntryFilteringCursor::open(plan.candidates, plan.evaluator, store.master_table(), None)
                .unwrap();
        assert_eq!(ids(&mut cursor), vec![3]);
    }

    #[test]
    fn test_error_ends_sequence() {
        let (schema, store) = fixtures::people(&[]);
        // A value that fails normalization under the ancestor's rule only
        // surfaces at evaluation time
        store
            .add_entry(
                crate::entry::Entry::new(4, "").with_value("employeeNumber", "E-7"),
                &schema,
            )
            .unwrap();
        let plan = CursorBuilder::new(&store, &schema)
            .build(&ExprNode::ge("serialNumber", "5"))
            .unwrap();
        let mut cursor =
            EntryFilteringCursor::open(plan.candidates, plan.evaluator, store.master_table(), None)
                .unwrap();

        let results: Vec<_> = cursor.by_ref().collect();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].as_ref().unwrap_err().code(), "DIR_SCHEMA_MISMATCH");
        assert!(cursor.is_closed());
        assert!(cursor.next().is_none());
    }
}
