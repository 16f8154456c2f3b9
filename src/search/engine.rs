//! Search entry point
//!
//! Binds a store and a schema, plans requests and opens filtering cursors.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::index::{MasterTable, Store};
use crate::schema::SchemaRegistry;

use super::ast::ExprNode;
use super::cursor::EntryFilteringCursor;
use super::errors::SearchResult;
use super::evaluator::Evaluator;
use super::explain::ExplainPlan;
use super::planner::{CandidateSet, CursorBuilder, PlanNode};

/// A search over one partition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Parsed filter
    pub filter: ExprNode,
    /// Maximum number of entries to return; zero or absent means no limit
    #[serde(default)]
    pub size_limit: Option<u64>,
}

impl SearchRequest {
    /// Creates an unlimited request
    pub fn new(filter: ExprNode) -> Self {
        Self {
            filter,
            size_limit: None,
        }
    }

    /// Sets the size limit
    pub fn with_size_limit(mut self, limit: u64) -> Self {
        self.size_limit = Some(limit);
        self
    }
}

/// How candidates are produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanType {
    /// Index-derived id set
    IndexedCandidates,
    /// Every entry of the master table
    FullScan,
}

impl ScanType {
    /// Stable name used in explain output and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanType::IndexedCandidates => "INDEXED_CANDIDATES",
            ScanType::FullScan => "FULL_SCAN",
        }
    }
}

/// A planned search, ready to open
#[derive(Debug)]
pub struct SearchPlan<'a> {
    /// Partition searched
    pub partition: String,
    /// Filter in LDAP string form
    pub filter: String,
    /// Candidate source
    pub scan_type: ScanType,
    /// Per-node planning outcome
    pub root: PlanNode,
    /// Effective size limit
    pub size_limit: Option<u64>,
    candidates: CandidateSet,
    evaluator: Evaluator<'a>,
    master: &'a MasterTable,
}

impl<'a> SearchPlan<'a> {
    /// Number of candidates, `None` for a full scan
    pub fn candidate_count(&self) -> Option<usize> {
        self.candidates.len()
    }

    /// Candidate set the cursor will consume
    pub fn candidates(&self) -> &CandidateSet {
        &self.candidates
    }

    /// Opens the filtering cursor, consuming the plan
    pub fn open(self) -> SearchResult<EntryFilteringCursor<'a>> {
        EntryFilteringCursor::open(self.candidates, self.evaluator, self.master, self.size_limit)
    }
}

/// Plans and runs searches against one store
pub struct SearchEngine<'a> {
    store: &'a Store,
    schema: &'a dyn SchemaRegistry,
    default_size_limit: Option<u64>,
}

impl<'a> SearchEngine<'a> {
    /// Creates an engine with no default size limit
    pub fn new(store: &'a Store, schema: &'a dyn SchemaRegistry) -> Self {
        Self {
            store,
            schema,
            default_size_limit: None,
        }
    }

    /// Applies `limit` to requests that carry none
    pub fn with_default_size_limit(mut self, limit: Option<u64>) -> Self {
        self.default_size_limit = limit;
        self
    }

    /// Resolves the filter and computes its candidates
    pub fn plan(&self, request: &SearchRequest) -> SearchResult<SearchPlan<'a>> {
        let plan = CursorBuilder::new(self.store, self.schema).build(&request.filter)?;
        let scan_type = if plan.candidates.is_bounded() {
            ScanType::IndexedCandidates
        } else {
            ScanType::FullScan
        };
        Ok(SearchPlan {
            partition: self.store.partition_id().to_string(),
            filter: request.filter.to_string(),
            scan_type,
            root: plan.root,
            size_limit: request.size_limit.or(self.default_size_limit),
            candidates: plan.candidates,
            evaluator: plan.evaluator,
            master: self.store.master_table(),
        })
    }

    /// Plans the request and opens its cursor
    pub fn search(&self, request: &SearchRequest) -> SearchResult<EntryFilteringCursor<'a>> {
        let plan = self.plan(request)?;
        info!(
            partition = %plan.partition,
            filter = %plan.filter,
            scan = plan.scan_type.as_str(),
            "search started"
        );
        plan.open()
    }

    /// Describes how the request would run, or why it would be rejected
    pub fn explain(&self, request: &SearchRequest) -> ExplainPlan {
        match self.plan(request) {
            Ok(plan) => ExplainPlan::from_plan(&plan),
            Err(e) => ExplainPlan::from_error(
                self.store.partition_id(),
                &request.filter.to_string(),
                &e,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::fixtures;

    #[test]
    fn test_scan_type_follows_candidates() {
        let (schema, store) = fixtures::people(&["cn"]);
        let engine = SearchEngine::new(&store, &schema);

        let plan = engine
            .plan(&SearchRequest::new(ExprNode::eq("cn", "alice")))
            .unwrap();
        assert_eq!(plan.scan_type, ScanType::IndexedCandidates);
        assert_eq!(plan.candidate_count(), Some(2));

        let plan = engine
            .plan(&SearchRequest::new(ExprNode::not(ExprNode::eq("cn", "alice"))))
            .unwrap();
        assert_eq!(plan.scan_type, ScanType::FullScan);
        assert_eq!(plan.candidate_count(), None);
    }

    #[test]
    fn test_search_yields_matches() {
        let (schema, store) = fixtures::people(&["cn"]);
        let engine = SearchEngine::new(&store, &schema);
        let cursor = engine
            .search(&SearchRequest::new(ExprNode::not(ExprNode::eq("cn", "alice"))))
            .unwrap();
        let ids: Vec<_> = cursor.map(|r| r.unwrap().id).collect();
        assert_eq!(ids, vec![2]);
    }

    #[test]
    fn test_default_size_limit_applies() {
        let (schema, store) = fixtures::people(&[]);
        let engine = SearchEngine::new(&store, &schema).with_default_size_limit(Some(1));

        let plan = engine.plan(&SearchRequest::new(ExprNode::present("cn"))).unwrap();
        assert_eq!(plan.size_limit, Some(1));
        let plan = engine
            .plan(&SearchRequest::new(ExprNode::present("cn")).with_size_limit(3))
            .unwrap();
        assert_eq!(plan.size_limit, Some(3));

        let cursor = engine.search(&SearchRequest::new(ExprNode::present("cn"))).unwrap();
        assert_eq!(cursor.count(), 1);
    }

    #[test]
    fn test_request_from_json() {
        let request: SearchRequest = serde_json::from_value(serde_json::json!({
            "filter": { "presence": { "attribute": "cn" } },
            "size_limit": 5
        }))
        .unwrap();
        assert_eq!(request, SearchRequest::new(ExprNode::present("cn")).with_size_limit(5));
    }
}
