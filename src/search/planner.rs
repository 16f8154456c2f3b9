//! Candidate planning
//!
//! The cursor builder walks the filter bottom-up. Each node either narrows
//! to a bounded id set through an index or is unbounded, meaning every
//! entry of the master table is a candidate.
//!
//! - Leaf with a usable index: bounded (equality lookup, ordering range,
//!   presence index, substring prefix scan)
//! - Leaf without one: unbounded
//! - And: intersection of the bounded children, seeded from the smallest;
//!   unbounded only if every child is
//! - Or: union if every child is bounded, else unbounded
//! - Not: always unbounded; the child is only used to filter
//!
//! Planning never drops a candidate that could match: every bounded set is
//! a superset of the ids its node matches.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::debug;

use crate::entry::EntryId;
use crate::index::{Cursor, Store};
use crate::schema::{NormalizedValue, SchemaRegistry};

use super::ast::ExprNode;
use super::errors::SearchResult;
use super::evaluator::{Direction, Evaluator, EvaluatorBuilder, SubstringEvaluator};

/// Candidate ids for one filter node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateSet {
    /// Only these ids can match
    Bounded(BTreeSet<EntryId>),
    /// Any id can match; a full scan is needed
    Unbounded,
}

impl CandidateSet {
    /// True if an index narrowed the candidates
    pub fn is_bounded(&self) -> bool {
        matches!(self, CandidateSet::Bounded(_))
    }

    /// Number of candidates, `None` when unbounded
    pub fn len(&self) -> Option<usize> {
        match self {
            CandidateSet::Bounded(ids) => Some(ids.len()),
            CandidateSet::Unbounded => None,
        }
    }

    /// Bounded ids, if any
    pub fn ids(&self) -> Option<&BTreeSet<EntryId>> {
        match self {
            CandidateSet::Bounded(ids) => Some(ids),
            CandidateSet::Unbounded => None,
        }
    }
}

/// Planning outcome for one node, for diagnostics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanNode {
    /// Leaf filter text, or `and` / `or` / `not`
    pub filter: String,
    /// Index that bounded this node
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
    /// Candidate count; `None` when unbounded
    pub candidates: Option<usize>,
    /// Child plans, in filter order
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<PlanNode>,
}

impl PlanNode {
    fn new(filter: String, index: Option<String>, set: &CandidateSet) -> Self {
        Self {
            filter,
            index,
            candidates: set.len(),
            children: Vec::new(),
        }
    }

    /// True if this node was bounded
    pub fn is_bounded(&self) -> bool {
        self.candidates.is_some()
    }
}

/// Evaluator, candidates and plan tree for one filter
#[derive(Debug)]
pub struct Plan<'a> {
    /// Evaluator for the filter root
    pub evaluator: Evaluator<'a>,
    /// Candidates to feed it
    pub candidates: CandidateSet,
    /// Diagnostics tree
    pub root: PlanNode,
}

/// Plans a filter against one store
pub struct CursorBuilder<'a> {
    store: &'a Store,
    evaluators: EvaluatorBuilder<'a>,
}

impl<'a> CursorBuilder<'a> {
    /// Creates a cursor builder over `store`
    pub fn new(store: &'a Store, schema: &'a dyn SchemaRegistry) -> Self {
        Self {
            store,
            evaluators: EvaluatorBuilder::new(store, schema),
        }
    }

    /// Resolves and plans `node`
    pub fn build(&self, node: &ExprNode) -> SearchResult<Plan<'a>> {
        let (evaluator, candidates, root) = self.plan(node)?;
        debug!(
            partition = self.store.partition_id(),
            filter = %node,
            bounded = candidates.is_bounded(),
            candidates = candidates.len().unwrap_or(0),
            "search planned"
        );
        Ok(Plan {
            evaluator,
            candidates,
            root,
        })
    }

    fn plan(&self, node: &ExprNode) -> SearchResult<(Evaluator<'a>, CandidateSet, PlanNode)> {
        match node {
            ExprNode::And(children) => self.plan_and(children),
            ExprNode::Or(children) => self.plan_or(children),
            ExprNode::Not(child) => {
                let (evaluator, _, child_plan) = self.plan(child)?;
                let set = CandidateSet::Unbounded;
                let mut plan = PlanNode::new("not".into(), None, &set);
                plan.children.push(child_plan);
                Ok((Evaluator::negation(evaluator), set, plan))
            }
            leaf => {
                let evaluator = self.evaluators.leaf(leaf)?;
                let (set, index) = self.leaf_candidates(&evaluator)?;
                if !set.is_bounded() {
                    debug!(filter = %leaf, "no usable index, leaf unbounded");
                }
                let plan = PlanNode::new(leaf.to_string(), index, &set);
                Ok((evaluator, set, plan))
            }
        }
    }

    fn plan_and(
        &self,
        children: &[ExprNode],
    ) -> SearchResult<(Evaluator<'a>, CandidateSet, PlanNode)> {
        let mut evaluators = Vec::with_capacity(children.len());
        let mut bounded = Vec::new();
        let mut plans = Vec::with_capacity(children.len());
        for child in children {
            let (evaluator, set, plan) = self.plan(child)?;
            evaluators.push(evaluator);
            plans.push(plan);
            if let CandidateSet::Bounded(ids) = set {
                bounded.push(ids);
            }
        }

        let set = if bounded.is_empty() {
            CandidateSet::Unbounded
        } else {
            bounded.sort_by_key(|ids| ids.len());
            let mut rest = bounded.into_iter();
            let mut seed = rest.next().unwrap_or_default();
            for other in rest {
                if seed.is_empty() {
                    break;
                }
                seed.retain(|id| other.contains(id));
            }
            CandidateSet::Bounded(seed)
        };

        let mut plan = PlanNode::new("and".into(), None, &set);
        plan.children = plans;
        Ok((Evaluator::conjunction(evaluators), set, plan))
    }

    fn plan_or(
        &self,
        children: &[ExprNode],
    ) -> SearchResult<(Evaluator<'a>, CandidateSet, PlanNode)> {
        let mut evaluators = Vec::with_capacity(children.len());
        let mut plans = Vec::with_capacity(children.len());
        let mut union = Some(BTreeSet::new());
        for child in children {
            let (evaluator, set, plan) = self.plan(child)?;
            evaluators.push(evaluator);
            plans.push(plan);
            match set {
                CandidateSet::Bounded(ids) => {
                    if let Some(acc) = union.as_mut() {
                        acc.extend(ids);
                    }
                }
                CandidateSet::Unbounded => {
                    if union.take().is_some() {
                        debug!("unbounded branch forces a full scan of the disjunction");
                    }
                }
            }
        }

        let set = match union {
            Some(ids) => CandidateSet::Bounded(ids),
            None => CandidateSet::Unbounded,
        };
        let mut plan = PlanNode::new("or".into(), None, &set);
        plan.children = plans;
        Ok((Evaluator::disjunction(evaluators), set, plan))
    }

    /// Candidate ids for a leaf and the name of the index that gave them
    fn leaf_candidates(
        &self,
        evaluator: &Evaluator<'a>,
    ) -> SearchResult<(CandidateSet, Option<String>)> {
        let found = match evaluator {
            Evaluator::Equality(e) | Evaluator::Approx(e) => match e.index() {
                Some(idx) => Some((idx.forward_lookup(e.value())?, idx.attribute().name().to_string())),
                None => None,
            },
            Evaluator::Ordering(e) => match e.index() {
                Some(idx) => {
                    let ids = match e.direction() {
                        Direction::GreaterEq => idx.forward_greater_or_eq(e.value())?,
                        Direction::LessEq => idx.forward_less_or_eq(e.value())?,
                    };
                    Some((ids, idx.attribute().name().to_string()))
                }
                None => None,
            },
            Evaluator::Presence(e) => match e.key() {
                Some(key) => {
                    let presence = e.presence_index();
                    Some((presence.forward_lookup(key)?, presence.attribute().name().to_string()))
                }
                None => None,
            },
            Evaluator::Substring(e) => self.substring_candidates(e)?,
            Evaluator::Not(_) | Evaluator::And(_) | Evaluator::Or(_) => None,
        };
        Ok(match found {
            Some((ids, index)) => (CandidateSet::Bounded(ids), Some(index)),
            None => (CandidateSet::Unbounded, None),
        })
    }

    /// Forward scan from the initial component, testing each key
    fn substring_candidates(
        &self,
        evaluator: &SubstringEvaluator<'a>,
    ) -> SearchResult<Option<(BTreeSet<EntryId>, String)>> {
        let (Some(idx), Some(prefix)) = (evaluator.index(), evaluator.prefix()) else {
            return Ok(None);
        };
        let mut cursor = idx.cursor_from(&NormalizedValue::Text(prefix.to_string()))?;
        let mut ids = BTreeSet::new();
        while let Some((key, id)) = cursor.advance()? {
            match key.as_text() {
                Some(text) if text.starts_with(prefix) => {
                    if evaluator.matches(&key) {
                        ids.insert(id);
                    }
                }
                _ => break,
            }
        }
        cursor.close();
        Ok(Some((ids, idx.attribute().name().to_string())))
    }
}
