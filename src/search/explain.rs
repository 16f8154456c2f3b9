//! Explain plan output
//!
//! Produces deterministic, human-readable explain output.

use std::fmt;

use serde::Serialize;

use super::engine::SearchPlan;
use super::errors::SearchError;
use super::planner::PlanNode;

/// Explain plan output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExplainPlan {
    /// Whether planning succeeded
    pub accepted: bool,
    /// Partition searched
    pub partition: String,
    /// Filter in LDAP string form
    pub filter: String,
    /// Scan type (if accepted)
    pub scan_type: Option<String>,
    /// Candidate count for indexed plans
    pub candidates: Option<usize>,
    /// Size limit
    pub size_limit: Option<u64>,
    /// Per-node plan (if accepted)
    pub plan: Option<PlanNode>,
    /// Rejection reason (if rejected)
    pub rejection_reason: Option<String>,
    /// Rejection error code (if rejected)
    pub rejection_code: Option<String>,
}

impl ExplainPlan {
    /// Creates an explain plan from a successful search plan
    pub fn from_plan(plan: &SearchPlan<'_>) -> Self {
        Self {
            accepted: true,
            partition: plan.partition.clone(),
            filter: plan.filter.clone(),
            scan_type: Some(plan.scan_type.as_str().to_string()),
            candidates: plan.candidate_count(),
            size_limit: plan.size_limit,
            plan: Some(plan.root.clone()),
            rejection_reason: None,
            rejection_code: None,
        }
    }

    /// Creates an explain plan from a planning error
    pub fn from_error(partition: &str, filter: &str, err: &SearchError) -> Self {
        Self {
            accepted: false,
            partition: partition.to_string(),
            filter: filter.to_string(),
            scan_type: None,
            candidates: None,
            size_limit: None,
            plan: None,
            rejection_reason: Some(err.to_string()),
            rejection_code: Some(err.code().to_string()),
        }
    }
}

fn write_node(f: &mut fmt::Formatter<'_>, node: &PlanNode, depth: usize) -> fmt::Result {
    write!(f, "{:indent$}{}", "", node.filter, indent = 2 + depth * 2)?;
    match (&node.index, node.candidates) {
        (Some(index), Some(n)) => writeln!(f, " [index: {}, candidates: {}]", index, n)?,
        (None, Some(n)) => writeln!(f, " [candidates: {}]", n)?,
        (_, None) => writeln!(f, " [unbounded]")?,
    }
    for child in &node.children {
        write_node(f, child, depth + 1)?;
    }
    Ok(())
}

impl fmt::Display for ExplainPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== EXPLAIN PLAN ===")?;
        writeln!(f, "Partition: {}", self.partition)?;
        writeln!(f, "Filter: {}", self.filter)?;

        if self.accepted {
            writeln!(f, "Status: ACCEPTED")?;
            if let Some(scan) = &self.scan_type {
                writeln!(f, "Scan Type: {}", scan)?;
            }
            if let Some(n) = self.candidates {
                writeln!(f, "Candidates: {}", n)?;
            }
            if let Some(limit) = self.size_limit {
                writeln!(f, "Size Limit: {}", limit)?;
            }
            if let Some(root) = &self.plan {
                writeln!(f, "Plan:")?;
                write_node(f, root, 0)?;
            }
        } else {
            writeln!(f, "Status: REJECTED")?;
            if let Some(code) = &self.rejection_code {
                writeln!(f, "Error Code: {}", code)?;
            }
            if let Some(reason) = &self.rejection_reason {
                writeln!(f, "Reason: {}", reason)?;
            }
        }

        Ok(())
    }
}
