//! Per-candidate filter evaluation
//!
//! One variant per filter node kind. Leaves resolve their attribute and
//! matching rule once, at construction, and answer from an index when one
//! is usable or from the candidate's entry otherwise.
//!
//! # Invariants
//!
//! - Evaluation never changes a candidate's id
//! - A candidate missing from the master table does not match
//! - `And` children run cheapest first and stop at the first false;
//!   `Or` stops at the first true; `Not` negates its child

mod assertion;
mod builder;
mod equality;
mod ordering;
mod presence;
mod substring;

pub use assertion::AttributeAssertion;
pub use builder::EvaluatorBuilder;
pub use equality::EqualityEvaluator;
pub use ordering::{Direction, OrderingEvaluator};
pub use presence::PresenceEvaluator;
pub use substring::SubstringEvaluator;

use super::errors::SearchResult;
use super::index_entry::IndexEntry;

/// Evaluator for one filter node
#[derive(Debug)]
pub enum Evaluator<'a> {
    /// `(attr=value)`
    Equality(EqualityEvaluator<'a>),
    /// `(attr~=value)`, evaluated as equality
    Approx(EqualityEvaluator<'a>),
    /// `(attr>=value)` / `(attr<=value)`
    Ordering(OrderingEvaluator<'a>),
    /// `(attr=*)`
    Presence(PresenceEvaluator<'a>),
    /// `(attr=in*an*fi)`
    Substring(SubstringEvaluator<'a>),
    /// `(!f)`
    Not(Box<Evaluator<'a>>),
    /// `(&f1...fn)`, children ordered by estimate
    And(Vec<Evaluator<'a>>),
    /// `(|f1...fn)`
    Or(Vec<Evaluator<'a>>),
}

impl<'a> Evaluator<'a> {
    /// Builds a conjunction, ordering children by ascending estimate.
    /// Ties keep filter order.
    pub fn conjunction(mut children: Vec<Evaluator<'a>>) -> Self {
        children.sort_by_key(Evaluator::estimate);
        Evaluator::And(children)
    }

    /// Builds a disjunction
    pub fn disjunction(children: Vec<Evaluator<'a>>) -> Self {
        Evaluator::Or(children)
    }

    /// Builds a negation
    pub fn negation(child: Evaluator<'a>) -> Self {
        Evaluator::Not(Box::new(child))
    }

    /// Decides whether the candidate matches.
    ///
    /// May record the candidate's key and cache its entry.
    pub fn evaluate(&self, candidate: &mut IndexEntry) -> SearchResult<bool> {
        match self {
            Evaluator::Equality(e) | Evaluator::Approx(e) => e.evaluate(candidate),
            Evaluator::Ordering(e) => e.evaluate(candidate),
            Evaluator::Presence(e) => e.evaluate(candidate),
            Evaluator::Substring(e) => e.evaluate(candidate),
            Evaluator::Not(child) => Ok(!child.evaluate(candidate)?),
            Evaluator::And(children) => {
                for child in children {
                    if !child.evaluate(candidate)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Evaluator::Or(children) => {
                for child in children {
                    if child.evaluate(candidate)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        }
    }

    /// Expected number of matching entries; `u64::MAX` when unknown
    pub fn estimate(&self) -> u64 {
        match self {
            Evaluator::Equality(e) | Evaluator::Approx(e) => e.estimate(),
            Evaluator::Ordering(e) => e.estimate(),
            Evaluator::Presence(e) => e.estimate(),
            Evaluator::Substring(e) => e.estimate(),
            Evaluator::Not(_) => u64::MAX,
            Evaluator::And(children) => children
                .iter()
                .map(Evaluator::estimate)
                .min()
                .unwrap_or(u64::MAX),
            Evaluator::Or(children) => children
                .iter()
                .map(Evaluator::estimate)
                .fold(0u64, u64::saturating_add),
        }
    }

    /// Children of a composite node, in evaluation order
    pub fn children(&self) -> &[Evaluator<'a>] {
        match self {
            Evaluator::And(children) | Evaluator::Or(children) => children,
            Evaluator::Not(child) => std::slice::from_ref(child.as_ref()),
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::ast::ExprNode;
    use crate::search::fixtures;

    fn matching(evaluator: &Evaluator<'_>) -> Vec<u64> {
        (1..=3)
            .filter(|id| evaluator.evaluate(&mut IndexEntry::new(*id)).unwrap())
            .collect()
    }

    #[test]
    fn test_and_orders_by_estimate() {
        let (schema, store) = fixtures::people(&["cn"]);
        let builder = EvaluatorBuilder::new(&store, &schema);
        let eval = builder
            .build(&ExprNode::and(vec![
                ExprNode::eq("sn", "x"),
                ExprNode::eq("cn", "bob"),
            ]))
            .unwrap();

        let children = eval.children();
        assert!(matches!(&children[0], Evaluator::Equality(e) if e.index().is_some()));
        assert_eq!(children[1].estimate(), u64::MAX);
        assert_eq!(eval.estimate(), 1);
        assert_eq!(matching(&eval), vec![2]);
    }

    #[test]
    fn test_and_result_independent_of_child_order() {
        let (schema, store) = fixtures::people(&["cn"]);
        let builder = EvaluatorBuilder::new(&store, &schema);
        let a = ExprNode::eq("cn", "alice");
        let b = ExprNode::eq("sn", "x");
        let c = ExprNode::le("age", "50");
        let orders = [
            vec![a.clone(), b.clone(), c.clone()],
            vec![c.clone(), b.clone(), a.clone()],
            vec![b.clone(), c.clone(), a.clone()],
        ];
        for children in orders {
            let eval = builder.build(&ExprNode::and(children)).unwrap();
            assert!(matching(&eval).is_empty());
        }
        let eval = builder.build(&ExprNode::and(vec![b, a])).unwrap();
        assert_eq!(matching(&eval), vec![3]);
    }

    #[test]
    fn test_or_and_not() {
        let (schema, store) = fixtures::people(&[]);
        let builder = EvaluatorBuilder::new(&store, &schema);

        let or = builder
            .build(&ExprNode::or(vec![
                ExprNode::eq("cn", "bob"),
                ExprNode::ge("age", "30"),
            ]))
            .unwrap();
        assert_eq!(matching(&or), vec![1, 2]);

        let not = builder
            .build(&ExprNode::not(ExprNode::present("age")))
            .unwrap();
        assert_eq!(matching(&not), vec![3]);
    }

    #[test]
    fn test_not_negates_every_candidate() {
        let (schema, store) = fixtures::people(&["cn"]);
        let builder = EvaluatorBuilder::new(&store, &schema);
        let filters = [
            ExprNode::eq("cn", "alice"),
            ExprNode::le("age", "40"),
            ExprNode::present("mail"),
            ExprNode::substring("sn", Some("sm"), &[], None),
        ];
        for filter in filters {
            let plain = builder.build(&filter).unwrap();
            let negated = builder.build(&ExprNode::not(filter.clone())).unwrap();
            for id in 1..=4 {
                assert_eq!(
                    negated.evaluate(&mut IndexEntry::new(id)).unwrap(),
                    !plain.evaluate(&mut IndexEntry::new(id)).unwrap(),
                    "{} on {}",
                    filter,
                    id
                );
            }
        }
    }

    #[test]
    fn test_empty_composites() {
        let (schema, store) = fixtures::people(&[]);
        let builder = EvaluatorBuilder::new(&store, &schema);
        let and = builder.build(&ExprNode::and(vec![])).unwrap();
        let or = builder.build(&ExprNode::or(vec![])).unwrap();
        assert!(and.evaluate(&mut IndexEntry::new(1)).unwrap());
        assert!(!or.evaluate(&mut IndexEntry::new(1)).unwrap());
        assert_eq!(or.estimate(), 0);
    }
}
