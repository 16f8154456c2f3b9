//! Builds the evaluator tree for a filter

use crate::index::Store;
use crate::schema::SchemaRegistry;

use crate::search::ast::ExprNode;
use crate::search::errors::SearchResult;

use super::equality::EqualityEvaluator;
use super::ordering::{Direction, OrderingEvaluator};
use super::presence::PresenceEvaluator;
use super::substring::SubstringEvaluator;
use super::Evaluator;

/// Turns filter nodes into evaluators bound to one store and schema
pub struct EvaluatorBuilder<'a> {
    store: &'a Store,
    schema: &'a dyn SchemaRegistry,
}

impl<'a> EvaluatorBuilder<'a> {
    /// Creates a builder for searches on `store`
    pub fn new(store: &'a Store, schema: &'a dyn SchemaRegistry) -> Self {
        Self { store, schema }
    }

    /// Evaluator for a single leaf node; composites recurse through `build`
    pub fn leaf(&self, node: &ExprNode) -> SearchResult<Evaluator<'a>> {
        let (store, schema) = (self.store, self.schema);
        let evaluator = match node {
            ExprNode::Equality { attribute, value } => Evaluator::Equality(
                EqualityEvaluator::new(attribute, value, "equality", store, schema)?,
            ),
            ExprNode::ApproxMatch { attribute, value } => Evaluator::Approx(
                EqualityEvaluator::new(attribute, value, "approx_match", store, schema)?,
            ),
            ExprNode::GreaterEq { attribute, value } => Evaluator::Ordering(
                OrderingEvaluator::new(attribute, value, Direction::GreaterEq, store, schema)?,
            ),
            ExprNode::LessEq { attribute, value } => Evaluator::Ordering(
                OrderingEvaluator::new(attribute, value, Direction::LessEq, store, schema)?,
            ),
            ExprNode::Presence { attribute } => {
                Evaluator::Presence(PresenceEvaluator::new(attribute, store, schema)?)
            }
            ExprNode::Substring {
                attribute,
                initial,
                any,
                final_,
            } => Evaluator::Substring(SubstringEvaluator::new(
                attribute,
                initial.as_deref(),
                any,
                final_.as_deref(),
                store,
                schema,
            )?),
            ExprNode::And(_) | ExprNode::Or(_) | ExprNode::Not(_) => return self.build(node),
        };
        Ok(evaluator)
    }

    /// Builds the evaluator tree for `node`.
    ///
    /// Fails on the first child that cannot be resolved.
    pub fn build(&self, node: &ExprNode) -> SearchResult<Evaluator<'a>> {
        match node {
            ExprNode::And(children) => {
                let built = children
                    .iter()
                    .map(|c| self.build(c))
                    .collect::<SearchResult<Vec<_>>>()?;
                Ok(Evaluator::conjunction(built))
            }
            ExprNode::Or(children) => {
                let built = children
                    .iter()
                    .map(|c| self.build(c))
                    .collect::<SearchResult<Vec<_>>>()?;
                Ok(Evaluator::disjunction(built))
            }
            ExprNode::Not(child) => Ok(Evaluator::negation(self.build(child)?)),
            leaf => self.leaf(leaf),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::fixtures;

    #[test]
    fn test_builds_every_leaf_kind() {
        let (schema, store) = fixtures::people(&["cn"]);
        let builder = EvaluatorBuilder::new(&store, &schema);
        let kinds = [
            (ExprNode::eq("cn", "a"), "Equality"),
            (ExprNode::approx("cn", "a"), "Approx"),
            (ExprNode::ge("age", "1"), "Ordering"),
            (ExprNode::le("age", "1"), "Ordering"),
            (ExprNode::present("mail"), "Presence"),
            (ExprNode::substring("cn", Some("a"), &[], None), "Substring"),
        ];
        for (node, kind) in kinds {
            let eval = builder.build(&node).unwrap();
            assert!(format!("{:?}", eval).starts_with(kind), "{}", node);
        }
    }

    #[test]
    fn test_first_bad_child_fails_build() {
        let (schema, store) = fixtures::people(&[]);
        let builder = EvaluatorBuilder::new(&store, &schema);
        let err = builder
            .build(&ExprNode::or(vec![
                ExprNode::eq("cn", "a"),
                ExprNode::not(ExprNode::le("photo", "x")),
            ]))
            .unwrap_err();
        assert_eq!(err.code(), "DIR_NO_MATCHING_RULE");
    }
}
