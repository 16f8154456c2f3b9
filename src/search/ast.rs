//! Search filter AST
//!
//! The filter arrives already parsed. Assertion values are raw strings and
//! are normalized only when evaluators are built.
//!
//! JSON form is externally tagged:
//!
//! ```json
//! { "and": [
//!     { "equality": { "attribute": "cn", "value": "alice" } },
//!     { "not": { "presence": { "attribute": "mail" } } }
//! ] }
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// A search filter node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExprNode {
    /// All children match
    And(Vec<ExprNode>),
    /// At least one child matches
    Or(Vec<ExprNode>),
    /// The child does not match
    Not(Box<ExprNode>),
    /// attribute=value
    Equality { attribute: String, value: String },
    /// attribute>=value
    GreaterEq { attribute: String, value: String },
    /// attribute<=value
    LessEq { attribute: String, value: String },
    /// attribute=*
    Presence { attribute: String },
    /// attribute=initial*any*...*final
    Substring {
        attribute: String,
        #[serde(default)]
        initial: Option<String>,
        #[serde(default)]
        any: Vec<String>,
        #[serde(default, rename = "final")]
        final_: Option<String>,
    },
    /// attribute~=value
    ApproxMatch { attribute: String, value: String },
}

impl ExprNode {
    /// (&(..)(..))
    pub fn and(children: Vec<ExprNode>) -> Self {
        ExprNode::And(children)
    }

    /// (|(..)(..))
    pub fn or(children: Vec<ExprNode>) -> Self {
        ExprNode::Or(children)
    }

    /// (!(..))
    pub fn not(child: ExprNode) -> Self {
        ExprNode::Not(Box::new(child))
    }

    /// (attribute=value)
    pub fn eq(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        ExprNode::Equality {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// (attribute>=value)
    pub fn ge(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        ExprNode::GreaterEq {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// (attribute<=value)
    pub fn le(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        ExprNode::LessEq {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// (attribute=*)
    pub fn present(attribute: impl Into<String>) -> Self {
        ExprNode::Presence {
            attribute: attribute.into(),
        }
    }

    /// (attribute~=value)
    pub fn approx(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        ExprNode::ApproxMatch {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// (attribute=initial*any*final)
    pub fn substring(
        attribute: impl Into<String>,
        initial: Option<&str>,
        any: &[&str],
        final_: Option<&str>,
    ) -> Self {
        ExprNode::Substring {
            attribute: attribute.into(),
            initial: initial.map(str::to_string),
            any: any.iter().map(|s| s.to_string()).collect(),
            final_: final_.map(str::to_string),
        }
    }

    /// Returns the asserted attribute of a leaf node
    pub fn attribute(&self) -> Option<&str> {
        match self {
            ExprNode::And(_) | ExprNode::Or(_) | ExprNode::Not(_) => None,
            ExprNode::Equality { attribute, .. }
            | ExprNode::GreaterEq { attribute, .. }
            | ExprNode::LessEq { attribute, .. }
            | ExprNode::Presence { attribute }
            | ExprNode::Substring { attribute, .. }
            | ExprNode::ApproxMatch { attribute, .. } => Some(attribute),
        }
    }

    /// Returns the node kind for diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            ExprNode::And(_) => "and",
            ExprNode::Or(_) => "or",
            ExprNode::Not(_) => "not",
            ExprNode::Equality { .. } => "equality",
            ExprNode::GreaterEq { .. } => "greater_eq",
            ExprNode::LessEq { .. } => "less_eq",
            ExprNode::Presence { .. } => "presence",
            ExprNode::Substring { .. } => "substring",
            ExprNode::ApproxMatch { .. } => "approx_match",
        }
    }
}

/// LDAP string representation, e.g. `(&(cn=alice)(!(sn=x)))`
impl fmt::Display for ExprNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExprNode::And(children) => {
                write!(f, "(&")?;
                for c in children {
                    write!(f, "{}", c)?;
                }
                write!(f, ")")
            }
            ExprNode::Or(children) => {
                write!(f, "(|")?;
                for c in children {
                    write!(f, "{}", c)?;
                }
                write!(f, ")")
            }
            ExprNode::Not(child) => write!(f, "(!{})", child),
            ExprNode::Equality { attribute, value } => write!(f, "({}={})", attribute, value),
            ExprNode::GreaterEq { attribute, value } => write!(f, "({}>={})", attribute, value),
            ExprNode::LessEq { attribute, value } => write!(f, "({}<={})", attribute, value),
            ExprNode::Presence { attribute } => write!(f, "({}=*)", attribute),
            ExprNode::ApproxMatch { attribute, value } => write!(f, "({}~={})", attribute, value),
            ExprNode::Substring {
                attribute,
                initial,
                any,
                final_,
            } => {
                write!(f, "({}=", attribute)?;
                if let Some(i) = initial {
                    write!(f, "{}", i)?;
                }
                write!(f, "*")?;
                for a in any {
                    write!(f, "{}*", a)?;
                }
                if let Some(fin) = final_ {
                    write!(f, "{}", fin)?;
                }
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_display_ldap_form() {
        let filter = ExprNode::and(vec![
            ExprNode::eq("cn", "alice"),
            ExprNode::not(ExprNode::present("mail")),
            ExprNode::substring("sn", Some("sm"), &["i"], Some("h")),
        ]);
        assert_eq!(filter.to_string(), "(&(cn=alice)(!(mail=*))(sn=sm*i*h))");
        assert_eq!(ExprNode::le("age", "40").to_string(), "(age<=40)");
    }

    #[test]
    fn test_deserialize_tagged_json() {
        let value = json!({
            "or": [
                { "greater_eq": { "attribute": "age", "value": "18" } },
                { "substring": { "attribute": "cn", "final": "son" } }
            ]
        });
        let filter: ExprNode = serde_json::from_value(value).unwrap();
        assert_eq!(
            filter,
            ExprNode::or(vec![
                ExprNode::ge("age", "18"),
                ExprNode::substring("cn", None, &[], Some("son")),
            ])
        );
    }

    #[test]
    fn test_attribute_of_leaves_only() {
        assert_eq!(ExprNode::approx("cn", "x").attribute(), Some("cn"));
        assert_eq!(ExprNode::and(vec![]).attribute(), None);
        assert_eq!(ExprNode::not(ExprNode::present("cn")).kind(), "not");
    }
}
