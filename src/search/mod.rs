//! Search subsystem for dirsearch
//!
//! Turns a parsed filter into candidates and filters them entry by entry.
//!
//! # Data flow
//!
//! filter AST -> `CursorBuilder` (schema resolution, index selection)
//! -> candidate set -> `EntryFilteringCursor` (root evaluator, master
//! table) -> matching entries
//!
//! # Invariants
//!
//! - The result set does not depend on which indexes exist
//! - Descendant attribute values satisfy assertions on their ancestors
//! - `Not` never narrows candidates
//! - An `Or` with any unbounded branch is unbounded
//! - Errors abort the search; entries already yielded are not retracted,
//!   but nothing is yielded after the error

mod ast;
mod cursor;
mod engine;
mod errors;
mod evaluator;
mod explain;
mod index_entry;
mod planner;

pub use ast::ExprNode;
pub use cursor::EntryFilteringCursor;
pub use engine::{ScanType, SearchEngine, SearchPlan, SearchRequest};
pub use errors::{SearchError, SearchResult};
pub use evaluator::{
    AttributeAssertion, Direction, EqualityEvaluator, Evaluator, EvaluatorBuilder,
    OrderingEvaluator, PresenceEvaluator, SubstringEvaluator,
};
pub use explain::ExplainPlan;
pub use index_entry::IndexEntry;
pub use planner::{CandidateSet, CursorBuilder, Plan, PlanNode};

#[cfg(test)]
pub(crate) mod fixtures {
    //! Shared people partition for unit tests
    //!
    //! | id | cn    | sn    | age | mail              |
    //! |----|-------|-------|-----|-------------------|
    //! | 1  | Alice | Smith | 30  | alice@example.com |
    //! | 2  | Bob   | X     | 45  |                   |
    //! | 3  | alice | x     |     |                   |

    use crate::entry::Entry;
    use crate::index::Store;
    use crate::schema::{AttributeTypeRegistry, SchemaLoader};

    pub fn schema() -> AttributeTypeRegistry {
        SchemaLoader::from_json(
            r#"[
                { "oid": "2.5.4.41", "names": ["name"],
                  "equality": "caseIgnoreMatch",
                  "ordering": "caseIgnoreOrderingMatch",
                  "substring": "caseIgnoreSubstringsMatch" },
                { "oid": "2.5.4.3", "names": ["cn", "commonName"], "superior": "name" },
                { "oid": "2.5.4.4", "names": ["sn", "surname"], "superior": "name" },
                { "oid": "0.9.2342.19200300.100.1.3", "names": ["mail"],
                  "equality": "caseIgnoreMatch",
                  "substring": "caseIgnoreSubstringsMatch" },
                { "oid": "1.3.6.1.4.1.99999.1", "names": ["age"],
                  "equality": "integerMatch",
                  "ordering": "integerOrderingMatch" },
                { "oid": "1.3.6.1.4.1.99999.2", "names": ["photo"] },
                { "oid": "2.5.4.5", "names": ["serialNumber"],
                  "equality": "integerMatch",
                  "ordering": "integerOrderingMatch" },
                { "oid": "2.16.840.1.113730.3.1.3", "names": ["employeeNumber"],
                  "superior": "serialNumber",
                  "equality": "caseExactMatch" }
            ]"#,
        )
        .unwrap()
    }

    /// `indexed` names the attributes to index; a trailing `+` also
    /// indexes descendant types
    pub fn people(indexed: &[&str]) -> (AttributeTypeRegistry, Store) {
        let schema = schema();
        let store = Store::new("people");
        for name in indexed {
            let (attribute, descendants) = match name.strip_suffix('+') {
                Some(a) => (a, true),
                None => (*name, false),
            };
            store.add_index(attribute, descendants, &schema).unwrap();
        }
        let entries = [
            Entry::new(1, "cn=Alice,ou=people")
                .with_value("cn", "Alice")
                .with_value("sn", "Smith")
                .with_value("age", "30")
                .with_value("mail", "alice@example.com"),
            Entry::new(2, "cn=Bob,ou=people")
                .with_value("cn", "Bob")
                .with_value("sn", "X")
                .with_value("age", "45"),
            Entry::new(3, "cn=alice,ou=staff")
                .with_value("cn", "alice")
                .with_value("sn", "x"),
        ];
        for entry in entries {
            store.add_entry(entry, &schema).unwrap();
        }
        (schema, store)
    }
}
