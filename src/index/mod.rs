//! Index subsystem for dirsearch
//!
//! Indexes map normalized attribute values to entry ids in both directions
//! and are kept in step with the master table by the `Store`.
//!
//! # Invariants
//!
//! - Forward cursors ascend by (value, id), reverse cursors by (id, value)
//! - Keys are normalized with the indexed attribute's equality rule
//! - A cursor sees the snapshot current when it was opened
//! - Readers never block readers; writers are serialised by the store

mod btree;
mod cursor;
mod errors;
mod master;
mod store;

pub use btree::{Index, IndexTree};
pub use cursor::{Cursor, IndexCursor, MasterCursor, ReverseIndexCursor, SetCursor};
pub use errors::{IndexError, IndexResult};
pub use master::MasterTable;
pub use store::{Store, PRESENCE_INDEX_OID};
