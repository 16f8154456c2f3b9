//! dirsearch - index-driven LDAP filter evaluation for one directory partition
//!
//! - `schema`: attribute types, matching rules and normalization
//! - `entry`: entries and their attribute values
//! - `index`: master table, attribute indexes and the partition store
//! - `search`: filter planning, candidate selection and filtering cursors
//! - `config`: partition configuration and fixtures
//! - `cli`: the `dirsearch` command

pub mod cli;
pub mod config;
pub mod entry;
pub mod index;
pub mod schema;
pub mod search;
