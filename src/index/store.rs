//! Partition store: master table plus attribute indexes
//!
//! # Invariants
//!
//! - Every entry in the master table is reflected in every index that
//!   covers one of its attributes, and in the presence index
//! - Writes are serialised; all values are normalized under their
//!   attribute's equality rule before anything is mutated, so a rejected
//!   write leaves the store unchanged
//! - Readers never take the writer lock

use std::sync::{Arc, Mutex, RwLock};

use tracing::debug;

use crate::entry::{Entry, EntryId};
use crate::schema::{AttributeType, NormalizedValue, SchemaRegistry};

use super::btree::Index;
use super::cursor::Cursor;
use super::errors::{IndexError, IndexResult};
use super::master::MasterTable;

/// OID of the system presence index
pub const PRESENCE_INDEX_OID: &str = "1.3.6.1.4.1.18060.0.4.1.2.3";

/// Owns the master table and the index set of one partition
#[derive(Debug)]
pub struct Store {
    partition_id: String,
    master: MasterTable,
    indexes: RwLock<Vec<Arc<Index>>>,
    /// Indexed attribute OID -> ids of entries holding a value of it
    presence: Index,
    writer: Mutex<()>,
}

impl Store {
    /// Creates an empty partition store with no user indexes
    pub fn new(partition_id: impl Into<String>) -> Self {
        Self {
            partition_id: partition_id.into(),
            master: MasterTable::new(),
            indexes: RwLock::new(Vec::new()),
            presence: Index::system(PRESENCE_INDEX_OID, "presence"),
            writer: Mutex::new(()),
        }
    }

    /// Returns the partition id
    pub fn partition_id(&self) -> &str {
        &self.partition_id
    }

    /// Returns the master table
    pub fn master_table(&self) -> &MasterTable {
        &self.master
    }

    /// Returns the system presence index
    pub fn presence_index(&self) -> &Index {
        &self.presence
    }

    fn indexes(&self) -> IndexResult<Vec<Arc<Index>>> {
        self.indexes
            .read()
            .map(|guard| guard.clone())
            .map_err(|_| IndexError::poisoned("index set"))
    }

    /// Returns true if a user index exists on the attribute (name or OID)
    pub fn has_index_on(&self, attribute: &str) -> IndexResult<bool> {
        Ok(self.index_for(attribute)?.is_some())
    }

    /// Returns the user index on the attribute (name or OID)
    pub fn index_for(&self, attribute: &str) -> IndexResult<Option<Arc<Index>>> {
        Ok(self
            .indexes()?
            .into_iter()
            .find(|idx| idx.attribute().is_known_as(attribute)))
    }

    /// Returns the index to use for assertions on `at`, if any.
    ///
    /// An index that does not store subtype values is only usable when `at`
    /// has no descendants; otherwise entries holding only a subtype value
    /// would be missed.
    pub fn usable_index_for(
        &self,
        at: &AttributeType,
        schema: &dyn SchemaRegistry,
    ) -> IndexResult<Option<Arc<Index>>> {
        let Some(idx) = self.index_for(&at.oid)? else {
            return Ok(None);
        };
        if idx.includes_descendants() || schema.descendants_of(at).is_empty() {
            Ok(Some(idx))
        } else {
            debug!(
                attribute = at.name(),
                "index ignored: attribute has descendants the index does not cover"
            );
            Ok(None)
        }
    }

    /// Returns the attributes that carry a user index
    pub fn indexed_attributes(&self) -> IndexResult<Vec<Arc<AttributeType>>> {
        Ok(self
            .indexes()?
            .iter()
            .map(|idx| Arc::clone(idx.attribute()))
            .collect())
    }

    /// Creates an index on `attribute` and fills it from the master table
    pub fn add_index(
        &self,
        attribute: &str,
        include_descendants: bool,
        schema: &dyn SchemaRegistry,
    ) -> IndexResult<()> {
        let _writer = self.writer.lock().map_err(|_| IndexError::poisoned("store writer"))?;

        let at = schema.resolve_attribute_type(attribute)?;
        if self.index_for(&at.oid)?.is_some() {
            return Err(IndexError::DuplicateIndex(at.name().to_string()));
        }
        let index = Arc::new(Index::new(Arc::clone(&at), include_descendants, schema)?);

        let mut pairs = Vec::new();
        let mut present = Vec::new();
        let mut cursor = self.master.cursor()?;
        while let Some((id, entry)) = cursor.advance()? {
            let keys = Self::keys_for(&index, &entry, schema)?;
            if !keys.is_empty() {
                present.push((NormalizedValue::Text(at.oid.clone()), id));
            }
            pairs.extend(keys.into_iter().map(|k| (k, id)));
        }
        cursor.close();

        debug!(
            partition = %self.partition_id,
            attribute = at.name(),
            include_descendants,
            keys = pairs.len(),
            "index built"
        );

        index.insert_all(pairs)?;
        self.presence.insert_all(present)?;
        self.indexes
            .write()
            .map_err(|_| IndexError::poisoned("index set"))?
            .push(index);
        Ok(())
    }

    /// Normalized keys `entry` contributes to `index`
    fn keys_for(
        index: &Index,
        entry: &Entry,
        schema: &dyn SchemaRegistry,
    ) -> IndexResult<Vec<NormalizedValue>> {
        let mut keys = Vec::new();
        for (description, values) in entry.attributes() {
            let at = schema.resolve_attribute_type(description)?;
            if !index.covers(&at.oid) {
                continue;
            }
            for value in values {
                let key = value.normalize(index.rule().normalizer)?;
                keys.push(key.into_owned());
            }
        }
        Ok(keys)
    }

    /// Stores a new entry and reflects it in every index.
    pub fn add_entry(&self, entry: Entry, schema: &dyn SchemaRegistry) -> IndexResult<()> {
        let _writer = self.writer.lock().map_err(|_| IndexError::poisoned("store writer"))?;

        if self.master.contains(entry.id)? {
            return Err(IndexError::DuplicateEntry(entry.id));
        }
        // Unknown attributes and ill-formed values are rejected even when
        // nothing indexes them
        for (description, values) in entry.attributes() {
            let at = schema.resolve_attribute_type(description)?;
            if let Some(rule) = &at.equality {
                for value in values {
                    value.normalize(rule.normalizer)?;
                }
            }
        }

        let indexes = self.indexes()?;
        let mut planned = Vec::with_capacity(indexes.len());
        for index in &indexes {
            planned.push(Self::keys_for(index, &entry, schema)?);
        }

        let id = entry.id;
        self.master.insert(Arc::new(entry))?;
        for (index, keys) in indexes.iter().zip(planned) {
            if keys.is_empty() {
                continue;
            }
            self.presence
                .insert(NormalizedValue::Text(index.attribute().oid.clone()), id)?;
            index.insert_all(keys.into_iter().map(|k| (k, id)).collect())?;
        }
        Ok(())
    }

    /// Removes an entry and all its index keys. Returns the removed entry.
    pub fn delete_entry(&self, id: EntryId) -> IndexResult<Option<Arc<Entry>>> {
        let _writer = self.writer.lock().map_err(|_| IndexError::poisoned("store writer"))?;

        for index in self.indexes()? {
            index.remove_id(id)?;
        }
        self.presence.remove_id(id)?;
        self.master.remove(id)
    }
}
