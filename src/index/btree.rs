//! BTree-based attribute indexes
//!
//! An index keeps two sorted sets over normalized values:
//! forward `(value, id)` and reverse `(id, value)`. Duplicates are allowed
//! on either side (many ids per value, many values per id).
//!
//! Keys are produced by the index's equality normalizer, so every key in one
//! index has the same `NormalizedValue` variant and the tuple ordering of
//! the sets agrees with the rule's comparator.

use std::collections::{BTreeSet, HashSet};
use std::ops::Bound;
use std::sync::{Arc, RwLock};

use crate::entry::EntryId;
use crate::schema::{
    AttributeType, Comparator, MatchingRule, NormalizedValue, Normalizer, SchemaRegistry,
};

use super::cursor::{IndexCursor, ReverseIndexCursor, SetCursor};
use super::errors::{IndexError, IndexResult};

/// One immutable version of an index's contents
#[derive(Debug, Clone, Default)]
pub struct IndexTree {
    forward: BTreeSet<(NormalizedValue, EntryId)>,
    reverse: BTreeSet<(EntryId, NormalizedValue)>,
}

impl IndexTree {
    fn insert(&mut self, value: NormalizedValue, id: EntryId) {
        self.reverse.insert((id, value.clone()));
        self.forward.insert((value, id));
    }

    fn remove(&mut self, value: &NormalizedValue, id: EntryId) {
        self.forward.remove(&(value.clone(), id));
        self.reverse.remove(&(id, value.clone()));
    }

    fn remove_id(&mut self, id: EntryId) {
        let values: Vec<NormalizedValue> = self.values_of(id).cloned().collect();
        for value in values {
            self.remove(&value, id);
        }
    }

    fn values_of(&self, id: EntryId) -> impl Iterator<Item = &NormalizedValue> {
        self.reverse
            .range(id_range(id))
            .map(|(_, value)| value)
    }

    fn ids_in(&self, lower: Bound<&NormalizedValue>, upper: Bound<&NormalizedValue>) -> BTreeSet<EntryId> {
        let lo = match lower {
            Bound::Included(v) => Bound::Included((v.clone(), EntryId::MIN)),
            Bound::Excluded(v) => Bound::Excluded((v.clone(), EntryId::MAX)),
            Bound::Unbounded => Bound::Unbounded,
        };
        let hi = match upper {
            Bound::Included(v) => Bound::Included((v.clone(), EntryId::MAX)),
            Bound::Excluded(v) => Bound::Excluded((v.clone(), EntryId::MIN)),
            Bound::Unbounded => Bound::Unbounded,
        };
        self.forward.range((lo, hi)).map(|(_, id)| *id).collect()
    }

    fn forward_set(&self) -> &BTreeSet<(NormalizedValue, EntryId)> {
        &self.forward
    }

    fn reverse_set(&self) -> &BTreeSet<(EntryId, NormalizedValue)> {
        &self.reverse
    }
}

fn id_range(
    id: EntryId,
) -> (
    Bound<(EntryId, NormalizedValue)>,
    Bound<(EntryId, NormalizedValue)>,
) {
    // Integer is the smallest variant, i64::MIN the smallest integer
    let lo = Bound::Included((id, NormalizedValue::Integer(i64::MIN)));
    let hi = match id.checked_add(1) {
        Some(next) => Bound::Excluded((next, NormalizedValue::Integer(i64::MIN))),
        None => Bound::Unbounded,
    };
    (lo, hi)
}

/// A named, schema-typed index on one attribute type
#[derive(Debug)]
pub struct Index {
    attribute: Arc<AttributeType>,
    rule: MatchingRule,
    include_descendants: bool,
    /// OIDs whose values are stored in this index
    covered: HashSet<String>,
    tree: RwLock<Arc<IndexTree>>,
}

impl Index {
    /// Creates an empty index on `attribute`.
    ///
    /// Keys are normalized with the attribute's equality rule. With
    /// `include_descendants`, values of every subtype are indexed as well.
    pub fn new(
        attribute: Arc<AttributeType>,
        include_descendants: bool,
        schema: &dyn SchemaRegistry,
    ) -> IndexResult<Self> {
        let rule = attribute
            .equality
            .clone()
            .ok_or_else(|| IndexError::NotIndexable(attribute.name().to_string()))?;

        let mut covered = HashSet::new();
        covered.insert(attribute.oid.clone());
        if include_descendants {
            for d in schema.descendants_of(&attribute) {
                covered.insert(d.oid.clone());
            }
        }

        Ok(Self {
            attribute,
            rule,
            include_descendants,
            covered,
            tree: RwLock::new(Arc::new(IndexTree::default())),
        })
    }

    /// Creates a system index keyed by raw text (no schema attribute)
    pub(crate) fn system(oid: &str, name: &str) -> Self {
        let rule = MatchingRule::new("octetStringMatch", Normalizer::NoOp, Comparator::Lexical);
        let attribute = Arc::new(AttributeType {
            oid: oid.to_string(),
            names: vec![name.to_string()],
            superior: None,
            equality: Some(rule.clone()),
            ordering: None,
            substring: None,
        });
        let mut covered = HashSet::new();
        covered.insert(oid.to_string());
        Self {
            attribute,
            rule,
            include_descendants: false,
            covered,
            tree: RwLock::new(Arc::new(IndexTree::default())),
        }
    }

    /// Returns the indexed attribute type
    pub fn attribute(&self) -> &Arc<AttributeType> {
        &self.attribute
    }

    /// Returns the matching rule used for keys
    pub fn rule(&self) -> &MatchingRule {
        &self.rule
    }

    /// Returns the comparator used for keys
    pub fn comparator(&self) -> Comparator {
        self.rule.comparator
    }

    /// Returns true if subtype values are indexed too
    pub fn includes_descendants(&self) -> bool {
        self.include_descendants
    }

    /// Returns true if values of the attribute type `oid` feed this index
    pub fn covers(&self, oid: &str) -> bool {
        self.covered.contains(oid)
    }

    /// Normalizes a raw value into a key of this index
    pub fn normalize(&self, raw: &str) -> IndexResult<NormalizedValue> {
        Ok(self.rule.normalize(raw)?)
    }

    pub(crate) fn snapshot(&self) -> IndexResult<Arc<IndexTree>> {
        self.tree
            .read()
            .map(|guard| Arc::clone(&*guard))
            .map_err(|_| IndexError::poisoned("index"))
    }

    fn write<F: FnOnce(&mut IndexTree)>(&self, f: F) -> IndexResult<()> {
        let mut guard = self.tree.write().map_err(|_| IndexError::poisoned("index"))?;
        f(Arc::make_mut(&mut *guard));
        Ok(())
    }

    pub(crate) fn insert(&self, value: NormalizedValue, id: EntryId) -> IndexResult<()> {
        self.write(|tree| tree.insert(value, id))
    }

    pub(crate) fn insert_all(&self, pairs: Vec<(NormalizedValue, EntryId)>) -> IndexResult<()> {
        self.write(|tree| {
            for (value, id) in pairs {
                tree.insert(value, id);
            }
        })
    }

    pub(crate) fn remove_id(&self, id: EntryId) -> IndexResult<()> {
        self.write(|tree| tree.remove_id(id))
    }

    /// All ids with exactly `value`
    pub fn forward_lookup(&self, value: &NormalizedValue) -> IndexResult<BTreeSet<EntryId>> {
        Ok(self
            .snapshot()?
            .ids_in(Bound::Included(value), Bound::Included(value)))
    }

    /// True if `id` has `value`
    pub fn forward(&self, value: &NormalizedValue, id: EntryId) -> IndexResult<bool> {
        Ok(self.snapshot()?.forward.contains(&(value.clone(), id)))
    }

    /// All values of `id`, ascending
    pub fn reverse_lookup(&self, id: EntryId) -> IndexResult<Vec<NormalizedValue>> {
        Ok(self.snapshot()?.values_of(id).cloned().collect())
    }

    /// True if `id` has any value
    pub fn reverse(&self, id: EntryId) -> IndexResult<bool> {
        Ok(self.snapshot()?.values_of(id).next().is_some())
    }

    /// True if `id` has a value `v` with `compare(v, value) >= 0`
    pub fn reverse_greater_or_eq(&self, id: EntryId, value: &NormalizedValue) -> IndexResult<bool> {
        let tree = self.snapshot()?;
        let comparator = self.comparator();
        let found = tree
            .values_of(id)
            .any(|v| comparator.compare(v, value).is_ge());
        Ok(found)
    }

    /// True if `id` has a value `v` with `compare(v, value) <= 0`
    pub fn reverse_less_or_eq(&self, id: EntryId, value: &NormalizedValue) -> IndexResult<bool> {
        let tree = self.snapshot()?;
        let comparator = self.comparator();
        let found = tree
            .values_of(id)
            .any(|v| comparator.compare(v, value).is_le());
        Ok(found)
    }

    /// Ids with some value `>= value`
    pub fn forward_greater_or_eq(&self, value: &NormalizedValue) -> IndexResult<BTreeSet<EntryId>> {
        Ok(self
            .snapshot()?
            .ids_in(Bound::Included(value), Bound::Unbounded))
    }

    /// Ids with some value `<= value`
    pub fn forward_less_or_eq(&self, value: &NormalizedValue) -> IndexResult<BTreeSet<EntryId>> {
        Ok(self
            .snapshot()?
            .ids_in(Bound::Unbounded, Bound::Included(value)))
    }

    /// Ids with some value in `[lower, upper]`; empty if `lower > upper`
    pub fn forward_between(
        &self,
        lower: &NormalizedValue,
        upper: &NormalizedValue,
    ) -> IndexResult<BTreeSet<EntryId>> {
        if self.comparator().compare(lower, upper).is_gt() {
            return Ok(BTreeSet::new());
        }
        Ok(self
            .snapshot()?
            .ids_in(Bound::Included(lower), Bound::Included(upper)))
    }

    /// Number of (value, id) pairs
    pub fn count(&self) -> IndexResult<u64> {
        Ok(self.snapshot()?.forward.len() as u64)
    }

    /// Number of ids with exactly `value`
    pub fn count_of(&self, value: &NormalizedValue) -> IndexResult<u64> {
        Ok(self.forward_lookup(value)?.len() as u64)
    }

    /// Number of pairs with a value `>= value`
    pub fn greater_or_eq_count(&self, value: &NormalizedValue) -> IndexResult<u64> {
        let tree = self.snapshot()?;
        Ok(tree
            .forward
            .range((Bound::Included((value.clone(), EntryId::MIN)), Bound::Unbounded))
            .count() as u64)
    }

    /// Number of pairs with a value `<= value`
    pub fn less_or_eq_count(&self, value: &NormalizedValue) -> IndexResult<u64> {
        let tree = self.snapshot()?;
        Ok(tree
            .forward
            .range((Bound::Unbounded, Bound::Included((value.clone(), EntryId::MAX))))
            .count() as u64)
    }

    /// Opens a cursor over (value, id) pairs, ascending
    pub fn cursor(&self) -> IndexResult<IndexCursor> {
        Ok(SetCursor::new(
            self.snapshot()?,
            IndexTree::forward_set,
            Bound::Unbounded,
        ))
    }

    /// Opens a cursor positioned before the first pair with a value `>= value`
    pub fn cursor_from(&self, value: &NormalizedValue) -> IndexResult<IndexCursor> {
        Ok(SetCursor::new(
            self.snapshot()?,
            IndexTree::forward_set,
            Bound::Included((value.clone(), EntryId::MIN)),
        ))
    }

    /// Opens a cursor over (id, value) pairs, ascending
    pub fn reverse_cursor(&self) -> IndexResult<ReverseIndexCursor> {
        Ok(SetCursor::new(
            self.snapshot()?,
            IndexTree::reverse_set,
            Bound::Unbounded,
        ))
    }
}
