//! One secondary index
//!
//! An entry is created by `add_index` and lives as long as the table. Removing
//! the index only detaches it from its column: later appends stop feeding it,
//! and it stays queryable by id.

use parking_lot::RwLock;

use crate::schema::{DataType, Value};

use super::key::IndexKey;
use super::kind::IndexKind;
use super::tree::{IndexTree, StorageOffset};

/// A secondary index over one column
#[derive(Debug)]
pub struct IndexEntry {
    index_id: u32,
    column: usize,
    field_name: String,
    data_type: DataType,
    kind: IndexKind,
    bucket_size: f64,
    tree: RwLock<IndexTree>,
}

impl IndexEntry {
    pub fn new(
        index_id: u32,
        column: usize,
        field_name: impl Into<String>,
        data_type: DataType,
        kind: IndexKind,
        bucket_size: f64,
    ) -> Self {
        Self {
            index_id,
            column,
            field_name: field_name.into(),
            data_type,
            kind,
            bucket_size,
            tree: RwLock::new(IndexTree::new()),
        }
    }

    pub fn index_id(&self) -> u32 {
        self.index_id
    }

    /// Position of the indexed column
    pub fn column(&self) -> usize {
        self.column
    }

    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    pub fn kind(&self) -> IndexKind {
        self.kind
    }

    pub fn bucket_size(&self) -> f64 {
        self.bucket_size
    }

    /// Key of `value` in this index
    pub fn key_for(&self, value: &Value) -> Option<IndexKey> {
        if !value.fits(&self.data_type) {
            return None;
        }
        IndexKey::derive_for(value, &self.data_type, self.bucket_size)
    }

    pub fn insert(&self, key: IndexKey, offset: StorageOffset) {
        self.tree.write().insert(key, offset);
    }

    /// Offsets below `bound` whose value falls in the same bucket as `value`.
    pub fn lookup(&self, value: &Value, bound: StorageOffset) -> Vec<StorageOffset> {
        match self.key_for(value) {
            Some(key) => self.tree.read().lookup_eq(&key, bound),
            None => Vec::new(),
        }
    }

    /// Offsets below `bound` whose bucket lies between those of `min` and `max`.
    pub fn lookup_range(
        &self,
        min: Option<&Value>,
        max: Option<&Value>,
        bound: StorageOffset,
    ) -> Vec<StorageOffset> {
        let min_key = match min {
            Some(value) => match self.key_for(value) {
                Some(key) => Some(key),
                None => return Vec::new(),
            },
            None => None,
        };
        let max_key = match max {
            Some(value) => match self.key_for(value) {
                Some(key) => Some(key),
                None => return Vec::new(),
            },
            None => None,
        };
        self.tree
            .read()
            .lookup_range(min_key.as_ref(), max_key.as_ref(), bound)
    }

    pub fn key_count(&self) -> usize {
        self.tree.read().key_count()
    }

    pub fn offset_count(&self) -> usize {
        self.tree.read().offset_count()
    }
}
