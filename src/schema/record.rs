//! Typed view over one appended record
//!
//! A `Record` is rebuilt on demand from raw bytes and the schema; it is never
//! stored. During an append it also carries each indexed field's key, derived
//! once before the offset is reserved.

use crate::index::IndexKey;

use super::types::Value;

/// One field of a record
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    value: Value,
    column: usize,
    index_id: Option<u32>,
    key: Option<IndexKey>,
}

impl Field {
    pub(crate) fn new(value: Value, column: usize, index_id: Option<u32>) -> Self {
        Self {
            value,
            column,
            index_id,
            key: None,
        }
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Position of the owning column
    pub fn column(&self) -> usize {
        self.column
    }

    /// Whether the column was INDEXED when the record was materialized
    pub fn is_indexed(&self) -> bool {
        self.index_id.is_some()
    }

    pub fn index_id(&self) -> Option<u32> {
        self.index_id
    }

    /// Key inserted into the field's index, if any
    pub fn key(&self) -> Option<&IndexKey> {
        self.key.as_ref()
    }

    pub(crate) fn set_key(&mut self, key: IndexKey) {
        self.key = Some(key);
    }

    pub fn into_value(self) -> Value {
        self.value
    }
}

/// A record: log offset, timestamp in nanoseconds, and fields in column order
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    offset: u64,
    timestamp: u64,
    fields: Vec<Field>,
}

impl Record {
    pub(crate) fn new(offset: u64, timestamp: u64, fields: Vec<Field>) -> Self {
        Self {
            offset,
            timestamp,
            fields,
        }
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub(crate) fn set_offset(&mut self, offset: u64) {
        self.offset = offset;
    }

    /// Timestamp in nanoseconds
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Timestamp truncated to milliseconds
    pub fn timestamp_ms(&self) -> u64 {
        self.timestamp / 1_000_000
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub(crate) fn fields_mut(&mut self) -> &mut [Field] {
        &mut self.fields
    }

    pub fn field(&self, position: usize) -> Option<&Field> {
        self.fields.get(position)
    }

    pub fn value(&self, position: usize) -> Option<&Value> {
        self.fields.get(position).map(Field::value)
    }

    /// Field values in column order
    pub fn into_values(self) -> Vec<Value> {
        self.fields.into_iter().map(Field::into_value).collect()
    }
}
