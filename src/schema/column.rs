//! Columns and their indexing state machine
//!
//! A column's name, type and byte offset never change once the schema is
//! built. The only mutable attribute is the indexing state, held in a single
//! `AtomicU64` so that appenders can read it without a lock:
//!
//! ```text
//!   UNINDEXED --set_indexing--> INDEXING --set_indexed(id)--> INDEXED(id)
//!       ^                           |                             |
//!       +------set_unindexed--------+                             |
//!       +------------------disable_indexing-----------------------+
//! ```
//!
//! Encoding: the low two bits hold the tag, the upper 32 bits the index id.
//! INDEXED is published with Release and read with Acquire, so an appender
//! that sees an index id also sees the index entry it refers to.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use super::types::DataType;

const TAG_MASK: u64 = 0b11;
const TAG_UNINDEXED: u64 = 0;
const TAG_INDEXING: u64 = 1;
const TAG_INDEXED: u64 = 2;
const ID_SHIFT: u32 = 32;

/// Indexing state of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexState {
    Unindexed,
    /// An index is being attached
    Indexing,
    Indexed { index_id: u32 },
}

impl IndexState {
    fn encode(self) -> u64 {
        match self {
            IndexState::Unindexed => TAG_UNINDEXED,
            IndexState::Indexing => TAG_INDEXING,
            IndexState::Indexed { index_id } => ((index_id as u64) << ID_SHIFT) | TAG_INDEXED,
        }
    }

    fn decode(raw: u64) -> Self {
        match raw & TAG_MASK {
            TAG_INDEXING => IndexState::Indexing,
            TAG_INDEXED => IndexState::Indexed {
                index_id: (raw >> ID_SHIFT) as u32,
            },
            _ => IndexState::Unindexed,
        }
    }

    /// Index id when INDEXED
    pub fn index_id(&self) -> Option<u32> {
        match self {
            IndexState::Indexed { index_id } => Some(*index_id),
            _ => None,
        }
    }
}

/// Column definition as supplied by the user and persisted in `schema.json`
///
/// Serialized flat: `{"name": "host", "type": "string", "width": 16}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawColumnDef", into = "RawColumnDef")]
pub struct ColumnDef {
    pub name: String,
    pub data_type: DataType,
}

#[derive(Serialize, Deserialize)]
struct RawColumnDef {
    name: String,
    #[serde(rename = "type")]
    type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    width: Option<usize>,
}

impl TryFrom<RawColumnDef> for ColumnDef {
    type Error = String;

    fn try_from(raw: RawColumnDef) -> Result<Self, Self::Error> {
        let data_type = DataType::from_parts(&raw.type_name, raw.width).ok_or_else(|| {
            format!("column '{}': unknown type '{}'", raw.name, raw.type_name)
        })?;
        Ok(ColumnDef::new(raw.name, data_type))
    }
}

impl From<ColumnDef> for RawColumnDef {
    fn from(def: ColumnDef) -> Self {
        let width = match def.data_type {
            DataType::String(width) | DataType::Binary(width) => Some(width),
            _ => None,
        };
        RawColumnDef {
            name: def.name,
            type_name: def.data_type.type_name().to_string(),
            width,
        }
    }
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// A column of a live schema
#[derive(Debug)]
pub struct Column {
    name: String,
    data_type: DataType,
    position: usize,
    offset: usize,
    state: AtomicU64,
}

impl Column {
    pub(crate) fn new(name: String, data_type: DataType, position: usize, offset: usize) -> Self {
        Self {
            name,
            data_type,
            position,
            offset,
            state: AtomicU64::new(TAG_UNINDEXED),
        }
    }

    /// Upper-cased column name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Position in the schema's column order
    pub fn position(&self) -> usize {
        self.position
    }

    /// Byte offset within a record
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Width in bytes
    pub fn size(&self) -> usize {
        self.data_type.size()
    }

    /// Current indexing state (Acquire).
    pub fn index_state(&self) -> IndexState {
        IndexState::decode(self.state.load(Ordering::Acquire))
    }

    /// Index id if the column is currently INDEXED.
    pub fn index_id(&self) -> Option<u32> {
        self.index_state().index_id()
    }

    pub fn is_indexed(&self) -> bool {
        self.index_id().is_some()
    }

    /// UNINDEXED -> INDEXING. Fails if the column is indexed or being indexed.
    pub fn set_indexing(&self) -> bool {
        self.transition(IndexState::Unindexed, IndexState::Indexing)
    }

    /// INDEXING -> INDEXED(index_id). Fails if the column left INDEXING,
    /// which only happens when the index was removed concurrently.
    pub fn set_indexed(&self, index_id: u32) -> bool {
        self.transition(IndexState::Indexing, IndexState::Indexed { index_id })
    }

    /// INDEXING -> UNINDEXED, rolling back an aborted `add_index`. Fails,
    /// leaving the state alone, if the column already left INDEXING.
    pub fn set_unindexed(&self) -> bool {
        self.transition(IndexState::Indexing, IndexState::Unindexed)
    }

    /// INDEXING or INDEXED -> UNINDEXED. Returns false if there was nothing
    /// to disable.
    pub fn disable_indexing(&self) -> bool {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            if current & TAG_MASK == TAG_UNINDEXED {
                return false;
            }
            match self.state.compare_exchange_weak(
                current,
                TAG_UNINDEXED,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(observed) => current = observed,
            }
        }
    }

    /// Definition this column was built from
    pub fn definition(&self) -> ColumnDef {
        ColumnDef::new(self.name.clone(), self.data_type)
    }

    fn transition(&self, from: IndexState, to: IndexState) -> bool {
        self.state
            .compare_exchange(from.encode(), to.encode(), Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column() -> Column {
        Column::new("A".into(), DataType::Int, 0, 0)
    }

    #[test]
    fn test_full_lifecycle() {
        let col = column();
        assert_eq!(col.index_state(), IndexState::Unindexed);

        assert!(col.set_indexing());
        assert_eq!(col.index_state(), IndexState::Indexing);
        assert!(!col.set_indexing());

        assert!(col.set_indexed(7));
        assert_eq!(col.index_id(), Some(7));

        assert!(col.disable_indexing());
        assert_eq!(col.index_state(), IndexState::Unindexed);
        assert!(!col.disable_indexing());
    }

    #[test]
    fn test_set_indexed_after_disable_fails() {
        let col = column();
        assert!(col.set_indexing());
        assert!(col.disable_indexing());
        assert!(!col.set_indexed(1));
        assert_eq!(col.index_state(), IndexState::Unindexed);
    }

    #[test]
    fn test_rollback() {
        let col = column();
        assert!(col.set_indexing());
        assert!(col.set_unindexed());
        assert!(col.set_indexing());
    }

    #[test]
    fn test_rollback_only_from_indexing() {
        let col = column();
        assert!(!col.set_unindexed());
        assert_eq!(col.index_state(), IndexState::Unindexed);

        // A stale rollback must not detach an index attached in the meantime.
        assert!(col.set_indexing());
        assert!(col.disable_indexing());
        assert!(col.set_indexing());
        assert!(col.set_indexed(3));
        assert!(!col.set_unindexed());
        assert_eq!(col.index_state(), IndexState::Indexed { index_id: 3 });
    }

    #[test]
    fn test_large_index_id_round_trips() {
        let col = column();
        col.set_indexing();
        col.set_indexed(u32::MAX);
        assert_eq!(col.index_id(), Some(u32::MAX));
    }

    #[test]
    fn test_column_def_serde() {
        let def: ColumnDef =
            serde_json::from_str(r#"{"name":"host","type":"string","width":16}"#).unwrap();
        assert_eq!(def, ColumnDef::new("host", DataType::String(16)));

        let json = serde_json::to_value(ColumnDef::new("a", DataType::Int)).unwrap();
        assert_eq!(json, serde_json::json!({"name": "a", "type": "int"}));
    }
}
