//! Catalog entries and their on-disk frame
//!
//! Frame format:
//!
//! ```text
//! [len: u32 LE][crc32 of payload: u32 LE][payload: len bytes of JSON]
//! ```

use serde::{Deserialize, Serialize};

use crate::expression::RelOp;
use crate::monitor::Aggregate;
use crate::storage::{compute_checksum, StorageError, StorageResult};

/// Bytes before the payload of every frame
pub const FRAME_HEADER_SIZE: usize = 8;

/// One registered index, filter or trigger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CatalogEntry {
    Index {
        index_id: u32,
        field_name: String,
        bucket_size: f64,
    },
    Filter {
        filter_id: u32,
        expression: String,
        window_ms: u64,
    },
    Trigger {
        trigger_id: u32,
        filter_id: u32,
        field_name: String,
        aggregate: Aggregate,
        op: RelOp,
        threshold: f64,
    },
}

impl CatalogEntry {
    /// Entry kind as stored in the `kind` tag
    pub fn kind(&self) -> &'static str {
        match self {
            CatalogEntry::Index { .. } => "index",
            CatalogEntry::Filter { .. } => "filter",
            CatalogEntry::Trigger { .. } => "trigger",
        }
    }

    /// Serializes the entry into a checksummed frame.
    pub fn to_frame(&self) -> StorageResult<Vec<u8>> {
        let payload = serde_json::to_vec(self).map_err(|e| {
            StorageError::data_corruption(format!("Failed to encode catalog entry: {}", e))
        })?;

        let mut frame = Vec::with_capacity(FRAME_HEADER_SIZE + payload.len());
        frame.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        frame.extend_from_slice(&compute_checksum(&payload).to_le_bytes());
        frame.extend_from_slice(&payload);
        Ok(frame)
    }
}
