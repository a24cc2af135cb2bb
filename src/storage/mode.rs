//! Storage modes

use serde::{Deserialize, Serialize};

/// Where a table keeps its log, tail and catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageMode {
    /// Process memory only; flush is a no-op and nothing survives restart
    #[default]
    InMemory,
    /// Files under the table's data directory, synced on every flush
    Durable,
}

impl StorageMode {
    /// Returns whether this mode writes to disk
    pub fn is_durable(&self) -> bool {
        matches!(self, StorageMode::Durable)
    }
}
