//! Table configuration
//!
//! Every field has a default, so `{}` deserializes to an in-memory table with
//! a 64 MiB log.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::storage::StorageMode;

use super::errors::{TableError, TableResult};

/// Default log capacity (64 MiB)
pub const DEFAULT_LOG_CAPACITY: u64 = 64 * 1024 * 1024;

/// Largest accepted log capacity (64 GiB)
pub const MAX_LOG_CAPACITY: u64 = 64 * 1024 * 1024 * 1024;

/// Storage settings of one table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableConfig {
    /// Directory holding `data_log`, `read_tail`, `schema.json` and `metadata`
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default)]
    pub storage_mode: StorageMode,

    /// Maximum bytes the data log may hold
    #[serde(default = "default_log_capacity")]
    pub log_capacity_bytes: u64,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./tailstore_data")
}

fn default_log_capacity() -> u64 {
    DEFAULT_LOG_CAPACITY
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            storage_mode: StorageMode::InMemory,
            log_capacity_bytes: DEFAULT_LOG_CAPACITY,
        }
    }
}

impl TableConfig {
    /// Memory-only table with the default capacity
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Durable table rooted at `data_dir`
    pub fn durable(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            storage_mode: StorageMode::Durable,
            log_capacity_bytes: DEFAULT_LOG_CAPACITY,
        }
    }

    /// Overrides the log capacity.
    pub fn with_capacity(mut self, log_capacity_bytes: u64) -> Self {
        self.log_capacity_bytes = log_capacity_bytes;
        self
    }

    pub fn data_path(&self) -> &Path {
        &self.data_dir
    }

    /// Rejects a zero or oversized capacity, and a durable table without a
    /// directory.
    pub fn validate(&self) -> TableResult<()> {
        if self.log_capacity_bytes == 0 {
            return Err(TableError::invalid_config("log_capacity_bytes must be > 0"));
        }
        if self.log_capacity_bytes > MAX_LOG_CAPACITY {
            return Err(TableError::invalid_config(format!(
                "log_capacity_bytes must be <= {}",
                MAX_LOG_CAPACITY
            )));
        }
        if self.storage_mode.is_durable() && self.data_dir.as_os_str().is_empty() {
            return Err(TableError::invalid_config(
                "data_dir is required for durable storage",
            ));
        }
        Ok(())
    }
}
