//! Append-only catalog writer
//!
//! Entries are kept in memory in registration order. In durable mode each one
//! is also appended to `<data_dir>/metadata` as a checksummed frame and synced
//! before the write returns.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::expression::RelOp;
use crate::monitor::Aggregate;
use crate::storage::{StorageError, StorageResult};

use super::entry::CatalogEntry;
use super::reader::MetadataReader;

/// File name of the catalog inside a table's data directory
pub const METADATA_FILE: &str = "metadata";

/// First unused id of each registry, past every id already in a catalog
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NextIds {
    pub index: usize,
    pub filter: usize,
    pub trigger: usize,
}

impl NextIds {
    /// Ids that follow the highest of each kind in `entries`.
    pub fn after(entries: &[CatalogEntry]) -> Self {
        let mut next = Self::default();
        for entry in entries {
            match entry {
                CatalogEntry::Index { index_id, .. } => {
                    next.index = next.index.max(*index_id as usize + 1)
                }
                CatalogEntry::Filter { filter_id, .. } => {
                    next.filter = next.filter.max(*filter_id as usize + 1)
                }
                CatalogEntry::Trigger { trigger_id, .. } => {
                    next.trigger = next.trigger.max(*trigger_id as usize + 1)
                }
            }
        }
        next
    }
}

struct CatalogState {
    entries: Vec<CatalogEntry>,
    file: Option<File>,
}

/// Catalog of registered indexes, filters and triggers
pub struct MetadataWriter {
    state: Mutex<CatalogState>,
    path: Option<PathBuf>,
}

impl MetadataWriter {
    /// Memory-only catalog
    pub fn in_memory() -> Self {
        Self {
            state: Mutex::new(CatalogState {
                entries: Vec::new(),
                file: None,
            }),
            path: None,
        }
    }

    /// Opens `<data_dir>/metadata`, loading the entries already in it.
    ///
    /// # Errors
    ///
    /// TAIL_DATA_CORRUPTION if an existing frame fails verification.
    pub fn open(data_dir: &Path) -> StorageResult<Self> {
        let path = data_dir.join(METADATA_FILE);
        let entries = MetadataReader::read_all(&path)?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| {
                StorageError::io_error(format!("Failed to open catalog: {}", path.display()), e)
            })?;

        Ok(Self {
            state: Mutex::new(CatalogState {
                entries,
                file: Some(file),
            }),
            path: Some(path),
        })
    }

    pub fn write_index_info(&self, index_id: u32, field_name: &str, bucket_size: f64) -> StorageResult<()> {
        self.write(CatalogEntry::Index {
            index_id,
            field_name: field_name.to_string(),
            bucket_size,
        })
    }

    pub fn write_filter_info(&self, filter_id: u32, expression: &str, window_ms: u64) -> StorageResult<()> {
        self.write(CatalogEntry::Filter {
            filter_id,
            expression: expression.to_string(),
            window_ms,
        })
    }

    pub fn write_trigger_info(
        &self,
        trigger_id: u32,
        filter_id: u32,
        field_name: &str,
        aggregate: Aggregate,
        op: RelOp,
        threshold: f64,
    ) -> StorageResult<()> {
        self.write(CatalogEntry::Trigger {
            trigger_id,
            filter_id,
            field_name: field_name.to_string(),
            aggregate,
            op,
            threshold,
        })
    }

    /// First unused ids given the entries recorded so far
    pub fn next_ids(&self) -> NextIds {
        NextIds::after(&self.state.lock().entries)
    }

    /// Snapshot of every entry in registration order
    pub fn entries(&self) -> Vec<CatalogEntry> {
        self.state.lock().entries.clone()
    }

    /// Path of the catalog file in durable mode
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Records `entry` in memory, then persists it. The in-memory entry is
    /// kept even if persisting fails.
    fn write(&self, entry: CatalogEntry) -> StorageResult<()> {
        let frame = entry.to_frame()?;
        let mut state = self.state.lock();
        state.entries.push(entry);

        let Some(file) = state.file.as_mut() else {
            return Ok(());
        };
        file.write_all(&frame)
            .and_then(|_| file.sync_data())
            .map_err(|e| StorageError::io_error("Failed to write catalog entry", e))
    }
}

impl std::fmt::Debug for MetadataWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataWriter")
            .field("entries", &self.state.lock().entries.len())
            .field("path", &self.path)
            .finish()
    }
}
