//! The table: schema, data log, read tail and registries bound together
//!
//! # Invariants
//!
//! - An offset is visible iff it is below the read tail
//! - Every read API bounds itself by `min(caller tail, current tail)`
//! - Index and filter registries only grow; ids are never reused, including
//!   across reopens of a durable table
//! - A durable table reopens at its persisted tail; bytes past it are dropped

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use crate::index::{IndexEntry, StorageOffset};
use crate::metadata::{CatalogEntry, MetadataWriter};
use crate::monitor::{Filter, Trigger};
use crate::observability::{log_event_with_fields, Event, MetricsRegistry};
use crate::registry::Registry;
use crate::schema::{ColumnDef, IndexState, Schema, SchemaBuilder, Value};
use crate::storage::{DataLog, ReadTail, StorageError, StorageMode};

use super::config::TableConfig;
use super::errors::{TableError, TableResult};
use super::record_ref::RecordRef;

/// File name of the persisted column list inside a table's data directory
pub const SCHEMA_FILE: &str = "schema.json";

/// A schema-typed, append-only table with online indexes and live filters.
pub struct Table {
    pub(super) config: TableConfig,
    pub(super) schema: Schema,
    pub(super) data_log: DataLog,
    pub(super) tail: ReadTail,
    pub(super) indexes: Registry<IndexEntry>,
    pub(super) filters: Registry<Filter>,
    pub(super) triggers: Registry<Trigger>,
    pub(super) catalog: MetadataWriter,
    pub(super) metrics: MetricsRegistry,
}

impl Table {
    /// Creates or reopens a table with the given columns.
    ///
    /// # Errors
    ///
    /// - TAIL_INVALID_CONFIG if `config` does not validate
    /// - TAIL_INVALID_SCHEMA if the columns are unusable
    /// - TAIL_SCHEMA_MISMATCH if a durable table was created with other columns
    /// - TAIL_STORAGE_FAILURE if the data directory cannot be opened or does
    ///   not verify
    pub fn new(columns: &[ColumnDef], config: TableConfig) -> TableResult<Self> {
        config.validate()?;
        let schema = Schema::new(columns).map_err(TableError::invalid_schema)?;

        match config.storage_mode {
            StorageMode::InMemory => {
                let data_log = DataLog::in_memory(config.log_capacity_bytes);
                let table = Self::assemble(
                    config,
                    schema,
                    data_log,
                    ReadTail::in_memory(),
                    MetadataWriter::in_memory(),
                );
                table.log_opened(Event::TableOpened);
                Ok(table)
            }
            StorageMode::Durable => Self::open_durable(config, schema),
        }
    }

    /// Creates a table from a schema builder.
    pub fn from_builder(builder: &SchemaBuilder, config: TableConfig) -> TableResult<Self> {
        Self::new(builder.columns(), config)
    }

    /// In-memory table with the default capacity.
    pub fn in_memory(columns: &[ColumnDef]) -> TableResult<Self> {
        Self::new(columns, TableConfig::in_memory())
    }

    fn assemble(
        config: TableConfig,
        schema: Schema,
        data_log: DataLog,
        tail: ReadTail,
        catalog: MetadataWriter,
    ) -> Self {
        let next = catalog.next_ids();
        Self {
            config,
            schema,
            data_log,
            tail,
            indexes: Registry::starting_at(next.index),
            filters: Registry::starting_at(next.filter),
            triggers: Registry::starting_at(next.trigger),
            catalog,
            metrics: MetricsRegistry::new(),
        }
    }

    fn open_durable(config: TableConfig, schema: Schema) -> TableResult<Self> {
        let dir = config.data_path().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| {
            StorageError::io_error(format!("Failed to create data directory: {}", dir.display()), e)
        })?;

        let existed = sync_schema_file(&dir, &schema)?;
        let tail = ReadTail::open(&dir)?;
        let mut data_log = DataLog::open(&dir, config.log_capacity_bytes)?;

        let committed = tail.get();
        let length = data_log.len();
        if length < committed {
            return Err(StorageError::data_corruption(format!(
                "Data log holds {} bytes, read tail is at {}",
                length, committed
            ))
            .into());
        }
        if committed % schema.record_size() as u64 != 0 {
            return Err(StorageError::corruption_at_offset(
                committed,
                format!("Read tail is not a multiple of the record size {}", schema.record_size()),
            )
            .into());
        }
        if length > committed {
            data_log.truncate(committed)?;
            log_event_with_fields(
                Event::RecoveryTruncated,
                &[
                    ("data_dir", &dir.display().to_string()),
                    ("dropped_bytes", &(length - committed).to_string()),
                    ("tail", &committed.to_string()),
                ],
            );
        }

        let catalog = MetadataWriter::open(&dir)?;
        let table = Self::assemble(config, schema, data_log, tail, catalog);
        table.log_opened(if existed {
            Event::TableRecovered
        } else {
            Event::TableOpened
        });
        Ok(table)
    }

    fn log_opened(&self, event: Event) {
        let mode = match self.config.storage_mode {
            StorageMode::InMemory => "in_memory",
            StorageMode::Durable => "durable",
        };
        log_event_with_fields(
            event,
            &[
                ("columns", &self.schema.len().to_string()),
                ("record_size", &self.schema.record_size().to_string()),
                ("storage_mode", mode),
                ("tail", &self.tail.get().to_string()),
            ],
        );
    }

    // ==================
    // Read path
    // ==================

    /// Current read tail in bytes. Every offset below it is committed.
    pub fn num_records(&self) -> u64 {
        self.tail.get()
    }

    /// Number of committed records
    pub fn record_count(&self) -> u64 {
        self.tail.get() / self.schema.record_size() as u64
    }

    /// Bytes per record
    pub fn record_size(&self) -> usize {
        self.schema.record_size()
    }

    /// Copies `buf.len()` bytes at `offset` into `buf` if the whole range lies
    /// below `tail`. Returns false, leaving `buf` untouched, otherwise.
    pub fn read(&self, offset: u64, buf: &mut [u8], tail: u64) -> bool {
        let bound = tail.min(self.tail.get());
        if !fits_below(offset, buf.len() as u64, bound) {
            return false;
        }
        self.data_log.read(offset, buf);
        true
    }

    /// `read` against the current tail.
    pub fn get(&self, offset: u64, buf: &mut [u8]) -> bool {
        self.read(offset, buf, self.tail.get())
    }

    /// The committed record starting at `offset`, if any.
    pub fn ptr(&self, offset: u64) -> Option<RecordRef<'_>> {
        self.ptr_at(offset, self.tail.get())
    }

    /// The record starting at `offset` if it lies below `tail`. Offsets that
    /// do not start a record are never visible.
    pub fn ptr_at(&self, offset: u64, tail: u64) -> Option<RecordRef<'_>> {
        let size = self.schema.record_size() as u64;
        let bound = tail.min(self.tail.get());
        if offset % size != 0 || !fits_below(offset, size, bound) {
            return None;
        }
        let bytes = self.data_log.slice(offset, size as usize);
        Some(RecordRef::new(offset, bytes, &self.schema))
    }

    /// Committed records starting at `from`, in offset order.
    pub fn scan(&self, from: u64) -> impl Iterator<Item = RecordRef<'_>> + '_ {
        let size = self.schema.record_size() as u64;
        let tail = self.tail.get();
        let start = from.div_ceil(size) * size;
        (start..tail)
            .step_by(size as usize)
            .filter_map(move |offset| self.ptr_at(offset, tail))
    }

    // ==================
    // Index lookups
    // ==================

    /// Committed offsets whose `field_name` value shares a bucket with `value`,
    /// using the column's current index.
    ///
    /// # Errors
    ///
    /// TAIL_FIELD_NOT_FOUND or TAIL_NO_INDEX.
    pub fn lookup(&self, field_name: &str, value: &Value) -> TableResult<Vec<StorageOffset>> {
        let index_id = self.current_index(field_name)?;
        self.lookup_index(index_id, value)
    }

    /// Committed offsets recorded by index `index_id` for `value`. Works for
    /// indexes that were removed from their column.
    pub fn lookup_index(&self, index_id: u32, value: &Value) -> TableResult<Vec<StorageOffset>> {
        let entry = self
            .index(index_id)
            .ok_or_else(|| TableError::unknown_index(index_id))?;
        Ok(entry.lookup(value, self.tail.get()))
    }

    /// Committed offsets whose bucket lies between the buckets of `min` and
    /// `max`, inclusive. A missing bound is open.
    pub fn lookup_range(
        &self,
        field_name: &str,
        min: Option<&Value>,
        max: Option<&Value>,
    ) -> TableResult<Vec<StorageOffset>> {
        let index_id = self.current_index(field_name)?;
        let entry = self
            .index(index_id)
            .ok_or_else(|| TableError::unknown_index(index_id))?;
        Ok(entry.lookup_range(min, max, self.tail.get()))
    }

    fn current_index(&self, field_name: &str) -> TableResult<u32> {
        let column = self
            .schema
            .column_by_name(field_name)
            .map_err(|_| TableError::field_not_found(field_name))?;
        match column.index_state() {
            IndexState::Indexed { index_id } => Ok(index_id),
            _ => Err(TableError::no_index(column.name())),
        }
    }

    // ==================
    // Accessors
    // ==================

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    pub fn metrics(&self) -> &MetricsRegistry {
        &self.metrics
    }

    /// Catalog entries registered so far, including those of earlier runs of
    /// a durable table.
    pub fn catalog(&self) -> Vec<CatalogEntry> {
        self.catalog.entries()
    }

    pub fn index(&self, index_id: u32) -> Option<&IndexEntry> {
        self.indexes.get(index_id as usize)
    }

    pub fn filter(&self, filter_id: u32) -> Option<&Filter> {
        self.filters.get(filter_id as usize)
    }

    pub fn trigger(&self, trigger_id: u32) -> Option<&Trigger> {
        self.triggers.get(trigger_id as usize)
    }

    pub fn index_count(&self) -> usize {
        self.indexes.len()
    }

    pub fn filter_count(&self) -> usize {
        self.filters.len()
    }

    pub fn trigger_count(&self) -> usize {
        self.triggers.len()
    }

    /// Whether an append failed after reserving its offset. A failed table
    /// still serves reads below its tail.
    pub fn is_failed(&self) -> bool {
        self.tail.is_failed()
    }
}

impl std::fmt::Debug for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Table")
            .field("storage_mode", &self.config.storage_mode)
            .field("columns", &self.schema.len())
            .field("tail", &self.tail.get())
            .field("indexes", &self.indexes.len())
            .field("filters", &self.filters.len())
            .field("triggers", &self.triggers.len())
            .finish()
    }
}

/// Whether `[offset, offset + length)` is non-empty and ends at or below `bound`.
fn fits_below(offset: u64, length: u64, bound: u64) -> bool {
    offset < bound
        && offset
            .checked_add(length)
            .is_some_and(|end| end <= bound)
}

/// Writes `schema.json` on first open, or checks it against `schema`.
/// Returns whether the file already existed.
fn sync_schema_file(dir: &Path, schema: &Schema) -> TableResult<bool> {
    let path = dir.join(SCHEMA_FILE);

    if path.exists() {
        let content = fs::read_to_string(&path)
            .map_err(|e| StorageError::read_failed("Failed to read schema file", e))?;
        let stored: Vec<ColumnDef> = serde_json::from_str(&content).map_err(|e| {
            StorageError::data_corruption(format!("Invalid schema file {}: {}", path.display(), e))
        })?;
        if !schema.matches(&stored) {
            return Err(TableError::schema_mismatch(format!(
                "Table at {} was created with different columns",
                dir.display()
            )));
        }
        return Ok(true);
    }

    let json = serde_json::to_vec_pretty(&schema.definitions())
        .map_err(|e| StorageError::data_corruption(format!("Failed to encode schema: {}", e)))?;
    let mut file = File::create(&path).map_err(|e| {
        StorageError::io_error(format!("Failed to create schema file: {}", path.display()), e)
    })?;
    file.write_all(&json)
        .and_then(|_| file.sync_all())
        .map_err(|e| StorageError::io_error("Failed to write schema file", e))?;
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::DataType;
    use crate::table::TableErrorCode;
    use tempfile::TempDir;

    fn columns() -> Vec<ColumnDef> {
        vec![
            ColumnDef::new("a", DataType::Int),
            ColumnDef::new("b", DataType::String(4)),
        ]
    }

    fn payload(a: i32, b: &str) -> Vec<u8> {
        let schema = Schema::new(&columns()).unwrap();
        schema
            .encode(&[Value::Int(a), Value::String(b.to_string())])
            .unwrap()
    }

    #[test]
    fn test_empty_table() {
        let table = Table::in_memory(&columns()).unwrap();
        assert_eq!(table.num_records(), 0);
        assert_eq!(table.record_size(), 8);
        assert!(table.ptr(0).is_none());
        assert!(!table.get(0, &mut [0u8; 8]));
    }

    #[test]
    fn test_invalid_schema_rejected() {
        let err = Table::in_memory(&[]).unwrap_err();
        assert_eq!(err.code(), TableErrorCode::TailInvalidSchema);
    }

    #[test]
    fn test_read_bounded_by_tail() {
        let table = Table::in_memory(&columns()).unwrap();
        let offset = table.append(&payload(1, "x")).unwrap();
        assert_eq!(offset, 0);

        let mut buf = [0u8; 8];
        assert!(table.read(0, &mut buf, 8));
        assert_eq!(buf.to_vec(), payload(1, "x"));

        // Caller tail below the record end
        assert!(!table.read(0, &mut buf, 4));
        // Caller tail above the real tail is clamped
        assert!(!table.read(8, &mut buf, 1024));
        // Partial read within the record
        let mut head = [0u8; 4];
        assert!(table.get(4, &mut head));
    }

    #[test]
    fn test_ptr_requires_record_start() {
        let table = Table::in_memory(&columns()).unwrap();
        table.append(&payload(1, "x")).unwrap();
        table.append(&payload(2, "y")).unwrap();

        assert!(table.ptr(4).is_none());
        let second = table.ptr(8).unwrap();
        assert_eq!(second.value("A"), Some(Value::Int(2)));
        assert!(table.ptr_at(8, 8).is_none());
    }

    #[test]
    fn test_scan_yields_committed_records() {
        let table = Table::in_memory(&columns()).unwrap();
        for i in 0..5 {
            table.append(&payload(i, "s")).unwrap();
        }
        let offsets: Vec<u64> = table.scan(0).map(|r| r.offset()).collect();
        assert_eq!(offsets, vec![0, 8, 16, 24, 32]);
        assert_eq!(table.scan(9).count(), 3);
    }

    #[test]
    fn test_durable_reopen_restores_tail() {
        let dir = TempDir::new().unwrap();
        {
            let table = Table::new(&columns(), TableConfig::durable(dir.path())).unwrap();
            table.append(&payload(7, "abc")).unwrap();
            table.append(&payload(8, "def")).unwrap();
        }

        let table = Table::new(&columns(), TableConfig::durable(dir.path())).unwrap();
        assert_eq!(table.num_records(), 16);
        assert_eq!(table.ptr(8).unwrap().value("b"), Some(Value::String("def".into())));
        assert_eq!(table.append(&payload(9, "ghi")).unwrap(), 16);
    }

    #[test]
    fn test_durable_schema_mismatch() {
        let dir = TempDir::new().unwrap();
        Table::new(&columns(), TableConfig::durable(dir.path())).unwrap();

        let other = vec![ColumnDef::new("a", DataType::Long)];
        let err = Table::new(&other, TableConfig::durable(dir.path())).unwrap_err();
        assert_eq!(err.code(), TableErrorCode::TailSchemaMismatch);
    }

    #[test]
    fn test_schema_match_ignores_case() {
        let dir = TempDir::new().unwrap();
        Table::new(&columns(), TableConfig::durable(dir.path())).unwrap();

        let upper = vec![
            ColumnDef::new("A", DataType::Int),
            ColumnDef::new("B", DataType::String(4)),
        ];
        assert!(Table::new(&upper, TableConfig::durable(dir.path())).is_ok());
    }

    #[test]
    fn test_reopen_truncates_uncommitted_bytes() {
        let dir = TempDir::new().unwrap();
        {
            let table = Table::new(&columns(), TableConfig::durable(dir.path())).unwrap();
            table.append(&payload(1, "a")).unwrap();
        }

        // Bytes flushed by an append that never advanced the tail
        let log_path = dir.path().join(crate::storage::DATA_LOG_FILE);
        let mut file = fs::OpenOptions::new().append(true).open(&log_path).unwrap();
        file.write_all(&payload(2, "b")).unwrap();
        drop(file);

        let table = Table::new(&columns(), TableConfig::durable(dir.path())).unwrap();
        assert_eq!(table.num_records(), 8);
        assert_eq!(fs::metadata(&log_path).unwrap().len(), 8);
        assert_eq!(table.append(&payload(3, "c")).unwrap(), 8);
    }

    #[test]
    fn test_reopen_rejects_short_log() {
        let dir = TempDir::new().unwrap();
        {
            let table = Table::new(&columns(), TableConfig::durable(dir.path())).unwrap();
            table.append(&payload(1, "a")).unwrap();
        }
        let log_path = dir.path().join(crate::storage::DATA_LOG_FILE);
        fs::OpenOptions::new()
            .write(true)
            .open(&log_path)
            .unwrap()
            .set_len(4)
            .unwrap();

        let err = Table::new(&columns(), TableConfig::durable(dir.path())).unwrap_err();
        assert_eq!(err.code(), TableErrorCode::TailStorageFailure);
        assert!(err.is_fatal());
    }

    #[test]
    fn test_fits_below() {
        assert!(fits_below(0, 8, 8));
        assert!(!fits_below(0, 9, 8));
        assert!(!fits_below(8, 0, 8));
        assert!(!fits_below(u64::MAX, 2, u64::MAX));
    }
}
