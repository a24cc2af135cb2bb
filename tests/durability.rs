//! Durability Tests
//!
//! - Committed records survive reopen
//! - Bytes past the persisted tail are dropped on reopen
//! - Corrupted tail or catalog files fail the open
//! - The catalog lists registrations across runs

use std::fs;

use tailstore::expression::RelOp;
use tailstore::metadata::{CatalogEntry, MetadataReader, METADATA_FILE};
use tailstore::monitor::Aggregate;
use tailstore::schema::{ColumnDef, DataType, SchemaBuilder, Value};
use tailstore::storage::{DATA_LOG_FILE, READ_TAIL_FILE};
use tailstore::{Table, TableConfig, TableErrorCode};
use tempfile::TempDir;

// =============================================================================
// Test Utilities
// =============================================================================

fn builder() -> SchemaBuilder {
    SchemaBuilder::new()
        .add_column("sensor", DataType::String(6))
        .add_column("reading", DataType::Double)
}

fn open(dir: &TempDir) -> Table {
    Table::from_builder(&builder(), TableConfig::durable(dir.path())).unwrap()
}

fn append(table: &Table, sensor: &str, reading: f64) -> u64 {
    table
        .append_values(&[Value::String(sensor.to_string()), Value::Double(reading)])
        .unwrap()
}

// =============================================================================
// Reopen
// =============================================================================

/// Every acknowledged append is readable after reopen.
#[test]
fn test_committed_records_survive() {
    let dir = TempDir::new().unwrap();
    let offsets: Vec<u64> = {
        let table = open(&dir);
        (0..20).map(|i| append(&table, "t1", i as f64)).collect()
    };

    let table = open(&dir);
    assert_eq!(table.num_records(), 20 * 14);
    for (i, offset) in offsets.into_iter().enumerate() {
        let record = table.ptr(offset).expect("committed record lost");
        assert_eq!(record.value("reading"), Some(Value::Double(i as f64)));
    }
}

/// Indexes are not rebuilt on reopen; a new index covers new appends only.
#[test]
fn test_indexes_not_replayed() {
    let dir = TempDir::new().unwrap();
    {
        let table = open(&dir);
        table.add_index("sensor", 1.0).unwrap();
        append(&table, "t1", 1.0);
    }

    let table = open(&dir);
    let err = table.lookup("sensor", &Value::String("t1".into())).unwrap_err();
    assert_eq!(err.code(), TableErrorCode::TailNoIndex);

    table.add_index("sensor", 1.0).unwrap();
    let fresh = append(&table, "t1", 2.0);
    assert_eq!(
        table.lookup("sensor", &Value::String("t1".into())).unwrap(),
        vec![fresh]
    );
}

/// A partial record past the tail is dropped and its offset reused.
#[test]
fn test_partial_tail_dropped() {
    let dir = TempDir::new().unwrap();
    {
        let table = open(&dir);
        append(&table, "t1", 1.0);
    }
    let log = dir.path().join(DATA_LOG_FILE);
    let mut bytes = fs::read(&log).unwrap();
    bytes.extend_from_slice(&[0xAB; 5]);
    fs::write(&log, bytes).unwrap();

    let table = open(&dir);
    assert_eq!(table.num_records(), 14);
    assert_eq!(append(&table, "t2", 2.0), 14);
}

// =============================================================================
// Corruption
// =============================================================================

/// A tail file with a bad checksum fails the open.
#[test]
fn test_corrupt_tail_rejected() {
    let dir = TempDir::new().unwrap();
    {
        let table = open(&dir);
        append(&table, "t1", 1.0);
    }
    let path = dir.path().join(READ_TAIL_FILE);
    let mut bytes = fs::read(&path).unwrap();
    bytes[0] ^= 0xFF;
    fs::write(&path, bytes).unwrap();

    let err = Table::from_builder(&builder(), TableConfig::durable(dir.path())).unwrap_err();
    assert_eq!(err.code(), TableErrorCode::TailStorageFailure);
    assert!(err.to_string().contains("TAIL_DATA_CORRUPTION"));
}

/// A damaged catalog frame fails the open instead of being skipped.
#[test]
fn test_corrupt_catalog_rejected() {
    let dir = TempDir::new().unwrap();
    {
        let table = open(&dir);
        table.add_filter("reading > 1", 1_000).unwrap();
    }
    let path = dir.path().join(METADATA_FILE);
    let mut bytes = fs::read(&path).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xFF;
    fs::write(&path, bytes).unwrap();

    let err = Table::from_builder(&builder(), TableConfig::durable(dir.path())).unwrap_err();
    assert!(err.is_fatal());
}

/// Reopening with different columns is refused.
#[test]
fn test_schema_mismatch() {
    let dir = TempDir::new().unwrap();
    open(&dir);

    let other = [ColumnDef::new("sensor", DataType::String(7))];
    let err = Table::new(&other, TableConfig::durable(dir.path())).unwrap_err();
    assert_eq!(err.code(), TableErrorCode::TailSchemaMismatch);
}

// =============================================================================
// Catalog
// =============================================================================

/// Registrations from every run are listed in order.
#[test]
fn test_catalog_accumulates() {
    let dir = TempDir::new().unwrap();
    {
        let table = open(&dir);
        table.add_index("reading", 0.5).unwrap();
        let filter = table.add_filter("sensor == 'hot'", 5_000).unwrap();
        table
            .add_trigger(filter, "reading", Aggregate::Max, RelOp::Gt, 90.0)
            .unwrap();
    }
    {
        let table = open(&dir);
        assert_eq!(table.catalog().len(), 3);
        table.add_index("sensor", 1.0).unwrap();
    }

    let entries = MetadataReader::read_all(&dir.path().join(METADATA_FILE)).unwrap();
    assert_eq!(entries.len(), 4);
    assert_eq!(
        entries[0],
        CatalogEntry::Index {
            index_id: 0,
            field_name: "READING".to_string(),
            bucket_size: 0.5,
        }
    );
    assert_eq!(
        entries[1],
        CatalogEntry::Filter {
            filter_id: 0,
            expression: "sensor == 'hot'".to_string(),
            window_ms: 5_000,
        }
    );
    assert!(matches!(entries[2], CatalogEntry::Trigger { threshold, .. } if threshold == 90.0));
    assert_eq!(
        entries[3],
        CatalogEntry::Index {
            index_id: 1,
            field_name: "SENSOR".to_string(),
            bucket_size: 1.0,
        }
    );
}

/// A reopened table hands out ids past those recorded by earlier runs.
#[test]
fn test_ids_not_reused_after_reopen() {
    let dir = TempDir::new().unwrap();
    {
        let table = open(&dir);
        assert_eq!(table.add_index("sensor", 1.0).unwrap(), 0);
        assert_eq!(table.add_filter("reading > 1", 1_000).unwrap(), 0);
        assert_eq!(table.add_filter("reading > 2", 1_000).unwrap(), 1);
    }

    let table = open(&dir);
    let index_id = table.add_index("reading", 1.0).unwrap();
    let filter_id = table.add_filter("reading > 3", 1_000).unwrap();
    let trigger_id = table
        .add_trigger(filter_id, "reading", Aggregate::Count, RelOp::Ge, 1.0)
        .unwrap();
    assert_eq!((index_id, filter_id, trigger_id), (1, 2, 0));

    assert!(table.index(0).is_none());
    assert!(table.filter(1).is_none());
    assert_eq!(table.index(1).unwrap().offset_count(), 0);
    assert_eq!(table.index_count(), 1);

    let offset = append(&table, "t1", 7.0);
    assert_eq!(table.lookup_index(1, &Value::Double(7.0)).unwrap(), vec![offset]);
    assert_eq!(table.filter(2).unwrap().records_matched(), 1);

    let mut index_ids: Vec<u32> = table
        .catalog()
        .iter()
        .filter_map(|entry| match entry {
            CatalogEntry::Index { index_id, .. } => Some(*index_id),
            _ => None,
        })
        .collect();
    index_ids.dedup();
    assert_eq!(index_ids, vec![0, 1]);
}
