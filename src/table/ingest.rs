//! Append path
//!
//! ```text
//!   validate + materialize + derive keys      (no offset consumed on error)
//!   data_log.append        -> offset
//!   data_log.flush         -+
//!   wait for tail == offset |
//!   persist tail           -+-> on error: table failed, FATAL
//!   filters.update         (registration order)
//!   indexes.insert         (ids sampled at materialize)
//!   tail = offset + length (Release)
//! ```
//!
//! Filters and indexes are updated while the append holds its turn at the
//! tail, so filters see records exactly once and in offset order, and never
//! see a record whose append failed. Nothing on this path takes a
//! table-wide lock or logs on success. Every failure after the offset is
//! reserved is fatal: the tail stops at that offset, so later appends could
//! never become visible.

use crate::observability::{log_event_with_fields, Event};
use crate::schema::{Record, Value};
use crate::storage::StorageError;

use super::engine::Table;
use super::errors::{TableError, TableResult};

impl Table {
    /// Appends one record stamped with the current time. Returns its offset.
    pub fn append(&self, payload: &[u8]) -> TableResult<u64> {
        self.append_at(payload, now_nanos())
    }

    /// Appends one record with an explicit timestamp in nanoseconds.
    ///
    /// # Errors
    ///
    /// - TAIL_TABLE_FAILED if an earlier append failed
    /// - TAIL_INVALID_RECORD if the payload is not exactly one record
    /// - TAIL_STORAGE_FAILURE with TAIL_LOG_FULL details if the log is full;
    ///   the table stays usable
    /// - TAIL_STORAGE_FAILURE (FATAL) if the flush or the tail advance fails
    pub fn append_at(&self, payload: &[u8], timestamp: u64) -> TableResult<u64> {
        if self.tail.is_failed() {
            return Err(TableError::table_failed());
        }

        let mut record = self
            .schema
            .materialize(payload, timestamp)
            .map_err(TableError::invalid_record)?;
        self.derive_keys(&mut record);

        let offset = self.data_log.append(payload)?;
        record.set_offset(offset);
        let length = payload.len() as u64;

        if let Err(err) = self
            .data_log
            .flush(offset, length)
            .and_then(|_| self.tail.advance_with(offset, length, || self.apply(&record)))
        {
            return Err(self.fail_append(offset, err));
        }

        self.metrics.record_append(length);
        Ok(offset)
    }

    /// Encodes `values` in column order and appends them.
    pub fn append_values(&self, values: &[Value]) -> TableResult<u64> {
        let payload = self.schema.encode(values).map_err(TableError::invalid_record)?;
        self.append(&payload)
    }

    /// Appends a JSON object keyed by column name.
    pub fn append_json(
        &self,
        object: &serde_json::Map<String, serde_json::Value>,
        timestamp: Option<u64>,
    ) -> TableResult<u64> {
        let payload = self
            .schema
            .encode_json(object)
            .map_err(TableError::invalid_record)?;
        self.append_at(&payload, timestamp.unwrap_or_else(now_nanos))
    }

    /// Keys are derived before the offset exists so that nothing after the
    /// reservation can fail on bad data.
    fn derive_keys(&self, record: &mut Record) {
        for field in record.fields_mut() {
            let Some(index_id) = field.index_id() else {
                continue;
            };
            let key = self
                .indexes
                .get(index_id as usize)
                .and_then(|entry| entry.key_for(field.value()));
            if let Some(key) = key {
                field.set_key(key);
            }
        }
    }

    fn apply(&self, record: &Record) {
        let mut updates = 0;
        let mut matches = 0;
        for filter in self.filters.iter() {
            updates += 1;
            if filter.update(record) {
                matches += 1;
            }
        }

        let mut inserts = 0;
        for field in record.fields() {
            let (Some(index_id), Some(key)) = (field.index_id(), field.key()) else {
                continue;
            };
            if let Some(entry) = self.indexes.get(index_id as usize) {
                entry.insert(key.clone(), record.offset());
                inserts += 1;
            }
        }

        if updates > 0 {
            self.metrics.add_filter_updates(updates, matches);
        }
        if inserts > 0 {
            self.metrics.add_index_inserts(inserts);
        }
    }

    fn fail_append(&self, offset: u64, err: StorageError) -> TableError {
        self.tail.fail();
        self.metrics.increment_append_failures();
        log_event_with_fields(
            Event::AppendFailed,
            &[
                ("code", err.code().code()),
                ("error", err.message()),
                ("offset", &offset.to_string()),
            ],
        );
        TableError::storage(err)
    }
}

/// Current UTC time in nanoseconds since the epoch
fn now_nanos() -> u64 {
    chrono::Utc::now()
        .timestamp_nanos_opt()
        .and_then(|nanos| u64::try_from(nanos).ok())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use crate::expression::RelOp;
    use crate::monitor::Aggregate;
    use crate::schema::{ColumnDef, DataType, Value};
    use crate::storage::StorageErrorCode;
    use crate::table::{Table, TableConfig, TableErrorCode};

    fn table() -> Table {
        Table::in_memory(&[
            ColumnDef::new("a", DataType::Int),
            ColumnDef::new("b", DataType::String(4)),
        ])
        .unwrap()
    }

    #[test]
    fn test_offsets_are_contiguous() {
        let table = table();
        for i in 0..4 {
            let offset = table
                .append_values(&[Value::Int(i), Value::String("x".into())])
                .unwrap();
            assert_eq!(offset, i as u64 * 8);
        }
        assert_eq!(table.num_records(), 32);
        assert_eq!(table.record_count(), 4);
        assert_eq!(table.metrics().snapshot().bytes_appended, 32);
    }

    #[test]
    fn test_wrong_length_consumes_no_offset() {
        let table = table();
        let err = table.append(&[0u8; 7]).unwrap_err();
        assert_eq!(err.code(), TableErrorCode::TailInvalidRecord);
        assert_eq!(err.details(), Some("TAIL_RECORD_LENGTH_MISMATCH"));
        assert_eq!(table.num_records(), 0);
        assert_eq!(table.append(&[0u8; 8]).unwrap(), 0);
    }

    #[test]
    fn test_log_full_is_not_fatal() {
        let columns = [ColumnDef::new("a", DataType::Long)];
        let table = Table::new(&columns, TableConfig::in_memory().with_capacity(16)).unwrap();
        table.append(&[1u8; 8]).unwrap();
        table.append(&[2u8; 8]).unwrap();

        let err = table.append(&[3u8; 8]).unwrap_err();
        assert_eq!(err.code(), TableErrorCode::TailStorageFailure);
        assert_eq!(err.details(), Some(StorageErrorCode::TailLogFull.code()));
        assert!(!err.is_fatal());
        assert!(!table.is_failed());
        assert_eq!(table.num_records(), 16);
    }

    #[test]
    fn test_append_json() {
        let table = table();
        let object = serde_json::json!({"a": 5, "B": "hi"});
        let offset = table
            .append_json(object.as_object().unwrap(), Some(1_000_000))
            .unwrap();
        let record = table.ptr(offset).unwrap();
        assert_eq!(record.value("a"), Some(Value::Int(5)));
        assert_eq!(record.value("b"), Some(Value::String("hi".into())));
    }

    #[test]
    fn test_failed_table_rejects_appends() {
        let table = table();
        table.tail.fail();
        let err = table.append(&[0u8; 8]).unwrap_err();
        assert_eq!(err.code(), TableErrorCode::TailTableFailed);
        assert!(err.is_fatal());
    }

    #[test]
    fn test_uncommitted_append_never_reaches_filters() {
        let table = Arc::new(table());
        let filter_id = table.add_filter("a >= 0", 1_000).unwrap();
        table
            .add_trigger(filter_id, "a", Aggregate::Count, RelOp::Ge, 1.0)
            .unwrap();

        // Offset 0 is reserved but never committed, holding the next append back.
        assert_eq!(table.data_log.append(&[0u8; 8]).unwrap(), 0);
        let appender = {
            let table = Arc::clone(&table);
            thread::spawn(move || table.append_values(&[Value::Int(1), Value::String("x".into())]))
        };

        thread::sleep(Duration::from_millis(20));
        assert!(table.evaluate_triggers(0, u64::MAX).is_empty());
        assert_eq!(table.filter(filter_id).unwrap().records_seen(), 0);

        table.tail.fail();
        let err = appender.join().unwrap().unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(err.details(), Some(StorageErrorCode::TailAppendStalled.code()));

        let filter = table.filter(filter_id).unwrap();
        assert_eq!(filter.records_seen(), 0);
        assert!(filter.windows_between(0, u64::MAX).is_empty());
        assert!(table.evaluate_triggers(0, u64::MAX).is_empty());
        assert_eq!(table.num_records(), 0);
    }

    #[test]
    fn test_now_nanos_is_recent() {
        // 2020-01-01T00:00:00Z
        assert!(super::now_nanos() > 1_577_836_800_000_000_000);
    }
}
