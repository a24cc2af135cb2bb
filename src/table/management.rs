//! Index, filter and trigger registration on a live table
//!
//! # Index lifecycle
//!
//! ```text
//!   add_index:    UNINDEXED -> INDEXING -> (entry pushed) -> INDEXED(id)
//!                     unsupported type or full registry: back to UNINDEXED
//!   remove_index: INDEXING | INDEXED -> UNINDEXED
//! ```
//!
//! An index covers exactly the appends that materialize after INDEXED is
//! published. Entries are never dropped: a removed index stays queryable
//! through `lookup_index`, and appends already in flight when it was removed
//! still land in it.
//!
//! Rejected requests change nothing and are logged at WARN. Catalog write
//! failures are logged at ERROR; the registration itself stands.

use crate::expression::{compile, RelOp};
use crate::index::{IndexEntry, IndexKind};
use crate::monitor::{Aggregate, Alert, Filter, Trigger, WindowAggregate};
use crate::observability::{log_event_with_fields, Event};
use crate::storage::StorageError;

use super::engine::Table;
use super::errors::{TableError, TableResult};

impl Table {
    /// Attaches a new index to `field_name`. Returns the index id.
    ///
    /// `bucket_size` groups numeric values: integers by
    /// `value.div_euclid(bucket)`, floats by `floor(value / bucket)`. It is
    /// ignored for bool, char and string columns but must still be positive.
    ///
    /// # Errors
    ///
    /// - TAIL_INVALID_BUCKET_SIZE if `bucket_size` is not positive and finite
    /// - TAIL_FIELD_NOT_FOUND if no column has that name
    /// - TAIL_ALREADY_INDEXED if the column is INDEXING or INDEXED
    /// - TAIL_UNSUPPORTED_INDEX_TYPE for binary columns
    /// - TAIL_INDEXING_INTERRUPTED if `remove_index` ran on the column while
    ///   the index was being attached
    pub fn add_index(&self, field_name: &str, bucket_size: f64) -> TableResult<u32> {
        if !(bucket_size.is_finite() && bucket_size > 0.0) {
            return Err(reject(
                Event::IndexRejected,
                field_name,
                TableError::invalid_bucket_size(bucket_size),
            ));
        }

        let position = self.schema.resolve(field_name).ok_or_else(|| {
            reject(Event::IndexRejected, field_name, TableError::field_not_found(field_name))
        })?;
        let column = &self.schema.columns()[position];

        if !column.set_indexing() {
            return Err(reject(
                Event::IndexRejected,
                field_name,
                TableError::already_indexed(column.name()),
            ));
        }

        let data_type = column.data_type();
        let Some(kind) = IndexKind::for_type(&data_type) else {
            column.set_unindexed();
            return Err(reject(
                Event::IndexRejected,
                field_name,
                TableError::unsupported_index_type(column.name(), &data_type),
            ));
        };

        let pushed = self.indexes.push_with(|id| {
            IndexEntry::new(id as u32, position, column.name(), data_type, kind, bucket_size)
        });
        let Some(index_id) = pushed.map(|id| id as u32) else {
            column.set_unindexed();
            return Err(reject(
                Event::IndexRejected,
                field_name,
                TableError::registry_full("index"),
            ));
        };

        if !column.set_indexed(index_id) {
            return Err(reject(
                Event::IndexRejected,
                field_name,
                TableError::indexing_interrupted(column.name(), index_id),
            ));
        }

        if let Err(err) = self.catalog.write_index_info(index_id, column.name(), bucket_size) {
            catalog_write_failed("index", index_id, err);
        }
        self.metrics.increment_indexes_added();
        log_event_with_fields(
            Event::IndexAdded,
            &[
                ("bucket_size", &bucket_size.to_string()),
                ("field", column.name()),
                ("index_id", &index_id.to_string()),
                ("kind", &kind.to_string()),
            ],
        );
        Ok(index_id)
    }

    /// Detaches the index from `field_name`. Appends that materialize
    /// afterwards are not indexed.
    ///
    /// # Errors
    ///
    /// TAIL_FIELD_NOT_FOUND, or TAIL_NO_INDEX if the column is UNINDEXED.
    pub fn remove_index(&self, field_name: &str) -> TableResult<()> {
        let column = self.schema.column_by_name(field_name).map_err(|_| {
            reject(Event::IndexRejected, field_name, TableError::field_not_found(field_name))
        })?;

        let previous = column.index_state();
        if !column.disable_indexing() {
            return Err(reject(
                Event::IndexRejected,
                field_name,
                TableError::no_index(column.name()),
            ));
        }

        self.metrics.increment_indexes_removed();
        let index_id = previous
            .index_id()
            .map(|id| id.to_string())
            .unwrap_or_else(|| "none".to_string());
        log_event_with_fields(
            Event::IndexRemoved,
            &[("field", column.name()), ("index_id", &index_id)],
        );
        Ok(())
    }

    /// Compiles `expression` and registers a filter over windows of
    /// `window_ms`. Returns the filter id.
    ///
    /// # Errors
    ///
    /// - TAIL_INVALID_WINDOW if `window_ms` is zero
    /// - TAIL_COMPILATION_FAILED on a syntax or type error; nothing is
    ///   registered
    pub fn add_filter(&self, expression: &str, window_ms: u64) -> TableResult<u32> {
        if window_ms == 0 {
            return Err(reject(
                Event::FilterRejected,
                expression,
                TableError::invalid_window(window_ms),
            ));
        }

        let predicate = compile(expression, &self.schema).map_err(|err| {
            reject(
                Event::FilterRejected,
                expression,
                TableError::compilation_failed(expression, err),
            )
        })?;

        let filter_id = self
            .filters
            .push_with(|id| Filter::new(id as u32, predicate, window_ms))
            .map(|id| id as u32)
            .ok_or_else(|| {
                reject(Event::FilterRejected, expression, TableError::registry_full("filter"))
            })?;

        if let Err(err) = self.catalog.write_filter_info(filter_id, expression, window_ms) {
            catalog_write_failed("filter", filter_id, err);
        }
        self.metrics.increment_filters_added();
        log_event_with_fields(
            Event::FilterAdded,
            &[
                ("expression", expression),
                ("filter_id", &filter_id.to_string()),
                ("window_ms", &window_ms.to_string()),
            ],
        );
        Ok(filter_id)
    }

    /// Registers a threshold trigger on a filter's windows. Returns the
    /// trigger id.
    ///
    /// `filter_id` is not checked; a trigger on an unknown filter never
    /// fires. `count` accepts any field name. `sum`, `min` and `max` need a
    /// numeric column.
    ///
    /// # Errors
    ///
    /// - TAIL_INVALID_TRIGGER if `threshold` is not finite or the column is
    ///   not numeric
    /// - TAIL_FIELD_NOT_FOUND if an aggregate other than count names an
    ///   unknown column
    pub fn add_trigger(
        &self,
        filter_id: u32,
        field_name: &str,
        aggregate: Aggregate,
        op: RelOp,
        threshold: f64,
    ) -> TableResult<u32> {
        if !threshold.is_finite() {
            return Err(reject(
                Event::TriggerRejected,
                field_name,
                TableError::invalid_trigger(format!("Threshold {} is not finite", threshold)),
            ));
        }

        let column = if aggregate.needs_column() {
            let column = self.schema.column_by_name(field_name).map_err(|_| {
                reject(Event::TriggerRejected, field_name, TableError::field_not_found(field_name))
            })?;
            if !column.data_type().is_numeric() {
                return Err(reject(
                    Event::TriggerRejected,
                    field_name,
                    TableError::invalid_trigger(format!(
                        "{} needs a numeric column, {} is {}",
                        aggregate,
                        column.name(),
                        column.data_type()
                    )),
                ));
            }
            Some(column.position())
        } else {
            self.schema.resolve(field_name)
        };

        let trigger_id = self
            .triggers
            .push_with(|id| {
                Trigger::new(id as u32, filter_id, field_name, column, aggregate, op, threshold)
            })
            .map(|id| id as u32)
            .ok_or_else(|| {
                reject(Event::TriggerRejected, field_name, TableError::registry_full("trigger"))
            })?;

        if let Err(err) = self.catalog.write_trigger_info(
            trigger_id,
            filter_id,
            field_name,
            aggregate,
            op,
            threshold,
        ) {
            catalog_write_failed("trigger", trigger_id, err);
        }
        self.metrics.increment_triggers_added();
        log_event_with_fields(
            Event::TriggerAdded,
            &[
                ("aggregate", aggregate.name()),
                ("field", field_name),
                ("filter_id", &filter_id.to_string()),
                ("op", op.symbol()),
                ("threshold", &threshold.to_string()),
                ("trigger_id", &trigger_id.to_string()),
            ],
        );
        Ok(trigger_id)
    }

    /// Checks every trigger against its filter's windows overlapping
    /// `[from_ms, to_ms)` and returns the alerts whose condition holds,
    /// ordered by trigger id then window start.
    ///
    /// Every record an alert counts is committed by the time this returns.
    pub fn evaluate_triggers(&self, from_ms: u64, to_ms: u64) -> Vec<Alert> {
        let mut alerts = Vec::new();

        for trigger in self.triggers.iter() {
            let Some(filter) = self.filter(trigger.filter_id()) else {
                continue;
            };
            let windows = filter.windows_between(from_ms, to_ms);
            if !self.committed_through(&windows) {
                continue;
            }
            for window in windows {
                if let Some(alert) = trigger.evaluate(&window) {
                    log_event_with_fields(
                        Event::AlertFired,
                        &[
                            ("filter_id", &alert.filter_id.to_string()),
                            ("trigger_id", &alert.trigger_id.to_string()),
                            ("value", &alert.value.to_string()),
                            ("window_start_ms", &alert.window_start_ms.to_string()),
                        ],
                    );
                    alerts.push(alert);
                }
            }
        }

        self.metrics.add_alerts_fired(alerts.len() as u64);
        alerts
    }

    /// Waits out the tail store of a record still publishing into `windows`.
    /// False if the table failed first.
    fn committed_through(&self, windows: &[WindowAggregate]) -> bool {
        let last = windows.iter().filter_map(WindowAggregate::last_offset).max();
        match last {
            Some(offset) => self.tail.wait_for(offset + self.record_size() as u64),
            None => true,
        }
    }
}

fn reject(event: Event, subject: &str, err: TableError) -> TableError {
    log_event_with_fields(
        event,
        &[
            ("code", err.code().code()),
            ("error", err.message()),
            ("subject", subject),
        ],
    );
    err
}

fn catalog_write_failed(kind: &str, id: u32, err: StorageError) {
    log_event_with_fields(
        Event::CatalogWriteFailed,
        &[
            ("error", &err.to_string()),
            ("id", &id.to_string()),
            ("kind", kind),
        ],
    );
}

#[cfg(test)]
mod tests {
    use crate::expression::RelOp;
    use crate::monitor::Aggregate;
    use crate::schema::{ColumnDef, DataType, IndexState, Value};
    use crate::table::{Table, TableErrorCode};

    fn table() -> Table {
        Table::in_memory(&[
            ColumnDef::new("a", DataType::Int),
            ColumnDef::new("b", DataType::String(4)),
            ColumnDef::new("blob", DataType::Binary(2)),
            ColumnDef::new("flag", DataType::Bool),
        ])
        .unwrap()
    }

    fn append(table: &Table, a: i32, b: &str, ts_ms: u64) -> u64 {
        let payload = table
            .schema()
            .encode(&[
                Value::Int(a),
                Value::String(b.into()),
                Value::Binary(vec![0, 0]),
                Value::Bool(a % 2 == 0),
            ])
            .unwrap();
        table.append_at(&payload, ts_ms * 1_000_000).unwrap()
    }

    #[test]
    fn test_add_index_assigns_monotonic_ids() {
        let table = table();
        assert_eq!(table.add_index("a", 1.0).unwrap(), 0);
        assert_eq!(table.add_index("B", 1.0).unwrap(), 1);
        assert_eq!(table.add_index("flag", 1.0).unwrap(), 2);
        assert_eq!(
            table.schema().column(0).unwrap().index_state(),
            IndexState::Indexed { index_id: 0 }
        );
        assert_eq!(table.catalog().len(), 3);
    }

    #[test]
    fn test_re_add_is_rejected_without_change() {
        let table = table();
        let id = table.add_index("a", 1.0).unwrap();
        let err = table.add_index("A", 5.0).unwrap_err();
        assert_eq!(err.code(), TableErrorCode::TailAlreadyIndexed);
        assert!(err.is_management());
        assert_eq!(table.schema().column(0).unwrap().index_id(), Some(id));
        assert_eq!(table.index_count(), 1);
    }

    #[test]
    fn test_unsupported_type_rolls_back() {
        let table = table();
        let err = table.add_index("blob", 1.0).unwrap_err();
        assert_eq!(err.code(), TableErrorCode::TailUnsupportedIndexType);
        assert_eq!(
            table.schema().column(2).unwrap().index_state(),
            IndexState::Unindexed
        );
        assert_eq!(table.index_count(), 0);
        assert!(table.catalog().is_empty());
    }

    #[test]
    fn test_unknown_field_and_bad_bucket() {
        let table = table();
        assert_eq!(
            table.add_index("nope", 1.0).unwrap_err().code(),
            TableErrorCode::TailFieldNotFound
        );
        assert_eq!(
            table.add_index("a", 0.0).unwrap_err().code(),
            TableErrorCode::TailInvalidBucketSize
        );
        assert_eq!(
            table.add_index("a", f64::NAN).unwrap_err().code(),
            TableErrorCode::TailInvalidBucketSize
        );
        assert_eq!(table.schema().column(0).unwrap().index_state(), IndexState::Unindexed);
    }

    #[test]
    fn test_remove_index_keeps_entry_queryable() {
        let table = table();
        let id = table.add_index("a", 1.0).unwrap();
        let first = append(&table, 3, "x", 0);

        table.remove_index("a").unwrap();
        let second = append(&table, 3, "y", 0);

        assert_eq!(table.lookup_index(id, &Value::Int(3)).unwrap(), vec![first]);
        assert_ne!(first, second);
        assert_eq!(
            table.lookup("a", &Value::Int(3)).unwrap_err().code(),
            TableErrorCode::TailNoIndex
        );
        assert_eq!(
            table.remove_index("a").unwrap_err().code(),
            TableErrorCode::TailNoIndex
        );
    }

    #[test]
    fn test_index_after_removal_gets_new_id() {
        let table = table();
        let first = table.add_index("a", 1.0).unwrap();
        table.remove_index("a").unwrap();
        let second = table.add_index("a", 10.0).unwrap();
        assert!(second > first);
        assert_eq!(table.index(second).unwrap().bucket_size(), 10.0);
    }

    #[test]
    fn test_bucketed_lookup() {
        let table = table();
        table.add_index("a", 10.0).unwrap();
        let low = append(&table, 3, "x", 0);
        let also_low = append(&table, 9, "x", 0);
        let high = append(&table, 12, "x", 0);

        assert_eq!(table.lookup("a", &Value::Int(5)).unwrap(), vec![low, also_low]);
        assert_eq!(
            table
                .lookup_range("a", Some(&Value::Int(10)), None)
                .unwrap(),
            vec![high]
        );
    }

    #[test]
    fn test_add_filter_rejects_bad_input() {
        let table = table();
        let err = table.add_filter("a >", 1000).unwrap_err();
        assert_eq!(err.code(), TableErrorCode::TailCompilationFailed);

        let err = table.add_filter("b > 3", 1000).unwrap_err();
        assert_eq!(err.code(), TableErrorCode::TailCompilationFailed);

        let err = table.add_filter("a > 1", 0).unwrap_err();
        assert_eq!(err.code(), TableErrorCode::TailInvalidWindow);

        assert_eq!(table.filter_count(), 0);
        assert!(table.catalog().is_empty());
    }

    #[test]
    fn test_filter_sees_only_later_appends() {
        let table = table();
        append(&table, 5, "early", 0);
        let id = table.add_filter("a > 1", 1000).unwrap();
        append(&table, 6, "late", 0);

        let filter = table.filter(id).unwrap();
        assert_eq!(filter.records_seen(), 1);
        assert_eq!(filter.records_matched(), 1);
    }

    #[test]
    fn test_trigger_validation() {
        let table = table();
        let filter = table.add_filter("a >= 0", 1000).unwrap();

        assert_eq!(
            table
                .add_trigger(filter, "b", Aggregate::Sum, RelOp::Gt, 1.0)
                .unwrap_err()
                .code(),
            TableErrorCode::TailInvalidTrigger
        );
        assert_eq!(
            table
                .add_trigger(filter, "zz", Aggregate::Max, RelOp::Gt, 1.0)
                .unwrap_err()
                .code(),
            TableErrorCode::TailFieldNotFound
        );
        assert_eq!(
            table
                .add_trigger(filter, "a", Aggregate::Max, RelOp::Gt, f64::INFINITY)
                .unwrap_err()
                .code(),
            TableErrorCode::TailInvalidTrigger
        );
        // count takes any name, and the filter id is not checked
        assert_eq!(
            table.add_trigger(99, "anything", Aggregate::Count, RelOp::Ge, 1.0).unwrap(),
            0
        );
    }

    #[test]
    fn test_evaluate_triggers() {
        let table = table();
        let filter = table.add_filter("a > 1", 1000).unwrap();
        let count = table
            .add_trigger(filter, "a", Aggregate::Count, RelOp::Ge, 2.0)
            .unwrap();
        let max = table
            .add_trigger(filter, "a", Aggregate::Max, RelOp::Gt, 50.0)
            .unwrap();

        append(&table, 1, "no", 100);
        append(&table, 5, "yes", 200);
        append(&table, 7, "yes", 900);
        append(&table, 99, "yes", 1500);

        let alerts = table.evaluate_triggers(0, 2000);
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].trigger_id, count);
        assert_eq!(alerts[0].window_start_ms, 0);
        assert_eq!(alerts[0].value, 2.0);
        assert_eq!(alerts[1].trigger_id, max);
        assert_eq!(alerts[1].window_start_ms, 1000);
        assert_eq!(alerts[1].value, 99.0);
        assert_eq!(table.metrics().snapshot().alerts_fired, 2);

        assert!(table.evaluate_triggers(5000, 6000).is_empty());
    }
}
