//! Live filters
//!
//! A filter sees every record appended after it was registered. Records that
//! satisfy its predicate are grouped into tumbling windows of `window_ms` by
//! record timestamp. `update` runs on the append path while the append holds
//! its turn at the read tail, after the record is durable and before the
//! tail moves past it. Updates therefore arrive one at a time in offset
//! order, and a window snapshot can hold at most the one record whose tail
//! store is still pending.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::expression::CompiledPredicate;
use crate::schema::Record;

use super::window::WindowAggregate;

/// A registered filter and its window state
#[derive(Debug)]
pub struct Filter {
    filter_id: u32,
    predicate: CompiledPredicate,
    window_ms: u64,
    windows: Mutex<BTreeMap<u64, WindowAggregate>>,
    records_seen: AtomicU64,
    records_matched: AtomicU64,
}

impl Filter {
    pub fn new(filter_id: u32, predicate: CompiledPredicate, window_ms: u64) -> Self {
        Self {
            filter_id,
            predicate,
            window_ms: window_ms.max(1),
            windows: Mutex::new(BTreeMap::new()),
            records_seen: AtomicU64::new(0),
            records_matched: AtomicU64::new(0),
        }
    }

    pub fn filter_id(&self) -> u32 {
        self.filter_id
    }

    pub fn expression(&self) -> &str {
        self.predicate.expression()
    }

    pub fn window_ms(&self) -> u64 {
        self.window_ms
    }

    /// Evaluates `record` and, if it matches, folds it into its window.
    /// Returns whether it matched.
    pub fn update(&self, record: &Record) -> bool {
        self.records_seen.fetch_add(1, Ordering::Relaxed);
        if !self.predicate.evaluate(record) {
            return false;
        }

        let start = self.window_start(record.timestamp_ms());
        self.windows
            .lock()
            .entry(start)
            .or_insert_with(|| WindowAggregate::new(start, self.window_ms))
            .add(record);
        self.records_matched.fetch_add(1, Ordering::Relaxed);
        true
    }

    /// Start of the window holding `timestamp_ms`
    pub fn window_start(&self, timestamp_ms: u64) -> u64 {
        timestamp_ms / self.window_ms * self.window_ms
    }

    /// Snapshot of the windows intersecting `[from_ms, to_ms)`, oldest first.
    pub fn windows_between(&self, from_ms: u64, to_ms: u64) -> Vec<WindowAggregate> {
        if from_ms >= to_ms {
            return Vec::new();
        }
        let first = self.window_start(from_ms);
        self.windows
            .lock()
            .range(first..to_ms)
            .map(|(_, window)| window.clone())
            .collect()
    }

    /// Snapshot of the window holding `timestamp_ms`, if any record matched in it.
    pub fn window_at(&self, timestamp_ms: u64) -> Option<WindowAggregate> {
        let start = self.window_start(timestamp_ms);
        self.windows.lock().get(&start).cloned()
    }

    /// Records evaluated so far
    pub fn records_seen(&self) -> u64 {
        self.records_seen.load(Ordering::Relaxed)
    }

    /// Records that satisfied the predicate
    pub fn records_matched(&self) -> u64 {
        self.records_matched.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::compile;
    use crate::schema::{ColumnDef, DataType, Schema, Value};

    const MS: u64 = 1_000_000;

    fn schema() -> Schema {
        Schema::new(&[ColumnDef::new("a", DataType::Int)]).unwrap()
    }

    fn record(schema: &Schema, offset: u64, a: i32, ts_ms: u64) -> Record {
        let payload = schema.encode(&[Value::Int(a)]).unwrap();
        schema.apply(offset, &payload, ts_ms * MS).unwrap()
    }

    #[test]
    fn test_update_groups_by_window() {
        let schema = schema();
        let filter = Filter::new(0, compile("a > 1", &schema).unwrap(), 100);

        assert!(filter.update(&record(&schema, 0, 5, 10)));
        assert!(!filter.update(&record(&schema, 4, 1, 20)));
        assert!(filter.update(&record(&schema, 8, 7, 99)));
        assert!(filter.update(&record(&schema, 12, 9, 100)));

        assert_eq!(filter.records_seen(), 4);
        assert_eq!(filter.records_matched(), 3);

        let windows = filter.windows_between(0, 1000);
        assert_eq!(windows.len(), 2);
        assert_eq!(windows[0].start_ms(), 0);
        assert_eq!(windows[0].offsets(), &[0, 8]);
        assert_eq!(windows[1].start_ms(), 100);
        assert_eq!(windows[1].count(), 1);
    }

    #[test]
    fn test_windows_between_includes_partial_overlap() {
        let schema = schema();
        let filter = Filter::new(0, compile("a > 0", &schema).unwrap(), 100);
        filter.update(&record(&schema, 0, 1, 150));

        assert_eq!(filter.windows_between(199, 300).len(), 1);
        assert_eq!(filter.windows_between(200, 300).len(), 0);
        assert_eq!(filter.windows_between(0, 100).len(), 0);
        assert!(filter.window_at(120).is_some());
    }
}
