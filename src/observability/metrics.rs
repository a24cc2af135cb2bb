//! Metrics registry for tailstore
//!
//! - Counters only, monotonic, reset on process start
//! - Relaxed atomics: counters are exact once appenders quiesce, and may lag
//!   the read tail by in-flight appends while they run

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Operational counters of one table
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    records_appended: AtomicU64,
    bytes_appended: AtomicU64,
    append_failures: AtomicU64,
    index_inserts: AtomicU64,
    filter_updates: AtomicU64,
    filter_matches: AtomicU64,
    indexes_added: AtomicU64,
    indexes_removed: AtomicU64,
    filters_added: AtomicU64,
    triggers_added: AtomicU64,
    alerts_fired: AtomicU64,
}

impl MetricsRegistry {
    /// Create a new metrics registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    // Append path

    /// Count one committed record of `bytes` bytes
    pub fn record_append(&self, bytes: u64) {
        self.records_appended.fetch_add(1, Ordering::Relaxed);
        self.bytes_appended.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn increment_append_failures(&self) {
        self.append_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_index_inserts(&self, count: u64) {
        self.index_inserts.fetch_add(count, Ordering::Relaxed);
    }

    pub fn add_filter_updates(&self, updates: u64, matches: u64) {
        self.filter_updates.fetch_add(updates, Ordering::Relaxed);
        self.filter_matches.fetch_add(matches, Ordering::Relaxed);
    }

    // Management

    pub fn increment_indexes_added(&self) {
        self.indexes_added.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_indexes_removed(&self) {
        self.indexes_removed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_filters_added(&self) {
        self.filters_added.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_triggers_added(&self) {
        self.triggers_added.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_alerts_fired(&self, count: u64) {
        self.alerts_fired.fetch_add(count, Ordering::Relaxed);
    }

    /// Records appended so far
    pub fn records_appended(&self) -> u64 {
        self.records_appended.load(Ordering::Relaxed)
    }

    /// Get all metrics as a snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            records_appended: self.records_appended.load(Ordering::Relaxed),
            bytes_appended: self.bytes_appended.load(Ordering::Relaxed),
            append_failures: self.append_failures.load(Ordering::Relaxed),
            index_inserts: self.index_inserts.load(Ordering::Relaxed),
            filter_updates: self.filter_updates.load(Ordering::Relaxed),
            filter_matches: self.filter_matches.load(Ordering::Relaxed),
            indexes_added: self.indexes_added.load(Ordering::Relaxed),
            indexes_removed: self.indexes_removed.load(Ordering::Relaxed),
            filters_added: self.filters_added.load(Ordering::Relaxed),
            triggers_added: self.triggers_added.load(Ordering::Relaxed),
            alerts_fired: self.alerts_fired.load(Ordering::Relaxed),
        }
    }

    /// Current snapshot as a JSON object
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.snapshot()).unwrap_or_else(|_| "{}".to_string())
    }
}

/// A point-in-time snapshot of all metrics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub records_appended: u64,
    pub bytes_appended: u64,
    pub append_failures: u64,
    pub index_inserts: u64,
    pub filter_updates: u64,
    pub filter_matches: u64,
    pub indexes_added: u64,
    pub indexes_removed: u64,
    pub filters_added: u64,
    pub triggers_added: u64,
    pub alerts_fired: u64,
}
