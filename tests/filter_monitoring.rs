//! Filter and Trigger Tests
//!
//! - Filters see appends in offset order when appends are sequential
//! - Concurrent appends reach every filter exactly once
//! - Windows group matches by record timestamp
//! - Triggers fire per window where `aggregate op threshold` holds

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use tailstore::expression::RelOp;
use tailstore::monitor::Aggregate;
use tailstore::schema::{ColumnDef, DataType, Value};
use tailstore::{Table, TableErrorCode};

const MS: u64 = 1_000_000;

fn table() -> Table {
    Table::in_memory(&[
        ColumnDef::new("host", DataType::String(8)),
        ColumnDef::new("status", DataType::Int),
        ColumnDef::new("latency", DataType::Float),
    ])
    .unwrap()
}

fn append_at(table: &Table, host: &str, status: i32, latency: f32, ts_ms: u64) -> u64 {
    let payload = table
        .schema()
        .encode(&[
            Value::String(host.to_string()),
            Value::Int(status),
            Value::Float(latency),
        ])
        .unwrap();
    table.append_at(&payload, ts_ms * MS).unwrap()
}

// =============================================================================
// Ordering
// =============================================================================

/// Sequential appends land in window offsets in append order.
#[test]
fn test_filter_sees_offsets_in_order() {
    let table = table();
    let id = table.add_filter("status >= 500", 1_000).unwrap();

    let mut expected = Vec::new();
    for i in 0..50 {
        let offset = append_at(&table, "web", 500 + i, 1.0, 10);
        expected.push(offset);
    }

    let window = table.filter(id).unwrap().window_at(10).unwrap();
    assert_eq!(window.offsets(), expected.as_slice());
    assert_eq!(window.count(), 50);
}

/// With concurrent appenders every committed record is seen exactly once.
#[test]
fn test_concurrent_appends_seen_once() {
    let table = Arc::new(table());
    let id = table.add_filter("status == 200", 1_000_000).unwrap();

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let table = Arc::clone(&table);
            thread::spawn(move || {
                for i in 0..250 {
                    append_at(&table, "db", 200, (t * 1000 + i) as f32, 0);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let filter = table.filter(id).unwrap();
    assert_eq!(filter.records_seen(), 1000);
    let window = filter.window_at(0).unwrap();
    let unique: HashSet<u64> = window.offsets().iter().copied().collect();
    assert_eq!(unique.len(), 1000);
    assert!(
        window.offsets().windows(2).all(|pair| pair[0] < pair[1]),
        "filter saw offsets out of order"
    );
    assert_eq!(table.metrics().snapshot().filter_matches, 1000);
}

/// Alerts raised during ingestion only count records readers can see.
#[test]
fn test_alerts_count_committed_records() {
    let table = Arc::new(table());
    let id = table.add_filter("status == 200", 1_000_000).unwrap();
    table
        .add_trigger(id, "status", Aggregate::Count, RelOp::Ge, 1.0)
        .unwrap();
    let done = Arc::new(AtomicBool::new(false));

    let evaluator = {
        let table = Arc::clone(&table);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            while !done.load(Ordering::Acquire) {
                for alert in table.evaluate_triggers(0, u64::MAX) {
                    assert!(alert.value as u64 <= table.record_count());
                }
            }
        })
    };

    let writers: Vec<_> = (0..4)
        .map(|_| {
            let table = Arc::clone(&table);
            thread::spawn(move || {
                for i in 0..250 {
                    append_at(&table, "db", 200, i as f32, 0);
                }
            })
        })
        .collect();
    for writer in writers {
        writer.join().unwrap();
    }
    done.store(true, Ordering::Release);
    evaluator.join().unwrap();

    let alerts = table.evaluate_triggers(0, u64::MAX);
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].value, 1000.0);
}

// =============================================================================
// Expressions
// =============================================================================

/// Boolean combinations and string comparisons.
#[test]
fn test_compound_expression() {
    let table = table();
    let id = table
        .add_filter("(host == 'api' || host == \"web\") && NOT status < 400", 1_000)
        .unwrap();

    append_at(&table, "api", 404, 1.0, 0);
    append_at(&table, "web", 200, 1.0, 0);
    append_at(&table, "db", 500, 1.0, 0);
    append_at(&table, "web", 503, 1.0, 0);

    assert_eq!(table.filter(id).unwrap().records_matched(), 2);
}

/// Pathologically nested expressions are compile errors, not crashes.
#[test]
fn test_deep_nesting_rejected() {
    let table = table();
    let nots = format!("{}status > 1", "!".repeat(200_000));
    let parens = format!("{}status > 1{}", "(".repeat(50_000), ")".repeat(50_000));
    for expression in [nots, parens] {
        let err = table.add_filter(&expression, 1_000).unwrap_err();
        assert_eq!(err.code(), TableErrorCode::TailCompilationFailed);
    }
    assert_eq!(table.filter_count(), 0);
    assert!(table.add_filter("!!(status > 1)", 1_000).is_ok());
}

/// Malformed and ill-typed expressions register nothing.
#[test]
fn test_compilation_errors() {
    let table = table();
    for expression in ["", "status >", "nope == 1", "host > 5", "status == 'x'", "(status == 1"] {
        let err = table.add_filter(expression, 1_000).unwrap_err();
        assert_eq!(err.code(), TableErrorCode::TailCompilationFailed, "{}", expression);
    }
    assert_eq!(table.filter_count(), 0);
}

// =============================================================================
// Windows and triggers
// =============================================================================

/// Matches are grouped into tumbling windows by timestamp.
#[test]
fn test_windows() {
    let table = table();
    let id = table.add_filter("latency > 100", 1_000).unwrap();

    append_at(&table, "a", 200, 150.0, 100);
    append_at(&table, "a", 200, 50.0, 200);
    append_at(&table, "a", 200, 300.0, 999);
    append_at(&table, "a", 200, 120.0, 1_000);

    let windows = table.filter(id).unwrap().windows_between(0, 5_000);
    assert_eq!(windows.len(), 2);
    assert_eq!(windows[0].start_ms(), 0);
    assert_eq!(windows[0].count(), 2);
    let stats = windows[0].stats(2).unwrap();
    assert_eq!(stats.min, 150.0);
    assert_eq!(stats.max, 300.0);
    assert_eq!(stats.sum, 450.0);
    assert_eq!(windows[1].start_ms(), 1_000);
    assert_eq!(windows[1].count(), 1);
}

/// Each aggregate and operator is checked per window.
#[test]
fn test_triggers_fire_per_window() {
    let table = table();
    let errors = table.add_filter("status >= 500", 60_000).unwrap();
    let burst = table
        .add_trigger(errors, "status", Aggregate::Count, RelOp::Gt, 2.0)
        .unwrap();
    let slow = table
        .add_trigger(errors, "latency", Aggregate::Min, RelOp::Ge, 1_000.0)
        .unwrap();

    // Window 0: three errors, one fast
    append_at(&table, "a", 500, 10.0, 1_000);
    append_at(&table, "a", 502, 2_000.0, 2_000);
    append_at(&table, "a", 503, 3_000.0, 3_000);
    // Window 1: one slow error
    append_at(&table, "a", 500, 5_000.0, 61_000);

    let alerts = table.evaluate_triggers(0, 120_000);
    let fired: Vec<(u32, u64)> = alerts
        .iter()
        .map(|a| (a.trigger_id, a.window_start_ms))
        .collect();
    assert_eq!(fired, vec![(burst, 0), (slow, 60_000)]);

    let only_first = table.evaluate_triggers(0, 60_000);
    assert_eq!(only_first.len(), 1);
}

/// Triggers on a filter id that was never registered stay silent.
#[test]
fn test_trigger_on_unknown_filter() {
    let table = table();
    table
        .add_trigger(7, "status", Aggregate::Count, RelOp::Ge, 0.0)
        .unwrap();
    append_at(&table, "a", 1, 1.0, 0);
    assert!(table.evaluate_triggers(0, u64::MAX).is_empty());
}
