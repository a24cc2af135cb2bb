//! Observability subsystem for tailstore
//!
//! - Structured logging (JSON lines)
//! - Per-table counters
//! - Typed lifecycle events
//!
//! # Principles
//!
//! 1. Observability is read-only and never fails the caller
//! 2. No background threads
//! 3. Nothing is logged on the success path of an append
//!
//! # Usage
//!
//! ```
//! use tailstore::observability::{log_event_with_fields, Event, MetricsRegistry};
//!
//! log_event_with_fields(Event::IndexAdded, &[("field", "LATENCY"), ("index_id", "0")]);
//!
//! let metrics = MetricsRegistry::new();
//! metrics.record_append(24);
//! assert_eq!(metrics.snapshot().records_appended, 1);
//! ```

mod events;
mod logger;
mod metrics;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};

/// Log a lifecycle event at its own severity
pub fn log_event(event: Event) {
    Logger::log(event.severity(), event.as_str(), &[]);
}

/// Log a lifecycle event with fields
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}
