//! Observability events for tailstore
//!
//! Every lifecycle event a table can emit. Events are explicit and typed;
//! successful appends are not events.

use std::fmt;

use super::logger::Severity;

/// Observable events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Lifecycle
    /// Table constructed and ready for appends
    TableOpened,
    /// Durable table reopened from disk
    TableRecovered,
    /// Uncommitted bytes past the persisted tail were dropped on open
    RecoveryTruncated,

    // Index management
    /// Index attached to a column
    IndexAdded,
    /// Index detached from a column
    IndexRemoved,
    /// add_index or remove_index refused
    IndexRejected,

    // Monitoring
    /// Filter registered
    FilterAdded,
    /// Filter expression failed to compile
    FilterRejected,
    /// Trigger registered
    TriggerAdded,
    /// add_trigger refused
    TriggerRejected,
    /// Trigger condition held for a window
    AlertFired,

    // Failures
    /// Catalog entry could not be persisted
    CatalogWriteFailed,
    /// Append failed after reserving its offset (FATAL)
    AppendFailed,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::TableOpened => "TABLE_OPENED",
            Event::TableRecovered => "TABLE_RECOVERED",
            Event::RecoveryTruncated => "RECOVERY_TRUNCATED",
            Event::IndexAdded => "INDEX_ADDED",
            Event::IndexRemoved => "INDEX_REMOVED",
            Event::IndexRejected => "INDEX_REJECTED",
            Event::FilterAdded => "FILTER_ADDED",
            Event::FilterRejected => "FILTER_REJECTED",
            Event::TriggerAdded => "TRIGGER_ADDED",
            Event::TriggerRejected => "TRIGGER_REJECTED",
            Event::AlertFired => "ALERT_FIRED",
            Event::CatalogWriteFailed => "CATALOG_WRITE_FAILED",
            Event::AppendFailed => "APPEND_FAILED",
        }
    }

    /// Severity the event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::AppendFailed => Severity::Fatal,
            Event::CatalogWriteFailed => Severity::Error,
            Event::IndexRejected
            | Event::FilterRejected
            | Event::TriggerRejected
            | Event::RecoveryTruncated => Severity::Warn,
            _ => Severity::Info,
        }
    }

    /// Returns whether this event indicates a fatal condition
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
