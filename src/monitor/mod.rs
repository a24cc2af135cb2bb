//! Continuous monitoring: filters and triggers
//!
//! Filters evaluate every new record against a compiled predicate and keep
//! per-window aggregates of the matches. Triggers compare one aggregate of a
//! filter's windows against a threshold and raise alerts when it holds.
//!
//! # Invariants
//!
//! - A filter sees each record appended after its registration exactly once
//! - Filter state for a record is updated before the record becomes visible
//! - Trigger evaluation only reads snapshots; it never blocks appends for
//!   longer than one window copy

mod filter;
mod trigger;
mod window;

pub use filter::Filter;
pub use trigger::{Alert, Trigger};
pub use window::{Aggregate, NumericStats, WindowAggregate};
