//! Storage subsystem for tailstore
//!
//! Holds the two structures that define what a reader may see:
//!
//! - `DataLog`: append-only bytes, CAS-allocated offsets, synced on flush
//! - `ReadTail`: the commit cursor; an offset is visible iff it is below it
//!
//! # Invariants
//!
//! - Offsets are never reused or reordered
//! - `0 <= tail <= log length`, and the tail only moves forward
//! - The tail never passes an offset whose append has not completed
//! - A failed flush is fatal to its append; the tail is not advanced

mod checksum;
mod data_log;
mod errors;
mod mode;
mod read_tail;

pub use checksum::{compute_checksum, verify_checksum};
pub use data_log::{DataLog, DATA_LOG_FILE, SEGMENT_SIZE};
pub use errors::{Severity, StorageError, StorageErrorCode, StorageResult};
pub use mode::StorageMode;
pub use read_tail::{ReadTail, READ_TAIL_FILE};
