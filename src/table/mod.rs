//! Table orchestration for tailstore
//!
//! A `Table` ties the schema, data log, read tail, index and monitor
//! registries and the metadata catalog into one append pipeline:
//!
//! 1. Validate and materialize the payload; derive index keys
//! 2. Reserve an offset in the data log and copy the bytes in
//! 3. Flush the byte range
//! 4. Wait for the read tail to reach the offset, then persist the new tail
//! 5. Feed the record to every filter, in registration order
//! 6. Insert each indexed field's key into its index
//! 7. Publish the read tail past the record
//!
//! # Design Principles
//!
//! - Readers never see a record whose side effects are incomplete
//! - Appenders take no table-wide lock
//! - Indexes, filters and triggers are added and removed while appends run
//! - Indexing and monitoring are prospective: nothing is replayed
//!
//! # Invariants
//!
//! - Offsets are strictly increasing, gapless and never reused
//! - `0 <= tail <= log length`, and the tail only moves forward
//! - If the tail covers an offset, every index insert and filter update for
//!   that offset happened before the tail moved
//! - Filters see each record once, in offset order, and only if its append
//!   succeeded

mod config;
mod engine;
mod errors;
mod ingest;
mod management;
mod record_ref;

pub use config::{TableConfig, DEFAULT_LOG_CAPACITY, MAX_LOG_CAPACITY};
pub use engine::{Table, SCHEMA_FILE};
pub use errors::{ErrorCategory, TableError, TableErrorCode, TableResult};
pub use record_ref::RecordRef;
