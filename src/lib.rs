//! tailstore - A real-time, schema-typed event store
//!
//! Records are appended to a single growing log, become visible to readers
//! only once they are durable and fully indexed, and are fed to a live set of
//! filters and triggers as they arrive.

pub mod cli;
pub mod expression;
pub mod index;
pub mod metadata;
pub mod monitor;
pub mod observability;
pub mod registry;
pub mod schema;
pub mod storage;
pub mod table;

pub use table::{Table, TableConfig, TableError, TableErrorCode, TableResult};
