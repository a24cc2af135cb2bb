//! Schema subsystem for tailstore
//!
//! A schema is an ordered list of named, fixed-width, typed columns. It maps
//! the raw bytes of one append to typed fields and owns each column's
//! indexing state.
//!
//! # Design Principles
//!
//! - Fixed record size; a payload of any other length is rejected
//! - Insertion order is the on-disk field order
//! - Column names are case-insensitive
//! - Indexing state is the only mutable part, driven by CAS transitions

mod builder;
mod column;
mod errors;
mod layout;
mod record;
mod types;

pub use builder::SchemaBuilder;
pub use column::{Column, ColumnDef, IndexState};
pub use errors::{MismatchDetails, SchemaError, SchemaErrorCode, SchemaResult};
pub use layout::Schema;
pub use record::{Field, Record};
pub use types::{DataType, Value};
