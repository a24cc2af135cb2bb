//! Secondary index subsystem for tailstore
//!
//! Each index maps the bucketed key of one column to the sorted offsets of
//! the records carrying it.
//!
//! # Design Principles
//!
//! - Prospective: an index only sees appends that start after it is attached
//! - Never destroyed: removal detaches, the entry stays queryable by id
//! - Deterministic: BTreeMap iteration order, sorted offsets
//!
//! # Invariants
//!
//! - Inserts happen before the read tail passes the record
//! - Lookups are bounded by a tail snapshot, so partial appends never leak

mod entry;
mod key;
mod kind;
mod tree;

pub use entry::IndexEntry;
pub use key::IndexKey;
pub use kind::IndexKind;
pub use tree::{IndexTree, StorageOffset};
