//! Metadata catalog for tailstore
//!
//! An append-only record of which indexes, filters and triggers were
//! registered on a table, with the parameters they were registered with.
//! The catalog describes registrations; it is not replayed on open, since
//! indexing and monitoring are prospective. A reopened table hands out ids
//! past those already recorded, so an id names one registration for the
//! life of the data directory.

mod entry;
mod reader;
mod writer;

pub use entry::{CatalogEntry, FRAME_HEADER_SIZE};
pub use reader::MetadataReader;
pub use writer::{MetadataWriter, NextIds, METADATA_FILE};
