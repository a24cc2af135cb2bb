//! Incremental schema construction

use super::column::ColumnDef;
use super::errors::SchemaResult;
use super::layout::Schema;
use super::types::DataType;

/// Collects column definitions in order and builds a `Schema`.
///
/// ```
/// use tailstore::schema::{DataType, SchemaBuilder};
///
/// let schema = SchemaBuilder::new()
///     .add_column("ts_host", DataType::String(16))
///     .add_column("latency", DataType::Double)
///     .build()
///     .unwrap();
/// assert_eq!(schema.record_size(), 24);
/// ```
#[derive(Debug, Clone, Default)]
pub struct SchemaBuilder {
    columns: Vec<ColumnDef>,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_column(mut self, name: impl Into<String>, data_type: DataType) -> Self {
        self.columns.push(ColumnDef::new(name, data_type));
        self
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub fn build(&self) -> SchemaResult<Schema> {
        Schema::new(&self.columns)
    }
}

impl From<Vec<ColumnDef>> for SchemaBuilder {
    fn from(columns: Vec<ColumnDef>) -> Self {
        Self { columns }
    }
}
