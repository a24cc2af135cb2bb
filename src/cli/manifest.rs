//! Table manifest: the JSON file every CLI command starts from
//!
//! ```json
//! {
//!   "table": {"data_dir": "./data", "storage_mode": "durable"},
//!   "columns": [
//!     {"name": "host", "type": "string", "width": 16},
//!     {"name": "latency", "type": "double"}
//!   ],
//!   "indexes": [{"field": "latency", "bucket_size": 10.0}],
//!   "filters": [{
//!     "expression": "latency > 100",
//!     "window_ms": 60000,
//!     "triggers": [{"field": "latency", "aggregate": "count", "op": ">=", "threshold": 5}]
//!   }]
//! }
//! ```
//!
//! Indexes, filters and triggers are registered each time a table is opened
//! for ingest; they only cover records appended by that run.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::expression::RelOp;
use crate::monitor::Aggregate;
use crate::schema::ColumnDef;
use crate::table::{Table, TableConfig};

use super::errors::{CliError, CliResult};

/// Complete description of a table and its monitors
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableManifest {
    #[serde(default)]
    pub table: TableConfig,

    pub columns: Vec<ColumnDef>,

    #[serde(default)]
    pub indexes: Vec<IndexSpec>,

    #[serde(default)]
    pub filters: Vec<FilterSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSpec {
    pub field: String,

    #[serde(default = "default_bucket_size")]
    pub bucket_size: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterSpec {
    pub expression: String,

    pub window_ms: u64,

    /// Triggers over this filter's windows
    #[serde(default)]
    pub triggers: Vec<TriggerSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerSpec {
    pub field: String,
    pub aggregate: Aggregate,
    pub op: RelOp,
    pub threshold: f64,
}

fn default_bucket_size() -> f64 {
    1.0
}

/// Ids assigned while registering a manifest's monitors
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct Registered {
    pub indexes: Vec<u32>,
    pub filters: Vec<u32>,
    pub triggers: Vec<u32>,
}

impl TableManifest {
    /// Load a manifest from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            CliError::config(format!("Failed to read manifest {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> CliResult<Self> {
        let manifest: TableManifest = serde_json::from_str(content)
            .map_err(|e| CliError::config(format!("Invalid manifest JSON: {}", e)))?;
        manifest.table.validate()?;
        Ok(manifest)
    }

    /// Creates or reopens the table described by the manifest.
    pub fn open(&self) -> CliResult<Table> {
        Ok(Table::new(&self.columns, self.table.clone())?)
    }

    /// Registers every index, filter and trigger on `table`, in manifest order.
    pub fn register(&self, table: &Table) -> CliResult<Registered> {
        let mut registered = Registered::default();

        for index in &self.indexes {
            registered
                .indexes
                .push(table.add_index(&index.field, index.bucket_size)?);
        }

        for filter in &self.filters {
            let filter_id = table.add_filter(&filter.expression, filter.window_ms)?;
            registered.filters.push(filter_id);

            for trigger in &filter.triggers {
                registered.triggers.push(table.add_trigger(
                    filter_id,
                    &trigger.field,
                    trigger.aggregate,
                    trigger.op,
                    trigger.threshold,
                )?);
            }
        }

        Ok(registered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::DataType;
    use crate::storage::StorageMode;

    const MANIFEST: &str = r#"{
        "columns": [
            {"name": "host", "type": "string", "width": 8},
            {"name": "latency", "type": "double"}
        ],
        "indexes": [{"field": "host"}, {"field": "latency", "bucket_size": 50}],
        "filters": [{
            "expression": "latency > 100",
            "window_ms": 1000,
            "triggers": [{"field": "latency", "aggregate": "max", "op": ">", "threshold": 500}]
        }]
    }"#;

    #[test]
    fn test_parse_defaults() {
        let manifest = TableManifest::parse(MANIFEST).unwrap();
        assert_eq!(manifest.table.storage_mode, StorageMode::InMemory);
        assert_eq!(manifest.columns[0].data_type, DataType::String(8));
        assert_eq!(manifest.indexes[0].bucket_size, 1.0);
        assert_eq!(manifest.filters[0].triggers[0].op, RelOp::Gt);
    }

    #[test]
    fn test_register() {
        let manifest = TableManifest::parse(MANIFEST).unwrap();
        let table = manifest.open().unwrap();
        let registered = manifest.register(&table).unwrap();

        assert_eq!(registered.indexes, vec![0, 1]);
        assert_eq!(registered.filters, vec![0]);
        assert_eq!(registered.triggers, vec![0]);
        assert_eq!(table.catalog().len(), 4);
    }

    #[test]
    fn test_invalid_manifest() {
        let err = TableManifest::parse(r#"{"columns": 3}"#).unwrap_err();
        assert_eq!(err.code(), "TAIL_CLI_CONFIG_ERROR");

        let err = TableManifest::parse(
            r#"{"table": {"log_capacity_bytes": 0}, "columns": []}"#,
        )
        .unwrap_err();
        assert_eq!(err.code(), "TAIL_INVALID_CONFIG");
    }

    #[test]
    fn test_register_stops_at_first_rejection() {
        let manifest = TableManifest::parse(
            r#"{
                "columns": [{"name": "a", "type": "int"}],
                "filters": [{"expression": "a >", "window_ms": 10}]
            }"#,
        )
        .unwrap();
        let table = manifest.open().unwrap();
        let err = manifest.register(&table).unwrap_err();
        assert_eq!(err.code(), "TAIL_COMPILATION_FAILED");
    }
}
