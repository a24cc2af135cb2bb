//! Schema: ordered columns and the fixed record layout
//!
//! Columns are laid out back to back in definition order; the record size is
//! the sum of the column widths. Names are matched case-insensitively by
//! upper-casing both sides.
//!
//! # Invariants
//!
//! - At least one column, names unique after upper-casing
//! - Column shape never changes after construction
//! - Every payload accepted by `materialize` is exactly `record_size` bytes

use std::collections::HashMap;

use super::column::{Column, ColumnDef};
use super::errors::{SchemaError, SchemaResult};
use super::record::{Field, Record};
use super::types::{DataType, Value};

/// Immutable column layout with per-column indexing state.
#[derive(Debug)]
pub struct Schema {
    columns: Vec<Column>,
    by_name: HashMap<String, usize>,
    record_size: usize,
}

impl Schema {
    /// Builds a schema from column definitions.
    ///
    /// # Errors
    ///
    /// - TAIL_SCHEMA_EMPTY if `defs` is empty
    /// - TAIL_SCHEMA_DUPLICATE_COLUMN on a repeated name
    /// - TAIL_SCHEMA_INVALID_COLUMN on a bad name or zero-width column
    pub fn new(defs: &[ColumnDef]) -> SchemaResult<Self> {
        if defs.is_empty() {
            return Err(SchemaError::empty());
        }

        let mut columns = Vec::with_capacity(defs.len());
        let mut by_name = HashMap::with_capacity(defs.len());
        let mut offset = 0;

        for (position, def) in defs.iter().enumerate() {
            validate_column(def)?;
            let name = def.name.to_uppercase();
            if by_name.insert(name.clone(), position).is_some() {
                return Err(SchemaError::duplicate_column(&def.name));
            }
            columns.push(Column::new(name, def.data_type, position, offset));
            offset += def.data_type.size();
        }

        Ok(Self {
            columns,
            by_name,
            record_size: offset,
        })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, position: usize) -> Option<&Column> {
        self.columns.get(position)
    }

    /// Position of the column called `name`, ignoring case.
    pub fn resolve(&self, name: &str) -> Option<usize> {
        self.by_name.get(&name.to_uppercase()).copied()
    }

    /// Column called `name`, ignoring case.
    pub fn column_by_name(&self, name: &str) -> SchemaResult<&Column> {
        self.resolve(name)
            .map(|position| &self.columns[position])
            .ok_or_else(|| SchemaError::field_not_found(name))
    }

    /// Bytes per record
    pub fn record_size(&self) -> usize {
        self.record_size
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Checks that a payload is exactly one record long.
    pub fn check_length(&self, bytes: &[u8]) -> SchemaResult<()> {
        if bytes.len() != self.record_size {
            return Err(SchemaError::length_mismatch(self.record_size, bytes.len()));
        }
        Ok(())
    }

    /// Parses a payload into a record that has no offset yet.
    ///
    /// Each column's indexing state is sampled once here; the record is
    /// indexed under exactly the ids it carries.
    pub fn materialize(&self, bytes: &[u8], timestamp: u64) -> SchemaResult<Record> {
        self.apply(0, bytes, timestamp)
    }

    /// Parses `bytes` as the record stored at `offset`.
    pub fn apply(&self, offset: u64, bytes: &[u8], timestamp: u64) -> SchemaResult<Record> {
        self.check_length(bytes)?;

        let fields = self
            .columns
            .iter()
            .map(|column| {
                let value = Value::decode(&column.data_type(), self.slot(column, bytes));
                Field::new(value, column.position(), column.index_id())
            })
            .collect();

        Ok(Record::new(offset, timestamp, fields))
    }

    /// Decodes a payload into values in column order.
    pub fn decode(&self, bytes: &[u8]) -> SchemaResult<Vec<Value>> {
        self.check_length(bytes)?;
        Ok(self
            .columns
            .iter()
            .map(|column| Value::decode(&column.data_type(), self.slot(column, bytes)))
            .collect())
    }

    /// Encodes one value per column into a payload.
    ///
    /// # Errors
    ///
    /// TAIL_RECORD_LENGTH_MISMATCH if the value count is wrong, or
    /// TAIL_VALUE_MISMATCH if a value does not fit its column.
    pub fn encode(&self, values: &[Value]) -> SchemaResult<Vec<u8>> {
        if values.len() != self.columns.len() {
            return Err(SchemaError::length_mismatch(self.columns.len(), values.len()));
        }

        let mut buf = vec![0u8; self.record_size];
        for (column, value) in self.columns.iter().zip(values) {
            let range = column.offset()..column.offset() + column.size();
            value.encode_into(column.name(), &column.data_type(), &mut buf[range])?;
        }
        Ok(buf)
    }

    /// Encodes a JSON object keyed by column name (any case).
    ///
    /// Every column must be present; unknown keys are rejected.
    pub fn encode_json(&self, object: &serde_json::Map<String, serde_json::Value>) -> SchemaResult<Vec<u8>> {
        let mut values: Vec<Option<Value>> = vec![None; self.columns.len()];

        for (key, json) in object {
            let position = self
                .resolve(key)
                .ok_or_else(|| SchemaError::field_not_found(key))?;
            let column = &self.columns[position];
            values[position] = Some(Value::from_json(column.name(), &column.data_type(), json)?);
        }

        let values = values
            .into_iter()
            .zip(&self.columns)
            .map(|(value, column)| {
                value.ok_or_else(|| {
                    SchemaError::value_mismatch(column.name(), column.data_type().to_string(), "missing")
                })
            })
            .collect::<SchemaResult<Vec<_>>>()?;

        self.encode(&values)
    }

    /// Definitions in column order
    pub fn definitions(&self) -> Vec<ColumnDef> {
        self.columns.iter().map(Column::definition).collect()
    }

    /// Whether `defs` describe this schema's shape, ignoring name case.
    pub fn matches(&self, defs: &[ColumnDef]) -> bool {
        defs.len() == self.columns.len()
            && defs.iter().zip(&self.columns).all(|(def, column)| {
                def.name.to_uppercase() == column.name() && def.data_type == column.data_type()
            })
    }

    fn slot<'a>(&self, column: &Column, bytes: &'a [u8]) -> &'a [u8] {
        &bytes[column.offset()..column.offset() + column.size()]
    }
}

fn validate_column(def: &ColumnDef) -> SchemaResult<()> {
    if def.name.is_empty() {
        return Err(SchemaError::invalid_column(&def.name, "name is empty"));
    }
    if !def
        .name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(SchemaError::invalid_column(
            &def.name,
            "name may only contain letters, digits and '_'",
        ));
    }
    if def.name.starts_with(|c: char| c.is_ascii_digit()) {
        return Err(SchemaError::invalid_column(&def.name, "name starts with a digit"));
    }
    if let DataType::String(0) | DataType::Binary(0) = def.data_type {
        return Err(SchemaError::invalid_column(&def.name, "width must be positive"));
    }
    Ok(())
}
