//! Read-side view of one committed record

use crate::schema::{Schema, Value};

/// Copy of a committed record's bytes plus the schema to decode them.
///
/// Only handed out for offsets below the read tail, so the bytes never
/// change after the copy is taken.
#[derive(Debug, Clone)]
pub struct RecordRef<'a> {
    offset: u64,
    bytes: Vec<u8>,
    schema: &'a Schema,
}

impl<'a> RecordRef<'a> {
    pub(crate) fn new(offset: u64, bytes: Vec<u8>, schema: &'a Schema) -> Self {
        Self {
            offset,
            bytes,
            schema,
        }
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Raw record bytes
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Every field value in column order
    pub fn decode(&self) -> Vec<Value> {
        self.schema
            .columns()
            .iter()
            .map(|column| Value::decode(&column.data_type(), self.slot(column.position())))
            .collect()
    }

    /// Value of the column called `name`, ignoring case.
    pub fn value(&self, name: &str) -> Option<Value> {
        let position = self.schema.resolve(name)?;
        let column = self.schema.column(position)?;
        Some(Value::decode(&column.data_type(), self.slot(position)))
    }

    /// `{"offset": .., "fields": {"COLUMN": value, ..}}`
    pub fn to_json(&self) -> serde_json::Value {
        let fields: serde_json::Map<String, serde_json::Value> = self
            .schema
            .columns()
            .iter()
            .zip(self.decode())
            .map(|(column, value)| (column.name().to_string(), value.to_json()))
            .collect();

        serde_json::json!({
            "offset": self.offset,
            "fields": fields,
        })
    }

    fn slot(&self, position: usize) -> &[u8] {
        let column = &self.schema.columns()[position];
        &self.bytes[column.offset()..column.offset() + column.size()]
    }
}
