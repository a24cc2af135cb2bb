//! Column types and typed values
//!
//! Every type has a fixed width, so a record is a fixed-size byte string and
//! a column is located by its byte offset within it. Numeric values are stored
//! little-endian; strings are UTF-8, zero-padded to the column width.
//!
//! Supported types:
//! - bool (1), char (1), short (2), int (4), long (8)
//! - float (4), double (8)
//! - string(width): zero-padded UTF-8
//! - binary(width): opaque bytes, never indexable

use std::fmt;

use serde::{Deserialize, Serialize};

use super::errors::{SchemaError, SchemaResult};

/// Column data type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "width", rename_all = "lowercase")]
pub enum DataType {
    Bool,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
    /// UTF-8 text padded with zeros to the given width
    String(usize),
    /// Raw bytes of the given width
    Binary(usize),
}

impl DataType {
    /// Width of a value of this type, in bytes
    pub fn size(&self) -> usize {
        match self {
            DataType::Bool | DataType::Char => 1,
            DataType::Short => 2,
            DataType::Int | DataType::Float => 4,
            DataType::Long | DataType::Double => 8,
            DataType::String(width) | DataType::Binary(width) => *width,
        }
    }

    /// Returns the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            DataType::Bool => "bool",
            DataType::Char => "char",
            DataType::Short => "short",
            DataType::Int => "int",
            DataType::Long => "long",
            DataType::Float => "float",
            DataType::Double => "double",
            DataType::String(_) => "string",
            DataType::Binary(_) => "binary",
        }
    }

    /// Builds a type from its name and optional width. Variable-width types
    /// require a width; fixed-width types ignore it.
    pub fn from_parts(name: &str, width: Option<usize>) -> Option<DataType> {
        let data_type = match name.to_ascii_lowercase().as_str() {
            "bool" => DataType::Bool,
            "char" => DataType::Char,
            "short" => DataType::Short,
            "int" => DataType::Int,
            "long" => DataType::Long,
            "float" => DataType::Float,
            "double" => DataType::Double,
            "string" => DataType::String(width?),
            "binary" => DataType::Binary(width?),
            _ => return None,
        };
        Some(data_type)
    }

    /// Whether values of this type aggregate as numbers
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            DataType::Short | DataType::Int | DataType::Long | DataType::Float | DataType::Double
        )
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::String(width) | DataType::Binary(width) => {
                write!(f, "{}({})", self.type_name(), width)
            }
            _ => write!(f, "{}", self.type_name()),
        }
    }
}

/// A typed field value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Char(u8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    Binary(Vec<u8>),
}

impl Value {
    /// Returns the type name of this value
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Char(_) => "char",
            Value::Short(_) => "short",
            Value::Int(_) => "int",
            Value::Long(_) => "long",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::String(_) => "string",
            Value::Binary(_) => "binary",
        }
    }

    /// Numeric view used by aggregates and comparisons
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Short(v) => Some(*v as f64),
            Value::Int(v) => Some(*v as f64),
            Value::Long(v) => Some(*v as f64),
            Value::Float(v) => Some(*v as f64),
            Value::Double(v) => Some(*v),
            _ => None,
        }
    }

    /// Whether this value can be stored in a column of `data_type`
    pub fn fits(&self, data_type: &DataType) -> bool {
        match (self, data_type) {
            (Value::Bool(_), DataType::Bool)
            | (Value::Char(_), DataType::Char)
            | (Value::Short(_), DataType::Short)
            | (Value::Int(_), DataType::Int)
            | (Value::Long(_), DataType::Long)
            | (Value::Float(_), DataType::Float)
            | (Value::Double(_), DataType::Double) => true,
            (Value::String(s), DataType::String(width)) => s.len() <= *width,
            (Value::Binary(b), DataType::Binary(width)) => b.len() <= *width,
            _ => false,
        }
    }

    /// Writes this value into `out`, which must be exactly one column wide.
    pub fn encode_into(&self, field: &str, data_type: &DataType, out: &mut [u8]) -> SchemaResult<()> {
        if !self.fits(data_type) || out.len() != data_type.size() {
            return Err(SchemaError::value_mismatch(
                field,
                data_type.to_string(),
                self.type_name(),
            ));
        }

        match self {
            Value::Bool(v) => out[0] = *v as u8,
            Value::Char(v) => out[0] = *v,
            Value::Short(v) => out.copy_from_slice(&v.to_le_bytes()),
            Value::Int(v) => out.copy_from_slice(&v.to_le_bytes()),
            Value::Long(v) => out.copy_from_slice(&v.to_le_bytes()),
            Value::Float(v) => out.copy_from_slice(&v.to_le_bytes()),
            Value::Double(v) => out.copy_from_slice(&v.to_le_bytes()),
            Value::String(s) => {
                out.fill(0);
                out[..s.len()].copy_from_slice(s.as_bytes());
            }
            Value::Binary(b) => {
                out.fill(0);
                out[..b.len()].copy_from_slice(b);
            }
        }
        Ok(())
    }

    /// Reads a value of `data_type` from exactly one column's bytes.
    pub fn decode(data_type: &DataType, bytes: &[u8]) -> Value {
        match data_type {
            DataType::Bool => Value::Bool(bytes[0] != 0),
            DataType::Char => Value::Char(bytes[0]),
            DataType::Short => Value::Short(i16::from_le_bytes(fixed(bytes))),
            DataType::Int => Value::Int(i32::from_le_bytes(fixed(bytes))),
            DataType::Long => Value::Long(i64::from_le_bytes(fixed(bytes))),
            DataType::Float => Value::Float(f32::from_le_bytes(fixed(bytes))),
            DataType::Double => Value::Double(f64::from_le_bytes(fixed(bytes))),
            DataType::String(_) => {
                let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
                Value::String(String::from_utf8_lossy(&bytes[..end]).into_owned())
            }
            DataType::Binary(_) => Value::Binary(bytes.to_vec()),
        }
    }

    /// Converts a JSON value to a value of `data_type`.
    ///
    /// Chars accept a one-character string or a byte-sized integer; integers
    /// must be in range for their column.
    pub fn from_json(field: &str, data_type: &DataType, json: &serde_json::Value) -> SchemaResult<Value> {
        use serde_json::Value as Json;

        let mismatch = || SchemaError::value_mismatch(field, data_type.to_string(), json.to_string());

        let value = match (data_type, json) {
            (DataType::Bool, Json::Bool(b)) => Value::Bool(*b),
            (DataType::Char, Json::String(s)) if s.len() == 1 => Value::Char(s.as_bytes()[0]),
            (DataType::Char, Json::Number(n)) => {
                Value::Char(n.as_u64().and_then(|v| u8::try_from(v).ok()).ok_or_else(mismatch)?)
            }
            (DataType::Short, Json::Number(n)) => {
                Value::Short(n.as_i64().and_then(|v| i16::try_from(v).ok()).ok_or_else(mismatch)?)
            }
            (DataType::Int, Json::Number(n)) => {
                Value::Int(n.as_i64().and_then(|v| i32::try_from(v).ok()).ok_or_else(mismatch)?)
            }
            (DataType::Long, Json::Number(n)) => Value::Long(n.as_i64().ok_or_else(mismatch)?),
            (DataType::Float, Json::Number(n)) => Value::Float(n.as_f64().ok_or_else(mismatch)? as f32),
            (DataType::Double, Json::Number(n)) => Value::Double(n.as_f64().ok_or_else(mismatch)?),
            (DataType::String(_), Json::String(s)) => Value::String(s.clone()),
            (DataType::Binary(_), Json::Array(items)) => Value::Binary(
                items
                    .iter()
                    .map(|item| item.as_u64().and_then(|v| u8::try_from(v).ok()))
                    .collect::<Option<Vec<u8>>>()
                    .ok_or_else(mismatch)?,
            ),
            _ => return Err(mismatch()),
        };

        if !value.fits(data_type) {
            return Err(mismatch());
        }
        Ok(value)
    }

    /// JSON rendering used by the CLI
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{}", v),
            Value::Char(v) => write!(f, "{}", *v as char),
            Value::Short(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Long(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::String(v) => write!(f, "{:?}", v),
            Value::Binary(v) => write!(f, "{:02x?}", v),
        }
    }
}

fn fixed<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[..N]);
    out
}
