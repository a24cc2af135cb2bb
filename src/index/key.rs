//! Order-preserving index keys
//!
//! A key is the field value, divided into buckets of `bucket_size`, encoded as
//! big-endian bytes whose lexicographic order matches the value order. Keys of
//! one index all have the same width, so a range scan over the byte order is a
//! range scan over the values.
//!
//! - integers: `value.div_euclid(bucket)` with the sign bit flipped
//! - floats: `floor(value / bucket)` as ordered IEEE bits
//! - strings: the zero-padded column bytes; buckets do not apply
//! - bool, char: the raw byte

use std::fmt;

use crate::schema::{DataType, Value};

/// Encoded key of one indexed field
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IndexKey(Vec<u8>);

impl IndexKey {
    /// Derives the key of `value` for an index with `bucket_size`.
    ///
    /// Returns `None` for binary values, which have no key encoding.
    pub fn derive(value: &Value, bucket_size: f64) -> Option<Self> {
        let int_bucket = (bucket_size as i64).max(1);

        let bytes = match value {
            Value::Bool(v) => vec![*v as u8],
            Value::Char(v) => vec![*v],
            Value::Short(v) => {
                let bucketed = (*v as i64).div_euclid(int_bucket) as i16;
                ((bucketed as u16) ^ 0x8000).to_be_bytes().to_vec()
            }
            Value::Int(v) => {
                let bucketed = (*v as i64).div_euclid(int_bucket) as i32;
                ((bucketed as u32) ^ 0x8000_0000).to_be_bytes().to_vec()
            }
            Value::Long(v) => {
                let bucketed = v.div_euclid(int_bucket);
                ((bucketed as u64) ^ (1 << 63)).to_be_bytes().to_vec()
            }
            Value::Float(v) => {
                let bucketed = (*v as f64 / bucket_size).floor() as f32 + 0.0;
                ordered_f32(bucketed).to_be_bytes().to_vec()
            }
            Value::Double(v) => {
                // Adding zero folds -0.0 into 0.0.
                let bucketed = (v / bucket_size).floor() + 0.0;
                ordered_f64(bucketed).to_be_bytes().to_vec()
            }
            Value::String(s) => s.as_bytes().to_vec(),
            Value::Binary(_) => return None,
        };

        Some(IndexKey(bytes))
    }

    /// Derives a key for a column of `data_type`, padding strings to the
    /// column width so every key of the index has the same length.
    pub fn derive_for(value: &Value, data_type: &DataType, bucket_size: f64) -> Option<Self> {
        let mut key = Self::derive(value, bucket_size)?;
        if let DataType::String(width) = data_type {
            if key.0.len() > *width {
                return None;
            }
            key.0.resize(*width, 0);
        }
        Some(key)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for IndexKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IndexKey(")?;
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        write!(f, ")")
    }
}

// Negative floats: flip all bits. Positive floats: flip the sign bit.
fn ordered_f64(v: f64) -> u64 {
    let bits = v.to_bits();
    if (bits >> 63) == 1 {
        !bits
    } else {
        bits ^ (1 << 63)
    }
}

fn ordered_f32(v: f32) -> u32 {
    let bits = v.to_bits();
    if (bits >> 31) == 1 {
        !bits
    } else {
        bits ^ (1 << 31)
    }
}
