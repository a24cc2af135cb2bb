//! Index rule chosen from a column type

use std::fmt;

use crate::schema::DataType;

/// Shape of an index: key width and fanout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    /// Two-way index over single-byte boolean keys
    Boolean,
    /// 256-way index over keys `width` bytes wide
    Radix { width: usize },
}

impl IndexKind {
    /// Index rule for a column type, or `None` if the type cannot be indexed.
    pub fn for_type(data_type: &DataType) -> Option<IndexKind> {
        match data_type {
            DataType::Bool => Some(IndexKind::Boolean),
            DataType::Char
            | DataType::Short
            | DataType::Int
            | DataType::Long
            | DataType::Float
            | DataType::Double
            | DataType::String(_) => Some(IndexKind::Radix {
                width: data_type.size(),
            }),
            DataType::Binary(_) => None,
        }
    }

    /// Key width in bytes
    pub fn width(&self) -> usize {
        match self {
            IndexKind::Boolean => 1,
            IndexKind::Radix { width } => *width,
        }
    }

    /// Branching factor per key byte
    pub fn fanout(&self) -> usize {
        match self {
            IndexKind::Boolean => 2,
            IndexKind::Radix { .. } => 256,
        }
    }
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-way/{}B", self.fanout(), self.width())
    }
}
