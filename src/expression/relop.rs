//! Relational operators shared by filter expressions and triggers

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Relational operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelOp {
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
}

impl RelOp {
    /// Parses an operator symbol. `=` is accepted as `==`.
    pub fn parse(symbol: &str) -> Option<RelOp> {
        match symbol {
            "==" | "=" => Some(RelOp::Eq),
            "!=" | "<>" => Some(RelOp::Ne),
            "<" => Some(RelOp::Lt),
            "<=" => Some(RelOp::Le),
            ">" => Some(RelOp::Gt),
            ">=" => Some(RelOp::Ge),
            _ => None,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            RelOp::Eq => "==",
            RelOp::Ne => "!=",
            RelOp::Lt => "<",
            RelOp::Le => "<=",
            RelOp::Gt => ">",
            RelOp::Ge => ">=",
        }
    }

    /// The operator with its operands swapped: `a op b` iff `b op.flip() a`.
    pub fn flip(&self) -> RelOp {
        match self {
            RelOp::Lt => RelOp::Gt,
            RelOp::Le => RelOp::Ge,
            RelOp::Gt => RelOp::Lt,
            RelOp::Ge => RelOp::Le,
            other => *other,
        }
    }

    /// Applies the operator to an ordering of left against right.
    pub fn holds(&self, ordering: Ordering) -> bool {
        match self {
            RelOp::Eq => ordering == Ordering::Equal,
            RelOp::Ne => ordering != Ordering::Equal,
            RelOp::Lt => ordering == Ordering::Less,
            RelOp::Le => ordering != Ordering::Greater,
            RelOp::Gt => ordering == Ordering::Greater,
            RelOp::Ge => ordering != Ordering::Less,
        }
    }

    /// Compares two values. Incomparable values (NaN) satisfy only `!=`.
    pub fn compare<T: PartialOrd>(&self, left: &T, right: &T) -> bool {
        match left.partial_cmp(right) {
            Some(ordering) => self.holds(ordering),
            None => *self == RelOp::Ne,
        }
    }
}

impl fmt::Display for RelOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}
