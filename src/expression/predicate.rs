//! Compiled predicates
//!
//! Compilation binds each comparison to a column position and converts the
//! literal to the representation the column compares in. Evaluation reads
//! only the record; a predicate holds no mutable state and may be shared
//! across threads.

use crate::schema::{DataType, Record, Schema, Value};

use super::errors::{CompileError, CompileResult};
use super::parser::{Expr, Literal};
use super::relop::RelOp;

/// Literal converted to the column's comparison domain
#[derive(Debug, Clone, PartialEq)]
enum Operand {
    Bool(bool),
    Int(i64),
    Float(f64),
    Bytes(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Compare {
        column: usize,
        op: RelOp,
        operand: Operand,
    },
    And(Box<Node>, Box<Node>),
    Or(Box<Node>, Box<Node>),
    Not(Box<Node>),
}

/// A filter expression bound to a schema
#[derive(Debug, Clone)]
pub struct CompiledPredicate {
    expression: String,
    root: Node,
}

impl CompiledPredicate {
    pub(crate) fn bind(expression: &str, expr: &Expr, schema: &Schema) -> CompileResult<Self> {
        Ok(Self {
            expression: expression.to_string(),
            root: bind(expr, schema)?,
        })
    }

    /// Source text this predicate was compiled from
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Whether `record` satisfies the predicate.
    pub fn evaluate(&self, record: &Record) -> bool {
        eval(&self.root, record)
    }
}

fn bind(expr: &Expr, schema: &Schema) -> CompileResult<Node> {
    Ok(match expr {
        Expr::Compare { field, op, literal } => {
            let column = schema
                .column_by_name(field)
                .map_err(|_| CompileError::UnknownField(field.clone()))?;
            Node::Compare {
                column: column.position(),
                op: *op,
                operand: convert(column.name(), &column.data_type(), literal)?,
            }
        }
        Expr::And(l, r) => Node::And(Box::new(bind(l, schema)?), Box::new(bind(r, schema)?)),
        Expr::Or(l, r) => Node::Or(Box::new(bind(l, schema)?), Box::new(bind(r, schema)?)),
        Expr::Not(inner) => Node::Not(Box::new(bind(inner, schema)?)),
    })
}

fn convert(field: &str, data_type: &DataType, literal: &Literal) -> CompileResult<Operand> {
    let operand = match (data_type, literal) {
        (DataType::Bool, Literal::Bool(b)) => Some(Operand::Bool(*b)),
        (DataType::Char, Literal::Str(s)) if s.len() == 1 => Some(Operand::Int(s.as_bytes()[0] as i64)),
        (DataType::Char, Literal::Int(v)) if (0..=255).contains(v) => Some(Operand::Int(*v)),
        (DataType::Short | DataType::Int | DataType::Long, Literal::Int(v)) => Some(Operand::Int(*v)),
        (DataType::Short | DataType::Int | DataType::Long, Literal::Float(v)) => {
            Some(Operand::Float(*v))
        }
        (DataType::Float | DataType::Double, Literal::Int(v)) => Some(Operand::Float(*v as f64)),
        (DataType::Float | DataType::Double, Literal::Float(v)) => Some(Operand::Float(*v)),
        (DataType::String(_), Literal::Str(s)) => Some(Operand::Bytes(s.as_bytes().to_vec())),
        _ => None,
    };

    operand.ok_or_else(|| CompileError::TypeMismatch {
        field: field.to_string(),
        field_type: data_type.to_string(),
        literal: literal.to_string(),
    })
}

fn eval(node: &Node, record: &Record) -> bool {
    match node {
        Node::Compare {
            column,
            op,
            operand,
        } => match record.value(*column) {
            Some(value) => compare(value, *op, operand),
            None => false,
        },
        Node::And(l, r) => eval(l, record) && eval(r, record),
        Node::Or(l, r) => eval(l, record) || eval(r, record),
        Node::Not(inner) => !eval(inner, record),
    }
}

fn compare(value: &Value, op: RelOp, operand: &Operand) -> bool {
    match (value, operand) {
        (Value::Bool(v), Operand::Bool(b)) => op.compare(v, b),
        (Value::Char(v), Operand::Int(i)) => op.compare(&(*v as i64), i),
        (Value::Short(v), Operand::Int(i)) => op.compare(&(*v as i64), i),
        (Value::Int(v), Operand::Int(i)) => op.compare(&(*v as i64), i),
        (Value::Long(v), Operand::Int(i)) => op.compare(v, i),
        (Value::String(s), Operand::Bytes(b)) => op.holds(s.as_bytes().cmp(b.as_slice())),
        (value, Operand::Float(f)) => match value.as_f64() {
            Some(v) => op.compare(&v, f),
            None => false,
        },
        // Binding rules out every other pairing.
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::compile;
    use crate::schema::{ColumnDef, Schema};

    fn schema() -> Schema {
        Schema::new(&[
            ColumnDef::new("a", DataType::Int),
            ColumnDef::new("b", DataType::String(8)),
            ColumnDef::new("c", DataType::Double),
            ColumnDef::new("d", DataType::Bool),
            ColumnDef::new("e", DataType::Char),
            ColumnDef::new("f", DataType::Binary(2)),
        ])
        .unwrap()
    }

    fn record(schema: &Schema, a: i32, b: &str, c: f64, d: bool, e: u8) -> Record {
        let payload = schema
            .encode(&[
                Value::Int(a),
                Value::String(b.into()),
                Value::Double(c),
                Value::Bool(d),
                Value::Char(e),
                Value::Binary(vec![0, 0]),
            ])
            .unwrap();
        schema.apply(0, &payload, 0).unwrap()
    }

    #[test]
    fn test_evaluate_numeric() {
        let schema = schema();
        let pred = compile("A > 1", &schema).unwrap();
        assert!(pred.evaluate(&record(&schema, 2, "x", 0.0, false, b'x')));
        assert!(!pred.evaluate(&record(&schema, 1, "x", 0.0, false, b'x')));

        let pred = compile("c <= 2 && a != 0", &schema).unwrap();
        assert!(pred.evaluate(&record(&schema, 5, "x", 2.0, false, b'x')));
        assert!(!pred.evaluate(&record(&schema, 0, "x", 2.0, false, b'x')));
    }

    #[test]
    fn test_evaluate_mixed_types() {
        let schema = schema();
        let rec = record(&schema, 3, "warn", 1.5, true, b'q');

        assert!(compile("b == 'warn'", &schema).unwrap().evaluate(&rec));
        assert!(compile("b > 'alpha'", &schema).unwrap().evaluate(&rec));
        assert!(compile("d == true", &schema).unwrap().evaluate(&rec));
        assert!(compile("e == 'q'", &schema).unwrap().evaluate(&rec));
        assert!(compile("a < 3.5", &schema).unwrap().evaluate(&rec));
        assert!(compile("NOT (a == 1 OR a == 2)", &schema).unwrap().evaluate(&rec));
    }

    #[test]
    fn test_field_names_are_case_insensitive() {
        let schema = schema();
        assert!(compile("a > 1", &schema).is_ok());
        assert!(compile("A > 1", &schema).is_ok());
    }

    #[test]
    fn test_type_errors() {
        let schema = schema();
        assert!(matches!(
            compile("a == 'x'", &schema).unwrap_err(),
            CompileError::TypeMismatch { .. }
        ));
        assert!(matches!(
            compile("b > 1", &schema).unwrap_err(),
            CompileError::TypeMismatch { .. }
        ));
        assert!(compile("f == 1", &schema).is_err());
        assert!(compile("d == 1", &schema).is_err());
        assert_eq!(
            compile("zz > 1", &schema).unwrap_err(),
            CompileError::UnknownField("zz".into())
        );
    }
}
