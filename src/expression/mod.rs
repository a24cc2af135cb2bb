//! Filter expression compiler
//!
//! Turns expression text such as `latency > 250 && host == "db1"` into a
//! `CompiledPredicate` bound to a schema. Compilation happens once, when a
//! filter is registered; evaluation runs on every append.
//!
//! # Design
//!
//! - Lexer, then recursive-descent parser, then binding against the schema
//! - Field names resolve case-insensitively
//! - Literals are type-checked against their column at compile time, so
//!   evaluation never fails

mod errors;
mod lexer;
mod parser;
mod predicate;
mod relop;

pub use errors::{CompileError, CompileResult};
pub use predicate::CompiledPredicate;
pub use relop::RelOp;

use crate::schema::Schema;

/// Compiles `expression` against `schema`.
pub fn compile(expression: &str, schema: &Schema) -> CompileResult<CompiledPredicate> {
    let tokens = lexer::tokenize(expression)?;
    let expr = parser::parse(&tokens)?;
    CompiledPredicate::bind(expression, &expr, schema)
}
