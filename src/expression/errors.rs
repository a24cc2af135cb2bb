//! # Expression Errors
//!
//! Failures while compiling a filter expression. Positions are byte offsets
//! into the expression text.

use thiserror::Error;

/// Result type for expression compilation
pub type CompileResult<T> = Result<T, CompileError>;

/// Expression compilation errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    // ==================
    // Lexical Errors
    // ==================

    #[error("Expression is empty")]
    Empty,

    #[error("Unexpected character '{ch}' at position {position}")]
    UnexpectedChar { ch: char, position: usize },

    #[error("Unterminated string literal starting at position {position}")]
    UnterminatedString { position: usize },

    #[error("Invalid number '{text}' at position {position}")]
    InvalidNumber { text: String, position: usize },

    // ==================
    // Syntax Errors
    // ==================

    #[error("Expected {expected} at position {position}, found {found}")]
    UnexpectedToken {
        expected: &'static str,
        found: String,
        position: usize,
    },

    #[error("Expected {expected}, found end of expression")]
    UnexpectedEnd { expected: &'static str },

    #[error("Expression nests deeper than {limit} levels")]
    TooDeep { limit: usize },

    // ==================
    // Semantic Errors
    // ==================

    /// Field name does not resolve against the schema
    #[error("Unknown field: {0}")]
    UnknownField(String),

    /// Literal cannot be compared with the field's type
    #[error("Cannot compare field '{field}' of type {field_type} with {literal}")]
    TypeMismatch {
        field: String,
        field_type: String,
        literal: String,
    },
}

impl CompileError {
    /// Whether the expression text itself is malformed, as opposed to not
    /// matching the schema
    pub fn is_syntax_error(&self) -> bool {
        !matches!(
            self,
            CompileError::UnknownField(_) | CompileError::TypeMismatch { .. }
        )
    }
}
