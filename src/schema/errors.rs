//! Schema error types
//!
//! Error codes:
//! - TAIL_SCHEMA_EMPTY
//! - TAIL_SCHEMA_DUPLICATE_COLUMN
//! - TAIL_SCHEMA_INVALID_COLUMN
//! - TAIL_FIELD_NOT_FOUND
//! - TAIL_VALUE_MISMATCH
//! - TAIL_RECORD_LENGTH_MISMATCH
//!
//! All schema errors reject the operation; none of them affect table state.

use std::fmt;

/// Schema-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaErrorCode {
    /// Schema defines no columns
    TailSchemaEmpty,
    /// Two columns share a (case-insensitive) name
    TailSchemaDuplicateColumn,
    /// Column name or width is unusable
    TailSchemaInvalidColumn,
    /// Name does not resolve to a column
    TailFieldNotFound,
    /// Value does not fit the column type
    TailValueMismatch,
    /// Payload length differs from the record size
    TailRecordLengthMismatch,
}

impl SchemaErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            SchemaErrorCode::TailSchemaEmpty => "TAIL_SCHEMA_EMPTY",
            SchemaErrorCode::TailSchemaDuplicateColumn => "TAIL_SCHEMA_DUPLICATE_COLUMN",
            SchemaErrorCode::TailSchemaInvalidColumn => "TAIL_SCHEMA_INVALID_COLUMN",
            SchemaErrorCode::TailFieldNotFound => "TAIL_FIELD_NOT_FOUND",
            SchemaErrorCode::TailValueMismatch => "TAIL_VALUE_MISMATCH",
            SchemaErrorCode::TailRecordLengthMismatch => "TAIL_RECORD_LENGTH_MISMATCH",
        }
    }
}

impl fmt::Display for SchemaErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// What was expected versus what was found
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MismatchDetails {
    /// Column name
    pub field: String,
    /// Expected type or condition
    pub expected: String,
    /// Actual value or type found
    pub actual: String,
}

impl fmt::Display for MismatchDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "field '{}': expected {}, got {}",
            self.field, self.expected, self.actual
        )
    }
}

/// Schema error type
#[derive(Debug, Clone)]
pub struct SchemaError {
    code: SchemaErrorCode,
    message: String,
    details: Option<MismatchDetails>,
}

impl SchemaError {
    /// Schema has no columns
    pub fn empty() -> Self {
        Self {
            code: SchemaErrorCode::TailSchemaEmpty,
            message: "Schema must define at least one column".into(),
            details: None,
        }
    }

    /// Duplicate column name
    pub fn duplicate_column(name: &str) -> Self {
        Self {
            code: SchemaErrorCode::TailSchemaDuplicateColumn,
            message: format!("Duplicate column: {}", name),
            details: None,
        }
    }

    /// Unusable column definition
    pub fn invalid_column(name: &str, reason: impl Into<String>) -> Self {
        Self {
            code: SchemaErrorCode::TailSchemaInvalidColumn,
            message: format!("Invalid column '{}': {}", name, reason.into()),
            details: None,
        }
    }

    /// Unknown field name
    pub fn field_not_found(name: &str) -> Self {
        Self {
            code: SchemaErrorCode::TailFieldNotFound,
            message: format!("No such field: {}", name),
            details: None,
        }
    }

    /// Value does not fit its column
    pub fn value_mismatch(
        field: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        let details = MismatchDetails {
            field: field.into(),
            expected: expected.into(),
            actual: actual.into(),
        };
        Self {
            code: SchemaErrorCode::TailValueMismatch,
            message: "Value does not match column type".into(),
            details: Some(details),
        }
    }

    /// Payload is not exactly one record long
    pub fn length_mismatch(expected: usize, actual: usize) -> Self {
        Self {
            code: SchemaErrorCode::TailRecordLengthMismatch,
            message: format!("Record must be {} bytes, got {}", expected, actual),
            details: None,
        }
    }

    /// Returns the error code
    pub fn code(&self) -> SchemaErrorCode {
        self.code
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns mismatch details, if any
    pub fn details(&self) -> Option<&MismatchDetails> {
        self.details.as_ref()
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)?;
        if let Some(ref details) = self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for SchemaError {}

/// Result type for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;
