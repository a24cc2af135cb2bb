//! Table error types
//!
//! Error codes:
//! - Management: TAIL_FIELD_NOT_FOUND, TAIL_ALREADY_INDEXED, TAIL_NO_INDEX,
//!   TAIL_UNSUPPORTED_INDEX_TYPE, TAIL_INDEXING_INTERRUPTED,
//!   TAIL_INVALID_BUCKET_SIZE, TAIL_INVALID_WINDOW, TAIL_INVALID_TRIGGER,
//!   TAIL_REGISTRY_FULL
//! - Compilation: TAIL_COMPILATION_FAILED
//! - Append: TAIL_INVALID_RECORD, TAIL_TABLE_FAILED
//! - Storage: TAIL_STORAGE_FAILURE
//! - Config: TAIL_INVALID_SCHEMA, TAIL_SCHEMA_MISMATCH, TAIL_INVALID_CONFIG
//!
//! Management, compilation and config errors leave the table unchanged.
//! A storage error raised after an offset was reserved is FATAL: the table
//! stops accepting appends.

use std::error::Error;
use std::fmt;

use crate::expression::CompileError;
use crate::schema::{DataType, SchemaError};
use crate::storage::{Severity, StorageError};

/// Error category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Management,
    Compilation,
    Append,
    Storage,
    Config,
}

/// Table error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableErrorCode {
    TailFieldNotFound,
    TailAlreadyIndexed,
    TailNoIndex,
    TailUnsupportedIndexType,
    TailIndexingInterrupted,
    TailInvalidBucketSize,
    TailInvalidWindow,
    TailInvalidTrigger,
    TailRegistryFull,
    TailCompilationFailed,
    TailInvalidRecord,
    TailTableFailed,
    TailStorageFailure,
    TailInvalidSchema,
    TailSchemaMismatch,
    TailInvalidConfig,
}

impl TableErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            TableErrorCode::TailFieldNotFound => "TAIL_FIELD_NOT_FOUND",
            TableErrorCode::TailAlreadyIndexed => "TAIL_ALREADY_INDEXED",
            TableErrorCode::TailNoIndex => "TAIL_NO_INDEX",
            TableErrorCode::TailUnsupportedIndexType => "TAIL_UNSUPPORTED_INDEX_TYPE",
            TableErrorCode::TailIndexingInterrupted => "TAIL_INDEXING_INTERRUPTED",
            TableErrorCode::TailInvalidBucketSize => "TAIL_INVALID_BUCKET_SIZE",
            TableErrorCode::TailInvalidWindow => "TAIL_INVALID_WINDOW",
            TableErrorCode::TailInvalidTrigger => "TAIL_INVALID_TRIGGER",
            TableErrorCode::TailRegistryFull => "TAIL_REGISTRY_FULL",
            TableErrorCode::TailCompilationFailed => "TAIL_COMPILATION_FAILED",
            TableErrorCode::TailInvalidRecord => "TAIL_INVALID_RECORD",
            TableErrorCode::TailTableFailed => "TAIL_TABLE_FAILED",
            TableErrorCode::TailStorageFailure => "TAIL_STORAGE_FAILURE",
            TableErrorCode::TailInvalidSchema => "TAIL_INVALID_SCHEMA",
            TableErrorCode::TailSchemaMismatch => "TAIL_SCHEMA_MISMATCH",
            TableErrorCode::TailInvalidConfig => "TAIL_INVALID_CONFIG",
        }
    }

    /// Returns the category of this code
    pub fn category(&self) -> ErrorCategory {
        match self {
            TableErrorCode::TailFieldNotFound
            | TableErrorCode::TailAlreadyIndexed
            | TableErrorCode::TailNoIndex
            | TableErrorCode::TailUnsupportedIndexType
            | TableErrorCode::TailIndexingInterrupted
            | TableErrorCode::TailInvalidBucketSize
            | TableErrorCode::TailInvalidWindow
            | TableErrorCode::TailInvalidTrigger
            | TableErrorCode::TailRegistryFull => ErrorCategory::Management,
            TableErrorCode::TailCompilationFailed => ErrorCategory::Compilation,
            TableErrorCode::TailInvalidRecord | TableErrorCode::TailTableFailed => {
                ErrorCategory::Append
            }
            TableErrorCode::TailStorageFailure => ErrorCategory::Storage,
            TableErrorCode::TailInvalidSchema
            | TableErrorCode::TailSchemaMismatch
            | TableErrorCode::TailInvalidConfig => ErrorCategory::Config,
        }
    }
}

impl fmt::Display for TableErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Table error type
#[derive(Debug)]
pub struct TableError {
    code: TableErrorCode,
    severity: Severity,
    message: String,
    details: Option<String>,
    source: Option<Box<dyn Error + Send + Sync + 'static>>,
}

impl TableError {
    fn new(code: TableErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            severity: Severity::Error,
            message: message.into(),
            details: None,
            source: None,
        }
    }

    fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    fn with_source<E: Error + Send + Sync + 'static>(mut self, source: E) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// No column is called `name`
    pub fn field_not_found(name: &str) -> Self {
        Self::new(TableErrorCode::TailFieldNotFound, format!("No such field: {}", name))
    }

    /// Column is INDEXING or INDEXED already
    pub fn already_indexed(name: &str) -> Self {
        Self::new(
            TableErrorCode::TailAlreadyIndexed,
            format!("Field {} is already indexed or being indexed", name),
        )
    }

    /// Column has no index to remove
    pub fn no_index(name: &str) -> Self {
        Self::new(TableErrorCode::TailNoIndex, format!("Field {} has no index", name))
    }

    /// Index id does not exist
    pub fn unknown_index(index_id: u32) -> Self {
        Self::new(TableErrorCode::TailNoIndex, format!("No index with id {}", index_id))
    }

    /// Column type has no index rule
    pub fn unsupported_index_type(name: &str, data_type: &DataType) -> Self {
        Self::new(
            TableErrorCode::TailUnsupportedIndexType,
            format!("Field {} cannot be indexed", name),
        )
        .with_details(format!("type {} has no index rule", data_type))
    }

    /// Index was removed while it was being attached
    pub fn indexing_interrupted(name: &str, index_id: u32) -> Self {
        Self::new(
            TableErrorCode::TailIndexingInterrupted,
            format!("Index on {} was removed before it was attached", name),
        )
        .with_details(format!("index_id={}", index_id))
    }

    pub fn invalid_bucket_size(bucket_size: f64) -> Self {
        Self::new(
            TableErrorCode::TailInvalidBucketSize,
            "Bucket size must be a positive finite number",
        )
        .with_details(format!("bucket_size={}", bucket_size))
    }

    pub fn invalid_window(window_ms: u64) -> Self {
        Self::new(TableErrorCode::TailInvalidWindow, "Filter window must be positive")
            .with_details(format!("window_ms={}", window_ms))
    }

    pub fn invalid_trigger(reason: impl Into<String>) -> Self {
        Self::new(TableErrorCode::TailInvalidTrigger, reason)
    }

    /// Registry of `kind` has no free ids
    pub fn registry_full(kind: &str) -> Self {
        Self::new(
            TableErrorCode::TailRegistryFull,
            format!("No more {} ids available", kind),
        )
    }

    /// Filter expression failed to compile
    pub fn compilation_failed(expression: &str, source: CompileError) -> Self {
        Self::new(
            TableErrorCode::TailCompilationFailed,
            format!("Failed to compile filter: {}", source),
        )
        .with_details(format!("expression={:?}", expression))
        .with_source(source)
    }

    /// Payload does not match the schema
    pub fn invalid_record(source: SchemaError) -> Self {
        Self::new(TableErrorCode::TailInvalidRecord, source.message().to_string())
            .with_details(source.code().code())
            .with_source(source)
    }

    /// An earlier append failed; no further appends are accepted
    pub fn table_failed() -> Self {
        let mut err = Self::new(
            TableErrorCode::TailTableFailed,
            "Table stopped accepting appends after a storage failure",
        );
        err.severity = Severity::Fatal;
        err
    }

    /// Storage layer failure. Severity follows the storage error.
    pub fn storage(source: StorageError) -> Self {
        let mut err = Self::new(TableErrorCode::TailStorageFailure, source.message().to_string())
            .with_details(source.code().code());
        err.severity = source.severity();
        err.with_source(source)
    }

    /// Column definitions are unusable
    pub fn invalid_schema(source: SchemaError) -> Self {
        Self::new(TableErrorCode::TailInvalidSchema, source.to_string()).with_source(source)
    }

    /// Stored schema differs from the supplied one
    pub fn schema_mismatch(message: impl Into<String>) -> Self {
        Self::new(TableErrorCode::TailSchemaMismatch, message)
    }

    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::new(TableErrorCode::TailInvalidConfig, message)
    }

    /// Returns the error code
    pub fn code(&self) -> TableErrorCode {
        self.code
    }

    /// Returns the severity
    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns details, if any
    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }

    pub fn category(&self) -> ErrorCategory {
        self.code.category()
    }

    /// Whether this is a rejected management request
    pub fn is_management(&self) -> bool {
        self.category() == ErrorCategory::Management
    }

    /// Returns true if this error is fatal
    pub fn is_fatal(&self) -> bool {
        self.severity == Severity::Fatal
    }
}

impl fmt::Display for TableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.code.code(), self.message)?;
        if let Some(ref details) = self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl Error for TableError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn Error + 'static))
    }
}

impl From<StorageError> for TableError {
    fn from(err: StorageError) -> Self {
        TableError::storage(err)
    }
}

/// Result type for table operations
pub type TableResult<T> = Result<T, TableError>;
