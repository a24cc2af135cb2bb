//! Storage error types
//!
//! Error codes:
//! - TAIL_STORAGE_IO_ERROR (ERROR severity)
//! - TAIL_STORAGE_WRITE_FAILED (FATAL severity) - durability lost mid-append
//! - TAIL_STORAGE_READ_FAILED (ERROR severity)
//! - TAIL_LOG_FULL (ERROR severity)
//! - TAIL_APPEND_STALLED (FATAL severity) - an earlier append never committed
//! - TAIL_DATA_CORRUPTION (FATAL severity)

use std::fmt;
use std::io;

/// Severity levels shared by every tailstore error type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Operation fails, table stays usable
    Error,
    /// Table can no longer accept appends
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Storage-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageErrorCode {
    /// Disk I/O failure outside the append path
    TailStorageIoError,
    /// Write or sync of appended bytes failed
    TailStorageWriteFailed,
    /// Read of persisted state failed
    TailStorageReadFailed,
    /// The data log has no room for the payload
    TailLogFull,
    /// The read tail cannot advance because a lower offset failed
    TailAppendStalled,
    /// Persisted state does not verify
    TailDataCorruption,
}

impl StorageErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            StorageErrorCode::TailStorageIoError => "TAIL_STORAGE_IO_ERROR",
            StorageErrorCode::TailStorageWriteFailed => "TAIL_STORAGE_WRITE_FAILED",
            StorageErrorCode::TailStorageReadFailed => "TAIL_STORAGE_READ_FAILED",
            StorageErrorCode::TailLogFull => "TAIL_LOG_FULL",
            StorageErrorCode::TailAppendStalled => "TAIL_APPEND_STALLED",
            StorageErrorCode::TailDataCorruption => "TAIL_DATA_CORRUPTION",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            StorageErrorCode::TailStorageIoError => Severity::Error,
            StorageErrorCode::TailStorageWriteFailed => Severity::Fatal,
            StorageErrorCode::TailStorageReadFailed => Severity::Error,
            StorageErrorCode::TailLogFull => Severity::Error,
            StorageErrorCode::TailAppendStalled => Severity::Fatal,
            StorageErrorCode::TailDataCorruption => Severity::Fatal,
        }
    }
}

impl fmt::Display for StorageErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Storage error with code, message and optional context
#[derive(Debug)]
pub struct StorageError {
    code: StorageErrorCode,
    message: String,
    details: Option<String>,
    source: Option<io::Error>,
}

impl StorageError {
    /// Create a storage I/O error
    pub fn io_error(message: impl Into<String>, source: io::Error) -> Self {
        Self {
            code: StorageErrorCode::TailStorageIoError,
            message: message.into(),
            details: None,
            source: Some(source),
        }
    }

    /// Create a write failure for the byte range `[offset, offset + length)`
    pub fn write_failed(offset: u64, length: u64, source: io::Error) -> Self {
        Self {
            code: StorageErrorCode::TailStorageWriteFailed,
            message: "Failed to persist appended bytes".into(),
            details: Some(format!("byte_offset: {}, length: {}", offset, length)),
            source: Some(source),
        }
    }

    /// Create a read failure
    pub fn read_failed(message: impl Into<String>, source: io::Error) -> Self {
        Self {
            code: StorageErrorCode::TailStorageReadFailed,
            message: message.into(),
            details: None,
            source: Some(source),
        }
    }

    /// Create a log-full error
    pub fn log_full(length: u64, requested: u64, capacity: u64) -> Self {
        Self {
            code: StorageErrorCode::TailLogFull,
            message: format!("Cannot append {} bytes", requested),
            details: Some(format!("log_length: {}, capacity: {}", length, capacity)),
            source: None,
        }
    }

    /// Create an error for an append stuck behind a failed lower offset
    pub fn append_stalled(offset: u64) -> Self {
        Self {
            code: StorageErrorCode::TailAppendStalled,
            message: "A lower offset failed before committing".into(),
            details: Some(format!("byte_offset: {}", offset)),
            source: None,
        }
    }

    /// Create a data corruption error
    pub fn data_corruption(message: impl Into<String>) -> Self {
        Self {
            code: StorageErrorCode::TailDataCorruption,
            message: message.into(),
            details: None,
            source: None,
        }
    }

    /// Create a data corruption error with byte offset context
    pub fn corruption_at_offset(offset: u64, reason: impl Into<String>) -> Self {
        Self {
            code: StorageErrorCode::TailDataCorruption,
            message: reason.into(),
            details: Some(format!("byte_offset: {}", offset)),
            source: None,
        }
    }

    /// Returns the error code
    pub fn code(&self) -> StorageErrorCode {
        self.code
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns additional error details
    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }

    /// Returns whether the table must stop accepting appends
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.severity(),
            self.code.code(),
            self.message
        )?;
        if let Some(ref details) = self.details {
            write!(f, " ({})", details)?;
        }
        if let Some(ref source) = self.source {
            write!(f, " caused by: {}", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(StorageErrorCode::TailStorageIoError.code(), "TAIL_STORAGE_IO_ERROR");
        assert_eq!(StorageErrorCode::TailLogFull.code(), "TAIL_LOG_FULL");
        assert_eq!(StorageErrorCode::TailAppendStalled.code(), "TAIL_APPEND_STALLED");
        assert_eq!(StorageErrorCode::TailDataCorruption.code(), "TAIL_DATA_CORRUPTION");
    }

    #[test]
    fn test_durability_failures_are_fatal() {
        let err = StorageError::write_failed(64, 16, io::Error::new(io::ErrorKind::Other, "eio"));
        assert!(err.is_fatal());
        assert!(StorageError::append_stalled(0).is_fatal());
    }

    #[test]
    fn test_log_full_not_fatal() {
        let err = StorageError::log_full(1000, 24, 1024);
        assert!(!err.is_fatal());
        assert_eq!(err.details(), Some("log_length: 1000, capacity: 1024"));
    }

    #[test]
    fn test_error_display() {
        let err = StorageError::corruption_at_offset(1024, "checksum mismatch");
        let display = format!("{}", err);
        assert!(display.contains("TAIL_DATA_CORRUPTION"));
        assert!(display.contains("FATAL"));
        assert!(display.contains("checksum mismatch"));
        assert!(display.contains("byte_offset: 1024"));
    }
}
