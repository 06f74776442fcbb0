//! Error types for the course archive.

use std::fmt;

use thiserror::Error;

/// A single rejected file in an upload batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileViolation {
    /// Original filename as sent by the client.
    pub filename: String,
    /// Why the file was rejected.
    pub reason: String,
}

impl FileViolation {
    /// Create a new violation entry.
    pub fn new(filename: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for FileViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.filename, self.reason)
    }
}

/// Common error type for the course archive.
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// Database error.
    ///
    /// Wraps errors from sqlx. Unique constraint violations are mapped to
    /// [`ArchiveError::Conflict`] instead.
    #[error("database error: {0}")]
    Database(String),

    /// I/O error outside of the storage tree (config files, log files).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// The principal may not perform the operation.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Generic validation error for request input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Upload batch rejected. Lists every offending file.
    #[error("validation failed: {}", format_violations(.0))]
    ValidationFailed(Vec<FileViolation>),

    /// Disk I/O failure inside the storage tree. Retryable.
    #[error("storage failure: {0}")]
    Storage(String),

    /// Unique constraint race. Resolved internally by retrying.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

fn format_violations(violations: &[FileViolation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl ArchiveError {
    /// Shorthand for a storage failure built from an I/O error and the path it hit.
    pub fn storage(path: impl fmt::Display, err: std::io::Error) -> Self {
        ArchiveError::Storage(format!("{path}: {err}"))
    }
}

impl From<sqlx::Error> for ArchiveError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = e {
            if db_err.is_unique_violation() {
                return ArchiveError::Conflict(db_err.message().to_string());
            }
        }
        ArchiveError::Database(e.to_string())
    }
}

/// Result type alias for archive operations.
pub type Result<T> = std::result::Result<T, ArchiveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_error_display() {
        let err = ArchiveError::NotFound("folder".to_string());
        assert_eq!(err.to_string(), "folder not found");
    }

    #[test]
    fn test_forbidden_error_display() {
        let err = ArchiveError::Forbidden("read access denied".to_string());
        assert_eq!(err.to_string(), "forbidden: read access denied");
    }

    #[test]
    fn test_validation_failed_lists_every_file() {
        let err = ArchiveError::ValidationFailed(vec![
            FileViolation::new("a.exe", "extension not allowed"),
            FileViolation::new("b.bat", "extension not allowed"),
        ]);
        let msg = err.to_string();
        assert!(msg.contains("a.exe: extension not allowed"));
        assert!(msg.contains("b.bat: extension not allowed"));
    }

    #[test]
    fn test_storage_helper() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = ArchiveError::storage("2024-2025/first", io_err);
        assert!(matches!(err, ArchiveError::Storage(_)));
        assert!(err.to_string().contains("2024-2025/first"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ArchiveError = io_err.into();
        assert!(matches!(err, ArchiveError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_sqlx_row_not_found_is_database_error() {
        let err: ArchiveError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, ArchiveError::Database(_)));
    }

    #[test]
    fn test_result_alias() {
        fn sample_ok() -> Result<i32> {
            Ok(42)
        }

        fn sample_err() -> Result<i32> {
            Err(ArchiveError::Conflict("path".to_string()))
        }

        assert_eq!(sample_ok().unwrap(), 42);
        assert!(sample_err().is_err());
    }
}
