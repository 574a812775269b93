//! Error types module
//!
//! This module provides the core error types used throughout the blogd
//! application. All errors are unified under the `AppError` enum which can
//! represent database, storage, validation, and delivery failures.
//!
//! Multipart transfer failures are modelled separately as [`TransferError`]
//! because they are reported by the request-handling layer before any file
//! content is inspected.

use std::io;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues like resource limits
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Failure reported by the multipart transport for a received file, mapped
/// before any content inspection happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TransferError {
    #[error("the file exceeds the server upload size limit")]
    TooLarge,
    #[error("the file exceeds the size limit declared by the form")]
    FormTooLarge,
    #[error("the file was only partially received")]
    Partial,
    #[error("no file was received")]
    NoFile,
    #[error("no temporary directory is available for uploads")]
    NoTempDir,
    #[error("the received file could not be written to disk")]
    CantWrite,
    #[error("the upload was blocked by a server extension")]
    ExtensionBlocked,
    #[error("an unknown transfer error occurred")]
    Unknown,
}

/// Metadata for error responses - defines how an error should be presented.
/// This trait allows errors to self-describe their HTTP response shape.
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "UNSUPPORTED_TYPE")
    fn error_code(&self) -> &'static str;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden in production
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Transfer failed: {0}")]
    Transfer(TransferError),

    #[error("File of {size} bytes exceeds the {limit} byte policy limit")]
    TooLargeForPolicy { size: u64, limit: u64 },

    #[error("Unsupported file type: {0}")]
    UnsupportedType(String),

    #[error("Disk space information unavailable: {0}")]
    DiskSpaceUnavailable(String),

    #[error("Disk usage at {usage_percent:.1}% is above the critical threshold")]
    DiskCritical { usage_percent: f64 },

    #[error("Storage write failed: {0}")]
    StorageWrite(String),

    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::NotFound("record not found".to_string()),
            other => AppError::Database(other.to_string()),
        }
    }
}

impl From<TransferError> for AppError {
    fn from(err: TransferError) -> Self {
        AppError::Transfer(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::InvalidInput(format!("Validation error: {}", err))
    }
}

/// Static metadata for each variant: (http_status, error_code, sensitive, log_level).
/// client_message stays per-variant for dynamic content.
fn app_error_static_metadata(err: &AppError) -> (u16, &'static str, bool, LogLevel) {
    match err {
        AppError::Database(_) => (500, "DATABASE_ERROR", true, LogLevel::Error),
        AppError::Transfer(_) => (400, "TRANSFER_ERROR", false, LogLevel::Debug),
        AppError::TooLargeForPolicy { .. } => (413, "TOO_LARGE", false, LogLevel::Debug),
        AppError::UnsupportedType(_) => (415, "UNSUPPORTED_TYPE", false, LogLevel::Debug),
        AppError::DiskSpaceUnavailable(_) => (500, "DISK_SPACE_UNAVAILABLE", true, LogLevel::Error),
        AppError::DiskCritical { .. } => (507, "DISK_CRITICAL", false, LogLevel::Warn),
        AppError::StorageWrite(_) => (500, "STORAGE_WRITE_FAILED", true, LogLevel::Error),
        AppError::ReadFailed(_) => (500, "READ_FAILED", true, LogLevel::Error),
        AppError::InvalidInput(_) => (400, "INVALID_INPUT", false, LogLevel::Debug),
        AppError::NotFound(_) => (404, "NOT_FOUND", false, LogLevel::Debug),
        AppError::Unauthorized(_) => (401, "UNAUTHORIZED", false, LogLevel::Debug),
        AppError::Conflict(_) => (409, "CONFLICT", false, LogLevel::Debug),
        AppError::Internal(_) => (500, "INTERNAL_ERROR", true, LogLevel::Error),
        AppError::InternalWithSource { .. } => (500, "INTERNAL_ERROR", true, LogLevel::Error),
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn client_message(&self) -> String {
        if self.is_sensitive() {
            // Never leak internal paths or driver messages to clients.
            match self {
                AppError::Database(_) => "A server error occurred".to_string(),
                AppError::DiskSpaceUnavailable(_) => {
                    "The server could not verify available storage".to_string()
                }
                AppError::StorageWrite(_) => "The file could not be stored".to_string(),
                AppError::ReadFailed(_) => "The file could not be read".to_string(),
                _ => "A server error occurred".to_string(),
            }
        } else {
            self.to_string()
        }
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).3
    }
}

impl AppError {
    /// Short variant name for structured logging.
    pub fn error_type(&self) -> &'static str {
        self.error_code()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_errors_are_client_visible() {
        let err = AppError::TooLargeForPolicy {
            size: 6 * 1024 * 1024,
            limit: 5 * 1024 * 1024,
        };
        assert_eq!(err.http_status_code(), 413);
        assert!(!err.is_sensitive());
        assert!(err.client_message().contains("policy limit"));
    }

    #[test]
    fn sensitive_errors_hide_details() {
        let err = AppError::Database("connection refused at 10.0.0.5".to_string());
        assert!(err.is_sensitive());
        assert!(!err.client_message().contains("10.0.0.5"));
    }

    #[test]
    fn transfer_errors_map_to_bad_request() {
        let err = AppError::from(TransferError::Partial);
        assert_eq!(err.http_status_code(), 400);
        assert_eq!(err.error_code(), "TRANSFER_ERROR");
    }
}
