//! Blogd Storage Library
//!
//! Local filesystem storage for post attachments: stored-name generation,
//! upload-root layout, and file placement with path-traversal protection.

pub mod naming;
pub mod root;
pub mod store;

pub use naming::generate_stored_name;
pub use root::UploadRoot;
pub use store::AttachmentStore;

/// Storage operation errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Invalid storage path: {0}")]
    InvalidPath(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),
}

impl From<StorageError> for blogd_core::AppError {
    fn from(err: StorageError) -> Self {
        use blogd_core::AppError;
        match err {
            StorageError::InvalidPath(msg) => AppError::InvalidInput(msg),
            StorageError::NotFound(msg) => AppError::NotFound(msg),
            StorageError::WriteFailed(msg) => AppError::StorageWrite(msg),
            StorageError::ReadFailed(msg) => AppError::ReadFailed(msg),
            StorageError::DeleteFailed(msg) => AppError::StorageWrite(msg),
        }
    }
}
