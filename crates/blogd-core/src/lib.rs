//! Blogd Core Library
//!
//! This crate provides core domain models, error types, configuration, and
//! constants that are shared across all blogd components.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use config::{Config, DeliveryMode};
pub use error::{AppError, ErrorMetadata, LogLevel, TransferError};
pub use models::{AttachmentClass, ClassRules, NewAttachment, Post, StoredAttachment, User};
