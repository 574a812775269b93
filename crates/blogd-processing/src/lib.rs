//! Blogd Processing Library
//!
//! Content inspection for uploaded files: MIME sniffing, per-class
//! validation, and image normalization.

pub mod normalize;
pub mod sniff;
pub mod validator;

pub use normalize::{normalize_image, normalize_image_with_bounds};
pub use sniff::{effective_mime, sniff_bytes, sniff_file};
pub use validator::UploadValidator;
