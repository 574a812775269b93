use serde::{Deserialize, Serialize};

use crate::constants::{FILES_SUBDIR, IMAGES_SUBDIR};

/// Storage class of an uploaded file. Each class has its own allow-lists,
/// size cap, free-space margin, and subdirectory of the upload root; the two
/// classes are disjoint and their rules are never cross-applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentClass {
    Image,
    File,
}

impl AttachmentClass {
    /// Subdirectory of the upload root for this class.
    pub fn subdir(&self) -> &'static str {
        match self {
            AttachmentClass::Image => IMAGES_SUBDIR,
            AttachmentClass::File => FILES_SUBDIR,
        }
    }

    /// Name of the class for logging and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            AttachmentClass::Image => "image",
            AttachmentClass::File => "file",
        }
    }
}

impl std::fmt::Display for AttachmentClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A persisted attachment row.
///
/// `size_bytes` and `mime_type` are measured from the stored file after the
/// write, never taken from client input. `relative_path` is relative to the
/// application root and never contains `..`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredAttachment {
    pub id: i64,
    pub post_id: i64,
    pub class: AttachmentClass,
    pub stored_name: String,
    pub original_name: String,
    pub relative_path: String,
    pub size_bytes: i64,
    pub mime_type: String,
    pub download_count: i64,
}

/// Attachment fields produced by the upload pipeline, not yet persisted.
/// Persistence is the caller's responsibility.
#[derive(Debug, Clone)]
pub struct NewAttachment {
    pub class: AttachmentClass,
    pub stored_name: String,
    pub original_name: String,
    pub relative_path: String,
    pub size_bytes: i64,
    pub mime_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_subdirs_are_disjoint() {
        assert_ne!(
            AttachmentClass::Image.subdir(),
            AttachmentClass::File.subdir()
        );
    }
}
