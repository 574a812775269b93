//! Upload-root layout and path resolution.

use std::path::{Path, PathBuf};

use blogd_core::constants::{DIR_PLACEHOLDER_BODY, DIR_PLACEHOLDER_NAME};
use blogd_core::AttachmentClass;
use tokio::fs;

use crate::StorageError;

/// The upload directory tree under the application root.
///
/// Attachment rows store paths relative to the application root (e.g.
/// `uploads/images/{stored_name}`); [`UploadRoot::resolve`] is the only way
/// those turn back into filesystem paths, and it refuses anything that could
/// escape the root.
#[derive(Debug, Clone)]
pub struct UploadRoot {
    app_root: PathBuf,
    upload_dir: String,
}

impl UploadRoot {
    pub fn new(app_root: impl Into<PathBuf>, upload_dir: impl Into<String>) -> Self {
        Self {
            app_root: app_root.into(),
            upload_dir: upload_dir.into(),
        }
    }

    /// Absolute directory for one attachment class.
    pub fn class_dir(&self, class: AttachmentClass) -> PathBuf {
        self.app_root.join(&self.upload_dir).join(class.subdir())
    }

    /// App-root-relative path for a stored file, with `/` separators as
    /// persisted in attachment rows.
    pub fn relative_path(&self, class: AttachmentClass, stored_name: &str) -> String {
        format!("{}/{}/{}", self.upload_dir, class.subdir(), stored_name)
    }

    /// Resolve a persisted relative path to a filesystem path.
    ///
    /// Rejects absolute paths, parent references, and backslashes before
    /// joining, so a tampered row cannot read outside the application root.
    pub fn resolve(&self, relative_path: &str) -> Result<PathBuf, StorageError> {
        if relative_path.is_empty()
            || relative_path.starts_with('/')
            || relative_path.contains("..")
            || relative_path.contains('\\')
        {
            return Err(StorageError::InvalidPath(format!(
                "path '{}' is not a safe relative path",
                relative_path
            )));
        }
        Ok(self.app_root.join(relative_path))
    }

    /// Create the per-class directories and seed each with a placeholder
    /// that blocks directory listings on misconfigured web servers.
    ///
    /// Idempotent and race-tolerant; the placeholder is best-effort and a
    /// failure to write it never fails the call.
    pub async fn ensure_layout(&self) -> Result<(), StorageError> {
        for class in [AttachmentClass::Image, AttachmentClass::File] {
            let dir = self.class_dir(class);
            fs::create_dir_all(&dir).await.map_err(|e| {
                StorageError::WriteFailed(format!(
                    "failed to create upload directory {}: {}",
                    dir.display(),
                    e
                ))
            })?;
            restrict_dir_permissions(&dir).await;
            self.seed_placeholder(&dir).await;
        }
        Ok(())
    }

    async fn seed_placeholder(&self, dir: &Path) {
        let placeholder = dir.join(DIR_PLACEHOLDER_NAME);
        if fs::try_exists(&placeholder).await.unwrap_or(false) {
            return;
        }
        if let Err(err) = fs::write(&placeholder, DIR_PLACEHOLDER_BODY).await {
            tracing::warn!(
                path = %placeholder.display(),
                error = %err,
                "failed to seed directory placeholder"
            );
        }
    }
}

#[cfg(unix)]
async fn restrict_dir_permissions(dir: &Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(err) = fs::set_permissions(dir, std::fs::Permissions::from_mode(0o755)).await {
        tracing::warn!(path = %dir.display(), error = %err, "failed to set upload directory permissions");
    }
}

#[cfg(not(unix))]
async fn restrict_dir_permissions(_dir: &Path) {}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn ensure_layout_creates_both_class_dirs_with_placeholders() {
        let dir = tempdir().unwrap();
        let root = UploadRoot::new(dir.path(), "uploads");

        root.ensure_layout().await.unwrap();
        // Second call is a no-op.
        root.ensure_layout().await.unwrap();

        for class in [AttachmentClass::Image, AttachmentClass::File] {
            let class_dir = root.class_dir(class);
            assert!(class_dir.is_dir());
            assert!(class_dir.join(DIR_PLACEHOLDER_NAME).is_file());
        }
    }

    #[test]
    fn relative_paths_use_forward_slashes() {
        let root = UploadRoot::new("/srv/app", "uploads");
        assert_eq!(
            root.relative_path(AttachmentClass::Image, "abc_1.png"),
            "uploads/images/abc_1.png"
        );
        assert_eq!(
            root.relative_path(AttachmentClass::File, "abc_1.pdf"),
            "uploads/files/abc_1.pdf"
        );
    }

    #[test]
    fn resolve_rejects_traversal() {
        let root = UploadRoot::new("/srv/app", "uploads");
        assert!(root.resolve("uploads/images/ok.png").is_ok());
        assert!(root.resolve("../etc/passwd").is_err());
        assert!(root.resolve("uploads/../../etc/passwd").is_err());
        assert!(root.resolve("/etc/passwd").is_err());
        assert!(root.resolve("uploads\\images\\x").is_err());
        assert!(root.resolve("").is_err());
    }
}
