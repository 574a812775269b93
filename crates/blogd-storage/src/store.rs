//! Attachment file placement and removal.

use std::path::{Path, PathBuf};

use blogd_core::AttachmentClass;
use tokio::fs;

use crate::root::UploadRoot;
use crate::StorageError;

/// Filesystem operations on stored attachments, scoped to an [`UploadRoot`].
#[derive(Debug, Clone)]
pub struct AttachmentStore {
    root: UploadRoot,
}

impl AttachmentStore {
    pub fn new(root: UploadRoot) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &UploadRoot {
        &self.root
    }

    /// Move a received temp file into its final class directory.
    ///
    /// Rename first; when the temp directory sits on another filesystem the
    /// rename fails and a copy-then-remove fallback runs instead. Returns
    /// the final path and the app-root-relative path to persist.
    pub async fn place(
        &self,
        temp_path: &Path,
        class: AttachmentClass,
        stored_name: &str,
    ) -> Result<(PathBuf, String), StorageError> {
        let dest = self.root.class_dir(class).join(stored_name);
        let relative = self.root.relative_path(class, stored_name);
        let start = std::time::Instant::now();

        if fs::rename(temp_path, &dest).await.is_err() {
            fs::copy(temp_path, &dest).await.map_err(|e| {
                StorageError::WriteFailed(format!(
                    "failed to copy {} to {}: {}",
                    temp_path.display(),
                    dest.display(),
                    e
                ))
            })?;
            if let Err(err) = fs::remove_file(temp_path).await {
                tracing::warn!(
                    path = %temp_path.display(),
                    error = %err,
                    "failed to remove temp file after copy"
                );
            }
        }

        tracing::info!(
            path = %dest.display(),
            class = %class,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "attachment stored"
        );

        Ok((dest, relative))
    }

    /// Size in bytes of a stored file, measured from disk.
    pub async fn measure(&self, path: &Path) -> Result<u64, StorageError> {
        let meta = fs::metadata(path)
            .await
            .map_err(|e| StorageError::ReadFailed(format!("{}: {}", path.display(), e)))?;
        Ok(meta.len())
    }

    /// Delete a stored file by its persisted relative path. A file that is
    /// already gone is not an error.
    pub async fn delete_relative(&self, relative_path: &str) -> Result<(), StorageError> {
        let path = self.root.resolve(relative_path)?;

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(());
        }

        fs::remove_file(&path).await.map_err(|e| {
            StorageError::DeleteFailed(format!("failed to delete {}: {}", path.display(), e))
        })?;

        tracing::info!(path = %path.display(), "attachment deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn store_in(dir: &Path) -> AttachmentStore {
        let root = UploadRoot::new(dir, "uploads");
        root.ensure_layout().await.unwrap();
        AttachmentStore::new(root)
    }

    #[tokio::test]
    async fn place_moves_temp_file_into_class_dir() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path()).await;

        let temp = dir.path().join("incoming.bin");
        fs::write(&temp, b"pixels").await.unwrap();

        let (dest, relative) = store
            .place(&temp, AttachmentClass::Image, "abc_1.png")
            .await
            .unwrap();

        assert_eq!(relative, "uploads/images/abc_1.png");
        assert!(!temp.exists());
        assert_eq!(fs::read(&dest).await.unwrap(), b"pixels");
        assert_eq!(store.measure(&dest).await.unwrap(), 6);
    }

    #[tokio::test]
    async fn delete_relative_is_tolerant_of_missing_files() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path()).await;

        assert!(store
            .delete_relative("uploads/files/never-existed.pdf")
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn delete_relative_removes_stored_file() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path()).await;

        let temp = dir.path().join("doc.pdf");
        fs::write(&temp, b"%PDF-1.7").await.unwrap();
        let (dest, relative) = store
            .place(&temp, AttachmentClass::File, "doc_1.pdf")
            .await
            .unwrap();

        store.delete_relative(&relative).await.unwrap();
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn delete_relative_refuses_traversal() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path()).await;

        assert!(matches!(
            store.delete_relative("../outside.txt").await,
            Err(StorageError::InvalidPath(_))
        ));
    }
}
