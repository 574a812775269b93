use std::path::{Path, PathBuf};

use blogd_core::AppError;
use sysinfo::Disks;

/// Disk state for the filesystem holding a path, measured at check time.
#[derive(Debug, Clone, Copy)]
pub struct DiskSpaceReport {
    pub free_bytes: u64,
    pub total_bytes: u64,
    pub usage_percent: f64,
    /// Free space exceeds the requested bytes (file size plus class margin).
    pub has_space: bool,
}

/// Resolves the disk backing a path and reports its free space.
///
/// The guard only measures; the upload orchestrator applies the
/// warn/refuse policy against its configured thresholds.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskSpaceGuard;

impl DiskSpaceGuard {
    pub fn new() -> Self {
        Self
    }

    /// Check free space on the filesystem holding `path` against
    /// `required_bytes` (upload size plus the class safety margin).
    pub fn check_space(&self, path: &Path, required_bytes: u64) -> Result<DiskSpaceReport, AppError> {
        let canonical = path.canonicalize().map_err(|e| {
            AppError::DiskSpaceUnavailable(format!(
                "cannot resolve {}: {}",
                path.display(),
                e
            ))
        })?;

        let disks = Disks::new_with_refreshed_list();

        // Longest matching mount point wins, so nested mounts resolve to
        // the filesystem that actually holds the path.
        let disk = disks
            .iter()
            .filter(|disk| canonical.starts_with(PathBuf::from(disk.mount_point())))
            .max_by_key(|disk| disk.mount_point().as_os_str().len())
            .ok_or_else(|| {
                AppError::DiskSpaceUnavailable(format!(
                    "no mounted filesystem found for {}",
                    canonical.display()
                ))
            })?;

        let free_bytes = disk.available_space();
        let total_bytes = disk.total_space();
        if total_bytes == 0 {
            return Err(AppError::DiskSpaceUnavailable(format!(
                "filesystem for {} reports zero capacity",
                canonical.display()
            )));
        }

        let usage_percent =
            (total_bytes.saturating_sub(free_bytes)) as f64 / total_bytes as f64 * 100.0;

        Ok(DiskSpaceReport {
            free_bytes,
            total_bytes,
            usage_percent,
            has_space: free_bytes > required_bytes,
        })
    }

    /// Async wrapper; sysinfo does blocking reads, so the check runs in
    /// `spawn_blocking`.
    pub async fn check_space_async(
        &self,
        path: &Path,
        required_bytes: u64,
    ) -> Result<DiskSpaceReport, AppError> {
        let path = path.to_path_buf();
        let guard = *self;
        tokio::task::spawn_blocking(move || guard.check_space(&path, required_bytes))
            .await
            .map_err(|e| AppError::Internal(format!("disk space check task failed: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_real_filesystem_state_for_temp_dir() {
        let guard = DiskSpaceGuard::new();
        let report = guard.check_space(&std::env::temp_dir(), 0).unwrap();

        assert!(report.total_bytes > 0);
        assert!(report.free_bytes <= report.total_bytes);
        assert!((0.0..=100.0).contains(&report.usage_percent));
        // required_bytes of 0 is always satisfiable on a live filesystem.
        assert!(report.has_space);
    }

    #[test]
    fn impossible_requirement_has_no_space() {
        let guard = DiskSpaceGuard::new();
        let report = guard.check_space(&std::env::temp_dir(), u64::MAX).unwrap();
        assert!(!report.has_space);
    }

    #[test]
    fn missing_path_is_unavailable() {
        let guard = DiskSpaceGuard::new();
        let result = guard.check_space(Path::new("/definitely/not/a/real/path"), 0);
        assert!(matches!(result, Err(AppError::DiskSpaceUnavailable(_))));
    }
}
