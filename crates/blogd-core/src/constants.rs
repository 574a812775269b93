//! Shared constants for upload policy and storage layout.

/// Maximum accepted image size in bytes (5 MiB).
pub const MAX_IMAGE_SIZE_BYTES: u64 = 5 * 1024 * 1024;

/// Maximum accepted attachment size in bytes (10 MiB).
pub const MAX_ATTACHMENT_SIZE_BYTES: u64 = 10 * 1024 * 1024;

/// Free-space safety margin added on top of the incoming file size when
/// checking disk capacity for image uploads.
pub const IMAGE_SPACE_MARGIN_BYTES: u64 = 5 * 1024 * 1024;

/// Free-space safety margin for generic attachment uploads.
pub const ATTACHMENT_SPACE_MARGIN_BYTES: u64 = 10 * 1024 * 1024;

/// Disk usage percentage above which uploads proceed with a warning.
pub const DISK_WARN_USAGE_PERCENT: f64 = 90.0;

/// Disk usage percentage above which uploads are refused outright.
pub const DISK_CRITICAL_USAGE_PERCENT: f64 = 95.0;

/// Bound on the longest side written back by the image normalizer.
pub const NORMALIZE_MAX_WIDTH: u32 = 1200;
pub const NORMALIZE_MAX_HEIGHT: u32 = 800;

/// Subdirectories of the upload root, one per attachment class.
pub const IMAGES_SUBDIR: &str = "images";
pub const FILES_SUBDIR: &str = "files";

/// Placeholder dropped into every storage directory so that front ends which
/// serve the tree directly refuse directory listings.
pub const DIR_PLACEHOLDER_NAME: &str = "index.html";
pub const DIR_PLACEHOLDER_BODY: &str = "<!DOCTYPE html><html><head><title>403 Forbidden</title></head><body><h1>Directory access is forbidden.</h1></body></html>";

/// Files at or below this size are delivered in a single read; larger files
/// are streamed in fixed-size chunks.
pub const DIRECT_DELIVERY_BUFFER_LIMIT: u64 = 10 * 1024 * 1024;

/// Chunk size for streamed delivery.
pub const DELIVERY_CHUNK_SIZE: usize = 8 * 1024;

/// Format a byte count for human-readable messages ("2.00 MB", "512 bytes").
pub fn format_file_size(bytes: u64) -> String {
    const GB: u64 = 1024 * 1024 * 1024;
    const MB: u64 = 1024 * 1024;
    const KB: u64 = 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}
