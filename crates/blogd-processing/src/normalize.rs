//! Image normalization
//!
//! Rewrites oversized images in place so stored files never exceed the
//! display bounds. Files the decoder cannot handle are skipped, not
//! rejected: by the time normalization runs the file has already passed
//! validation and been stored, and a skipped normalization only means the
//! original bytes are kept.

use std::fs;
use std::io::Cursor;
use std::path::Path;

use blogd_core::constants::{NORMALIZE_MAX_HEIGHT, NORMALIZE_MAX_WIDTH};
use blogd_core::AppError;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{GenericImageView, ImageFormat, ImageReader};

const JPEG_QUALITY: u8 = 85;

/// Normalize with the standard display bounds.
pub fn normalize_image(path: &Path) -> Result<bool, AppError> {
    normalize_image_with_bounds(path, NORMALIZE_MAX_WIDTH, NORMALIZE_MAX_HEIGHT)
}

/// Resize the image at `path` to fit within `max_width` x `max_height`,
/// preserving aspect ratio, and re-encode it in its original format.
///
/// Returns `Ok(false)` when the file is not a supported image or cannot be
/// decoded (the file is left untouched). Returns `Ok(true)` when the image
/// was handled, whether or not a resize was needed; within-bounds images are
/// never re-encoded. Images are never upscaled.
pub fn normalize_image_with_bounds(
    path: &Path,
    max_width: u32,
    max_height: u32,
) -> Result<bool, AppError> {
    let reader = match ImageReader::open(path).and_then(|r| r.with_guessed_format()) {
        Ok(reader) => reader,
        Err(err) => {
            tracing::debug!(path = %path.display(), error = %err, "unreadable image, skipping normalization");
            return Ok(false);
        }
    };

    // Only JPEG, PNG and GIF are rewritten; everything else (WebP included)
    // keeps its original bytes and reports skipped.
    let format = match reader.format() {
        Some(format @ (ImageFormat::Jpeg | ImageFormat::Png | ImageFormat::Gif)) => format,
        _ => return Ok(false),
    };

    let img = match reader.decode() {
        Ok(img) => img,
        Err(err) => {
            tracing::debug!(path = %path.display(), error = %err, "undecodable image, skipping normalization");
            return Ok(false);
        }
    };

    let (width, height) = img.dimensions();
    if width <= max_width && height <= max_height {
        return Ok(true);
    }

    // resize() picks the uniform factor that fits both bounds.
    let resized = img.resize(max_width, max_height, FilterType::Lanczos3);
    let (new_width, new_height) = resized.dimensions();

    let mut buffer = Vec::new();
    let mut cursor = Cursor::new(&mut buffer);
    let encode_result = match format {
        ImageFormat::Jpeg => {
            let encoder = JpegEncoder::new_with_quality(&mut cursor, JPEG_QUALITY);
            // JPEG has no alpha channel.
            resized.to_rgb8().write_with_encoder(encoder)
        }
        // PNG keeps whatever channels the source had, alpha included.
        ImageFormat::Png => resized.write_to(&mut cursor, ImageFormat::Png),
        ImageFormat::Gif => resized.write_to(&mut cursor, ImageFormat::Gif),
        _ => unreachable!("format filtered above"),
    };
    encode_result.map_err(|err| AppError::StorageWrite(format!("image re-encode failed: {}", err)))?;

    fs::write(path, &buffer)
        .map_err(|err| AppError::StorageWrite(format!("image rewrite failed: {}", err)))?;

    tracing::debug!(
        path = %path.display(),
        from = %format!("{}x{}", width, height),
        to = %format!("{}x{}", new_width, new_height),
        "image normalized"
    );
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgba, RgbaImage};
    use std::io::Write;

    fn write_image(
        width: u32,
        height: u32,
        pixel: Rgba<u8>,
        format: ImageFormat,
    ) -> tempfile::NamedTempFile {
        let img = RgbaImage::from_pixel(width, height, pixel);
        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), format).unwrap();
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(&buffer).unwrap();
        tmp.flush().unwrap();
        tmp
    }

    fn write_png(width: u32, height: u32, pixel: Rgba<u8>) -> tempfile::NamedTempFile {
        write_image(width, height, pixel, ImageFormat::Png)
    }

    // The temp files have no extension, so re-reading must sniff the
    // format from the bytes rather than the path.
    fn reopen(path: &Path) -> DynamicImage {
        ImageReader::open(path)
            .unwrap()
            .with_guessed_format()
            .unwrap()
            .decode()
            .unwrap()
    }

    #[test]
    fn within_bounds_image_is_untouched() {
        let tmp = write_png(800, 600, Rgba([10, 20, 30, 255]));
        let before = fs::read(tmp.path()).unwrap();

        let handled = normalize_image_with_bounds(tmp.path(), 1200, 800).unwrap();

        assert!(handled);
        assert_eq!(fs::read(tmp.path()).unwrap(), before);
    }

    #[test]
    fn oversized_image_is_resized_with_aspect_preserved() {
        let tmp = write_png(2400, 1200, Rgba([0, 0, 0, 255]));

        let handled = normalize_image_with_bounds(tmp.path(), 1200, 800).unwrap();
        assert!(handled);

        // Width is the binding dimension: factor 0.5.
        assert_eq!(reopen(tmp.path()).dimensions(), (1200, 600));
    }

    #[test]
    fn height_can_be_the_binding_dimension() {
        let tmp = write_png(1000, 1600, Rgba([0, 0, 0, 255]));

        normalize_image_with_bounds(tmp.path(), 1200, 800).unwrap();

        assert_eq!(reopen(tmp.path()).dimensions(), (500, 800));
    }

    #[test]
    fn png_alpha_survives_resize() {
        let tmp = write_png(2400, 1600, Rgba([255, 0, 0, 128]));

        normalize_image_with_bounds(tmp.path(), 1200, 800).unwrap();

        assert!(reopen(tmp.path()).color().has_alpha());
    }

    #[test]
    fn oversized_webp_is_left_untouched() {
        let tmp = write_image(2400, 1200, Rgba([7, 7, 7, 255]), ImageFormat::WebP);
        let before = fs::read(tmp.path()).unwrap();

        let handled = normalize_image_with_bounds(tmp.path(), 1200, 800).unwrap();

        assert!(!handled);
        assert_eq!(fs::read(tmp.path()).unwrap(), before);
    }

    #[test]
    fn non_image_content_is_skipped_not_rejected() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"%PDF-1.7 definitely not pixels").unwrap();
        tmp.flush().unwrap();
        let before = fs::read(tmp.path()).unwrap();

        let handled = normalize_image(tmp.path()).unwrap();

        assert!(!handled);
        assert_eq!(fs::read(tmp.path()).unwrap(), before);
    }

    #[test]
    fn jpeg_is_reencoded_as_jpeg() {
        let img = RgbaImage::from_pixel(2400, 1200, Rgba([100, 100, 100, 255]));
        let mut buffer = Vec::new();
        DynamicImage::ImageRgba8(img)
            .to_rgb8()
            .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Jpeg)
            .unwrap();
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(&buffer).unwrap();
        tmp.flush().unwrap();

        normalize_image_with_bounds(tmp.path(), 1200, 800).unwrap();

        let reader = ImageReader::open(tmp.path())
            .unwrap()
            .with_guessed_format()
            .unwrap();
        assert_eq!(reader.format(), Some(ImageFormat::Jpeg));
    }
}
