//! Per-class upload validation
//!
//! Checks run in a fixed order so the first (cheapest) failure wins:
//! transfer error, then size against the class cap, then MIME type and
//! extension against the class allow-lists. Content inspection only happens
//! after the transport succeeded.

use std::path::Path;

use blogd_core::{AppError, ClassRules, TransferError};

/// Validator for one attachment class, built from its [`ClassRules`].
///
/// MIME types and extensions are two independent allow-lists; a file must
/// pass both. An extension can sit in its table ahead of its MIME type being
/// enabled, and it stays blocked until then.
pub struct UploadValidator {
    rules: ClassRules,
}

impl UploadValidator {
    pub fn new(rules: ClassRules) -> Self {
        Self { rules }
    }

    /// Transfer-layer failure check. Runs first and maps each transport
    /// failure without looking at content.
    pub fn check_transfer(&self, transfer_error: Option<TransferError>) -> Result<(), AppError> {
        match transfer_error {
            Some(err) => Err(AppError::Transfer(err)),
            None => Ok(()),
        }
    }

    /// Size check against the class cap.
    pub fn check_size(&self, size: u64) -> Result<(), AppError> {
        if size == 0 {
            return Err(AppError::Transfer(TransferError::NoFile));
        }
        if size > self.rules.max_size_bytes {
            return Err(AppError::TooLargeForPolicy {
                size,
                limit: self.rules.max_size_bytes,
            });
        }
        Ok(())
    }

    /// MIME allow-list check. `mime` should be the sniffed type of the
    /// actual bytes, not the client-declared one.
    pub fn check_mime(&self, mime: &str) -> Result<(), AppError> {
        let normalized = mime.to_lowercase();
        if !self.rules.allowed_mime_types.contains(&normalized) {
            return Err(AppError::UnsupportedType(normalized));
        }
        Ok(())
    }

    /// Extension allow-list check, lowercased. A missing extension fails.
    pub fn check_extension(&self, original_name: &str) -> Result<(), AppError> {
        let extension = Path::new(original_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .ok_or_else(|| {
                AppError::UnsupportedType(format!("no file extension on '{}'", original_name))
            })?;

        if !self.rules.allowed_extensions.contains(&extension) {
            return Err(AppError::UnsupportedType(format!(".{}", extension)));
        }
        Ok(())
    }

    /// Run every check in order: transfer, size, MIME, extension.
    pub fn validate(
        &self,
        original_name: &str,
        mime: &str,
        size: u64,
        transfer_error: Option<TransferError>,
    ) -> Result<(), AppError> {
        self.check_transfer(transfer_error)?;
        self.check_size(size)?;
        self.check_mime(mime)?;
        self.check_extension(original_name)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image_rules() -> ClassRules {
        ClassRules {
            max_size_bytes: 5 * 1024 * 1024,
            space_margin_bytes: 5 * 1024 * 1024,
            allowed_mime_types: vec![
                "image/jpeg".to_string(),
                "image/png".to_string(),
                "image/gif".to_string(),
                "image/webp".to_string(),
            ],
            allowed_extensions: vec![
                "jpg".to_string(),
                "jpeg".to_string(),
                "png".to_string(),
                "gif".to_string(),
                "webp".to_string(),
            ],
        }
    }

    fn file_rules() -> ClassRules {
        ClassRules {
            max_size_bytes: 10 * 1024 * 1024,
            space_margin_bytes: 10 * 1024 * 1024,
            allowed_mime_types: vec![
                "application/pdf".to_string(),
                "application/msword".to_string(),
            ],
            allowed_extensions: vec![
                "pdf".to_string(),
                "doc".to_string(),
                "docx".to_string(),
                "zip".to_string(),
                "txt".to_string(),
            ],
        }
    }

    #[test]
    fn transfer_error_wins_over_everything() {
        let validator = UploadValidator::new(image_rules());
        let result = validator.validate(
            "huge.exe",
            "application/octet-stream",
            100 * 1024 * 1024,
            Some(TransferError::Partial),
        );
        assert!(matches!(
            result,
            Err(AppError::Transfer(TransferError::Partial))
        ));
    }

    #[test]
    fn oversized_image_rejected_at_cap() {
        let validator = UploadValidator::new(image_rules());
        assert!(validator.check_size(5 * 1024 * 1024).is_ok());
        assert!(matches!(
            validator.check_size(5 * 1024 * 1024 + 1),
            Err(AppError::TooLargeForPolicy { .. })
        ));
    }

    #[test]
    fn empty_file_is_a_transfer_failure() {
        let validator = UploadValidator::new(image_rules());
        assert!(matches!(
            validator.check_size(0),
            Err(AppError::Transfer(TransferError::NoFile))
        ));
    }

    #[test]
    fn mime_check_is_case_insensitive() {
        let validator = UploadValidator::new(image_rules());
        assert!(validator.check_mime("IMAGE/PNG").is_ok());
        assert!(validator.check_mime("image/svg+xml").is_err());
    }

    #[test]
    fn extension_check_lowercases() {
        let validator = UploadValidator::new(image_rules());
        assert!(validator.check_extension("photo.JPG").is_ok());
        assert!(validator.check_extension("script.php").is_err());
        assert!(validator.check_extension("noextension").is_err());
    }

    #[test]
    fn both_tables_must_pass() {
        // txt is in the extension table but text/plain is not in the MIME
        // table, so a text file stays blocked.
        let validator = UploadValidator::new(file_rules());
        let result = validator.validate("notes.txt", "text/plain", 1024, None);
        assert!(matches!(result, Err(AppError::UnsupportedType(_))));

        let result = validator.validate("paper.pdf", "application/pdf", 1024, None);
        assert!(result.is_ok());
    }

    #[test]
    fn classes_do_not_cross_apply() {
        let images = UploadValidator::new(image_rules());
        let files = UploadValidator::new(file_rules());
        assert!(images.check_mime("application/pdf").is_err());
        assert!(files.check_mime("image/png").is_err());
    }
}
