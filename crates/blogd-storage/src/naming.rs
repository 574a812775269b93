//! Stored-name generation.
//!
//! Stored names are `{token}_{unix_ts}.{ext}` where the token is a random
//! uuid without hyphens. Uniqueness comes from the token alone; the
//! timestamp is informational, so concurrent uploads of the same original
//! name never collide. The client-supplied name contributes only its
//! lowercased extension and is otherwise kept in the database, never on
//! disk.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use uuid::Uuid;

/// Generate a unique on-disk name for an uploaded file.
pub fn generate_stored_name(original_name: &str) -> String {
    let token = Uuid::new_v4().simple().to_string();
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    match Path::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
    {
        Some(ext) => format!("{}_{}.{}", token, timestamp, ext),
        None => format!("{}_{}", token, timestamp),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn keeps_lowercased_extension_only() {
        let name = generate_stored_name("Vacation Photo.JPG");
        assert!(name.ends_with(".jpg"));
        assert!(!name.contains("Vacation"));
        assert!(!name.contains(' '));
    }

    #[test]
    fn names_are_unique_per_call() {
        let names: HashSet<String> = (0..100)
            .map(|_| generate_stored_name("same.png"))
            .collect();
        assert_eq!(names.len(), 100);
    }

    #[test]
    fn handles_missing_extension() {
        let name = generate_stored_name("README");
        assert!(!name.contains('.'));
    }

    #[test]
    fn token_and_timestamp_are_separated() {
        let name = generate_stored_name("a.pdf");
        let stem = name.strip_suffix(".pdf").unwrap();
        let (token, ts) = stem.split_once('_').unwrap();
        assert_eq!(token.len(), 32);
        assert!(ts.parse::<u64>().is_ok());
    }
}
