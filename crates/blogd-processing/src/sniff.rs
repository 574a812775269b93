//! Content-type sniffing
//!
//! The client-declared Content-Type of a multipart part is attacker
//! controlled, so validation runs against the sniffed type of the actual
//! bytes wherever the signature database can identify them.

use std::fs::File;
use std::io::Read;
use std::path::Path;

// infer only needs the leading bytes of the file.
const SNIFF_BUFFER_SIZE: usize = 8192;

/// Sniff the MIME type of an in-memory buffer.
pub fn sniff_bytes(data: &[u8]) -> Option<&'static str> {
    infer::get(data).map(|kind| kind.mime_type())
}

/// Sniff the MIME type of a file on disk from its leading bytes.
pub fn sniff_file(path: &Path) -> std::io::Result<Option<&'static str>> {
    let mut file = File::open(path)?;
    let mut buffer = vec![0u8; SNIFF_BUFFER_SIZE];
    let read = file.read(&mut buffer)?;
    buffer.truncate(read);
    Ok(sniff_bytes(&buffer))
}

/// MIME type to validate against: the sniffed type when the signature
/// database recognizes the bytes, otherwise the declared type. Plain-text
/// formats (txt, csv) carry no magic bytes, so the declared type is the only
/// signal for them; the allow-lists still constrain what it may be.
pub fn effective_mime(sniffed: Option<&str>, declared: &str) -> String {
    match sniffed {
        Some(mime) => mime.to_lowercase(),
        None => {
            tracing::debug!(
                declared = %declared,
                "content not recognized by sniffer, falling back to declared type"
            );
            declared.to_lowercase()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const PNG_MAGIC: &[u8] = &[
        0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x00, 0x00, 0x0d,
    ];

    #[test]
    fn sniffs_png_magic() {
        assert_eq!(sniff_bytes(PNG_MAGIC), Some("image/png"));
    }

    #[test]
    fn sniffs_pdf_magic() {
        assert_eq!(sniff_bytes(b"%PDF-1.7 rest of document"), Some("application/pdf"));
    }

    #[test]
    fn plain_text_is_unrecognized() {
        assert_eq!(sniff_bytes(b"just some text"), None);
    }

    #[test]
    fn sniff_file_reads_leading_bytes() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(PNG_MAGIC).unwrap();
        tmp.flush().unwrap();
        assert_eq!(sniff_file(tmp.path()).unwrap(), Some("image/png"));
    }

    #[test]
    fn effective_mime_prefers_sniffed() {
        assert_eq!(effective_mime(Some("image/png"), "text/plain"), "image/png");
        assert_eq!(effective_mime(None, "TEXT/Plain"), "text/plain");
    }
}
