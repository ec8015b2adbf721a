//! Encoding detection for snapshot exports.
//!
//! Tab exports are normally UTF-8, but files saved by some browsers or edited on
//! Windows arrive as UTF-16 with a BOM or in a legacy code page. This module turns
//! whatever is on disk into a `String`:
//! - BOM detection (UTF-8, UTF-16 LE/BE)
//! - UTF-8 fast-path with strict validation
//! - Fallback encoding detection using chardetng
//! - Replacement characters as the last resort

use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8};
use std::path::Path;

use crate::error::{Error, Result};

/// Decode raw bytes, returning the text and the label of the encoding used.
pub fn decode_bytes(bytes: &[u8]) -> (String, &'static str) {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        let (decoded, _had_errors) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
        return (decoded.into_owned(), encoding.name());
    }

    if let Ok(text) = std::str::from_utf8(bytes) {
        return (text.to_string(), UTF_8.name());
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let encoding = detector.guess(None, true);
    let (decoded, _encoding_used, _had_errors) = encoding.decode(bytes);
    (decoded.into_owned(), encoding.name())
}

/// Read a file as text with encoding detection.
pub fn read_file_safe(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).map_err(|e| Error::io(path, e))?;
    let (content, encoding) = decode_bytes(&bytes);
    if encoding != UTF_8.name() {
        tracing::debug!("decoded {} as {}", path.display(), encoding);
    }
    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_decode_utf8() {
        let (text, enc) = decode_bytes("https://example.com/🚀".as_bytes());
        assert_eq!(text, "https://example.com/🚀");
        assert_eq!(enc, "UTF-8");
    }

    #[test]
    fn test_decode_utf8_bom_is_stripped() {
        let mut bytes = vec![0xef, 0xbb, 0xbf];
        bytes.extend_from_slice(b"{\"tabs\": []}");
        let (text, enc) = decode_bytes(&bytes);
        assert_eq!(text, "{\"tabs\": []}");
        assert_eq!(enc, "UTF-8");
    }

    #[test]
    fn test_decode_utf16_le_bom() {
        let mut bytes = vec![0xff, 0xfe];
        for unit in "https://a.test".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        let (text, enc) = decode_bytes(&bytes);
        assert_eq!(text, "https://a.test");
        assert_eq!(enc, "UTF-16LE");
    }

    #[test]
    fn test_decode_legacy_code_page_fallback() {
        let original = "Les réunions du café déménagent à côté de la médiathèque, première étape.";
        let (bytes, _, _) = encoding_rs::WINDOWS_1252.encode(original);
        assert!(std::str::from_utf8(&bytes).is_err());
        let (text, _) = decode_bytes(&bytes);
        assert_eq!(text, original);
    }

    #[test]
    fn test_read_file_safe_utf8() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all("Test content 🚀".as_bytes()).unwrap();
        file.flush().unwrap();

        let content = read_file_safe(file.path()).unwrap();
        assert_eq!(content, "Test content 🚀");
    }

    #[test]
    fn test_read_file_safe_missing_file_is_io_error() {
        let err = read_file_safe(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
