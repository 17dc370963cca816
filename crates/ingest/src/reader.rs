use std::path::Path;

use crate::error::IngestError;

/// Formats decoded in-process. Anything else (PDF included) is left to an
/// external loader and rejected here.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["txt", "md"];

pub struct FileReader;

impl FileReader {
    /// Decode raw document bytes, using `filename` only to pick the format.
    pub fn decode(bytes: &[u8], filename: &str) -> Result<String, IngestError> {
        Self::check_supported(filename)?;

        let text = std::str::from_utf8(bytes)
            .map_err(|e| IngestError::Decode(format!("{}: {}", filename, e)))?;
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);

        if text.trim().is_empty() {
            return Err(IngestError::Empty(filename.to_string()));
        }

        Ok(text.to_string())
    }

    fn check_supported(filename: &str) -> Result<(), IngestError> {
        let extension = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        if SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
            Ok(())
        } else if extension.is_empty() {
            Err(IngestError::UnsupportedFormat(format!("{} (no extension)", filename)))
        } else {
            Err(IngestError::UnsupportedFormat(format!(".{}", extension)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_plain_text_and_markdown() {
        assert_eq!(FileReader::decode(b"hello", "notes.txt").unwrap(), "hello");
        assert_eq!(FileReader::decode(b"# Title", "README.MD").unwrap(), "# Title");
    }

    #[test]
    fn test_decode_strips_byte_order_mark() {
        let bytes = "\u{feff}SpaceX".as_bytes();
        assert_eq!(FileReader::decode(bytes, "a.txt").unwrap(), "SpaceX");
    }

    #[test]
    fn test_unsupported_formats_are_rejected() {
        let err = FileReader::decode(b"%PDF-1.7", "report.pdf").unwrap_err();
        assert!(matches!(err, IngestError::UnsupportedFormat(ref ext) if ext == ".pdf"));

        assert!(matches!(
            FileReader::decode(b"data", "Makefile"),
            Err(IngestError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_invalid_utf8_and_empty_documents() {
        assert!(matches!(
            FileReader::decode(&[0xff, 0xfe, 0x00], "a.txt"),
            Err(IngestError::Decode(_))
        ));
        assert!(matches!(
            FileReader::decode(b"  \n\t", "a.txt"),
            Err(IngestError::Empty(_))
        ));
    }
}
