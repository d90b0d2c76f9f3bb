//! Character encoding detection and decoding for delimited text.
//!
//! Detection order on a raw byte sample:
//!
//! 1. a byte-order mark, if present
//! 2. UTF-8, if the sample is valid UTF-8 (a multi-byte sequence cut off by the sample end is
//!    tolerated)
//! 3. the statistical guess from [`chardetng`]
//!
//! Labels supplied by users are resolved through the WHATWG label table in [`encoding_rs`], with
//! a little normalization so that common spellings such as `latin-1` or `UTF_8` are accepted.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8};

use crate::error::{IngestionError, IngestionResult};

/// Number of leading bytes inspected by [`detect_encoding_for_path`].
pub const ENCODING_SAMPLE_BYTES: usize = 10_000;

/// How an encoding was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionMethod {
    /// A byte-order mark identified the encoding.
    ByteOrderMark,
    /// The sample is valid UTF-8.
    ValidUtf8,
    /// Statistical guess over the sample.
    Statistical,
    /// Detection failed and the UTF-8 default was used.
    Fallback,
}

/// Result of running detection over a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectedEncoding {
    pub encoding: &'static Encoding,
    pub method: DetectionMethod,
}

impl DetectedEncoding {
    fn fallback() -> Self {
        Self {
            encoding: UTF_8,
            method: DetectionMethod::Fallback,
        }
    }
}

/// Read at most `limit` bytes from the start of `path`.
pub fn read_sample(path: &Path, limit: usize) -> IngestionResult<Vec<u8>> {
    let file = File::open(path).map_err(|e| IngestionError::from_io(path, e))?;
    let mut buf = Vec::with_capacity(limit.min(64 * 1024));
    file.take(limit as u64)
        .read_to_end(&mut buf)
        .map_err(|e| IngestionError::from_io(path, e))?;
    Ok(buf)
}

/// Detect the encoding of a byte sample.
///
/// Returns `None` for an empty sample, since there is nothing to base a guess on.
pub fn detect_encoding(sample: &[u8]) -> Option<DetectedEncoding> {
    if sample.is_empty() {
        return None;
    }

    if let Some((encoding, _bom_len)) = Encoding::for_bom(sample) {
        return Some(DetectedEncoding {
            encoding,
            method: DetectionMethod::ByteOrderMark,
        });
    }

    if is_utf8_prefix(sample) {
        return Some(DetectedEncoding {
            encoding: UTF_8,
            method: DetectionMethod::ValidUtf8,
        });
    }

    let mut detector = EncodingDetector::new();
    detector.feed(sample, true);
    Some(DetectedEncoding {
        encoding: detector.guess(None, true),
        method: DetectionMethod::Statistical,
    })
}

/// Detect the encoding of the file at `path` from its first [`ENCODING_SAMPLE_BYTES`] bytes.
///
/// Never fails: an unreadable or empty sample yields UTF-8 with [`DetectionMethod::Fallback`].
pub fn detect_encoding_for_path(path: &Path) -> DetectedEncoding {
    let sample = match read_sample(path, ENCODING_SAMPLE_BYTES) {
        Ok(sample) => sample,
        Err(e) => {
            log::warn!("could not detect encoding of '{}': {e}; using utf-8", path.display());
            return DetectedEncoding::fallback();
        }
    };

    match detect_encoding(&sample) {
        Some(detected) => {
            log::info!(
                "detected encoding {} ({:?}) for '{}'",
                detected.encoding.name(),
                detected.method,
                path.display()
            );
            detected
        }
        None => {
            log::warn!("could not detect encoding of '{}': empty sample; using utf-8", path.display());
            DetectedEncoding::fallback()
        }
    }
}

/// Resolve a user-supplied encoding label.
pub fn resolve_label(label: &str) -> Option<&'static Encoding> {
    let trimmed = label.trim();
    if let Some(enc) = Encoding::for_label(trimmed.as_bytes()) {
        return Some(enc);
    }
    let squashed: String = trimmed
        .chars()
        .filter(|c| *c != '-' && *c != '_')
        .collect::<String>()
        .to_ascii_lowercase();
    Encoding::for_label(squashed.as_bytes())
}

/// Resolve `label`, failing with [`IngestionError::Encoding`] when it is unknown.
pub fn require_label(label: &str) -> IngestionResult<&'static Encoding> {
    resolve_label(label).ok_or_else(|| IngestionError::Encoding {
        encoding: label.to_string(),
        message: "unknown encoding label".to_string(),
    })
}

/// Decode `bytes` completely, stripping a BOM that matches `encoding`.
///
/// Malformed input is an error rather than being replaced with U+FFFD.
pub fn decode(bytes: &[u8], encoding: &'static Encoding) -> IngestionResult<String> {
    let (text, had_errors) = encoding.decode_with_bom_removal(bytes);
    if had_errors {
        let message = if encoding == UTF_8 {
            match std::str::from_utf8(bytes) {
                Err(e) => format!("invalid utf-8 sequence at byte {}", e.valid_up_to()),
                Ok(_) => "invalid byte sequence".to_string(),
            }
        } else {
            "invalid byte sequence".to_string()
        };
        return Err(IngestionError::Encoding {
            encoding: encoding.name().to_string(),
            message,
        });
    }
    Ok(text.into_owned())
}

/// Decode a sample that may end in the middle of a character; malformed bytes are replaced.
pub(crate) fn decode_lossy(bytes: &[u8], encoding: &'static Encoding) -> String {
    let (text, _had_errors) = encoding.decode_with_bom_removal(bytes);
    text.into_owned()
}

/// Encode `text` for writing with `encoding`.
///
/// Characters the encoding cannot represent are an error, and so is an encoding that has no
/// encoder of its own (UTF-16 and `replacement` would silently produce UTF-8).
pub fn encode(text: &str, encoding: &'static Encoding) -> IngestionResult<Vec<u8>> {
    let (bytes, used, had_errors) = encoding.encode(text);
    if used != encoding {
        return Err(IngestionError::Encoding {
            encoding: encoding.name().to_string(),
            message: format!("writing is not supported for this encoding (it would produce {})", used.name()),
        });
    }
    if had_errors {
        return Err(IngestionError::Encoding {
            encoding: used.name().to_string(),
            message: "text contains characters the encoding cannot represent".to_string(),
        });
    }
    Ok(bytes.into_owned())
}

fn is_utf8_prefix(sample: &[u8]) -> bool {
    match std::str::from_utf8(sample) {
        Ok(_) => true,
        // error_len() == None means the input ended inside a multi-byte sequence.
        Err(e) => e.error_len().is_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_sample_is_utf8() {
        let detected = detect_encoding(b"id,name\n1,Ada\n").unwrap();
        assert_eq!(detected.encoding, UTF_8);
        assert_eq!(detected.method, DetectionMethod::ValidUtf8);
    }

    #[test]
    fn truncated_multibyte_tail_still_counts_as_utf8() {
        // "é" is 0xC3 0xA9; cut after the lead byte.
        let detected = detect_encoding(b"name\ncaf\xC3").unwrap();
        assert_eq!(detected.encoding, UTF_8);
    }

    #[test]
    fn bom_wins() {
        let detected = detect_encoding(b"\xFF\xFEa\x00,\x00b\x00").unwrap();
        assert_eq!(detected.encoding, encoding_rs::UTF_16LE);
        assert_eq!(detected.method, DetectionMethod::ByteOrderMark);
    }

    #[test]
    fn latin1_bytes_are_not_reported_as_utf8() {
        let sample = b"ciudad,poblaci\xF3n\nM\xE1laga,578460\nC\xF3rdoba,322071\n";
        let detected = detect_encoding(sample).unwrap();
        assert_ne!(detected.encoding, UTF_8);
        assert_eq!(detected.method, DetectionMethod::Statistical);
    }

    #[test]
    fn empty_sample_has_no_guess() {
        assert!(detect_encoding(b"").is_none());
    }

    #[test]
    fn unreadable_path_falls_back_to_utf8() {
        let detected = detect_encoding_for_path(Path::new("definitely/not/here.csv"));
        assert_eq!(detected.encoding, UTF_8);
        assert_eq!(detected.method, DetectionMethod::Fallback);
    }

    #[test]
    fn labels_are_normalized() {
        assert_eq!(resolve_label("utf-8"), Some(UTF_8));
        assert_eq!(resolve_label("UTF_8"), Some(UTF_8));
        assert_eq!(resolve_label("latin-1"), Some(encoding_rs::WINDOWS_1252));
        assert_eq!(resolve_label("cp1252"), Some(encoding_rs::WINDOWS_1252));
        assert!(resolve_label("klingon").is_none());
    }

    #[test]
    fn decode_rejects_invalid_utf8() {
        let err = decode(b"a,b\n\xFF\xFE\xFD,1\n", UTF_8).unwrap_err();
        assert!(matches!(err, IngestionError::Encoding { .. }));
        assert!(err.to_string().contains("latin-1"));
    }

    #[test]
    fn encode_refuses_encodings_without_an_encoder() {
        let err = encode("a,b\n", encoding_rs::UTF_16LE).unwrap_err();
        assert!(matches!(err, IngestionError::Encoding { ref encoding, .. } if encoding == "UTF-16LE"));
        assert_eq!(encode("caf\u{e9}", encoding_rs::WINDOWS_1252).unwrap(), b"caf\xE9".to_vec());
    }

    #[test]
    fn decode_strips_utf8_bom() {
        let text = decode(b"\xEF\xBB\xBFa,b\n", UTF_8).unwrap();
        assert_eq!(text, "a,b\n");
    }
}
