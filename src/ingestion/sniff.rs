//! Delimiter detection by trial parsing.
//!
//! Each candidate delimiter is used to parse a short sample; the candidate that yields the most
//! columns wins. Ties go to the earlier candidate in [`DELIMITER_CANDIDATES`], and when no
//! candidate parses the sample the comma is used.
//!
//! The heuristic only looks at the first few lines, so a delimiter that is rare there (for
//! example in sparse optional trailing fields) can be missed.

use std::path::Path;

use encoding_rs::Encoding;

use super::encoding::{decode_lossy, read_sample};
use crate::error::IngestionResult;

/// Candidate delimiters in priority order.
pub const DELIMITER_CANDIDATES: [u8; 4] = [b',', b';', b'\t', b'|'];

/// Delimiter used when detection cannot decide.
pub const DEFAULT_DELIMITER: u8 = b',';

/// Number of lines (header included) used for trial parses.
pub const SNIFF_LINES: usize = 5;

// Enough bytes for five ordinary lines; longer lines just mean a shorter sample.
const SNIFF_SAMPLE_BYTES: usize = 64 * 1024;

/// Human-readable name of a delimiter.
pub fn delimiter_name(d: u8) -> &'static str {
    match d {
        b',' => "comma",
        b';' => "semicolon",
        b'\t' => "tab",
        b'|' => "pipe",
        _ => "custom",
    }
}

/// Column count produced by parsing `sample` with `delimiter`.
///
/// The header row sets the width. Returns `None` if the sample has no header or any row is wider
/// than the header, mirroring how the full parse treats such input.
pub fn trial_column_count(sample: &str, delimiter: u8) -> Option<usize> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(sample.as_bytes());

    let width = rdr.headers().ok()?.len();
    if width == 0 {
        return None;
    }
    for record in rdr.records() {
        let record = record.ok()?;
        if record.len() > width {
            return None;
        }
    }
    Some(width)
}

/// Pick the delimiter for `sample`.
///
/// Returns `None` when no candidate produced a parse.
pub fn detect_delimiter(sample: &str) -> Option<u8> {
    let mut best: Option<(u8, usize)> = None;
    for &candidate in &DELIMITER_CANDIDATES {
        let Some(count) = trial_column_count(sample, candidate) else {
            continue;
        };
        if best.is_none_or(|(_, max)| count > max) {
            best = Some((candidate, count));
        }
    }
    best.map(|(d, _)| d)
}

/// First `n` lines of `text`, each with its line terminator.
pub fn first_lines(text: &str, n: usize) -> &str {
    let mut end = 0;
    for (count, (idx, _)) in text.match_indices('\n').enumerate() {
        end = idx + 1;
        if count + 1 == n {
            return &text[..end];
        }
    }
    if end < text.len() { text } else { &text[..end] }
}

/// Read the first [`SNIFF_LINES`] lines of `path` decoded with `encoding`.
pub fn read_sample_lines(path: &Path, encoding: &'static Encoding) -> IngestionResult<String> {
    let bytes = read_sample(path, SNIFF_SAMPLE_BYTES)?;
    let text = decode_lossy(&bytes, encoding);
    Ok(first_lines(&text, SNIFF_LINES).to_string())
}

/// Detect the delimiter of the file at `path`, falling back to [`DEFAULT_DELIMITER`].
pub fn detect_delimiter_for_path(path: &Path, encoding: &'static Encoding) -> u8 {
    let sample = match read_sample_lines(path, encoding) {
        Ok(sample) => sample,
        Err(e) => {
            log::warn!("could not detect delimiter of '{}': {e}; using comma", path.display());
            return DEFAULT_DELIMITER;
        }
    };

    match detect_delimiter(&sample) {
        Some(d) => {
            log::info!("detected delimiter {:?} ({})", d as char, delimiter_name(d));
            d
        }
        None => {
            log::warn!(
                "could not detect delimiter of '{}': no candidate parsed the sample; using comma",
                path.display()
            );
            DEFAULT_DELIMITER
        }
    }
}
