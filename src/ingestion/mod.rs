//! Loaders that turn files into in-memory [`crate::types::DataSet`]s.
//!
//! Every loader implements [`TabularDocument`], so the integrity, cleaning and description
//! operations work the same regardless of source:
//!
//! - [`DelimitedTextLoader`]: `.csv` / `.txt` / `.tsv`, with encoding and delimiter detection
//! - [`SpreadsheetLoader`] (Cargo feature `excel`): `.xlsx` / `.xls` / `.xlsm`, one sheet at a time
//!
//! `load()` never panics or propagates errors: it returns `false` and keeps the error available
//! through [`TabularDocument::last_error`]. Outcomes can also be reported to an
//! [`IngestionObserver`].
//!
//! Lower-level pieces are public too:
//! - [`encoding`]: byte-order-mark / statistical encoding detection
//! - [`sniff`]: delimiter detection
//! - [`csv`]: delimited text parsing with type inference

use std::path::Path;

pub mod csv;
pub mod delimited;
pub mod document;
pub mod encoding;
#[cfg(feature = "excel")]
pub mod excel;
pub mod infer;
pub mod observability;
pub mod sniff;

pub use delimited::{DelimitedFileInfo, DelimitedTextLoader, DELIMITED_EXTENSIONS};
pub use document::{DocumentCore, TabularDocument};
#[cfg(feature = "excel")]
pub use excel::{SheetEntry, SpreadsheetLoader, SPREADSHEET_EXTENSIONS};
pub use observability::{
    CompositeObserver, IngestionContext, IngestionObserver, IngestionSeverity, IngestionStats, LogObserver, SourceFormat,
};

/// Log a warning when `path` does not carry one of `extensions` (case-insensitive).
///
/// Loading continues either way.
pub(crate) fn warn_on_unrecognized_extension(path: &Path, extensions: &[&str]) {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    if !extensions.iter().any(|e| *e == ext) {
        let valid: Vec<String> = extensions.iter().map(|e| format!(".{e}")).collect();
        log::warn!(
            "'{}' has an unrecognized extension; expected one of {}",
            path.display(),
            valid.join(", ")
        );
    }
}
