//! Loader for delimited text files.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use encoding_rs::Encoding;

use crate::config::DelimitedOptions;
use crate::error::{IngestionError, IngestionResult};
use crate::persist;
use crate::types::DataSet;

use super::csv::parse_delimited_text;
use super::document::{DocumentCore, TabularDocument};
use super::encoding::{decode, detect_encoding_for_path, require_label};
use super::observability::{IngestionObserver, IngestionSeverity, SourceFormat};
use super::sniff::{delimiter_name, detect_delimiter_for_path};
use super::warn_on_unrecognized_extension;

/// Extensions recognized as delimited text (anything else only triggers a warning).
pub const DELIMITED_EXTENSIONS: [&str; 3] = ["csv", "txt", "tsv"];

/// Loads a delimited text file, detecting encoding and delimiter unless they are given.
///
/// ```no_run
/// use tabular_ingest::ingestion::{DelimitedTextLoader, TabularDocument};
///
/// let mut doc = DelimitedTextLoader::new("sales.csv");
/// if doc.load() {
///     println!("delimiter={:?} encoding={:?}", doc.delimiter().map(char::from), doc.encoding());
///     println!("{}", doc.describe_summary().unwrap());
/// }
/// ```
#[derive(Debug)]
pub struct DelimitedTextLoader {
    core: DocumentCore,
    explicit_delimiter: Option<u8>,
    explicit_encoding: Option<String>,
    detected_delimiter: Option<u8>,
    detected_encoding: Option<&'static Encoding>,
}

impl DelimitedTextLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            core: DocumentCore::new(path, SourceFormat::Delimited),
            explicit_delimiter: None,
            explicit_encoding: None,
            detected_delimiter: None,
            detected_encoding: None,
        }
    }

    /// Build a loader from deserialized options.
    ///
    /// A non-ASCII delimiter cannot be used by the parser; it is ignored with a warning and the
    /// delimiter is detected instead.
    pub fn from_options(path: impl Into<PathBuf>, options: &DelimitedOptions) -> Self {
        let mut loader = Self::new(path);
        if let Some(c) = options.delimiter {
            match u8::try_from(c) {
                Ok(b) if c.is_ascii() => loader.explicit_delimiter = Some(b),
                _ => log::warn!("ignoring non-ASCII delimiter {c:?}"),
            }
        }
        loader.explicit_encoding = options.encoding.clone();
        loader
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.explicit_delimiter = Some(delimiter);
        self
    }

    pub fn with_encoding(mut self, label: impl Into<String>) -> Self {
        self.explicit_encoding = Some(label.into());
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn IngestionObserver>, alert_at_or_above: IngestionSeverity) -> Self {
        self.core.set_observer(observer, alert_at_or_above);
        self
    }

    /// Effective delimiter: the explicit one, else the one detected by the last load.
    pub fn delimiter(&self) -> Option<u8> {
        self.explicit_delimiter.or(self.detected_delimiter)
    }

    /// Effective encoding: the explicit label, else the name of the detected encoding.
    pub fn encoding(&self) -> Option<String> {
        self.explicit_encoding
            .clone()
            .or_else(|| self.detected_encoding.map(|e| e.name().to_string()))
    }

    pub fn detected_delimiter(&self) -> Option<u8> {
        self.detected_delimiter
    }

    pub fn detected_encoding(&self) -> Option<&'static Encoding> {
        self.detected_encoding
    }

    fn try_load(&mut self) -> IngestionResult<DataSet> {
        let path = self.core.source().to_path_buf();
        log::info!("loading delimited file '{}'", path.display());
        warn_on_unrecognized_extension(&path, &DELIMITED_EXTENSIONS);

        let encoding = match self.explicit_encoding.as_deref() {
            Some(label) => require_label(label)?,
            None => {
                let detected = detect_encoding_for_path(&path).encoding;
                self.detected_encoding = Some(detected);
                detected
            }
        };

        let delimiter = match self.explicit_delimiter {
            Some(d) => d,
            None => {
                let detected = detect_delimiter_for_path(&path, encoding);
                self.detected_delimiter = Some(detected);
                detected
            }
        };

        let bytes = std::fs::read(&path).map_err(|e| IngestionError::from_io(&path, e))?;
        let text = decode(&bytes, encoding)?;
        parse_delimited_text(&text, delimiter)
    }

    /// Change the explicit delimiter and/or encoding and reload if anything changed.
    ///
    /// `None` leaves a setting as it is. Returns the result of the reload, or `false` when no
    /// setting changed.
    pub fn change_load_parameters(&mut self, delimiter: Option<u8>, encoding: Option<&str>) -> bool {
        let mut changes: Vec<String> = Vec::new();

        if let Some(d) = delimiter.filter(|d| Some(*d) != self.explicit_delimiter) {
            self.explicit_delimiter = Some(d);
            changes.push(format!("delimiter -> {:?}", d as char));
        }
        if let Some(e) = encoding.filter(|e| Some(*e) != self.explicit_encoding.as_deref()) {
            self.explicit_encoding = Some(e.to_string());
            changes.push(format!("encoding -> {e}"));
        }

        if changes.is_empty() {
            log::warn!("no load parameters changed; not reloading");
            return false;
        }
        log::info!("applying changes: {}", changes.join(", "));
        self.load()
    }

    /// Path, effective encoding/delimiter and, when loaded, shape and leading column names.
    pub fn file_info(&self) -> DelimitedFileInfo {
        let table = self.core.table();
        let column_preview = table
            .map(|t| {
                let names = t.column_names();
                let mut out: Vec<String> = names.iter().take(5).cloned().collect();
                if names.len() > 5 {
                    out.push("...".to_string());
                    out.push(format!("({} columns total)", names.len()));
                }
                out
            })
            .unwrap_or_default();

        DelimitedFileInfo {
            path: self.core.source().to_path_buf(),
            encoding: self.encoding(),
            delimiter: self.delimiter().map(char::from),
            shape: table.map(|t| (t.row_count(), t.column_count())),
            column_preview,
        }
    }

    /// Write the current table to `dest` as delimited text with the given delimiter and encoding.
    pub fn export_with_parameters(&self, dest: impl AsRef<Path>, delimiter: u8, encoding: &str) -> bool {
        let dest = dest.as_ref();
        let Some(table) = self.core.table() else {
            log::error!("no data loaded to export");
            return false;
        };

        let result =
            require_label(encoding).and_then(|enc| persist::write_delimited(table, dest, delimiter, enc, false));
        match result {
            Ok(()) => {
                log::info!(
                    "exported '{}' (delimiter {:?}, encoding {encoding})",
                    dest.display(),
                    delimiter as char
                );
                true
            }
            Err(e) => {
                log::error!("failed to export '{}': {e}", dest.display());
                false
            }
        }
    }
}

impl TabularDocument for DelimitedTextLoader {
    fn core(&self) -> &DocumentCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut DocumentCore {
        &mut self.core
    }

    fn load(&mut self) -> bool {
        let table = match self.try_load() {
            Ok(table) => table,
            Err(e) => {
                self.core.record_failure(e);
                return false;
            }
        };

        let (rows, columns) = (table.row_count(), table.column_count());
        if let Err(e) = self.accept_parsed_table(table) {
            self.core.record_failure(e);
            return false;
        }

        let delimiter = self.delimiter().unwrap_or(b',');
        log::info!(
            "loaded '{}': delimiter {:?} ({}), encoding {}, {rows} rows, {columns} columns",
            self.core.source().display(),
            delimiter as char,
            delimiter_name(delimiter),
            self.encoding().unwrap_or_default(),
        );
        true
    }
}

/// Summary of a delimited source and its load parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelimitedFileInfo {
    pub path: PathBuf,
    pub encoding: Option<String>,
    pub delimiter: Option<char>,
    /// `(rows, columns)` when loaded.
    pub shape: Option<(usize, usize)>,
    /// Up to five column names, followed by a total when there are more.
    pub column_preview: Vec<String>,
}

impl fmt::Display for DelimitedFileInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "path: {}", self.path.display())?;
        writeln!(f, "encoding: {}", self.encoding.as_deref().unwrap_or("-"))?;
        match self.delimiter {
            Some(d) => writeln!(f, "delimiter: {d:?}")?,
            None => writeln!(f, "delimiter: -")?,
        }
        if let Some((rows, columns)) = self.shape {
            writeln!(f, "shape: {rows} rows x {columns} columns")?;
            writeln!(f, "columns: {}", self.column_preview.join(", "))?;
        }
        Ok(())
    }
}
