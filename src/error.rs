use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Convenience result type for ingestion operations.
pub type IngestionResult<T> = Result<T, IngestionError>;

/// Pipeline stage a failure is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStage {
    /// File extension check.
    ExtensionCheck,
    /// Encoding detection or resolution.
    EncodingDetection,
    /// Delimiter detection.
    DelimiterDetection,
    /// Parsing the source into a table.
    Parse,
    /// Choosing the sheet to read from a workbook.
    SheetSelection,
    /// Writing a table out.
    Export,
}

impl fmt::Display for LoadStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::ExtensionCheck => "extension check",
            Self::EncodingDetection => "encoding detection",
            Self::DelimiterDetection => "delimiter detection",
            Self::Parse => "parse",
            Self::SheetSelection => "sheet selection",
            Self::Export => "export",
        };
        f.write_str(s)
    }
}

/// Error type shared by the loaders, the integrity/cleaning layer and the persistence writer.
///
/// Loaders never let these escape `load()`; they are converted to a `false` return and kept
/// as the document's last error. [`IngestionError::ContractViolation`] is the exception: it is
/// returned from [`crate::ingestion::TabularDocument::set_table`] because it signals a
/// programming error rather than an environmental condition.
#[derive(Debug, Error)]
pub enum IngestionError {
    /// The source file does not exist.
    #[error("file not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// The source file exists but cannot be read.
    #[error("permission denied: {}", path.display())]
    PermissionDenied { path: PathBuf },

    /// The content could not be decoded with the effective encoding.
    #[error("encoding error ({encoding}): {message}; try a different encoding (utf-8, latin-1, cp1252)")]
    Encoding { encoding: String, message: String },

    /// Generic failure while loading, tagged with the failing stage.
    #[error("{stage} failed: {message}")]
    Load { stage: LoadStage, message: String },

    /// The operation requires a loaded table but none is present.
    #[error("invalid state: {message}")]
    InvalidState { message: String },

    /// A value that is not a well-formed table was assigned to a document.
    #[error("contract violation: {message}")]
    ContractViolation { message: String },

    /// Underlying I/O error not covered by a more specific variant.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A configuration document could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// CSV reader/writer error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[cfg(feature = "excel")]
    /// Workbook read error.
    #[error("excel error: {0}")]
    Excel(#[from] calamine::Error),

    #[cfg(feature = "excel")]
    /// Workbook write error.
    #[error("xlsx write error: {0}")]
    XlsxWrite(#[from] rust_xlsxwriter::XlsxError),
}

impl IngestionError {
    /// Map an I/O error on `path` to the dedicated not-found / permission variants.
    pub fn from_io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound { path: path.into() },
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path: path.into() },
            _ => Self::Io(err),
        }
    }

    pub(crate) fn load(stage: LoadStage, message: impl Into<String>) -> Self {
        Self::Load {
            stage,
            message: message.into(),
        }
    }

    /// The stage this error is attributed to, when known.
    pub fn stage(&self) -> Option<LoadStage> {
        match self {
            Self::Load { stage, .. } => Some(*stage),
            Self::Encoding { .. } => Some(LoadStage::EncodingDetection),
            Self::NotFound { .. } | Self::PermissionDenied { .. } | Self::Csv(_) => Some(LoadStage::Parse),
            #[cfg(feature = "excel")]
            Self::Excel(_) => Some(LoadStage::Parse),
            #[cfg(feature = "excel")]
            Self::XlsxWrite(_) => Some(LoadStage::Export),
            Self::Io(_) | Self::Config(_) | Self::InvalidState { .. } | Self::ContractViolation { .. } => None,
        }
    }
}
