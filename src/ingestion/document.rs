//! The capability set shared by every loader.
//!
//! A document owns at most one [`DataSet`] together with the path it came from. Concrete loaders
//! ([`super::DelimitedTextLoader`], [`super::SpreadsheetLoader`]) embed a [`DocumentCore`] and
//! implement [`TabularDocument::load`]; validation, cleaning and description are provided methods
//! that work on whatever table the core currently holds.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{IngestionError, IngestionResult};
use crate::processing::{clean, describe, integrity, BasicInfo, CleanReport, DatasetSummary, IntegrityReport};
use crate::types::DataSet;

use super::observability::{IngestionContext, IngestionObserver, IngestionSeverity, IngestionStats, SourceFormat};

/// State shared by all document kinds: source path, current table, observer wiring.
pub struct DocumentCore {
    source: PathBuf,
    format: SourceFormat,
    table: Option<DataSet>,
    observer: Option<Arc<dyn IngestionObserver>>,
    alert_at_or_above: IngestionSeverity,
    last_error: Option<IngestionError>,
}

impl fmt::Debug for DocumentCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentCore")
            .field("source", &self.source)
            .field("format", &self.format)
            .field("loaded", &self.table.is_some())
            .field("observer_set", &self.observer.is_some())
            .field("last_error", &self.last_error.as_ref().map(ToString::to_string))
            .finish()
    }
}

impl DocumentCore {
    pub fn new(source: impl Into<PathBuf>, format: SourceFormat) -> Self {
        Self {
            source: source.into(),
            format,
            table: None,
            observer: None,
            alert_at_or_above: IngestionSeverity::Critical,
            last_error: None,
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn format(&self) -> SourceFormat {
        self.format
    }

    pub fn table(&self) -> Option<&DataSet> {
        self.table.as_ref()
    }

    pub(crate) fn table_mut(&mut self) -> Option<&mut DataSet> {
        self.table.as_mut()
    }

    /// Replace the current table.
    ///
    /// Fails with [`IngestionError::ContractViolation`] if any row's length differs from the
    /// schema; the previous table is kept in that case.
    pub fn set_table(&mut self, table: DataSet) -> IngestionResult<()> {
        if let Some(idx) = table.first_misshapen_row() {
            return Err(IngestionError::ContractViolation {
                message: format!(
                    "row {idx} has {} values but the schema has {} fields",
                    table.rows[idx].len(),
                    table.column_count()
                ),
            });
        }
        self.table = Some(table);
        Ok(())
    }

    pub fn clear_table(&mut self) {
        self.table = None;
    }

    pub fn last_error(&self) -> Option<&IngestionError> {
        self.last_error.as_ref()
    }

    /// Report load outcomes to `observer`; failures at or above `alert_at_or_above` also alert.
    pub fn set_observer(&mut self, observer: Arc<dyn IngestionObserver>, alert_at_or_above: IngestionSeverity) {
        self.observer = Some(observer);
        self.alert_at_or_above = alert_at_or_above;
    }

    fn context(&self) -> IngestionContext {
        IngestionContext {
            path: self.source.clone(),
            format: self.format,
        }
    }

    pub(crate) fn record_success(&mut self) {
        self.last_error = None;
        let Some(table) = self.table.as_ref() else {
            return;
        };
        if let Some(obs) = self.observer.as_ref() {
            obs.on_success(
                &self.context(),
                IngestionStats {
                    rows: table.row_count(),
                    columns: table.column_count(),
                },
            );
        }
    }

    pub(crate) fn record_failure(&mut self, err: IngestionError) {
        match err.stage() {
            Some(stage) => log::error!("failed to load '{}' during {stage}: {err}", self.source.display()),
            None => log::error!("failed to load '{}': {err}", self.source.display()),
        }
        if let IngestionError::Encoding { .. } = err {
            log::info!("hint: pass an explicit encoding such as utf-8, latin-1 or cp1252");
        }
        if let Some(obs) = self.observer.as_ref() {
            let ctx = self.context();
            let sev = IngestionSeverity::for_error(&err);
            obs.on_failure(&ctx, sev, &err);
            if sev >= self.alert_at_or_above {
                obs.on_alert(&ctx, sev, &err);
            }
        }
        self.last_error = Some(err);
    }
}

/// Operations every loaded table supports.
///
/// Methods that need a table degrade gracefully when nothing is loaded: they log, then return
/// `false`, `None` or [`IngestionError::InvalidState`].
pub trait TabularDocument {
    fn core(&self) -> &DocumentCore;

    fn core_mut(&mut self) -> &mut DocumentCore;

    /// Read the source and replace the current table.
    ///
    /// Returns `false` on any failure; the cause is available from [`Self::last_error`]. On
    /// success the table is validated and, if it passes, cleaned.
    fn load(&mut self) -> bool;

    fn source(&self) -> &Path {
        self.core().source()
    }

    fn table(&self) -> Option<&DataSet> {
        self.core().table()
    }

    fn is_loaded(&self) -> bool {
        self.core().table().is_some()
    }

    fn last_error(&self) -> Option<&IngestionError> {
        self.core().last_error()
    }

    /// See [`DocumentCore::set_table`].
    fn set_table(&mut self, table: DataSet) -> IngestionResult<()> {
        self.core_mut().set_table(table)
    }

    /// Count missing values, duplicate rows and emptiness. Read-only.
    fn validate_integrity(&self) -> IngestionResult<IntegrityReport> {
        let table = self.table().ok_or_else(|| IngestionError::InvalidState {
            message: "no data loaded to validate".to_string(),
        })?;
        let report = integrity::validate_integrity(table);
        report.log();
        Ok(report)
    }

    /// Normalize column names, drop duplicate rows and trim text columns.
    ///
    /// Returns `false` without touching anything when no table is loaded.
    fn clean_and_normalize(&mut self) -> bool {
        let Some(table) = self.core_mut().table_mut() else {
            log::error!("no data loaded to clean");
            return false;
        };
        log::info!("cleaning and normalizing {} rows", table.row_count());
        let report: CleanReport = clean::clean_and_normalize(table);
        report.log();
        true
    }

    /// Shape, memory estimate and per-column descriptive statistics.
    fn describe_summary(&self) -> Option<DatasetSummary> {
        let Some(table) = self.table() else {
            log::error!("no data loaded to describe");
            return None;
        };
        Some(describe::describe(self.source(), table))
    }

    /// Source, shape, memory estimate and column types.
    fn basic_info(&self) -> Option<BasicInfo> {
        let Some(table) = self.table() else {
            log::error!("no data loaded to show information for");
            return None;
        };
        Some(describe::basic_info(self.source(), table))
    }

    /// The first `n` rows of the table.
    fn preview(&self, n: usize) -> Option<DataSet> {
        let Some(table) = self.table() else {
            log::error!("no data loaded to preview");
            return None;
        };
        Some(table.head(n))
    }

    /// Names from `names` that are not columns of the table; `None` if nothing is loaded.
    fn missing_columns(&self, names: &[&str]) -> Option<Vec<String>> {
        let table = self.table()?;
        Some(
            names
                .iter()
                .filter(|n| table.schema.index_of(n).is_none())
                .map(|n| n.to_string())
                .collect(),
        )
    }

    /// Whether every name in `names` is a column of the table.
    fn has_required_columns(&self, names: &[&str]) -> bool {
        match self.missing_columns(names) {
            None => {
                log::error!("no data loaded to check columns against");
                false
            }
            Some(missing) if missing.is_empty() => {
                log::info!("all required columns are present");
                true
            }
            Some(missing) => {
                log::warn!("missing columns: {}", missing.join(", "));
                false
            }
        }
    }

    /// Install a freshly parsed table, then validate and conditionally clean it.
    #[doc(hidden)]
    fn accept_parsed_table(&mut self, table: DataSet) -> IngestionResult<()> {
        self.core_mut().set_table(table)?;
        self.core_mut().record_success();
        if self.validate_integrity()?.is_valid() {
            self.clean_and_normalize();
        }
        Ok(())
    }
}
