#![cfg(feature = "excel")]

//! Loader for spreadsheet workbooks (`.xlsx`, `.xls`, `.xlsm`, and anything else calamine reads).

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use calamine::{open_workbook_auto_from_rs, Data, Range, Reader};

use crate::config::SpreadsheetOptions;
use crate::error::{IngestionError, IngestionResult, LoadStage};
use crate::persist;
use crate::types::{DataSet, DataType, Field, Schema, Value};

use super::document::{DocumentCore, TabularDocument};
use super::infer::{is_missing_marker, unique_header_names, SPREADSHEET_MISSING_MARKERS};
use super::observability::{IngestionObserver, IngestionSeverity, SourceFormat};
use super::warn_on_unrecognized_extension;

/// Extensions recognized as spreadsheets (anything else only triggers a warning).
pub const SPREADSHEET_EXTENSIONS: [&str; 3] = ["xlsx", "xls", "xlsm"];

/// Loads one sheet of a workbook.
///
/// Behavior:
/// - Picks the selected sheet if it exists; otherwise (or when none is selected) the first sheet
/// - Uses the first non-empty row as the header row
/// - Infers each column's type from its cells
#[derive(Debug)]
pub struct SpreadsheetLoader {
    core: DocumentCore,
    selected_sheet: Option<String>,
    available_sheets: Vec<String>,
    active_sheet: Option<String>,
}

/// One line of [`SpreadsheetLoader::sheet_listing`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetEntry {
    /// 1-based position in the workbook.
    pub position: usize,
    pub name: String,
    /// Whether this sheet backs the current table.
    pub active: bool,
}

impl SpreadsheetLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            core: DocumentCore::new(path, SourceFormat::Spreadsheet),
            selected_sheet: None,
            available_sheets: Vec::new(),
            active_sheet: None,
        }
    }

    pub fn from_options(path: impl Into<PathBuf>, options: &SpreadsheetOptions) -> Self {
        let mut loader = Self::new(path);
        loader.selected_sheet = options.sheet.clone();
        loader
    }

    pub fn with_sheet(mut self, name: impl Into<String>) -> Self {
        self.selected_sheet = Some(name.into());
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn IngestionObserver>, alert_at_or_above: IngestionSeverity) -> Self {
        self.core.set_observer(observer, alert_at_or_above);
        self
    }

    /// The requested sheet, if any.
    pub fn selected_sheet(&self) -> Option<&str> {
        self.selected_sheet.as_deref()
    }

    /// Sheet names found by the last load, in workbook order.
    pub fn available_sheets(&self) -> &[String] {
        &self.available_sheets
    }

    /// The sheet the current table was read from.
    pub fn active_sheet(&self) -> Option<&str> {
        self.active_sheet.as_deref()
    }

    fn select_sheet(&self) -> IngestionResult<String> {
        let first = self
            .available_sheets
            .first()
            .ok_or_else(|| IngestionError::load(LoadStage::SheetSelection, "workbook has no sheets"))?;

        match self.selected_sheet.as_deref() {
            Some(name) if self.available_sheets.iter().any(|s| s == name) => Ok(name.to_string()),
            Some(name) => {
                log::warn!("sheet '{name}' does not exist; using the first sheet '{first}'");
                Ok(first.clone())
            }
            None => Ok(first.clone()),
        }
    }

    fn try_load(&mut self) -> IngestionResult<(String, DataSet)> {
        let path = self.core.source().to_path_buf();
        log::info!("loading workbook '{}'", path.display());
        warn_on_unrecognized_extension(&path, &SPREADSHEET_EXTENSIONS);

        let mut workbook = match std::fs::read(&path)
            .map_err(|e| IngestionError::from_io(&path, e))
            .and_then(|bytes| open_workbook_auto_from_rs(Cursor::new(bytes)).map_err(IngestionError::from))
        {
            Ok(workbook) => workbook,
            Err(e) => {
                log::warn!("could not list the sheets of '{}': {e}", path.display());
                self.available_sheets.clear();
                return Err(e);
            }
        };

        self.available_sheets = workbook.sheet_names();
        log::info!("sheets in workbook: {}", self.available_sheets.join(", "));

        let sheet = self.select_sheet()?;
        let range = workbook.worksheet_range(&sheet)?;
        let ds = range_to_dataset(&range).map_err(|e| match e {
            IngestionError::Load { stage, message } => IngestionError::Load {
                stage,
                message: format!("sheet '{sheet}': {message}"),
            },
            other => other,
        })?;
        Ok((sheet, ds))
    }

    /// Select `name` and reload.
    ///
    /// Returns `false` without reloading when no sheets are known yet or `name` is not one of them.
    pub fn switch_sheet(&mut self, name: &str) -> bool {
        if self.available_sheets.is_empty() {
            log::error!("no sheet information available; load the workbook first");
            return false;
        }
        if !self.available_sheets.iter().any(|s| s == name) {
            log::error!(
                "sheet '{name}' does not exist; available sheets: {}",
                self.available_sheets.join(", ")
            );
            return false;
        }

        log::info!(
            "switching sheet: '{}' -> '{name}'",
            self.active_sheet.as_deref().unwrap_or("-")
        );
        self.selected_sheet = Some(name.to_string());
        self.load()
    }

    /// All known sheets with their position and whether they are active.
    pub fn sheet_listing(&self) -> Vec<SheetEntry> {
        self.available_sheets
            .iter()
            .enumerate()
            .map(|(idx, name)| SheetEntry {
                position: idx + 1,
                name: name.clone(),
                active: self.active_sheet.as_deref() == Some(name.as_str()),
            })
            .collect()
    }

    /// Write the current table to a new `.xlsx` workbook at `dest`.
    pub fn export_current_sheet(&self, dest: impl AsRef<Path>) -> bool {
        let dest = dest.as_ref();
        let Some(table) = self.core.table() else {
            log::error!("no data loaded to export");
            return false;
        };
        match persist::write_xlsx(table, dest, self.active_sheet.as_deref()) {
            Ok(()) => {
                log::info!("exported sheet to '{}'", dest.display());
                true
            }
            Err(e) => {
                log::error!("failed to export '{}': {e}", dest.display());
                false
            }
        }
    }
}

impl TabularDocument for SpreadsheetLoader {
    fn core(&self) -> &DocumentCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut DocumentCore {
        &mut self.core
    }

    fn load(&mut self) -> bool {
        let (sheet, table) = match self.try_load() {
            Ok(loaded) => loaded,
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
        log::info!(
            "loaded '{}': sheet '{sheet}', {rows} rows, {columns} columns",
            self.core.source().display()
        );
        self.active_sheet = Some(sheet);
        true
    }
}

/// Cell content after missing-value handling.
#[derive(Debug, Clone, PartialEq)]
enum Cell {
    Missing,
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

fn classify_cell(c: &Data) -> Cell {
    match c {
        Data::Empty | Data::Error(_) => Cell::Missing,
        Data::String(s) if is_missing_marker(s, &SPREADSHEET_MISSING_MARKERS) => Cell::Missing,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Int(i) => Cell::Int(*i),
        Data::Float(f) if f.is_nan() => Cell::Missing,
        Data::Float(f) => Cell::Float(*f),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
        other => Cell::Text(other.to_string()),
    }
}

fn cell_to_header_string(c: &Data) -> String {
    match c {
        Data::String(s) => s.clone(),
        Data::Float(f) if f.fract() == 0.0 => (*f as i64).to_string(),
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}

fn infer_cell_type(cells: &[&Cell]) -> DataType {
    let present: Vec<&Cell> = cells.iter().copied().filter(|c| **c != Cell::Missing).collect();
    if present.is_empty() {
        return DataType::Float64;
    }
    let numeric = present.iter().all(|c| matches!(c, Cell::Int(_) | Cell::Float(_)));
    if numeric {
        let integral = present.iter().all(|c| match c {
            Cell::Int(_) => true,
            Cell::Float(f) => f.fract() == 0.0 && f.abs() < i64::MAX as f64,
            _ => false,
        });
        return if integral { DataType::Int64 } else { DataType::Float64 };
    }
    if present.iter().all(|c| matches!(c, Cell::Bool(_))) {
        return DataType::Bool;
    }
    DataType::Utf8
}

fn cell_to_value(cell: Cell, data_type: DataType) -> Value {
    match (cell, data_type) {
        (Cell::Missing, _) => Value::Null,
        (Cell::Int(i), DataType::Int64) => Value::Int64(i),
        (Cell::Float(f), DataType::Int64) => Value::Int64(f as i64),
        (Cell::Int(i), DataType::Float64) => Value::Float64(i as f64),
        (Cell::Float(f), DataType::Float64) => Value::Float64(f),
        (Cell::Bool(b), DataType::Bool) => Value::Bool(b),
        (Cell::Text(s), _) => Value::Utf8(s),
        (Cell::Int(i), _) => Value::Utf8(i.to_string()),
        (Cell::Float(f), _) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Value::Utf8((f as i64).to_string()),
        (Cell::Float(f), _) => Value::Utf8(f.to_string()),
        (Cell::Bool(b), _) => Value::Utf8(b.to_string()),
    }
}

/// Convert a sheet range into a dataset.
///
/// The first non-empty row is the header. Rows after it that are entirely empty are skipped.
fn range_to_dataset(range: &Range<Data>) -> IngestionResult<DataSet> {
    let mut rows = range.rows().skip_while(|row| row.iter().all(|c| matches!(c, Data::Empty)));
    let header = rows
        .next()
        .ok_or_else(|| IngestionError::load(LoadStage::Parse, "sheet has no non-empty rows (no header row found)"))?;
    let names = unique_header_names(header.iter().map(cell_to_header_string));
    let width = names.len();

    let cells: Vec<Vec<Cell>> = rows
        .filter(|row| row.iter().any(|c| !matches!(c, Data::Empty)))
        .map(|row| {
            let mut out: Vec<Cell> = row.iter().take(width).map(classify_cell).collect();
            out.resize(width, Cell::Missing);
            out
        })
        .collect();

    let fields: Vec<Field> = names
        .into_iter()
        .enumerate()
        .map(|(idx, name)| {
            let column: Vec<&Cell> = cells.iter().map(|row| &row[idx]).collect();
            Field::new(name, infer_cell_type(&column))
        })
        .collect();

    let data = cells
        .into_iter()
        .map(|row| {
            row.into_iter()
                .zip(&fields)
                .map(|(cell, field)| cell_to_value(cell, field.data_type))
                .collect()
        })
        .collect();

    Ok(DataSet::new(Schema::new(fields), data))
}
