//! Writing loaded tables out: delimited files, workbooks, or a relational store.
//!
//! [`DataSaver::save`] picks the target from the destination string:
//!
//! - `*.csv` → delimited file (UTF-8, comma)
//! - `*.xlsx` / `*.xls` → workbook (feature `excel`; always written in the xlsx format)
//! - anything else → table name in a relational store, through an injected [`RelationalSink`]
//!
//! The store itself is not part of this crate; callers plug in a sink built from
//! [`crate::config::StoreConfig`].

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use encoding_rs::{Encoding, UTF_8};

use crate::error::{IngestionError, IngestionResult, LoadStage};
use crate::ingestion::encoding::encode;
use crate::types::{DataSet, Value};

/// What to do when the target already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WritePolicy {
    /// Refuse to write.
    Fail,
    /// Overwrite the existing target.
    #[default]
    Replace,
    /// Add rows to the existing target.
    Append,
}

/// Where [`DataSaver::save`] sends a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    DelimitedFile(PathBuf),
    Workbook(PathBuf),
    /// Table name in the relational store.
    Relational(String),
}

impl Destination {
    /// Classify `dest` by its (case-insensitive) extension.
    pub fn infer(dest: &str) -> Self {
        let ext = Path::new(dest)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("csv") => Self::DelimitedFile(PathBuf::from(dest)),
            Some("xlsx") | Some("xls") => Self::Workbook(PathBuf::from(dest)),
            _ => Self::Relational(dest.to_string()),
        }
    }
}

/// A relational store that can receive tables.
///
/// Implementations own their connection; this crate ships none.
pub trait RelationalSink {
    /// Write `table` as table `name`, honoring `policy` when it already exists.
    fn write_table(&mut self, name: &str, table: &DataSet, policy: WritePolicy) -> IngestionResult<()>;

    /// Update the rows of `name` whose `key_column` matches a row of `table`.
    fn update_rows(&mut self, name: &str, table: &DataSet, key_column: &str) -> IngestionResult<()>;

    /// Delete the rows of `name` where `key_column` equals `key`.
    fn delete_rows(&mut self, name: &str, key_column: &str, key: &Value) -> IngestionResult<()>;
}

/// Saves tables to files or to a relational sink.
///
/// All operations report success as a `bool` and log the reason for a failure.
#[derive(Default)]
pub struct DataSaver {
    sink: Option<Box<dyn RelationalSink>>,
}

impl std::fmt::Debug for DataSaver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataSaver")
            .field("sink_set", &self.sink.is_some())
            .finish()
    }
}

impl DataSaver {
    /// A saver that can only write files.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sink(sink: Box<dyn RelationalSink>) -> Self {
        Self { sink: Some(sink) }
    }

    pub fn has_sink(&self) -> bool {
        self.sink.is_some()
    }

    /// Save `table` to `destination`. Returns `false` (and logs why) on any failure, including an
    /// absent or empty table.
    pub fn save(&mut self, table: Option<&DataSet>, destination: &str, policy: WritePolicy) -> bool {
        let Some(table) = table.filter(|t| t.row_count() > 0) else {
            log::warn!("table is empty; nothing saved to '{destination}'");
            return false;
        };

        let result = match Destination::infer(destination) {
            Destination::DelimitedFile(path) => save_delimited_file(table, &path, policy),
            Destination::Workbook(path) => save_workbook(table, &path, policy),
            Destination::Relational(name) => match self.sink.as_mut() {
                Some(sink) => sink.write_table(&name, table, policy),
                None => {
                    log::error!("no relational store configured; cannot save table '{name}'");
                    return false;
                }
            },
        };

        match result {
            Ok(()) => {
                log::info!("saved {} rows to '{destination}'", table.row_count());
                true
            }
            Err(e) => {
                log::error!("failed to save to '{destination}': {e}");
                false
            }
        }
    }

    /// Update rows of store table `name` keyed by `key_column`.
    ///
    /// Rows of `table` with a null key are skipped with a warning.
    pub fn update_rows(&mut self, name: &str, table: Option<&DataSet>, key_column: &str) -> bool {
        let Some(table) = table.filter(|t| t.row_count() > 0) else {
            log::warn!("table is empty; nothing to update in '{name}'");
            return false;
        };
        let Some(sink) = self.sink.as_mut() else {
            log::error!("no relational store configured; cannot update '{name}'");
            return false;
        };
        let Some(key_idx) = table.schema.index_of(key_column) else {
            log::error!("key column '{key_column}' is not in the table");
            return false;
        };

        let keyed: Vec<Vec<Value>> = table
            .rows
            .iter()
            .enumerate()
            .filter_map(|(idx, row)| {
                if row[key_idx].is_null() {
                    log::warn!("row {idx} has no value in key column '{key_column}'; skipped");
                    None
                } else {
                    Some(row.clone())
                }
            })
            .collect();
        let keyed = DataSet::new(table.schema.clone(), keyed);

        match sink.update_rows(name, &keyed, key_column) {
            Ok(()) => {
                log::info!("updated rows of '{name}' by key '{key_column}'");
                true
            }
            Err(e) => {
                log::error!("failed to update '{name}': {e}");
                false
            }
        }
    }

    /// Delete rows of store table `name` where `key_column` equals `key`.
    pub fn delete_rows(&mut self, name: &str, key_column: &str, key: &Value) -> bool {
        let Some(sink) = self.sink.as_mut() else {
            log::error!("no relational store configured; cannot delete from '{name}'");
            return false;
        };
        match sink.delete_rows(name, key_column, key) {
            Ok(()) => {
                log::info!("deleted rows of '{name}' where {key_column} = {key}");
                true
            }
            Err(e) => {
                log::error!("failed to delete from '{name}': {e}");
                false
            }
        }
    }
}

fn refuse_existing(path: &Path) -> IngestionResult<()> {
    if path.exists() {
        return Err(IngestionError::load(
            LoadStage::Export,
            format!("'{}' already exists", path.display()),
        ));
    }
    Ok(())
}

fn save_delimited_file(table: &DataSet, path: &Path, policy: WritePolicy) -> IngestionResult<()> {
    match policy {
        WritePolicy::Fail => {
            refuse_existing(path)?;
            write_delimited(table, path, b',', UTF_8, false)
        }
        WritePolicy::Replace => write_delimited(table, path, b',', UTF_8, false),
        WritePolicy::Append => write_delimited(table, path, b',', UTF_8, path.exists()),
    }
}

#[cfg(feature = "excel")]
fn save_workbook(table: &DataSet, path: &Path, policy: WritePolicy) -> IngestionResult<()> {
    match policy {
        WritePolicy::Fail => refuse_existing(path)?,
        WritePolicy::Append => {
            return Err(IngestionError::load(
                LoadStage::Export,
                "appending to a workbook is not supported",
            ));
        }
        WritePolicy::Replace => {}
    }
    write_xlsx(table, path, None)
}

#[cfg(not(feature = "excel"))]
fn save_workbook(_table: &DataSet, path: &Path, _policy: WritePolicy) -> IngestionResult<()> {
    Err(IngestionError::load(
        LoadStage::Export,
        format!("cannot write '{}': built without the `excel` feature", path.display()),
    ))
}

/// Text form of a cell in delimited output.
///
/// Whole floats keep a trailing `.0` so the column reads back as Float64 rather than Int64.
fn delimited_field(value: &Value) -> String {
    match value {
        Value::Float64(v) if v.is_finite() && v.fract() == 0.0 => format!("{v:.1}"),
        other => other.to_string(),
    }
}

/// Write `table` as delimited text encoded with `encoding`.
///
/// With `append`, rows are added to the end of `dest` and no header is written; otherwise `dest`
/// is created or truncated and starts with a header row. Nulls become empty fields.
pub fn write_delimited(
    table: &DataSet,
    dest: &Path,
    delimiter: u8,
    encoding: &'static Encoding,
    append: bool,
) -> IngestionResult<()> {
    let mut wtr = csv::WriterBuilder::new().delimiter(delimiter).from_writer(Vec::new());
    if !append {
        wtr.write_record(table.schema.field_names())?;
    }
    for row in &table.rows {
        wtr.write_record(row.iter().map(delimited_field))?;
    }
    let buf = wtr
        .into_inner()
        .map_err(|e| IngestionError::load(LoadStage::Export, e.to_string()))?;
    let text = String::from_utf8(buf).map_err(|e| IngestionError::load(LoadStage::Export, e.to_string()))?;
    let bytes = encode(&text, encoding)?;

    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .append(append)
        .truncate(!append)
        .open(dest)
        .map_err(|e| IngestionError::from_io(dest, e))?;
    file.write_all(&bytes)?;
    Ok(())
}

/// Write `table` to a new single-sheet `.xlsx` workbook, optionally naming the sheet.
#[cfg(feature = "excel")]
pub fn write_xlsx(table: &DataSet, dest: &Path, sheet_name: Option<&str>) -> IngestionResult<()> {
    use rust_xlsxwriter::Workbook;

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    if let Some(name) = sheet_name {
        worksheet.set_name(name)?;
    }

    for (col, name) in table.schema.field_names().enumerate() {
        worksheet.write_string(0, xlsx_col(col)?, name)?;
    }
    for (r, row) in table.rows.iter().enumerate() {
        let row_num = u32::try_from(r + 1)
            .map_err(|_| IngestionError::load(LoadStage::Export, "too many rows for a worksheet"))?;
        for (c, value) in row.iter().enumerate() {
            let col = xlsx_col(c)?;
            match value {
                Value::Null => {}
                Value::Int64(v) => {
                    worksheet.write_number(row_num, col, *v as f64)?;
                }
                Value::Float64(v) => {
                    worksheet.write_number(row_num, col, *v)?;
                }
                Value::Bool(v) => {
                    worksheet.write_boolean(row_num, col, *v)?;
                }
                Value::Utf8(v) => {
                    worksheet.write_string(row_num, col, v)?;
                }
            }
        }
    }

    workbook.save(dest)?;
    Ok(())
}

#[cfg(feature = "excel")]
fn xlsx_col(idx: usize) -> IngestionResult<u16> {
    u16::try_from(idx).map_err(|_| IngestionError::load(LoadStage::Export, "too many columns for a worksheet"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn destination_is_inferred_from_extension() {
        assert_eq!(
            Destination::infer("out/Report.CSV"),
            Destination::DelimitedFile(PathBuf::from("out/Report.CSV"))
        );
        assert_eq!(Destination::infer("book.xls"), Destination::Workbook(PathBuf::from("book.xls")));
        assert_eq!(
            Destination::infer("processed_sales"),
            Destination::Relational("processed_sales".to_string())
        );
        assert_eq!(
            Destination::infer("dump.json"),
            Destination::Relational("dump.json".to_string())
        );
    }

    #[test]
    fn whole_floats_keep_a_decimal_point() {
        assert_eq!(delimited_field(&Value::Float64(2.0)), "2.0");
        assert_eq!(delimited_field(&Value::Float64(-0.0)), "-0.0");
        assert_eq!(delimited_field(&Value::Float64(2.5)), "2.5");
        assert_eq!(delimited_field(&Value::Int64(2)), "2");
        assert_eq!(delimited_field(&Value::Null), "");
    }

    #[test]
    fn default_policy_replaces() {
        assert_eq!(WritePolicy::default(), WritePolicy::Replace);
    }
}
