//! Delimited-text parsing into a [`DataSet`] with inferred column types.

use std::io::Read;

use crate::error::{IngestionError, IngestionResult, LoadStage};
use crate::types::{DataSet, Field, Schema, Value};

use super::infer::{infer_text_type, is_missing_marker, text_to_value, unique_header_names, CSV_MISSING_MARKERS};

/// Parse already-decoded delimited text.
///
/// Rules:
///
/// - The first record is the header.
/// - Leading whitespace of every field is skipped; [`CSV_MISSING_MARKERS`] become [`Value::Null`].
/// - Rows shorter than the header are padded with nulls; longer rows are an error.
/// - Column types are inferred from every row of the file.
pub fn parse_delimited_text(text: &str, delimiter: u8) -> IngestionResult<DataSet> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());
    ingest_csv_from_reader(&mut rdr, &CSV_MISSING_MARKERS)
}

/// Parse CSV data from an existing reader.
///
/// The reader must be configured with `has_headers(true)` and `flexible(true)`.
pub fn ingest_csv_from_reader<R: Read>(
    rdr: &mut csv::Reader<R>,
    missing_markers: &[&str],
) -> IngestionResult<DataSet> {
    let headers = rdr.headers()?.clone();
    if headers.is_empty() {
        return Err(IngestionError::load(LoadStage::Parse, "no columns to parse from input"));
    }
    let names = unique_header_names(headers.iter());
    let width = names.len();

    let mut cells: Vec<Vec<Option<String>>> = Vec::new();
    for (row_idx0, result) in rdr.records().enumerate() {
        // Report 1-based row number for users; +1 again because header is row 1.
        let user_row = row_idx0 + 2;
        let record = result?;
        if record.len() > width {
            return Err(IngestionError::load(
                LoadStage::Parse,
                format!("row {user_row}: expected {width} fields, saw {}", record.len()),
            ));
        }

        let mut row: Vec<Option<String>> = record
            .iter()
            .map(|raw| {
                let v = raw.trim_start();
                (!is_missing_marker(v, missing_markers)).then(|| v.to_string())
            })
            .collect();
        row.resize(width, None);
        cells.push(row);
    }

    let fields: Vec<Field> = names
        .into_iter()
        .enumerate()
        .map(|(idx, name)| {
            let column = cells.iter().filter_map(|row| row[idx].as_deref());
            Field::new(name, infer_text_type(column))
        })
        .collect();

    let rows = cells
        .into_iter()
        .map(|row| {
            row.into_iter()
                .zip(&fields)
                .map(|(cell, field)| match cell {
                    Some(raw) => text_to_value(&raw, field.data_type),
                    None => Value::Null,
                })
                .collect()
        })
        .collect();

    Ok(DataSet::new(Schema::new(fields), rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DataType;

    #[test]
    fn markers_and_leading_whitespace() {
        let ds = parse_delimited_text("id, name,score\n1, Ada,N/A\n2,  NULL ,1.5\n", b',').unwrap();
        assert_eq!(ds.column_names(), vec!["id", "name", "score"]);
        assert_eq!(ds.schema.fields[2].data_type, DataType::Float64);
        assert_eq!(ds.rows[0][1], Value::Utf8("Ada".to_string()));
        assert_eq!(ds.rows[0][2], Value::Null);
        // Trailing whitespace keeps "NULL " from matching a marker.
        assert_eq!(ds.rows[1][1], Value::Utf8("NULL ".to_string()));
    }

    #[test]
    fn short_rows_are_padded() {
        let ds = parse_delimited_text("a;b;c\n1;2\n", b';').unwrap();
        assert_eq!(ds.rows[0], vec![Value::Int64(1), Value::Int64(2), Value::Null]);
    }

    #[test]
    fn long_rows_are_rejected() {
        let err = parse_delimited_text("a,b\n1,2,3\n", b',').unwrap_err();
        assert!(matches!(err, IngestionError::Load { stage: LoadStage::Parse, .. }));
        assert!(err.to_string().contains("row 2"));
    }

    #[test]
    fn types_use_the_whole_file() {
        let mut text = String::from("v\n");
        for i in 0..200 {
            text.push_str(&format!("{i}\n"));
        }
        text.push_str("x\n");
        let ds = parse_delimited_text(&text, b',').unwrap();
        assert_eq!(ds.schema.fields[0].data_type, DataType::Utf8);
    }

    #[test]
    fn empty_input_has_no_columns() {
        assert!(parse_delimited_text("", b',').is_err());
    }
}
