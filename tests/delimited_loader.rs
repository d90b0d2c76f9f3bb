use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use tabular_ingest::ingestion::{DelimitedTextLoader, TabularDocument};
use tabular_ingest::types::{DataType, Value};
use tabular_ingest::{IngestionError, LoadStage};

fn tmp_file(name: &str, ext: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("tabular-ingest-{name}-{nanos}.{ext}"))
}

fn write_tmp(name: &str, ext: &str, bytes: &[u8]) -> PathBuf {
    let path = tmp_file(name, ext);
    std::fs::write(&path, bytes).unwrap();
    path
}

#[test]
fn load_detects_format_and_cleans_valid_table() {
    let mut doc = DelimitedTextLoader::new("tests/fixtures/people.csv");
    assert!(doc.load());
    assert!(doc.is_loaded());
    assert!(doc.last_error().is_none());
    assert_eq!(doc.delimiter(), Some(b','));
    assert_eq!(doc.encoding().as_deref(), Some("UTF-8"));

    let table = doc.table().unwrap();
    assert_eq!(table.column_names(), vec!["id", "full_name", "score", "active"]);
    assert_eq!(table.row_count(), 3);

    let types: Vec<DataType> = table.schema.fields.iter().map(|f| f.data_type).collect();
    assert_eq!(
        types,
        vec![DataType::Int64, DataType::Utf8, DataType::Float64, DataType::Bool]
    );
    assert_eq!(
        table.rows[0],
        vec![
            Value::Int64(1),
            Value::Utf8("Ada Lovelace".to_string()),
            Value::Float64(98.5),
            Value::Bool(true),
        ]
    );
    assert_eq!(table.rows[1][1], Value::Utf8("Grace Hopper".to_string()));
    assert_eq!(table.rows[2][2], Value::Float64(91.0));
}

#[test]
fn semicolon_delimiter_is_detected() {
    let mut doc = DelimitedTextLoader::new("tests/fixtures/semicolon.csv");
    assert!(doc.load());
    assert_eq!(doc.detected_delimiter(), Some(b';'));

    let table = doc.table().unwrap();
    assert_eq!(table.column_names(), vec!["city", "population", "area"]);
    assert_eq!(table.rows[1][1], Value::Int64(2_011_000));
    assert_eq!(table.rows[0][2], Value::Float64(2672.3));
}

#[test]
fn pipe_delimited_txt_is_loaded() {
    let mut doc = DelimitedTextLoader::new("tests/fixtures/pipe.txt");
    assert!(doc.load());
    assert_eq!(doc.delimiter(), Some(b'|'));
    assert_eq!(doc.table().unwrap().column_names(), vec!["code", "label"]);
}

#[test]
fn tab_delimited_file_is_loaded() {
    let path = write_tmp("tabs", "tsv", b"x\ty\n1\t2\n3\t4\n");
    let mut doc = DelimitedTextLoader::new(&path);
    assert!(doc.load());
    assert_eq!(doc.delimiter(), Some(b'\t'));
    assert_eq!(doc.table().unwrap().rows[1], vec![Value::Int64(3), Value::Int64(4)]);
}

#[test]
fn duplicate_rows_make_the_load_skip_cleaning() {
    let mut doc = DelimitedTextLoader::new("tests/fixtures/duplicates.csv");
    assert!(doc.load());
    assert_eq!(doc.table().unwrap().row_count(), 2);

    let report = doc.validate_integrity().unwrap();
    assert_eq!(report.duplicate_rows, 1);
    assert!(!report.is_valid());

    assert!(doc.clean_and_normalize());
    assert_eq!(doc.table().unwrap().row_count(), 1);
    assert!(doc.validate_integrity().unwrap().is_valid());
}

#[test]
fn missing_markers_become_nulls() {
    let mut doc = DelimitedTextLoader::new("tests/fixtures/missing.csv");
    assert!(doc.load());

    let table = doc.table().unwrap();
    assert_eq!(table.rows[1][1], Value::Null);
    assert_eq!(table.rows[1][2], Value::Null);
    assert_eq!(table.rows[2][2], Value::Null);
    assert_eq!(table.schema.fields[1].data_type, DataType::Float64);

    let report = doc.validate_integrity().unwrap();
    assert_eq!(report.missing_values, 3);
    assert_eq!(report.duplicate_rows, 0);
}

#[test]
fn nonexistent_file_fails_without_table() {
    let mut doc = DelimitedTextLoader::new("tests/fixtures/does_not_exist.csv");
    assert!(!doc.load());
    assert!(!doc.is_loaded());
    assert!(matches!(doc.last_error(), Some(IngestionError::NotFound { .. })));
}

#[test]
fn row_longer_than_header_is_a_parse_failure() {
    let path = write_tmp("ragged", "csv", b"a,b\n1,2\n1,2,3\n");
    let mut doc = DelimitedTextLoader::new(&path).with_delimiter(b',');
    assert!(!doc.load());

    let err = doc.last_error().unwrap();
    assert_eq!(err.stage(), Some(LoadStage::Parse));
    assert!(err.to_string().contains("row 3"));
}

#[test]
fn wide_row_disqualifies_comma_during_detection() {
    let path = write_tmp("ragged-detect", "csv", b"a,b\n1,2\n1,2,3\n");
    let mut doc = DelimitedTextLoader::new(&path);
    assert!(doc.load());
    assert_eq!(doc.detected_delimiter(), Some(b';'));
    assert_eq!(doc.table().unwrap().column_names(), vec!["a,b"]);
}

#[test]
fn short_rows_are_padded_with_nulls() {
    let path = write_tmp("short", "csv", b"a,b,c\n1,2,3\n4\n");
    let mut doc = DelimitedTextLoader::new(&path);
    assert!(doc.load());
    assert_eq!(
        doc.table().unwrap().rows[1],
        vec![Value::Int64(4), Value::Null, Value::Null]
    );
}

#[test]
fn explicit_latin1_encoding_decodes_latin1_bytes() {
    let path = write_tmp("latin1", "csv", b"nombre,ciudad\nJos\xe9,Bogot\xe1\n");
    let mut doc = DelimitedTextLoader::new(&path).with_encoding("latin-1");
    assert!(doc.load());
    assert_eq!(
        doc.table().unwrap().rows[0],
        vec![Value::Utf8("José".to_string()), Value::Utf8("Bogotá".to_string())]
    );
}

#[test]
fn explicit_utf8_on_latin1_bytes_is_an_encoding_error() {
    let path = write_tmp("bad-utf8", "csv", b"nombre\nJos\xe9\n");
    let mut doc = DelimitedTextLoader::new(&path).with_encoding("utf-8");
    assert!(!doc.load());
    assert!(matches!(doc.last_error(), Some(IngestionError::Encoding { .. })));
    assert!(doc.last_error().unwrap().to_string().contains("latin-1"));
}

#[test]
fn unknown_encoding_label_fails_the_load() {
    let mut doc = DelimitedTextLoader::new("tests/fixtures/people.csv").with_encoding("klingon-8");
    assert!(!doc.load());
    assert_eq!(doc.last_error().unwrap().stage(), Some(LoadStage::EncodingDetection));
}

#[test]
fn utf8_bom_is_stripped_from_first_header() {
    let path = write_tmp("bom", "csv", b"\xef\xbb\xbfname,qty\nbolt,4\n");
    let mut doc = DelimitedTextLoader::new(&path);
    assert!(doc.load());
    assert_eq!(doc.table().unwrap().column_names(), vec!["name", "qty"]);
}

#[test]
fn unrecognized_extension_still_loads() {
    let path = write_tmp("odd-ext", "dat", b"k,v\n1,2\n");
    let mut doc = DelimitedTextLoader::new(&path);
    assert!(doc.load());
    assert_eq!(doc.table().unwrap().row_count(), 1);
}

#[test]
fn change_load_parameters_reloads_only_on_change() {
    let mut doc = DelimitedTextLoader::new("tests/fixtures/semicolon.csv");
    assert!(doc.load());

    assert!(!doc.change_load_parameters(None, None));

    assert!(doc.change_load_parameters(Some(b','), None));
    assert_eq!(doc.delimiter(), Some(b','));
    assert_eq!(doc.table().unwrap().column_count(), 1);

    assert!(!doc.change_load_parameters(Some(b','), None));

    assert!(doc.change_load_parameters(Some(b';'), Some("utf-8")));
    assert_eq!(doc.table().unwrap().column_count(), 3);
    assert_eq!(doc.encoding().as_deref(), Some("utf-8"));
}

#[test]
fn failed_reload_keeps_previous_table() {
    let path = write_tmp("reload-fail", "csv", b"a,b\n1,2\n3,4\n");
    let mut doc = DelimitedTextLoader::new(&path);
    assert!(doc.load());
    let before = doc.table().cloned().unwrap();

    std::fs::write(&path, b"a,b\n1,2,3\n").unwrap();
    assert!(!doc.change_load_parameters(Some(b','), None));

    assert!(doc.is_loaded());
    assert_eq!(doc.table(), Some(&before));
    assert_eq!(doc.last_error().unwrap().stage(), Some(LoadStage::Parse));
}

#[test]
fn file_info_reports_shape_and_parameters() {
    let mut doc = DelimitedTextLoader::new("tests/fixtures/people.csv");
    let before = doc.file_info();
    assert_eq!(before.shape, None);
    assert!(before.column_preview.is_empty());

    assert!(doc.load());
    let info = doc.file_info();
    assert_eq!(info.shape, Some((3, 4)));
    assert_eq!(info.delimiter, Some(','));
    assert_eq!(info.column_preview, vec!["id", "full_name", "score", "active"]);
    assert!(info.to_string().contains("3 rows x 4 columns"));
}

#[test]
fn export_with_parameters_round_trips_through_loader() {
    let mut doc = DelimitedTextLoader::new("tests/fixtures/people.csv");
    assert!(doc.load());

    let out = tmp_file("export", "csv");
    assert!(doc.export_with_parameters(&out, b';', "latin-1"));

    let mut reread = DelimitedTextLoader::new(&out).with_encoding("latin-1");
    assert!(reread.load());
    assert_eq!(reread.detected_delimiter(), Some(b';'));
    assert_eq!(reread.table(), doc.table());
}

#[test]
fn whole_number_float_column_survives_export() {
    let path = write_tmp("whole-floats", "csv", b"id,price\n1,1.0\n2,2.0\n");
    let mut doc = DelimitedTextLoader::new(&path);
    assert!(doc.load());
    assert_eq!(doc.table().unwrap().schema.fields[1].data_type, DataType::Float64);

    let out = tmp_file("whole-floats-out", "csv");
    assert!(doc.export_with_parameters(&out, b',', "utf-8"));
    assert_eq!(std::fs::read_to_string(&out).unwrap(), "id,price\n1,1.0\n2,2.0\n");

    let mut reread = DelimitedTextLoader::new(&out);
    assert!(reread.load());
    assert_eq!(reread.table().unwrap().schema.fields[1].data_type, DataType::Float64);
    assert_eq!(reread.table(), doc.table());
}

#[test]
fn export_to_utf16_is_refused() {
    let mut doc = DelimitedTextLoader::new("tests/fixtures/people.csv");
    assert!(doc.load());

    let out = tmp_file("utf16", "csv");
    assert!(!doc.export_with_parameters(&out, b',', "utf-16"));
    assert!(!out.exists());
}

#[test]
fn export_without_table_fails() {
    let doc = DelimitedTextLoader::new("tests/fixtures/people.csv");
    assert!(!doc.export_with_parameters(tmp_file("never", "csv"), b',', "utf-8"));
}
