//! Structural normalization of a [`DataSet`].

use std::collections::HashSet;

use serde::Serialize;

use crate::types::{DataSet, DataType, Value};

use super::integrity::row_key;

/// What a cleaning pass changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CleanReport {
    pub columns_normalized: usize,
    pub duplicate_rows_removed: usize,
    pub text_columns_trimmed: usize,
}

impl CleanReport {
    pub fn log(&self) {
        log::info!(
            "cleaning done: {} column names normalized, {} duplicate rows removed, {} text columns trimmed",
            self.columns_normalized,
            self.duplicate_rows_removed,
            self.text_columns_trimmed
        );
    }
}

/// Lowercase, then replace spaces and hyphens with underscores.
///
/// ```
/// use tabular_ingest::processing::normalize_column_name;
///
/// assert_eq!(normalize_column_name("Total Amount"), "total_amount");
/// assert_eq!(normalize_column_name("Pre-Tax"), "pre_tax");
/// ```
pub fn normalize_column_name(name: &str) -> String {
    name.to_lowercase().replace([' ', '-'], "_")
}

/// Normalize column names, drop duplicate rows, then trim every Utf8 column.
///
/// Rows are compared as they will look after trimming, so a row that differs from an earlier one
/// only by surrounding whitespace is removed too. This keeps the pass idempotent: running it on
/// its own output changes nothing.
pub fn clean_and_normalize(ds: &mut DataSet) -> CleanReport {
    for field in &mut ds.schema.fields {
        field.name = normalize_column_name(&field.name);
    }

    let text_mask: Vec<bool> = ds
        .schema
        .fields
        .iter()
        .map(|f| f.data_type == DataType::Utf8)
        .collect();

    let before = ds.row_count();
    let keep: Vec<bool> = {
        let mut seen = HashSet::with_capacity(before);
        ds.rows
            .iter()
            .map(|row| seen.insert(row_key(row, Some(text_mask.as_slice()))))
            .collect()
    };
    let mut keep_iter = keep.into_iter();
    ds.rows.retain(|_| keep_iter.next().unwrap_or(true));

    for row in &mut ds.rows {
        for (value, _) in row.iter_mut().zip(&text_mask).filter(|(_, is_text)| **is_text) {
            if let Value::Utf8(s) = value {
                let trimmed = s.trim();
                if trimmed.len() != s.len() {
                    *s = trimmed.to_string();
                }
            }
        }
    }

    CleanReport {
        columns_normalized: ds.column_count(),
        duplicate_rows_removed: before - ds.row_count(),
        text_columns_trimmed: text_mask.iter().filter(|t| **t).count(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Field, Schema};

    fn sample() -> DataSet {
        DataSet::new(
            Schema::new(vec![
                Field::new("Order ID", DataType::Int64),
                Field::new("Customer-Name", DataType::Utf8),
            ]),
            vec![
                vec![Value::Int64(1), Value::Utf8("  Ada ".into())],
                vec![Value::Int64(2), Value::Utf8("Grace".into())],
                vec![Value::Int64(1), Value::Utf8("  Ada ".into())],
                vec![Value::Int64(3), Value::Null],
                vec![Value::Int64(2), Value::Utf8("Grace  ".into())],
            ],
        )
    }

    #[test]
    fn normalizes_names_dedupes_and_trims() {
        let mut ds = sample();
        let report = clean_and_normalize(&mut ds);

        assert_eq!(ds.column_names(), vec!["order_id", "customer_name"]);
        assert_eq!(report.duplicate_rows_removed, 2);
        assert_eq!(
            ds.rows,
            vec![
                vec![Value::Int64(1), Value::Utf8("Ada".into())],
                vec![Value::Int64(2), Value::Utf8("Grace".into())],
                vec![Value::Int64(3), Value::Null],
            ]
        );
    }

    #[test]
    fn second_pass_is_a_no_op() {
        let mut once = sample();
        clean_and_normalize(&mut once);
        let mut twice = once.clone();
        let report = clean_and_normalize(&mut twice);
        assert_eq!(once, twice);
        assert_eq!(report.duplicate_rows_removed, 0);
    }

    #[test]
    fn nulls_stay_null() {
        let mut ds = sample();
        clean_and_normalize(&mut ds);
        assert!(ds.rows.iter().any(|r| r[1].is_null()));
    }
}
