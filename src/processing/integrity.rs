//! Integrity checks over a loaded [`DataSet`].

use std::collections::HashSet;

use serde::Serialize;

use crate::types::{DataSet, Value};

/// Problem classes reported by [`validate_integrity`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IntegrityProblem {
    MissingValues,
    DuplicateRows,
    EmptyTable,
}

/// Result of an integrity scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IntegrityReport {
    /// Total number of null cells across all columns.
    pub missing_values: usize,
    /// Number of rows equal to some earlier row.
    pub duplicate_rows: usize,
    /// Whether the table has zero rows.
    pub is_empty: bool,
}

impl IntegrityReport {
    pub fn is_valid(&self) -> bool {
        self.problems().is_empty()
    }

    pub fn problems(&self) -> Vec<IntegrityProblem> {
        let mut out = Vec::new();
        if self.missing_values > 0 {
            out.push(IntegrityProblem::MissingValues);
        }
        if self.duplicate_rows > 0 {
            out.push(IntegrityProblem::DuplicateRows);
        }
        if self.is_empty {
            out.push(IntegrityProblem::EmptyTable);
        }
        out
    }

    /// One log line per problem class, or a single line saying the data is fine.
    pub fn log(&self) {
        if self.missing_values > 0 {
            log::warn!("found {} missing values in the dataset", self.missing_values);
        }
        if self.duplicate_rows > 0 {
            log::warn!("found {} duplicate rows", self.duplicate_rows);
        }
        if self.is_empty {
            log::warn!("the dataset is empty");
        }
        if self.is_valid() {
            log::info!("validation passed: no integrity problems found");
        }
    }
}

/// Scan `ds` for missing values, exact duplicate rows and emptiness.
pub fn validate_integrity(ds: &DataSet) -> IntegrityReport {
    let missing_values = ds.rows.iter().flatten().filter(|v| v.is_null()).count();

    let mut seen: HashSet<Vec<KeyCell<'_>>> = HashSet::with_capacity(ds.row_count());
    let mut duplicate_rows = 0;
    for row in &ds.rows {
        if !seen.insert(row_key(row, None)) {
            duplicate_rows += 1;
        }
    }

    IntegrityReport {
        missing_values,
        duplicate_rows,
        is_empty: ds.rows.is_empty(),
    }
}

/// Hashable stand-in for a [`Value`].
///
/// Floats compare by bit pattern with `-0.0` folded into `0.0` and every NaN folded together, so
/// that two rows compare equal exactly when their values are equal (nulls equal to nulls).
#[derive(Debug, PartialEq, Eq, Hash)]
pub(crate) enum KeyCell<'a> {
    Null,
    Int(i64),
    Float(u64),
    Bool(bool),
    Text(&'a str),
}

fn float_bits(v: f64) -> u64 {
    if v.is_nan() {
        f64::NAN.to_bits()
    } else if v == 0.0 {
        0.0f64.to_bits()
    } else {
        v.to_bits()
    }
}

/// Key for duplicate detection. With `trim_mask`, text in masked columns is compared trimmed.
pub(crate) fn row_key<'a>(row: &'a [Value], trim_mask: Option<&[bool]>) -> Vec<KeyCell<'a>> {
    row.iter()
        .enumerate()
        .map(|(idx, v)| match v {
            Value::Null => KeyCell::Null,
            Value::Int64(i) => KeyCell::Int(*i),
            Value::Float64(f) => KeyCell::Float(float_bits(*f)),
            Value::Bool(b) => KeyCell::Bool(*b),
            Value::Utf8(s) => {
                let trim = trim_mask.and_then(|m| m.get(idx).copied()).unwrap_or(false);
                KeyCell::Text(if trim { s.trim() } else { s.as_str() })
            }
        })
        .collect()
}
