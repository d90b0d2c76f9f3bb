//! Column naming and type inference shared by the loaders.

use crate::types::{DataType, Value};

/// Missing-value markers for delimited text.
pub const CSV_MISSING_MARKERS: [&str; 6] = ["", "N/A", "NULL", "null", "NaN", "n/a"];

/// Missing-value markers for spreadsheet text cells.
pub const SPREADSHEET_MISSING_MARKERS: [&str; 5] = ["", "N/A", "NULL", "null", "NaN"];

pub fn is_missing_marker(raw: &str, markers: &[&str]) -> bool {
    markers.contains(&raw)
}

/// Turn raw header cells into unique, non-empty column names.
///
/// Blank headers become `Unnamed: {idx}`; repeated names get a `.1`, `.2`, ... suffix in order of
/// appearance.
pub fn unique_header_names<I, S>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for (idx, name) in raw.into_iter().enumerate() {
        let name = name.as_ref().trim();
        let base = if name.is_empty() {
            format!("Unnamed: {idx}")
        } else {
            name.to_string()
        };

        let mut candidate = base.clone();
        let mut suffix = 1;
        while out.contains(&candidate) {
            candidate = format!("{base}.{suffix}");
            suffix += 1;
        }
        out.push(candidate);
    }
    out
}

fn parse_bool_literal(s: &str) -> Option<bool> {
    match s {
        "true" | "True" | "TRUE" => Some(true),
        "false" | "False" | "FALSE" => Some(false),
        _ => None,
    }
}

/// Infer the narrowest type that every non-missing cell of a text column fits.
///
/// Tried in order: Int64, Float64, Bool, then Utf8. A column with no values at all is Float64.
/// Only finite numbers count as Float64; words like `inf` or `nan` keep a column textual.
pub fn infer_text_type<'a, I>(cells: I) -> DataType
where
    I: IntoIterator<Item = &'a str>,
{
    let mut any = false;
    let mut all_int = true;
    let mut all_float = true;
    let mut all_bool = true;

    for cell in cells {
        any = true;
        let t = cell.trim();
        all_int = all_int && t.parse::<i64>().is_ok();
        all_float = all_float && t.parse::<f64>().is_ok_and(f64::is_finite);
        all_bool = all_bool && parse_bool_literal(t).is_some();
        if !all_int && !all_float && !all_bool {
            return DataType::Utf8;
        }
    }

    if !any || (all_float && !all_int) {
        DataType::Float64
    } else if all_int {
        DataType::Int64
    } else if all_bool {
        DataType::Bool
    } else {
        DataType::Utf8
    }
}

/// Convert a text cell to a value of `data_type`.
///
/// Callers pass the type returned by [`infer_text_type`] for the same column, so parses succeed;
/// should one not, the text is kept as Utf8.
pub fn text_to_value(raw: &str, data_type: DataType) -> Value {
    let t = raw.trim();
    match data_type {
        DataType::Int64 => t.parse::<i64>().map(Value::Int64).unwrap_or_else(|_| Value::Utf8(raw.to_string())),
        DataType::Float64 => match t.parse::<f64>() {
            Ok(v) if v.is_nan() => Value::Null,
            Ok(v) => Value::Float64(v),
            Err(_) => Value::Utf8(raw.to_string()),
        },
        DataType::Bool => parse_bool_literal(t)
            .map(Value::Bool)
            .unwrap_or_else(|| Value::Utf8(raw.to_string())),
        DataType::Utf8 => Value::Utf8(raw.to_string()),
    }
}
