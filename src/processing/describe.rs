//! Descriptive summaries of a [`DataSet`].

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use serde::Serialize;

use crate::types::{DataSet, DataType, Value};

/// Shape and column types of a table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BasicInfo {
    pub source: String,
    pub rows: usize,
    pub columns: usize,
    pub memory_bytes: usize,
    pub column_types: Vec<(String, DataType)>,
}

impl fmt::Display for BasicInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "source: {}", self.source)?;
        writeln!(f, "shape: {} rows x {} columns", self.rows, self.columns)?;
        writeln!(f, "memory: {:.2} KB", self.memory_bytes as f64 / 1024.0)?;
        for (name, data_type) in &self.column_types {
            writeln!(f, "  {name}: {data_type}")?;
        }
        Ok(())
    }
}

/// Statistics for one column.
///
/// `count` is always set. Numeric columns fill `mean` through `max`; other columns fill
/// `unique`, `top` and `freq`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub name: String,
    pub data_type: DataType,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unique: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub freq: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub std: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p25: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p50: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p75: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl ColumnSummary {
    fn empty(name: &str, data_type: DataType, count: usize) -> Self {
        Self {
            name: name.to_string(),
            data_type,
            count,
            unique: None,
            top: None,
            freq: None,
            mean: None,
            std: None,
            min: None,
            p25: None,
            p50: None,
            p75: None,
            max: None,
        }
    }
}

/// Full description of a loaded table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetSummary {
    #[serde(flatten)]
    pub info: BasicInfo,
    pub statistics: Vec<ColumnSummary>,
}

impl fmt::Display for DatasetSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.info)?;
        writeln!(f, "statistics:")?;
        for c in &self.statistics {
            write!(f, "  {} ({}): count={}", c.name, c.data_type, c.count)?;
            if let Some(mean) = c.mean {
                write!(f, " mean={mean:.4}")?;
            }
            if let Some(std) = c.std {
                write!(f, " std={std:.4}")?;
            }
            if let (Some(min), Some(max)) = (c.min, c.max) {
                write!(f, " min={min} max={max}")?;
            }
            if let (Some(p25), Some(p50), Some(p75)) = (c.p25, c.p50, c.p75) {
                write!(f, " 25%={p25} 50%={p50} 75%={p75}")?;
            }
            if let (Some(unique), Some(top), Some(freq)) = (c.unique, c.top.as_ref(), c.freq) {
                write!(f, " unique={unique} top={top:?} freq={freq}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

pub fn basic_info(source: &Path, ds: &DataSet) -> BasicInfo {
    BasicInfo {
        source: source.display().to_string(),
        rows: ds.row_count(),
        columns: ds.column_count(),
        memory_bytes: ds.estimated_memory_bytes(),
        column_types: ds
            .schema
            .fields
            .iter()
            .map(|f| (f.name.clone(), f.data_type))
            .collect(),
    }
}

pub fn describe(source: &Path, ds: &DataSet) -> DatasetSummary {
    let statistics = ds
        .schema
        .fields
        .iter()
        .enumerate()
        .map(|(idx, field)| {
            let values: Vec<&Value> = ds.column_values(idx).filter(|v| !v.is_null()).collect();
            if field.data_type.is_numeric() {
                numeric_summary(&field.name, field.data_type, &values)
            } else {
                categorical_summary(&field.name, field.data_type, &values)
            }
        })
        .collect();

    DatasetSummary {
        info: basic_info(source, ds),
        statistics,
    }
}

fn numeric_summary(name: &str, data_type: DataType, values: &[&Value]) -> ColumnSummary {
    let mut nums: Vec<f64> = values.iter().filter_map(|v| v.as_f64()).collect();
    let mut out = ColumnSummary::empty(name, data_type, values.len());
    if nums.is_empty() {
        return out;
    }
    nums.sort_by(f64::total_cmp);

    let n = nums.len() as f64;
    let mean = nums.iter().sum::<f64>() / n;
    out.mean = Some(mean);
    if nums.len() > 1 {
        let var = nums.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
        out.std = Some(var.sqrt());
    }
    out.min = nums.first().copied();
    out.p25 = Some(quantile(&nums, 0.25));
    out.p50 = Some(quantile(&nums, 0.50));
    out.p75 = Some(quantile(&nums, 0.75));
    out.max = nums.last().copied();
    out
}

/// Linear-interpolated quantile of sorted, non-empty `sorted`.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

fn categorical_summary(name: &str, data_type: DataType, values: &[&Value]) -> ColumnSummary {
    let mut out = ColumnSummary::empty(name, data_type, values.len());
    if values.is_empty() {
        out.unique = Some(0);
        return out;
    }

    // value -> (frequency, first position)
    let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
    for (pos, v) in values.iter().enumerate() {
        counts.entry(v.to_string()).or_insert((0, pos)).0 += 1;
    }
    let top = counts
        .iter()
        .max_by(|(_, (fa, pa)), (_, (fb, pb))| fa.cmp(fb).then(pb.cmp(pa)))
        .map(|(value, (freq, _))| (value.clone(), *freq));

    out.unique = Some(counts.len());
    if let Some((value, freq)) = top {
        out.top = Some(value);
        out.freq = Some(freq);
    }
    out
}
