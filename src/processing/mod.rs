//! Validation, cleaning and description of loaded tables.
//!
//! These functions operate on a [`crate::types::DataSet`] directly; documents expose them through
//! [`crate::ingestion::TabularDocument`].
//!
//! - [`integrity`]: missing values, duplicate rows, emptiness
//! - [`clean`]: column-name normalization, duplicate removal, text trimming
//! - [`describe`]: shape, memory estimate, descriptive statistics
//!
//! ## Example
//!
//! ```rust
//! use tabular_ingest::processing::{clean_and_normalize, validate_integrity};
//! use tabular_ingest::types::{DataSet, DataType, Field, Schema, Value};
//!
//! let mut ds = DataSet::new(
//!     Schema::new(vec![Field::new("Unit Price", DataType::Float64), Field::new("Item", DataType::Utf8)]),
//!     vec![
//!         vec![Value::Float64(1.5), Value::Utf8(" apple".to_string())],
//!         vec![Value::Float64(1.5), Value::Utf8(" apple".to_string())],
//!     ],
//! );
//!
//! let report = validate_integrity(&ds);
//! assert_eq!(report.duplicate_rows, 1);
//!
//! clean_and_normalize(&mut ds);
//! assert_eq!(ds.column_names(), vec!["unit_price", "item"]);
//! assert_eq!(ds.row_count(), 1);
//! assert_eq!(ds.rows[0][1], Value::Utf8("apple".to_string()));
//! ```

pub mod clean;
pub mod describe;
pub mod integrity;

pub use clean::{clean_and_normalize, normalize_column_name, CleanReport};
pub use describe::{BasicInfo, ColumnSummary, DatasetSummary};
pub use integrity::{validate_integrity, IntegrityProblem, IntegrityReport};
