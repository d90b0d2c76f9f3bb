//! `tabular-ingest` loads delimited text files and spreadsheet workbooks into an in-memory
//! [`types::DataSet`], then validates, cleans and describes them.
//!
//! ## What you can load
//!
//! - **Delimited text**: `.csv`, `.txt`, `.tsv`. The encoding (byte-order mark, UTF-8 check,
//!   statistical guess) and the delimiter (`,` `;` tab `|`) are detected unless given explicitly.
//! - **Workbooks** (requires the Cargo feature `excel`, on by default): `.xlsx`, `.xls`, `.xlsm`.
//!   One sheet is read at a time; an unknown sheet name falls back to the first sheet.
//!
//! Column types are inferred from the data:
//!
//! - [`types::DataType::Int64`]
//! - [`types::DataType::Float64`]
//! - [`types::DataType::Bool`]
//! - [`types::DataType::Utf8`]
//!
//! Empty cells and the markers `N/A`, `NULL`, `null`, `NaN` (plus `n/a` for text files) map to
//! [`types::Value::Null`].
//!
//! ## Quick example
//!
//! ```no_run
//! use tabular_ingest::ingestion::{DelimitedTextLoader, TabularDocument};
//!
//! let mut doc = DelimitedTextLoader::new("data.csv");
//! if !doc.load() {
//!     eprintln!("load failed: {}", doc.last_error().unwrap());
//!     return;
//! }
//! if !doc.has_required_columns(&["id", "amount"]) {
//!     return;
//! }
//! println!("{}", doc.describe_summary().unwrap());
//! ```
//!
//! A successful load already runs an integrity check and, when the table is valid, the cleaning
//! pass (normalized column names, duplicate rows removed, text trimmed).
//!
//! ## Modules
//!
//! - [`ingestion`]: loaders, encoding/delimiter detection, observers
//! - [`processing`]: integrity checks, cleaning, descriptive statistics
//! - [`persist`]: writing tables to delimited files, workbooks or a relational sink
//! - [`config`]: deserializable loader options and store connection settings
//! - [`types`]: schema + in-memory dataset types
//! - [`error`]: error types

pub mod config;
pub mod error;
pub mod ingestion;
pub mod persist;
pub mod processing;
pub mod types;

pub use error::{IngestionError, IngestionResult, LoadStage};
