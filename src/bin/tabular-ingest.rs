//! Load a delimited file or workbook, validate it and print a summary.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use tabular_ingest::ingestion::{DelimitedTextLoader, TabularDocument, DELIMITED_EXTENSIONS};
use tabular_ingest::persist::{DataSaver, WritePolicy};

#[derive(Debug, Parser)]
#[command(name = "tabular-ingest")]
#[command(about = "Load a CSV/TSV file or a workbook sheet, then validate, clean and describe it")]
#[command(version)]
struct Args {
    /// File to load (.csv, .txt, .tsv, .xlsx, .xls, .xlsm)
    path: PathBuf,

    /// Field delimiter for text files (detected when omitted)
    #[arg(long, short)]
    delimiter: Option<char>,

    /// Encoding label for text files, e.g. utf-8, latin-1 (detected when omitted)
    #[arg(long, short)]
    encoding: Option<String>,

    /// Sheet to read from a workbook (first sheet when omitted)
    #[arg(long, short)]
    sheet: Option<String>,

    /// Columns that must be present, comma separated
    #[arg(long, value_delimiter = ',')]
    require: Vec<String>,

    /// Print the first N rows
    #[arg(long, default_value_t = 0)]
    preview: usize,

    /// Save the loaded table to a .csv or .xlsx file
    #[arg(long, short)]
    output: Option<String>,

    /// Print the summary as JSON instead of text
    #[arg(long)]
    json: bool,
}

fn is_delimited(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| DELIMITED_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn open_document(args: &Args) -> Result<Box<dyn TabularDocument>, String> {
    if is_delimited(&args.path) || !cfg!(feature = "excel") {
        let mut doc = DelimitedTextLoader::new(&args.path);
        if let Some(d) = args.delimiter {
            let d = u8::try_from(d)
                .ok()
                .filter(u8::is_ascii)
                .ok_or_else(|| format!("delimiter {d:?} is not a single ASCII character"))?;
            doc = doc.with_delimiter(d);
        }
        if let Some(e) = args.encoding.as_deref() {
            doc = doc.with_encoding(e);
        }
        return Ok(Box::new(doc));
    }

    #[cfg(feature = "excel")]
    {
        let mut doc = tabular_ingest::ingestion::SpreadsheetLoader::new(&args.path);
        if let Some(s) = args.sheet.as_deref() {
            doc = doc.with_sheet(s);
        }
        Ok(Box::new(doc))
    }
    #[cfg(not(feature = "excel"))]
    unreachable!()
}

fn run(args: &Args) -> Result<(), String> {
    let mut doc = open_document(args)?;
    if !doc.load() {
        let reason = doc.last_error().map(|e| e.to_string()).unwrap_or_default();
        return Err(format!("could not load '{}': {reason}", args.path.display()));
    }

    if !args.require.is_empty() {
        let required: Vec<&str> = args.require.iter().map(String::as_str).collect();
        if !doc.has_required_columns(&required) {
            let missing = doc.missing_columns(&required).unwrap_or_default();
            return Err(format!("missing required columns: {}", missing.join(", ")));
        }
    }

    let summary = doc.describe_summary().ok_or("no table after load")?;
    if args.json {
        let json = serde_json::to_string_pretty(&summary).map_err(|e| e.to_string())?;
        println!("{json}");
    } else {
        print!("{summary}");
    }

    if args.preview > 0 {
        if let Some(head) = doc.preview(args.preview) {
            println!("{}", head.column_names().join(" | "));
            for row in &head.rows {
                let cells: Vec<String> = row.iter().map(|v| v.to_string()).collect();
                println!("{}", cells.join(" | "));
            }
        }
    }

    if let Some(dest) = args.output.as_deref() {
        if !DataSaver::new().save(doc.table(), dest, WritePolicy::Replace) {
            return Err(format!("could not save to '{dest}'"));
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
