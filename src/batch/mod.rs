//! # Batch Combiner Module
//!
//! Walks a directory tree for Access database files, reads the same table from
//! each one and appends the rows to a single CSV file. A file that cannot be
//! opened or read is recorded as a failure and skipped.
use crate::database::Driver;
use crate::error::TankRecordsError;
use crate::output::CombinedWriter;
use crate::reader::with_reader;
use crate::reader::Normalization;
use glob::MatchOptions;
use glob::Pattern;
use std::path::Path;
use std::path::PathBuf;
use tracing::info;
use tracing::warn;

pub mod summary;

pub use summary::CombineSummary;
pub use summary::FileOutcome;
pub use summary::Outcome;

/// Settings of a combine run.
#[derive(Clone, Debug, PartialEq)]
pub struct CombineOptions {
    /// Table read from every file (default: `TankRecords`)
    pub table_name: String,
    /// Columns selected from the table, `None` for all columns
    /// (default: the tank gauging columns)
    pub columns: Option<Vec<String>>,
    /// File extensions searched for, without the dot, matched case-insensitively
    /// (default: `mdb`, `accdb`)
    pub extensions: Vec<String>,
    /// Column normalization applied to every file
    pub normalization: Normalization,
}

impl Default for CombineOptions {
    fn default() -> Self {
        CombineOptions {
            table_name: "TankRecords".to_owned(),
            columns: Some(
                [
                    "BACKGROUND_TIME_STAMP",
                    "TANK_NAME",
                    "PRODUCT_NAME",
                    "PRODUCT_TEMP",
                    "CORRECTION_FACTOR",
                    "GSV",
                    "PRODUCT_LEVEL",
                ]
                .map(str::to_owned)
                .to_vec(),
            ),
            extensions: vec!["mdb".to_owned(), "accdb".to_owned()],
            normalization: Normalization::default(),
        }
    }
}

/// Finds every regular file below `root` with one of `extensions`, sorted by full path.
///
/// # Errors
///
/// Returns an `IoError` when `root` is not a directory. Entries that cannot be read
/// while walking are logged and skipped.
pub fn discover_files(root: &Path, extensions: &[String]) -> Result<Vec<PathBuf>, TankRecordsError> {
    if !root.is_dir() {
        Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Folder '{}' does not exist", root.display()),
        ))?;
    }
    let root = Pattern::escape(&root.to_string_lossy());
    let options = MatchOptions {
        case_sensitive: false,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    };
    let mut files = Vec::new();
    for extension in extensions {
        let pattern = format!("{root}/**/*.{}", Pattern::escape(extension));
        for entry in glob::glob_with(&pattern, options)? {
            match entry {
                Ok(path) if path.is_file() => files.push(path),
                Ok(_) => (),
                Err(e) => warn!(path = %e.path().display(), error = %e.error(), "skipping unreadable entry"),
            }
        }
    }
    files.sort_by(|a, b| a.as_os_str().cmp(b.as_os_str()));
    files.dedup();
    Ok(files)
}

/// Combines `options.table_name` from every database file under `root` into `output`.
///
/// Files are processed one at a time in path order. The output file is created and
/// its header written when the first file succeeds; when no file succeeds it is
/// not touched. A file that fails to open or read, or whose columns differ from the
/// header, is recorded in the summary and skipped.
///
/// # Errors
///
/// Only a missing `root` or a failure to write `output` ends the run early.
pub fn combine(
    driver: &dyn Driver,
    root: &Path,
    output: &Path,
    options: &CombineOptions,
) -> Result<CombineSummary, TankRecordsError> {
    let files = discover_files(root, &options.extensions)?;
    info!(root = %root.display(), files = files.len(), "discovered database files");

    let mut writer = CombinedWriter::new(output);
    let mut summary = CombineSummary::default();
    for path in files {
        let read = with_reader(driver, &path, options.normalization.clone(), |reader| {
            reader.read_table(&options.table_name, options.columns.as_deref())
        })
        .and_then(|table| writer.column_order(&table).map(|order| (table, order)));

        let outcome = match read {
            Ok((table, order)) => {
                let rows = writer.append(&table, &order)?;
                summary.rows_written += rows;
                info!(path = %path.display(), rows, "processed");
                Outcome::Succeeded { rows }
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping file");
                Outcome::Failed { reason: e.to_string() }
            }
        };
        summary.outcomes.push(FileOutcome { path, outcome });
    }

    info!(
        found = summary.found(),
        succeeded = summary.succeeded(),
        failed = summary.failed(),
        rows = summary.rows_written,
        "combine finished"
    );
    Ok(summary)
}
