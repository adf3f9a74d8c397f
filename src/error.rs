use thiserror::Error;

/// Main error type for the tank records extractor.
/// Aggregates the reader taxonomy and errors from the standard library and dependencies.
#[derive(Error, Debug)]
pub enum TankRecordsError {
    #[error("{0}")]
    WithContextError(String),

    /// Cannot open or use a database connection (missing file or driver,
    /// architecture mismatch, permission denied, locked file).
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Operation invoked on a reader that is not in the required state.
    #[error("Invalid reader state: {0}")]
    StateError(String),

    /// Unknown table or column, or a malformed projection.
    #[error("Query failed: {0}")]
    QueryError(String),

    /// Columns of a file do not match the header of the combined output.
    #[error("Columns [{found}] do not match combined header [{expected}]")]
    SchemaMismatch { expected: String, found: String },

    /// A report input lacks a column it depends on.
    #[error("Missing column '{0}'")]
    MissingColumn(String),

    #[error("Unknown fuel grade '{0}'")]
    UnknownGrade(String),

    // Standard library errors
    #[error("{0}")]
    IoError(#[from] std::io::Error),

    // Third-party library errors
    #[error("{0}")]
    CsvError(#[from] csv::Error),

    #[error("{0}")]
    PatternError(#[from] glob::PatternError),

    #[error("{0}")]
    RegexError(#[from] regex::Error),
}

pub(crate) trait ResultMessage {
    fn with_prefix(self, message: &str) -> Self;
}

impl<T> ResultMessage for Result<T, TankRecordsError> {
    fn with_prefix(self, message: &str) -> Self {
        self.map_err(|e| TankRecordsError::WithContextError(format!("{}: {}", message, e)))
    }
}
