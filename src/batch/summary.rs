use std::fmt::Display;
use std::path::PathBuf;

/// Result of processing one database file.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    Succeeded { rows: usize },
    Failed { reason: String },
}

/// Per-file outcome record of a combine run.
#[derive(Clone, Debug, PartialEq)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub outcome: Outcome,
}

impl FileOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Succeeded { .. })
    }
}

/// End-of-run report of a combine run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CombineSummary {
    /// One record per discovered file, in processing order
    pub outcomes: Vec<FileOutcome>,
    /// Data rows written to the combined output
    pub rows_written: usize,
}

impl CombineSummary {
    pub fn found(&self) -> usize {
        self.outcomes.len()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|outcome| outcome.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.found() - self.succeeded()
    }

    /// Failed files with their reasons.
    pub fn failures(&self) -> impl Iterator<Item = (&PathBuf, &str)> + '_ {
        self.outcomes.iter().filter_map(|outcome| match &outcome.outcome {
            Outcome::Failed { reason } => Some((&outcome.path, reason.as_str())),
            Outcome::Succeeded { .. } => None,
        })
    }
}

impl Display for CombineSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "found: {}, succeeded: {}, failed: {}, rows: {}",
            self.found(),
            self.succeeded(),
            self.failed(),
            self.rows_written
        )?;
        for (path, reason) in self.failures() {
            write!(f, "\n  {}: {}", path.display(), reason)?;
        }
        Ok(())
    }
}
