//! Stage report types.
//!
//! A stage report keeps the aggregate `(succeeded, total)` counts for one
//! batch stage plus the list of items that failed, keyed by file stem.

use serde::ser::SerializeStruct;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

use crate::error::{FpsynthError, IssueCode, Severity};

/// Success counts for one stage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StageStats {
    pub succeeded: usize,
    pub total: usize,
}

impl StageStats {
    pub fn new(succeeded: usize, total: usize) -> Self {
        Self { succeeded, total }
    }

    /// `succeeded / total`, or `0.0` for an empty stage.
    pub fn rate(&self) -> f64 {
        ratio(self.succeeded, self.total)
    }

    pub fn failed(&self) -> usize {
        self.total.saturating_sub(self.succeeded)
    }
}

/// Ratio that treats an empty denominator as zero.
pub fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

// Serialize the derived rate alongside the counts.
impl Serialize for StageStats {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("StageStats", 3)?;
        state.serialize_field("succeeded", &self.succeeded)?;
        state.serialize_field("total", &self.total)?;
        state.serialize_field("rate", &self.rate())?;
        state.end()
    }
}

/// One item that did not make it through a stage.
#[derive(Clone, Debug, Serialize)]
pub struct ItemFailure {
    /// File stem of the item; stable across stages.
    pub item: String,
    pub path: PathBuf,
    pub code: IssueCode,
    pub severity: Severity,
    pub message: String,
}

impl ItemFailure {
    pub fn from_error(item: impl Into<String>, path: impl Into<PathBuf>, err: &FpsynthError) -> Self {
        Self {
            item: item.into(),
            path: path.into(),
            code: err.code(),
            severity: err.severity(),
            message: err.to_string(),
        }
    }
}

/// Outcome of one batch stage.
#[derive(Clone, Debug, Default, Serialize)]
pub struct StageReport {
    pub stage: String,
    pub stats: StageStats,
    /// Items never dispatched because the run was cancelled.
    pub cancelled: usize,
    pub failures: Vec<ItemFailure>,
}

impl StageReport {
    pub fn new(stage: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            ..Default::default()
        }
    }

    pub fn succeeded(&self) -> usize {
        self.stats.succeeded
    }

    pub fn total(&self) -> usize {
        self.stats.total
    }

    pub fn rate(&self) -> f64 {
        self.stats.rate()
    }

    /// Number of failures with the given code.
    pub fn count_code(&self, code: IssueCode) -> usize {
        self.failures.iter().filter(|f| f.code == code).count()
    }

    pub fn failed_items(&self) -> impl Iterator<Item = &str> {
        self.failures.iter().map(|f| f.item.as_str())
    }
}

impl fmt::Display for StageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{}: {}/{} succeeded ({:.1}%)",
            self.stage,
            self.stats.succeeded,
            self.stats.total,
            self.rate() * 100.0
        )?;

        if self.cancelled > 0 {
            writeln!(f, "  {} item(s) not dispatched (cancelled)", self.cancelled)?;
        }

        if !self.failures.is_empty() {
            writeln!(f, "  Failures ({}):", self.failures.len())?;
            for failure in &self.failures {
                writeln!(f, "    - {}: {}", failure.item, failure.message)?;
            }
        }

        Ok(())
    }
}
