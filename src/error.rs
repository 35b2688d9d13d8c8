use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

/// The main error type for fpsynth operations.
#[derive(Debug, Error)]
pub enum FpsynthError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Input not found: {path}")]
    MissingInput { path: PathBuf },

    #[error("{tool} failed on {path}: {message}")]
    ExternalToolFailure {
        tool: String,
        path: PathBuf,
        message: String,
    },

    #[error("{tool} timed out after {timeout:?} on {path}")]
    ExternalToolTimeout {
        tool: String,
        path: PathBuf,
        timeout: Duration,
    },

    #[error("Malformed record in {path} at line {line}: {message}")]
    MalformedRecord {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("No usable minutiae in {path}")]
    EmptyResult { path: PathBuf },

    #[error("Minutiae record is empty")]
    EmptyRecord,

    #[error("{path} has {count} minutiae, below the minimum of {minimum}")]
    ThresholdRejected {
        path: PathBuf,
        count: usize,
        minimum: usize,
    },

    #[error("{path} scored {score}, above the accepted maximum of {max_score}")]
    QualityRejected {
        path: PathBuf,
        score: u32,
        max_score: u32,
    },

    #[error("{path} shares its stem with {first}, which owns that output")]
    DuplicateStem { path: PathBuf, first: PathBuf },

    #[error("Failed to read {path}: {source}")]
    InputIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    OutputIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write image {path}: {source}")]
    ImageWrite {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to parse config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to serialize report: {0}")]
    ReportWrite(#[from] serde_json::Error),
}

/// How loudly a per-item failure should be reported.
///
/// Data problems (a bad line, an empty record, a rejected count) are
/// warnings; environment problems (missing files, tools, IO) are errors.
/// Neither aborts a batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Error,
}

/// Stable issue codes for programmatic consumption of stage reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCode {
    MissingInput,
    ExternalToolFailure,
    MalformedRecord,
    EmptyResult,
    ThresholdRejected,
    DuplicateStem,
    IoFailure,
    Configuration,
}

impl FpsynthError {
    pub fn severity(&self) -> Severity {
        match self.code() {
            IssueCode::MalformedRecord | IssueCode::EmptyResult | IssueCode::ThresholdRejected => {
                Severity::Warning
            }
            _ => Severity::Error,
        }
    }

    pub fn code(&self) -> IssueCode {
        match self {
            FpsynthError::MissingInput { .. } => IssueCode::MissingInput,
            FpsynthError::ExternalToolFailure { .. } | FpsynthError::ExternalToolTimeout { .. } => {
                IssueCode::ExternalToolFailure
            }
            FpsynthError::MalformedRecord { .. } => IssueCode::MalformedRecord,
            FpsynthError::EmptyResult { .. } | FpsynthError::EmptyRecord => IssueCode::EmptyResult,
            FpsynthError::ThresholdRejected { .. } | FpsynthError::QualityRejected { .. } => {
                IssueCode::ThresholdRejected
            }
            FpsynthError::DuplicateStem { .. } => IssueCode::DuplicateStem,
            FpsynthError::Io(_)
            | FpsynthError::InputIo { .. }
            | FpsynthError::OutputIo { .. }
            | FpsynthError::ImageWrite { .. } => IssueCode::IoFailure,
            FpsynthError::ConfigParse { .. }
            | FpsynthError::InvalidConfig(_)
            | FpsynthError::ReportWrite(_) => IssueCode::Configuration,
        }
    }
}
