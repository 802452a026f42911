//! Error taxonomy for session analysis.
//!
//! Data-quality problems (`MissingColumn`, `EmptyInput`, `InsufficientData`)
//! are recoverable: callers turn them into [`Warning`]s and keep going.
//! `IndexOutOfRange` is a programming error and is the only analysis kind
//! that should stop a run. The remaining variants wrap failures of the
//! collaborators (file parsing, chart rendering, export).

use serde::Serialize;
use std::fmt;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AnalysisError>;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("selected column not present in current data: {column}")]
    MissingColumn { column: String },

    #[error("no usable data: {0}")]
    EmptyInput(String),

    #[error("insufficient data: {what} (need at least {needed}, have {found})")]
    InsufficientData {
        what: &'static str,
        needed: usize,
        found: usize,
    },

    #[error("session index {index} out of range ({len} sessions ingested)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to read spreadsheet: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("failed to read CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error("failed to render chart: {0}")]
    Render(String),

    #[error("failed to export summary: {0}")]
    Export(#[from] rust_xlsxwriter::XlsxError),
}

impl AnalysisError {
    /// Only programming errors halt a run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, AnalysisError::IndexOutOfRange { .. })
    }

    /// Whether this error is a user-data-quality issue that should be shown
    /// as a warning instead of failing the request.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AnalysisError::MissingColumn { .. }
                | AnalysisError::EmptyInput(_)
                | AnalysisError::InsufficientData { .. }
        )
    }

    pub fn kind(&self) -> WarningKind {
        match self {
            AnalysisError::MissingColumn { .. } => WarningKind::MissingColumn,
            AnalysisError::EmptyInput(_) => WarningKind::EmptyInput,
            AnalysisError::InsufficientData { .. } => WarningKind::InsufficientData,
            _ => WarningKind::Other,
        }
    }
}

/// Category of a user-visible, non-fatal problem.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    MissingColumn,
    EmptyInput,
    InsufficientData,
    Other,
}

/// A recovered problem surfaced to the user next to the results.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    pub fn new(kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<&AnalysisError> for Warning {
    fn from(err: &AnalysisError) -> Self {
        Warning::new(err.kind(), err.to_string())
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}
