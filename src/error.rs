//! Dashboard Error Module
//! Error kinds surfaced to the viewer. Every user-facing variant names the dataset.

use polars::prelude::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DashboardError {
    /// File or sheet missing, unreadable or in an unsupported format.
    #[error("{dataset}: cannot read {}: {reason}", path.display())]
    DataSource {
        dataset: String,
        path: PathBuf,
        reason: String,
    },
    /// Expected column missing or a value that cannot be coerced.
    #[error("{dataset}: field '{column}' {reason}")]
    FieldParse {
        dataset: String,
        column: String,
        reason: String,
    },
    /// The current filter selection excludes every row.
    #[error("{dataset}: no data for the current selection")]
    EmptyResult { dataset: String },
    #[error("{dataset}: chart '{chart}' cannot be drawn: {reason}")]
    Render {
        dataset: String,
        chart: String,
        reason: String,
    },
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("table operation failed: {0}")]
    Frame(#[from] PolarsError),
}

impl DashboardError {
    pub fn field(dataset: &str, column: &str, reason: impl Into<String>) -> Self {
        Self::FieldParse {
            dataset: dataset.to_string(),
            column: column.to_string(),
            reason: reason.into(),
        }
    }

    pub fn missing_column(dataset: &str, column: &str) -> Self {
        Self::field(dataset, column, "is missing from the dataset")
    }

    pub fn source(dataset: &str, path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::DataSource {
            dataset: dataset.to_string(),
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// True when the error is the empty-selection case rather than a failure.
    pub fn is_empty_result(&self) -> bool {
        matches!(self, Self::EmptyResult { .. })
    }
}

pub type Result<T> = std::result::Result<T, DashboardError>;
