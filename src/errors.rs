use std::io;

use thiserror::Error;

/// Error type for date handling, input validation, and configuration failures.
///
/// Data-quality problems inside otherwise well-formed input (corrupt records,
/// missing titles, foreign categories) are not errors; the cleaner drops them.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("invalid date: {0}")]
    InvalidDate(String),
    #[error("invalid date format '{input}', expected YYYY-MM-DD")]
    InvalidDateFormat { input: String },
    #[error("schema mismatch on column '{column}': {reason}")]
    SchemaMismatch { column: String, reason: String },
    #[error("configuration error: {0}")]
    Config(String),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl AnalysisError {
    pub(crate) fn schema(column: &str, reason: impl Into<String>) -> Self {
        AnalysisError::SchemaMismatch {
            column: column.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
