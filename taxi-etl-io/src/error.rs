//! Error types for loading and writing trip data

use taxi_etl_core::Error as CoreError;
use thiserror::Error;

/// Error type for CSV loading and artifact writing
#[derive(Error, Debug)]
pub enum Error {
    /// Core library error
    #[error("Core error: {0}")]
    Core(#[from] CoreError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV format error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON format error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The header lacks a required column
    #[error("Missing required column '{0}'")]
    MissingColumn(String),

    /// A field could not be parsed as its column's type
    #[error("Invalid value {value:?} for column '{column}' at line {line}")]
    InvalidField {
        /// One-based line number
        line: u64,
        /// Column name
        column: String,
        /// Raw field text
        value: String,
    },
}

/// Result type for CSV loading and artifact writing
pub type Result<T> = std::result::Result<T, Error>;

impl From<Error> for CoreError {
    fn from(err: Error) -> Self {
        match err {
            Error::Core(err) => err,
            Error::Io(err) => CoreError::Io(err),
            Error::Csv(err) => {
                let line = err.position().map_or(0, csv::Position::line);
                let message = err.to_string();
                match err.into_kind() {
                    csv::ErrorKind::Io(err) => CoreError::Io(err),
                    _ => CoreError::Parse { line, message },
                }
            }
            Error::Json(err) => CoreError::Parse {
                line: err.line() as u64,
                message: err.to_string(),
            },
            Error::MissingColumn(column) => CoreError::Parse {
                line: 1,
                message: format!("missing required column '{column}'"),
            },
            err @ Error::InvalidField { line, .. } => CoreError::Parse {
                line,
                message: err.to_string(),
            },
        }
    }
}
