//! Error types for the taxi ETL pipeline

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::schema::DataType;

/// Result type for taxi ETL operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for taxi ETL operations
#[derive(Error, Debug)]
pub enum Error {
    /// Column lengths or names do not form a valid table
    #[error("Schema error: {0}")]
    Schema(String),

    /// A named column is absent from the table
    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    /// A column was accessed as the wrong type
    #[error("Type mismatch for column '{column}': expected {expected}, got {actual}")]
    TypeMismatch {
        /// Name of the column
        column: String,
        /// Type the caller asked for
        expected: DataType,
        /// Type actually stored
        actual: DataType,
    },

    /// A pickup or dropoff time could not be parsed
    #[error("Malformed timestamp in column '{column}' at row {row}: {value:?}")]
    MalformedTimestamp {
        /// Name of the timestamp column
        column: String,
        /// Zero-based row index within the table being cleaned
        row: usize,
        /// Raw text that failed to parse
        value: String,
    },

    /// Input file does not exist
    #[error("Input not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Input could not be decoded into the trip schema
    #[error("Parse error at line {line}: {message}")]
    Parse {
        /// One-based line number in the source, 0 when unknown
        line: u64,
        /// What went wrong
        message: String,
    },

    /// An output artifact could not be written
    #[error("Failed to write '{name}': {source}")]
    Write {
        /// Artifact name (e.g. `daily_stats`)
        name: String,
        /// Underlying I/O failure
        #[source]
        source: io::Error,
    },

    /// Invalid argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// IO error during file operations
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Build a type mismatch error for `column`
    pub fn type_mismatch(column: &str, expected: DataType, actual: DataType) -> Self {
        Error::TypeMismatch {
            column: column.to_string(),
            expected,
            actual,
        }
    }
}
