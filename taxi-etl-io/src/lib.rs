//! Loading and writing for the taxi ETL pipeline
//!
//! This crate provides the concrete collaborators the pipeline talks to:
//! a CSV [`Loader`](taxi_etl_core::Loader) and a directory
//! [`Sink`](taxi_etl_core::Sink) writing CSV tables and JSON documents.

#![warn(missing_docs)]

mod error;

pub mod csv;
pub mod sink;

pub use crate::csv::{CsvLoader, CsvLoaderOptions, CsvTableWriter, CsvWriterOptions};
pub use error::{Error, Result};
pub use sink::{DirectorySink, SinkOptions};
