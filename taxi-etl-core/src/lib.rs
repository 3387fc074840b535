//! Core data structures and abstractions for the taxi trip ETL pipeline
//!
//! This crate provides the columnar [`Table`] that every pipeline stage
//! consumes and produces, the categorical types derived during cleaning,
//! the metrics record, and the traits the pipeline uses to talk to the
//! outside world ([`Loader`], [`Sink`], [`Meter`]).

#![warn(missing_docs)]

pub mod categorical;
pub mod column;
pub mod error;
pub mod meter;
pub mod metrics;
pub mod schema;
pub mod sink;
pub mod source;
pub mod table;
pub mod transform;
pub mod trip;

// Re-export key types for convenience
pub use categorical::{DayOfWeek, DistanceBin};
pub use column::{Column, ColumnData};
pub use error::{Error, Result};
pub use meter::{ManualMeter, Measurement, Meter, SystemMeter, Usage};
pub use metrics::{MetricValue, Metrics};
pub use schema::{DataType, Field, Schema};
pub use sink::{MemorySink, Sink};
pub use source::{Loader, MemoryLoader};
pub use table::Table;
pub use transform::{TableTransform, TransformChain, TransformOutcome};
