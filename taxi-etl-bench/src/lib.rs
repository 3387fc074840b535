//! End-to-end taxi trip ETL pipeline with stage instrumentation
//!
//! [`Pipeline`] chains the loader, cleaner, aggregator, filter engine and
//! sink, measuring every stage. [`bench`] repeats runs for timing and
//! [`synthetic`] generates reproducible input.

#![warn(missing_docs)]

pub mod bench;
pub mod pipeline;
pub mod synthetic;

pub use bench::{run_benchmark, BenchConfig, BenchResult};
pub use pipeline::{
    save_results, CancelToken, Pipeline, PipelineConfig, PipelineError, PipelineErrorKind,
    PipelineOutput, Stage,
};
pub use synthetic::{SyntheticConfig, SyntheticTrips};
