//! Cleaning, aggregation and filtering stages for taxi trip tables
//!
//! Every stage reads a [`Table`](taxi_etl_core::Table) and returns a new
//! one (or counts), leaving its input untouched. Enable the `parallel`
//! feature to accumulate groups and sort on the rayon thread pool; results
//! are identical either way.

#![warn(missing_docs)]

pub mod aggregate;
pub mod clean;
pub mod filter;
pub mod predicate;
pub mod stats;
pub mod summary;
pub mod timestamp;

pub use aggregate::{AggregationResults, Aggregator, GroupKey, GroupSpec, Statistic};
pub use clean::{Cleaner, CleaningReport, StepReport, ValidityRules};
pub use filter::{FilterCounts, FilterEngine, TripFilter, RUSH_HOURS};
pub use predicate::{Operator, Predicate, Scalar};
pub use stats::{CompensatedSum, SummaryStats};
pub use summary::{DateRange, Summary};
pub use timestamp::parse_timestamp;
