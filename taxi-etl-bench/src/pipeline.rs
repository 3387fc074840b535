//! Pipeline orchestration
//!
//! A [`Pipeline`] drives load, clean, aggregate, sort/filter and save over
//! one table, timing each stage with an injected [`Meter`] and recording
//! the results in a single [`Metrics`] record. The first failing stage
//! aborts the run; the error carries the metrics collected up to that
//! point.

use std::fmt;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use taxi_etl_core::error::{Error, Result as CoreResult};
use taxi_etl_core::{Loader, Measurement, Meter, MetricValue, Metrics, Sink, Table};
use taxi_etl_transforms::aggregate::DEFAULT_CHUNK_ROWS;
use taxi_etl_transforms::{
    AggregationResults, Aggregator, Cleaner, CleaningReport, FilterCounts, FilterEngine, Summary,
    TripFilter, ValidityRules,
};

/// Configuration for a pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Row validity thresholds
    pub rules: ValidityRules,

    /// Rows per aggregation chunk
    pub chunk_rows: usize,

    /// Number of worker threads for parallel aggregation and sorting
    pub worker_threads: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            rules: ValidityRules::default(),
            chunk_rows: DEFAULT_CHUNK_ROWS,
            worker_threads: num_cpus::get(),
        }
    }
}

/// Pipeline stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Read the input
    Load,
    /// Validate rows and derive columns
    Clean,
    /// Grouped statistics and summary
    Aggregate,
    /// Full sort and filter counts
    SortFilter,
    /// Write result artifacts
    Save,
}

impl Stage {
    /// Prefix of the stage's metric keys
    pub fn name(self) -> &'static str {
        match self {
            Stage::Load => "load",
            Stage::Clean => "clean",
            Stage::Aggregate => "aggregate",
            Stage::SortFilter => "sort_filter",
            Stage::Save => "save",
        }
    }

    fn records_memory(self) -> bool {
        self != Stage::Save
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Cloneable flag used to stop a run between stages
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create a token that is not cancelled
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. There is no way to undo it.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Check whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Why a run stopped
#[derive(thiserror::Error, Debug)]
pub enum PipelineErrorKind {
    /// The stage returned an error
    #[error("failed: {0}")]
    Failed(#[from] Error),

    /// Cancellation was requested before the stage started
    #[error("cancelled")]
    Cancelled,
}

/// A failed or cancelled run, with the metrics recorded before it stopped
#[derive(thiserror::Error, Debug)]
#[error("stage '{stage}' {kind}")]
pub struct PipelineError {
    /// Stage that did not complete
    pub stage: Stage,

    /// What happened
    pub kind: PipelineErrorKind,

    /// Metrics of the stages that completed
    pub metrics: Metrics,
}

impl PipelineError {
    /// Check whether the run was cancelled rather than failed
    pub fn is_cancelled(&self) -> bool {
        matches!(self.kind, PipelineErrorKind::Cancelled)
    }
}

/// Everything a successful run produced
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Identifier of the run, also attached to its log span
    pub run_id: Uuid,

    /// Valid rows with derived columns
    pub cleaned: Table,

    /// Rows removed by each check
    pub cleaning: CleaningReport,

    /// Grouped statistics
    pub aggregations: AggregationResults,

    /// Filter and sort row counts
    pub filters: FilterCounts,

    /// Headline figures
    pub summary: Summary,

    /// Per-stage measurements
    pub metrics: Metrics,
}

/// Per-run bookkeeping: the meter, the cancel flag and the metrics so far
struct RunContext<'a> {
    meter: &'a dyn Meter,
    cancel: &'a CancelToken,
    metrics: Metrics,
}

impl<'a> RunContext<'a> {
    fn new(meter: &'a dyn Meter, cancel: &'a CancelToken) -> Self {
        Self {
            meter,
            cancel,
            metrics: Metrics::new(),
        }
    }

    fn stage<T>(&mut self, stage: Stage, f: impl FnOnce() -> CoreResult<T>) -> Result<T, PipelineError> {
        if self.cancel.is_cancelled() {
            tracing::warn!(%stage, "run cancelled");
            return Err(self.fail(stage, PipelineErrorKind::Cancelled));
        }

        tracing::info!(%stage, "stage started");
        let measurement = Measurement::start(self.meter);
        let result = f();
        let usage = measurement.finish(self.meter);

        match result {
            Ok(value) => {
                self.metrics
                    .record_duration(format!("{}_time", stage.name()), usage.elapsed);
                if stage.records_memory() {
                    self.metrics
                        .record_memory_delta(format!("{}_memory", stage.name()), usage.memory_delta_bytes);
                }
                tracing::info!(
                    %stage,
                    elapsed_ms = usage.elapsed.as_millis() as u64,
                    "stage finished"
                );
                Ok(value)
            }
            Err(err) => {
                tracing::error!(%stage, error = %err, "stage failed");
                Err(self.fail(stage, PipelineErrorKind::Failed(err)))
            }
        }
    }

    fn fail(&mut self, stage: Stage, kind: PipelineErrorKind) -> PipelineError {
        PipelineError {
            stage,
            kind,
            metrics: std::mem::take(&mut self.metrics),
        }
    }
}

/// Runs the ETL stages over one table
pub struct Pipeline {
    config: PipelineConfig,
    meter: Arc<dyn Meter>,
    cleaner: Cleaner,
    aggregator: Aggregator,
    filters: FilterEngine,
    cancel: CancelToken,
}

impl Pipeline {
    /// Create a pipeline measuring stages with `meter`
    pub fn new(config: PipelineConfig, meter: Arc<dyn Meter>) -> Self {
        let cleaner = Cleaner::new(config.rules.clone());
        let aggregator = Aggregator::new().with_chunk_rows(config.chunk_rows);
        Self {
            config,
            meter,
            cleaner,
            aggregator,
            filters: FilterEngine::new(),
            cancel: CancelToken::new(),
        }
    }

    /// Configuration in use
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Token that cancels this pipeline's runs between stages.
    ///
    /// The token is never reset: once cancelled, every later run on this
    /// pipeline returns [`PipelineErrorKind::Cancelled`].
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Run the in-memory stages (clean, aggregate, sort/filter) on `table`
    pub fn run(&self, table: Table) -> Result<PipelineOutput, PipelineError> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("pipeline", %run_id);
        let _guard = span.enter();

        let mut ctx = RunContext::new(self.meter.as_ref(), &self.cancel);
        let mut output = self.process(table, &mut ctx, run_id)?;
        output.metrics = ctx.metrics;
        Ok(output)
    }

    /// Load from `path`, run every stage and write the results to `sink`.
    ///
    /// `metrics` is written last so that it includes `save_time`,
    /// `total_time` and `peak_memory`.
    pub fn execute(
        &self,
        loader: &dyn Loader,
        path: &Path,
        sink: &mut dyn Sink,
    ) -> Result<PipelineOutput, PipelineError> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("pipeline", %run_id);
        let _guard = span.enter();

        let started = Measurement::start(self.meter.as_ref());
        let mut ctx = RunContext::new(self.meter.as_ref(), &self.cancel);

        let table = ctx.stage(Stage::Load, || loader.load(path))?;
        ctx.metrics.record_count("rows_loaded", table.row_count());

        let mut output = self.process(table, &mut ctx, run_id)?;
        ctx.stage(Stage::Save, || save_results(&output, &mut *sink))?;

        let total = started.finish(self.meter.as_ref());
        ctx.metrics.record_duration("total_time", total.elapsed);
        let peak = ctx.metrics.peak_memory().unwrap_or(0.0);
        ctx.metrics.record("peak_memory", MetricValue::Megabytes(peak));

        let written = write_metrics(&ctx.metrics, sink).and_then(|()| sink.flush());
        if let Err(err) = written {
            return Err(ctx.fail(Stage::Save, PipelineErrorKind::Failed(err)));
        }

        tracing::info!(
            rows_loaded = output.cleaning.rows_in,
            rows_after_cleaning = output.cleaned.row_count(),
            "run complete"
        );
        output.metrics = ctx.metrics;
        Ok(output)
    }

    fn process(&self, table: Table, ctx: &mut RunContext<'_>, run_id: Uuid) -> Result<PipelineOutput, PipelineError> {
        let (cleaned, cleaning) = ctx.stage(Stage::Clean, || self.cleaner.clean(table))?;
        ctx.metrics.record_count("rows_before_cleaning", cleaning.rows_in);
        ctx.metrics.record_count("rows_after_cleaning", cleaned.row_count());

        let (aggregations, summary) = ctx.stage(Stage::Aggregate, || {
            Ok((self.aggregator.aggregate(&cleaned)?, Summary::from_table(&cleaned)?))
        })?;

        let filters = ctx.stage(Stage::SortFilter, || self.filters.run(&cleaned))?;
        ctx.metrics.record_count("sorted_rows", filters.sorted_rows);
        for filter in TripFilter::ALL {
            ctx.metrics.record_count(filter.metric_key(), filters.get(filter));
        }

        Ok(PipelineOutput {
            run_id,
            cleaned,
            cleaning,
            aggregations,
            filters,
            summary,
            metrics: Metrics::new(),
        })
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

/// Write the aggregated tables and the summary
pub fn save_results(output: &PipelineOutput, sink: &mut dyn Sink) -> CoreResult<()> {
    for (name, table) in output.aggregations.named_tables() {
        sink.write_table(table, name)?;
    }
    let summary = to_json(&output.summary, "summary")?;
    sink.write_json(&summary, "summary")
}

fn write_metrics(metrics: &Metrics, sink: &mut dyn Sink) -> CoreResult<()> {
    let value = to_json(metrics, "metrics")?;
    sink.write_json(&value, "metrics")
}

fn to_json<T: Serialize>(value: &T, name: &str) -> CoreResult<serde_json::Value> {
    serde_json::to_value(value).map_err(|err| Error::Write {
        name: name.to_string(),
        source: io::Error::from(err),
    })
}
