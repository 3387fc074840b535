//! Repeated pipeline runs with timing statistics

use std::time::{Duration, Instant};

use taxi_etl_core::Table;

use crate::pipeline::{Pipeline, PipelineError, PipelineOutput};

/// Benchmark configuration
#[derive(Debug, Clone)]
pub struct BenchConfig {
    /// Number of timed iterations
    pub iterations: usize,

    /// Untimed iterations run first
    pub warmup_iterations: usize,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            iterations: 10,
            warmup_iterations: 1,
        }
    }
}

/// Benchmark result
#[derive(Debug, Clone)]
pub struct BenchResult {
    /// Name of the benchmark
    pub name: String,

    /// Number of timed iterations
    pub iterations: usize,

    /// Total time taken
    pub total_time: Duration,

    /// Average time per iteration
    pub avg_time: Duration,

    /// Min time per iteration
    pub min_time: Duration,

    /// Max time per iteration
    pub max_time: Duration,

    /// Input rows per iteration
    pub rows: usize,

    /// Throughput (input rows/second)
    pub throughput: f64,

    /// Whether every iteration produced bit-identical results
    pub identical: bool,
}

/// Run the in-memory stages on `table` repeatedly.
///
/// Each iteration works on its own clone of the input. The outputs of
/// every timed iteration are compared with the first one.
pub fn run_benchmark(
    pipeline: &Pipeline,
    table: &Table,
    config: &BenchConfig,
) -> Result<BenchResult, PipelineError> {
    for _ in 0..config.warmup_iterations {
        pipeline.run(table.clone())?;
    }

    let iterations = config.iterations.max(1);
    let mut times = Vec::with_capacity(iterations);
    let mut reference: Option<PipelineOutput> = None;
    let mut identical = true;
    let start_total = Instant::now();

    for i in 0..iterations {
        let start = Instant::now();
        let output = pipeline.run(table.clone())?;
        times.push(start.elapsed());
        tracing::debug!(iteration = i, elapsed_ms = times[i].as_millis() as u64, "iteration finished");

        match &reference {
            Some(first) => identical &= same_results(first, &output),
            None => reference = Some(output),
        }
    }

    let total_time = start_total.elapsed();
    let avg_time = times.iter().sum::<Duration>() / iterations as u32;
    let min_time = times.iter().copied().min().unwrap_or_default();
    let max_time = times.iter().copied().max().unwrap_or_default();
    let throughput = if avg_time.is_zero() {
        0.0
    } else {
        table.row_count() as f64 / avg_time.as_secs_f64()
    };

    Ok(BenchResult {
        name: "pipeline".to_string(),
        iterations,
        total_time,
        avg_time,
        min_time,
        max_time,
        rows: table.row_count(),
        throughput,
        identical,
    })
}

fn same_results(a: &PipelineOutput, b: &PipelineOutput) -> bool {
    a.cleaned.same_bits(&b.cleaned)
        && a.cleaning == b.cleaning
        && a.filters == b.filters
        && a
            .aggregations
            .named_tables()
            .iter()
            .zip(b.aggregations.named_tables().iter())
            .all(|((_, x), (_, y))| x.same_bits(y))
}
