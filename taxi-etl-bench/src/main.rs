//! Taxi trip ETL command line runner

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use taxi_etl_bench::{run_benchmark, BenchConfig, Pipeline, PipelineConfig, PipelineError};
use taxi_etl_core::{Loader, MetricValue, Metrics, SystemMeter};
use taxi_etl_io::{CsvLoader, CsvLoaderOptions, DirectorySink, SinkOptions};

#[derive(Parser)]
#[command(name = "taxi-etl")]
#[command(about = "Clean, aggregate and filter taxi trip records")]
#[command(version)]
struct Args {
    /// Input CSV file with a header row
    input: PathBuf,

    /// Directory the result files are written to
    #[arg(short, long, default_value = "results")]
    output_dir: PathBuf,

    /// Only load the first N rows
    #[arg(long)]
    sample_size: Option<usize>,

    /// Re-run the in-memory stages this many times and report timings
    #[arg(long, default_value = "1")]
    iterations: usize,

    /// Prefix for output file names
    #[arg(long)]
    prefix: Option<String>,

    /// Log verbosity level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: tracing::Level,

    /// Worker threads (0 = number of CPUs)
    #[arg(long, default_value = "0")]
    threads: usize,
}

fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt().with_max_level(args.log_level).with_target(false).init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            if let Some(failure) = err.downcast_ref::<PipelineError>() {
                if !failure.metrics.is_empty() {
                    eprintln!("\nMetrics before failure:");
                    print_metrics(&failure.metrics);
                }
            }
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<()> {
    let mut config = PipelineConfig::default();
    if args.threads > 0 {
        config.worker_threads = args.threads;
    }
    if let Err(err) = rayon::ThreadPoolBuilder::new()
        .num_threads(config.worker_threads)
        .build_global()
    {
        tracing::warn!(error = %err, "could not size the worker pool");
    }

    let loader = CsvLoader::new(CsvLoaderOptions {
        max_rows: args.sample_size,
        ..CsvLoaderOptions::default()
    });
    let mut sink = DirectorySink::create(
        &args.output_dir,
        SinkOptions {
            prefix: args.prefix.clone(),
            ..SinkOptions::default()
        },
    )
    .with_context(|| format!("creating output directory {}", args.output_dir.display()))?;

    let pipeline = Pipeline::new(config, Arc::new(SystemMeter::new()));
    tracing::info!(
        input = %args.input.display(),
        output = %args.output_dir.display(),
        threads = pipeline.config().worker_threads,
        "starting pipeline"
    );
    let output = pipeline.execute(&loader, &args.input, &mut sink)?;

    println!("=== Taxi ETL Pipeline ===");
    println!("  Run id:              {}", output.run_id);
    print_metrics(&output.metrics);
    println!("  Output directory:    {}", sink.directory().display());

    if args.iterations > 1 {
        let table = loader.load(&args.input)?;
        let result = run_benchmark(
            &pipeline,
            &table,
            &BenchConfig {
                iterations: args.iterations,
                warmup_iterations: 0,
            },
        )?;

        println!("\n=== Benchmark ({} iterations) ===", result.iterations);
        println!("  Average time: {:?}", result.avg_time);
        println!("  Min time:     {:?}", result.min_time);
        println!("  Max time:     {:?}", result.max_time);
        println!("  Throughput:   {:.2} rows/sec", result.throughput);
        if !result.identical {
            tracing::warn!("iterations produced differing results");
        }
    }

    Ok(())
}

fn print_metrics(metrics: &Metrics) {
    for (name, value) in metrics.iter() {
        match value {
            MetricValue::Count(count) => println!("  {name:<20} {count}"),
            MetricValue::Seconds(seconds) => println!("  {name:<20} {seconds:.3} s"),
            MetricValue::Megabytes(mb) => println!("  {name:<20} {mb:.2} MB"),
        }
    }
}
