use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;

use taxi_etl_bench::{CancelToken, Pipeline, PipelineConfig, PipelineErrorKind, Stage};
use taxi_etl_core::error::Result as CoreResult;
use taxi_etl_core::trip::*;
use taxi_etl_core::{
    ColumnData, DistanceBin, Error, Loader, ManualMeter, MemoryLoader, MemorySink, MetricValue, Table,
};
use taxi_etl_io::{CsvLoader, CsvLoaderOptions, DirectorySink, SinkOptions};

/// distance, passengers, amount, pickup, dropoff
type Trip = (f64, i64, f64, &'static str, &'static str);

fn trips_table(trips: &[Trip]) -> Table {
    let n = trips.len();
    Table::from_columns([
        (PICKUP_DATETIME, ColumnData::Utf8(trips.iter().map(|t| t.3.to_string()).collect())),
        (DROPOFF_DATETIME, ColumnData::Utf8(trips.iter().map(|t| t.4.to_string()).collect())),
        (PASSENGER_COUNT, ColumnData::Int64(trips.iter().map(|t| t.1).collect())),
        (TRIP_DISTANCE, ColumnData::Float64(trips.iter().map(|t| t.0).collect())),
        (PICKUP_LONGITUDE, ColumnData::Float64(vec![-73.98; n])),
        (PICKUP_LATITUDE, ColumnData::Float64(vec![40.75; n])),
        (DROPOFF_LONGITUDE, ColumnData::Float64(vec![-73.96; n])),
        (DROPOFF_LATITUDE, ColumnData::Float64(vec![40.77; n])),
        (TOTAL_AMOUNT, ColumnData::Float64(trips.iter().map(|t| t.2).collect())),
    ])
    .unwrap()
}

fn pipeline() -> Pipeline {
    Pipeline::new(
        PipelineConfig::default(),
        Arc::new(ManualMeter::new(Duration::from_millis(10))),
    )
}

fn four_trips() -> Table {
    trips_table(&[
        (0.5, 1, 6.0, "2015-01-15 08:00:00", "2015-01-15 08:10:00"),
        (2.0, 2, 12.0, "2015-01-15 12:00:00", "2015-01-15 12:10:00"),
        (2.0, 3, 14.0, "2015-01-17 12:00:00", "2015-01-17 12:10:00"),
        (11.0, 2, 55.0, "2015-01-17 18:00:00", "2015-01-17 18:40:00"),
    ])
}

#[test]
fn test_distance_bins_and_filters() {
    let loader = MemoryLoader::new(four_trips());
    let mut sink = MemorySink::new();
    let output = pipeline()
        .execute(&loader, Path::new("trips.csv"), &mut sink)
        .unwrap();

    assert_eq!(output.cleaned.row_count(), 4);
    let distance = sink.table("distance_analysis").unwrap();
    assert_eq!(
        distance.distance_bin(DISTANCE_BIN).unwrap(),
        &[Some(DistanceBin::Short), Some(DistanceBin::Medium), Some(DistanceBin::Extreme)]
    );
    assert_eq!(distance.int64("trip_distance_count").unwrap(), &[1, 2, 1]);

    assert_eq!(output.filters.long_trips, 1);
    assert_eq!(output.filters.expensive_trips, 1);
    assert_eq!(output.filters.rush_hour_trips, 2);
    assert_eq!(output.filters.weekend_trips, 2);
    assert_eq!(output.filters.premium_trips, 1);
    assert_eq!(output.metrics.get("long_trips_count"), Some(MetricValue::Count(1)));

    let daily = sink.table("daily_stats").unwrap();
    assert_eq!(daily.row_count(), 2);
    assert_eq!(daily.int64("trip_distance_count").unwrap(), &[2, 2]);

    let summary = sink.document("summary").unwrap();
    assert_eq!(summary["total_rows"], 4);
    assert_eq!(summary["total_distance"], 15.5);
    assert_eq!(summary["date_range"]["start"], "2015-01-15 08:00:00");
    assert_eq!(summary["date_range"]["end"], "2015-01-17 18:00:00");
}

#[test]
fn test_zero_duration_trip_removed() {
    let table = trips_table(&[
        (2.0, 1, 10.0, "2015-01-15 10:00:00", "2015-01-15 10:00:00"),
        (2.0, 1, 10.0, "2015-01-15 10:00:00", "2015-01-15 10:15:00"),
    ]);
    let output = pipeline().run(table).unwrap();

    assert_eq!(output.cleaned.row_count(), 1);
    assert_eq!(output.cleaning.rows_removed(), 1);
    assert_eq!(output.metrics.get("rows_after_cleaning"), Some(MetricValue::Count(1)));
    assert_eq!(output.summary.total_rows, 1);
}

#[test]
fn test_missing_amount_skipped_in_outputs() {
    let table = trips_table(&[
        (2.0, 1, 10.0, "2015-01-15 10:00:00", "2015-01-15 10:10:00"),
        (2.0, 1, f64::NAN, "2015-01-15 11:00:00", "2015-01-15 11:10:00"),
        (2.0, 1, 20.0, "2015-01-15 12:00:00", "2015-01-15 12:10:00"),
    ]);
    let output = pipeline().run(table).unwrap();

    let daily = &output.aggregations.daily;
    assert_eq!(daily.int64("trip_distance_count").unwrap(), &[3]);
    assert_eq!(daily.float64("total_amount_mean").unwrap(), &[15.0]);
    assert_eq!(daily.float64("total_amount_sum").unwrap(), &[30.0]);
    assert_eq!(output.summary.total_rows, 3);
    assert_eq!(output.summary.total_revenue, 30.0);
}

#[test]
fn test_runs_are_reproducible() {
    let pipeline = pipeline();
    let first = pipeline.run(four_trips()).unwrap();
    let second = pipeline.run(four_trips()).unwrap();

    assert_ne!(first.run_id, second.run_id);
    assert!(first.cleaned.same_bits(&second.cleaned));
    assert_eq!(first.filters, second.filters);
    assert_eq!(first.summary, second.summary);
    for ((name, a), (_, b)) in first
        .aggregations
        .named_tables()
        .into_iter()
        .zip(second.aggregations.named_tables())
    {
        assert!(a.same_bits(b), "{name} differs between runs");
    }
}

#[test]
fn test_cancelled_before_load() {
    let pipeline = pipeline();
    pipeline.cancel_token().cancel();
    let mut sink = MemorySink::new();

    let err = pipeline
        .execute(&MemoryLoader::new(four_trips()), Path::new("trips.csv"), &mut sink)
        .unwrap_err();

    assert_eq!(err.stage, Stage::Load);
    assert!(matches!(err.kind, PipelineErrorKind::Cancelled));
    assert!(err.metrics.is_empty());
    assert!(sink.artifact_names().is_empty());
}

#[test]
fn test_cancellation_is_permanent() {
    let pipeline = pipeline();
    pipeline.cancel_token().cancel();

    for _ in 0..2 {
        let err = pipeline.run(four_trips()).unwrap_err();
        assert_eq!(err.stage, Stage::Clean);
        assert!(err.is_cancelled());
    }
}

/// Cancels the run while loading
struct CancellingLoader {
    inner: MemoryLoader,
    token: CancelToken,
}

impl Loader for CancellingLoader {
    fn load(&self, path: &Path) -> CoreResult<Table> {
        self.token.cancel();
        self.inner.load(path)
    }
}

#[test]
fn test_cancelled_between_stages_keeps_partial_metrics() {
    let pipeline = pipeline();
    let loader = CancellingLoader {
        inner: MemoryLoader::new(four_trips()),
        token: pipeline.cancel_token(),
    };
    let mut sink = MemorySink::new();

    let err = pipeline
        .execute(&loader, Path::new("trips.csv"), &mut sink)
        .unwrap_err();

    assert_eq!(err.stage, Stage::Clean);
    assert!(err.is_cancelled());
    let keys: Vec<&str> = err.metrics.iter().map(|(k, _)| k).collect();
    assert_eq!(keys, vec!["load_time", "load_memory", "rows_loaded"]);
    assert_eq!(err.metrics.get("rows_loaded"), Some(MetricValue::Count(4)));
}

#[test]
fn test_malformed_timestamp_fails_clean_stage() {
    let table = trips_table(&[
        (2.0, 1, 10.0, "2015-01-15 10:00:00", "2015-01-15 10:15:00"),
        (2.0, 1, 10.0, "not a time", "2015-01-15 10:15:00"),
    ]);
    let mut sink = MemorySink::new();
    let err = pipeline()
        .execute(&MemoryLoader::new(table), Path::new("trips.csv"), &mut sink)
        .unwrap_err();

    assert_eq!(err.stage, Stage::Clean);
    match &err.kind {
        PipelineErrorKind::Failed(Error::MalformedTimestamp { column, row, value }) => {
            assert_eq!(column, PICKUP_DATETIME);
            assert_eq!(*row, 1);
            assert_eq!(value, "not a time");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(err.metrics.get("rows_loaded"), Some(MetricValue::Count(2)));
    assert!(err.to_string().starts_with("stage 'clean' failed"));
}

#[test]
fn test_metric_keys_in_stage_order() {
    let mut sink = MemorySink::new();
    let output = pipeline()
        .execute(&MemoryLoader::new(four_trips()), Path::new("trips.csv"), &mut sink)
        .unwrap();

    let keys: Vec<&str> = output.metrics.iter().map(|(k, _)| k).collect();
    assert_eq!(
        keys,
        vec![
            "load_time",
            "load_memory",
            "rows_loaded",
            "clean_time",
            "clean_memory",
            "rows_before_cleaning",
            "rows_after_cleaning",
            "aggregate_time",
            "aggregate_memory",
            "sort_filter_time",
            "sort_filter_memory",
            "sorted_rows",
            "long_trips_count",
            "expensive_trips_count",
            "rush_hour_trips_count",
            "weekend_trips_count",
            "premium_trips_count",
            "save_time",
            "total_time",
            "peak_memory",
        ]
    );
    // Every stage measurement consumes exactly two clock reads
    assert_eq!(output.metrics.get("clean_time"), Some(MetricValue::Seconds(0.01)));
    assert_eq!(output.metrics.get("peak_memory"), Some(MetricValue::Megabytes(0.0)));
}

#[test]
fn test_csv_to_directory() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("trips.csv");
    fs::write(
        &input,
        "tpep_pickup_datetime,tpep_dropoff_datetime,passenger_count,trip_distance,\
pickup_longitude,pickup_latitude,dropoff_longitude,dropoff_latitude,total_amount,vendor\n\
2015-01-15 08:00:00,2015-01-15 08:12:00,1,1.5,-73.98,40.75,-73.96,40.77,9.5,A\n\
2015-01-15 19:00:00,2015-01-15 19:30:00,2,12.0,-73.98,40.75,-73.80,40.64,58.0,B\n\
2015-01-16 03:00:00,2015-01-16 03:05:00,1,0,-73.98,40.75,-73.96,40.77,3.0,A\n",
    )
    .unwrap();
    let out = dir.path().join("results");

    let loader = CsvLoader::new(CsvLoaderOptions::default());
    let mut sink = DirectorySink::create(&out, SinkOptions::default()).unwrap();
    let output = pipeline().execute(&loader, &input, &mut sink).unwrap();

    assert_eq!(output.metrics.get("rows_loaded"), Some(MetricValue::Count(3)));
    assert_eq!(output.cleaned.row_count(), 2);
    for name in [
        "daily_stats.csv",
        "hourly_stats.csv",
        "dow_stats.csv",
        "distance_analysis.csv",
        "passenger_distribution.csv",
        "summary.json",
        "metrics.json",
    ] {
        assert!(out.join(name).is_file(), "{name} missing");
    }

    let metrics: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.join("metrics.json")).unwrap()).unwrap();
    assert_eq!(metrics["rows_after_cleaning"], 2);
    assert_eq!(metrics["long_trips_count"], 1);
}

#[test]
fn test_missing_input_fails_load_stage() {
    let dir = tempfile::tempdir().unwrap();
    let loader = CsvLoader::new(CsvLoaderOptions::default());
    let mut sink = MemorySink::new();

    let err = pipeline()
        .execute(&loader, &dir.path().join("absent.csv"), &mut sink)
        .unwrap_err();

    assert_eq!(err.stage, Stage::Load);
    assert!(matches!(err.kind, PipelineErrorKind::Failed(Error::NotFound(_))));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_group_counts_account_for_every_kept_row(
        trips in prop::collection::vec((0.0f64..120.0, 0i64..9, 1.0f64..80.0, 0u32..600), 1..40)
    ) {
        let pickups: Vec<String> = (0..trips.len())
            .map(|i| format!("2015-01-{:02} {:02}:00:00", 1 + i % 28, i % 24))
            .collect();
        let dropoffs: Vec<String> = trips
            .iter()
            .zip(&pickups)
            .map(|(t, pickup)| {
                let start = chrono::NaiveDateTime::parse_from_str(pickup, "%Y-%m-%d %H:%M:%S").unwrap();
                (start + chrono::Duration::minutes(i64::from(t.3)))
                    .format("%Y-%m-%d %H:%M:%S")
                    .to_string()
            })
            .collect();
        let n = trips.len();
        let table = Table::from_columns([
            (PICKUP_DATETIME, ColumnData::Utf8(pickups)),
            (DROPOFF_DATETIME, ColumnData::Utf8(dropoffs)),
            (PASSENGER_COUNT, ColumnData::Int64(trips.iter().map(|t| t.1).collect())),
            (TRIP_DISTANCE, ColumnData::Float64(trips.iter().map(|t| t.0).collect())),
            (PICKUP_LONGITUDE, ColumnData::Float64(vec![-73.98; n])),
            (PICKUP_LATITUDE, ColumnData::Float64(vec![40.75; n])),
            (DROPOFF_LONGITUDE, ColumnData::Float64(vec![-73.96; n])),
            (DROPOFF_LATITUDE, ColumnData::Float64(vec![40.77; n])),
            (TOTAL_AMOUNT, ColumnData::Float64(trips.iter().map(|t| t.2).collect())),
        ]).unwrap();

        let chunked = Pipeline::new(
            PipelineConfig { chunk_rows: 7, ..PipelineConfig::default() },
            Arc::new(ManualMeter::new(Duration::from_millis(10))),
        )
        .run(table.clone())
        .unwrap();
        let output = pipeline().run(table).unwrap();
        let kept = output.cleaned.row_count();
        prop_assert!(kept <= n);
        prop_assert_eq!(output.filters.sorted_rows, kept);
        prop_assert!(output.filters.long_trips <= kept);
        let passengers = output.aggregations.passenger_distribution.int64("count").unwrap();
        prop_assert_eq!(passengers.iter().sum::<i64>() as usize, kept);

        let aggregations = &output.aggregations;
        for view in [&aggregations.daily, &aggregations.hourly, &aggregations.day_of_week] {
            let counts = view.int64("trip_distance_count").unwrap();
            prop_assert_eq!(counts.iter().sum::<i64>() as usize, kept);
        }
        let binned = output
            .cleaned
            .distance_bin(DISTANCE_BIN)
            .unwrap()
            .iter()
            .filter(|bin| bin.is_some())
            .count();
        let distance_counts = aggregations.distance.int64("trip_distance_count").unwrap();
        prop_assert_eq!(distance_counts.iter().sum::<i64>() as usize, binned);

        for ((name, whole), (_, split)) in aggregations
            .named_tables()
            .into_iter()
            .zip(chunked.aggregations.named_tables())
        {
            prop_assert!(whole.same_bits(split), "{} differs when aggregated in chunks of 7", name);
        }
    }
}
