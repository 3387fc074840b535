//! Deterministic synthetic trip data for benchmarks and tests

use chrono::{Duration, NaiveDate, NaiveDateTime};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use taxi_etl_core::error::Result;
use taxi_etl_core::trip::{
    DROPOFF_DATETIME, DROPOFF_LATITUDE, DROPOFF_LONGITUDE, PASSENGER_COUNT, PICKUP_DATETIME,
    PICKUP_LATITUDE, PICKUP_LONGITUDE, TOTAL_AMOUNT, TRIP_DISTANCE,
};
use taxi_etl_core::{ColumnData, Table};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Shape of the generated data
#[derive(Debug, Clone)]
pub struct SyntheticConfig {
    /// Seed of the generator; equal seeds give equal tables
    pub seed: u64,

    /// First pickup day
    pub start: NaiveDate,

    /// Number of consecutive days pickups are spread over
    pub days: u32,

    /// Fraction of rows made invalid in one of the cleaned-out ways
    pub invalid_fraction: f64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            seed: 0x5EED,
            start: NaiveDate::from_ymd_opt(2015, 1, 1).unwrap_or(NaiveDate::MIN),
            days: 31,
            invalid_fraction: 0.05,
        }
    }
}

/// Generator of raw trip tables in the loader's output schema
#[derive(Debug, Clone)]
pub struct SyntheticTrips {
    config: SyntheticConfig,
}

impl SyntheticTrips {
    /// Create a generator
    pub fn new(config: SyntheticConfig) -> Self {
        Self { config }
    }

    /// Generate `rows` raw trips
    pub fn table(&self, rows: usize) -> Result<Table> {
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let origin = self.config.start.and_hms_opt(0, 0, 0).unwrap_or_default();
        let span_seconds = i64::from(self.config.days.max(1)) * 86_400;

        let mut pickups = Vec::with_capacity(rows);
        let mut dropoffs = Vec::with_capacity(rows);
        let mut passengers = Vec::with_capacity(rows);
        let mut distances = Vec::with_capacity(rows);
        let mut coordinates: [Vec<f64>; 4] = Default::default();
        let mut amounts = Vec::with_capacity(rows);

        for _ in 0..rows {
            let pickup = origin + Duration::seconds(rng.gen_range(0..span_seconds));
            // Mostly short hops with a long tail
            let scale: f64 = rng.gen_range(0.1..1.0);
            let reach: f64 = rng.gen_range(0.5..25.0);
            let mut distance = ((scale * reach * 10.0).round() / 10.0).max(0.1);
            let pace: f64 = rng.gen_range(2.0..6.0);
            let overhead: f64 = rng.gen_range(1.0..5.0);
            let minutes = (distance * pace + overhead).min(300.0);
            let mut dropoff = pickup + Duration::seconds((minutes * 60.0) as i64);
            let mut count: i64 = rng.gen_range(1..=6);
            let mut coords: [f64; 4] = [
                rng.gen_range(-74.02..-73.90),
                rng.gen_range(40.70..40.82),
                rng.gen_range(-74.02..-73.90),
                rng.gen_range(40.70..40.82),
            ];
            let fare: f64 = rng.gen_range(0.0..6.0);
            let amount = ((3.0 + 2.5 * distance + fare) * 100.0).round() / 100.0;

            if rng.gen_bool(self.config.invalid_fraction.clamp(0.0, 1.0)) {
                match rng.gen_range(0..4) {
                    0 => coords[rng.gen_range(0..4usize)] = 0.0,
                    1 => distance = 0.0,
                    2 => count = 0,
                    _ => dropoff = pickup - Duration::minutes(5),
                }
            }

            pickups.push(format_timestamp(pickup));
            dropoffs.push(format_timestamp(dropoff));
            passengers.push(count);
            distances.push(distance);
            for (column, value) in coordinates.iter_mut().zip(coords) {
                column.push(value);
            }
            amounts.push(amount);
        }

        let [pickup_lon, pickup_lat, dropoff_lon, dropoff_lat] = coordinates;
        Table::from_columns([
            (PICKUP_DATETIME, ColumnData::Utf8(pickups)),
            (DROPOFF_DATETIME, ColumnData::Utf8(dropoffs)),
            (PASSENGER_COUNT, ColumnData::Int64(passengers)),
            (TRIP_DISTANCE, ColumnData::Float64(distances)),
            (PICKUP_LONGITUDE, ColumnData::Float64(pickup_lon)),
            (PICKUP_LATITUDE, ColumnData::Float64(pickup_lat)),
            (DROPOFF_LONGITUDE, ColumnData::Float64(dropoff_lon)),
            (DROPOFF_LATITUDE, ColumnData::Float64(dropoff_lat)),
            (TOTAL_AMOUNT, ColumnData::Float64(amounts)),
        ])
    }
}

fn format_timestamp(ts: NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}
