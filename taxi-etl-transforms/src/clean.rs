//! Row validation and derived columns
//!
//! The [`Cleaner`] is a fixed [`TransformChain`] of pure stages:
//!
//! 1. drop rows with a zero coordinate
//! 2. keep `min_distance < trip_distance < max_distance`
//! 3. keep `min_passengers < passenger_count <= max_passengers`
//! 4. parse pickup and dropoff timestamps
//! 5. derive `trip_duration_minutes`
//! 6. keep `min_duration < trip_duration_minutes < max_duration`
//! 7. derive `date`, `hour`, `day_of_week` and `distance_bin`

use chrono::{Datelike, Timelike};
use serde::{Deserialize, Serialize};

use taxi_etl_core::trip::{
    COORDINATES, DATE, DAY_OF_WEEK, DISTANCE_BIN, DROPOFF_DATETIME, HOUR, PASSENGER_COUNT,
    PICKUP_DATETIME, TRIP_DISTANCE, TRIP_DURATION_MINUTES,
};
use taxi_etl_core::{
    Column, ColumnData, DataType, DayOfWeek, DistanceBin, Error, Result, Table, TableTransform,
    TransformChain,
};

use crate::predicate::Predicate;
use crate::timestamp::parse_timestamps;

/// Thresholds used by the validity checks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidityRules {
    /// Value a coordinate must not equal
    pub invalid_coordinate: f64,
    /// Exclusive lower bound on trip distance
    pub min_distance: f64,
    /// Exclusive upper bound on trip distance
    pub max_distance: f64,
    /// Exclusive lower bound on passenger count
    pub min_passengers: i64,
    /// Inclusive upper bound on passenger count
    pub max_passengers: i64,
    /// Exclusive lower bound on duration in minutes
    pub min_duration_minutes: f64,
    /// Exclusive upper bound on duration in minutes
    pub max_duration_minutes: f64,
}

impl Default for ValidityRules {
    fn default() -> Self {
        Self {
            invalid_coordinate: 0.0,
            min_distance: 0.0,
            max_distance: 100.0,
            min_passengers: 0,
            max_passengers: 6,
            min_duration_minutes: 0.0,
            max_duration_minutes: 480.0,
        }
    }
}

impl ValidityRules {
    /// Every coordinate differs from the invalid value
    pub fn geo_predicate(&self) -> Predicate {
        Predicate::and(
            COORDINATES
                .iter()
                .map(|column| Predicate::ne(*column, self.invalid_coordinate))
                .collect(),
        )
    }

    /// Keeps trips inside the distance bounds
    pub fn distance_predicate(&self) -> Predicate {
        Predicate::and(vec![
            Predicate::gt(TRIP_DISTANCE, self.min_distance),
            Predicate::lt(TRIP_DISTANCE, self.max_distance),
        ])
    }

    /// Keeps trips inside the passenger bounds
    pub fn passenger_predicate(&self) -> Predicate {
        Predicate::and(vec![
            Predicate::gt(PASSENGER_COUNT, self.min_passengers),
            Predicate::le(PASSENGER_COUNT, self.max_passengers),
        ])
    }

    /// Keeps trips inside the duration bounds
    pub fn duration_predicate(&self) -> Predicate {
        Predicate::and(vec![
            Predicate::gt(TRIP_DURATION_MINUTES, self.min_duration_minutes),
            Predicate::lt(TRIP_DURATION_MINUTES, self.max_duration_minutes),
        ])
    }

    /// Check one row against every rule
    pub fn accepts(&self, coordinates: [f64; 4], distance: f64, passengers: i64, duration: f64) -> bool {
        coordinates.iter().all(|&c| c != self.invalid_coordinate)
            && distance > self.min_distance
            && distance < self.max_distance
            && passengers > self.min_passengers
            && passengers <= self.max_passengers
            && duration > self.min_duration_minutes
            && duration < self.max_duration_minutes
    }
}

/// Keeps the rows matching a predicate
#[derive(Debug, Clone)]
pub struct PredicateFilter {
    name: String,
    predicate: Predicate,
}

impl PredicateFilter {
    /// Create a named filter
    pub fn new(name: impl Into<String>, predicate: Predicate) -> Self {
        Self {
            name: name.into(),
            predicate,
        }
    }

    /// The predicate rows must satisfy
    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }
}

impl TableTransform for PredicateFilter {
    fn name(&self) -> &str {
        &self.name
    }

    fn transform(&self, input: Table) -> Result<Table> {
        self.predicate.filter(&input)
    }
}

/// Replaces text timestamp columns with parsed timestamps.
///
/// Columns that are already timestamps pass through.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParseTimestamps;

impl TableTransform for ParseTimestamps {
    fn name(&self) -> &str {
        "parse_timestamps"
    }

    fn transform(&self, input: Table) -> Result<Table> {
        let mut table = input;
        for name in [PICKUP_DATETIME, DROPOFF_DATETIME] {
            let column = table.column_by_name(name)?;
            let parsed = match column.data() {
                ColumnData::Timestamp(_) => continue,
                ColumnData::Utf8(values) => parse_timestamps(name, values)?,
                other => {
                    return Err(Error::type_mismatch(name, DataType::Utf8, other.data_type()));
                }
            };
            table = table.with_column(Column::new(name, ColumnData::Timestamp(parsed)))?;
        }
        Ok(table)
    }
}

/// Adds `trip_duration_minutes` from the parsed timestamps
#[derive(Debug, Clone, Copy, Default)]
pub struct DeriveDuration;

impl TableTransform for DeriveDuration {
    fn name(&self) -> &str {
        "derive_duration"
    }

    fn transform(&self, input: Table) -> Result<Table> {
        let pickups = input.timestamp(PICKUP_DATETIME)?;
        let dropoffs = input.timestamp(DROPOFF_DATETIME)?;
        let minutes = pickups
            .iter()
            .zip(dropoffs)
            .map(|(pickup, dropoff)| (*dropoff - *pickup).num_milliseconds() as f64 / 60_000.0)
            .collect();
        input.with_column(Column::new(TRIP_DURATION_MINUTES, ColumnData::Float64(minutes)))
    }
}

/// Adds the calendar columns from pickup time and the distance bin
#[derive(Debug, Clone, Copy, Default)]
pub struct DeriveCalendar;

impl TableTransform for DeriveCalendar {
    fn name(&self) -> &str {
        "derive_calendar"
    }

    fn transform(&self, input: Table) -> Result<Table> {
        let pickups = input.timestamp(PICKUP_DATETIME)?;
        let dates = pickups.iter().map(|t| t.date()).collect();
        // hour() is always below 24
        let hours = pickups.iter().map(|t| t.hour() as u8).collect();
        let days = pickups.iter().map(|t| DayOfWeek::from(t.weekday())).collect();
        let bins = input
            .float64(TRIP_DISTANCE)?
            .iter()
            .map(|&d| DistanceBin::classify(d))
            .collect();

        input
            .with_column(Column::new(DATE, ColumnData::Date(dates)))?
            .with_column(Column::new(HOUR, ColumnData::UInt8(hours)))?
            .with_column(Column::new(DAY_OF_WEEK, ColumnData::DayOfWeek(days)))?
            .with_column(Column::new(DISTANCE_BIN, ColumnData::DistanceBin(bins)))
    }
}

/// Rows entering and leaving one cleaning step
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
    /// Step name
    pub step: String,
    /// Rows before the step
    pub rows_in: usize,
    /// Rows after the step
    pub rows_out: usize,
}

impl StepReport {
    /// Rows this step discarded
    pub fn removed(&self) -> usize {
        self.rows_in.saturating_sub(self.rows_out)
    }
}

/// What a cleaning run did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleaningReport {
    /// Rows handed to the cleaner
    pub rows_in: usize,
    /// Rows that passed every check
    pub rows_out: usize,
    /// Per-step row counts, in execution order
    pub steps: Vec<StepReport>,
}

impl CleaningReport {
    /// Total rows discarded
    pub fn rows_removed(&self) -> usize {
        self.rows_in.saturating_sub(self.rows_out)
    }

    /// Rows discarded by the named step, 0 if there is no such step
    pub fn removed_by(&self, step: &str) -> usize {
        self.steps
            .iter()
            .find(|s| s.step == step)
            .map_or(0, StepReport::removed)
    }
}

/// Validates raw trips and derives the analysis columns
#[derive(Debug)]
pub struct Cleaner {
    chain: TransformChain,
}

impl Cleaner {
    /// Step name of the coordinate check
    pub const GEO: &'static str = "geo";
    /// Step name of the distance check
    pub const DISTANCE: &'static str = "distance";
    /// Step name of the passenger check
    pub const PASSENGERS: &'static str = "passengers";
    /// Step name of the duration check
    pub const DURATION: &'static str = "duration";

    /// Build the cleaning chain for `rules`
    pub fn new(rules: ValidityRules) -> Self {
        let chain = TransformChain::new()
            .then(PredicateFilter::new(Self::GEO, rules.geo_predicate()))
            .then(PredicateFilter::new(Self::DISTANCE, rules.distance_predicate()))
            .then(PredicateFilter::new(Self::PASSENGERS, rules.passenger_predicate()))
            .then(ParseTimestamps)
            .then(DeriveDuration)
            .then(PredicateFilter::new(Self::DURATION, rules.duration_predicate()))
            .then(DeriveCalendar);
        Self { chain }
    }

    /// Clean `table`, returning the valid rows and a report
    pub fn clean(&self, table: Table) -> Result<(Table, CleaningReport)> {
        let rows_in = table.row_count();
        let (cleaned, outcomes) = self.chain.apply_observed(table)?;

        let steps: Vec<StepReport> = outcomes
            .into_iter()
            .map(|o| StepReport {
                step: o.name,
                rows_in: o.rows_in,
                rows_out: o.rows_out,
            })
            .collect();
        for step in steps.iter().filter(|s| s.removed() > 0) {
            tracing::debug!(step = %step.step, removed = step.removed(), "rows removed");
        }

        let report = CleaningReport {
            rows_in,
            rows_out: cleaned.row_count(),
            steps,
        };
        tracing::info!(
            rows_in = report.rows_in,
            rows_out = report.rows_out,
            removed = report.rows_removed(),
            "cleaning complete"
        );
        Ok((cleaned, report))
    }
}

impl Default for Cleaner {
    fn default() -> Self {
        Self::new(ValidityRules::default())
    }
}

impl TableTransform for Cleaner {
    fn name(&self) -> &str {
        "clean"
    }

    fn transform(&self, input: Table) -> Result<Table> {
        self.clean(input).map(|(table, _)| table)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use proptest::prelude::*;
    use taxi_etl_core::trip::{
        DROPOFF_LATITUDE, DROPOFF_LONGITUDE, PICKUP_LATITUDE, PICKUP_LONGITUDE, TOTAL_AMOUNT,
    };

    /// One raw trip: distance, passengers, amount, pickup, dropoff
    pub(crate) type RawTrip = (f64, i64, f64, &'static str, &'static str);

    pub(crate) fn raw_table(trips: &[RawTrip]) -> Table {
        raw_table_with_coordinates(trips, |_| [-73.98, 40.75, -73.96, 40.77])
    }

    fn raw_table_with_coordinates(trips: &[RawTrip], coords: impl Fn(usize) -> [f64; 4]) -> Table {
        let coordinate = |k: usize| (0..trips.len()).map(|i| coords(i)[k]).collect::<Vec<_>>();
        Table::from_columns([
            (
                PICKUP_DATETIME,
                ColumnData::Utf8(trips.iter().map(|t| t.3.to_string()).collect()),
            ),
            (
                DROPOFF_DATETIME,
                ColumnData::Utf8(trips.iter().map(|t| t.4.to_string()).collect()),
            ),
            (PASSENGER_COUNT, ColumnData::Int64(trips.iter().map(|t| t.1).collect())),
            (TRIP_DISTANCE, ColumnData::Float64(trips.iter().map(|t| t.0).collect())),
            (PICKUP_LONGITUDE, ColumnData::Float64(coordinate(0))),
            (PICKUP_LATITUDE, ColumnData::Float64(coordinate(1))),
            (DROPOFF_LONGITUDE, ColumnData::Float64(coordinate(2))),
            (DROPOFF_LATITUDE, ColumnData::Float64(coordinate(3))),
            (TOTAL_AMOUNT, ColumnData::Float64(trips.iter().map(|t| t.2).collect())),
        ])
        .unwrap()
    }

    #[test]
    fn test_clean_removes_each_invalid_kind() {
        let table = raw_table(&[
            (2.0, 1, 10.0, "2015-01-15 10:00:00", "2015-01-15 10:12:00"),
            (0.0, 1, 10.0, "2015-01-15 10:00:00", "2015-01-15 10:12:00"),
            (100.0, 1, 10.0, "2015-01-15 10:00:00", "2015-01-15 10:12:00"),
            (2.0, 0, 10.0, "2015-01-15 10:00:00", "2015-01-15 10:12:00"),
            (2.0, 7, 10.0, "2015-01-15 10:00:00", "2015-01-15 10:12:00"),
            (2.0, 6, 10.0, "2015-01-15 10:00:00", "2015-01-15 10:00:00"),
            (2.0, 2, 10.0, "2015-01-15 10:00:00", "2015-01-15 18:00:00"),
            (2.0, 2, 10.0, "2015-01-15 10:00:00", "2015-01-15 09:59:00"),
        ]);

        let (cleaned, report) = Cleaner::default().clean(table).unwrap();
        assert_eq!(cleaned.row_count(), 1);
        assert_eq!(report.rows_in, 8);
        assert_eq!(report.rows_out, 1);
        assert_eq!(report.removed_by(Cleaner::GEO), 0);
        assert_eq!(report.removed_by(Cleaner::DISTANCE), 2);
        assert_eq!(report.removed_by(Cleaner::PASSENGERS), 2);
        assert_eq!(report.removed_by(Cleaner::DURATION), 3);
        assert_eq!(cleaned.float64(TRIP_DURATION_MINUTES).unwrap(), &[12.0]);
    }

    #[test]
    fn test_zero_coordinate_removed() {
        let trips = [
            (2.0, 1, 10.0, "2015-01-15 10:00:00", "2015-01-15 10:12:00"),
            (2.0, 1, 10.0, "2015-01-15 10:00:00", "2015-01-15 10:12:00"),
        ];
        let table = raw_table_with_coordinates(&trips, |i| {
            if i == 0 {
                [-73.98, 40.75, 0.0, 40.77]
            } else {
                [-73.98, 40.75, -73.96, 40.77]
            }
        });
        let (cleaned, report) = Cleaner::default().clean(table).unwrap();
        assert_eq!(cleaned.row_count(), 1);
        assert_eq!(report.removed_by(Cleaner::GEO), 1);
    }

    #[test]
    fn test_derived_columns() {
        // 2015-01-17 is a Saturday
        let table = raw_table(&[
            (0.5, 1, 5.0, "2015-01-17 07:30:00", "2015-01-17 07:40:30"),
            (12.0, 2, 60.0, "2015-01-19T18:00:00", "2015-01-19T18:45:00"),
        ]);
        let (cleaned, _) = Cleaner::default().clean(table).unwrap();

        assert_eq!(cleaned.uint8(HOUR).unwrap(), &[7, 18]);
        assert_eq!(
            cleaned.day_of_week(DAY_OF_WEEK).unwrap(),
            &[DayOfWeek::Saturday, DayOfWeek::Monday]
        );
        assert_eq!(
            cleaned.distance_bin(DISTANCE_BIN).unwrap(),
            &[Some(DistanceBin::Short), Some(DistanceBin::Extreme)]
        );
        assert_eq!(cleaned.float64(TRIP_DURATION_MINUTES).unwrap(), &[10.5, 45.0]);
        assert_eq!(cleaned.date(DATE).unwrap()[1].to_string(), "2015-01-19");
    }

    #[test]
    fn test_malformed_timestamp_propagates() {
        let table = raw_table(&[
            (2.0, 1, 10.0, "2015-01-15 10:00:00", "2015-01-15 10:12:00"),
            (2.0, 1, 10.0, "", "2015-01-15 10:12:00"),
        ]);
        let err = Cleaner::default().clean(table).unwrap_err();
        assert!(matches!(err, Error::MalformedTimestamp { row: 1, .. }));
    }

    #[test]
    fn test_malformed_timestamp_on_rejected_row_is_ignored() {
        let table = raw_table(&[
            (2.0, 1, 10.0, "2015-01-15 10:00:00", "2015-01-15 10:12:00"),
            (0.0, 1, 10.0, "garbage", "garbage"),
        ]);
        let (cleaned, _) = Cleaner::default().clean(table).unwrap();
        assert_eq!(cleaned.row_count(), 1);
    }

    #[test]
    fn test_missing_column() {
        let table = Table::from_columns([(TRIP_DISTANCE, ColumnData::Float64(vec![1.0]))]).unwrap();
        assert!(matches!(
            Cleaner::default().clean(table),
            Err(Error::ColumnNotFound(_))
        ));
    }

    const PICKUPS: [&str; 3] = [
        "2015-01-15 10:00:00",
        "2015-01-15 23:59:59",
        "2015-01-16 00:00:00",
    ];
    const DROPOFFS: [&str; 4] = [
        "2015-01-15 10:00:00",
        "2015-01-15 10:30:00",
        "2015-01-15 18:30:00",
        "2015-01-16 00:10:00",
    ];

    prop_compose! {
        fn raw_trip()(
            distance in prop_oneof![Just(0.0), Just(1.0), Just(100.0), -5.0..120.0f64],
            passengers in -1i64..9,
            amount in 0.0..200.0f64,
            pickup in 0..PICKUPS.len(),
            dropoff in 0..DROPOFFS.len(),
        ) -> RawTrip {
            (distance, passengers, amount, PICKUPS[pickup], DROPOFFS[dropoff])
        }
    }

    proptest! {
        #[test]
        fn prop_cleaned_rows_satisfy_every_rule(trips in prop::collection::vec(raw_trip(), 0..40)) {
            let rules = ValidityRules::default();
            let table = raw_table(&trips);
            let rows_in = table.row_count();
            let (cleaned, report) = Cleaner::new(rules.clone()).clean(table).unwrap();

            prop_assert!(cleaned.row_count() <= rows_in);
            prop_assert_eq!(report.rows_out, cleaned.row_count());

            let distances = cleaned.float64(TRIP_DISTANCE).unwrap();
            let passengers = cleaned.int64(PASSENGER_COUNT).unwrap();
            let durations = cleaned.float64(TRIP_DURATION_MINUTES).unwrap();
            for i in 0..cleaned.row_count() {
                prop_assert!(rules.accepts([-73.98, 40.75, -73.96, 40.77], distances[i], passengers[i], durations[i]));
            }

            let expected = trips
                .iter()
                .filter(|t| {
                    let pickup = crate::timestamp::parse_timestamp(t.3).unwrap();
                    let dropoff = crate::timestamp::parse_timestamp(t.4).unwrap();
                    let minutes = (dropoff - pickup).num_milliseconds() as f64 / 60_000.0;
                    rules.accepts([-73.98, 40.75, -73.96, 40.77], t.0, t.1, minutes)
                })
                .count();
            prop_assert_eq!(cleaned.row_count(), expected);
        }
    }
}
