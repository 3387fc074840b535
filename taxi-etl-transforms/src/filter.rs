//! Trip filters and the full sort
//!
//! The engine holds no state: every call reads the table it is given and
//! returns counts or a new table.

use std::cmp::Ordering;

use serde::Serialize;

use taxi_etl_core::trip::{DAY_OF_WEEK, HOUR, PASSENGER_COUNT, TOTAL_AMOUNT, TRIP_DISTANCE};
use taxi_etl_core::{DayOfWeek, Result, Table};

use crate::predicate::Predicate;

/// Pickup hours counted as rush hour
pub const RUSH_HOURS: [u8; 6] = [7, 8, 9, 17, 18, 19];

/// The named trip subsets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TripFilter {
    /// trip_distance > 10
    LongTrips,
    /// total_amount > 50
    ExpensiveTrips,
    /// hour in [`RUSH_HOURS`]
    RushHour,
    /// Saturday or Sunday pickup
    Weekend,
    /// trip_distance > 5, total_amount > 30 and passenger_count >= 2
    Premium,
}

impl TripFilter {
    /// Every filter, in reporting order
    pub const ALL: [TripFilter; 5] = [
        TripFilter::LongTrips,
        TripFilter::ExpensiveTrips,
        TripFilter::RushHour,
        TripFilter::Weekend,
        TripFilter::Premium,
    ];

    /// Short name of the subset
    pub fn name(self) -> &'static str {
        match self {
            TripFilter::LongTrips => "long_trips",
            TripFilter::ExpensiveTrips => "expensive_trips",
            TripFilter::RushHour => "rush_hour_trips",
            TripFilter::Weekend => "weekend_trips",
            TripFilter::Premium => "premium_trips",
        }
    }

    /// Key under which the matching row count is recorded
    pub fn metric_key(self) -> &'static str {
        match self {
            TripFilter::LongTrips => "long_trips_count",
            TripFilter::ExpensiveTrips => "expensive_trips_count",
            TripFilter::RushHour => "rush_hour_trips_count",
            TripFilter::Weekend => "weekend_trips_count",
            TripFilter::Premium => "premium_trips_count",
        }
    }

    /// Predicate selecting the subset
    pub fn predicate(self) -> Predicate {
        match self {
            TripFilter::LongTrips => Predicate::gt(TRIP_DISTANCE, 10.0),
            TripFilter::ExpensiveTrips => Predicate::gt(TOTAL_AMOUNT, 50.0),
            TripFilter::RushHour => Predicate::is_in(HOUR, RUSH_HOURS),
            TripFilter::Weekend => {
                Predicate::is_in(DAY_OF_WEEK, [DayOfWeek::Saturday, DayOfWeek::Sunday])
            }
            TripFilter::Premium => Predicate::and(vec![
                Predicate::gt(TRIP_DISTANCE, 5.0),
                Predicate::gt(TOTAL_AMOUNT, 30.0),
                Predicate::ge(PASSENGER_COUNT, 2i64),
            ]),
        }
    }
}

/// Row counts produced by [`FilterEngine::run`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FilterCounts {
    /// Rows matching [`TripFilter::LongTrips`]
    pub long_trips: usize,
    /// Rows matching [`TripFilter::ExpensiveTrips`]
    pub expensive_trips: usize,
    /// Rows matching [`TripFilter::RushHour`]
    pub rush_hour_trips: usize,
    /// Rows matching [`TripFilter::Weekend`]
    pub weekend_trips: usize,
    /// Rows matching [`TripFilter::Premium`]
    pub premium_trips: usize,
    /// Rows in the sorted view
    pub sorted_rows: usize,
}

impl FilterCounts {
    /// Count for one filter
    pub fn get(&self, filter: TripFilter) -> usize {
        match filter {
            TripFilter::LongTrips => self.long_trips,
            TripFilter::ExpensiveTrips => self.expensive_trips,
            TripFilter::RushHour => self.rush_hour_trips,
            TripFilter::Weekend => self.weekend_trips,
            TripFilter::Premium => self.premium_trips,
        }
    }

    fn set(&mut self, filter: TripFilter, count: usize) {
        let slot = match filter {
            TripFilter::LongTrips => &mut self.long_trips,
            TripFilter::ExpensiveTrips => &mut self.expensive_trips,
            TripFilter::RushHour => &mut self.rush_hour_trips,
            TripFilter::Weekend => &mut self.weekend_trips,
            TripFilter::Premium => &mut self.premium_trips,
        };
        *slot = count;
    }
}

/// Applies trip filters and sorts
#[derive(Debug, Clone, Copy, Default)]
pub struct FilterEngine;

impl FilterEngine {
    /// Create an engine
    pub fn new() -> Self {
        Self
    }

    /// Rows matching `filter`
    pub fn apply(&self, table: &Table, filter: TripFilter) -> Result<Table> {
        filter.predicate().filter(table)
    }

    /// Number of rows matching `filter`
    pub fn count(&self, table: &Table, filter: TripFilter) -> Result<usize> {
        filter.predicate().count(table)
    }

    /// Stable sort by a numeric column, largest first. NaN sorts last.
    pub fn sort_descending(&self, table: &Table, column: &str) -> Result<Table> {
        let keys = table.column_by_name(column)?.to_float64()?;
        let mut order: Vec<usize> = (0..keys.len()).collect();
        let compare = |&a: &usize, &b: &usize| descending(keys[a], keys[b]);

        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            order.par_sort_by(compare);
        }
        #[cfg(not(feature = "parallel"))]
        order.sort_by(compare);

        table.take(&order)
    }

    /// The full sort by `trip_distance`, descending
    pub fn sort_by_distance_desc(&self, table: &Table) -> Result<Table> {
        self.sort_descending(table, TRIP_DISTANCE)
    }

    /// Sort the table and count every filter
    pub fn run(&self, table: &Table) -> Result<FilterCounts> {
        let sorted = self.sort_by_distance_desc(table)?;
        let mut counts = FilterCounts {
            sorted_rows: sorted.row_count(),
            ..FilterCounts::default()
        };
        for filter in TripFilter::ALL {
            let count = self.count(table, filter)?;
            tracing::debug!(filter = filter.name(), count, "filter applied");
            counts.set(filter, count);
        }
        Ok(counts)
    }
}

fn descending(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}
