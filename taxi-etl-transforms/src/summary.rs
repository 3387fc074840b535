//! Headline figures of a cleaned table

use serde::Serialize;

use taxi_etl_core::column::TIMESTAMP_FORMAT;
use taxi_etl_core::trip::{PICKUP_DATETIME, TOTAL_AMOUNT, TRIP_DISTANCE};
use taxi_etl_core::{Result, Table};

use crate::stats::SummaryStats;

/// First and last pickup time, absent for an empty table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateRange {
    /// Earliest pickup, if any row was kept
    pub start: Option<String>,
    /// Latest pickup, if any row was kept
    pub end: Option<String>,
}

/// Totals and averages written as `summary.json`.
///
/// Missing values are left out of the totals and averages. Averages of an
/// empty table are NaN and serialize as `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    /// Rows in the cleaned table
    pub total_rows: usize,
    /// Sum of trip distance in miles
    pub total_distance: f64,
    /// Mean trip distance in miles
    pub avg_trip_distance: f64,
    /// Sum of total amount
    pub total_revenue: f64,
    /// Mean total amount
    pub avg_fare: f64,
    /// Pickup time span
    pub date_range: DateRange,
}

impl Summary {
    /// Compute the summary of a cleaned table
    pub fn from_table(table: &Table) -> Result<Self> {
        let distance: SummaryStats = table.float64(TRIP_DISTANCE)?.iter().copied().collect();
        let amount: SummaryStats = table.float64(TOTAL_AMOUNT)?.iter().copied().collect();
        let pickups = table.timestamp(PICKUP_DATETIME)?;
        let format = |t: &chrono::NaiveDateTime| t.format(TIMESTAMP_FORMAT).to_string();

        Ok(Self {
            total_rows: table.row_count(),
            total_distance: distance.sum(),
            avg_trip_distance: distance.mean(),
            total_revenue: amount.sum(),
            avg_fare: amount.mean(),
            date_range: DateRange {
                start: pickups.iter().min().map(format),
                end: pickups.iter().max().map(format),
            },
        })
    }
}
