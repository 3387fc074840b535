//! Grouped aggregation of cleaned trips
//!
//! Rows are split into fixed-size chunks, each chunk accumulates its own
//! per-group [`SummaryStats`], and the partial results are merged in chunk
//! order. Chunk boundaries depend only on `chunk_rows`, so the sequential
//! and `parallel` builds produce bit-identical output.

use std::collections::BTreeMap;
use std::ops::Range;

use chrono::NaiveDate;

use taxi_etl_core::trip::{
    DATE, DAY_OF_WEEK, DISTANCE_BIN, HOUR, PASSENGER_COUNT, TOTAL_AMOUNT, TRIP_DISTANCE,
    TRIP_DURATION_MINUTES,
};
use taxi_etl_core::{Column, ColumnData, DayOfWeek, DistanceBin, Result, Table};

use crate::stats::SummaryStats;

/// Rows per accumulation chunk unless configured otherwise
pub const DEFAULT_CHUNK_ROWS: usize = 64 * 1024;

/// A statistic reported for a source column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Statistic {
    /// Number of rows in the group
    Count,
    /// Arithmetic mean
    Mean,
    /// Sum
    Sum,
    /// Sample standard deviation
    Std,
}

impl Statistic {
    /// Suffix used in the output column name
    pub fn suffix(self) -> &'static str {
        match self {
            Statistic::Count => "count",
            Statistic::Mean => "mean",
            Statistic::Sum => "sum",
            Statistic::Std => "std",
        }
    }
}

/// Which statistics to compute for which columns, grouped by `key`
#[derive(Debug, Clone, Copy)]
pub struct GroupSpec {
    /// Group key column
    pub key: &'static str,
    /// Source columns and the statistics reported for each
    pub columns: &'static [(&'static str, &'static [Statistic])],
}

impl GroupSpec {
    /// Names of the statistic columns, `{source}_{stat}`, in output order
    pub fn output_names(&self) -> Vec<String> {
        self.columns
            .iter()
            .flat_map(|(source, stats)| {
                stats.iter().map(move |stat| format!("{source}_{}", stat.suffix()))
            })
            .collect()
    }
}

use Statistic::{Count, Mean, Std, Sum};

/// Per-date statistics
pub const DAILY: GroupSpec = GroupSpec {
    key: DATE,
    columns: &[
        (TRIP_DISTANCE, &[Count, Mean, Sum, Std]),
        (TRIP_DURATION_MINUTES, &[Mean, Sum]),
        (PASSENGER_COUNT, &[Sum, Mean]),
        (TOTAL_AMOUNT, &[Mean, Sum, Std]),
    ],
};

/// Per-hour statistics
pub const HOURLY: GroupSpec = GroupSpec {
    key: HOUR,
    columns: &[
        (TRIP_DISTANCE, &[Count, Mean]),
        (TRIP_DURATION_MINUTES, &[Mean]),
        (TOTAL_AMOUNT, &[Mean]),
        (PASSENGER_COUNT, &[Mean]),
    ],
};

/// Per-weekday statistics
pub const DAY_OF_WEEK_STATS: GroupSpec = GroupSpec {
    key: DAY_OF_WEEK,
    columns: &[(TRIP_DISTANCE, &[Count, Mean]), (TOTAL_AMOUNT, &[Mean])],
};

/// Per-distance-bin statistics
pub const DISTANCE_ANALYSIS: GroupSpec = GroupSpec {
    key: DISTANCE_BIN,
    columns: &[
        (TRIP_DISTANCE, &[Count]),
        (TOTAL_AMOUNT, &[Mean]),
        (TRIP_DURATION_MINUTES, &[Mean]),
    ],
};

/// Name of the count column in the passenger distribution
pub const PASSENGER_COUNT_ROWS: &str = "count";

/// Values that can key a group.
///
/// Implemented for the element type of a key column. Elements whose
/// [`key`](GroupKey::key) is `None` belong to no group.
pub trait GroupKey: Copy + Send + Sync {
    /// Ordered key type
    type Key: Ord + Copy + Send;

    /// The group this element belongs to
    fn key(self) -> Option<Self::Key>;

    /// Build the output key column from sorted keys
    fn column(keys: Vec<Self::Key>) -> ColumnData;
}

impl GroupKey for NaiveDate {
    type Key = NaiveDate;

    fn key(self) -> Option<Self::Key> {
        Some(self)
    }

    fn column(keys: Vec<Self::Key>) -> ColumnData {
        ColumnData::Date(keys)
    }
}

impl GroupKey for u8 {
    type Key = u8;

    fn key(self) -> Option<Self::Key> {
        Some(self)
    }

    fn column(keys: Vec<Self::Key>) -> ColumnData {
        ColumnData::UInt8(keys)
    }
}

impl GroupKey for i64 {
    type Key = i64;

    fn key(self) -> Option<Self::Key> {
        Some(self)
    }

    fn column(keys: Vec<Self::Key>) -> ColumnData {
        ColumnData::Int64(keys)
    }
}

impl GroupKey for DayOfWeek {
    type Key = DayOfWeek;

    fn key(self) -> Option<Self::Key> {
        Some(self)
    }

    fn column(keys: Vec<Self::Key>) -> ColumnData {
        ColumnData::DayOfWeek(keys)
    }
}

impl GroupKey for Option<DistanceBin> {
    type Key = DistanceBin;

    fn key(self) -> Option<Self::Key> {
        self
    }

    fn column(keys: Vec<Self::Key>) -> ColumnData {
        ColumnData::DistanceBin(keys.into_iter().map(Some).collect())
    }
}

/// Accumulated state of one group
#[derive(Debug, Clone, PartialEq)]
pub struct GroupState {
    /// Rows in the group
    pub rows: u64,
    /// One accumulator per value column
    pub stats: Vec<SummaryStats>,
}

impl GroupState {
    fn new(columns: usize) -> Self {
        Self {
            rows: 0,
            stats: vec![SummaryStats::new(); columns],
        }
    }

    fn merge(&mut self, other: &GroupState) {
        self.rows += other.rows;
        for (mine, theirs) in self.stats.iter_mut().zip(&other.stats) {
            mine.merge(theirs);
        }
    }
}

fn accumulate_range<E: GroupKey>(
    keys: &[E],
    values: &[Vec<f64>],
    rows: Range<usize>,
) -> BTreeMap<E::Key, GroupState> {
    let mut groups = BTreeMap::new();
    for row in rows {
        let Some(key) = keys[row].key() else { continue };
        let state = groups
            .entry(key)
            .or_insert_with(|| GroupState::new(values.len()));
        state.rows += 1;
        for (stats, column) in state.stats.iter_mut().zip(values) {
            stats.push(column[row]);
        }
    }
    groups
}

/// Partition rows by key and accumulate statistics over `values`.
///
/// Every slice in `values` must be as long as `keys`.
pub fn accumulate<E: GroupKey>(
    keys: &[E],
    values: &[Vec<f64>],
    chunk_rows: usize,
) -> BTreeMap<E::Key, GroupState> {
    let chunk_rows = chunk_rows.max(1);
    let rows = keys.len();
    let starts: Vec<usize> = (0..rows).step_by(chunk_rows).collect();
    let chunk = |start: usize| accumulate_range(keys, values, start..(start + chunk_rows).min(rows));

    #[cfg(feature = "parallel")]
    let partials: Vec<BTreeMap<E::Key, GroupState>> = {
        use rayon::prelude::*;
        starts.into_par_iter().map(chunk).collect()
    };
    #[cfg(not(feature = "parallel"))]
    let partials: Vec<BTreeMap<E::Key, GroupState>> = starts.into_iter().map(chunk).collect();

    let mut merged = BTreeMap::new();
    for partial in partials {
        for (key, state) in partial {
            merged
                .entry(key)
                .or_insert_with(|| GroupState::new(values.len()))
                .merge(&state);
        }
    }
    merged
}

/// Every aggregated view of a cleaned table
#[derive(Debug, Clone)]
pub struct AggregationResults {
    /// Statistics per pickup date
    pub daily: Table,
    /// Statistics per pickup hour
    pub hourly: Table,
    /// Statistics per weekday
    pub day_of_week: Table,
    /// Statistics per distance bin
    pub distance: Table,
    /// Trip count per passenger count
    pub passenger_distribution: Table,
}

impl AggregationResults {
    /// Views paired with their artifact names
    pub fn named_tables(&self) -> [(&'static str, &Table); 5] {
        [
            ("daily_stats", &self.daily),
            ("hourly_stats", &self.hourly),
            ("dow_stats", &self.day_of_week),
            ("distance_analysis", &self.distance),
            ("passenger_distribution", &self.passenger_distribution),
        ]
    }
}

/// Computes grouped statistics from a cleaned table
#[derive(Debug, Clone)]
pub struct Aggregator {
    chunk_rows: usize,
}

impl Default for Aggregator {
    fn default() -> Self {
        Self {
            chunk_rows: DEFAULT_CHUNK_ROWS,
        }
    }
}

impl Aggregator {
    /// Create an aggregator with the default chunk size
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of rows per accumulation chunk
    #[must_use]
    pub fn with_chunk_rows(mut self, chunk_rows: usize) -> Self {
        self.chunk_rows = chunk_rows.max(1);
        self
    }

    /// Compute all five views
    pub fn aggregate(&self, table: &Table) -> Result<AggregationResults> {
        let results = AggregationResults {
            daily: self.daily(table)?,
            hourly: self.hourly(table)?,
            day_of_week: self.day_of_week(table)?,
            distance: self.distance(table)?,
            passenger_distribution: self.passenger_distribution(table)?,
        };
        tracing::debug!(
            days = results.daily.row_count(),
            hours = results.hourly.row_count(),
            bins = results.distance.row_count(),
            "aggregation complete"
        );
        Ok(results)
    }

    /// Statistics grouped by pickup date
    pub fn daily(&self, table: &Table) -> Result<Table> {
        self.grouped(table, table.date(DAILY.key)?, &DAILY)
    }

    /// Statistics grouped by pickup hour
    pub fn hourly(&self, table: &Table) -> Result<Table> {
        self.grouped(table, table.uint8(HOURLY.key)?, &HOURLY)
    }

    /// Statistics grouped by pickup weekday
    pub fn day_of_week(&self, table: &Table) -> Result<Table> {
        self.grouped(table, table.day_of_week(DAY_OF_WEEK_STATS.key)?, &DAY_OF_WEEK_STATS)
    }

    /// Statistics per distance bin; rows without a bin are left out
    pub fn distance(&self, table: &Table) -> Result<Table> {
        self.grouped(table, table.distance_bin(DISTANCE_ANALYSIS.key)?, &DISTANCE_ANALYSIS)
    }

    /// Row count per passenger count, ascending
    pub fn passenger_distribution(&self, table: &Table) -> Result<Table> {
        let groups = accumulate(table.int64(PASSENGER_COUNT)?, &[], self.chunk_rows);
        let (keys, counts): (Vec<i64>, Vec<i64>) = groups
            .into_iter()
            .map(|(key, state)| (key, saturating_i64(state.rows)))
            .unzip();
        Table::new(vec![
            Column::new(PASSENGER_COUNT, ColumnData::Int64(keys)),
            Column::new(PASSENGER_COUNT_ROWS, ColumnData::Int64(counts)),
        ])
    }

    /// Group `table` by `keys` and report the statistics named in `spec`
    pub fn grouped<E: GroupKey>(&self, table: &Table, keys: &[E], spec: &GroupSpec) -> Result<Table> {
        let values = spec
            .columns
            .iter()
            .map(|(source, _)| table.column_by_name(source)?.to_float64())
            .collect::<Result<Vec<_>>>()?;

        let groups = accumulate(keys, &values, self.chunk_rows);

        let mut key_values = Vec::with_capacity(groups.len());
        let mut outputs: Vec<(String, Statistic, usize, Vec<f64>)> = Vec::new();
        for (index, (source, stats)) in spec.columns.iter().enumerate() {
            for &stat in *stats {
                let name = format!("{source}_{}", stat.suffix());
                outputs.push((name, stat, index, Vec::with_capacity(groups.len())));
            }
        }

        for (key, state) in &groups {
            key_values.push(*key);
            for (_, stat, index, column) in &mut outputs {
                let stats = &state.stats[*index];
                match stat {
                    Statistic::Count => {}
                    Statistic::Mean => column.push(stats.mean()),
                    Statistic::Sum => column.push(stats.sum()),
                    Statistic::Std => column.push(stats.std()),
                }
            }
        }

        let mut columns = vec![Column::new(spec.key, E::column(key_values))];
        for (name, stat, _, values) in outputs {
            let data = if stat == Statistic::Count {
                ColumnData::Int64(groups.values().map(|s| saturating_i64(s.rows)).collect())
            } else {
                ColumnData::Float64(values)
            };
            columns.push(Column::new(&name, data));
        }
        Table::new(columns)
    }
}

fn saturating_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
