//! Table implementation for columnar trip data
//!
//! A [`Table`] is never mutated in place: every operation that filters rows
//! or adds columns returns a new table, so pipeline stages can treat tables
//! as values.

use std::fmt;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};

use crate::categorical::{DayOfWeek, DistanceBin};
use crate::column::{Column, ColumnData};
use crate::error::{Error, Result};
use crate::schema::Schema;

/// A collection of equally long columns
#[derive(Debug, Clone)]
pub struct Table {
    /// Schema describing the data
    schema: Arc<Schema>,

    /// Columns in this table
    columns: Vec<Column>,

    /// Number of rows in this table
    row_count: usize,
}

impl Table {
    /// Create a new table from columns.
    ///
    /// Fails with [`Error::Schema`] if the columns differ in length or two
    /// columns share a name.
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        let row_count = columns.first().map_or(0, Column::len);

        for column in &columns {
            if column.len() != row_count {
                return Err(Error::Schema(format!(
                    "column '{}' has {} rows, expected {}",
                    column.name(),
                    column.len(),
                    row_count
                )));
            }
        }

        let schema = Schema::new(columns.iter().map(Column::field).collect())?;

        Ok(Self {
            schema: Arc::new(schema),
            columns,
            row_count,
        })
    }

    /// Create a table from `(name, values)` pairs
    pub fn from_columns<I, S>(columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, ColumnData)>,
        S: AsRef<str>,
    {
        Self::new(
            columns
                .into_iter()
                .map(|(name, data)| Column::new(name.as_ref(), data))
                .collect(),
        )
    }

    /// Create a table with no columns and no rows
    pub fn empty() -> Self {
        Self {
            schema: Arc::new(Schema::empty()),
            columns: Vec::new(),
            row_count: 0,
        }
    }

    /// Get the schema of this table
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Get the number of rows in this table
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Get the number of columns in this table
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Check if this table has no rows
    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    /// Get a reference to a column by index
    pub fn column(&self, index: usize) -> Result<&Column> {
        self.columns.get(index).ok_or_else(|| {
            Error::InvalidArgument(format!(
                "column index {index} out of bounds for {} columns",
                self.columns.len()
            ))
        })
    }

    /// Get a reference to a column by name
    pub fn column_by_name(&self, name: &str) -> Result<&Column> {
        let index = self.schema.index_of(name)?;
        self.column(index)
    }

    /// Check whether a column with this name exists
    pub fn contains(&self, name: &str) -> bool {
        self.schema.contains(name)
    }

    /// Get all columns
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Column values as `f64`
    pub fn float64(&self, name: &str) -> Result<&[f64]> {
        self.column_by_name(name)?.as_float64()
    }

    /// Column values as `i64`
    pub fn int64(&self, name: &str) -> Result<&[i64]> {
        self.column_by_name(name)?.as_int64()
    }

    /// Column values as strings
    pub fn utf8(&self, name: &str) -> Result<&[String]> {
        self.column_by_name(name)?.as_utf8()
    }

    /// Column values as timestamps
    pub fn timestamp(&self, name: &str) -> Result<&[NaiveDateTime]> {
        self.column_by_name(name)?.as_timestamp()
    }

    /// Column values as dates
    pub fn date(&self, name: &str) -> Result<&[NaiveDate]> {
        self.column_by_name(name)?.as_date()
    }

    /// Column values as `u8`
    pub fn uint8(&self, name: &str) -> Result<&[u8]> {
        self.column_by_name(name)?.as_uint8()
    }

    /// Column values as days of week
    pub fn day_of_week(&self, name: &str) -> Result<&[DayOfWeek]> {
        self.column_by_name(name)?.as_day_of_week()
    }

    /// Column values as distance bins
    pub fn distance_bin(&self, name: &str) -> Result<&[Option<DistanceBin>]> {
        self.column_by_name(name)?.as_distance_bin()
    }

    /// Keep only the rows whose mask entry is true, preserving row order
    pub fn select(&self, mask: &[bool]) -> Result<Self> {
        if mask.len() != self.row_count {
            return Err(Error::Schema(format!(
                "row mask has {} entries, table has {} rows",
                mask.len(),
                self.row_count
            )));
        }

        let row_count = mask.iter().filter(|&&keep| keep).count();
        let columns = self
            .columns
            .iter()
            .map(|column| Column::new(column.name(), column.data().select(mask)))
            .collect();

        Ok(Self {
            schema: Arc::clone(&self.schema),
            columns,
            row_count,
        })
    }

    /// Gather rows by position, in the order given
    pub fn take(&self, indices: &[usize]) -> Result<Self> {
        if let Some(&bad) = indices.iter().find(|&&i| i >= self.row_count) {
            return Err(Error::InvalidArgument(format!(
                "row index {bad} out of bounds for {} rows",
                self.row_count
            )));
        }

        let columns = self
            .columns
            .iter()
            .map(|column| Column::new(column.name(), column.data().take(indices)))
            .collect();

        Ok(Self {
            schema: Arc::clone(&self.schema),
            columns,
            row_count: indices.len(),
        })
    }

    /// The first `n` rows (all rows if the table is shorter)
    pub fn head(&self, n: usize) -> Self {
        let length = n.min(self.row_count);
        let columns = self
            .columns
            .iter()
            .map(|column| Column::new(column.name(), column.data().slice(0, length)))
            .collect();

        Self {
            schema: Arc::clone(&self.schema),
            columns,
            row_count: length,
        }
    }

    /// Consume this table and return one with `column` appended, or
    /// replacing an existing column of the same name
    pub fn with_column(self, column: Column) -> Result<Self> {
        if !self.columns.is_empty() && column.len() != self.row_count {
            return Err(Error::Schema(format!(
                "column '{}' has {} rows, expected {}",
                column.name(),
                column.len(),
                self.row_count
            )));
        }

        let mut columns = self.columns;
        match columns.iter().position(|c| c.name() == column.name()) {
            Some(index) => columns[index] = column,
            None => columns.push(column),
        }

        Self::new(columns)
    }

    /// Create a projection of this table with only the named columns
    pub fn project_by_names(&self, names: &[&str]) -> Result<Self> {
        let columns = names
            .iter()
            .map(|&name| self.column_by_name(name).cloned())
            .collect::<Result<Vec<_>>>()?;
        Self::new(columns)
    }

    /// Compare with another table column by column, bit for bit
    pub fn same_bits(&self, other: &Table) -> bool {
        self.row_count == other.row_count
            && self.columns.len() == other.columns.len()
            && self
                .columns
                .iter()
                .zip(&other.columns)
                .all(|(a, b)| a.name() == b.name() && a.data().same_bits(b.data()))
    }

    /// Calculate the total memory usage of this table in bytes
    pub fn memory_usage(&self) -> usize {
        self.columns.iter().map(Column::memory_usage).sum()
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Table: {} rows, {} columns", self.row_count, self.columns.len())?;

        // Limit number of rows to display
        const MAX_ROWS: usize = 10;
        const MAX_COLS: usize = 8;

        let display_cols = self.columns.len().min(MAX_COLS);

        for (i, column) in self.columns.iter().take(display_cols).enumerate() {
            if i > 0 {
                write!(f, " | ")?;
            }
            write!(f, "{:>18}", column.name())?;
        }

        if display_cols < self.columns.len() {
            write!(f, " | ... ({} more columns)", self.columns.len() - display_cols)?;
        }
        writeln!(f)?;

        for i in 0..display_cols {
            if i > 0 {
                write!(f, " | ")?;
            }
            write!(f, "{:-<18}", "")?;
        }
        writeln!(f)?;

        let display_rows = self.row_count.min(MAX_ROWS);

        for row in 0..display_rows {
            for (col, column) in self.columns.iter().take(display_cols).enumerate() {
                if col > 0 {
                    write!(f, " | ")?;
                }
                let value = column.data().format_value(row).unwrap_or_else(|| "null".to_string());
                write!(f, "{value:>18}")?;
            }
            writeln!(f)?;
        }

        if self.row_count > MAX_ROWS {
            writeln!(f, "... ({} more rows)", self.row_count - MAX_ROWS)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample() -> Table {
        Table::from_columns([
            ("trip_distance", ColumnData::Float64(vec![1.0, 2.0, 3.0])),
            ("passenger_count", ColumnData::Int64(vec![1, 2, 3])),
        ])
        .unwrap()
    }

    #[test]
    fn test_length_mismatch_is_schema_error() {
        let result = Table::from_columns([
            ("a", ColumnData::Float64(vec![1.0, 2.0])),
            ("b", ColumnData::Int64(vec![1])),
        ]);
        assert!(matches!(result, Err(Error::Schema(_))));
    }

    #[test]
    fn test_column_lookup() {
        let table = sample();
        assert_eq!(table.row_count(), 3);
        assert_eq!(table.float64("trip_distance").unwrap(), &[1.0, 2.0, 3.0]);
        assert!(matches!(table.float64("fare"), Err(Error::ColumnNotFound(_))));
        assert!(matches!(table.float64("passenger_count"), Err(Error::TypeMismatch { .. })));
    }

    #[test]
    fn test_select_rejects_wrong_mask_length() {
        let table = sample();
        assert!(matches!(table.select(&[true]), Err(Error::Schema(_))));

        let selected = table.select(&[false, true, true]).unwrap();
        assert_eq!(selected.row_count(), 2);
        assert_eq!(selected.int64("passenger_count").unwrap(), &[2, 3]);
    }

    #[test]
    fn test_with_column_appends_and_replaces() {
        let table = sample()
            .with_column(Column::new("hour", ColumnData::UInt8(vec![1, 2, 3])))
            .unwrap();
        assert_eq!(table.column_count(), 3);

        let table = table
            .with_column(Column::new("hour", ColumnData::UInt8(vec![4, 5, 6])))
            .unwrap();
        assert_eq!(table.column_count(), 3);
        assert_eq!(table.uint8("hour").unwrap(), &[4, 5, 6]);

        let err = table.with_column(Column::new("bad", ColumnData::UInt8(vec![1])));
        assert!(matches!(err, Err(Error::Schema(_))));
    }

    #[test]
    fn test_take_and_head() {
        let table = sample();
        let taken = table.take(&[2, 0]).unwrap();
        assert_eq!(taken.float64("trip_distance").unwrap(), &[3.0, 1.0]);
        assert!(table.take(&[3]).is_err());
        assert_eq!(table.head(2).row_count(), 2);
        assert_eq!(table.head(10).row_count(), 3);
    }

    #[test]
    fn test_display_preview() {
        let rendered = sample().to_string();
        assert!(rendered.starts_with("Table: 3 rows, 2 columns"));
        assert!(rendered.contains("trip_distance"));
    }

    proptest! {
        #[test]
        fn prop_select_keeps_masked_rows_in_order(
            rows in proptest::collection::vec((any::<i64>(), any::<bool>()), 0..64)
        ) {
            let values: Vec<i64> = rows.iter().map(|(v, _)| *v).collect();
            let mask: Vec<bool> = rows.iter().map(|(_, m)| *m).collect();
            let table = Table::from_columns([("v", ColumnData::Int64(values.clone()))]).unwrap();

            let selected = table.select(&mask).unwrap();
            let expected: Vec<i64> = rows.iter().filter(|(_, m)| *m).map(|(v, _)| *v).collect();
            prop_assert_eq!(selected.row_count(), expected.len());
            prop_assert_eq!(selected.int64("v").unwrap(), expected.as_slice());
        }
    }
}
