//! Column implementation for storing typed vectors of data

use chrono::{NaiveDate, NaiveDateTime};

use crate::categorical::{DayOfWeek, DistanceBin};
use crate::error::{Error, Result};
use crate::schema::{DataType, Field};

/// Display format for timestamps in output tables
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Display format for dates in output tables
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Typed storage for the values of one column
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    /// 64-bit signed integers
    Int64(Vec<i64>),
    /// 64-bit floats
    Float64(Vec<f64>),
    /// UTF-8 strings
    Utf8(Vec<String>),
    /// Timestamps without timezone
    Timestamp(Vec<NaiveDateTime>),
    /// Calendar dates
    Date(Vec<NaiveDate>),
    /// Small unsigned integers
    UInt8(Vec<u8>),
    /// Days of week
    DayOfWeek(Vec<DayOfWeek>),
    /// Distance bins, `None` when a value falls outside every bin
    DistanceBin(Vec<Option<DistanceBin>>),
}

// Applies `$body` to the vector inside every variant and rewraps the result
// in the same variant.
macro_rules! map_values {
    ($data:expr, $values:ident => $body:expr) => {
        match $data {
            ColumnData::Int64($values) => ColumnData::Int64($body),
            ColumnData::Float64($values) => ColumnData::Float64($body),
            ColumnData::Utf8($values) => ColumnData::Utf8($body),
            ColumnData::Timestamp($values) => ColumnData::Timestamp($body),
            ColumnData::Date($values) => ColumnData::Date($body),
            ColumnData::UInt8($values) => ColumnData::UInt8($body),
            ColumnData::DayOfWeek($values) => ColumnData::DayOfWeek($body),
            ColumnData::DistanceBin($values) => ColumnData::DistanceBin($body),
        }
    };
}

// Evaluates `$body` against the vector inside whichever variant is present.
macro_rules! with_values {
    ($data:expr, $values:ident => $body:expr) => {
        match $data {
            ColumnData::Int64($values) => $body,
            ColumnData::Float64($values) => $body,
            ColumnData::Utf8($values) => $body,
            ColumnData::Timestamp($values) => $body,
            ColumnData::Date($values) => $body,
            ColumnData::UInt8($values) => $body,
            ColumnData::DayOfWeek($values) => $body,
            ColumnData::DistanceBin($values) => $body,
        }
    };
}

impl ColumnData {
    /// Get the data type of these values
    pub fn data_type(&self) -> DataType {
        match self {
            ColumnData::Int64(_) => DataType::Int64,
            ColumnData::Float64(_) => DataType::Float64,
            ColumnData::Utf8(_) => DataType::Utf8,
            ColumnData::Timestamp(_) => DataType::Timestamp,
            ColumnData::Date(_) => DataType::Date,
            ColumnData::UInt8(_) => DataType::UInt8,
            ColumnData::DayOfWeek(_) => DataType::DayOfWeek,
            ColumnData::DistanceBin(_) => DataType::DistanceBin,
        }
    }

    /// Number of values
    pub fn len(&self) -> usize {
        with_values!(self, values => values.len())
    }

    /// Check if there are no values
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keep the values whose mask entry is true, in order.
    ///
    /// The mask must have the same length as the data.
    pub fn select(&self, mask: &[bool]) -> Self {
        debug_assert_eq!(mask.len(), self.len());
        map_values!(self, values => values
            .iter()
            .zip(mask)
            .filter(|(_, &keep)| keep)
            .map(|(value, _)| value.clone())
            .collect())
    }

    /// Gather values at the given positions. Indices must be in bounds.
    pub fn take(&self, indices: &[usize]) -> Self {
        map_values!(self, values => indices.iter().map(|&i| values[i].clone()).collect())
    }

    /// Copy a contiguous range of values
    pub fn slice(&self, offset: usize, length: usize) -> Self {
        map_values!(self, values => values[offset..offset + length].to_vec())
    }

    /// Compare with another column bit for bit, so that NaN equals NaN
    pub fn same_bits(&self, other: &ColumnData) -> bool {
        match (self, other) {
            (ColumnData::Float64(a), ColumnData::Float64(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
            }
            (a, b) => a == b,
        }
    }

    /// Format the value at `index`, or `None` if it is null or NaN
    pub fn format_value(&self, index: usize) -> Option<String> {
        match self {
            ColumnData::Int64(values) => Some(values[index].to_string()),
            ColumnData::Float64(values) => {
                let value = values[index];
                (!value.is_nan()).then(|| value.to_string())
            }
            ColumnData::Utf8(values) => Some(values[index].clone()),
            ColumnData::Timestamp(values) => Some(values[index].format(TIMESTAMP_FORMAT).to_string()),
            ColumnData::Date(values) => Some(values[index].format(DATE_FORMAT).to_string()),
            ColumnData::UInt8(values) => Some(values[index].to_string()),
            ColumnData::DayOfWeek(values) => Some(values[index].name().to_string()),
            ColumnData::DistanceBin(values) => values[index].map(|bin| bin.label().to_string()),
        }
    }

    /// Calculate the approximate memory usage of these values
    pub fn memory_usage(&self) -> usize {
        let fixed = self.len() * self.data_type().size_bytes();
        match self {
            ColumnData::Utf8(values) => fixed + values.iter().map(String::capacity).sum::<usize>(),
            _ => fixed,
        }
    }
}

/// A named column of data with a specific type
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// Name of the column
    name: String,

    /// Values stored in this column
    data: ColumnData,
}

impl Column {
    /// Create a new column with the given name and data
    pub fn new(name: &str, data: ColumnData) -> Self {
        Self {
            name: name.to_string(),
            data,
        }
    }

    /// Get the name of this column
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the data type of this column
    pub fn data_type(&self) -> DataType {
        self.data.data_type()
    }

    /// Describe this column as a schema field
    pub fn field(&self) -> Field {
        let data_type = self.data_type();
        Field::new(&self.name, data_type, data_type.is_nullable())
    }

    /// Get the length of this column (number of values)
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if this column is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get the number of null values in this column
    pub fn null_count(&self) -> usize {
        match &self.data {
            ColumnData::DistanceBin(values) => values.iter().filter(|v| v.is_none()).count(),
            _ => 0,
        }
    }

    /// Get access to the typed values
    pub fn data(&self) -> &ColumnData {
        &self.data
    }

    /// Take ownership of the typed values
    pub fn into_data(self) -> ColumnData {
        self.data
    }

    /// Access values as `f64`
    pub fn as_float64(&self) -> Result<&[f64]> {
        match &self.data {
            ColumnData::Float64(values) => Ok(values),
            other => Err(Error::type_mismatch(&self.name, DataType::Float64, other.data_type())),
        }
    }

    /// Access values as `i64`
    pub fn as_int64(&self) -> Result<&[i64]> {
        match &self.data {
            ColumnData::Int64(values) => Ok(values),
            other => Err(Error::type_mismatch(&self.name, DataType::Int64, other.data_type())),
        }
    }

    /// Access values as strings
    pub fn as_utf8(&self) -> Result<&[String]> {
        match &self.data {
            ColumnData::Utf8(values) => Ok(values),
            other => Err(Error::type_mismatch(&self.name, DataType::Utf8, other.data_type())),
        }
    }

    /// Access values as timestamps
    pub fn as_timestamp(&self) -> Result<&[NaiveDateTime]> {
        match &self.data {
            ColumnData::Timestamp(values) => Ok(values),
            other => Err(Error::type_mismatch(&self.name, DataType::Timestamp, other.data_type())),
        }
    }

    /// Access values as dates
    pub fn as_date(&self) -> Result<&[NaiveDate]> {
        match &self.data {
            ColumnData::Date(values) => Ok(values),
            other => Err(Error::type_mismatch(&self.name, DataType::Date, other.data_type())),
        }
    }

    /// Access values as `u8`
    pub fn as_uint8(&self) -> Result<&[u8]> {
        match &self.data {
            ColumnData::UInt8(values) => Ok(values),
            other => Err(Error::type_mismatch(&self.name, DataType::UInt8, other.data_type())),
        }
    }

    /// Access values as days of week
    pub fn as_day_of_week(&self) -> Result<&[DayOfWeek]> {
        match &self.data {
            ColumnData::DayOfWeek(values) => Ok(values),
            other => Err(Error::type_mismatch(&self.name, DataType::DayOfWeek, other.data_type())),
        }
    }

    /// Access values as distance bins
    pub fn as_distance_bin(&self) -> Result<&[Option<DistanceBin>]> {
        match &self.data {
            ColumnData::DistanceBin(values) => Ok(values),
            other => Err(Error::type_mismatch(&self.name, DataType::DistanceBin, other.data_type())),
        }
    }

    /// Numeric values widened to `f64`, for Int64, UInt8 and Float64 columns
    pub fn to_float64(&self) -> Result<Vec<f64>> {
        match &self.data {
            ColumnData::Float64(values) => Ok(values.clone()),
            ColumnData::Int64(values) => Ok(values.iter().map(|&v| v as f64).collect()),
            ColumnData::UInt8(values) => Ok(values.iter().map(|&v| f64::from(v)).collect()),
            other => Err(Error::type_mismatch(&self.name, DataType::Float64, other.data_type())),
        }
    }

    /// Calculate the memory usage of this column
    pub fn memory_usage(&self) -> usize {
        self.data.memory_usage() + self.name.len()
    }
}
