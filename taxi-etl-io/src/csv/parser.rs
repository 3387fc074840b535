//! Typed column builders for CSV fields

use taxi_etl_core::{ColumnData, DataType, Error as CoreError};

use crate::error::{Error, Result};

/// Accumulates the parsed values of one CSV column
#[derive(Debug)]
pub enum ColumnBuilder {
    /// Integer column; integral decimals such as `2.0` are accepted
    Int64(Vec<i64>),
    /// Float column; an empty field is NaN
    Float64(Vec<f64>),
    /// Text column, kept verbatim
    Utf8(Vec<String>),
}

impl ColumnBuilder {
    /// Create a builder for a loader-supported type
    pub fn new(data_type: DataType, capacity: usize) -> Result<Self> {
        match data_type {
            DataType::Int64 => Ok(ColumnBuilder::Int64(Vec::with_capacity(capacity))),
            DataType::Float64 => Ok(ColumnBuilder::Float64(Vec::with_capacity(capacity))),
            DataType::Utf8 => Ok(ColumnBuilder::Utf8(Vec::with_capacity(capacity))),
            other => Err(Error::Core(CoreError::InvalidArgument(format!(
                "CSV columns cannot be loaded as {other}"
            )))),
        }
    }

    /// Parse and append one field
    pub fn push(&mut self, raw: &str, line: u64, column: &str) -> Result<()> {
        let invalid = || Error::InvalidField {
            line,
            column: column.to_string(),
            value: raw.to_string(),
        };

        match self {
            ColumnBuilder::Int64(values) => values.push(parse_int(raw).ok_or_else(invalid)?),
            ColumnBuilder::Float64(values) => {
                let value = if raw.is_empty() {
                    f64::NAN
                } else {
                    raw.parse().map_err(|_| invalid())?
                };
                values.push(value);
            }
            ColumnBuilder::Utf8(values) => values.push(raw.to_string()),
        }
        Ok(())
    }

    /// Finish into column data
    pub fn finish(self) -> ColumnData {
        match self {
            ColumnBuilder::Int64(values) => ColumnData::Int64(values),
            ColumnBuilder::Float64(values) => ColumnData::Float64(values),
            ColumnBuilder::Utf8(values) => ColumnData::Utf8(values),
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn parse_int(raw: &str) -> Option<i64> {
    if let Ok(value) = raw.parse::<i64>() {
        return Some(value);
    }
    let value: f64 = raw.parse().ok()?;
    (value.fract() == 0.0 && value.abs() < 9.0e15).then_some(value as i64)
}
