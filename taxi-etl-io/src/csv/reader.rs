//! CSV loader for trip records

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use taxi_etl_core::error::{Error as CoreError, Result as CoreResult};
use taxi_etl_core::{trip, Column, Field, Loader, Table};

use crate::error::{Error, Result};

use super::parser::ColumnBuilder;

/// Options for the CSV loader
#[derive(Debug, Clone)]
pub struct CsvLoaderOptions {
    /// Delimiter character
    pub delimiter: u8,

    /// Stop after this many data rows
    pub max_rows: Option<usize>,

    /// Read buffer size in bytes
    pub buffer_capacity: usize,

    /// Whether to trim whitespace around fields
    pub trim: bool,
}

impl Default for CsvLoaderOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            max_rows: None,
            buffer_capacity: 64 * 1024,
            trim: true,
        }
    }
}

/// Loads the trip columns of a headed CSV file.
///
/// Columns are matched by header name; extra columns are ignored.
/// Timestamps stay as text until the cleaner parses them.
#[derive(Debug, Clone, Default)]
pub struct CsvLoader {
    options: CsvLoaderOptions,
}

impl CsvLoader {
    /// Create a loader with the given options
    pub fn new(options: CsvLoaderOptions) -> Self {
        Self { options }
    }

    /// Read a trip table from any reader
    pub fn read_from<R: Read>(&self, reader: R) -> Result<Table> {
        let mut reader = ReaderBuilder::new()
            .delimiter(self.options.delimiter)
            .has_headers(true)
            .trim(if self.options.trim { Trim::All } else { Trim::None })
            .buffer_capacity(self.options.buffer_capacity)
            .from_reader(reader);

        let fields = trip::raw_fields();
        let positions = column_positions(reader.headers()?, &fields)?;
        let capacity = self.options.max_rows.unwrap_or(0).min(1 << 20);
        let mut builders = fields
            .iter()
            .map(|field| ColumnBuilder::new(field.data_type(), capacity))
            .collect::<Result<Vec<_>>>()?;

        let mut record = StringRecord::new();
        let mut rows = 0usize;
        while self.options.max_rows.map_or(true, |max| rows < max) && reader.read_record(&mut record)? {
            let line = record.position().map_or(0, csv::Position::line);
            for ((builder, &position), field) in builders.iter_mut().zip(&positions).zip(&fields) {
                builder.push(record.get(position).unwrap_or(""), line, field.name())?;
            }
            rows += 1;
        }

        let columns = fields
            .iter()
            .zip(builders)
            .map(|(field, builder)| Column::new(field.name(), builder.finish()))
            .collect();
        Ok(Table::new(columns)?)
    }

    /// Read a trip table from a file
    pub fn read_path(&self, path: &Path) -> Result<Table> {
        let file = File::open(path)?;
        self.read_from(file)
    }
}

impl Loader for CsvLoader {
    fn load(&self, path: &Path) -> CoreResult<Table> {
        if !path.exists() {
            return Err(CoreError::NotFound(path.to_path_buf()));
        }
        let table = self.read_path(path)?;
        tracing::info!(
            path = %path.display(),
            rows = table.row_count(),
            limit = ?self.options.max_rows,
            "loaded trips"
        );
        Ok(table)
    }
}

fn column_positions(headers: &StringRecord, fields: &[Field]) -> Result<Vec<usize>> {
    fields
        .iter()
        .map(|field| {
            headers
                .iter()
                .position(|header| header == field.name())
                .ok_or_else(|| Error::MissingColumn(field.name().to_string()))
        })
        .collect()
}
