//! CSV writer for result tables

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use csv::WriterBuilder;
use taxi_etl_core::Table;

use crate::error::{Error, Result};

/// Options for CSV writer
#[derive(Debug, Clone)]
pub struct CsvWriterOptions {
    /// Delimiter character
    pub delimiter: u8,

    /// Buffer size for writing
    pub buffer_size: usize,
}

impl Default for CsvWriterOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            buffer_size: 64 * 1024, // 64KB
        }
    }
}

/// Writes tables as CSV with a header row.
///
/// Null bins and NaN values are written as empty fields.
pub struct CsvTableWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> CsvTableWriter<W> {
    /// Create a new CSV writer
    pub fn new(writer: W, options: &CsvWriterOptions) -> Self {
        let writer = WriterBuilder::new()
            .delimiter(options.delimiter)
            .from_writer(writer);
        Self { writer }
    }

    /// Write the header and every row of `table`
    pub fn write_table(&mut self, table: &Table) -> Result<()> {
        self.writer
            .write_record(table.columns().iter().map(|column| column.name()))?;

        let mut row = Vec::with_capacity(table.column_count());
        for index in 0..table.row_count() {
            row.clear();
            row.extend(
                table
                    .columns()
                    .iter()
                    .map(|column| column.data().format_value(index).unwrap_or_default()),
            );
            self.writer.write_record(&row)?;
        }
        Ok(())
    }

    /// Flush the writer
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Flush and return the underlying writer
    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|err| Error::Io(err.into_error()))
    }
}

/// Create a CSV writer for a file
pub fn create_csv_writer<P: AsRef<Path>>(
    path: P,
    options: &CsvWriterOptions,
) -> Result<CsvTableWriter<BufWriter<File>>> {
    let file = File::create(path)?;
    let buf_writer = BufWriter::with_capacity(options.buffer_size, file);
    Ok(CsvTableWriter::new(buf_writer, options))
}
