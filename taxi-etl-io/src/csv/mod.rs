//! CSV loading and writing
//!
//! [`CsvLoader`] reads the fixed trip column set into a
//! [`Table`](taxi_etl_core::Table); [`CsvTableWriter`] writes any table
//! back out with a header row.

mod parser;
mod reader;
mod writer;

pub use parser::ColumnBuilder;
pub use reader::{CsvLoader, CsvLoaderOptions};
pub use writer::{create_csv_writer, CsvTableWriter, CsvWriterOptions};
