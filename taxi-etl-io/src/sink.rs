//! Sink that writes artifacts into a directory

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde_json::Value;
use taxi_etl_core::error::{Error as CoreError, Result as CoreResult};
use taxi_etl_core::{Sink, Table};

use crate::csv::{create_csv_writer, CsvWriterOptions};
use crate::error::{Error, Result};

/// Options for [`DirectorySink`]
#[derive(Debug, Clone, Default)]
pub struct SinkOptions {
    /// Prepended to every file name as `{prefix}_{name}`
    pub prefix: Option<String>,

    /// CSV formatting
    pub csv: CsvWriterOptions,
}

/// Writes tables as `{name}.csv` and documents as pretty `{name}.json`
#[derive(Debug)]
pub struct DirectorySink {
    directory: PathBuf,
    options: SinkOptions,
    written: Vec<PathBuf>,
}

impl DirectorySink {
    /// Create the directory (and parents) if needed
    pub fn create(directory: impl Into<PathBuf>, options: SinkOptions) -> CoreResult<Self> {
        let directory = directory.into();
        fs::create_dir_all(&directory).map_err(|source| CoreError::Write {
            name: directory.display().to_string(),
            source,
        })?;
        Ok(Self {
            directory,
            options,
            written: Vec::new(),
        })
    }

    /// Output directory
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Files written so far, in order
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    /// Path an artifact is written to
    pub fn path_for(&self, name: &str, extension: &str) -> PathBuf {
        let file_name = match &self.options.prefix {
            Some(prefix) => format!("{prefix}_{name}.{extension}"),
            None => format!("{name}.{extension}"),
        };
        self.directory.join(file_name)
    }

    fn finish(&mut self, path: PathBuf, name: &str) {
        tracing::debug!(artifact = name, path = %path.display(), "artifact written");
        self.written.push(path);
    }
}

impl Sink for DirectorySink {
    fn write_table(&mut self, table: &Table, name: &str) -> CoreResult<()> {
        let path = self.path_for(name, "csv");
        write_csv(&path, table, &self.options.csv).map_err(|err| write_error(name, err))?;
        self.finish(path, name);
        Ok(())
    }

    fn write_json(&mut self, value: &Value, name: &str) -> CoreResult<()> {
        let path = self.path_for(name, "json");
        write_pretty_json(&path, value).map_err(|err| write_error(name, err))?;
        self.finish(path, name);
        Ok(())
    }
}

fn write_csv(path: &Path, table: &Table, options: &CsvWriterOptions) -> Result<()> {
    let mut writer = create_csv_writer(path, options)?;
    writer.write_table(table)?;
    writer.flush()
}

fn write_pretty_json(path: &Path, value: &Value) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

fn write_error(name: &str, err: Error) -> CoreError {
    let source = match err {
        Error::Io(err) => err,
        Error::Csv(err) => io::Error::from(err),
        Error::Json(err) => io::Error::from(err),
        other => io::Error::new(io::ErrorKind::Other, other.to_string()),
    };
    CoreError::Write {
        name: name.to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taxi_etl_core::ColumnData;

    #[test]
    fn test_writes_prefixed_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let options = SinkOptions {
            prefix: Some("rust".to_string()),
            ..Default::default()
        };
        let mut sink = DirectorySink::create(dir.path().join("out"), options).unwrap();

        let table = Table::from_columns([
            ("hour", ColumnData::UInt8(vec![7, 8])),
            ("trip_distance_mean", ColumnData::Float64(vec![1.5, f64::NAN])),
        ])
        .unwrap();
        sink.write_table(&table, "hourly_stats").unwrap();
        sink.write_json(&serde_json::json!({"total_rows": 2}), "summary").unwrap();

        let csv_path = dir.path().join("out").join("rust_hourly_stats.csv");
        assert_eq!(
            fs::read_to_string(&csv_path).unwrap(),
            "hour,trip_distance_mean\n7,1.5\n8,\n"
        );
        let json = fs::read_to_string(dir.path().join("out").join("rust_summary.json")).unwrap();
        assert_eq!(json, "{\n  \"total_rows\": 2\n}\n");
        assert_eq!(sink.written().len(), 2);
        assert_eq!(sink.written()[0], csv_path);
    }

    #[test]
    fn test_write_failure_names_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = DirectorySink::create(dir.path(), SinkOptions::default()).unwrap();
        // A directory where the file should go makes File::create fail
        fs::create_dir(dir.path().join("daily_stats.csv")).unwrap();

        let err = sink.write_table(&Table::empty(), "daily_stats").unwrap_err();
        assert!(matches!(err, CoreError::Write { ref name, .. } if name == "daily_stats"));
        assert!(sink.written().is_empty());
    }
}
