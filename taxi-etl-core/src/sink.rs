//! Sink trait for result artifacts

use serde_json::Value;

use crate::error::Result;
use crate::table::Table;

/// Consumes the tables and JSON documents produced by a pipeline run.
///
/// `name` is the artifact stem, e.g. `daily_stats` or `metrics`.
pub trait Sink: Send {
    /// Write a result table
    fn write_table(&mut self, table: &Table, name: &str) -> Result<()>;

    /// Write a JSON document
    fn write_json(&mut self, value: &Value, name: &str) -> Result<()>;

    /// Flush anything buffered
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// A sink that keeps every artifact in memory, in write order
#[derive(Debug, Default)]
pub struct MemorySink {
    tables: Vec<(String, Table)>,
    documents: Vec<(String, Value)>,
}

impl MemorySink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Find a written table by name
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|(n, _)| n == name).map(|(_, t)| t)
    }

    /// Find a written document by name
    pub fn document(&self, name: &str) -> Option<&Value> {
        self.documents.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Artifact names in the order they were written
    pub fn artifact_names(&self) -> Vec<&str> {
        self.tables
            .iter()
            .map(|(n, _)| n.as_str())
            .chain(self.documents.iter().map(|(n, _)| n.as_str()))
            .collect()
    }
}

impl Sink for MemorySink {
    fn write_table(&mut self, table: &Table, name: &str) -> Result<()> {
        self.tables.push((name.to_string(), table.clone()));
        Ok(())
    }

    fn write_json(&mut self, value: &Value, name: &str) -> Result<()> {
        self.documents.push((name.to_string(), value.clone()));
        Ok(())
    }
}
