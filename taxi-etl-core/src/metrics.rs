//! Append-only pipeline metrics

use std::time::Duration;

use serde::ser::{Serialize, SerializeMap, Serializer};

/// A single measurement recorded by the pipeline
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
#[serde(untagged)]
pub enum MetricValue {
    /// Row or item count
    Count(u64),
    /// Elapsed wall time in seconds
    Seconds(f64),
    /// Memory delta in megabytes (may be negative)
    Megabytes(f64),
}

impl MetricValue {
    /// Value as a plain number
    pub fn as_f64(self) -> f64 {
        match self {
            MetricValue::Count(count) => count as f64,
            MetricValue::Seconds(value) | MetricValue::Megabytes(value) => value,
        }
    }
}

/// Ordered mapping from metric name to value.
///
/// Entries can only be added. Recording an existing key keeps the first
/// value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metrics {
    entries: Vec<(String, MetricValue)>,
}

impl Metrics {
    /// Create an empty metrics record
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a value under `key`. Returns false if the key already exists.
    pub fn record(&mut self, key: impl Into<String>, value: MetricValue) -> bool {
        let key = key.into();
        if self.get(&key).is_some() {
            tracing::warn!(metric = %key, "metric already recorded, keeping first value");
            return false;
        }
        self.entries.push((key, value));
        true
    }

    /// Record a row or item count
    pub fn record_count(&mut self, key: impl Into<String>, count: usize) -> bool {
        self.record(key, MetricValue::Count(count as u64))
    }

    /// Record an elapsed time
    pub fn record_duration(&mut self, key: impl Into<String>, elapsed: Duration) -> bool {
        self.record(key, MetricValue::Seconds(elapsed.as_secs_f64()))
    }

    /// Record a memory delta given in bytes
    pub fn record_memory_delta(&mut self, key: impl Into<String>, delta_bytes: i64) -> bool {
        self.record(key, MetricValue::Megabytes(delta_bytes as f64 / 1024.0 / 1024.0))
    }

    /// Look up a metric by name
    pub fn get(&self, key: &str) -> Option<MetricValue> {
        self.entries
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| *value)
    }

    /// Iterate metrics in recording order
    pub fn iter(&self) -> impl Iterator<Item = (&str, MetricValue)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), *value))
    }

    /// Iterate only the timing metrics
    pub fn timings(&self) -> impl Iterator<Item = (&str, Duration)> {
        self.iter().filter_map(|(name, value)| match value {
            MetricValue::Seconds(seconds) => Some((name, Duration::from_secs_f64(seconds.max(0.0)))),
            _ => None,
        })
    }

    /// Largest memory delta recorded so far, in megabytes
    pub fn peak_memory(&self) -> Option<f64> {
        self.iter()
            .filter_map(|(_, value)| match value {
                MetricValue::Megabytes(mb) => Some(mb),
                _ => None,
            })
            .reduce(f64::max)
    }

    /// Number of recorded metrics
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for Metrics {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
