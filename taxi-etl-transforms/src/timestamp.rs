//! Parsing of pickup and dropoff timestamps

use chrono::NaiveDateTime;

use taxi_etl_core::{Error, Result};

/// Accepted layouts; `%.f` also matches an absent fractional part.
const FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Parse one timestamp. Empty or unrecognised text yields `None`.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let text = raw.trim();
    if text.is_empty() {
        return None;
    }
    FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
}

/// Parse every value of a text column, failing on the first bad row
pub fn parse_timestamps(column: &str, values: &[String]) -> Result<Vec<NaiveDateTime>> {
    values
        .iter()
        .enumerate()
        .map(|(row, raw)| {
            parse_timestamp(raw).ok_or_else(|| Error::MalformedTimestamp {
                column: column.to_string(),
                row,
                value: raw.clone(),
            })
        })
        .collect()
}
