//! Categorical value types derived from trip records
//!
//! Both enums order their variants the way result tables are emitted:
//! weekdays Monday first, distance bins shortest first.

use std::fmt;

/// Day of the week a trip started on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DayOfWeek {
    /// Monday
    Monday,
    /// Tuesday
    Tuesday,
    /// Wednesday
    Wednesday,
    /// Thursday
    Thursday,
    /// Friday
    Friday,
    /// Saturday
    Saturday,
    /// Sunday
    Sunday,
}

impl DayOfWeek {
    /// All days, Monday first
    pub const ALL: [DayOfWeek; 7] = [
        DayOfWeek::Monday,
        DayOfWeek::Tuesday,
        DayOfWeek::Wednesday,
        DayOfWeek::Thursday,
        DayOfWeek::Friday,
        DayOfWeek::Saturday,
        DayOfWeek::Sunday,
    ];

    /// English day name
    pub fn name(self) -> &'static str {
        match self {
            DayOfWeek::Monday => "Monday",
            DayOfWeek::Tuesday => "Tuesday",
            DayOfWeek::Wednesday => "Wednesday",
            DayOfWeek::Thursday => "Thursday",
            DayOfWeek::Friday => "Friday",
            DayOfWeek::Saturday => "Saturday",
            DayOfWeek::Sunday => "Sunday",
        }
    }

    /// Saturday or Sunday
    pub fn is_weekend(self) -> bool {
        matches!(self, DayOfWeek::Saturday | DayOfWeek::Sunday)
    }
}

impl From<chrono::Weekday> for DayOfWeek {
    fn from(weekday: chrono::Weekday) -> Self {
        match weekday {
            chrono::Weekday::Mon => DayOfWeek::Monday,
            chrono::Weekday::Tue => DayOfWeek::Tuesday,
            chrono::Weekday::Wed => DayOfWeek::Wednesday,
            chrono::Weekday::Thu => DayOfWeek::Thursday,
            chrono::Weekday::Fri => DayOfWeek::Friday,
            chrono::Weekday::Sat => DayOfWeek::Saturday,
            chrono::Weekday::Sun => DayOfWeek::Sunday,
        }
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Fixed trip-distance bin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DistanceBin {
    /// `[0, 1)` miles
    Short,
    /// `[1, 3)` miles
    Medium,
    /// `[3, 5)` miles
    Long,
    /// `[5, 10)` miles
    VeryLong,
    /// `[10, 100]` miles
    Extreme,
}

impl DistanceBin {
    /// All bins in ascending distance order
    pub const ALL: [DistanceBin; 5] = [
        DistanceBin::Short,
        DistanceBin::Medium,
        DistanceBin::Long,
        DistanceBin::VeryLong,
        DistanceBin::Extreme,
    ];

    /// Bin edges in miles. Every bin is closed on the left and open on the
    /// right except the last, which also includes its upper edge.
    pub const EDGES: [f64; 6] = [0.0, 1.0, 3.0, 5.0, 10.0, 100.0];

    /// Classify a distance, returning `None` outside `[0, 100]` or for NaN
    pub fn classify(distance: f64) -> Option<Self> {
        let edges = Self::EDGES;
        if !(edges[0]..=edges[5]).contains(&distance) {
            return None;
        }

        let bin = if distance < edges[1] {
            DistanceBin::Short
        } else if distance < edges[2] {
            DistanceBin::Medium
        } else if distance < edges[3] {
            DistanceBin::Long
        } else if distance < edges[4] {
            DistanceBin::VeryLong
        } else {
            DistanceBin::Extreme
        };
        Some(bin)
    }

    /// Human-readable label
    pub fn label(self) -> &'static str {
        match self {
            DistanceBin::Short => "Short (0-1mi)",
            DistanceBin::Medium => "Medium (1-3mi)",
            DistanceBin::Long => "Long (3-5mi)",
            DistanceBin::VeryLong => "Very Long (5-10mi)",
            DistanceBin::Extreme => "Extreme (10+mi)",
        }
    }
}

impl fmt::Display for DistanceBin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
