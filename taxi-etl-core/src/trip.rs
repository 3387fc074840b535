//! Column names and types of the trip record

use crate::schema::{DataType, Field};

/// Pickup time as loaded (text) or parsed (timestamp)
pub const PICKUP_DATETIME: &str = "tpep_pickup_datetime";
/// Dropoff time as loaded (text) or parsed (timestamp)
pub const DROPOFF_DATETIME: &str = "tpep_dropoff_datetime";
/// Number of passengers
pub const PASSENGER_COUNT: &str = "passenger_count";
/// Trip length in miles
pub const TRIP_DISTANCE: &str = "trip_distance";
/// Pickup longitude in degrees
pub const PICKUP_LONGITUDE: &str = "pickup_longitude";
/// Pickup latitude in degrees
pub const PICKUP_LATITUDE: &str = "pickup_latitude";
/// Dropoff longitude in degrees
pub const DROPOFF_LONGITUDE: &str = "dropoff_longitude";
/// Dropoff latitude in degrees
pub const DROPOFF_LATITUDE: &str = "dropoff_latitude";
/// Total charged to the passenger
pub const TOTAL_AMOUNT: &str = "total_amount";

/// Derived: dropoff minus pickup, in minutes
pub const TRIP_DURATION_MINUTES: &str = "trip_duration_minutes";
/// Derived: calendar date of pickup
pub const DATE: &str = "date";
/// Derived: hour of pickup, 0-23
pub const HOUR: &str = "hour";
/// Derived: weekday of pickup
pub const DAY_OF_WEEK: &str = "day_of_week";
/// Derived: bin of `trip_distance`
pub const DISTANCE_BIN: &str = "distance_bin";

/// The four coordinate columns checked for zero values
pub const COORDINATES: [&str; 4] = [
    PICKUP_LONGITUDE,
    PICKUP_LATITUDE,
    DROPOFF_LONGITUDE,
    DROPOFF_LATITUDE,
];

/// Columns a loader must produce, with the types it produces them as.
///
/// Timestamps are kept as text until cleaning parses them.
pub fn raw_fields() -> Vec<Field> {
    vec![
        Field::new(PICKUP_DATETIME, DataType::Utf8, false),
        Field::new(DROPOFF_DATETIME, DataType::Utf8, false),
        Field::new(PASSENGER_COUNT, DataType::Int64, false),
        Field::new(TRIP_DISTANCE, DataType::Float64, false),
        Field::new(PICKUP_LONGITUDE, DataType::Float64, false),
        Field::new(PICKUP_LATITUDE, DataType::Float64, false),
        Field::new(DROPOFF_LONGITUDE, DataType::Float64, false),
        Field::new(DROPOFF_LATITUDE, DataType::Float64, false),
        Field::new(TOTAL_AMOUNT, DataType::Float64, false),
    ]
}
