//! Column vocabulary shared by every stage.
//!
//! Source names follow the TLC yellow-taxi trip files and the taxi zone lookup
//! table; output names are the enriched vocabulary exposed to reports.

use polars::prelude::{DataFrame, DataType};

use crate::error::{PipelineError, Result};

pub const TRIPS_RELATION: &str = "trips";
pub const ZONES_RELATION: &str = "zones";

pub const PICKUP_TIME: &str = "pickup_time";
pub const DROPOFF_TIME: &str = "dropoff_time";
pub const PASSENGER_COUNT: &str = "passenger_count";
pub const TRIP_DISTANCE: &str = "trip_distance";
pub const PICKUP_LOCATION_ID: &str = "pickup_location_id";
pub const DROPOFF_LOCATION_ID: &str = "dropoff_location_id";
pub const TOTAL_AMOUNT: &str = "total_amount";

/// Source trip column paired with its enriched name.
pub const TRIP_RENAMES: [(&str, &str); 7] = [
    ("tpep_pickup_datetime", PICKUP_TIME),
    ("tpep_dropoff_datetime", DROPOFF_TIME),
    ("passenger_count", PASSENGER_COUNT),
    ("trip_distance", TRIP_DISTANCE),
    ("PULocationID", PICKUP_LOCATION_ID),
    ("DOLocationID", DROPOFF_LOCATION_ID),
    ("total_amount", TOTAL_AMOUNT),
];

pub const ZONE_LOCATION_ID: &str = "LocationID";
pub const ZONE_BOROUGH: &str = "Borough";
pub const ZONE_NAME: &str = "Zone";
pub const ZONE_SERVICE_ZONE: &str = "service_zone";

pub const PICKUP_BOROUGH: &str = "pickup_borough";
pub const PICKUP_ZONE: &str = "pickup_zone";
pub const DROPOFF_BOROUGH: &str = "dropoff_borough";
pub const DROPOFF_ZONE: &str = "dropoff_zone";

pub const TRIP_DURATION_MINUTES: &str = "trip_duration_minutes";
pub const WEEKDAY: &str = "weekday";
pub const HOUR_OF_DAY: &str = "hour_of_day";

pub const TRIP_COUNT: &str = "trip_count";
pub const MEAN_TOTAL_AMOUNT: &str = "mean_total_amount";

pub fn require_column(df: &DataFrame, relation: &str, column: &str) -> Result<DataType> {
    df.column(column)
        .map(|c| c.dtype().clone())
        .map_err(|_| PipelineError::schema_mismatch(relation, column, "column is missing"))
}

pub fn require_numeric(df: &DataFrame, relation: &str, column: &str) -> Result<()> {
    match require_column(df, relation, column)? {
        dtype if dtype.is_primitive_numeric() || dtype.is_null() => Ok(()),
        other => Err(PipelineError::schema_mismatch(
            relation,
            column,
            format!("expected a numeric column, found {other}"),
        )),
    }
}

pub fn require_datetime(df: &DataFrame, relation: &str, column: &str) -> Result<()> {
    match require_column(df, relation, column)? {
        DataType::Datetime(_, _) => Ok(()),
        other => Err(PipelineError::schema_mismatch(
            relation,
            column,
            format!("expected a datetime column, found {other}"),
        )),
    }
}
