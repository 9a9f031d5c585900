use chrono::{DateTime, NaiveDateTime, TimeZone as _, Timelike};
use chrono_tz::Tz;
use polars::prelude::*;
use serde::Serialize;
use tracing::info;

use crate::error::{PipelineError, Result};
use crate::schema::{
    require_datetime, require_numeric, DROPOFF_TIME, HOUR_OF_DAY, PICKUP_TIME, TRIPS_RELATION,
    TRIP_DISTANCE, TRIP_DURATION_MINUTES, WEEKDAY,
};

const SECONDS_PER_MINUTE: f64 = 60.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CleanStats {
    pub rows_in: usize,
    pub rows_out: usize,
    pub rows_dropped: usize,
}

/// Appends `trip_duration_minutes`, `weekday` and `hour_of_day`.
///
/// The weekday and hour are read in the pickup column's own time zone; a naive
/// column is taken as wall-clock time. Duration only depends on the instants.
pub fn derive_features(df: &DataFrame) -> Result<DataFrame> {
    require_datetime(df, TRIPS_RELATION, PICKUP_TIME)?;
    require_datetime(df, TRIPS_RELATION, DROPOFF_TIME)?;

    let len = df.height();
    let pickup = df.column(PICKUP_TIME)?.datetime()?;
    let dropoff = df.column(DROPOFF_TIME)?.datetime()?;
    let pickup_unit = pickup.time_unit();
    let dropoff_unit = dropoff.time_unit();
    let pickup_tz = column_time_zone(pickup.time_zone())?;

    let mut durations: Vec<Option<f64>> = Vec::with_capacity(len);
    let mut weekdays: Vec<Option<String>> = Vec::with_capacity(len);
    let mut hours: Vec<Option<i32>> = Vec::with_capacity(len);

    for idx in 0..len {
        let pickup_seconds = pickup.get(idx).map(|value| epoch_seconds(value, pickup_unit));
        let dropoff_seconds = dropoff.get(idx).map(|value| epoch_seconds(value, dropoff_unit));

        durations.push(match (pickup_seconds, dropoff_seconds) {
            (Some(start), Some(end)) => Some(duration_minutes(start, end)),
            _ => None,
        });

        let wall_clock = pickup
            .get(idx)
            .and_then(|value| to_naive(value, pickup_unit))
            .map(|utc| wall_clock_in(utc, pickup_tz));
        weekdays.push(wall_clock.map(|dt| dt.format("%a").to_string()));
        hours.push(wall_clock.map(|dt| dt.hour() as i32));
    }

    let mut output = df.clone();
    output.hstack_mut(&[
        Series::new(TRIP_DURATION_MINUTES.into(), durations).into(),
        Series::new(WEEKDAY.into(), weekdays).into(),
        Series::new(HOUR_OF_DAY.into(), hours).into(),
    ])?;

    Ok(output)
}

/// Keeps trips with a positive duration and a positive distance. Nulls in either
/// column drop the row.
pub fn clean_trips(df: &DataFrame) -> Result<(DataFrame, CleanStats)> {
    require_numeric(df, TRIPS_RELATION, TRIP_DISTANCE)?;
    require_numeric(df, TRIPS_RELATION, TRIP_DURATION_MINUTES)?;

    let rows_in = df.height();
    let cleaned = df
        .clone()
        .lazy()
        .filter(
            col(TRIP_DURATION_MINUTES)
                .gt(lit(0.0))
                .and(col(TRIP_DISTANCE).gt(lit(0.0))),
        )
        .collect()?;

    let stats = CleanStats {
        rows_in,
        rows_out: cleaned.height(),
        rows_dropped: rows_in - cleaned.height(),
    };
    info!(
        rows_in = stats.rows_in,
        rows_out = stats.rows_out,
        rows_dropped = stats.rows_dropped,
        "dropped trips with non-positive duration or distance"
    );

    Ok((cleaned, stats))
}

/// Rounds half away from zero to two decimals, judged on the shortest decimal
/// form of `value`: 1.005 rounds to 1.01 even though its binary value sits
/// just below the midpoint.
pub fn round_to_hundredths(value: f64) -> f64 {
    if !value.is_finite() {
        return value;
    }
    // Shifting the decimal point in text keeps 1.005 at exactly 100.5.
    match format!("{value}e2").parse::<f64>() {
        Ok(scaled) => scaled.round() / 100.0,
        Err(_) => (value * 100.0).round() / 100.0,
    }
}

/// Whole-second epoch value; sub-second parts are truncated toward negative infinity.
fn epoch_seconds(value: i64, unit: TimeUnit) -> i64 {
    value.div_euclid(units_per_second(unit))
}

fn duration_minutes(start_seconds: i64, end_seconds: i64) -> f64 {
    round_to_hundredths((end_seconds - start_seconds) as f64 / SECONDS_PER_MINUTE)
}

fn to_naive(value: i64, unit: TimeUnit) -> Option<NaiveDateTime> {
    let per_second = units_per_second(unit);
    let seconds = value.div_euclid(per_second);
    let nanos = value.rem_euclid(per_second) * (1_000_000_000 / per_second);
    DateTime::from_timestamp(seconds, nanos as u32).map(|dt| dt.naive_utc())
}

fn column_time_zone(zone: &Option<polars::prelude::TimeZone>) -> Result<Option<Tz>> {
    zone.as_ref()
        .map(|zone| {
            zone.as_str().parse::<Tz>().map_err(|_| {
                PipelineError::schema_mismatch(
                    TRIPS_RELATION,
                    PICKUP_TIME,
                    format!("unsupported time zone {}", zone.as_str()),
                )
            })
        })
        .transpose()
}

fn wall_clock_in(utc: NaiveDateTime, zone: Option<Tz>) -> NaiveDateTime {
    match zone {
        Some(tz) => tz.from_utc_datetime(&utc).naive_local(),
        None => utc,
    }
}

fn units_per_second(unit: TimeUnit) -> i64 {
    match unit {
        TimeUnit::Nanoseconds => 1_000_000_000,
        TimeUnit::Microseconds => 1_000_000,
        TimeUnit::Milliseconds => 1_000,
    }
}
