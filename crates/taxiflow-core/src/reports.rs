//! Read-only aggregate reports over the enriched trips view.

use polars::prelude::*;

use crate::error::Result;
use crate::features::round_to_hundredths;
use crate::schema::{
    require_column, require_numeric, DROPOFF_ZONE, MEAN_TOTAL_AMOUNT, PICKUP_BOROUGH, PICKUP_ZONE,
    TOTAL_AMOUNT, TRIP_COUNT,
};
use crate::session::Session;

/// Trip counts per (pickup zone, dropoff zone), busiest pairs first.
///
/// Null zones group together like any other value. Ties on the count are broken
/// by zone names so the report is stable between runs.
pub fn top_zone_pairs(session: &Session, view: &str, limit: u32) -> Result<DataFrame> {
    let trips = session.view(view)?;
    require_column(trips, view, PICKUP_ZONE)?;
    require_column(trips, view, DROPOFF_ZONE)?;

    let report = trips
        .clone()
        .lazy()
        .group_by([col(PICKUP_ZONE), col(DROPOFF_ZONE)])
        .agg([len().cast(DataType::Int64).alias(TRIP_COUNT)])
        .sort(
            [TRIP_COUNT, PICKUP_ZONE, DROPOFF_ZONE],
            SortMultipleOptions::default()
                .with_order_descending_multi([true, false, false])
                .with_nulls_last(true),
        )
        .limit(limit)
        .collect()?;

    Ok(report)
}

/// Mean `total_amount` per pickup borough, highest first, rounded to cents.
///
/// Rows whose borough equals `excluded_borough` are left out. Rows with a null
/// borough are left out too, since they never compare unequal to the literal.
pub fn mean_fare_by_borough(
    session: &Session,
    view: &str,
    excluded_borough: &str,
) -> Result<DataFrame> {
    let trips = session.view(view)?;
    require_column(trips, view, PICKUP_BOROUGH)?;
    require_numeric(trips, view, TOTAL_AMOUNT)?;

    let mut report = trips
        .clone()
        .lazy()
        .filter(col(PICKUP_BOROUGH).neq(lit(excluded_borough)))
        .group_by([col(PICKUP_BOROUGH)])
        .agg([col(TOTAL_AMOUNT)
            .cast(DataType::Float64)
            .mean()
            .alias(MEAN_TOTAL_AMOUNT)])
        .collect()?;

    let rounded: Vec<Option<f64>> = report
        .column(MEAN_TOTAL_AMOUNT)?
        .f64()?
        .into_iter()
        .map(|mean| mean.map(round_to_hundredths))
        .collect();
    report.with_column(Series::new(MEAN_TOTAL_AMOUNT.into(), rounded))?;

    Ok(report.sort(
        [MEAN_TOTAL_AMOUNT, PICKUP_BOROUGH],
        SortMultipleOptions::default()
            .with_order_descending_multi([true, false])
            .with_nulls_last(true),
    )?)
}
