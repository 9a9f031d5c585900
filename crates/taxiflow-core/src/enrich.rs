//! Renames trip columns and attaches pickup/dropoff zone names.
//!
//! The zone lookup is applied twice to the same trips, once per location role.
//! Each application joins against its own projection of the lookup whose columns
//! carry the role prefix, so the two results never collide and the lookup key and
//! `service_zone` never reach the output.

use std::collections::HashSet;

use polars::prelude::*;
use serde::Serialize;
use tracing::info;

use crate::error::{PipelineError, Result};
use crate::schema::{
    require_column, require_numeric, DROPOFF_BOROUGH, DROPOFF_LOCATION_ID, DROPOFF_ZONE,
    PICKUP_BOROUGH, PICKUP_LOCATION_ID, PICKUP_ZONE, TRIPS_RELATION, TRIP_RENAMES,
    ZONES_RELATION, ZONE_BOROUGH, ZONE_LOCATION_ID, ZONE_NAME,
};

const ROW_ORDINAL: &str = "__trip_ordinal";
const PICKUP_LOOKUP_KEY: &str = "__pickup_lookup_key";
const DROPOFF_LOOKUP_KEY: &str = "__dropoff_lookup_key";

/// Trips whose location id found no row in the zone lookup. Not an error: those
/// trips keep null borough/zone values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct JoinStats {
    pub pickup_unmatched: usize,
    pub dropoff_unmatched: usize,
}

/// One lookup role: which trip key it matches and the names its columns take.
struct ZoneRole {
    trip_key: &'static str,
    lookup_key: &'static str,
    borough: &'static str,
    zone: &'static str,
}

const PICKUP_ROLE: ZoneRole = ZoneRole {
    trip_key: PICKUP_LOCATION_ID,
    lookup_key: PICKUP_LOOKUP_KEY,
    borough: PICKUP_BOROUGH,
    zone: PICKUP_ZONE,
};

const DROPOFF_ROLE: ZoneRole = ZoneRole {
    trip_key: DROPOFF_LOCATION_ID,
    lookup_key: DROPOFF_LOOKUP_KEY,
    borough: DROPOFF_BOROUGH,
    zone: DROPOFF_ZONE,
};

pub fn enrich_trips(trips: &DataFrame, zones: &DataFrame) -> Result<(DataFrame, JoinStats)> {
    let renamed = rename_trip_columns(trips)?;
    let (joined, stats) = join_zones(&renamed, zones)?;
    info!(
        rows = joined.height(),
        pickup_unmatched = stats.pickup_unmatched,
        dropoff_unmatched = stats.dropoff_unmatched,
        "joined trips with zone lookup"
    );
    Ok((joined, stats))
}

/// Renames the TLC source columns to the enriched vocabulary. Columns outside the
/// rename set pass through untouched.
pub fn rename_trip_columns(trips: &DataFrame) -> Result<DataFrame> {
    for (source, _) in TRIP_RENAMES {
        require_column(trips, TRIPS_RELATION, source)?;
    }

    let (existing, new): (Vec<&str>, Vec<&str>) = TRIP_RENAMES
        .iter()
        .filter(|(source, target)| source != target)
        .copied()
        .unzip();

    Ok(trips.clone().lazy().rename(existing, new, true).collect()?)
}

/// Left-joins renamed trips against the zone lookup for both location roles.
///
/// The row count and row order of `trips` are preserved.
pub fn join_zones(trips: &DataFrame, zones: &DataFrame) -> Result<(DataFrame, JoinStats)> {
    for column in [ZONE_LOCATION_ID, ZONE_BOROUGH, ZONE_NAME] {
        require_column(zones, ZONES_RELATION, column)?;
    }
    require_numeric(zones, ZONES_RELATION, ZONE_LOCATION_ID)?;
    require_numeric(trips, TRIPS_RELATION, PICKUP_LOCATION_ID)?;
    require_numeric(trips, TRIPS_RELATION, DROPOFF_LOCATION_ID)?;

    let known_keys = unique_zone_keys(zones)?;
    let stats = JoinStats {
        pickup_unmatched: count_unmatched(trips, PICKUP_LOCATION_ID, &known_keys)?,
        dropoff_unmatched: count_unmatched(trips, DROPOFF_LOCATION_ID, &known_keys)?,
    };

    let joined = trips
        .clone()
        .lazy()
        .with_row_index(ROW_ORDINAL, None)
        .with_columns([
            col(PICKUP_LOCATION_ID).cast(DataType::Int64),
            col(DROPOFF_LOCATION_ID).cast(DataType::Int64),
        ]);
    let joined = join_role(joined, zones, &PICKUP_ROLE);
    let joined = join_role(joined, zones, &DROPOFF_ROLE)
        .sort([ROW_ORDINAL], SortMultipleOptions::default())
        .collect()?
        .drop(ROW_ORDINAL)?;

    Ok((joined, stats))
}

fn join_role(trips: LazyFrame, zones: &DataFrame, role: &ZoneRole) -> LazyFrame {
    let lookup = zones.clone().lazy().select([
        col(ZONE_LOCATION_ID).cast(DataType::Int64).alias(role.lookup_key),
        col(ZONE_BOROUGH).cast(DataType::String).alias(role.borough),
        col(ZONE_NAME).cast(DataType::String).alias(role.zone),
    ]);

    trips.join(
        lookup,
        [col(role.trip_key)],
        [col(role.lookup_key)],
        JoinArgs::new(JoinType::Left).with_coalesce(JoinCoalesce::CoalesceColumns),
    )
}

/// Collects the lookup keys, rejecting duplicates: a repeated key would fan a
/// single trip out into several output rows.
fn unique_zone_keys(zones: &DataFrame) -> Result<HashSet<i64>> {
    let keys = zones.column(ZONE_LOCATION_ID)?.cast(&DataType::Int64)?;
    let keys = keys.i64()?;

    let mut seen = HashSet::with_capacity(keys.len());
    for key in keys.into_iter().flatten() {
        if !seen.insert(key) {
            return Err(PipelineError::DuplicateLookupKey { location_id: key });
        }
    }
    Ok(seen)
}

fn count_unmatched(trips: &DataFrame, column: &str, known_keys: &HashSet<i64>) -> Result<usize> {
    let ids = trips.column(column)?.cast(&DataType::Int64)?;
    let ids = ids.i64()?;
    Ok(ids
        .into_iter()
        .filter(|id| !matches!(id, Some(value) if known_keys.contains(value)))
        .count())
}
