use polars::prelude::DataFrame;
use tracing::info;

use crate::catalog::Catalog;
use crate::config::InputsConfig;
use crate::error::Result;

/// The two input relations exactly as the catalog returned them.
#[derive(Debug, Clone)]
pub struct RawInputs {
    pub trips: DataFrame,
    pub zones: DataFrame,
}

pub fn load_inputs(catalog: &Catalog, inputs: &InputsConfig) -> Result<RawInputs> {
    let trips = catalog.read_table(&inputs.trips)?;
    info!(relation = %inputs.trips, rows = trips.height(), "loaded trips");

    let zones = catalog.read_table(&inputs.zones)?;
    info!(relation = %inputs.zones, rows = zones.height(), "loaded zone lookup");

    Ok(RawInputs { trips, zones })
}
