#![allow(dead_code)]

use chrono::NaiveDateTime;
use polars::lazy::dsl::col;
use polars::prelude::*;
use taxiflow_core::config::PipelineConfig;

pub struct Trip {
    pub pickup: &'static str,
    pub dropoff: &'static str,
    pub distance: f64,
    pub pickup_location: i64,
    pub dropoff_location: i64,
    pub total_amount: f64,
}

impl Trip {
    pub fn new(
        pickup: &'static str,
        dropoff: &'static str,
        pickup_location: i64,
        dropoff_location: i64,
    ) -> Self {
        Trip {
            pickup,
            dropoff,
            distance: 2.0,
            pickup_location,
            dropoff_location,
            total_amount: 20.0,
        }
    }

    pub fn distance(mut self, distance: f64) -> Self {
        self.distance = distance;
        self
    }

    pub fn amount(mut self, total_amount: f64) -> Self {
        self.total_amount = total_amount;
        self
    }
}

pub fn micros(timestamp: &str) -> i64 {
    NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%dT%H:%M:%S")
        .expect("timestamp fixture")
        .and_utc()
        .timestamp_micros()
}

/// Builds a trips relation with the TLC source column names.
pub fn trips_frame(trips: &[Trip]) -> DataFrame {
    let pickups: Vec<i64> = trips.iter().map(|t| micros(t.pickup)).collect();
    let dropoffs: Vec<i64> = trips.iter().map(|t| micros(t.dropoff)).collect();
    let passengers: Vec<i64> = trips.iter().map(|_| 1).collect();
    let distances: Vec<f64> = trips.iter().map(|t| t.distance).collect();
    let pickup_locations: Vec<i64> = trips.iter().map(|t| t.pickup_location).collect();
    let dropoff_locations: Vec<i64> = trips.iter().map(|t| t.dropoff_location).collect();
    let amounts: Vec<f64> = trips.iter().map(|t| t.total_amount).collect();
    let vendors: Vec<i64> = trips.iter().map(|_| 2).collect();

    df![
        "VendorID" => vendors,
        "tpep_pickup_datetime" => pickups,
        "tpep_dropoff_datetime" => dropoffs,
        "passenger_count" => passengers,
        "trip_distance" => distances,
        "PULocationID" => pickup_locations,
        "DOLocationID" => dropoff_locations,
        "total_amount" => amounts,
    ]
    .expect("trips df")
    .lazy()
    .with_columns([
        col("tpep_pickup_datetime").cast(DataType::Datetime(TimeUnit::Microseconds, None)),
        col("tpep_dropoff_datetime").cast(DataType::Datetime(TimeUnit::Microseconds, None)),
    ])
    .collect()
    .expect("collect trips")
}

pub fn zones_frame() -> DataFrame {
    df![
        "LocationID" => &[100i64, 200, 264],
        "Borough" => &["Manhattan", "Queens", "Unknown"],
        "Zone" => &["Midtown", "Astoria", "NV"],
        "service_zone" => &["Yellow Zone", "Boro Zone", "N/A"],
    ]
    .expect("zones df")
}

pub fn test_config() -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.inputs.trips = "trips".to_string();
    config.inputs.zones = "zones".to_string();
    config.output.table = "trips_enriched".to_string();
    config.output.view = "vw_trips".to_string();
    config
}

pub fn str_values(df: &DataFrame, name: &str) -> Vec<Option<String>> {
    df.column(name)
        .expect("column")
        .str()
        .expect("string column")
        .into_iter()
        .map(|value| value.map(str::to_string))
        .collect()
}

pub fn f64_values(df: &DataFrame, name: &str) -> Vec<Option<f64>> {
    df.column(name)
        .expect("column")
        .f64()
        .expect("f64 column")
        .into_iter()
        .collect()
}

pub fn i64_values(df: &DataFrame, name: &str) -> Vec<Option<i64>> {
    df.column(name)
        .expect("column")
        .i64()
        .expect("i64 column")
        .into_iter()
        .collect()
}
