mod common;

use std::fs;

use polars::prelude::*;
use taxiflow_core::error::PipelineError;
use taxiflow_core::publish::overwrite_table;
use taxiflow_core::{run_pipeline, run_reports, Catalog, RunOptions};

use common::{f64_values, i64_values, str_values, test_config, trips_frame, zones_frame, Trip};

fn seeded_catalog(trips: &[Trip]) -> Catalog {
    let catalog = Catalog::in_memory();
    catalog.insert_table("trips", trips_frame(trips)).expect("seed trips");
    catalog.insert_table("zones", zones_frame()).expect("seed zones");
    catalog
}

#[test]
fn single_trip_scenario_produces_one_enriched_row() -> PolarsResult<()> {
    let catalog = seeded_catalog(&[Trip::new("2023-01-01T08:00:00", "2023-01-01T08:15:00", 100, 200)]);
    let config = test_config();

    let outcome = run_pipeline(&catalog, &config, RunOptions::default()).expect("run");
    let output = catalog.read_table("trips_enriched").expect("published table");

    assert_eq!(output.height(), 1);
    assert_eq!(f64_values(&output, "trip_duration_minutes"), vec![Some(15.0)]);
    assert_eq!(str_values(&output, "weekday"), vec![Some("Sun".into())]);
    let hours: Vec<Option<i32>> = output.column("hour_of_day")?.i32()?.into_iter().collect();
    assert_eq!(hours, vec![Some(8)]);
    assert_eq!(str_values(&output, "pickup_borough"), vec![Some("Manhattan".into())]);
    assert_eq!(str_values(&output, "dropoff_borough"), vec![Some("Queens".into())]);

    assert!(outcome.session.view("vw_trips").is_ok());
    assert_eq!(outcome.summary.input_rows, 1);
    assert_eq!(outcome.summary.output_rows, 1);
    let receipt = outcome.summary.publish.expect("receipt");
    assert_eq!(receipt.row_count, 1);
    assert_eq!(receipt.fingerprint.len(), 64);
    Ok(())
}

#[test]
fn negative_duration_trip_is_absent_from_output_and_reports() {
    let catalog = seeded_catalog(&[
        Trip::new("2023-01-01T08:00:00", "2023-01-01T08:15:00", 100, 200).amount(12.0),
        Trip::new("2023-01-01T09:30:00", "2023-01-01T09:00:00", 200, 100).amount(500.0),
    ]);

    let outcome = run_pipeline(&catalog, &test_config(), RunOptions::default()).expect("run");

    assert_eq!(outcome.derived.height(), 2);
    assert_eq!(
        f64_values(&outcome.derived, "trip_duration_minutes"),
        vec![Some(15.0), Some(-30.0)]
    );
    assert_eq!(
        str_values(&outcome.derived, "pickup_zone"),
        vec![Some("Midtown".into()), Some("Astoria".into())]
    );
    assert_eq!(outcome.enriched.height(), 1);
    assert_eq!(outcome.summary.clean.rows_dropped, 1);

    let pairs = &outcome.reports.top_zone_pairs;
    assert_eq!(str_values(pairs, "pickup_zone"), vec![Some("Midtown".into())]);
    assert_eq!(i64_values(pairs, "trip_count"), vec![Some(1)]);

    let fares = &outcome.reports.mean_fare_by_borough;
    assert_eq!(str_values(fares, "pickup_borough"), vec![Some("Manhattan".into())]);
    assert_eq!(f64_values(fares, "mean_total_amount"), vec![Some(12.0)]);
}

#[test]
fn unknown_borough_rows_stay_in_the_table_but_not_in_the_fare_report() {
    let catalog = seeded_catalog(&[
        Trip::new("2023-01-01T08:00:00", "2023-01-01T08:15:00", 264, 200).amount(40.0),
        Trip::new("2023-01-01T08:00:00", "2023-01-01T08:15:00", 100, 200).amount(10.0),
    ]);

    let outcome = run_pipeline(&catalog, &test_config(), RunOptions::default()).expect("run");

    assert_eq!(
        str_values(&outcome.enriched, "pickup_borough"),
        vec![Some("Unknown".into()), Some("Manhattan".into())]
    );
    assert_eq!(
        str_values(&outcome.reports.mean_fare_by_borough, "pickup_borough"),
        vec![Some("Manhattan".into())]
    );
}

#[test]
fn running_twice_on_identical_inputs_is_idempotent() {
    let trips = [
        Trip::new("2023-01-01T08:00:00", "2023-01-01T08:15:00", 100, 200),
        Trip::new("2023-01-02T18:20:00", "2023-01-02T18:47:13", 200, 7),
        Trip::new("2023-01-03T03:00:00", "2023-01-03T02:00:00", 100, 100),
    ];
    let catalog = seeded_catalog(&trips);
    let config = test_config();

    let first = run_pipeline(&catalog, &config, RunOptions::default()).expect("first run");
    let first_table = catalog.read_table("trips_enriched").expect("first table");
    let second = run_pipeline(&catalog, &config, RunOptions::default()).expect("second run");
    let second_table = catalog.read_table("trips_enriched").expect("second table");

    assert!(first_table.equals_missing(&second_table));
    assert_eq!(
        first.summary.publish.expect("first receipt").fingerprint,
        second.summary.publish.expect("second receipt").fingerprint
    );
}

#[test]
fn overwrite_replaces_previous_contents() {
    let catalog = seeded_catalog(&[
        Trip::new("2023-01-01T08:00:00", "2023-01-01T08:15:00", 100, 200),
        Trip::new("2023-01-01T09:00:00", "2023-01-01T09:15:00", 200, 100),
        Trip::new("2023-01-01T10:00:00", "2023-01-01T10:15:00", 100, 100),
    ]);
    let config = test_config();
    run_pipeline(&catalog, &config, RunOptions::default()).expect("first run");
    assert_eq!(catalog.read_table("trips_enriched").unwrap().height(), 3);

    catalog
        .insert_table(
            "trips",
            trips_frame(&[Trip::new("2023-01-05T12:00:00", "2023-01-05T12:30:00", 200, 200)]),
        )
        .expect("replace trips");
    run_pipeline(&catalog, &config, RunOptions::default()).expect("second run");

    let output = catalog.read_table("trips_enriched").unwrap();
    assert_eq!(output.height(), 1);
    assert_eq!(str_values(&output, "weekday"), vec![Some("Thu".into())]);
}

#[test]
fn missing_input_aborts_before_publishing() {
    let catalog = Catalog::in_memory();
    catalog.insert_table("zones", zones_frame()).unwrap();

    let err = run_pipeline(&catalog, &test_config(), RunOptions::default()).unwrap_err();

    assert!(matches!(err, PipelineError::InputNotFound { ref relation } if relation == "trips"));
    assert!(!catalog.table_exists("trips_enriched").unwrap());
}

#[test]
fn schema_mismatch_leaves_previous_output_untouched() {
    let catalog = seeded_catalog(&[Trip::new("2023-01-01T08:00:00", "2023-01-01T08:15:00", 100, 200)]);
    let config = test_config();
    run_pipeline(&catalog, &config, RunOptions::default()).expect("first run");

    let broken = trips_frame(&[Trip::new("2023-01-01T08:00:00", "2023-01-01T08:15:00", 100, 200)])
        .drop("total_amount")
        .unwrap();
    catalog.insert_table("trips", broken).unwrap();

    let err = run_pipeline(&catalog, &config, RunOptions::default()).unwrap_err();
    assert!(matches!(err, PipelineError::SchemaMismatch { .. }));
    assert_eq!(catalog.read_table("trips_enriched").unwrap().height(), 1);
}

#[test]
fn dry_run_does_not_publish() {
    let catalog = seeded_catalog(&[Trip::new("2023-01-01T08:00:00", "2023-01-01T08:15:00", 100, 200)]);

    let outcome = run_pipeline(
        &catalog,
        &test_config(),
        RunOptions { dry_run: true },
    )
    .expect("run");

    assert!(outcome.summary.publish.is_none());
    assert_eq!(outcome.reports.top_zone_pairs.height(), 1);
    assert!(!catalog.table_exists("trips_enriched").unwrap());
}

#[test]
fn local_catalog_round_trip_with_csv_zone_lookup() {
    let dir = tempfile::tempdir().expect("tempdir");
    let root = dir.path();
    fs::create_dir_all(root.join("workspace/default")).unwrap();
    fs::write(
        root.join("workspace/default/taxi_zone_lookup.csv"),
        "LocationID,Borough,Zone,service_zone\n\
         100,Manhattan,Midtown,Yellow Zone\n\
         200,Queens,Astoria,Boro Zone\n\
         264,Unknown,NV,N/A\n",
    )
    .unwrap();

    let catalog = Catalog::local(root);
    catalog
        .insert_table(
            "workspace.default.yellow_tripdata_2023_01",
            trips_frame(&[
                Trip::new("2023-01-01T08:00:00", "2023-01-01T08:15:00", 100, 200),
                Trip::new("2023-01-01T08:30:00", "2023-01-01T08:45:00", 200, 264),
            ]),
        )
        .unwrap();

    let mut config = test_config();
    config.inputs = Default::default();
    config.output.table = "corridas_nyc_enriquecidas".to_string();

    let outcome = run_pipeline(&catalog, &config, RunOptions::default()).expect("run");
    assert_eq!(outcome.enriched.height(), 2);
    assert!(root.join("corridas_nyc_enriquecidas.parquet").is_file());

    let staging_left: Vec<_> = fs::read_dir(root)
        .unwrap()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().contains(".staging-"))
        .collect();
    assert!(staging_left.is_empty());

    let reports = run_reports(&catalog, &config).expect("reports");
    assert_eq!(reports.top_zone_pairs.height(), 2);
    assert_eq!(
        str_values(&reports.mean_fare_by_borough, "pickup_borough"),
        vec![Some("Manhattan".into()), Some("Queens".into())]
    );
}

#[test]
fn failed_local_overwrite_reports_overwrite_failure_and_cleans_staging() {
    let dir = tempfile::tempdir().expect("tempdir");
    let root = dir.path();
    // A directory squatting on the target path makes the final rename fail.
    fs::create_dir_all(root.join("blocked.parquet/inner")).unwrap();

    let catalog = Catalog::local(root);
    let df = df!["a" => &[1i64, 2, 3]].unwrap();

    let err = overwrite_table(&catalog, "blocked", &df).unwrap_err();
    assert!(matches!(err, PipelineError::OverwriteFailure { ref table, .. } if table == "blocked"));

    let names: Vec<String> = fs::read_dir(root)
        .unwrap()
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["blocked.parquet".to_string()]);
    assert!(root.join("blocked.parquet/inner").is_dir());
}

#[test]
fn invalid_output_name_is_rejected() {
    let catalog = Catalog::in_memory();
    let df = df!["a" => &[1i64]].unwrap();

    assert!(matches!(
        overwrite_table(&catalog, "../escape", &df),
        Err(PipelineError::InvalidRelationName { .. })
    ));
}
