//! Loaded → Joined → Cleaned → Published, once per run.
//!
//! Any stage error returns immediately. The output table is only touched by the
//! last stage, so a failed run never leaves a partial table behind.

use chrono::{DateTime, Utc};
use polars::prelude::DataFrame;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::catalog::Catalog;
use crate::config::PipelineConfig;
use crate::enrich::{self, JoinStats};
use crate::error::Result;
use crate::features::{self, CleanStats};
use crate::loader;
use crate::publish::{self, PublishReceipt};
use crate::reports;
use crate::session::Session;

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Build the view and reports but leave the output table untouched.
    pub dry_run: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub trips_relation: String,
    pub zones_relation: String,
    pub input_rows: usize,
    pub zone_rows: usize,
    pub output_rows: usize,
    pub join: JoinStats,
    pub clean: CleanStats,
    pub dry_run: bool,
    pub publish: Option<PublishReceipt>,
}

#[derive(Debug, Clone)]
pub struct ReportSet {
    pub top_zone_pairs: DataFrame,
    pub mean_fare_by_borough: DataFrame,
}

#[derive(Debug)]
pub struct RunOutcome {
    /// Session holding the enriched trips under the configured view name.
    pub session: Session,
    /// Joined trips with derived columns, before the duration/distance filter.
    pub derived: DataFrame,
    /// Rows that passed the filter; this is what gets published.
    pub enriched: DataFrame,
    pub reports: ReportSet,
    pub summary: RunSummary,
}

pub fn run_pipeline(
    catalog: &Catalog,
    config: &PipelineConfig,
    options: RunOptions,
) -> Result<RunOutcome> {
    config.validate()?;
    let run_id = Uuid::new_v4();
    let started_at = Utc::now();
    info!(%run_id, dry_run = options.dry_run, "pipeline run started");

    let inputs = loader::load_inputs(catalog, &config.inputs)?;
    let (joined, join_stats) = enrich::enrich_trips(&inputs.trips, &inputs.zones)?;
    let derived = features::derive_features(&joined)?;
    let (enriched, clean_stats) = features::clean_trips(&derived)?;

    let mut session = Session::new();
    session.register_view(&config.output.view, enriched.clone());
    let reports = run_view_reports(&session, config)?;

    let publish = if options.dry_run {
        info!(table = %config.output.table, "dry run, output table left untouched");
        None
    } else {
        Some(publish::overwrite_table(
            catalog,
            &config.output.table,
            &enriched,
        )?)
    };

    let summary = RunSummary {
        run_id,
        started_at,
        finished_at: Utc::now(),
        trips_relation: config.inputs.trips.clone(),
        zones_relation: config.inputs.zones.clone(),
        input_rows: inputs.trips.height(),
        zone_rows: inputs.zones.height(),
        output_rows: enriched.height(),
        join: join_stats,
        clean: clean_stats,
        dry_run: options.dry_run,
        publish,
    };
    info!(%run_id, output_rows = summary.output_rows, "pipeline run finished");

    Ok(RunOutcome {
        session,
        derived,
        enriched,
        reports,
        summary,
    })
}

/// Runs both reports against the persisted output table of an earlier run.
pub fn run_reports(catalog: &Catalog, config: &PipelineConfig) -> Result<ReportSet> {
    config.validate()?;
    let table = catalog.read_table(&config.output.table)?;
    info!(table = %config.output.table, rows = table.height(), "loaded output table for reporting");

    let mut session = Session::new();
    session.register_view(&config.output.view, table);
    run_view_reports(&session, config)
}

fn run_view_reports(session: &Session, config: &PipelineConfig) -> Result<ReportSet> {
    let view = &config.output.view;
    Ok(ReportSet {
        top_zone_pairs: reports::top_zone_pairs(
            session,
            view,
            config.reports.top_zone_pairs_limit,
        )?,
        mean_fare_by_borough: reports::mean_fare_by_borough(
            session,
            view,
            &config.reports.excluded_borough,
        )?,
    })
}
