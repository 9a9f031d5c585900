use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use comfy_table::{presets::UTF8_FULL, Table};
use polars::prelude::{AnyValue, DataFrame};
use taxiflow_core::{
    catalog::Catalog, config::PipelineConfig, pipeline, schema, ReportSet, RunOptions,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "NYC taxi trip enrichment pipeline", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, global = true, default_value = "taxiflow.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load, enrich, clean and publish the trips, then print both reports
    Run(RunArgs),
    /// Print both reports from the previously published output table
    Report,
    /// Print the schema and first rows of a catalog relation
    Inspect(InspectArgs),
}

#[derive(Args, Debug, Default)]
struct RunArgs {
    /// Build the view and reports without overwriting the output table
    #[arg(long)]
    dry_run: bool,
    /// Print this many rows of the joined and derived columns
    #[arg(long, default_value_t = 0)]
    preview_rows: usize,
}

#[derive(Args, Debug)]
struct InspectArgs {
    /// Dotted relation name, e.g. workspace.default.taxi_zone_lookup
    relation: String,
    /// Number of rows to print
    #[arg(long, default_value_t = 10)]
    rows: usize,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.config)?;
    let catalog = Catalog::local(config.catalog.root.clone());

    match cli.command {
        Command::Run(args) => handle_run(&catalog, &config, args),
        Command::Report => handle_report(&catalog, &config),
        Command::Inspect(args) => handle_inspect(&catalog, args),
    }
}

fn load_config(path: &Path) -> Result<PipelineConfig> {
    dotenvy::dotenv().ok();
    let config = PipelineConfig::load(path)
        .with_context(|| format!("failed to load configuration from {}", path.display()))?
        .with_env_overrides();
    info!(
        catalog_root = %config.catalog.root.display(),
        output_table = %config.output.table,
        "configuration loaded"
    );
    Ok(config)
}

fn handle_run(catalog: &Catalog, config: &PipelineConfig, args: RunArgs) -> Result<()> {
    let outcome = pipeline::run_pipeline(
        catalog,
        config,
        RunOptions {
            dry_run: args.dry_run,
        },
    )
    .context("pipeline run failed")?;

    if args.preview_rows > 0 {
        let head = outcome.derived.head(Some(args.preview_rows));
        print_frame(
            "Joined trips",
            &head.select([
                schema::PICKUP_TIME,
                schema::PICKUP_BOROUGH,
                schema::PICKUP_ZONE,
                schema::DROPOFF_BOROUGH,
                schema::DROPOFF_ZONE,
            ])?,
        )?;
        print_frame(
            "Derived features",
            &head.select([
                schema::TRIP_DURATION_MINUTES,
                schema::WEEKDAY,
                schema::HOUR_OF_DAY,
            ])?,
        )?;
    }

    print_reports(&outcome.reports)?;
    println!("{}", serde_json::to_string_pretty(&outcome.summary)?);
    Ok(())
}

fn handle_report(catalog: &Catalog, config: &PipelineConfig) -> Result<()> {
    let reports = pipeline::run_reports(catalog, config).with_context(|| {
        format!(
            "failed to report on output table {}",
            config.output.table
        )
    })?;
    print_reports(&reports)
}

fn handle_inspect(catalog: &Catalog, args: InspectArgs) -> Result<()> {
    let df = catalog
        .read_table(&args.relation)
        .with_context(|| format!("failed to read {}", args.relation))?;

    let mut schema_table = Table::new();
    schema_table.load_preset(UTF8_FULL);
    schema_table.set_header(vec!["column", "dtype"]);
    for column in df.get_columns() {
        schema_table.add_row(vec![column.name().to_string(), column.dtype().to_string()]);
    }
    println!("{} ({} rows)", args.relation, df.height());
    println!("{schema_table}");

    print_frame("Head", &df.head(Some(args.rows)))
}

fn print_reports(reports: &ReportSet) -> Result<()> {
    print_frame("Top zone pairs", &reports.top_zone_pairs)?;
    print_frame("Mean total amount by pickup borough", &reports.mean_fare_by_borough)
}

fn print_frame(title: &str, df: &DataFrame) -> Result<()> {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(
        df.get_column_names()
            .into_iter()
            .map(|name| name.to_string())
            .collect::<Vec<_>>(),
    );

    for idx in 0..df.height() {
        let mut row = Vec::with_capacity(df.width());
        for column in df.get_columns() {
            row.push(format_cell(&column.get(idx)?));
        }
        table.add_row(row);
    }

    println!("{title}");
    println!("{table}");
    Ok(())
}

fn format_cell(value: &AnyValue<'_>) -> String {
    match value {
        AnyValue::Null => "null".to_string(),
        AnyValue::String(text) => text.to_string(),
        AnyValue::StringOwned(text) => text.to_string(),
        other => other.to_string(),
    }
}
