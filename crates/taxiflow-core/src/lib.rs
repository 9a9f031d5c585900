pub mod catalog;
pub mod config;
pub mod enrich;
pub mod error;
pub mod features;
pub mod loader;
pub mod pipeline;
pub mod publish;
pub mod reports;
pub mod schema;
pub mod session;

pub use catalog::Catalog;
pub use config::PipelineConfig;
pub use error::{PipelineError, Result};
pub use pipeline::{run_pipeline, run_reports, ReportSet, RunOptions, RunOutcome, RunSummary};
pub use session::Session;
