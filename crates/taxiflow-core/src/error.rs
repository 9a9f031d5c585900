// crates/taxiflow-core/src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("relation not found: {relation}")]
    InputNotFound { relation: String },

    #[error("input schema mismatch in {relation}.{column}: {reason}")]
    SchemaMismatch {
        relation: String,
        column: String,
        reason: String,
    },

    #[error("zone lookup key {location_id} appears more than once")]
    DuplicateLookupKey { location_id: i64 },

    #[error("failed to overwrite table {table}: {source}")]
    OverwriteFailure {
        table: String,
        #[source]
        source: Box<PipelineError>,
    },

    #[error("view not found: {name}")]
    ViewNotFound { name: String },

    #[error("invalid relation name '{name}'")]
    InvalidRelationName { name: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars operation failed: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("JSON serialization/deserialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    pub(crate) fn schema_mismatch(
        relation: &str,
        column: &str,
        reason: impl Into<String>,
    ) -> Self {
        PipelineError::SchemaMismatch {
            relation: relation.to_string(),
            column: column.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn overwrite_failure(table: &str, source: PipelineError) -> Self {
        PipelineError::OverwriteFailure {
            table: table.to_string(),
            source: Box::new(source),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
