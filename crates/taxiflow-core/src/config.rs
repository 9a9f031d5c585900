use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

pub const CATALOG_ROOT_ENV: &str = "TAXIFLOW_CATALOG_ROOT";
pub const OUTPUT_TABLE_ENV: &str = "TAXIFLOW_OUTPUT_TABLE";

/// Run configuration, normally read from `taxiflow.toml`.
///
/// Every key has a default so an empty file (or no file at all) describes the
/// stock NYC yellow-taxi run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub catalog: CatalogConfig,
    pub inputs: InputsConfig,
    pub output: OutputConfig,
    pub reports: ReportsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub root: PathBuf,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("warehouse"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputsConfig {
    pub trips: String,
    pub zones: String,
}

impl Default for InputsConfig {
    fn default() -> Self {
        Self {
            trips: "workspace.default.yellow_tripdata_2023_01".to_string(),
            zones: "workspace.default.taxi_zone_lookup".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub table: String,
    pub view: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            table: "corridas_nyc_enriquecidas".to_string(),
            view: "vw_corridas_nyc".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportsConfig {
    pub top_zone_pairs_limit: u32,
    pub excluded_borough: String,
}

impl Default for ReportsConfig {
    fn default() -> Self {
        Self {
            top_zone_pairs_limit: 10,
            excluded_borough: "Unknown".to_string(),
        }
    }
}

impl PipelineConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|err| PipelineError::Config(err.to_string()))
    }

    /// Reads the file when it exists; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Applies `TAXIFLOW_CATALOG_ROOT` and `TAXIFLOW_OUTPUT_TABLE` on top of the file values.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(
            std::env::var(CATALOG_ROOT_ENV).ok(),
            std::env::var(OUTPUT_TABLE_ENV).ok(),
        )
    }

    fn with_overrides(mut self, root: Option<String>, table: Option<String>) -> Self {
        if let Some(root) = root.filter(|value| !value.is_empty()) {
            self.catalog.root = PathBuf::from(root);
        }
        if let Some(table) = table.filter(|value| !value.is_empty()) {
            self.output.table = table;
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.output.table.trim().is_empty() {
            return Err(PipelineError::Config("output.table must not be empty".into()));
        }
        if self.output.view.trim().is_empty() {
            return Err(PipelineError::Config("output.view must not be empty".into()));
        }
        if self.reports.top_zone_pairs_limit == 0 {
            return Err(PipelineError::Config(
                "reports.top_zone_pairs_limit must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
