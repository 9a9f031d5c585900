use std::collections::HashMap;

use polars::prelude::DataFrame;
use tracing::debug;

use crate::error::{PipelineError, Result};

/// Holds temporary, non-persisted views for the lifetime of a run.
#[derive(Debug, Default)]
pub struct Session {
    views: HashMap<String, DataFrame>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `df` under `name`, replacing any view already registered there.
    pub fn register_view(&mut self, name: &str, df: DataFrame) {
        let replaced = self.views.insert(name.to_string(), df).is_some();
        debug!(view = name, replaced, "registered view");
    }

    pub fn view(&self, name: &str) -> Result<&DataFrame> {
        self.views.get(name).ok_or_else(|| PipelineError::ViewNotFound {
            name: name.to_string(),
        })
    }
}
