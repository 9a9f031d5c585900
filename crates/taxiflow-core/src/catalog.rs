//! Named-relation store the pipeline reads its inputs from and publishes into.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use polars::io::parquet::write::{ParquetCompression, ParquetWriter, StatisticsOptions};
use polars::prelude::*;
use tracing::debug;
use uuid::Uuid;

use crate::error::{PipelineError, Result};

#[derive(Debug, Clone)]
pub struct Catalog {
    inner: CatalogKind,
}

#[derive(Debug, Clone)]
enum CatalogKind {
    /// Relations are files under a root directory, one directory per name segment.
    Local { root: PathBuf },
    Memory {
        tables: Arc<RwLock<HashMap<String, DataFrame>>>,
    },
}

impl Catalog {
    pub fn local(root: impl Into<PathBuf>) -> Self {
        Catalog {
            inner: CatalogKind::Local { root: root.into() },
        }
    }

    pub fn in_memory() -> Self {
        Catalog {
            inner: CatalogKind::Memory {
                tables: Arc::new(RwLock::new(HashMap::new())),
            },
        }
    }

    pub fn read_table(&self, name: &str) -> Result<DataFrame> {
        let segments = relation_segments(name)?;
        match &self.inner {
            CatalogKind::Local { root } => {
                let parquet = table_path(root, &segments, "parquet");
                if parquet.is_file() {
                    debug!(relation = name, path = %parquet.display(), "reading parquet relation");
                    let file = File::open(&parquet)?;
                    return Ok(ParquetReader::new(file).finish()?);
                }

                let csv = table_path(root, &segments, "csv");
                if csv.is_file() {
                    debug!(relation = name, path = %csv.display(), "reading csv relation");
                    let file = File::open(&csv)?;
                    let df = CsvReadOptions::default()
                        .with_has_header(true)
                        .map_parse_options(|opts| opts.with_try_parse_dates(true))
                        .into_reader_with_file_handle(file)
                        .finish()?;
                    return Ok(df);
                }

                Err(PipelineError::InputNotFound {
                    relation: name.to_string(),
                })
            }
            CatalogKind::Memory { tables } => {
                let guard = tables.read().map_err(|_| poisoned())?;
                guard
                    .get(&segments.join("."))
                    .cloned()
                    .ok_or_else(|| PipelineError::InputNotFound {
                        relation: name.to_string(),
                    })
            }
        }
    }

    pub fn table_exists(&self, name: &str) -> Result<bool> {
        let segments = relation_segments(name)?;
        match &self.inner {
            CatalogKind::Local { root } => Ok(table_path(root, &segments, "parquet").is_file()
                || table_path(root, &segments, "csv").is_file()),
            CatalogKind::Memory { tables } => {
                let guard = tables.read().map_err(|_| poisoned())?;
                Ok(guard.contains_key(&segments.join(".")))
            }
        }
    }

    /// Registers a relation directly; used to seed in-memory catalogs.
    pub fn insert_table(&self, name: &str, df: DataFrame) -> Result<()> {
        let segments = relation_segments(name)?;
        match &self.inner {
            CatalogKind::Local { .. } => {
                let mut df = df;
                let bytes = encode_parquet(&mut df)?;
                self.replace_table(name, &df, &bytes)
            }
            CatalogKind::Memory { tables } => {
                let mut guard = tables.write().map_err(|_| poisoned())?;
                guard.insert(segments.join("."), df);
                Ok(())
            }
        }
    }

    /// Replaces the whole relation. Readers observe either the previous contents or
    /// the new ones, never a partially written table.
    pub(crate) fn replace_table(&self, name: &str, df: &DataFrame, parquet: &[u8]) -> Result<()> {
        let segments = relation_segments(name)?;
        match &self.inner {
            CatalogKind::Local { root } => {
                let target = table_path(root, &segments, "parquet");
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent)?;
                }
                let staging = staging_path(&target);
                if let Err(err) = write_then_rename(&staging, &target, parquet) {
                    let _ = fs::remove_file(&staging);
                    return Err(err.into());
                }
                debug!(relation = name, path = %target.display(), "table replaced");
                Ok(())
            }
            CatalogKind::Memory { tables } => {
                let mut guard = tables.write().map_err(|_| poisoned())?;
                guard.insert(segments.join("."), df.clone());
                Ok(())
            }
        }
    }
}

/// Splits a dotted relation name such as `workspace.default.trips` into its segments.
pub fn relation_segments(name: &str) -> Result<Vec<&str>> {
    let segments: Vec<&str> = name.split('.').collect();
    let valid = segments.iter().all(|segment| {
        !segment.is_empty()
            && segment
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    });
    if valid {
        Ok(segments)
    } else {
        Err(PipelineError::InvalidRelationName {
            name: name.to_string(),
        })
    }
}

pub(crate) fn encode_parquet(df: &mut DataFrame) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    ParquetWriter::new(&mut buffer)
        .with_compression(ParquetCompression::Zstd(None))
        .with_statistics(StatisticsOptions::default())
        .finish(df)?;
    Ok(buffer)
}

fn table_path(root: &Path, segments: &[&str], extension: &str) -> PathBuf {
    let mut path = root.to_path_buf();
    for segment in segments {
        path.push(segment);
    }
    path.set_extension(extension);
    path
}

fn staging_path(target: &Path) -> PathBuf {
    let file_name = target
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    target.with_file_name(format!(".{file_name}.staging-{}", Uuid::new_v4()))
}

fn write_then_rename(staging: &Path, target: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(staging)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    drop(file);
    fs::rename(staging, target)
}

fn poisoned() -> PipelineError {
    PipelineError::Io(std::io::Error::other("in-memory catalog lock poisoned"))
}
