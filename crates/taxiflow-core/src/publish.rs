use polars::prelude::DataFrame;
use serde::Serialize;
use tracing::info;

use crate::catalog::{encode_parquet, relation_segments, Catalog};
use crate::error::{PipelineError, Result};

/// What a completed overwrite left in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishReceipt {
    pub table: String,
    pub row_count: usize,
    pub bytes_written: usize,
    /// BLAKE3 digest of the Parquet bytes, hex encoded.
    pub fingerprint: String,
}

/// Replaces the entire contents of `table` with `df`.
///
/// Either the new contents become visible in full or the previous table stays as
/// it was; failures surface as [`PipelineError::OverwriteFailure`].
pub fn overwrite_table(catalog: &Catalog, table: &str, df: &DataFrame) -> Result<PublishReceipt> {
    relation_segments(table)?;

    let mut frame = df.clone();
    let bytes =
        encode_parquet(&mut frame).map_err(|err| PipelineError::overwrite_failure(table, err))?;
    catalog
        .replace_table(table, &frame, &bytes)
        .map_err(|err| PipelineError::overwrite_failure(table, err))?;

    let receipt = PublishReceipt {
        table: table.to_string(),
        row_count: frame.height(),
        bytes_written: bytes.len(),
        fingerprint: blake3::hash(&bytes).to_hex().to_string(),
    };
    info!(
        table = %receipt.table,
        rows = receipt.row_count,
        bytes = receipt.bytes_written,
        fingerprint = %receipt.fingerprint,
        "output table overwritten"
    );

    Ok(receipt)
}
