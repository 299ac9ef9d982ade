//! Compressed tabular output.
//!
//! Each table is a gzip-compressed CSV with a header row
//! `user_id,item_id,<value column>`. Ids are written as text, values as
//! floats. Files are written to a sibling temp path and renamed into place,
//! so a reader never sees a partial table.

use crate::top_n::TopNTable;
use anyhow::{Context, Result, bail};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const CONTENT_TABLE_FILE: &str = "content_top_n.csv.gz";
pub const COLLABORATIVE_TABLE_FILE: &str = "collab_top_n.csv.gz";
pub const TOP_RATED_TABLE_FILE: &str = "user_top_rated.csv.gz";

pub const SCORE_COLUMN: &str = "score";
pub const RATING_COLUMN: &str = "rating";

/// One output row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    pub user_id: String,
    pub item_id: String,
    pub value: f64,
}

impl TableRow {
    pub fn new(user_id: impl ToString, item_id: impl ToString, value: f64) -> Self {
        Self {
            user_id: user_id.to_string(),
            item_id: item_id.to_string(),
            value,
        }
    }
}

/// Rows of a ranked table, user by user in rank order
pub fn rows_from_table(table: &TopNTable) -> Vec<TableRow> {
    table
        .rows()
        .map(|e| TableRow::new(e.user_id, e.item_id, e.score))
        .collect()
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Create the parent directory and return the temp path to write into
fn stage(path: &Path) -> Result<PathBuf> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory {}", parent.display()))?;
    }
    Ok(temp_path(path))
}

/// Move a fully written temp file over the final path
fn commit(tmp: &Path, path: &Path) -> Result<()> {
    fs::rename(tmp, path).with_context(|| format!("Failed to move {} into place", path.display()))
}

/// Write raw bytes with the same temp-then-rename discipline as the tables
pub fn write_file_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let tmp = stage(path)?;
    fs::write(&tmp, contents).with_context(|| format!("Failed to write {}", tmp.display()))?;
    commit(&tmp, path)
}

/// Write rows as a gzip CSV with the given value column name
pub fn write_table(path: &Path, value_column: &str, rows: &[TableRow]) -> Result<()> {
    let tmp = stage(path)?;
    let file = File::create(&tmp)
        .with_context(|| format!("Failed to create {}", tmp.display()))?;
    let encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
    let mut writer = csv::Writer::from_writer(encoder);

    writer.write_record(["user_id", "item_id", value_column])?;
    for row in rows {
        writer.write_record([
            row.user_id.as_str(),
            row.item_id.as_str(),
            row.value.to_string().as_str(),
        ])?;
    }

    let encoder = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to flush {}: {}", tmp.display(), e.error()))?;
    encoder
        .finish()
        .with_context(|| format!("Failed to finish compression of {}", tmp.display()))?
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to flush {}: {}", tmp.display(), e.error()))?
        .sync_all()?;

    commit(&tmp, path)?;
    info!("Wrote {} rows to {}", rows.len(), path.display());
    Ok(())
}

/// Convenience wrapper for ranked tables
pub fn write_top_n(path: &Path, value_column: &str, table: &TopNTable) -> Result<()> {
    write_table(path, value_column, &rows_from_table(table))
}

/// Read a table back; returns the value column name and the rows
pub fn read_table(path: &Path) -> Result<(String, Vec<TableRow>)> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut reader = csv::Reader::from_reader(GzDecoder::new(BufReader::new(file)));

    let headers = reader
        .headers()
        .with_context(|| format!("Failed to read header of {}", path.display()))?
        .clone();
    if headers.len() != 3 || &headers[0] != "user_id" || &headers[1] != "item_id" {
        bail!(
            "Unexpected header in {}: {:?}",
            path.display(),
            headers.iter().collect::<Vec<_>>()
        );
    }
    let value_column = headers[2].to_string();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.with_context(|| format!("Malformed row in {}", path.display()))?;
        let value: f64 = record[2]
            .parse()
            .with_context(|| format!("Invalid {} value {:?}", value_column, &record[2]))?;
        rows.push(TableRow::new(&record[0], &record[1], value));
    }
    debug!("Read {} rows from {}", rows.len(), path.display());
    Ok((value_column, rows))
}
