//! Statistics snapshot export
//!
//! Writes the per-test statistics to CSV or JSON for offline comparison
//! between sessions.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::info;

use crate::output::formatter::group_by_container;
use crate::results::RunContext;

/// Snapshot file format
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SnapshotFormat {
    Csv,
    Json,
}

impl SnapshotFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "csv" => Some(SnapshotFormat::Csv),
            "json" => Some(SnapshotFormat::Json),
            _ => None,
        }
    }

    pub fn from_extension(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_str)
    }
}

/// One exported row
#[derive(Clone, Debug, Serialize)]
pub struct SnapshotRow {
    pub container: String,
    pub test: String,
    pub pass: u32,
    pub fail: u32,
    pub fail_percent: f64,
    pub max_memory_mb: f64,
    pub avg_memory_mb: f64,
    /// Monitored runs this test appeared in.
    pub samples: usize,
}

/// Collect rows in report display order.
pub fn snapshot_rows(ctx: &RunContext) -> Vec<SnapshotRow> {
    group_by_container(ctx.stats())
        .into_iter()
        .flat_map(|(_, entries)| entries)
        .map(|(id, stats)| SnapshotRow {
            container: id.container.clone(),
            test: id.name.clone(),
            pass: stats.pass,
            fail: stats.fail,
            fail_percent: stats.fail_percent(),
            max_memory_mb: stats.max_memory_mb(),
            avg_memory_mb: stats.avg_memory_mb(),
            samples: stats.memory.len(),
        })
        .collect()
}

/// Write the snapshot; the format follows the file extension, falling back
/// to CSV when the extension is missing or unrecognized.
pub fn write_snapshot(path: &Path, ctx: &RunContext) -> Result<()> {
    let rows = snapshot_rows(ctx);
    let format = SnapshotFormat::from_extension(path).unwrap_or(SnapshotFormat::Csv);

    match format {
        SnapshotFormat::Json => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create snapshot {}", path.display()))?;
            let writer = BufWriter::new(file);
            serde_json::to_writer_pretty(writer, &rows).context("Failed to serialize snapshot")?;
        }
        SnapshotFormat::Csv => {
            let mut writer = csv::Writer::from_path(path)
                .with_context(|| format!("Failed to create snapshot {}", path.display()))?;

            writer.write_record([
                "container",
                "test",
                "pass",
                "fail",
                "fail_percent",
                "max_memory_mb",
                "avg_memory_mb",
                "samples",
            ])?;

            for row in &rows {
                writer.write_record([
                    row.container.clone(),
                    row.test.clone(),
                    row.pass.to_string(),
                    row.fail.to_string(),
                    format!("{:.1}", row.fail_percent),
                    format!("{:.1}", row.max_memory_mb),
                    format!("{:.1}", row.avg_memory_mb),
                    row.samples.to_string(),
                ])?;
            }
            writer.flush()?;
        }
    }

    info!("Snapshot written to {}", path.display());
    Ok(())
}
