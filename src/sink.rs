//! Snapshot persistence
//!
//! Every flush writes the *whole* result set accumulated so far, never a delta. The
//! file for a run-day is replaced atomically (write to a temporary sibling, then
//! rename), so a later flush overwrites an earlier one and a flush that fails midway
//! leaves the previous snapshot intact.
//!
//! Layout: `{results_dir}/{run_id}/{YYYY-MM-DD}.csv`

use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use std::path::PathBuf;
use tracing::debug;

use crate::error::{Error, Result};
use crate::types::{CanonicalRecord, RunId, SearchTarget};

/// Destination for result-set snapshots
#[async_trait]
pub trait SnapshotSink: Send + Sync {
    /// Persist a complete snapshot of `records` for this run
    ///
    /// Returns the location written. Later calls for the same run-day replace
    /// earlier ones.
    async fn write_snapshot(
        &self,
        run_id: &RunId,
        target: SearchTarget,
        records: &[CanonicalRecord],
    ) -> Result<PathBuf>;
}

/// Writes snapshots as CSV files under a results directory
#[derive(Clone, Debug)]
pub struct CsvSnapshotSink {
    results_dir: PathBuf,
}

impl CsvSnapshotSink {
    /// Create a sink rooted at `results_dir`
    pub fn new(results_dir: impl Into<PathBuf>) -> Self {
        Self {
            results_dir: results_dir.into(),
        }
    }

    /// Path of the snapshot for a run on a given day
    pub fn snapshot_path(&self, run_id: &RunId, day: NaiveDate) -> PathBuf {
        self.results_dir
            .join(run_id.as_str())
            .join(format!("{}.csv", day.format("%Y-%m-%d")))
    }
}

#[async_trait]
impl SnapshotSink for CsvSnapshotSink {
    async fn write_snapshot(
        &self,
        run_id: &RunId,
        target: SearchTarget,
        records: &[CanonicalRecord],
    ) -> Result<PathBuf> {
        let path = self.snapshot_path(run_id, Local::now().date_naive());
        let snapshot_err = |reason: String| Error::Snapshot {
            path: path.clone(),
            reason,
        };

        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| snapshot_err(format!("cannot create directory: {e}")))?;
        }

        let body = render_csv(target, records);
        let tmp = path.with_extension("csv.tmp");
        tokio::fs::write(&tmp, body.as_bytes())
            .await
            .map_err(|e| snapshot_err(format!("cannot write temporary file: {e}")))?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(snapshot_err(format!("cannot replace snapshot: {e}")));
        }

        debug!(path = %path.display(), records = records.len(), "Snapshot written");
        Ok(path)
    }
}

/// Render a header row plus one row per record
pub fn render_csv(target: SearchTarget, records: &[CanonicalRecord]) -> String {
    let mut out = String::new();
    push_row(&mut out, target.columns().iter().copied());
    for record in records {
        let cells = record.cells();
        push_row(&mut out, cells.iter().map(String::as_str));
    }
    out
}

fn push_row<'a>(out: &mut String, cells: impl Iterator<Item = &'a str>) {
    for (i, cell) in cells.enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&escape_csv(cell));
    }
    out.push('\n');
}

fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
