//! Snapshot egress - appends simulation snapshots to file
//!
//! Snapshots are written in JSONL format (one JSON object per line) to the
//! file specified in config. Every line carries the run id so several runs
//! can share one file.

use crate::domain::snapshot::SimulationSnapshot;
use crate::infra::metrics::Metrics;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info};

#[derive(Serialize)]
struct SnapshotLine<'a> {
    run_id: &'a str,
    ts: String,
    #[serde(flatten)]
    snapshot: &'a SimulationSnapshot,
}

/// Egress writer for snapshots
pub struct SnapshotEgress {
    file_path: String,
    run_id: String,
    metrics: Arc<Metrics>,
}

impl SnapshotEgress {
    pub fn new(file_path: &str, metrics: Arc<Metrics>) -> Self {
        let run_id = uuid::Uuid::now_v7().to_string();
        info!(file_path = %file_path, run_id = %run_id, "egress_initialized");
        Self { file_path: file_path.to_string(), run_id, metrics }
    }

    #[inline]
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Write one snapshot to the egress file
    /// Returns true if successful, false otherwise
    pub fn write_snapshot(&self, snapshot: &SimulationSnapshot) -> bool {
        let line = SnapshotLine {
            run_id: &self.run_id,
            ts: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            snapshot,
        };

        let result = serde_json::to_string(&line)
            .map_err(std::io::Error::other)
            .and_then(|json| self.append_line(&json));

        match result {
            Ok(()) => {
                self.metrics.record_egress(true);
                true
            }
            Err(e) => {
                self.metrics.record_egress(false);
                error!(tick = %snapshot.tick, error = %e, "snapshot_egress_failed");
                false
            }
        }
    }

    /// Append a line to the egress file
    fn append_line(&self, line: &str) -> std::io::Result<()> {
        let path = Path::new(&self.file_path);

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new().create(true).append(true).open(path)?;

        writeln!(file, "{}", line)?;
        debug!(file = %self.file_path, bytes = %line.len(), "egress_written");

        Ok(())
    }
}
