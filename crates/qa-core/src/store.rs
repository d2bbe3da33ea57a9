use crate::error::Result;
use crate::io::atomic_write;
use crate::paths;
use crate::record::{Layer, RunRecord};
use crate::snapshot::{self, LayerAggregate, MetricsSnapshot};
use crate::status::PipelineStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

// ---------------------------------------------------------------------------
// On-disk metrics file
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct MetricsFile {
    #[serde(default = "default_version")]
    version: u32,
    #[serde(default)]
    history: Vec<RunRecord>,
    /// Derived convenience totals, rewritten on every append so external
    /// dashboards can read them without replaying the history. Never trusted
    /// on load; [`MetricsStore::snapshot`] always recomputes.
    #[serde(default)]
    summary: BTreeMap<u8, LayerAggregate>,
}

fn default_version() -> u32 {
    1
}

// ---------------------------------------------------------------------------
// HistoryFilter
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct HistoryFilter {
    pub layer: Option<Layer>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl HistoryFilter {
    pub fn layer(mut self, layer: Layer) -> Self {
        self.layer = Some(layer);
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    fn matches(&self, record: &RunRecord) -> bool {
        if let Some(layer) = self.layer {
            if record.layer != layer {
                return false;
            }
        }
        match (record.timestamp, self.since, self.until) {
            (None, None, None) => true,
            // Time-filtered queries can't match a record with no timestamp.
            (None, _, _) => false,
            (Some(ts), since, until) => {
                since.is_none_or(|s| ts >= s) && until.is_none_or(|u| ts <= u)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// MetricsStore
// ---------------------------------------------------------------------------

/// Durable append-only history of run records plus the singular pipeline
/// status, one store per project root.
///
/// Failure semantics: a write failure is the only fatal condition
/// (`QaError::Persistence`). Read failures (missing file, malformed JSON)
/// degrade to defaults and are never surfaced as errors.
pub struct MetricsStore {
    root: PathBuf,
}

impl MetricsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Append one record, assigning the current instant when the record
    /// carries no timestamp. Returns the record as persisted. The file is
    /// rewritten atomically, so either the whole record lands or nothing
    /// does.
    pub fn append(&self, mut record: RunRecord) -> Result<RunRecord> {
        if record.timestamp.is_none() {
            record.timestamp = Some(Utc::now());
        }
        let mut file = self.load_metrics_file();
        file.history.push(record.clone());
        self.write_metrics_file(&mut file)?;
        debug!(layer = record.layer.number(), passed = record.passed, "run appended");
        Ok(record)
    }

    /// Append a batch in one read-rewrite cycle. Used by the seed generator.
    pub fn append_many(&self, records: Vec<RunRecord>) -> Result<usize> {
        let mut file = self.load_metrics_file();
        let count = records.len();
        for mut record in records {
            if record.timestamp.is_none() {
                record.timestamp = Some(Utc::now());
            }
            file.history.push(record);
        }
        self.write_metrics_file(&mut file)?;
        Ok(count)
    }

    /// Lazy, restartable pass over the stored history in insertion order.
    /// Each call re-reads the file, so concurrent appends from the same
    /// process are visible on the next call.
    pub fn history(&self, filter: HistoryFilter) -> impl Iterator<Item = RunRecord> {
        self.load_metrics_file()
            .history
            .into_iter()
            .filter(move |r| filter.matches(r))
    }

    /// Recompute the long-horizon snapshot from the full history.
    pub fn snapshot(&self) -> MetricsSnapshot {
        snapshot::compute(&self.load_metrics_file().history)
    }

    /// Load the pipeline status, defaulting to `not-started` when the file
    /// is absent or unparseable. Corrupt state means "start fresh", never a
    /// fatal error.
    pub fn load_status(&self) -> PipelineStatus {
        let path = paths::status_path(&self.root);
        let data = match std::fs::read_to_string(&path) {
            Ok(data) => data,
            Err(_) => return PipelineStatus::default(),
        };
        match serde_json::from_str::<PipelineStatus>(&data) {
            Ok(mut status) => {
                // Stored `overall` is advisory; the derived value wins.
                status.recompute();
                status
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "corrupt status file, starting fresh");
                PipelineStatus::default()
            }
        }
    }

    pub fn save_status(&self, status: &PipelineStatus) -> Result<()> {
        let path = paths::status_path(&self.root);
        let data = serde_json::to_vec_pretty(status)?;
        atomic_write(&path, &data)
    }

    // ---------------------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------------------

    fn load_metrics_file(&self) -> MetricsFile {
        let path = paths::metrics_path(&self.root);
        let data = match std::fs::read_to_string(&path) {
            Ok(data) => data,
            Err(_) => return MetricsFile::default(),
        };
        match serde_json::from_str(&data) {
            Ok(file) => file,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "corrupt metrics file, starting fresh");
                MetricsFile::default()
            }
        }
    }

    fn write_metrics_file(&self, file: &mut MetricsFile) -> Result<()> {
        file.version = 1;
        file.summary = snapshot::compute(&file.history).layers;
        let data = serde_json::to_vec_pretty(file)?;
        atomic_write(&paths::metrics_path(&self.root), &data)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
