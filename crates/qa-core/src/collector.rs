use crate::error::Result;
use crate::record::{CodeRabbitFindings, Layer, QuinnFindings, RunMetadata, RunRecord};
use crate::store::MetricsStore;

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// A layer-agnostic "check finished" event.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub passed: bool,
    pub duration_ms: u64,
    pub findings_count: u64,
    pub metadata: RunMetadata,
}

/// Layer-2 variant carrying optional reviewer sub-records.
#[derive(Debug, Clone)]
pub struct PrReviewOutcome {
    pub passed: bool,
    pub duration_ms: u64,
    /// Explicit count, only consulted when no CodeRabbit sub-record exists.
    pub findings_count: Option<u64>,
    pub coderabbit: Option<CodeRabbitFindings>,
    pub quinn: Option<QuinnFindings>,
    pub metadata: RunMetadata,
}

// ---------------------------------------------------------------------------
// MetricsCollector
// ---------------------------------------------------------------------------

/// Translates check-finished events into normalized run records and appends
/// them. Every call appends exactly one record or nothing at all.
pub struct MetricsCollector<'a> {
    store: &'a MetricsStore,
}

impl<'a> MetricsCollector<'a> {
    pub fn new(store: &'a MetricsStore) -> Self {
        Self { store }
    }

    /// Record one run of `layer_number`. The layer is re-validated here as a
    /// contract boundary even when callers have already checked it; an
    /// invalid layer appends nothing.
    pub fn record_run(&self, layer_number: u8, outcome: RunOutcome) -> Result<RunRecord> {
        let layer = Layer::try_from(layer_number)?;
        let record = RunRecord {
            layer,
            timestamp: None,
            passed: outcome.passed,
            duration_ms: outcome.duration_ms,
            findings_count: outcome.findings_count,
            metadata: outcome.metadata,
            coderabbit: None,
            quinn: None,
        };
        self.store.append(record)
    }

    /// Record a layer-2 PR review run.
    ///
    /// Findings-count precedence is first-present-wins: the CodeRabbit count
    /// if that sub-record exists, else the explicit count, else 0. Sources
    /// are never summed, since both reviewers may report overlapping
    /// findings.
    pub fn record_pr_review(&self, outcome: PrReviewOutcome) -> Result<RunRecord> {
        let findings_count = outcome
            .coderabbit
            .as_ref()
            .map(CodeRabbitFindings::findings_count)
            .or(outcome.findings_count)
            .unwrap_or(0);
        let record = RunRecord {
            layer: Layer::Two,
            timestamp: None,
            passed: outcome.passed,
            duration_ms: outcome.duration_ms,
            findings_count,
            metadata: outcome.metadata,
            coderabbit: outcome.coderabbit,
            quinn: outcome.quinn,
        };
        self.store.append(record)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
