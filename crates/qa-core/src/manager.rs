use crate::check;
use crate::collector::{MetricsCollector, PrReviewOutcome, RunOutcome};
use crate::config::GateConfig;
use crate::error::Result;
use crate::io::atomic_write;
use crate::paths;
use crate::record::{Layer, RunMetadata, RunRecord};
use crate::status::{LayerStatus, PipelineStatus, Signoff, SubCheckResult};
use crate::store::MetricsStore;
use chrono::Utc;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

// ---------------------------------------------------------------------------
// RunContext
// ---------------------------------------------------------------------------

/// Per-invocation options for gate execution, constructed once by the CLI
/// and passed down. No scattered default-filling.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub story: Option<String>,
    pub fail_fast: bool,
    pub triggered_by: String,
}

impl Default for RunContext {
    fn default() -> Self {
        Self {
            story: None,
            fail_fast: true,
            triggered_by: "qa-run".to_string(),
        }
    }
}

impl RunContext {
    fn metadata(&self) -> RunMetadata {
        let mut meta = RunMetadata::new(self.triggered_by.clone());
        if let Some(story) = &self.story {
            meta = meta.with("story", story.clone());
        }
        meta
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct LayerRun {
    pub layer: Layer,
    pub pass: bool,
    pub duration_ms: u64,
    pub results: Vec<SubCheckResult>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Passed,
    Pending,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrchestrateResult {
    pub layers: Vec<LayerRun>,
    pub status: RunStatus,
    pub duration_ms: u64,
    pub message: String,
    pub exit_code: i32,
}

// ---------------------------------------------------------------------------
// QualityGateManager
// ---------------------------------------------------------------------------

/// Orchestrates the three quality-gate layers, aggregates their results into
/// the persisted pipeline status, and answers status queries without
/// re-running anything.
///
/// Execution is strictly sequential: sub-checks within a layer may have
/// ordering dependencies, and gate results must be attributable to a single
/// commit without interleaving. Status mutations stay in memory until an
/// explicit [`QualityGateManager::save_status`]; a crash between run and
/// save loses the update.
pub struct QualityGateManager {
    root: PathBuf,
    config: GateConfig,
    store: MetricsStore,
    status: PipelineStatus,
}

impl QualityGateManager {
    pub fn open(root: &Path) -> Result<Self> {
        let config = GateConfig::load(root)?;
        Ok(Self::with_config(root, config))
    }

    pub fn with_config(root: &Path, config: GateConfig) -> Self {
        let store = MetricsStore::new(root);
        let status = store.load_status();
        Self {
            root: root.to_path_buf(),
            config,
            store,
            status,
        }
    }

    pub fn store(&self) -> &MetricsStore {
        &self.store
    }

    /// Pure read of the last-known pipeline status. Triggers no execution.
    pub fn get_status(&self) -> &PipelineStatus {
        &self.status
    }

    /// Persist the in-memory status. Called explicitly, never automatically.
    pub fn save_status(&self) -> Result<()> {
        self.store.save_status(&self.status)
    }

    // ---------------------------------------------------------------------------
    // Layer execution
    // ---------------------------------------------------------------------------

    /// Run one layer's sub-checks and fold the outcome into the status.
    /// Layer 3 is the human gate: it is never executed, only reported.
    pub fn run_layer(&mut self, layer_number: u8, ctx: &RunContext) -> Result<LayerRun> {
        let layer = Layer::try_from(layer_number)?;
        match layer {
            Layer::One => self.run_layer1(ctx),
            Layer::Two => self.run_layer2(ctx),
            Layer::Three => self.run_layer3(ctx),
        }
    }

    fn run_layer1(&mut self, ctx: &RunContext) -> Result<LayerRun> {
        let start = Instant::now();
        // All sub-checks run even when an earlier one fails; fail-fast only
        // applies between layers.
        let results: Vec<SubCheckResult> = self
            .config
            .layer1
            .iter()
            .map(|def| check::run_check(&self.root, def))
            .collect();
        let pass = layer_passes(&results);
        let duration_ms = start.elapsed().as_millis() as u64;
        info!(pass, duration_ms, "layer 1 finished");

        MetricsCollector::new(&self.store).record_run(
            1,
            RunOutcome {
                passed: pass,
                duration_ms,
                findings_count: 0,
                metadata: ctx.metadata(),
            },
        )?;

        self.status.layer1 = Some(LayerStatus {
            pass: Some(pass),
            duration_ms,
            results: results.clone(),
        });
        self.touch();
        Ok(LayerRun {
            layer: Layer::One,
            pass,
            duration_ms,
            results,
        })
    }

    fn run_layer2(&mut self, ctx: &RunContext) -> Result<LayerRun> {
        let start = Instant::now();
        let mut results = Vec::new();

        let coderabbit = match &self.config.layer2.coderabbit {
            Some(provider) => {
                let (result, findings) = check::run_coderabbit(&self.root, provider);
                results.push(result);
                findings
            }
            None => {
                results.push(SubCheckResult::skipped("coderabbit", "not configured"));
                None
            }
        };
        let quinn = match &self.config.layer2.quinn {
            Some(provider) => {
                let (result, findings) = check::run_quinn(&self.root, provider);
                results.push(result);
                findings
            }
            None => {
                results.push(SubCheckResult::skipped("quinn", "not configured"));
                None
            }
        };

        let pass = layer_passes(&results);
        let duration_ms = start.elapsed().as_millis() as u64;
        info!(pass, duration_ms, "layer 2 finished");

        MetricsCollector::new(&self.store).record_pr_review(PrReviewOutcome {
            passed: pass,
            duration_ms,
            findings_count: None,
            coderabbit,
            quinn,
            metadata: ctx.metadata(),
        })?;

        self.status.layer2 = Some(LayerStatus {
            pass: Some(pass),
            duration_ms,
            results: results.clone(),
        });
        self.touch();
        Ok(LayerRun {
            layer: Layer::Two,
            pass,
            duration_ms,
            results,
        })
    }

    /// Explicitly "running" layer 3 records the current sign-off state:
    /// signed-off when a sign-off exists for the context's story, pending
    /// otherwise. Unlike [`QualityGateManager::orchestrate`], this marks the
    /// layer as awaiting review even without a sign-off.
    fn run_layer3(&mut self, ctx: &RunContext) -> Result<LayerRun> {
        let result = self.signoff_result(ctx);
        let signed = result.pass;
        MetricsCollector::new(&self.store).record_run(
            3,
            RunOutcome {
                passed: signed,
                duration_ms: 0,
                findings_count: 0,
                metadata: ctx.metadata(),
            },
        )?;

        self.status.layer3 = Some(LayerStatus {
            pass: if signed { Some(true) } else { None },
            duration_ms: 0,
            results: vec![result.clone()],
        });
        self.touch();
        Ok(LayerRun {
            layer: Layer::Three,
            pass: signed,
            duration_ms: 0,
            results: vec![result],
        })
    }

    fn signoff_result(&self, ctx: &RunContext) -> SubCheckResult {
        match &ctx.story {
            Some(story) => match self.status.signoffs.get(story) {
                Some(signoff) => SubCheckResult::passed(
                    "signoff",
                    format!("signed off by {} at {}", signoff.reviewer, signoff.timestamp),
                ),
                None => SubCheckResult::failed("signoff", format!("awaiting sign-off for {story}")),
            },
            None => SubCheckResult::failed("signoff", "no story specified; awaiting sign-off"),
        }
    }

    // ---------------------------------------------------------------------------
    // Orchestration
    // ---------------------------------------------------------------------------

    /// Run the full pipeline: layer 1, layer 2, then report layer 3.
    ///
    /// With `fail_fast` (the default) a layer-1 failure stops everything:
    /// layer 2 is never invoked and the result is `failed` with exit code 1.
    /// Layer 3 is only ever reported: a recorded sign-off for the story
    /// yields `passed`, otherwise the pipeline is left at `layer2-complete`
    /// and the result is `pending`.
    pub fn orchestrate(&mut self, ctx: &RunContext) -> Result<OrchestrateResult> {
        let start = Instant::now();
        let mut layers = Vec::new();

        let layer1 = self.run_layer1(ctx)?;
        let layer1_pass = layer1.pass;
        layers.push(layer1);
        if !layer1_pass && ctx.fail_fast {
            return Ok(OrchestrateResult {
                layers,
                status: RunStatus::Failed,
                duration_ms: start.elapsed().as_millis() as u64,
                message: "Layer 1 failed: fix pre-commit issues before opening a PR".to_string(),
                exit_code: 1,
            });
        }

        let layer2 = self.run_layer2(ctx)?;
        let layer2_pass = layer2.pass;
        layers.push(layer2);

        // Layer 3 is reported, never executed. Orchestration only pins the
        // layer-3 status when a sign-off already exists; otherwise the
        // pipeline rests at layer2-complete until someone signs off or
        // explicitly requests review via `run --layer 3`.
        let signoff = self.signoff_result(ctx);
        let signed = signoff.pass;
        self.status.layer3 = if signed && layer1_pass && layer2_pass {
            Some(LayerStatus {
                pass: Some(true),
                duration_ms: 0,
                results: vec![signoff.clone()],
            })
        } else {
            None
        };
        self.touch();
        layers.push(LayerRun {
            layer: Layer::Three,
            pass: signed,
            duration_ms: 0,
            results: vec![signoff],
        });

        let (status, message) = if !layer1_pass || !layer2_pass {
            (
                RunStatus::Failed,
                "Pipeline failed: see layer results".to_string(),
            )
        } else if signed {
            (RunStatus::Passed, "All three layers passed".to_string())
        } else {
            (
                RunStatus::Pending,
                "Layers 1 and 2 passed; awaiting human sign-off".to_string(),
            )
        };
        Ok(OrchestrateResult {
            exit_code: if status == RunStatus::Failed { 1 } else { 0 },
            layers,
            status,
            duration_ms: start.elapsed().as_millis() as u64,
            message,
        })
    }

    // ---------------------------------------------------------------------------
    // Sign-offs and external runs
    // ---------------------------------------------------------------------------

    /// Record a human sign-off for a story. Latest sign-off per story wins.
    pub fn sign_off(&mut self, story: &str, reviewer: &str) -> Result<()> {
        paths::validate_story_id(story)?;
        self.status.signoffs.insert(
            story.to_string(),
            Signoff {
                reviewer: reviewer.to_string(),
                timestamp: Utc::now(),
            },
        );
        // A pipeline waiting on the human gate is completed by the sign-off.
        let automated_green = matches!(
            (&self.status.layer1, &self.status.layer2),
            (Some(l1), Some(l2)) if l1.pass == Some(true) && l2.pass == Some(true)
        );
        if automated_green {
            self.status.layer3 = Some(LayerStatus {
                pass: Some(true),
                duration_ms: 0,
                results: vec![SubCheckResult::passed(
                    "signoff",
                    format!("signed off by {reviewer}"),
                )],
            });
        }
        self.touch();
        Ok(())
    }

    /// Fold an externally recorded run (e.g. `qa metrics record` from a CI
    /// step) into the pipeline status, as if the layer had been run here.
    pub fn ingest_external(&mut self, record: &RunRecord) {
        let layer_status = LayerStatus {
            pass: Some(record.passed),
            duration_ms: record.duration_ms,
            results: Vec::new(),
        };
        match record.layer {
            Layer::One => self.status.layer1 = Some(layer_status),
            Layer::Two => self.status.layer2 = Some(layer_status),
            Layer::Three => self.status.layer3 = Some(layer_status),
        }
        self.touch();
    }

    fn touch(&mut self) {
        self.status.last_run = Some(Utc::now());
        self.status.recompute();
    }

    // ---------------------------------------------------------------------------
    // Reports
    // ---------------------------------------------------------------------------

    /// Write a human-readable snapshot of the current status under
    /// `.qa/reports/` and return the path.
    pub fn save_report(&self, story: Option<&str>) -> Result<PathBuf> {
        let stamp = Utc::now().format("%Y%m%d-%H%M%S");
        let name = format!("report-{}-{stamp}.md", story.unwrap_or("pipeline"));
        let path = paths::reports_dir(&self.root).join(name);
        atomic_write(&path, self.render_report(story).as_bytes())?;
        Ok(path)
    }

    fn render_report(&self, story: Option<&str>) -> String {
        let mut out = String::new();
        out.push_str("# Quality Gate Report\n\n");
        if let Some(story) = story {
            out.push_str(&format!("Story: {story}\n\n"));
        }
        out.push_str(&format!("Overall: {}\n", self.status.overall));
        if let Some(last_run) = self.status.last_run {
            out.push_str(&format!("Last run: {last_run}\n"));
        }
        for (layer, status) in [
            (Layer::One, &self.status.layer1),
            (Layer::Two, &self.status.layer2),
            (Layer::Three, &self.status.layer3),
        ] {
            out.push_str(&format!("\n## {}\n\n", layer.name()));
            match status {
                None => out.push_str("Not run.\n"),
                Some(status) => {
                    let verdict = match status.pass {
                        Some(true) => "passed",
                        Some(false) => "failed",
                        None => "pending",
                    };
                    out.push_str(&format!("Result: {verdict} ({}ms)\n", status.duration_ms));
                    for r in &status.results {
                        let mark = if r.skipped {
                            "skip"
                        } else if r.pass {
                            "pass"
                        } else {
                            "FAIL"
                        };
                        out.push_str(&format!("- [{mark}] {}: {}\n", r.check, r.message));
                    }
                }
            }
        }
        if !self.status.signoffs.is_empty() {
            out.push_str("\n## Sign-offs\n\n");
            for (story, signoff) in &self.status.signoffs {
                out.push_str(&format!(
                    "- {story}: {} at {}\n",
                    signoff.reviewer, signoff.timestamp
                ));
            }
        }
        out
    }
}

fn layer_passes(results: &[SubCheckResult]) -> bool {
    results.iter().filter(|r| !r.skipped).all(|r| r.pass)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
