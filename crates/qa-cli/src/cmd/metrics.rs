use crate::output::{self, print_json};
use anyhow::Context;
use clap::Subcommand;
use qa_core::collector::{MetricsCollector, PrReviewOutcome, RunOutcome};
use qa_core::config::GateConfig;
use qa_core::manager::QualityGateManager;
use qa_core::record::{CodeRabbitFindings, QuinnFindings, RunMetadata};
use qa_core::seed::{self, SeedOptions};
use qa_core::store::MetricsStore;
use std::path::Path;

#[derive(Subcommand)]
pub enum MetricsSubcommand {
    /// Manually inject a run record (for CI steps that cannot call the
    /// library directly)
    Record {
        /// Layer the run belongs to (1, 2, or 3)
        #[arg(long)]
        layer: u8,

        #[arg(long, conflicts_with = "failed")]
        passed: bool,

        #[arg(long)]
        failed: bool,

        /// Run duration in milliseconds
        #[arg(long, default_value_t = 0)]
        duration: u64,

        /// Explicit findings count (ignored when --coderabbit is given)
        #[arg(long)]
        findings: Option<u64>,

        #[arg(long)]
        story: Option<String>,

        #[arg(long)]
        branch: Option<String>,

        #[arg(long)]
        commit: Option<String>,

        /// Attach a CodeRabbit sub-record built from the --cr-* buckets
        #[arg(long)]
        coderabbit: bool,

        #[arg(long = "cr-critical", default_value_t = 0)]
        cr_critical: u64,

        #[arg(long = "cr-high", default_value_t = 0)]
        cr_high: u64,

        #[arg(long = "cr-medium", default_value_t = 0)]
        cr_medium: u64,

        #[arg(long = "cr-low", default_value_t = 0)]
        cr_low: u64,

        /// Attach a Quinn sub-record
        #[arg(long)]
        quinn: bool,

        #[arg(long = "quinn-findings", default_value_t = 0)]
        quinn_findings: u64,

        /// Comma-separated category list
        #[arg(long = "quinn-categories")]
        quinn_categories: Option<String>,
    },

    /// Generate synthetic gate history for demos and dashboards
    Seed {
        #[arg(long, default_value_t = 30)]
        days: u32,

        /// Pipeline runs per day
        #[arg(long, default_value_t = 3)]
        runs: u32,

        #[arg(long = "no-weekends")]
        no_weekends: bool,

        /// Compute and print the summary without writing anything
        #[arg(long = "dry-run")]
        dry_run: bool,
    },

    /// Show aggregate run counts, pass rates, and trends
    Summary,
}

pub fn run(root: &Path, subcommand: MetricsSubcommand, json: bool) -> anyhow::Result<i32> {
    match subcommand {
        MetricsSubcommand::Record {
            layer,
            passed,
            failed: _,
            duration,
            findings,
            story,
            branch,
            commit,
            coderabbit,
            cr_critical,
            cr_high,
            cr_medium,
            cr_low,
            quinn,
            quinn_findings,
            quinn_categories,
        } => {
            let mut metadata = RunMetadata::new("ci");
            if let Some(story) = story {
                qa_core::paths::validate_story_id(&story)?;
                metadata = metadata.with("story", story);
            }
            if let Some(branch) = branch {
                metadata = metadata.with("branch", branch);
            }
            if let Some(commit) = commit {
                metadata = metadata.with("commit", commit);
            }

            let store = MetricsStore::new(root);
            let collector = MetricsCollector::new(&store);

            // The collector validates the layer before anything is written;
            // an invalid layer exits 1 with no state mutated.
            let record = if layer == 2 && (coderabbit || quinn) {
                collector.record_pr_review(PrReviewOutcome {
                    passed,
                    duration_ms: duration,
                    findings_count: findings,
                    coderabbit: coderabbit
                        .then(|| CodeRabbitFindings::new(cr_critical, cr_high, cr_medium, cr_low)),
                    quinn: quinn.then(|| QuinnFindings {
                        findings_count: quinn_findings,
                        top_categories: quinn_categories
                            .as_deref()
                            .map(parse_csv)
                            .unwrap_or_default(),
                    }),
                    metadata,
                })?
            } else {
                collector.record_run(
                    layer,
                    RunOutcome {
                        passed,
                        duration_ms: duration,
                        findings_count: findings.unwrap_or(0),
                        metadata,
                    },
                )?
            };

            // Reflect the externally recorded run in the pipeline status so
            // `qa status` picks it up.
            let mut manager = QualityGateManager::with_config(root, GateConfig::default());
            manager.ingest_external(&record);
            manager.save_status().context("failed to persist status")?;

            if json {
                print_json(&record)?;
            } else {
                let verdict = if record.passed { "passed" } else { "failed" };
                println!(
                    "✓ Recorded layer {} run ({verdict}, {}ms)",
                    record.layer, record.duration_ms
                );
            }
            Ok(0)
        }

        MetricsSubcommand::Seed {
            days,
            runs,
            no_weekends,
            dry_run,
        } => {
            let store = MetricsStore::new(root);
            let summary = seed::seed(
                &store,
                &SeedOptions {
                    days,
                    runs_per_day: runs,
                    skip_weekends: no_weekends,
                    dry_run,
                    rng_seed: None,
                },
            )?;
            if json {
                print_json(&summary)?;
            } else {
                let prefix = if summary.dry_run { "Would generate" } else { "Generated" };
                println!("{prefix} {} run records", summary.generated);
                for (layer, count) in &summary.per_layer {
                    println!("  layer {layer}: {count}");
                }
                if let (Some(first), Some(last)) = (summary.first_date, summary.last_date) {
                    println!("  spanning {first} to {last}");
                }
            }
            Ok(0)
        }

        MetricsSubcommand::Summary => {
            let snapshot = MetricsStore::new(root).snapshot();
            if json {
                print_json(&snapshot)?;
            } else {
                println!("Total runs: {}", snapshot.total_runs);
                let rows: Vec<Vec<String>> = snapshot
                    .layers
                    .iter()
                    .map(|(layer, agg)| {
                        vec![
                            layer.to_string(),
                            agg.runs.to_string(),
                            agg.passed.to_string(),
                            format!("{:.0}%", agg.pass_rate * 100.0),
                        ]
                    })
                    .collect();
                if !rows.is_empty() {
                    println!();
                    output::print_table(&["LAYER", "RUNS", "PASSED", "RATE"], rows);
                }
                if let Some(latest) = snapshot.pass_rate_trend.last() {
                    println!(
                        "\nLatest daily pass rate: {:.0}% ({})",
                        latest.value * 100.0,
                        latest.date
                    );
                }
                if let Some(latest) = snapshot.auto_catch_trend.last() {
                    println!(
                        "Latest auto-catch rate: {:.0}% ({})",
                        latest.value * 100.0,
                        latest.date
                    );
                }
            }
            Ok(0)
        }
    }
}

fn parse_csv(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
