use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn qa(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("qa").unwrap();
    cmd.current_dir(dir.path()).env("QA_ROOT", dir.path());
    cmd
}

fn write_config(dir: &TempDir, yaml: &str) {
    std::fs::create_dir_all(dir.path().join(".qa")).unwrap();
    std::fs::write(dir.path().join(".qa/config.yaml"), yaml).unwrap();
}

const PASSING_CONFIG: &str = "\
layer1:
  - name: lint
    command: 'true'
  - name: test
    command: 'true'
";

// ---------------------------------------------------------------------------
// qa init
// ---------------------------------------------------------------------------

#[test]
fn init_creates_config() {
    let dir = TempDir::new().unwrap();
    qa(&dir).arg("init").assert().success();
    assert!(dir.path().join(".qa/config.yaml").exists());
}

#[test]
fn init_is_idempotent() {
    let dir = TempDir::new().unwrap();
    qa(&dir).arg("init").assert().success();
    let before = std::fs::read_to_string(dir.path().join(".qa/config.yaml")).unwrap();
    qa(&dir).arg("init").assert().success();
    let after = std::fs::read_to_string(dir.path().join(".qa/config.yaml")).unwrap();
    assert_eq!(before, after);
}

// ---------------------------------------------------------------------------
// qa status
// ---------------------------------------------------------------------------

#[test]
fn status_defaults_to_not_started() {
    let dir = TempDir::new().unwrap();
    qa(&dir)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("not-started"))
        .stdout(predicate::str::contains("Layer 1: not run"));
}

#[test]
fn status_json_is_parseable() {
    let dir = TempDir::new().unwrap();
    let output = qa(&dir).args(["status", "--json"]).assert().success();
    let value: serde_json::Value =
        serde_json::from_slice(&output.get_output().stdout).unwrap();
    assert_eq!(value["overall"], "not-started");
}

#[test]
fn status_survives_corrupt_status_file() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join(".qa")).unwrap();
    std::fs::write(dir.path().join(".qa/status.json"), "{broken").unwrap();
    qa(&dir)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("not-started"));
}

// ---------------------------------------------------------------------------
// qa run
// ---------------------------------------------------------------------------

#[test]
fn run_passing_pipeline_is_pending() {
    let dir = TempDir::new().unwrap();
    write_config(&dir, PASSING_CONFIG);
    qa(&dir)
        .args(["run", "--story", "ACT-9"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Layer 1: ✅ Passed"))
        .stdout(predicate::str::contains("awaiting human sign-off"));

    qa(&dir)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("layer2-complete"));
}

#[test]
fn run_failing_layer1_exits_one_and_skips_layer2() {
    let dir = TempDir::new().unwrap();
    write_config(
        &dir,
        "layer1:\n  - name: lint\n    command: 'false'\nlayer2:\n  coderabbit:\n    command: touch layer2-ran\n",
    );
    qa(&dir)
        .arg("run")
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("Layer 1: ❌ Failed"));
    assert!(!dir.path().join("layer2-ran").exists());

    qa(&dir)
        .arg("status")
        .assert()
        .stdout(predicate::str::contains("layer1-failed"));
}

#[test]
fn run_no_fail_fast_reaches_layer2() {
    let dir = TempDir::new().unwrap();
    write_config(
        &dir,
        "layer1:\n  - name: lint\n    command: 'false'\nlayer2:\n  coderabbit:\n    command: touch layer2-ran\n",
    );
    qa(&dir)
        .args(["run", "--no-fail-fast"])
        .assert()
        .failure()
        .code(1);
    assert!(dir.path().join("layer2-ran").exists());
}

#[test]
fn run_single_layer_only() {
    let dir = TempDir::new().unwrap();
    write_config(&dir, PASSING_CONFIG);
    qa(&dir)
        .args(["run", "--layer", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Layer 1: ✅ Passed"));
    qa(&dir)
        .arg("status")
        .assert()
        .stdout(predicate::str::contains("layer1-complete"))
        .stdout(predicate::str::contains("Layer 2: not run"));
}

#[test]
fn run_invalid_layer_exits_one() {
    let dir = TempDir::new().unwrap();
    write_config(&dir, PASSING_CONFIG);
    qa(&dir)
        .args(["run", "--layer", "7"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid layer"));
}

#[test]
fn run_save_report_writes_file() {
    let dir = TempDir::new().unwrap();
    write_config(&dir, PASSING_CONFIG);
    qa(&dir)
        .args(["run", "--story", "ACT-9", "--save-report"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Report saved to"));
    let reports: Vec<_> = std::fs::read_dir(dir.path().join(".qa/reports"))
        .unwrap()
        .collect();
    assert_eq!(reports.len(), 1);
}

// ---------------------------------------------------------------------------
// qa signoff
// ---------------------------------------------------------------------------

#[test]
fn signoff_completes_a_green_pipeline() {
    let dir = TempDir::new().unwrap();
    write_config(&dir, PASSING_CONFIG);
    qa(&dir).args(["run", "--story", "ACT-9"]).assert().success();
    qa(&dir)
        .args(["signoff", "--story", "ACT-9", "--reviewer", "dana"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Overall: passed"));

    qa(&dir)
        .arg("status")
        .assert()
        .stdout(predicate::str::contains("Overall: passed"))
        .stdout(predicate::str::contains("ACT-9: dana"));
}

// ---------------------------------------------------------------------------
// qa metrics record
// ---------------------------------------------------------------------------

#[test]
fn record_invalid_layer_writes_nothing() {
    let dir = TempDir::new().unwrap();
    qa(&dir)
        .args(["metrics", "record", "--layer", "5", "--passed"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("invalid layer 5"));
    assert!(!dir.path().join(".qa/metrics.json").exists());
}

#[test]
fn recorded_layer1_run_shows_in_status() {
    let dir = TempDir::new().unwrap();
    qa(&dir)
        .args([
            "metrics", "record", "--layer", "1", "--passed", "--duration", "1200", "--story",
            "ACT-9",
        ])
        .assert()
        .success();

    qa(&dir)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Layer 1: ✅ Passed (1.2s)"))
        .stdout(predicate::str::contains("layer1-complete"));
}

#[test]
fn record_coderabbit_buckets_sum_to_findings() {
    let dir = TempDir::new().unwrap();
    let output = qa(&dir)
        .args([
            "metrics",
            "record",
            "--layer",
            "2",
            "--failed",
            "--coderabbit",
            "--cr-critical",
            "1",
            "--cr-high",
            "2",
            "--cr-medium",
            "3",
            "--cr-low",
            "4",
            "--json",
        ])
        .assert()
        .success();
    let record: serde_json::Value =
        serde_json::from_slice(&output.get_output().stdout).unwrap();
    assert_eq!(record["findings_count"], 10);
    assert_eq!(record["coderabbit"]["findings_count"], 10);
    assert_eq!(record["layer"], 2);
}

#[test]
fn record_quinn_categories_are_parsed() {
    let dir = TempDir::new().unwrap();
    let output = qa(&dir)
        .args([
            "metrics",
            "record",
            "--layer",
            "2",
            "--passed",
            "--quinn",
            "--quinn-findings",
            "3",
            "--quinn-categories",
            "naming, tests",
            "--json",
        ])
        .assert()
        .success();
    let record: serde_json::Value =
        serde_json::from_slice(&output.get_output().stdout).unwrap();
    assert_eq!(record["quinn"]["findings_count"], 3);
    assert_eq!(record["quinn"]["top_categories"][1], "tests");
}

// ---------------------------------------------------------------------------
// qa metrics seed / summary
// ---------------------------------------------------------------------------

#[test]
fn seed_dry_run_leaves_disk_untouched() {
    let dir = TempDir::new().unwrap();
    qa(&dir)
        .args(["metrics", "seed", "--days", "5", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Would generate"));
    assert!(!dir.path().join(".qa/metrics.json").exists());
}

#[test]
fn seed_then_summary_reports_runs() {
    let dir = TempDir::new().unwrap();
    qa(&dir)
        .args(["metrics", "seed", "--days", "5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Generated"));
    assert!(dir.path().join(".qa/metrics.json").exists());

    let output = qa(&dir)
        .args(["metrics", "summary", "--json"])
        .assert()
        .success();
    let snapshot: serde_json::Value =
        serde_json::from_slice(&output.get_output().stdout).unwrap();
    assert!(snapshot["total_runs"].as_u64().unwrap() > 0);
    assert!(snapshot["layers"]["1"]["runs"].as_u64().unwrap() > 0);
}
