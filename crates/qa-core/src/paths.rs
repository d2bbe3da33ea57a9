use crate::error::{QaError, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const QA_DIR: &str = ".qa";
pub const REPORTS_DIR: &str = ".qa/reports";

pub const METRICS_FILE: &str = ".qa/metrics.json";
pub const STATUS_FILE: &str = ".qa/status.json";
pub const CONFIG_FILE: &str = ".qa/config.yaml";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn qa_dir(root: &Path) -> PathBuf {
    root.join(QA_DIR)
}

pub fn metrics_path(root: &Path) -> PathBuf {
    root.join(METRICS_FILE)
}

pub fn status_path(root: &Path) -> PathBuf {
    root.join(STATUS_FILE)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn reports_dir(root: &Path) -> PathBuf {
    root.join(REPORTS_DIR)
}

// ---------------------------------------------------------------------------
// Story-id validation
// ---------------------------------------------------------------------------

static STORY_RE: OnceLock<Regex> = OnceLock::new();

fn story_re() -> &'static Regex {
    STORY_RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._\-]*$").unwrap())
}

pub fn validate_story_id(story: &str) -> Result<()> {
    if story.is_empty() || story.len() > 128 || !story_re().is_match(story) {
        return Err(QaError::InvalidStoryId(story.to_string()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
