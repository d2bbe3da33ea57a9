use crate::error::{QaError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Layer
// ---------------------------------------------------------------------------

/// One of the three quality-gate stages. Serialized as its number so the
/// metrics file reads naturally (`"layer": 2`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Layer {
    One,
    Two,
    Three,
}

impl Layer {
    pub fn number(self) -> u8 {
        match self {
            Layer::One => 1,
            Layer::Two => 2,
            Layer::Three => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Layer::One => "Layer 1 (pre-commit checks)",
            Layer::Two => "Layer 2 (PR review)",
            Layer::Three => "Layer 3 (human sign-off)",
        }
    }
}

impl From<Layer> for u8 {
    fn from(layer: Layer) -> u8 {
        layer.number()
    }
}

impl TryFrom<u8> for Layer {
    type Error = QaError;

    fn try_from(n: u8) -> Result<Layer> {
        match n {
            1 => Ok(Layer::One),
            2 => Ok(Layer::Two),
            3 => Ok(Layer::Three),
            other => Err(QaError::InvalidLayer(other)),
        }
    }
}

impl std::fmt::Display for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.number())
    }
}

// ---------------------------------------------------------------------------
// CodeRabbitFindings
// ---------------------------------------------------------------------------

/// Severity-bucketed finding counts from the CodeRabbit reviewer.
///
/// `findings_count` always equals the sum of the four buckets. The fields are
/// private and the wire form is validated through `try_from`, so no code path
/// can produce a record where the two disagree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "CodeRabbitWire")]
pub struct CodeRabbitFindings {
    critical: u64,
    high: u64,
    medium: u64,
    low: u64,
    findings_count: u64,
}

impl CodeRabbitFindings {
    pub fn new(critical: u64, high: u64, medium: u64, low: u64) -> Self {
        Self {
            critical,
            high,
            medium,
            low,
            findings_count: critical + high + medium + low,
        }
    }

    pub fn critical(&self) -> u64 {
        self.critical
    }

    pub fn high(&self) -> u64 {
        self.high
    }

    pub fn medium(&self) -> u64 {
        self.medium
    }

    pub fn low(&self) -> u64 {
        self.low
    }

    pub fn findings_count(&self) -> u64 {
        self.findings_count
    }
}

#[derive(Deserialize)]
struct CodeRabbitWire {
    #[serde(default)]
    critical: u64,
    #[serde(default)]
    high: u64,
    #[serde(default)]
    medium: u64,
    #[serde(default)]
    low: u64,
    #[serde(default)]
    findings_count: Option<u64>,
}

impl TryFrom<CodeRabbitWire> for CodeRabbitFindings {
    type Error = QaError;

    fn try_from(wire: CodeRabbitWire) -> Result<CodeRabbitFindings> {
        let sum = wire.critical + wire.high + wire.medium + wire.low;
        if let Some(count) = wire.findings_count {
            if count != sum {
                return Err(QaError::FindingsMismatch { count, sum });
            }
        }
        Ok(CodeRabbitFindings::new(
            wire.critical,
            wire.high,
            wire.medium,
            wire.low,
        ))
    }
}

// ---------------------------------------------------------------------------
// QuinnFindings
// ---------------------------------------------------------------------------

/// Finding count plus top categories from the Quinn reviewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuinnFindings {
    pub findings_count: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub top_categories: Vec<String>,
}

// ---------------------------------------------------------------------------
// RunMetadata
// ---------------------------------------------------------------------------

/// Free-form context attached to a run. `triggered_by` is the only required
/// key; everything else (story, branch, commit) rides in the open map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub triggered_by: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

impl RunMetadata {
    pub fn new(triggered_by: impl Into<String>) -> Self {
        Self {
            triggered_by: triggered_by.into(),
            extra: BTreeMap::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    pub fn story(&self) -> Option<&str> {
        self.extra.get("story").map(String::as_str)
    }
}

impl Default for RunMetadata {
    fn default() -> Self {
        Self::new("manual")
    }
}

// ---------------------------------------------------------------------------
// RunRecord
// ---------------------------------------------------------------------------

/// One execution of one layer's checks, as stored in the metrics history.
///
/// `timestamp` may be left `None` by the caller; the store assigns the
/// current instant on append.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub layer: Layer,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    pub passed: bool,
    pub duration_ms: u64,
    pub findings_count: u64,
    #[serde(default)]
    pub metadata: RunMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coderabbit: Option<CodeRabbitFindings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quinn: Option<QuinnFindings>,
}

impl RunRecord {
    pub fn new(layer: Layer, passed: bool, duration_ms: u64) -> Self {
        Self {
            layer,
            timestamp: None,
            passed,
            duration_ms,
            findings_count: 0,
            metadata: RunMetadata::default(),
            coderabbit: None,
            quinn: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
