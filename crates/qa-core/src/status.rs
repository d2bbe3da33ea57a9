use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// SubCheckResult
// ---------------------------------------------------------------------------

/// Outcome of one named validation within a layer (lint, typecheck, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubCheckResult {
    pub check: String,
    pub pass: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub skipped: bool,
}

impl SubCheckResult {
    pub fn passed(check: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            check: check.into(),
            pass: true,
            message: message.into(),
            skipped: false,
        }
    }

    pub fn failed(check: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            check: check.into(),
            pass: false,
            message: message.into(),
            skipped: false,
        }
    }

    pub fn skipped(check: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            check: check.into(),
            pass: true,
            message: message.into(),
            skipped: true,
        }
    }
}

// ---------------------------------------------------------------------------
// LayerStatus
// ---------------------------------------------------------------------------

/// Latest known state of one layer. Overwritten wholesale each time the
/// layer is re-run; never merged with previous state.
///
/// `pass: None` means the layer is recorded but not concluded, which only
/// happens for layer 3 while a sign-off is awaited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pass: Option<bool>,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub results: Vec<SubCheckResult>,
}

// ---------------------------------------------------------------------------
// Signoff
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signoff {
    pub reviewer: String,
    pub timestamp: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Overall
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Overall {
    NotStarted,
    Layer1Failed,
    Layer1Complete,
    Layer2Blocked,
    Layer2Complete,
    Layer3Pending,
    Passed,
    Unknown,
}

impl Overall {
    pub fn as_str(self) -> &'static str {
        match self {
            Overall::NotStarted => "not-started",
            Overall::Layer1Failed => "layer1-failed",
            Overall::Layer1Complete => "layer1-complete",
            Overall::Layer2Blocked => "layer2-blocked",
            Overall::Layer2Complete => "layer2-complete",
            Overall::Layer3Pending => "layer3-pending",
            Overall::Passed => "passed",
            Overall::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Overall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// PipelineStatus
// ---------------------------------------------------------------------------

/// Aggregate pipeline state persisted between CLI invocations.
///
/// `overall` is derived, never hand-set: every mutation goes through
/// [`PipelineStatus::recompute`], and load/save round-trips re-derive it so
/// stored and derived status cannot diverge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineStatus {
    pub overall: Overall,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer1: Option<LayerStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer2: Option<LayerStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer3: Option<LayerStatus>,
    /// Latest sign-off per story. Map overwrite, not append.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub signoffs: BTreeMap<String, Signoff>,
}

impl Default for PipelineStatus {
    fn default() -> Self {
        Self {
            overall: Overall::NotStarted,
            last_run: None,
            layer1: None,
            layer2: None,
            layer3: None,
            signoffs: BTreeMap::new(),
        }
    }
}

impl PipelineStatus {
    /// Re-derive `overall` from the current layer data.
    pub fn recompute(&mut self) {
        self.overall = derive_overall(
            self.layer1.as_ref(),
            self.layer2.as_ref(),
            self.layer3.as_ref(),
        );
    }
}

/// Total derivation of the overall pipeline state from per-layer data.
///
/// | layer1 | layer2 | layer3          | overall         |
/// |--------|--------|-----------------|-----------------|
/// | absent | —      | —               | not-started     |
/// | fail   | —      | —               | layer1-failed   |
/// | pass   | absent | —               | layer1-complete |
/// | pass   | fail   | —               | layer2-blocked  |
/// | pass   | pass   | absent          | layer2-complete |
/// | pass   | pass   | pending         | layer3-pending  |
/// | pass   | pass   | signed-off      | passed          |
///
/// Combinations outside the table (a later layer recorded while an earlier
/// one is absent, or a layer with no conclusion below layer 3) derive
/// `unknown` rather than panicking, keeping the function total.
pub fn derive_overall(
    layer1: Option<&LayerStatus>,
    layer2: Option<&LayerStatus>,
    layer3: Option<&LayerStatus>,
) -> Overall {
    let l1 = match layer1 {
        None => {
            return if layer2.is_none() && layer3.is_none() {
                Overall::NotStarted
            } else {
                Overall::Unknown
            };
        }
        Some(s) => s,
    };
    match l1.pass {
        Some(false) => return Overall::Layer1Failed,
        Some(true) => {}
        None => return Overall::Unknown,
    }
    let l2 = match layer2 {
        None => {
            return if layer3.is_none() {
                Overall::Layer1Complete
            } else {
                Overall::Unknown
            };
        }
        Some(s) => s,
    };
    match l2.pass {
        Some(false) => return Overall::Layer2Blocked,
        Some(true) => {}
        None => return Overall::Unknown,
    }
    match layer3 {
        None => Overall::Layer2Complete,
        Some(l3) => match l3.pass {
            Some(true) => Overall::Passed,
            // Recorded but not signed off yet.
            Some(false) | None => Overall::Layer3Pending,
        },
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
