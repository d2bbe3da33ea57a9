use crate::error::{QaError, Result};
use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::Path;

// ---------------------------------------------------------------------------
// CheckDefinition
// ---------------------------------------------------------------------------

/// One named sub-check within layer 1, executed as a shell command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CheckDefinition {
    pub name: String,
    pub command: String,
    /// Optional checks are skipped (not failed) when the command's binary is
    /// not on PATH.
    #[serde(default)]
    pub optional: bool,
}

impl CheckDefinition {
    pub fn new(name: &str, command: &str) -> Self {
        Self {
            name: name.to_string(),
            command: command.to_string(),
            optional: false,
        }
    }
}

// ---------------------------------------------------------------------------
// ProviderConfig
// ---------------------------------------------------------------------------

/// An automated PR reviewer for layer 2. The command must print a JSON
/// findings object on stdout; an unconfigured provider yields a skipped
/// sub-check rather than a failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    pub command: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Layer2Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coderabbit: Option<ProviderConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quinn: Option<ProviderConfig>,
}

// ---------------------------------------------------------------------------
// GateConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GateConfig {
    /// Ordered: earlier checks may be prerequisites of later ones
    /// (lint before typecheck), so order is preserved at execution.
    #[serde(default = "default_layer1")]
    pub layer1: Vec<CheckDefinition>,
    #[serde(default)]
    pub layer2: Layer2Config,
}

fn default_layer1() -> Vec<CheckDefinition> {
    vec![
        CheckDefinition::new("lint", "npm run lint"),
        CheckDefinition::new("typecheck", "npm run typecheck"),
        CheckDefinition::new("test", "npm test"),
    ]
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            layer1: default_layer1(),
            layer2: Layer2Config::default(),
        }
    }
}

impl GateConfig {
    /// Load from `.qa/config.yaml`. A missing file means defaults; a
    /// malformed file is an error, since config is user-authored (unlike
    /// state files, which degrade silently).
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(&path)?;
        serde_yaml::from_str(&data).map_err(|source| QaError::Config { path, source })
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&paths::config_path(root), data.as_bytes())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
