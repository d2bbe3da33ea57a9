use crate::output::print_json;
use anyhow::Context;
use qa_core::config::GateConfig;
use qa_core::manager::QualityGateManager;
use std::path::Path;

/// Record a human sign-off. Uses a default gate config: signing off touches
/// only the status file, so a broken config must not block it.
pub fn run(root: &Path, story: &str, reviewer: &str, json: bool) -> anyhow::Result<()> {
    let mut manager = QualityGateManager::with_config(root, GateConfig::default());
    manager.sign_off(story, reviewer)?;
    manager.save_status().context("failed to persist status")?;

    if json {
        print_json(manager.get_status())?;
    } else {
        println!("✓ {story} signed off by {reviewer}");
        println!("Overall: {}", manager.get_status().overall);
    }
    Ok(())
}
