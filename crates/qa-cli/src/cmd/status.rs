use crate::output::{self, print_json};
use qa_core::store::MetricsStore;
use std::path::Path;

/// Read-only: renders the persisted pipeline status without loading the gate
/// config or executing anything. Always exits 0.
pub fn run(root: &Path, json: bool, verbose: bool) -> anyhow::Result<()> {
    let store = MetricsStore::new(root);
    let status = store.load_status();

    if json {
        return print_json(&status);
    }

    println!("Overall: {}", status.overall);
    if let Some(last_run) = status.last_run {
        println!("Last run: {}", last_run.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    println!();
    for (n, layer) in [(1, &status.layer1), (2, &status.layer2), (3, &status.layer3)] {
        println!("{}", output::layer_line(n, layer.as_ref()));
        if verbose {
            if let Some(layer) = layer {
                for line in output::sub_check_lines(layer) {
                    println!("{line}");
                }
            }
        }
    }

    if !status.signoffs.is_empty() {
        println!("\nSign-offs:");
        for (story, signoff) in &status.signoffs {
            println!(
                "  {story}: {} at {}",
                signoff.reviewer,
                signoff.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
            );
        }
    }
    Ok(())
}
