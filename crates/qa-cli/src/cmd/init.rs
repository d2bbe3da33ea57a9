use anyhow::Context;
use qa_core::{io, paths};
use std::path::Path;

const CONFIG_TEMPLATE: &str = "\
# Quality gate configuration.
#
# layer1: ordered pre-commit checks, run sequentially. A check passes when
# its command exits zero. Mark a check `optional: true` to skip it (rather
# than fail) when the tool is not installed.
layer1:
  - name: lint
    command: npm run lint
  - name: typecheck
    command: npm run typecheck
  - name: test
    command: npm test

# layer2: automated PR reviewers. Each command must print a JSON findings
# object on stdout. Unconfigured providers are skipped.
# layer2:
#   coderabbit:
#     command: coderabbit-report --json
#   quinn:
#     command: quinn-review --json
";

pub fn run(root: &Path) -> anyhow::Result<()> {
    io::ensure_dir(&paths::qa_dir(root)).context("failed to create .qa directory")?;
    let written = io::write_if_missing(&paths::config_path(root), CONFIG_TEMPLATE.as_bytes())
        .context("failed to write default config")?;
    if written {
        println!("✓ Initialized quality gates ({})", paths::CONFIG_FILE);
    } else {
        println!("Quality gates already initialized ({})", paths::CONFIG_FILE);
    }
    Ok(())
}
