use crate::config::{CheckDefinition, ProviderConfig};
use crate::record::{CodeRabbitFindings, QuinnFindings};
use crate::status::SubCheckResult;
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::debug;

// ---------------------------------------------------------------------------
// Layer-1 sub-checks
// ---------------------------------------------------------------------------

/// Run one layer-1 sub-check. Any execution failure (spawn error, non-zero
/// exit) is downgraded to a failing result with the error text as message;
/// this function never returns an error, so one broken check cannot abort
/// its siblings.
///
/// No timeout is enforced: a hung linter hangs the whole CLI. Known
/// limitation.
pub fn run_check(root: &Path, def: &CheckDefinition) -> SubCheckResult {
    if def.command.trim().is_empty() {
        return SubCheckResult::failed(&def.name, "check command is empty");
    }
    if def.optional && !binary_available(&def.command) {
        return SubCheckResult::skipped(&def.name, "not installed");
    }
    debug!(check = %def.name, "running sub-check");
    let (passed, output) = execute_shell(&def.command, root);
    if passed {
        SubCheckResult::passed(&def.name, output)
    } else {
        SubCheckResult::failed(&def.name, output)
    }
}

// ---------------------------------------------------------------------------
// Layer-2 providers
// ---------------------------------------------------------------------------

/// Run the CodeRabbit provider command. Expects a JSON object with severity
/// buckets (`{"critical": n, "high": n, "medium": n, "low": n}`) on stdout.
/// Passes when the command exits zero and no critical or high findings
/// exist.
pub fn run_coderabbit(
    root: &Path,
    provider: &ProviderConfig,
) -> (SubCheckResult, Option<CodeRabbitFindings>) {
    let (exited_ok, output) = execute_shell(&provider.command, root);
    if !exited_ok {
        return (SubCheckResult::failed("coderabbit", output), None);
    }
    match serde_json::from_str::<CodeRabbitFindings>(&output) {
        Ok(findings) => {
            let blocking = findings.critical() + findings.high();
            let message = format!("{} findings ({} blocking)", findings.findings_count(), blocking);
            let result = if blocking == 0 {
                SubCheckResult::passed("coderabbit", message)
            } else {
                SubCheckResult::failed("coderabbit", message)
            };
            (result, Some(findings))
        }
        Err(e) => (
            SubCheckResult::failed("coderabbit", format!("unparseable provider output: {e}")),
            None,
        ),
    }
}

/// Run the Quinn provider command. Expects
/// `{"findings_count": n, "top_categories": [..]}` on stdout. Quinn is
/// advisory: the sub-check passes whenever the command exits zero and its
/// output parses.
pub fn run_quinn(root: &Path, provider: &ProviderConfig) -> (SubCheckResult, Option<QuinnFindings>) {
    let (exited_ok, output) = execute_shell(&provider.command, root);
    if !exited_ok {
        return (SubCheckResult::failed("quinn", output), None);
    }
    match serde_json::from_str::<QuinnFindings>(&output) {
        Ok(findings) => {
            let message = if findings.top_categories.is_empty() {
                format!("{} findings", findings.findings_count)
            } else {
                format!(
                    "{} findings ({})",
                    findings.findings_count,
                    findings.top_categories.join(", ")
                )
            };
            (SubCheckResult::passed("quinn", message), Some(findings))
        }
        Err(e) => (
            SubCheckResult::failed("quinn", format!("unparseable provider output: {e}")),
            None,
        ),
    }
}

// ---------------------------------------------------------------------------
// Shell execution
// ---------------------------------------------------------------------------

/// Execute a shell command, returning (success, combined output).
///
/// Stdout and stderr are drained on dedicated threads to avoid pipe-buffer
/// deadlocks with chatty tools.
fn execute_shell(command: &str, cwd: &Path) -> (bool, String) {
    let mut child = match Command::new("sh")
        .arg("-c")
        .arg(command)
        .current_dir(cwd)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
    {
        Ok(c) => c,
        Err(e) => return (false, format!("failed to spawn: {e}")),
    };

    let stdout_handle = child.stdout.take();
    let stderr_handle = child.stderr.take();

    let stdout_thread = std::thread::spawn(move || -> String {
        let mut buf = String::new();
        if let Some(mut r) = stdout_handle {
            use std::io::Read;
            let _ = r.read_to_string(&mut buf);
        }
        buf
    });
    let stderr_thread = std::thread::spawn(move || -> String {
        let mut buf = String::new();
        if let Some(mut r) = stderr_handle {
            use std::io::Read;
            let _ = r.read_to_string(&mut buf);
        }
        buf
    });

    let status = match child.wait() {
        Ok(s) => s,
        Err(e) => return (false, format!("wait failed: {e}")),
    };

    let stdout_buf = stdout_thread.join().unwrap_or_default();
    let stderr_buf = stderr_thread.join().unwrap_or_default();
    format_output(status.success(), &stdout_buf, &stderr_buf)
}

/// Combine stdout/stderr and cap to 10KB (keeping the tail).
fn format_output(success: bool, stdout: &str, stderr: &str) -> (bool, String) {
    let output = if stderr.is_empty() {
        stdout.to_string()
    } else if stdout.is_empty() {
        stderr.to_string()
    } else {
        format!("{stdout}\n{stderr}")
    };
    const MAX_OUTPUT: usize = 10 * 1024;
    let trimmed = output.trim();
    let capped = if trimmed.len() > MAX_OUTPUT {
        // Snap the cut to a char boundary; tools emit multi-byte UTF-8.
        let mut start = trimmed.len() - MAX_OUTPUT;
        while !trimmed.is_char_boundary(start) {
            start += 1;
        }
        &trimmed[start..]
    } else {
        trimmed
    };
    (success, capped.to_string())
}

/// True when the command's first token resolves on PATH. Shell builtins and
/// paths with slashes are assumed available.
fn binary_available(command: &str) -> bool {
    let Some(first) = command.split_whitespace().next() else {
        return false;
    };
    if first.contains('/') {
        return Path::new(first).exists();
    }
    const BUILTINS: &[&str] = &["true", "false", "echo", "test", "cd", "exit", "["];
    if BUILTINS.contains(&first) {
        return true;
    }
    which::which(first).is_ok()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn check(name: &str, command: &str) -> CheckDefinition {
        CheckDefinition::new(name, command)
    }

    #[test]
    fn passing_command_passes() {
        let dir = TempDir::new().unwrap();
        let result = run_check(dir.path(), &check("ok", "true"));
        assert!(result.pass);
        assert!(!result.skipped);
    }

    #[test]
    fn failing_command_fails_with_output() {
        let dir = TempDir::new().unwrap();
        let result = run_check(dir.path(), &check("bad", "echo 'lint error' >&2 && false"));
        assert!(!result.pass);
        assert_eq!(result.message, "lint error");
    }

    #[test]
    fn empty_command_fails() {
        let dir = TempDir::new().unwrap();
        let result = run_check(dir.path(), &check("bad", "  "));
        assert!(!result.pass);
        assert!(result.message.contains("empty"));
    }

    #[test]
    fn optional_check_with_missing_tool_is_skipped() {
        let dir = TempDir::new().unwrap();
        let mut def = check("exotic", "definitely-not-a-real-binary-zzz --flag");
        def.optional = true;
        let result = run_check(dir.path(), &def);
        assert!(result.skipped);
        assert!(result.pass);
    }

    #[test]
    fn required_check_with_missing_tool_fails() {
        let dir = TempDir::new().unwrap();
        let result = run_check(dir.path(), &check("gone", "definitely-not-a-real-binary-zzz"));
        assert!(!result.pass);
        assert!(!result.skipped);
    }

    #[test]
    fn output_cap_cuts_on_char_boundary() {
        // 4000 three-byte chars: 12000 bytes, and 10KB is not a multiple
        // of three, so a byte-indexed cut would land mid-char.
        let long = "€".repeat(4000);
        let (success, capped) = format_output(true, &long, "");
        assert!(success);
        assert!(capped.len() <= 10 * 1024);
        assert!(capped.chars().all(|c| c == '€'));
    }

    #[test]
    fn large_multibyte_output_does_not_abort_the_check() {
        let dir = TempDir::new().unwrap();
        let result = run_check(
            dir.path(),
            &check("noisy", "printf '€%.0s' $(seq 1 4000)"),
        );
        assert!(result.pass);
        assert!(result.message.chars().all(|c| c == '€'));
    }

    #[test]
    fn check_captures_stdout() {
        let dir = TempDir::new().unwrap();
        let result = run_check(dir.path(), &check("echo", "echo hello"));
        assert!(result.pass);
        assert_eq!(result.message, "hello");
    }

    #[test]
    fn coderabbit_clean_report_passes() {
        let dir = TempDir::new().unwrap();
        let provider = ProviderConfig {
            command: r#"echo '{"critical":0,"high":0,"medium":2,"low":1}'"#.to_string(),
        };
        let (result, findings) = run_coderabbit(dir.path(), &provider);
        assert!(result.pass);
        assert_eq!(findings.unwrap().findings_count(), 3);
    }

    #[test]
    fn coderabbit_blocking_findings_fail() {
        let dir = TempDir::new().unwrap();
        let provider = ProviderConfig {
            command: r#"echo '{"critical":1,"high":0,"medium":0,"low":0}'"#.to_string(),
        };
        let (result, findings) = run_coderabbit(dir.path(), &provider);
        assert!(!result.pass);
        assert_eq!(findings.unwrap().critical(), 1);
    }

    #[test]
    fn coderabbit_garbage_output_fails_without_findings() {
        let dir = TempDir::new().unwrap();
        let provider = ProviderConfig {
            command: "echo not-json".to_string(),
        };
        let (result, findings) = run_coderabbit(dir.path(), &provider);
        assert!(!result.pass);
        assert!(findings.is_none());
    }

    #[test]
    fn quinn_is_advisory() {
        let dir = TempDir::new().unwrap();
        let provider = ProviderConfig {
            command: r#"echo '{"findings_count":4,"top_categories":["naming","tests"]}'"#
                .to_string(),
        };
        let (result, findings) = run_quinn(dir.path(), &provider);
        assert!(result.pass);
        assert!(result.message.contains("naming"));
        assert_eq!(findings.unwrap().findings_count, 4);
    }

    #[test]
    fn quinn_command_failure_fails() {
        let dir = TempDir::new().unwrap();
        let provider = ProviderConfig {
            command: "false".to_string(),
        };
        let (result, findings) = run_quinn(dir.path(), &provider);
        assert!(!result.pass);
        assert!(findings.is_none());
    }
}
