use qa_core::status::LayerStatus;
use serde::Serialize;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}

/// `1234` ms renders as `1.2s`.
pub fn format_duration(duration_ms: u64) -> String {
    format!("{:.1}s", duration_ms as f64 / 1000.0)
}

/// One-line summary for a layer, e.g. `Layer 1: ✅ Passed (1.2s)`.
pub fn layer_line(n: u8, status: Option<&LayerStatus>) -> String {
    match status {
        None => format!("Layer {n}: not run"),
        Some(s) => match s.pass {
            Some(true) => format!("Layer {n}: ✅ Passed ({})", format_duration(s.duration_ms)),
            Some(false) => format!("Layer {n}: ❌ Failed ({})", format_duration(s.duration_ms)),
            None => format!("Layer {n}: ⏳ Pending sign-off"),
        },
    }
}

/// Detail lines for a layer's sub-checks, indented for nesting under the
/// layer line.
pub fn sub_check_lines(status: &LayerStatus) -> Vec<String> {
    status
        .results
        .iter()
        .map(|r| {
            let mark = if r.skipped {
                "⏭"
            } else if r.pass {
                "✅"
            } else {
                "❌"
            };
            if r.message.is_empty() {
                format!("  {mark} {}", r.check)
            } else {
                format!("  {mark} {}: {}", r.check, truncate(&r.message, 120))
            }
        })
        .collect()
}

fn truncate(s: &str, max: usize) -> String {
    let first_line = s.lines().next().unwrap_or("");
    if first_line.chars().count() > max {
        let cut: String = first_line.chars().take(max - 3).collect();
        format!("{cut}...")
    } else {
        first_line.to_string()
    }
}

pub fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.len());
            }
        }
    }

    let header_row: Vec<String> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| format!("{:width$}", h, width = widths[i]))
        .collect();
    println!("{}", header_row.join("  "));

    let sep: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    println!("{}", sep.join("  "));

    for row in &rows {
        let cells: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let w = widths.get(i).copied().unwrap_or(0);
                format!("{:width$}", cell, width = w)
            })
            .collect();
        println!("{}", cells.join("  "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qa_core::status::SubCheckResult;

    #[test]
    fn duration_renders_with_one_decimal() {
        assert_eq!(format_duration(1200), "1.2s");
        assert_eq!(format_duration(0), "0.0s");
        assert_eq!(format_duration(61_500), "61.5s");
    }

    #[test]
    fn layer_line_variants() {
        assert_eq!(layer_line(2, None), "Layer 2: not run");
        let passed = LayerStatus {
            pass: Some(true),
            duration_ms: 1200,
            results: vec![],
        };
        assert_eq!(layer_line(1, Some(&passed)), "Layer 1: ✅ Passed (1.2s)");
        let pending = LayerStatus {
            pass: None,
            duration_ms: 0,
            results: vec![],
        };
        assert_eq!(layer_line(3, Some(&pending)), "Layer 3: ⏳ Pending sign-off");
    }

    #[test]
    fn sub_check_lines_mark_outcomes() {
        let status = LayerStatus {
            pass: Some(false),
            duration_ms: 10,
            results: vec![
                SubCheckResult::passed("lint", ""),
                SubCheckResult::failed("test", "2 tests failed"),
                SubCheckResult::skipped("quinn", "not configured"),
            ],
        };
        let lines = sub_check_lines(&status);
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("✅ lint"));
        assert!(lines[1].contains("❌ test: 2 tests failed"));
        assert!(lines[2].contains("⏭ quinn"));
    }
}
