//! Terminal output formatting with colors and box drawing.

use colored::Colorize;

use crate::result::{Outcome, Report};

/// Format a [`Report`] for human-readable terminal output.
pub fn format_report(report: &Report) -> String {
    let mut out = String::new();

    let header = match report.outcome {
        Outcome::Pass => format!("{} {}", "\u{2713}".green().bold(), "PASS".green().bold()),
        Outcome::Fail => format!(
            "{} {}",
            "\u{2717}".red().bold(),
            "SAFETY VIOLATION".red().bold()
        ),
        Outcome::Aborted => format!(
            "{} {}",
            "\u{26A0}".yellow().bold(),
            "ABORTED".yellow().bold()
        ),
    };

    out.push_str(&box_top());
    out.push_str(&box_line(&header));
    out.push_str(&box_separator());

    let meta = &report.metadata;
    out.push_str(&box_line(&format!(
        "Samples: {} (N total {})",
        meta.samples, meta.n_sum
    )));
    out.push_str(&box_line(&format!(
        "Elapsed: {:.1} ms",
        meta.elapsed.as_secs_f64() * 1e3
    )));
    let probe = if meta.probe_active {
        meta.probe_mode.to_string().normal()
    } else {
        "inactive".yellow()
    };
    out.push_str(&box_line(&format!("Memory probe: {probe}")));
    let pinned = if meta.pinned { "yes" } else { "no" };
    out.push_str(&box_line(&format!("Pinned: {pinned}")));

    if report.outcome != Outcome::Aborted {
        let r = &report.result;
        out.push_str(&box_separator());
        out.push_str(&box_line(&"Per N:".bold().to_string()));
        out.push_str(&box_line(&format!(
            "  Measured allocs: {} B",
            r.mean_measured_allocs_per_n
        )));
        out.push_str(&box_line(&format!(
            "  Declared allocs: {} B",
            r.mean_declared_allocs_per_n
        )));
        out.push_str(&box_line(&format!(
            "  Declared steps:  {}",
            r.mean_execution_steps_per_n
        )));
        let growth = if r.cpu_growth_flag {
            "dangerous".red().to_string()
        } else {
            "ok".green().to_string()
        };
        out.push_str(&box_line(&format!("CPU growth: {growth}")));
    }

    if !report.errors.is_empty() {
        out.push_str(&box_separator());
        out.push_str(&box_line(&"Failures:".bold().to_string()));
        for error in &report.errors {
            for chunk in wrap(error, BOX_WIDTH - 6) {
                out.push_str(&box_line(&format!("  {}", chunk.red())));
            }
        }
    }

    out.push_str(&box_bottom());
    out
}

/// Split `text` into chunks of at most `width` characters on word boundaries.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();
    for word in text.split_whitespace() {
        if !line.is_empty() && line.chars().count() + 1 + word.chars().count() > width {
            lines.push(std::mem::take(&mut line));
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(word);
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

// Box drawing helpers

const BOX_WIDTH: usize = 60;

fn box_top() -> String {
    format!("\u{250C}{}\u{2510}\n", "\u{2500}".repeat(BOX_WIDTH))
}

fn box_bottom() -> String {
    format!("\u{2514}{}\u{2518}\n", "\u{2500}".repeat(BOX_WIDTH))
}

fn box_separator() -> String {
    format!("\u{251C}{}\u{2524}\n", "\u{2500}".repeat(BOX_WIDTH))
}

fn box_line(content: &str) -> String {
    let visible = strip_ansi_codes(content).chars().count();
    let padding = (BOX_WIDTH - 2).saturating_sub(visible);
    format!("\u{2502} {}{} \u{2502}\n", content, " ".repeat(padding))
}

/// Remove ANSI escape sequences so padding can be computed on visible text.
fn strip_ansi_codes(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_escape = false;
    for c in s.chars() {
        match (in_escape, c) {
            (false, '\x1b') => in_escape = true,
            (false, _) => out.push(c),
            (true, 'm') => in_escape = false,
            (true, _) => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::measurement::ProbeMode;
    use crate::result::{Metadata, VerificationResult, Violation};

    fn report(outcome: Outcome, errors: Vec<String>) -> Report {
        Report {
            outcome,
            result: VerificationResult {
                mean_measured_allocs_per_n: 4,
                mean_declared_allocs_per_n: 4,
                mean_execution_steps_per_n: 1,
                cpu_growth_flag: false,
                failures: if errors.is_empty() {
                    Vec::new()
                } else {
                    vec![Violation::UndeclaredCpuGrowth]
                },
            },
            metadata: Metadata {
                samples: 12,
                n_sum: 4095,
                elapsed: Duration::from_millis(3),
                probe_mode: ProbeMode::Precise,
                probe_active: true,
                pinned: true,
            },
            errors,
            logs: Vec::new(),
        }
    }

    #[test]
    fn test_format_pass() {
        let text = strip_ansi_codes(&format_report(&report(Outcome::Pass, Vec::new())));
        assert!(text.contains("PASS"));
        assert!(text.contains("Samples: 12 (N total 4095)"));
        assert!(text.contains("Measured allocs: 4 B"));
        assert!(text.contains("precise"));
        assert!(!text.contains("Failures"));
    }

    #[test]
    fn test_format_fail_lists_messages() {
        let msg = "execution uses CPU time not accounted for by declared steps".to_string();
        let text = strip_ansi_codes(&format_report(&report(Outcome::Fail, vec![msg])));
        assert!(text.contains("SAFETY VIOLATION"));
        assert!(text.contains("Failures:"));
        assert!(text.contains("not accounted for"));
    }

    #[test]
    fn test_box_lines_have_equal_width() {
        let text = strip_ansi_codes(&format_report(&report(Outcome::Pass, Vec::new())));
        let widths: Vec<usize> = text.lines().map(|l| l.chars().count()).collect();
        assert!(widths.iter().all(|&w| w == BOX_WIDTH + 2), "{widths:?}");
    }

    #[test]
    fn test_strip_ansi_codes() {
        assert_eq!(strip_ansi_codes("\x1b[1;32mPASS\x1b[0m ok"), "PASS ok");
    }

    #[test]
    fn test_wrap() {
        assert_eq!(wrap("aa bb cc", 5), vec!["aa bb", "cc"]);
        assert!(wrap("", 5).is_empty());
    }
}
