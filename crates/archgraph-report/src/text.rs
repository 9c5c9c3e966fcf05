use colored::Colorize;

use archgraph_core::metrics::{AnalysisResult, Metrics};
use archgraph_core::types::{IssueDetails, Severity};

use crate::json::CheckStatus;

/// Format a full analysis report for terminal output.
pub fn format_report(result: &AnalysisResult) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "\n{}\n",
        "archgraph - Architecture Analysis".bold()
    ));
    out.push_str(&format!("{}\n\n", "=".repeat(40)));

    out.push_str(&format_score_section(&result.metrics));

    out.push_str(&format!(
        "\n{}: {} modules, {} dependencies, {} cycles ({} scope)\n",
        "Summary".bold(),
        result.metrics.total_modules,
        result.metrics.total_dependencies,
        result.metrics.circular_dependencies,
        result.scope,
    ));
    if result.incomplete {
        out.push_str(&format!(
            "{}\n",
            "Time budget exceeded: some files were not scanned for imports.".yellow()
        ));
    }

    if let Some(ref perf) = result.metrics.performance {
        out.push_str(&format!("\n{}\n{}\n", "Performance".bold(), "-".repeat(40)));
        out.push_str(&format!("  Duration:        {} ms\n", perf.duration_ms));
        out.push_str(&format!("  Files analyzed:  {}\n", perf.files_analyzed));
        out.push_str(&format!("  Files reused:    {}\n", perf.files_reused));
        out.push_str(&format!(
            "  Cache hit ratio: {:.0}%\n",
            perf.cache_hit_ratio * 100.0
        ));
    }

    if result.issues.is_empty() {
        out.push_str(&format!("\n{}\n", "No issues found!".green().bold()));
    } else {
        out.push_str(&format!(
            "\n{} ({} found)\n{}\n",
            "Issues".red().bold(),
            result.issues.len(),
            "-".repeat(40),
        ));

        for issue in &result.issues {
            let kind_label = match &issue.details {
                IssueDetails::Layer {
                    from_layer,
                    to_layer,
                    ..
                } => format!("{} {from_layer} -> {to_layer}", issue.kind),
                _ => issue.kind.to_string(),
            };

            out.push_str(&format!(
                "\n  {} [{}] {}\n",
                severity_label(issue.severity),
                kind_label,
                issue.node,
            ));
            out.push_str(&format!("    {}\n", issue.message));
            if let Some(ref suggestion) = issue.suggestion {
                out.push_str(&format!("    {}: {}\n", "Suggestion".cyan(), suggestion));
            }
        }
    }

    out.push('\n');
    out
}

fn severity_label(severity: Severity) -> String {
    match severity {
        Severity::Critical => "CRITICAL".red().bold().to_string(),
        Severity::High => "HIGH".red().to_string(),
        Severity::Medium => "MEDIUM".yellow().to_string(),
        Severity::Low => "LOW".blue().to_string(),
    }
}

fn format_score_section(metrics: &Metrics) -> String {
    let mut out = String::new();

    let score_str = format!("{:.1}", metrics.architecture_score);
    let score_color = if metrics.architecture_score >= 80.0 {
        score_str.green()
    } else if metrics.architecture_score >= 50.0 {
        score_str.yellow()
    } else {
        score_str.red()
    };

    out.push_str(&format!(
        "{}: {}/100\n",
        "Architecture Score".bold(),
        score_color
    ));
    out.push_str(&format!(
        "  Layer Health:     {:.1}/100\n",
        metrics.layer_health
    ));
    out.push_str(&format!(
        "  Average Coupling: {:.2}\n",
        metrics.avg_coupling
    ));

    out
}

/// Format a check result for CI use. Returns (text, passed).
pub fn format_check(
    result: &AnalysisResult,
    fail_on: Severity,
    min_score: Option<f64>,
) -> (String, bool) {
    let status = CheckStatus::evaluate(result, fail_on, min_score);
    let mut out = format_report(result);

    if status.passed {
        out.push_str(&format!("{}\n", "CHECK PASSED".green().bold()));
    } else {
        if status.failing_issue_count > 0 {
            out.push_str(&format!(
                "{}: {} issue(s) at severity {} or above\n",
                "CHECK FAILED".red().bold(),
                status.failing_issue_count,
                fail_on,
            ));
        }
        if let Some(min) = min_score.filter(|min| status.score < *min) {
            out.push_str(&format!(
                "{}: score {:.1} is below the minimum of {:.1}\n",
                "CHECK FAILED".red().bold(),
                status.score,
                min,
            ));
        }
    }

    (out, status.passed)
}
