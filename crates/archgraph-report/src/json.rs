use anyhow::{Context, Result};
use serde::Serialize;

use archgraph_core::metrics::AnalysisResult;
use archgraph_core::types::Severity;

/// Format a full analysis result as JSON.
pub fn format_report(result: &AnalysisResult, compact: bool) -> Result<String> {
    to_json(result, compact).context("failed to serialize analysis result")
}

/// Wrapper for check output that adds pass/fail metadata.
#[derive(Debug, Serialize)]
pub struct CheckOutput<'a> {
    #[serde(flatten)]
    pub result: &'a AnalysisResult,
    pub check: CheckStatus,
}

/// Outcome of gating a result on severity and score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckStatus {
    pub passed: bool,
    pub fail_on: Severity,
    pub failing_issue_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_score: Option<f64>,
    pub score: f64,
}

impl CheckStatus {
    /// Fails when any issue is at or above `fail_on`, or the score is below
    /// `min_score`.
    pub fn evaluate(result: &AnalysisResult, fail_on: Severity, min_score: Option<f64>) -> Self {
        let failing_issue_count = result.issues_at_least(fail_on).count();
        let score = result.metrics.architecture_score;
        let score_ok = min_score.is_none_or(|min| score >= min);
        Self {
            passed: failing_issue_count == 0 && score_ok,
            fail_on,
            failing_issue_count,
            min_score,
            score,
        }
    }
}

/// Format a check result as JSON. Returns (json_string, passed).
pub fn format_check(
    result: &AnalysisResult,
    fail_on: Severity,
    min_score: Option<f64>,
    compact: bool,
) -> Result<(String, bool)> {
    let check = CheckStatus::evaluate(result, fail_on, min_score);
    let passed = check.passed;
    let output = CheckOutput { result, check };
    let json = to_json(&output, compact).context("failed to serialize check output")?;
    Ok((json, passed))
}

fn to_json<T: Serialize>(value: &T, compact: bool) -> serde_json::Result<String> {
    if compact {
        serde_json::to_string(value)
    } else {
        serde_json::to_string_pretty(value)
    }
}
