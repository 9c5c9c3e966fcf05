use serde::{Deserialize, Serialize};

use crate::graph::{DependencyGraph, GraphSnapshot};
use crate::types::{Issue, IssueKind, Scope, Severity};

const CRITICAL_PENALTY: f64 = 20.0;
const HIGH_PENALTY: f64 = 10.0;
const MEDIUM_PENALTY: f64 = 5.0;

/// Wall-clock and cache telemetry for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceTelemetry {
    pub duration_ms: u64,
    pub files_analyzed: usize,
    /// Files whose edges were carried over from the cached result.
    pub files_reused: usize,
    pub cache_hit_ratio: f64,
}

/// Scorecard reduced from the graph and the detector output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub total_modules: usize,
    pub total_dependencies: usize,
    pub circular_dependencies: usize,
    pub avg_coupling: f64,
    pub layer_health: f64,
    pub architecture_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performance: Option<PerformanceTelemetry>,
}

/// Full output of one analysis run; the unit that is cached and compared for
/// drift.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub issues: Vec<Issue>,
    pub metrics: Metrics,
    pub graph: GraphSnapshot,
    /// RFC 3339 timestamp.
    pub timestamp: String,
    #[serde(default)]
    pub scope: Scope,
    /// Set when a time budget stopped extraction early.
    #[serde(default, skip_serializing_if = "is_false")]
    pub incomplete: bool,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl AnalysisResult {
    pub fn issues_of(&self, kind: IssueKind) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(move |i| i.kind == kind)
    }

    /// Issues at or above `severity`.
    pub fn issues_at_least(&self, severity: Severity) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(move |i| i.severity >= severity)
    }
}

/// `max(0, 100 − (critical×20 + high×10 + medium×5))`. Low issues are free.
pub fn architecture_score(issues: &[Issue]) -> f64 {
    let penalty: f64 = issues
        .iter()
        .map(|i| match i.severity {
            Severity::Critical => CRITICAL_PENALTY,
            Severity::High => HIGH_PENALTY,
            Severity::Medium => MEDIUM_PENALTY,
            Severity::Low => 0.0,
        })
        .sum();
    (100.0 - penalty).max(0.0)
}

/// `max(0, 100 − violations / modules × 100)`, or 100 for an empty graph.
pub fn layer_health(violations: usize, total_modules: usize) -> f64 {
    if total_modules == 0 {
        return 100.0;
    }
    (100.0 - violations as f64 / total_modules as f64 * 100.0).max(0.0)
}

/// Mean of fan-in + fan-out across modules, or 0 for an empty graph.
pub fn average_coupling(graph: &DependencyGraph) -> f64 {
    let total_modules = graph.node_count();
    if total_modules == 0 {
        return 0.0;
    }
    let total: usize = graph.coupling_table().iter().map(|c| c.coupling()).sum();
    total as f64 / total_modules as f64
}

/// Reduce graph statistics and issues into a scorecard.
pub fn aggregate(
    graph: &DependencyGraph,
    cycles: usize,
    issues: &[Issue],
    performance: Option<PerformanceTelemetry>,
) -> Metrics {
    let violations = issues
        .iter()
        .filter(|i| i.kind == IssueKind::LayerViolation)
        .count();
    Metrics {
        total_modules: graph.node_count(),
        total_dependencies: graph.edge_count(),
        circular_dependencies: cycles,
        avg_coupling: average_coupling(graph),
        layer_health: layer_health(violations, graph.node_count()),
        architecture_score: architecture_score(issues),
        performance,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{IssueDetails, ModuleId};

    fn issue(kind: IssueKind, severity: Severity) -> Issue {
        Issue {
            kind,
            severity,
            node: ModuleId::new("a.ts"),
            message: String::new(),
            suggestion: None,
            details: IssueDetails::Cycle { cycle: vec![] },
        }
    }

    #[test]
    fn test_perfect_score_no_issues() {
        assert_eq!(architecture_score(&[]), 100.0);
    }

    #[test]
    fn test_score_mixed_severities() {
        let mut issues = vec![issue(IssueKind::CircularDependency, Severity::Critical)];
        issues.extend((0..2).map(|_| issue(IssueKind::LayerViolation, Severity::High)));
        issues.extend((0..3).map(|_| issue(IssueKind::HighCoupling, Severity::Medium)));
        issues.push(issue(IssueKind::HighCoupling, Severity::Low));
        assert_eq!(architecture_score(&issues), 45.0);
    }

    #[test]
    fn test_score_clamped_at_zero() {
        let issues: Vec<_> = (0..6)
            .map(|_| issue(IssueKind::CircularDependency, Severity::Critical))
            .collect();
        assert_eq!(architecture_score(&issues), 0.0);
    }

    #[test]
    fn test_layer_health() {
        assert_eq!(layer_health(0, 0), 100.0);
        assert_eq!(layer_health(0, 10), 100.0);
        assert_eq!(layer_health(2, 10), 80.0);
        assert_eq!(layer_health(30, 10), 0.0);
    }

    #[test]
    fn test_average_coupling_empty_graph() {
        let graph = DependencyGraph::new();
        assert_eq!(average_coupling(&graph), 0.0);
        let metrics = aggregate(&graph, 0, &[], None);
        assert_eq!(metrics.total_modules, 0);
        assert_eq!(metrics.avg_coupling, 0.0);
        assert_eq!(metrics.layer_health, 100.0);
        assert!(!metrics.avg_coupling.is_nan());
    }

    #[test]
    fn test_aggregate() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency(&ModuleId::new("a.ts"), &ModuleId::new("b.ts"));
        graph.add_dependency(&ModuleId::new("b.ts"), &ModuleId::new("a.ts"));
        graph.add_module(&ModuleId::new("c.ts"));

        let issues = vec![
            issue(IssueKind::CircularDependency, Severity::High),
            issue(IssueKind::LayerViolation, Severity::High),
        ];
        let metrics = aggregate(&graph, 1, &issues, None);
        assert_eq!(metrics.total_modules, 3);
        assert_eq!(metrics.total_dependencies, 2);
        assert_eq!(metrics.circular_dependencies, 1);
        assert!((metrics.avg_coupling - 4.0 / 3.0).abs() < 1e-9);
        assert!((metrics.layer_health - (100.0 - 100.0 / 3.0)).abs() < 1e-9);
        assert_eq!(metrics.architecture_score, 80.0);
    }
}
