use crate::config::DriftConfig;
use crate::graph::GraphSnapshot;
use crate::types::{Issue, IssueDetails, IssueKind, ModuleId, Severity};

/// Node and edge counts of one graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphSize {
    pub nodes: usize,
    pub edges: usize,
}

impl From<&GraphSnapshot> for GraphSize {
    fn from(snapshot: &GraphSnapshot) -> Self {
        Self {
            nodes: snapshot.nodes.len(),
            edges: snapshot.edges.len(),
        }
    }
}

/// Relative change in percent. A zero baseline counts as 0% when nothing
/// changed and 100% otherwise.
pub fn percent_change(previous: usize, current: usize) -> f64 {
    if previous == 0 {
        return if current == 0 { 0.0 } else { 100.0 };
    }
    previous.abs_diff(current) as f64 * 100.0 / previous as f64
}

/// Compare the current graph against the previous run's graph. No previous
/// graph means no drift.
pub fn detect_drift(
    current: GraphSize,
    previous: Option<GraphSize>,
    thresholds: &DriftConfig,
) -> Vec<Issue> {
    let Some(previous) = previous else {
        return Vec::new();
    };

    let node_change_pct = percent_change(previous.nodes, current.nodes);
    let edge_change_pct = percent_change(previous.edges, current.edges);
    let nodes_drifted = node_change_pct > thresholds.node_change_threshold;
    let edges_drifted = edge_change_pct > thresholds.edge_change_threshold;
    if !nodes_drifted && !edges_drifted {
        return Vec::new();
    }

    let mut parts = Vec::new();
    if nodes_drifted {
        parts.push(format!(
            "module count changed from {} to {} ({:+.1}%)",
            previous.nodes,
            current.nodes,
            signed_change(previous.nodes, current.nodes, node_change_pct)
        ));
    }
    if edges_drifted {
        parts.push(format!(
            "dependency count changed from {} to {} ({:+.1}%)",
            previous.edges,
            current.edges,
            signed_change(previous.edges, current.edges, edge_change_pct)
        ));
    }

    vec![Issue {
        kind: IssueKind::ArchitectureDrift,
        severity: Severity::Medium,
        node: ModuleId::workspace(),
        message: format!("Architecture drift since the last analysis: {}", parts.join("; ")),
        suggestion: Some(
            "Review recent structural changes and confirm the new modules and dependencies \
             fit the intended architecture."
                .to_string(),
        ),
        details: IssueDetails::Drift {
            previous_nodes: previous.nodes,
            current_nodes: current.nodes,
            previous_edges: previous.edges,
            current_edges: current.edges,
            node_change_pct,
            edge_change_pct,
        },
    }]
}

fn signed_change(previous: usize, current: usize, pct: f64) -> f64 {
    if current < previous {
        -pct
    } else {
        pct
    }
}
