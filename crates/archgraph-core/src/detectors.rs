use crate::graph::DependencyGraph;
use crate::layer::LayerClassifier;
use crate::types::{Issue, IssueDetails, IssueKind, ModuleId, Severity};

/// Cycles with more members than this are critical.
const CRITICAL_CYCLE_LEN: usize = 3;

/// One `circular-dependency` issue per strongly connected component of two or
/// more modules.
pub fn detect_circular_dependencies(cycles: &[Vec<ModuleId>]) -> Vec<Issue> {
    cycles
        .iter()
        .filter(|cycle| cycle.len() > 1)
        .map(|cycle| {
            let severity = if cycle.len() > CRITICAL_CYCLE_LEN {
                Severity::Critical
            } else {
                Severity::High
            };
            let mut path: Vec<&str> = cycle.iter().map(|m| m.as_str()).collect();
            path.push(cycle[0].as_str());
            Issue {
                kind: IssueKind::CircularDependency,
                severity,
                node: cycle[0].clone(),
                message: format!(
                    "Circular dependency between {} modules: {}",
                    cycle.len(),
                    path.join(" -> ")
                ),
                suggestion: Some(
                    "Break the cycle by extracting the shared code into a module both sides \
                     can depend on, or by inverting one of the dependencies."
                        .to_string(),
                ),
                details: IssueDetails::Cycle {
                    cycle: cycle.clone(),
                },
            }
        })
        .collect()
}

/// Edges whose source layer does not allow the target layer. Edges touching an
/// unclassified module are never reported.
pub fn detect_layer_violations(graph: &DependencyGraph, classifier: &LayerClassifier) -> Vec<Issue> {
    if classifier.is_empty() {
        return Vec::new();
    }

    let mut issues = Vec::new();
    for (from, to) in graph.edges() {
        // Self-imports are degenerate and never cross a layer.
        if from == to {
            continue;
        }
        let (Some(from_layer), Some(to_layer)) =
            (classifier.classify(from.as_str()), classifier.classify(to.as_str()))
        else {
            continue;
        };
        if from_layer.allows(&to_layer.name) {
            continue;
        }

        let allowed = from_layer.allowed_sorted();
        let suggestion = if allowed.is_empty() {
            format!(
                "Layer '{}' may not depend on other layers. Move the shared code out of '{}' \
                 or into '{}'.",
                from_layer.name, to_layer.name, from_layer.name
            )
        } else {
            format!(
                "Depend on a module in an allowed layer ({}) instead, or move {} into one of them.",
                allowed.join(", "),
                to
            )
        };

        issues.push(Issue {
            kind: IssueKind::LayerViolation,
            severity: Severity::High,
            node: from.clone(),
            message: format!(
                "{from} ({}) depends on {to} ({}), which layer '{}' does not allow",
                from_layer.name, to_layer.name, from_layer.name
            ),
            suggestion: Some(suggestion),
            details: IssueDetails::Layer {
                from_layer: from_layer.name.clone(),
                to_layer: to_layer.name.clone(),
                target: to.clone(),
            },
        });
    }
    issues
}

/// Modules whose fan-in + fan-out exceeds `threshold`.
pub fn detect_high_coupling(graph: &DependencyGraph, threshold: usize) -> Vec<Issue> {
    graph
        .coupling_table()
        .into_iter()
        .filter(|c| c.coupling() > threshold)
        .map(|c| {
            let coupling = c.coupling();
            let severity = if coupling > threshold.saturating_mul(2) {
                Severity::High
            } else {
                Severity::Medium
            };
            Issue {
                kind: IssueKind::HighCoupling,
                severity,
                node: c.id.clone(),
                message: format!(
                    "{} has coupling {coupling} (fan-in {}, fan-out {}), above the limit of {threshold}",
                    c.id, c.fan_in, c.fan_out
                ),
                suggestion: Some(if c.fan_out >= c.fan_in {
                    "Split the module so each part depends on fewer modules.".to_string()
                } else {
                    "Many modules depend on this one; narrow its public surface or split it by \
                     responsibility."
                        .to_string()
                }),
                details: IssueDetails::Coupling {
                    fan_in: c.fan_in,
                    fan_out: c.fan_out,
                    coupling,
                    threshold,
                },
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayerConfig;

    fn id(s: &str) -> ModuleId {
        ModuleId::new(s)
    }

    fn ring(k: usize) -> DependencyGraph {
        let mut graph = DependencyGraph::new();
        for i in 0..k {
            graph.add_dependency(&id(&format!("m{i}.ts")), &id(&format!("m{}.ts", (i + 1) % k)));
        }
        graph
    }

    #[test]
    fn test_cycle_severity_by_length() {
        for k in 2..=6 {
            let graph = ring(k);
            let issues = detect_circular_dependencies(&graph.find_cycles());
            assert_eq!(issues.len(), 1, "ring of {k}");
            let IssueDetails::Cycle { cycle } = &issues[0].details else {
                panic!("expected cycle details");
            };
            assert_eq!(cycle.len(), k);
            let expected = if k > 3 { Severity::Critical } else { Severity::High };
            assert_eq!(issues[0].severity, expected, "ring of {k}");
            assert_eq!(issues[0].kind, IssueKind::CircularDependency);
        }
    }

    #[test]
    fn test_cycle_message_closes_loop() {
        let graph = ring(2);
        let issues = detect_circular_dependencies(&graph.find_cycles());
        assert!(issues[0].message.contains("m0.ts -> m1.ts -> m0.ts"));
        assert_eq!(issues[0].node, id("m0.ts"));
    }

    fn classifier() -> LayerClassifier {
        LayerClassifier::new(&[
            LayerConfig::new("ui", "src/ui/**", &["ui", "services"]),
            LayerConfig::new("services", "src/services/**", &["services", "data"]),
            LayerConfig::new("data", "src/data/**", &["data"]),
        ])
        .unwrap()
    }

    #[test]
    fn test_layer_violation_reported() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency(&id("src/ui/page.tsx"), &id("src/data/db.ts"));
        graph.add_dependency(&id("src/ui/page.tsx"), &id("src/services/user.ts"));

        let issues = detect_layer_violations(&graph, &classifier());
        assert_eq!(issues.len(), 1);
        let issue = &issues[0];
        assert_eq!(issue.kind, IssueKind::LayerViolation);
        assert_eq!(issue.severity, Severity::High);
        assert_eq!(issue.node, id("src/ui/page.tsx"));
        assert_eq!(
            issue.details,
            IssueDetails::Layer {
                from_layer: "ui".to_string(),
                to_layer: "data".to_string(),
                target: id("src/data/db.ts"),
            }
        );
        assert!(issue.suggestion.as_deref().unwrap().contains("services, ui"));
    }

    #[test]
    fn test_inner_layer_depending_outward() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency(&id("src/data/db.ts"), &id("src/ui/theme.ts"));
        let issues = detect_layer_violations(&graph, &classifier());
        assert_eq!(issues.len(), 1);
    }

    #[test]
    fn test_unclassified_nodes_never_named() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency(&id("src/index.ts"), &id("src/data/db.ts"));
        graph.add_dependency(&id("src/data/db.ts"), &id("scripts/seed.ts"));
        graph.add_dependency(&id("src/ui/a.tsx"), &id("tools/x.ts"));

        let issues = detect_layer_violations(&graph, &classifier());
        for unclassified in ["src/index.ts", "scripts/seed.ts", "tools/x.ts"] {
            assert!(issues.iter().all(|i| i.node.as_str() != unclassified
                && !i.message.contains(unclassified)));
        }
        assert!(issues.is_empty());
    }

    #[test]
    fn test_self_import_is_not_a_violation() {
        let classifier = LayerClassifier::new(&[
            LayerConfig::new("ui", "src/ui/**", &["services"]),
            LayerConfig::new("services", "src/services/**", &[]),
        ])
        .unwrap();
        let mut graph = DependencyGraph::new();
        graph.add_dependency(&id("src/ui/page.ts"), &id("src/ui/page.ts"));
        assert!(detect_layer_violations(&graph, &classifier).is_empty());

        graph.add_dependency(&id("src/ui/page.ts"), &id("src/ui/theme.ts"));
        assert_eq!(detect_layer_violations(&graph, &classifier).len(), 1);
    }

    #[test]
    fn test_no_layers_configured() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency(&id("a.ts"), &id("b.ts"));
        let empty = LayerClassifier::new(&[]).unwrap();
        assert!(detect_layer_violations(&graph, &empty).is_empty());
    }

    fn hub(fan_in: usize, fan_out: usize) -> DependencyGraph {
        let mut graph = DependencyGraph::new();
        let hub = id("hub.ts");
        for i in 0..fan_in {
            graph.add_dependency(&id(&format!("in{i}.ts")), &hub);
        }
        for i in 0..fan_out {
            graph.add_dependency(&hub, &id(&format!("out{i}.ts")));
        }
        graph
    }

    #[test]
    fn test_coupling_just_over_threshold_is_medium() {
        let issues = detect_high_coupling(&hub(3, 8), 10);
        assert_eq!(issues.len(), 1);
        let issue = &issues[0];
        assert_eq!(issue.severity, Severity::Medium);
        assert_eq!(issue.node, id("hub.ts"));
        assert_eq!(
            issue.details,
            IssueDetails::Coupling {
                fan_in: 3,
                fan_out: 8,
                coupling: 11,
                threshold: 10,
            }
        );
    }

    #[test]
    fn test_coupling_at_threshold_not_reported() {
        assert!(detect_high_coupling(&hub(2, 8), 10).is_empty());
    }

    #[test]
    fn test_coupling_over_double_threshold_is_high() {
        let issues = detect_high_coupling(&hub(10, 11), 10);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::High);

        let boundary = detect_high_coupling(&hub(10, 10), 10);
        assert_eq!(boundary[0].severity, Severity::Medium);
    }
}
