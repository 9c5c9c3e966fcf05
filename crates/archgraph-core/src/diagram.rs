use std::collections::HashMap;
use std::path::Path;

use crate::graph::GraphSnapshot;
use crate::types::ModuleId;

/// Text diagram formats supported by visualization export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagramFormat {
    Dot,
    Mermaid,
}

impl DiagramFormat {
    /// Mermaid for `.mmd` / `.mermaid`, DOT otherwise.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("mmd") || ext.eq_ignore_ascii_case("mermaid") => {
                DiagramFormat::Mermaid
            }
            _ => DiagramFormat::Dot,
        }
    }
}

/// Render `graph` limited to its first `max_nodes` nodes.
pub fn render(graph: &GraphSnapshot, format: DiagramFormat, max_nodes: usize) -> String {
    let view = DiagramView::new(graph, max_nodes);
    match format {
        DiagramFormat::Dot => view.dot(),
        DiagramFormat::Mermaid => view.mermaid(),
    }
}

/// Nodes and edges that survive the node cap, with cycle membership.
struct DiagramView<'a> {
    nodes: Vec<&'a ModuleId>,
    edges: Vec<(usize, usize, bool)>,
    omitted: usize,
}

impl<'a> DiagramView<'a> {
    fn new(graph: &'a GraphSnapshot, max_nodes: usize) -> Self {
        let nodes: Vec<&ModuleId> = graph.nodes.iter().take(max_nodes).collect();
        let ids: HashMap<&ModuleId, usize> =
            nodes.iter().enumerate().map(|(i, &m)| (m, i)).collect();

        let mut cycle_of: HashMap<&ModuleId, usize> = HashMap::new();
        for (i, cycle) in graph.cycles.iter().enumerate() {
            for member in cycle {
                cycle_of.insert(member, i);
            }
        }

        let edges = graph
            .edges
            .iter()
            .filter_map(|e| {
                let from = *ids.get(&e.from)?;
                let to = *ids.get(&e.to)?;
                let in_cycle = matches!(
                    (cycle_of.get(&e.from), cycle_of.get(&e.to)),
                    (Some(a), Some(b)) if a == b
                );
                Some((from, to, in_cycle))
            })
            .collect();

        Self {
            omitted: graph.nodes.len().saturating_sub(nodes.len()),
            nodes,
            edges,
        }
    }

    fn dot(&self) -> String {
        let mut out = String::new();
        out.push_str("digraph dependencies {\n");
        out.push_str("  rankdir=LR;\n");
        out.push_str("  node [shape=box];\n\n");

        for (i, node) in self.nodes.iter().enumerate() {
            out.push_str(&format!("  n{i} [label=\"{}\"];\n", escape_label(node.as_str())));
        }
        if self.omitted > 0 {
            out.push_str(&format!("  // {} more modules omitted\n", self.omitted));
        }
        out.push('\n');

        for &(from, to, in_cycle) in &self.edges {
            if in_cycle {
                out.push_str(&format!("  n{from} -> n{to} [color=red, label=\"cycle\"];\n"));
            } else {
                out.push_str(&format!("  n{from} -> n{to};\n"));
            }
        }

        out.push_str("}\n");
        out
    }

    fn mermaid(&self) -> String {
        let mut out = String::new();
        out.push_str("graph LR\n");

        for (i, node) in self.nodes.iter().enumerate() {
            out.push_str(&format!("  n{i}[\"{}\"]\n", escape_label(node.as_str())));
        }
        if self.omitted > 0 {
            out.push_str(&format!("  %% {} more modules omitted\n", self.omitted));
        }

        for &(from, to, in_cycle) in &self.edges {
            if in_cycle {
                out.push_str(&format!("  n{from} -.->|cycle| n{to}\n"));
            } else {
                out.push_str(&format!("  n{from} --> n{to}\n"));
            }
        }
        out
    }
}

fn escape_label(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}
