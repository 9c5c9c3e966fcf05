use std::collections::{HashMap, HashSet};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};

use crate::types::ModuleId;

/// Serialized form of an edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub from: ModuleId,
    pub to: ModuleId,
}

/// Serialized graph stored in an analysis result: nodes, edges and cycles.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub nodes: Vec<ModuleId>,
    pub edges: Vec<EdgeRecord>,
    pub cycles: Vec<Vec<ModuleId>>,
}

/// Fan-in and fan-out of one module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeCoupling {
    pub id: ModuleId,
    pub fan_in: usize,
    pub fan_out: usize,
}

impl NodeCoupling {
    pub fn coupling(&self) -> usize {
        self.fan_in + self.fan_out
    }
}

/// Directed module dependency graph for one analysis run.
///
/// Nodes and edges keep insertion order, and a `(from, to)` pair is stored at
/// most once.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    graph: DiGraph<ModuleId, ()>,
    index: HashMap<ModuleId, NodeIndex>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold modules and their resolved targets into a graph. Modules are added
    /// first, so node order follows `modules` even when an earlier file points
    /// at a later one.
    pub fn build<'a, I>(modules: &[ModuleId], edges: I) -> Self
    where
        I: IntoIterator<Item = (&'a ModuleId, &'a [ModuleId])>,
    {
        let mut graph = Self::new();
        for id in modules {
            graph.add_module(id);
        }
        for (from, targets) in edges {
            for to in targets {
                graph.add_dependency(from, to);
            }
        }
        graph
    }

    /// Add a module as a node. Returns the existing index for known modules.
    pub fn add_module(&mut self, id: &ModuleId) -> NodeIndex {
        if let Some(&idx) = self.index.get(id) {
            return idx;
        }
        let idx = self.graph.add_node(id.clone());
        self.index.insert(id.clone(), idx);
        idx
    }

    /// Add an edge, creating missing endpoints. Returns false if the edge
    /// already existed.
    pub fn add_dependency(&mut self, from: &ModuleId, to: &ModuleId) -> bool {
        let from_idx = self.add_module(from);
        let to_idx = self.add_module(to);
        if self.graph.find_edge(from_idx, to_idx).is_some() {
            return false;
        }
        self.graph.add_edge(from_idx, to_idx, ());
        true
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Modules in insertion order.
    pub fn modules(&self) -> impl Iterator<Item = &ModuleId> {
        self.graph.node_indices().map(move |idx| &self.graph[idx])
    }

    /// Edges in insertion order.
    pub fn edges(&self) -> Vec<(&ModuleId, &ModuleId)> {
        self.graph
            .edge_references()
            .map(|e| (&self.graph[e.source()], &self.graph[e.target()]))
            .collect()
    }

    pub fn fan_in(&self, id: &ModuleId) -> usize {
        self.degree(id, Direction::Incoming)
    }

    pub fn fan_out(&self, id: &ModuleId) -> usize {
        self.degree(id, Direction::Outgoing)
    }

    fn degree(&self, id: &ModuleId, direction: Direction) -> usize {
        self.index
            .get(id)
            .map(|&idx| self.graph.edges_directed(idx, direction).count())
            .unwrap_or(0)
    }

    /// Fan-in/fan-out for every module, in insertion order.
    pub fn coupling_table(&self) -> Vec<NodeCoupling> {
        self.graph
            .node_indices()
            .map(|idx| NodeCoupling {
                id: self.graph[idx].clone(),
                fan_in: self.graph.edges_directed(idx, Direction::Incoming).count(),
                fan_out: self.graph.edges_directed(idx, Direction::Outgoing).count(),
            })
            .collect()
    }

    /// Strongly connected components with two or more members.
    ///
    /// Each cycle starts at its smallest identifier and follows successors in
    /// identifier order, so a simple cycle is listed in path order. Cycles are
    /// sorted by their first member. Self-loops never form a cycle.
    pub fn find_cycles(&self) -> Vec<Vec<ModuleId>> {
        let mut cycles: Vec<Vec<ModuleId>> = petgraph::algo::tarjan_scc(&self.graph)
            .into_iter()
            .filter(|scc| scc.len() > 1)
            .map(|scc| self.order_cycle(&scc))
            .collect();
        cycles.sort();
        cycles
    }

    fn order_cycle(&self, members: &[NodeIndex]) -> Vec<ModuleId> {
        let in_scc: HashSet<NodeIndex> = members.iter().copied().collect();
        let Some(&start) = members.iter().min_by_key(|&&idx| &self.graph[idx]) else {
            return Vec::new();
        };

        let mut order = Vec::with_capacity(members.len());
        let mut visited = HashSet::new();
        let mut stack = vec![start];
        while let Some(node) = stack.pop() {
            if !visited.insert(node) {
                continue;
            }
            order.push(self.graph[node].clone());
            let mut next: Vec<NodeIndex> = self
                .graph
                .neighbors_directed(node, Direction::Outgoing)
                .filter(|n| in_scc.contains(n) && !visited.contains(n))
                .collect();
            // Reverse order so the smallest successor is popped first.
            next.sort_by(|a, b| self.graph[*b].cmp(&self.graph[*a]));
            stack.extend(next);
        }
        order
    }

    /// Serializable view of the graph with its cycles.
    pub fn snapshot(&self) -> GraphSnapshot {
        self.snapshot_with_cycles(self.find_cycles())
    }

    pub fn snapshot_with_cycles(&self, cycles: Vec<Vec<ModuleId>>) -> GraphSnapshot {
        GraphSnapshot {
            nodes: self.modules().cloned().collect(),
            edges: self
                .edges()
                .into_iter()
                .map(|(from, to)| EdgeRecord {
                    from: from.clone(),
                    to: to.clone(),
                })
                .collect(),
            cycles,
        }
    }
}
