//! Immutable adjacency-list graph over a pipeline config
//!
//! Nodes and edges are stored in arenas and addressed by index; the string
//! ids supplied by the config loader are only used at the boundary through
//! a lookup table. The graph is built in one pass and never mutated.

use std::collections::{BTreeSet, HashMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::types::{EdgeType, NodeCategory, NodeId, PipelineConfig, PipelineNode};

/// Index of a node in the graph arena
pub(crate) type NodeIndex = usize;

/// A resolved edge between two arena nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct GraphEdge {
    pub from: NodeIndex,
    pub to: NodeIndex,
    pub edge_type: EdgeType,
}

/// Result of a topological sort
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopologicalOrder {
    /// Node ids ordered parents-first; empty when a cycle exists
    pub order: Vec<NodeId>,
    /// Whether the graph contains a cycle
    pub has_cycle: bool,
    /// Nodes that Kahn's algorithm could not place (cycle members and
    /// everything downstream of them), in config order
    pub unsorted: Vec<NodeId>,
}

/// Read-only pipeline graph
#[derive(Debug, Clone)]
pub struct PipelineGraph {
    name: String,
    version: String,
    nodes: Vec<PipelineNode>,
    index: HashMap<NodeId, NodeIndex>,
    edges: Vec<GraphEdge>,
    /// Outgoing edge indices per node, in config order
    outgoing: Vec<Vec<usize>>,
    /// Incoming edge indices per node, in config order
    incoming: Vec<Vec<usize>>,
}

impl PipelineGraph {
    /// Build a graph from a pipeline config
    ///
    /// Fails fast on loader-level problems: unknown node kinds, malformed
    /// properties, duplicate ids, and edges naming missing nodes.
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        let mut nodes = Vec::with_capacity(config.nodes.len());
        let mut index = HashMap::with_capacity(config.nodes.len());

        for config_node in &config.nodes {
            let node = PipelineNode::from_config(config_node)?;
            if index.insert(node.id.clone(), nodes.len()).is_some() {
                return Err(PipelineError::DuplicateNodeId(node.id));
            }
            nodes.push(node);
        }

        let resolve = |id: &str, from: &str, to: &str| -> Result<NodeIndex> {
            index.get(id).copied().ok_or_else(|| PipelineError::UnknownEdgeNode {
                from: from.to_string(),
                to: to.to_string(),
                missing: id.to_string(),
            })
        };

        let mut edges = Vec::with_capacity(config.edges.len());
        let mut outgoing = vec![Vec::new(); nodes.len()];
        let mut incoming = vec![Vec::new(); nodes.len()];
        for edge in &config.edges {
            let from = resolve(&edge.from, &edge.from, &edge.to)?;
            let to = resolve(&edge.to, &edge.from, &edge.to)?;
            outgoing[from].push(edges.len());
            incoming[to].push(edges.len());
            edges.push(GraphEdge {
                from,
                to,
                edge_type: edge.edge_type,
            });
        }

        Ok(Self {
            name: config.name.clone(),
            version: config.version.clone(),
            nodes,
            index,
            edges,
            outgoing,
            incoming,
        })
    }

    /// Pipeline name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Pipeline version label
    pub fn version(&self) -> &str {
        &self.version
    }

    /// All nodes in config order
    pub fn nodes(&self) -> &[PipelineNode] {
        &self.nodes
    }

    /// Number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Find a node by ID
    pub fn node(&self, id: &str) -> Option<&PipelineNode> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    /// Whether a node with this ID exists
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// IDs of the direct children of a node, one entry per outgoing edge
    pub fn children(&self, node_id: &str) -> Vec<NodeId> {
        self.index
            .get(node_id)
            .map(|&i| self.child_indices(i).map(|c| self.nodes[c].id.clone()).collect())
            .unwrap_or_default()
    }

    /// IDs of the direct parents of a node, one entry per incoming edge
    pub fn parents(&self, node_id: &str) -> Vec<NodeId> {
        self.index
            .get(node_id)
            .map(|&i| self.parent_indices(i).map(|p| self.nodes[p].id.clone()).collect())
            .unwrap_or_default()
    }

    /// Nodes of the given kind, in config order
    pub fn nodes_of_kind(&self, category: NodeCategory) -> Vec<&PipelineNode> {
        self.nodes.iter().filter(|n| n.category() == category).collect()
    }

    /// Outgoing edges of a node as `(target, edge_type)` pairs
    pub fn outgoing_edges(&self, node_id: &str) -> Vec<(NodeId, EdgeType)> {
        self.index
            .get(node_id)
            .map(|&i| {
                self.outgoing[i]
                    .iter()
                    .map(|&e| (self.nodes[self.edges[e].to].id.clone(), self.edges[e].edge_type))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Incoming edges of a node as `(source, edge_type)` pairs
    pub fn incoming_edges(&self, node_id: &str) -> Vec<(NodeId, EdgeType)> {
        self.index
            .get(node_id)
            .map(|&i| {
                self.incoming[i]
                    .iter()
                    .map(|&e| (self.nodes[self.edges[e].from].id.clone(), self.edges[e].edge_type))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Topological sort using Kahn's algorithm
    ///
    /// When a cycle exists the returned order is empty; callers must not
    /// rely on a partial order.
    pub fn topological_sort(&self) -> TopologicalOrder {
        let (order, placed) = self.kahn_order();
        if order.len() < self.nodes.len() {
            let unsorted = (0..self.nodes.len())
                .filter(|&i| !placed[i])
                .map(|i| self.nodes[i].id.clone())
                .collect();
            return TopologicalOrder {
                order: Vec::new(),
                has_cycle: true,
                unsorted,
            };
        }

        TopologicalOrder {
            order: order.into_iter().map(|i| self.nodes[i].id.clone()).collect(),
            has_cycle: false,
            unsorted: Vec::new(),
        }
    }

    /// All nodes reachable from the given start ids (starts included)
    ///
    /// Unknown start ids are ignored.
    pub fn reachable_from<S: AsRef<str>>(&self, start_ids: &[S]) -> BTreeSet<NodeId> {
        let starts: Vec<NodeIndex> = start_ids
            .iter()
            .filter_map(|id| self.index_of(id.as_ref()))
            .collect();
        self.reach(&starts, |i| self.child_indices(i).collect())
            .into_iter()
            .enumerate()
            .filter(|(_, seen)| *seen)
            .map(|(i, _)| self.nodes[i].id.clone())
            .collect()
    }

    // =========================================================================
    // Index-based access for the validator and enumerator
    // =========================================================================

    pub(crate) fn index_of(&self, id: &str) -> Option<NodeIndex> {
        self.index.get(id).copied()
    }

    pub(crate) fn node_at(&self, index: NodeIndex) -> &PipelineNode {
        &self.nodes[index]
    }

    pub(crate) fn child_indices(&self, index: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.outgoing[index].iter().map(move |&e| self.edges[e].to)
    }

    pub(crate) fn parent_indices(&self, index: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.incoming[index].iter().map(move |&e| self.edges[e].from)
    }

    pub(crate) fn incoming_edge_list(&self, index: NodeIndex) -> impl Iterator<Item = &GraphEdge> + '_ {
        self.incoming[index].iter().map(move |&e| &self.edges[e])
    }

    pub(crate) fn outgoing_edge_list(&self, index: NodeIndex) -> impl Iterator<Item = &GraphEdge> + '_ {
        self.outgoing[index].iter().map(move |&e| &self.edges[e])
    }

    pub(crate) fn edge_list(&self) -> &[GraphEdge] {
        &self.edges
    }

    pub(crate) fn indices_of_kind(&self, category: NodeCategory) -> Vec<NodeIndex> {
        (0..self.nodes.len())
            .filter(|&i| self.nodes[i].category() == category)
            .collect()
    }

    /// Kahn's algorithm over indices; returns the order and a placed mask
    pub(crate) fn kahn_order(&self) -> (Vec<NodeIndex>, Vec<bool>) {
        let mut in_degree: Vec<usize> = self.incoming.iter().map(Vec::len).collect();
        let mut queue: VecDeque<NodeIndex> =
            (0..self.nodes.len()).filter(|&i| in_degree[i] == 0).collect();
        let mut placed = vec![false; self.nodes.len()];
        let mut order = Vec::with_capacity(self.nodes.len());

        while let Some(node) = queue.pop_front() {
            placed[node] = true;
            order.push(node);
            for child in self.child_indices(node) {
                in_degree[child] -= 1;
                if in_degree[child] == 0 {
                    queue.push_back(child);
                }
            }
        }

        (order, placed)
    }

    /// Breadth-first closure from `starts` following `next`
    pub(crate) fn reach<F>(&self, starts: &[NodeIndex], next: F) -> Vec<bool>
    where
        F: Fn(NodeIndex) -> Vec<NodeIndex>,
    {
        let mut seen = vec![false; self.nodes.len()];
        let mut queue: VecDeque<NodeIndex> = VecDeque::new();
        for &start in starts {
            if !seen[start] {
                seen[start] = true;
                queue.push_back(start);
            }
        }
        while let Some(node) = queue.pop_front() {
            for neighbor in next(node) {
                if !seen[neighbor] {
                    seen[neighbor] = true;
                    queue.push_back(neighbor);
                }
            }
        }
        seen
    }
}
