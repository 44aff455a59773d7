//! Capture-to-Termination path enumeration
//!
//! Paths are enumerated with an explicit work stack rather than recursion.
//! Each Capture node is walked depth-first; every node with several
//! children forks the path. A walk that reaches a Pairing node parks its
//! prefix there instead of continuing. Once all walks that can feed a
//! Pairing node are done (Pairing nodes are settled in topological order),
//! prefixes that arrived on its two inputs from the same Capture node are
//! combined, and the walk continues from the Pairing node. The walk from a
//! Pairing node is computed once and reused for every combination.
//!
//! Enumeration assumes a structurally valid graph. On an invalid graph the
//! revisit bound keeps it finite, but callers should run the structure
//! validator first and treat results on an invalid pipeline as meaningless.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::config::EnumerationLimits;
use crate::events::{EnumerationEvent, EventSink, NullEventSink};
use crate::graph::{NodeIndex, PipelineGraph};
use crate::types::{EdgeType, NodeCategory, NodeId};

/// One element of a path
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PathStep {
    /// A single node
    Node(NodeId),
    /// A Pairing node entered once both input prefixes were available
    #[serde(rename_all = "camelCase")]
    Join {
        pairing_id: NodeId,
        inputs: [Vec<PathStep>; 2],
    },
}

/// How a path ended
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum PathOutcome {
    /// Reached a Termination node
    #[serde(rename_all = "camelCase")]
    Terminated {
        termination_id: NodeId,
        termination_type: Option<String>,
    },
    /// Aborted because a node would have been visited again
    #[serde(rename_all = "camelCase")]
    Truncated { revisited_id: NodeId },
}

/// A path from a Capture node to a Termination node (or to the point where
/// it was truncated)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelinePath {
    /// Capture node the path starts from
    pub origin_id: NodeId,
    pub steps: Vec<PathStep>,
    pub outcome: PathOutcome,
}

impl PipelinePath {
    /// Whether enumeration aborted this path early
    pub fn is_truncated(&self) -> bool {
        matches!(self.outcome, PathOutcome::Truncated { .. })
    }

    /// Termination type of a completed path
    pub fn termination_type(&self) -> Option<&str> {
        match &self.outcome {
            PathOutcome::Terminated { termination_type, .. } => termination_type.as_deref(),
            PathOutcome::Truncated { .. } => None,
        }
    }

    /// Flattened node sequence
    ///
    /// A join contributes its first input prefix, then the nodes of its
    /// second input prefix that are not already in the first, then the
    /// Pairing node itself.
    pub fn node_ids(&self) -> Vec<&str> {
        let mut out = Vec::new();
        flatten_steps(&self.steps, &mut out);
        out
    }

    /// Number of nodes in the flattened sequence
    pub fn node_count(&self) -> usize {
        self.node_ids().len()
    }

    /// Whether the path passes through a Pairing join
    pub fn has_join(&self) -> bool {
        self.steps.iter().any(|s| matches!(s, PathStep::Join { .. }))
    }
}

pub(crate) fn flatten_steps<'a>(steps: &'a [PathStep], out: &mut Vec<&'a str>) {
    for step in steps {
        match step {
            PathStep::Node(id) => out.push(id),
            PathStep::Join { pairing_id, inputs } => {
                let mut left = Vec::new();
                flatten_steps(&inputs[0], &mut left);
                let mut right = Vec::new();
                flatten_steps(&inputs[1], &mut right);
                right.retain(|id| !left.contains(id));
                out.extend(left);
                out.extend(right);
                out.push(pairing_id);
            }
        }
    }
}

/// Result of an enumeration run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathEnumeration {
    pub paths: Vec<PipelinePath>,
    /// The work budget ran out; `paths` is incomplete
    pub budget_exhausted: bool,
    /// Work steps consumed
    pub steps: usize,
}

impl PathEnumeration {
    /// Paths that reached a Termination node
    pub fn complete_paths(&self) -> impl Iterator<Item = &PipelinePath> {
        self.paths.iter().filter(|p| !p.is_truncated())
    }

    /// Paths cut short by the revisit bound
    pub fn truncated_paths(&self) -> impl Iterator<Item = &PipelinePath> {
        self.paths.iter().filter(|p| p.is_truncated())
    }
}

/// Enumerate every path with default limits
pub fn enumerate_paths(graph: &PipelineGraph) -> Vec<PipelinePath> {
    enumerate_paths_with(graph, &EnumerationLimits::default(), &NullEventSink).paths
}

/// Enumerate every path with explicit limits, reporting progress to `sink`
pub fn enumerate_paths_with(
    graph: &PipelineGraph,
    limits: &EnumerationLimits,
    sink: &dyn EventSink,
) -> PathEnumeration {
    let mut enumerator = Enumerator::new(graph, limits, sink);
    enumerator.run();

    log::debug!(
        "Enumerated {} path(s) for pipeline '{}' in {} step(s)",
        enumerator.paths.len(),
        graph.name(),
        enumerator.steps
    );

    PathEnumeration {
        paths: enumerator.paths,
        budget_exhausted: enumerator.exhausted,
        steps: enumerator.steps,
    }
}

/// How a single walk ended
#[derive(Debug, Clone, Copy)]
enum TailEnd {
    Terminated(NodeIndex),
    Truncated(NodeIndex),
    /// Parked at a Pairing node, arriving from `input`
    Pairing { pairing: NodeIndex, input: NodeIndex },
}

/// Nodes visited by one branch of a walk
#[derive(Debug, Clone)]
struct Tail {
    nodes: Vec<NodeIndex>,
    end: TailEnd,
}

/// A path prefix waiting to be continued
#[derive(Debug, Clone)]
struct Prefix {
    origin: NodeIndex,
    steps: Vec<PathStep>,
}

struct Frame {
    node: NodeIndex,
    nodes: Vec<NodeIndex>,
}

struct Enumerator<'a> {
    graph: &'a PipelineGraph,
    sink: &'a dyn EventSink,
    max_visits: usize,
    max_steps: usize,
    steps: usize,
    exhausted: bool,
    /// Walk results per start node
    walks: HashMap<NodeIndex, Rc<Vec<Tail>>>,
    /// Prefixes parked at each Pairing node, with the input they came from
    arrivals: HashMap<NodeIndex, Vec<(NodeIndex, Prefix)>>,
    settled: HashSet<NodeIndex>,
    paths: Vec<PipelinePath>,
}

impl<'a> Enumerator<'a> {
    fn new(graph: &'a PipelineGraph, limits: &EnumerationLimits, sink: &'a dyn EventSink) -> Self {
        Self {
            graph,
            sink,
            max_visits: limits.max_node_visits.max(1) as usize,
            max_steps: limits.max_steps,
            steps: 0,
            exhausted: false,
            walks: HashMap::new(),
            arrivals: HashMap::new(),
            settled: HashSet::new(),
            paths: Vec::new(),
        }
    }

    fn run(&mut self) {
        for capture in self.graph.indices_of_kind(NodeCategory::Capture) {
            if self.exhausted {
                return;
            }
            let tails = self.walk(capture);
            let prefix = Prefix {
                origin: capture,
                steps: Vec::new(),
            };
            for tail in tails.iter() {
                self.settle(&prefix, tail);
            }
        }

        for pairing in self.pairing_order() {
            if self.exhausted {
                return;
            }
            self.join(pairing);
        }
    }

    /// Pairing nodes in topological order; on a cyclic graph the nodes
    /// Kahn's algorithm could not place follow in config order
    fn pairing_order(&self) -> Vec<NodeIndex> {
        let (order, placed) = self.graph.kahn_order();
        let unplaced = (0..self.graph.node_count()).filter(|&i| !placed[i]);
        order
            .into_iter()
            .chain(unplaced)
            .filter(|&i| self.graph.node_at(i).is_pairing())
            .collect()
    }

    /// The two upstream nodes whose prefixes a Pairing node combines
    fn pairing_inputs(&self, pairing: NodeIndex) -> Vec<NodeIndex> {
        let distinct = |edge_filter: &dyn Fn(EdgeType) -> bool| {
            let mut inputs: Vec<NodeIndex> = Vec::new();
            for edge in self.graph.incoming_edge_list(pairing) {
                if edge_filter(edge.edge_type) && !inputs.contains(&edge.from) {
                    inputs.push(edge.from);
                }
            }
            inputs
        };

        let mut inputs = distinct(&|t| t == EdgeType::PairingInput);
        if inputs.len() < 2 {
            inputs = distinct(&|_| true);
        }
        if inputs.len() > 2 {
            log::warn!(
                "Pairing node '{}' has {} inputs; only the first two are joined",
                self.graph.node_at(pairing).id,
                inputs.len()
            );
            inputs.truncate(2);
        }
        inputs
    }

    fn join(&mut self, pairing: NodeIndex) {
        self.settled.insert(pairing);
        let arrived = self.arrivals.remove(&pairing).unwrap_or_default();
        let pairing_id = self.graph.node_at(pairing).id.clone();

        let inputs = self.pairing_inputs(pairing);
        if inputs.len() < 2 {
            log::debug!("Pairing node '{}' has fewer than two inputs; nothing to join", pairing_id);
            return;
        }

        let mut combinations = Vec::new();
        for (left_input, left) in &arrived {
            if *left_input != inputs[0] {
                continue;
            }
            for (right_input, right) in &arrived {
                if *right_input != inputs[1] || right.origin != left.origin {
                    continue;
                }
                combinations.push(Prefix {
                    origin: left.origin,
                    steps: vec![PathStep::Join {
                        pairing_id: pairing_id.clone(),
                        inputs: [left.steps.clone(), right.steps.clone()],
                    }],
                });
            }
        }

        self.emit(EnumerationEvent::PairingJoined {
            pairing_id: pairing_id.clone(),
            combinations: combinations.len(),
        });
        if combinations.is_empty() {
            return;
        }

        let tails = self.walk(pairing);
        for prefix in &combinations {
            if !self.charge() {
                return;
            }
            for tail in tails.iter() {
                self.settle(prefix, tail);
            }
        }
    }

    /// Turn a finished walk branch into a path or a parked prefix
    fn settle(&mut self, prefix: &Prefix, tail: &Tail) {
        let graph = self.graph;
        let mut steps = prefix.steps.clone();
        steps.extend(
            tail.nodes
                .iter()
                .map(|&i| PathStep::Node(graph.node_at(i).id.clone())),
        );
        let origin_id = graph.node_at(prefix.origin).id.clone();

        match tail.end {
            TailEnd::Terminated(node) => {
                let termination = graph.node_at(node);
                self.emit(EnumerationEvent::PathCompleted {
                    termination_id: termination.id.clone(),
                });
                self.paths.push(PipelinePath {
                    origin_id,
                    steps,
                    outcome: PathOutcome::Terminated {
                        termination_id: termination.id.clone(),
                        termination_type: termination.termination_type().map(str::to_string),
                    },
                });
            }
            TailEnd::Truncated(node) => {
                let revisited_id = graph.node_at(node).id.clone();
                self.emit(EnumerationEvent::PathTruncated {
                    revisited_id: revisited_id.clone(),
                });
                self.paths.push(PipelinePath {
                    origin_id,
                    steps,
                    outcome: PathOutcome::Truncated { revisited_id },
                });
            }
            TailEnd::Pairing { pairing, input } => {
                let pairing_id = graph.node_at(pairing).id.clone();
                if self.settled.contains(&pairing) {
                    log::warn!(
                        "Prefix reached Pairing node '{}' after it was joined; dropping it",
                        pairing_id
                    );
                    return;
                }
                self.emit(EnumerationEvent::PrefixArrived {
                    pairing_id,
                    input_id: graph.node_at(input).id.clone(),
                });
                self.arrivals.entry(pairing).or_default().push((
                    input,
                    Prefix {
                        origin: prefix.origin,
                        steps,
                    },
                ));
            }
        }
    }

    /// Depth-first walk from `start`, memoized per start node
    ///
    /// Walks from a Pairing node omit the Pairing node itself; the join step
    /// already represents it.
    fn walk(&mut self, start: NodeIndex) -> Rc<Vec<Tail>> {
        if let Some(tails) = self.walks.get(&start) {
            return Rc::clone(tails);
        }

        let graph = self.graph;
        self.emit(EnumerationEvent::WalkStarted {
            node_id: graph.node_at(start).id.clone(),
        });

        let mut tails = Vec::new();
        let mut stack = vec![Frame {
            node: start,
            nodes: Vec::new(),
        }];

        while let Some(frame) = stack.pop() {
            if !self.charge() {
                break;
            }

            let visits = frame.nodes.iter().filter(|&&n| n == frame.node).count();
            if visits >= self.max_visits {
                tails.push(Tail {
                    nodes: frame.nodes,
                    end: TailEnd::Truncated(frame.node),
                });
                continue;
            }

            let node = graph.node_at(frame.node);
            let arrived_from = frame.nodes.last().copied();
            if node.is_pairing() && frame.node != start {
                if let Some(input) = arrived_from {
                    tails.push(Tail {
                        nodes: frame.nodes,
                        end: TailEnd::Pairing {
                            pairing: frame.node,
                            input,
                        },
                    });
                    continue;
                }
            }

            let mut nodes = frame.nodes;
            nodes.push(frame.node);
            if node.is_termination() {
                tails.push(Tail {
                    nodes,
                    end: TailEnd::Terminated(frame.node),
                });
                continue;
            }

            let children: Vec<NodeIndex> = graph.child_indices(frame.node).collect();
            if children.is_empty() {
                log::trace!("Branch ends at non-terminal node '{}'", node.id);
                continue;
            }
            for child in children.into_iter().rev() {
                stack.push(Frame {
                    node: child,
                    nodes: nodes.clone(),
                });
            }
        }

        if graph.node_at(start).is_pairing() {
            for tail in &mut tails {
                if tail.nodes.first() == Some(&start) {
                    tail.nodes.remove(0);
                }
            }
        }

        let tails = Rc::new(tails);
        self.walks.insert(start, Rc::clone(&tails));
        tails
    }

    /// Consume one unit of work; false once the budget is spent
    fn charge(&mut self) -> bool {
        if self.exhausted {
            return false;
        }
        if self.steps >= self.max_steps {
            self.exhausted = true;
            log::warn!(
                "Path enumeration for '{}' stopped after {} steps",
                self.graph.name(),
                self.steps
            );
            self.emit(EnumerationEvent::BudgetExhausted { steps: self.steps });
            return false;
        }
        self.steps += 1;
        true
    }

    fn emit(&self, event: EnumerationEvent) {
        if let Err(e) = self.sink.send(event) {
            log::warn!("Dropping enumeration event: {}", e);
        }
    }
}
