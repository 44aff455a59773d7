//! Structural validation for pipeline graphs
//!
//! Runs cycle detection, orphaned-node detection, dead-end detection,
//! per-kind constraint checks, and cross-reference checks. Every check runs
//! to completion; the caller always receives the full list of problems.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::graph::{NodeIndex, PipelineGraph};
use crate::naming::is_filename_extension;
use crate::registry::ReferenceRegistry;
use crate::types::{EdgeType, NodeCategory, NodeId, NodeKind};

/// Classification of a structural problem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationErrorType {
    Cycle,
    OrphanedNode,
    DeadEnd,
    InvalidNode,
    InvalidReference,
}

impl ValidationErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cycle => "cycle",
            Self::OrphanedNode => "orphaned_node",
            Self::DeadEnd => "dead_end",
            Self::InvalidNode => "invalid_node",
            Self::InvalidReference => "invalid_reference",
        }
    }
}

impl fmt::Display for ValidationErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A structural problem found in a pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationError {
    pub error_type: ValidationErrorType,
    pub message: String,
    /// Nodes involved, in config order; empty for pipeline-wide problems
    pub node_ids: Vec<NodeId>,
    /// How the pipeline author can fix it
    pub guidance: String,
}

impl ValidationError {
    fn new(
        error_type: ValidationErrorType,
        message: impl Into<String>,
        node_ids: Vec<NodeId>,
        guidance: impl Into<String>,
    ) -> Self {
        Self {
            error_type,
            message: message.into(),
            node_ids,
            guidance: guidance.into(),
        }
    }

    fn invalid_node(node_id: &str, message: impl Into<String>, guidance: impl Into<String>) -> Self {
        Self::new(
            ValidationErrorType::InvalidNode,
            message,
            vec![node_id.to_string()],
            guidance,
        )
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.error_type, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Validate a pipeline graph
///
/// Returns all validation errors found (not just the first); an empty list
/// means the pipeline is structurally valid. Pass a registry to enable
/// cross-reference checks of method ids and file extensions.
pub fn validate(graph: &PipelineGraph, registry: Option<&ReferenceRegistry>) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    detect_cycles(graph, &mut errors);
    detect_orphaned_nodes(graph, &mut errors);
    detect_dead_ends(graph, &mut errors);
    validate_node_constraints(graph, &mut errors);

    if let Some(reg) = registry {
        validate_references(graph, reg, &mut errors);
    }

    log::debug!(
        "Validated pipeline '{}' ({} nodes): {} error(s)",
        graph.name(),
        graph.node_count(),
        errors.len()
    );
    errors
}

/// Whether an error list contains any error of the given type
pub fn has_error_type(errors: &[ValidationError], error_type: ValidationErrorType) -> bool {
    errors.iter().any(|e| e.error_type == error_type)
}

/// Emit one cycle error naming every node Kahn's algorithm could not place
fn detect_cycles(graph: &PipelineGraph, errors: &mut Vec<ValidationError>) {
    let sorted = graph.topological_sort();
    if !sorted.has_cycle {
        return;
    }

    errors.push(ValidationError::new(
        ValidationErrorType::Cycle,
        format!(
            "Pipeline contains a cycle involving nodes: {}",
            sorted.unsorted.join(", ")
        ),
        sorted.unsorted,
        "Remove an edge so that no node can be reached from itself",
    ));
}

/// Emit one error per node not reachable from any Capture node
fn detect_orphaned_nodes(graph: &PipelineGraph, errors: &mut Vec<ValidationError>) {
    let captures = graph.indices_of_kind(NodeCategory::Capture);
    if captures.is_empty() {
        errors.push(ValidationError::new(
            ValidationErrorType::InvalidNode,
            "Pipeline has no Capture node",
            Vec::new(),
            "Add a Capture node as the starting point of the pipeline",
        ));
    }

    let reachable = graph.reach(&captures, |i| graph.child_indices(i).collect());
    for (index, node) in graph.nodes().iter().enumerate() {
        if !reachable[index] {
            errors.push(ValidationError::new(
                ValidationErrorType::OrphanedNode,
                format!("Node '{}' is not reachable from any Capture node", node.id),
                vec![node.id.clone()],
                "Connect the node to the pipeline or remove it",
            ));
        }
    }
}

/// Emit one error per node from which no Termination node can be reached
fn detect_dead_ends(graph: &PipelineGraph, errors: &mut Vec<ValidationError>) {
    let terminations = graph.indices_of_kind(NodeCategory::Termination);
    if terminations.is_empty() {
        errors.push(ValidationError::new(
            ValidationErrorType::InvalidNode,
            "Pipeline has no Termination node",
            Vec::new(),
            "Add a Termination node for every archival destination",
        ));
    }

    let reaches_end = graph.reach(&terminations, |i| graph.parent_indices(i).collect());
    for (index, node) in graph.nodes().iter().enumerate() {
        if reaches_end[index] {
            continue;
        }
        let message = if graph.child_indices(index).next().is_none() {
            format!(
                "Node '{}' has no outgoing edges and is not a Termination node",
                node.id
            )
        } else {
            format!("No Termination node is reachable from node '{}'", node.id)
        };
        errors.push(ValidationError::new(
            ValidationErrorType::DeadEnd,
            message,
            vec![node.id.clone()],
            "Continue the path to a Termination node",
        ));
    }
}

/// Per-kind structural constraints
fn validate_node_constraints(graph: &PipelineGraph, errors: &mut Vec<ValidationError>) {
    for (index, node) in graph.nodes().iter().enumerate() {
        let incoming = graph.incoming_edge_list(index).count();
        let outgoing = graph.outgoing_edge_list(index).count();

        match &node.kind {
            NodeKind::Capture => {
                if incoming > 0 {
                    errors.push(ValidationError::invalid_node(
                        &node.id,
                        format!("Capture node '{}' has {} incoming edge(s)", node.id, incoming),
                        "Capture nodes start a path and cannot have inputs",
                    ));
                }
            }
            NodeKind::File { extension } => {
                if extension.is_empty() {
                    errors.push(ValidationError::invalid_node(
                        &node.id,
                        format!("File node '{}' has no extension", node.id),
                        "Set the file extension produced at this step (e.g. \"dng\")",
                    ));
                } else if !is_filename_extension(extension) {
                    errors.push(ValidationError::invalid_node(
                        &node.id,
                        format!(
                            "File node '{}' has extension '{}', which derived filenames cannot carry",
                            node.id, extension
                        ),
                        "Use a single extension of letters and digits (e.g. \"tif\")",
                    ));
                }
            }
            NodeKind::Process { method_ids } => {
                if method_ids.is_empty() {
                    errors.push(ValidationError::invalid_node(
                        &node.id,
                        format!("Process node '{}' has no processing methods", node.id),
                        "List at least one processing method id",
                    ));
                } else if method_ids.iter().any(|m| m.trim().is_empty()) {
                    errors.push(ValidationError::invalid_node(
                        &node.id,
                        format!("Process node '{}' has an empty method id", node.id),
                        "Remove blank entries from the method list",
                    ));
                }
            }
            NodeKind::Pairing { .. } => validate_pairing(graph, index, errors),
            NodeKind::Branching => {
                if outgoing < 2 {
                    errors.push(ValidationError::invalid_node(
                        &node.id,
                        format!(
                            "Branching node '{}' has {} outgoing edge(s), expected at least 2",
                            node.id, outgoing
                        ),
                        "Add an alternative continuation or replace the node with a direct edge",
                    ));
                }
            }
            NodeKind::Termination { termination_type } => {
                if outgoing > 0 {
                    errors.push(ValidationError::invalid_node(
                        &node.id,
                        format!(
                            "Termination node '{}' has {} outgoing edge(s)",
                            node.id, outgoing
                        ),
                        "Termination nodes end a path; remove their outgoing edges",
                    ));
                }
                if termination_type.as_deref().map_or(true, |t| t.trim().is_empty()) {
                    errors.push(ValidationError::invalid_node(
                        &node.id,
                        format!("Termination node '{}' has no termination type", node.id),
                        "Set the archival destination type of this Termination node",
                    ));
                }
            }
        }
    }

    for edge in graph.edge_list() {
        if edge.edge_type == EdgeType::PairingInput && !graph.node_at(edge.to).is_pairing() {
            let target = &graph.node_at(edge.to).id;
            errors.push(ValidationError::invalid_node(
                target,
                format!(
                    "Edge '{}' -> '{}' is a pairing input but '{}' is not a Pairing node",
                    graph.node_at(edge.from).id,
                    target,
                    target
                ),
                "Use a sequential edge or point the pairing input at a Pairing node",
            ));
        }
    }
}

fn validate_pairing(graph: &PipelineGraph, index: NodeIndex, errors: &mut Vec<ValidationError>) {
    let node = graph.node_at(index);
    let mut inputs: Vec<NodeIndex> = Vec::new();

    for edge in graph.incoming_edge_list(index) {
        if edge.edge_type == EdgeType::PairingInput {
            inputs.push(edge.from);
            continue;
        }
        errors.push(ValidationError::invalid_node(
            &node.id,
            format!(
                "Pairing node '{}' has a sequential input from '{}'",
                node.id,
                graph.node_at(edge.from).id
            ),
            "Pairing nodes accept only their two pairing_input edges",
        ));
    }

    if inputs.len() != 2 {
        errors.push(ValidationError::invalid_node(
            &node.id,
            format!(
                "Pairing node '{}' has {} pairing input(s), expected exactly 2",
                node.id,
                inputs.len()
            ),
            "Connect exactly two upstream nodes with pairing_input edges",
        ));
    } else if inputs[0] == inputs[1] {
        errors.push(ValidationError::invalid_node(
            &node.id,
            format!(
                "Pairing node '{}' receives both inputs from '{}'",
                node.id,
                graph.node_at(inputs[0]).id
            ),
            "Pairing inputs must come from two distinct upstream nodes",
        ));
    } else if !shares_capture(graph, inputs[0], inputs[1]) {
        errors.push(ValidationError::invalid_node(
            &node.id,
            format!(
                "Inputs '{}' and '{}' of Pairing node '{}' do not descend from a common Capture node",
                graph.node_at(inputs[0]).id,
                graph.node_at(inputs[1]).id,
                node.id
            ),
            "Both pairing inputs must derive from the same capture",
        ));
    }
}

/// Whether some Capture node is an ancestor of both `a` and `b`
fn shares_capture(graph: &PipelineGraph, a: NodeIndex, b: NodeIndex) -> bool {
    let upstream_a = graph.reach(&[a], |i| graph.parent_indices(i).collect());
    let upstream_b = graph.reach(&[b], |i| graph.parent_indices(i).collect());
    graph
        .indices_of_kind(NodeCategory::Capture)
        .into_iter()
        .any(|c| upstream_a[c] && upstream_b[c])
}

/// Check method ids and extensions against the external registries
fn validate_references(
    graph: &PipelineGraph,
    registry: &ReferenceRegistry,
    errors: &mut Vec<ValidationError>,
) {
    for node in graph.nodes() {
        match &node.kind {
            NodeKind::Process { method_ids } => {
                for method_id in method_ids.iter().filter(|m| !m.trim().is_empty()) {
                    if !registry.has_method(method_id) {
                        errors.push(ValidationError::new(
                            ValidationErrorType::InvalidReference,
                            format!(
                                "Process node '{}' references unknown processing method '{}'",
                                node.id, method_id
                            ),
                            vec![node.id.clone()],
                            "Define the processing method or fix the method id",
                        ));
                    }
                }
            }
            NodeKind::File { extension } => {
                if !extension.is_empty() && !registry.has_extension(extension) {
                    errors.push(ValidationError::new(
                        ValidationErrorType::InvalidReference,
                        format!(
                            "File node '{}' uses unregistered extension '{}'",
                            node.id, extension
                        ),
                        vec![node.id.clone()],
                        "Register the extension or correct the File node",
                    ));
                }
            }
            NodeKind::Capture
            | NodeKind::Pairing { .. }
            | NodeKind::Branching
            | NodeKind::Termination { .. } => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::PipelineBuilder;
    use crate::types::PipelineConfig;

    fn graph(config: PipelineConfig) -> PipelineGraph {
        PipelineGraph::from_config(&config).unwrap()
    }

    fn of_type(errors: &[ValidationError], t: ValidationErrorType) -> Vec<&ValidationError> {
        errors.iter().filter(|e| e.error_type == t).collect()
    }

    fn registry() -> ReferenceRegistry {
        ReferenceRegistry::with_entries(["hdr"], ["dng", "jpg", "tif"])
    }

    #[test]
    fn test_valid_pipeline() {
        let g = graph(
            PipelineBuilder::new("ok", "1")
                .capture("cap")
                .file("raw", "dng")
                .process("edit", &["hdr"])
                .file("tif", "tif")
                .termination("done", "archive")
                .edge("cap", "raw")
                .edge("raw", "edit")
                .edge("edit", "tif")
                .edge("tif", "done")
                .build(),
        );
        let errors = validate(&g, Some(&registry()));
        assert!(errors.is_empty(), "Expected no errors, got: {:?}", errors);
    }

    #[test]
    fn test_cycle_names_cycle_members() {
        // cap -> a -> b -> a
        let g = graph(
            PipelineBuilder::new("cycle", "1")
                .capture("cap")
                .file("a", "jpg")
                .process("b", &["hdr"])
                .edge("cap", "a")
                .edge("a", "b")
                .edge("b", "a")
                .build(),
        );
        let errors = validate(&g, None);
        let cycles = of_type(&errors, ValidationErrorType::Cycle);
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].node_ids, vec!["a", "b"]);
    }

    #[test]
    fn test_one_orphan_error_per_unreachable_node() {
        let g = graph(
            PipelineBuilder::new("orphans", "1")
                .capture("cap")
                .file("jpg", "jpg")
                .termination("done", "archive")
                .file("lost1", "jpg")
                .file("lost2", "jpg")
                .edge("cap", "jpg")
                .edge("jpg", "done")
                .edge("lost1", "lost2")
                .edge("lost2", "done")
                .build(),
        );
        let errors = validate(&g, None);
        let orphans = of_type(&errors, ValidationErrorType::OrphanedNode);
        let ids: Vec<&str> = orphans.iter().map(|e| e.node_ids[0].as_str()).collect();
        assert_eq!(ids, vec!["lost1", "lost2"]);
    }

    #[test]
    fn test_dead_end_detection() {
        let g = graph(
            PipelineBuilder::new("dead", "1")
                .capture("cap")
                .branching("split")
                .file("jpg", "jpg")
                .file("stuck", "tif")
                .termination("done", "archive")
                .edge("cap", "split")
                .edge("split", "jpg")
                .edge("split", "stuck")
                .edge("jpg", "done")
                .build(),
        );
        let errors = validate(&g, None);
        let dead = of_type(&errors, ValidationErrorType::DeadEnd);
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].node_ids, vec!["stuck"]);
        assert!(dead[0].message.contains("no outgoing edges"));
    }

    #[test]
    fn test_kind_constraints() {
        let g = graph(
            PipelineBuilder::new("bad-nodes", "1")
                .capture("cap")
                .file("nofile", "")
                .process("noop", &[])
                .branching("single")
                .node("end", "termination", serde_json::Value::Null)
                .capture("late")
                .edge("cap", "nofile")
                .edge("nofile", "noop")
                .edge("noop", "single")
                .edge("single", "end")
                .edge("end", "late")
                .build(),
        );
        let errors = validate(&g, None);
        let invalid: Vec<&str> = of_type(&errors, ValidationErrorType::InvalidNode)
            .iter()
            .map(|e| e.node_ids[0].as_str())
            .collect();
        // end: outgoing edge and missing type; late: capture with input
        assert_eq!(invalid, vec!["nofile", "noop", "single", "end", "end", "late"]);
    }

    #[test]
    fn test_pairing_requires_two_distinct_inputs() {
        let g = graph(
            PipelineBuilder::new("pairing", "1")
                .capture("cap")
                .file("raw", "dng")
                .pairing("pair")
                .termination("done", "archive")
                .edge("cap", "raw")
                .pairing_input("raw", "pair")
                .edge("pair", "done")
                .build(),
        );
        let errors = validate(&g, None);
        let invalid = of_type(&errors, ValidationErrorType::InvalidNode);
        assert_eq!(invalid.len(), 1);
        assert!(invalid[0].message.contains("1 pairing input"));

        let g = graph(
            PipelineBuilder::new("pairing-same", "1")
                .capture("cap")
                .file("raw", "dng")
                .pairing("pair")
                .termination("done", "archive")
                .edge("cap", "raw")
                .pairing_input("raw", "pair")
                .pairing_input("raw", "pair")
                .edge("pair", "done")
                .build(),
        );
        let errors = validate(&g, None);
        assert!(of_type(&errors, ValidationErrorType::InvalidNode)[0]
            .message
            .contains("both inputs"));
    }

    #[test]
    fn test_pairing_rejects_sequential_input() {
        let g = graph(
            PipelineBuilder::new("extra-input", "1")
                .capture("cap")
                .file("raw", "dng")
                .file("jpg", "jpg")
                .file("tif", "tif")
                .pairing("pair")
                .termination("done", "archive")
                .edge("cap", "raw")
                .edge("cap", "jpg")
                .edge("cap", "tif")
                .pairing_input("raw", "pair")
                .pairing_input("jpg", "pair")
                .edge("tif", "pair")
                .edge("pair", "done")
                .build(),
        );
        let errors = validate(&g, None);
        let invalid = of_type(&errors, ValidationErrorType::InvalidNode);
        assert_eq!(invalid.len(), 1);
        assert_eq!(invalid[0].node_ids, vec!["pair"]);
        assert!(invalid[0].message.contains("sequential input from 'tif'"));
    }

    #[test]
    fn test_pairing_inputs_need_common_capture() {
        let g = graph(
            PipelineBuilder::new("two-cameras", "1")
                .capture("cam1")
                .capture("cam2")
                .file("raw", "dng")
                .file("jpg", "jpg")
                .pairing("pair")
                .termination("done", "archive")
                .edge("cam1", "raw")
                .edge("cam2", "jpg")
                .pairing_input("raw", "pair")
                .pairing_input("jpg", "pair")
                .edge("pair", "done")
                .build(),
        );
        let errors = validate(&g, None);
        let invalid = of_type(&errors, ValidationErrorType::InvalidNode);
        assert_eq!(invalid.len(), 1);
        assert_eq!(invalid[0].node_ids, vec!["pair"]);
        assert!(invalid[0].message.contains("common Capture node"));
    }

    #[test]
    fn test_file_extension_must_fit_filenames() {
        let g = graph(
            PipelineBuilder::new("archive", "1")
                .capture("cap")
                .file("tarball", "tar.gz")
                .termination("done", "archive")
                .edge("cap", "tarball")
                .edge("tarball", "done")
                .build(),
        );
        let errors = validate(&g, None);
        let invalid = of_type(&errors, ValidationErrorType::InvalidNode);
        assert_eq!(invalid.len(), 1);
        assert_eq!(invalid[0].node_ids, vec!["tarball"]);
    }

    #[test]
    fn test_pairing_input_into_non_pairing_node() {
        let g = graph(
            PipelineBuilder::new("misrouted", "1")
                .capture("cap")
                .file("jpg", "jpg")
                .termination("done", "archive")
                .pairing_input("cap", "jpg")
                .edge("jpg", "done")
                .build(),
        );
        let errors = validate(&g, None);
        let invalid = of_type(&errors, ValidationErrorType::InvalidNode);
        assert_eq!(invalid.len(), 1);
        assert_eq!(invalid[0].node_ids, vec!["jpg"]);
    }

    #[test]
    fn test_cross_references() {
        let g = graph(
            PipelineBuilder::new("refs", "1")
                .capture("cap")
                .file("raw", "cr3")
                .process("edit", &["hdr", "pano"])
                .termination("done", "archive")
                .edge("cap", "raw")
                .edge("raw", "edit")
                .edge("edit", "done")
                .build(),
        );
        let errors = validate(&g, Some(&registry()));
        let refs = of_type(&errors, ValidationErrorType::InvalidReference);
        assert_eq!(refs.len(), 2);
        assert!(refs[0].message.contains("cr3"));
        assert!(refs[1].message.contains("pano"));

        // No registry, no reference checks
        assert!(validate(&g, None).is_empty());
    }

    #[test]
    fn test_missing_capture_and_termination() {
        let g = graph(PipelineBuilder::new("empty-ish", "1").file("jpg", "jpg").build());
        let errors = validate(&g, None);
        let pipeline_wide: Vec<&ValidationError> =
            errors.iter().filter(|e| e.node_ids.is_empty()).collect();
        assert_eq!(pipeline_wide.len(), 2);
        assert!(has_error_type(&errors, ValidationErrorType::OrphanedNode));
        assert!(has_error_type(&errors, ValidationErrorType::DeadEnd));
    }

    #[test]
    fn test_collects_multiple_errors() {
        let g = graph(
            PipelineBuilder::new("many", "1")
                .capture("cap")
                .file("a", "")
                .file("b", "jpg")
                .edge("cap", "a")
                .edge("a", "b")
                .edge("b", "a")
                .build(),
        );
        let errors = validate(&g, None);
        assert!(has_error_type(&errors, ValidationErrorType::Cycle));
        assert!(has_error_type(&errors, ValidationErrorType::DeadEnd));
        assert!(has_error_type(&errors, ValidationErrorType::InvalidNode));
    }

    #[test]
    fn test_error_display() {
        let error = ValidationError::invalid_node("n", "broken", "fix it");
        assert_eq!(error.to_string(), "[invalid_node] broken");
        assert_eq!(
            serde_json::to_value(&error).unwrap()["errorType"],
            serde_json::json!("invalid_node")
        );
    }
}
