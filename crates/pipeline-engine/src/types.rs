//! Core types for pipeline definitions
//!
//! `PipelineConfig` is the loader-facing shape: node kinds are plain strings
//! and per-kind properties are loose JSON. `PipelineNode` is the parsed form
//! the rest of the engine works with, where every node kind is a variant of
//! the closed [`NodeKind`] sum type.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::{node_kinds, properties};
use crate::error::{PipelineError, Result};

/// Unique identifier for a node
pub type NodeId = String;

/// The relation an edge expresses
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeType {
    /// Normal flow from one step to the next
    #[default]
    Sequential,
    /// One of the two required inputs into a Pairing node
    PairingInput,
}

/// A node as supplied by the config loader
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigNode {
    /// Unique identifier for this node
    pub id: NodeId,
    /// Node kind name (e.g. "capture", "file")
    pub node_type: String,
    /// Human-readable label
    #[serde(default)]
    pub name: String,
    /// Kind-specific properties
    #[serde(default)]
    pub properties: serde_json::Value,
}

/// A directed edge as supplied by the config loader
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigEdge {
    /// Source node ID
    pub from: NodeId,
    /// Target node ID
    pub to: NodeId,
    /// Edge semantics
    #[serde(default)]
    pub edge_type: EdgeType,
}

/// A complete pipeline definition
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineConfig {
    /// Pipeline name
    pub name: String,
    /// Pipeline version label
    pub version: String,
    /// Optional free-form description
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Nodes in the pipeline
    pub nodes: Vec<ConfigNode>,
    /// Edges connecting nodes
    pub edges: Vec<ConfigEdge>,
}

impl PipelineConfig {
    /// Create a new empty pipeline config
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            description: String::new(),
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }

    /// Find a node by ID
    pub fn find_node(&self, id: &str) -> Option<&ConfigNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Parse a pipeline config from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize the config as pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Kind of a node without its properties
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeCategory {
    Capture,
    File,
    Process,
    Pairing,
    Branching,
    Termination,
}

impl NodeCategory {
    /// Parse a node kind name, ignoring ASCII case
    pub fn parse(kind: &str) -> Option<Self> {
        let kind = kind.trim().to_ascii_lowercase();
        match kind.as_str() {
            node_kinds::CAPTURE => Some(Self::Capture),
            node_kinds::FILE => Some(Self::File),
            node_kinds::PROCESS => Some(Self::Process),
            node_kinds::PAIRING => Some(Self::Pairing),
            node_kinds::BRANCHING => Some(Self::Branching),
            node_kinds::TERMINATION => Some(Self::Termination),
            _ => None,
        }
    }

    /// Canonical name of this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Capture => node_kinds::CAPTURE,
            Self::File => node_kinds::FILE,
            Self::Process => node_kinds::PROCESS,
            Self::Pairing => node_kinds::PAIRING,
            Self::Branching => node_kinds::BRANCHING,
            Self::Termination => node_kinds::TERMINATION,
        }
    }
}

impl fmt::Display for NodeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A node kind together with its kind-specific properties
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeKind {
    /// Start of every path; the original camera capture
    Capture,
    /// A file artifact with the given extension (no leading dot)
    File { extension: String },
    /// Processing steps applied in order
    Process { method_ids: Vec<String> },
    /// Two-input join point
    Pairing { pairing_type: Option<String> },
    /// Alternative continuations
    Branching,
    /// Final archival destination
    Termination { termination_type: Option<String> },
}

impl NodeKind {
    /// The property-less category of this kind
    pub fn category(&self) -> NodeCategory {
        match self {
            Self::Capture => NodeCategory::Capture,
            Self::File { .. } => NodeCategory::File,
            Self::Process { .. } => NodeCategory::Process,
            Self::Pairing { .. } => NodeCategory::Pairing,
            Self::Branching => NodeCategory::Branching,
            Self::Termination { .. } => NodeCategory::Termination,
        }
    }

    /// Parse the kind and properties of a config node
    ///
    /// Missing properties parse to empty values so that the structure
    /// validator can report them; properties with the wrong JSON shape are
    /// construction errors.
    pub fn from_config(node: &ConfigNode) -> Result<Self> {
        let category =
            NodeCategory::parse(&node.node_type).ok_or_else(|| PipelineError::UnknownNodeKind {
                node_id: node.id.clone(),
                kind: node.node_type.clone(),
            })?;

        if !(node.properties.is_null() || node.properties.is_object()) {
            return Err(PipelineError::invalid_property(
                &node.id,
                "properties",
                "expected an object",
            ));
        }

        let kind = match category {
            NodeCategory::Capture => Self::Capture,
            NodeCategory::File => {
                let extension = optional_string(node, properties::EXTENSION)?.unwrap_or_default();
                Self::File {
                    extension: normalize_extension(&extension),
                }
            }
            NodeCategory::Process => Self::Process {
                method_ids: string_list(node, properties::METHOD_IDS)?,
            },
            NodeCategory::Pairing => Self::Pairing {
                pairing_type: optional_string(node, properties::PAIRING_TYPE)?,
            },
            NodeCategory::Branching => Self::Branching,
            NodeCategory::Termination => Self::Termination {
                termination_type: optional_string(node, properties::TERMINATION_TYPE)?,
            },
        };
        Ok(kind)
    }
}

/// A parsed pipeline node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineNode {
    /// Unique identifier for this node
    pub id: NodeId,
    /// Human-readable label
    pub name: String,
    /// Kind and kind-specific properties
    #[serde(flatten)]
    pub kind: NodeKind,
}

impl PipelineNode {
    /// Parse a config node
    pub fn from_config(node: &ConfigNode) -> Result<Self> {
        Ok(Self {
            id: node.id.clone(),
            name: node.name.clone(),
            kind: NodeKind::from_config(node)?,
        })
    }

    /// The property-less category of this node
    pub fn category(&self) -> NodeCategory {
        self.kind.category()
    }

    pub fn is_capture(&self) -> bool {
        matches!(self.kind, NodeKind::Capture)
    }

    pub fn is_termination(&self) -> bool {
        matches!(self.kind, NodeKind::Termination { .. })
    }

    pub fn is_pairing(&self) -> bool {
        matches!(self.kind, NodeKind::Pairing { .. })
    }

    /// Termination type, if this is a Termination node with one set
    pub fn termination_type(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Termination { termination_type } => termination_type.as_deref(),
            _ => None,
        }
    }
}

/// Lower-case an extension and strip any leading dots
pub fn normalize_extension(extension: &str) -> String {
    extension.trim().trim_start_matches('.').to_ascii_lowercase()
}

fn property<'a>(node: &'a ConfigNode, key: &str) -> Option<&'a serde_json::Value> {
    node.properties.get(key).filter(|v| !v.is_null())
}

fn optional_string(node: &ConfigNode, key: &str) -> Result<Option<String>> {
    match property(node, key) {
        None => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(PipelineError::invalid_property(&node.id, key, "expected a string")),
    }
}

fn string_list(node: &ConfigNode, key: &str) -> Result<Vec<String>> {
    let Some(value) = property(node, key) else {
        return Ok(Vec::new());
    };
    let items = value
        .as_array()
        .ok_or_else(|| PipelineError::invalid_property(&node.id, key, "expected a list of strings"))?;
    items
        .iter()
        .map(|item| {
            item.as_str().map(str::to_string).ok_or_else(|| {
                PipelineError::invalid_property(&node.id, key, "expected a list of strings")
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_config_json_shape() {
        let config = PipelineConfig::from_json(
            r#"{
                "name": "basic",
                "version": "1.0",
                "nodes": [
                    {"id": "cap", "nodeType": "capture"},
                    {"id": "jpg", "nodeType": "file", "properties": {"extension": "jpg"}}
                ],
                "edges": [{"from": "cap", "to": "jpg"}]
            }"#,
        )
        .unwrap();
        assert_eq!(config.nodes.len(), 2);
        assert_eq!(config.edges[0].edge_type, EdgeType::Sequential);
        assert_eq!(config.find_node("jpg").unwrap().properties["extension"], "jpg");

        let round = PipelineConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(round.name, "basic");

        assert!(matches!(
            PipelineConfig::from_json("{\"name\": 1}"),
            Err(PipelineError::Serialization(_))
        ));
    }

    fn config_node(node_type: &str, properties: serde_json::Value) -> ConfigNode {
        ConfigNode {
            id: "n1".to_string(),
            node_type: node_type.to_string(),
            name: String::new(),
            properties,
        }
    }

    #[test]
    fn test_parse_each_kind() {
        let file = NodeKind::from_config(&config_node("file", json!({"extension": ".DNG"}))).unwrap();
        assert_eq!(file, NodeKind::File { extension: "dng".to_string() });

        let process =
            NodeKind::from_config(&config_node("Process", json!({"method_ids": ["hdr", "bw"]})))
                .unwrap();
        assert_eq!(
            process,
            NodeKind::Process { method_ids: vec!["hdr".to_string(), "bw".to_string()] }
        );

        let term = NodeKind::from_config(&config_node(
            "termination",
            json!({"termination_type": "archive"}),
        ))
        .unwrap();
        assert_eq!(term.category(), NodeCategory::Termination);

        let capture = NodeKind::from_config(&config_node("capture", serde_json::Value::Null)).unwrap();
        assert_eq!(capture, NodeKind::Capture);
    }

    #[test]
    fn test_unknown_kind_is_construction_error() {
        let err = NodeKind::from_config(&config_node("teleport", json!({}))).unwrap_err();
        assert!(matches!(err, PipelineError::UnknownNodeKind { .. }));
    }

    #[test]
    fn test_missing_properties_parse_empty() {
        let file = NodeKind::from_config(&config_node("file", json!({}))).unwrap();
        assert_eq!(file, NodeKind::File { extension: String::new() });

        let term = NodeKind::from_config(&config_node("termination", json!({}))).unwrap();
        assert_eq!(term, NodeKind::Termination { termination_type: None });
    }

    #[test]
    fn test_malformed_property_rejected() {
        let err = NodeKind::from_config(&config_node("process", json!({"method_ids": "hdr"})))
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidProperty { .. }));

        let err = NodeKind::from_config(&config_node("file", json!(["jpg"]))).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidProperty { .. }));
    }
}
