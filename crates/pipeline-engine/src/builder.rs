//! Fluent builder for pipeline configs
//!
//! Provides a compact API for constructing pipelines programmatically,
//! mostly used by tests and by hosts that assemble pipelines in code.

use serde_json::json;

use crate::constants::{node_kinds, properties};
use crate::types::{ConfigEdge, ConfigNode, EdgeType, PipelineConfig};

/// Fluent builder for constructing pipeline configs
///
/// # Example
///
/// ```
/// use pipeline_engine::PipelineBuilder;
///
/// let config = PipelineBuilder::new("basic", "1.0")
///     .capture("capture")
///     .file("raw", "dng")
///     .termination("archive", "black_box")
///     .edge("capture", "raw")
///     .edge("raw", "archive")
///     .build();
///
/// assert_eq!(config.nodes.len(), 3);
/// ```
pub struct PipelineBuilder {
    config: PipelineConfig,
}

impl PipelineBuilder {
    /// Create a new pipeline builder
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            config: PipelineConfig::new(name, version),
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.config.description = description.into();
        self
    }

    /// Add a node with an arbitrary kind name and raw properties
    pub fn node(
        mut self,
        id: impl Into<String>,
        node_type: impl Into<String>,
        properties: serde_json::Value,
    ) -> Self {
        self.config.nodes.push(ConfigNode {
            id: id.into(),
            node_type: node_type.into(),
            name: String::new(),
            properties,
        });
        self
    }

    /// Set the display name of the most recently added node
    pub fn named(mut self, name: impl Into<String>) -> Self {
        if let Some(node) = self.config.nodes.last_mut() {
            node.name = name.into();
        }
        self
    }

    /// Add a Capture node
    pub fn capture(self, id: impl Into<String>) -> Self {
        self.node(id, node_kinds::CAPTURE, serde_json::Value::Null)
    }

    /// Add a File node
    pub fn file(self, id: impl Into<String>, extension: &str) -> Self {
        self.node(
            id,
            node_kinds::FILE,
            single_property(properties::EXTENSION, json!(extension)),
        )
    }

    /// Add a Process node
    pub fn process(self, id: impl Into<String>, method_ids: &[&str]) -> Self {
        self.node(
            id,
            node_kinds::PROCESS,
            single_property(properties::METHOD_IDS, json!(method_ids)),
        )
    }

    /// Add a Pairing node
    pub fn pairing(self, id: impl Into<String>) -> Self {
        self.node(id, node_kinds::PAIRING, serde_json::Value::Null)
    }

    /// Add a Branching node
    pub fn branching(self, id: impl Into<String>) -> Self {
        self.node(id, node_kinds::BRANCHING, serde_json::Value::Null)
    }

    /// Add a Termination node
    pub fn termination(self, id: impl Into<String>, termination_type: &str) -> Self {
        self.node(
            id,
            node_kinds::TERMINATION,
            single_property(properties::TERMINATION_TYPE, json!(termination_type)),
        )
    }

    /// Add a sequential edge
    pub fn edge(self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.typed_edge(from, to, EdgeType::Sequential)
    }

    /// Add a `pairing_input` edge into a Pairing node
    pub fn pairing_input(self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.typed_edge(from, to, EdgeType::PairingInput)
    }

    /// Add an edge with an explicit type
    pub fn typed_edge(
        mut self,
        from: impl Into<String>,
        to: impl Into<String>,
        edge_type: EdgeType,
    ) -> Self {
        self.config.edges.push(ConfigEdge {
            from: from.into(),
            to: to.into(),
            edge_type,
        });
        self
    }

    /// Build the config without validation
    pub fn build(self) -> PipelineConfig {
        self.config
    }
}

fn single_property(key: &str, value: serde_json::Value) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    map.insert(key.to_string(), value);
    serde_json::Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_basic() {
        let config = PipelineBuilder::new("p", "2")
            .with_description("two inputs")
            .capture("cap")
            .named("Camera")
            .file("raw", "dng")
            .file("jpg", "jpg")
            .pairing("pair")
            .pairing_input("raw", "pair")
            .pairing_input("jpg", "pair")
            .edge("cap", "raw")
            .build();

        assert_eq!(config.name, "p");
        assert_eq!(config.description, "two inputs");
        assert_eq!(config.nodes.len(), 4);
        assert_eq!(config.nodes[0].name, "Camera");
        assert_eq!(config.edges.len(), 3);
        assert_eq!(config.edges[0].edge_type, EdgeType::PairingInput);
        assert_eq!(config.edges[2].edge_type, EdgeType::Sequential);
        assert_eq!(config.nodes[1].properties["extension"], "dng");
    }

    #[test]
    fn test_builder_process_properties() {
        let config = PipelineBuilder::new("p", "1").process("edit", &["hdr", "bw"]).build();
        assert_eq!(
            config.nodes[0].properties,
            serde_json::json!({"method_ids": ["hdr", "bw"]})
        );
    }
}
