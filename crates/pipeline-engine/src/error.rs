//! Error types for the pipeline engine
//!
//! These cover construction-time failures only. Structural problems in a
//! user-authored pipeline are reported as [`crate::ValidationError`] values.

use thiserror::Error;

/// Result type alias using PipelineError
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors raised while turning a pipeline config into a graph
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A node declares a kind the engine does not know
    #[error("Unknown node kind '{kind}' for node '{node_id}'")]
    UnknownNodeKind { node_id: String, kind: String },

    /// Two nodes share the same identifier
    #[error("Duplicate node id '{0}'")]
    DuplicateNodeId(String),

    /// An edge references a node that does not exist
    #[error("Edge {from} -> {to} references unknown node '{missing}'")]
    UnknownEdgeNode {
        from: String,
        to: String,
        missing: String,
    },

    /// A node property has the wrong shape
    #[error("Invalid property '{property}' on node '{node_id}': {reason}")]
    InvalidProperty {
        node_id: String,
        property: String,
        reason: String,
    },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PipelineError {
    /// Create an invalid property error
    pub fn invalid_property(
        node_id: impl Into<String>,
        property: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidProperty {
            node_id: node_id.into(),
            property: property.into(),
            reason: reason.into(),
        }
    }
}
