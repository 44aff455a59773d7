//! Error types for the pipeline service

use pipeline_engine::PipelineError;
use thiserror::Error;

/// Result type alias using ServiceError
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Errors that can occur while loading pipelines or analysing collections
#[derive(Debug, Error)]
pub enum ServiceError {
    /// No pipeline is stored under the requested id
    #[error("Pipeline not found: {0}")]
    PipelineNotFound(String),

    /// The id cannot name a file inside the persistence directory
    #[error("Invalid pipeline id: {0:?}")]
    InvalidPipelineId(String),

    /// Filesystem error while reading pipelines or listing a collection
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A pipeline file could not be parsed or written
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The pipeline config could not be turned into a graph
    #[error("Pipeline error: {0}")]
    Engine(#[from] PipelineError),

    /// A blocking analysis task panicked or was cancelled
    #[error("Analysis task failed: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}
