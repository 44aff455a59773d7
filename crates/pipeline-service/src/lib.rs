//! Pipeline Service - Async analysis of photo collections
//!
//! Wraps the synchronous pipeline engine with the pieces a host needs:
//!
//! - `PipelineSource`: where pipeline definitions come from (`JsonPipelineStore`)
//! - `FileListing`: where collection filenames come from (`DirectoryListing`, `StaticListing`)
//! - `PipelineAnalyzer`: loads a pipeline, validates and enumerates it
//!   concurrently, then classifies a collection into an `AnalysisReport`
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use pipeline_service::{DirectoryListing, JsonPipelineStore, PipelineAnalyzer};
//!
//! let mut store = JsonPipelineStore::with_persistence("pipelines");
//! store.load_from_disk()?;
//!
//! let analyzer = PipelineAnalyzer::new(Arc::new(store), Arc::new(DirectoryListing::new()));
//! let report = analyzer.analyze("standard", "/photos/2024-06").await?;
//! println!("{}", serde_json::to_string_pretty(&report)?);
//! ```

pub mod analyzer;
pub mod error;
pub mod listing;
pub mod store;

// Re-export key types
pub use analyzer::{AnalysisReport, PipelineAnalyzer};
pub use error::{Result, ServiceError};
pub use listing::{DirectoryListing, FileListing, StaticListing};
pub use store::{JsonPipelineStore, PipelineSource, PipelineSummary};
