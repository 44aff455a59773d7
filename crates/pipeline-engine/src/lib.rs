//! Pipeline Engine - Photo-archival pipeline analysis
//!
//! A pipeline is a directed graph describing how captured photos become
//! archived files: Capture, File, Process, Pairing, Branching and
//! Termination nodes connected by sequential or pairing-input edges.
//! This crate provides:
//!
//! - Structural validation (cycles, orphans, dead ends, node constraints)
//! - Enumeration of every Capture-to-Termination path, with Pairing joins
//! - Derivation of the filenames each path is expected to produce
//! - Classification of an actual file collection against those expectations
//!
//! # Architecture
//!
//! - `PipelineGraph`: immutable, index-based graph built from a `PipelineConfig`
//! - `validate`: collects every structural problem instead of stopping at the first
//! - `enumerate_paths_with`: bounded, memoized path enumeration reporting to an `EventSink`
//! - `classify_collection`: groups files by base and picks the best-matching path
//!
//! # Example
//!
//! ```
//! use pipeline_engine::{classify, validate, ConsistencyStatus, PipelineBuilder, PipelineGraph};
//!
//! let config = PipelineBuilder::new("basic", "1.0")
//!     .capture("camera")
//!     .file("jpg", "jpg")
//!     .termination("done", "archive")
//!     .edge("camera", "jpg")
//!     .edge("jpg", "done")
//!     .build();
//! let graph = PipelineGraph::from_config(&config).unwrap();
//! assert!(validate(&graph, None).is_empty());
//!
//! let groups = classify(&graph, &["AB3D0001.jpg"]);
//! assert_eq!(groups["AB3D0001"].status, ConsistencyStatus::Consistent);
//! ```

pub mod builder;
pub mod collection;
pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod graph;
pub mod naming;
pub mod paths;
pub mod registry;
pub mod types;
pub mod validation;

// Re-export key types
pub use builder::PipelineBuilder;
pub use collection::{
    classify, classify_collection, classify_image_group, CollectionReport, ConsistencyStatus,
    ImageGroup, StatusCounts,
};
pub use config::{AnalysisConfig, ClassifierConfig, EnumerationLimits};
pub use error::{PipelineError, Result};
pub use events::{EnumerationEvent, EventError, EventSink, NullEventSink, VecEventSink};
pub use graph::{PipelineGraph, TopologicalOrder};
pub use naming::{derive_filenames, expected_files_by_termination, parse_filename, ParsedFilename};
pub use paths::{
    enumerate_paths, enumerate_paths_with, PathEnumeration, PathOutcome, PathStep, PipelinePath,
};
pub use registry::{ProcessingMethod, ReferenceRegistry};
pub use types::{
    ConfigEdge, ConfigNode, EdgeType, NodeCategory, NodeId, NodeKind, PipelineConfig, PipelineNode,
};
pub use validation::{validate, ValidationError, ValidationErrorType};
