//! End-to-end analysis of a collection against a stored pipeline
//!
//! Validation and path enumeration only read the graph, so both run at the
//! same time on the blocking pool against a shared `Arc<PipelineGraph>`.
//! Classification follows once the paths are known.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use pipeline_engine::{
    classify_collection, enumerate_paths_with, validate, AnalysisConfig, CollectionReport,
    EventSink, NullEventSink, PipelineGraph, PipelinePath, ReferenceRegistry, ValidationError,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::listing::FileListing;
use crate::store::PipelineSource;

/// Outcome of one analysis run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub analysis_id: Uuid,
    pub pipeline_id: String,
    /// Pipeline name
    pub pipeline: String,
    pub version: String,
    pub generated_at: DateTime<Utc>,
    /// Structural problems; empty for a valid pipeline
    pub errors: Vec<ValidationError>,
    pub paths: Vec<PipelinePath>,
    /// Enumeration stopped early; `paths` is incomplete
    pub budget_exhausted: bool,
    /// Absent when the pipeline is invalid and invalid pipelines are not classified
    pub collection: Option<CollectionReport>,
}

impl AnalysisReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Runs validation, enumeration and classification for stored pipelines
pub struct PipelineAnalyzer {
    source: Arc<dyn PipelineSource>,
    listing: Arc<dyn FileListing>,
    registry: Option<Arc<ReferenceRegistry>>,
    event_sink: Arc<dyn EventSink>,
    config: AnalysisConfig,
}

impl PipelineAnalyzer {
    pub fn new(source: Arc<dyn PipelineSource>, listing: Arc<dyn FileListing>) -> Self {
        Self {
            source,
            listing,
            registry: None,
            event_sink: Arc::new(NullEventSink),
            config: AnalysisConfig::default(),
        }
    }

    /// Check processing methods and extensions against `registry`
    pub fn with_registry(mut self, registry: Arc<ReferenceRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Report enumeration progress to `sink`
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = sink;
        self
    }

    pub fn with_config(mut self, config: AnalysisConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Analyse the collection at `location` against pipeline `pipeline_id`
    pub async fn analyze(&self, pipeline_id: &str, location: &str) -> Result<AnalysisReport> {
        let pipeline = self.source.load(pipeline_id).await?;
        let graph = Arc::new(PipelineGraph::from_config(&pipeline)?);
        log::debug!(
            "Analysing '{}' against pipeline '{}' ({} nodes)",
            location,
            pipeline_id,
            graph.node_count()
        );

        let validation = {
            let graph = Arc::clone(&graph);
            let registry = self.registry.clone();
            tokio::task::spawn_blocking(move || validate(&graph, registry.as_deref()))
        };
        let enumeration = {
            let graph = Arc::clone(&graph);
            let limits = self.config.enumeration.clone();
            let sink = Arc::clone(&self.event_sink);
            tokio::task::spawn_blocking(move || enumerate_paths_with(&graph, &limits, sink.as_ref()))
        };
        let (errors, enumeration) = tokio::join!(validation, enumeration);
        let errors = errors?;
        let enumeration = enumeration?;

        if enumeration.budget_exhausted {
            log::warn!(
                "Pipeline '{}' has more paths than the work budget allows; results are partial",
                pipeline_id
            );
        }

        let (paths, collection) = if errors.is_empty() || self.config.classify_invalid {
            let files = self.listing.list_files(location).await?;
            let classifier = self.config.classification.clone();
            let graph = Arc::clone(&graph);
            let paths = enumeration.paths;
            let (paths, report) = tokio::task::spawn_blocking(move || {
                let report = classify_collection(&graph, &paths, &files, &classifier);
                (paths, report)
            })
            .await?;
            (paths, Some(report))
        } else {
            log::info!(
                "Pipeline '{}' has {} structural error(s); skipping classification",
                pipeline_id,
                errors.len()
            );
            (enumeration.paths, None)
        };

        let report = AnalysisReport {
            analysis_id: Uuid::new_v4(),
            pipeline_id: pipeline_id.to_string(),
            pipeline: pipeline.name,
            version: pipeline.version,
            generated_at: Utc::now(),
            errors,
            paths,
            budget_exhausted: enumeration.budget_exhausted,
            collection,
        };

        log::info!(
            "Analysis {} of '{}' finished: {} error(s), {} path(s)",
            report.analysis_id,
            location,
            report.errors.len(),
            report.paths.len()
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;
    use crate::listing::{DirectoryListing, StaticListing};
    use crate::store::JsonPipelineStore;
    use pipeline_engine::{
        ConsistencyStatus, EnumerationEvent, PipelineBuilder, ValidationErrorType, VecEventSink,
    };
    use tempfile::TempDir;

    /// cap -> raw -> edit(hdr) -> tif -> done
    fn edit_pipeline() -> pipeline_engine::PipelineConfig {
        PipelineBuilder::new("Edit", "2.0")
            .capture("cap")
            .file("raw", "dng")
            .process("edit", &["hdr"])
            .file("tif", "tif")
            .termination("done", "archive")
            .edge("cap", "raw")
            .edge("raw", "edit")
            .edge("edit", "tif")
            .edge("tif", "done")
            .build()
    }

    /// Valid apart from an orphaned File node
    fn orphan_pipeline() -> pipeline_engine::PipelineConfig {
        PipelineBuilder::new("Orphan", "1.0")
            .capture("cap")
            .file("jpg", "jpg")
            .file("stray", "png")
            .termination("done", "archive")
            .edge("cap", "jpg")
            .edge("jpg", "done")
            .edge("stray", "done")
            .build()
    }

    fn store() -> Arc<JsonPipelineStore> {
        let mut store = JsonPipelineStore::new();
        store.insert("edit", edit_pipeline()).unwrap();
        store.insert("orphan", orphan_pipeline()).unwrap();
        Arc::new(store)
    }

    fn listing() -> Arc<StaticListing> {
        Arc::new(
            StaticListing::new()
                .with_collection(
                    "shoot",
                    ["AB3D0001.dng", "AB3D0001-hdr.tif", "AB3D0002.dng", "notes.txt"],
                )
                .with_collection("other", ["AB3D0001.jpg"]),
        )
    }

    #[tokio::test]
    async fn test_analyze_valid_pipeline() {
        let analyzer = PipelineAnalyzer::new(store(), listing());
        let report = analyzer.analyze("edit", "shoot").await.unwrap();

        assert!(report.is_valid());
        assert_eq!(report.pipeline, "Edit");
        assert_eq!(report.version, "2.0");
        assert_eq!(report.paths.len(), 1);
        assert!(!report.budget_exhausted);

        let collection = report.collection.unwrap();
        assert_eq!(collection.groups["AB3D0001"].status, ConsistencyStatus::Consistent);
        assert_eq!(collection.groups["AB3D0002"].status, ConsistencyStatus::Partial);
        assert_eq!(collection.unrecognized_files, vec!["notes.txt"]);
    }

    #[tokio::test]
    async fn test_invalid_pipeline_skips_classification() {
        let analyzer = PipelineAnalyzer::new(store(), listing());
        let report = analyzer.analyze("orphan", "other").await.unwrap();
        assert!(!report.is_valid());
        assert!(report
            .errors
            .iter()
            .any(|e| e.error_type == ValidationErrorType::OrphanedNode));
        assert!(report.collection.is_none());

        let analyzer = PipelineAnalyzer::new(store(), listing()).with_config(AnalysisConfig {
            classify_invalid: true,
            ..Default::default()
        });
        let report = analyzer.analyze("orphan", "other").await.unwrap();
        let collection = report.collection.unwrap();
        assert_eq!(collection.groups["AB3D0001"].status, ConsistencyStatus::Consistent);
    }

    #[tokio::test]
    async fn test_registry_checks_methods() {
        let registry = ReferenceRegistry::with_entries(["bw"], ["dng", "tif"]);
        let analyzer = PipelineAnalyzer::new(store(), listing()).with_registry(Arc::new(registry));
        let report = analyzer.analyze("edit", "shoot").await.unwrap();
        assert!(report
            .errors
            .iter()
            .any(|e| e.error_type == ValidationErrorType::InvalidReference));
    }

    #[tokio::test]
    async fn test_unknown_pipeline() {
        let analyzer = PipelineAnalyzer::new(store(), listing());
        assert!(matches!(
            analyzer.analyze("missing", "shoot").await,
            Err(ServiceError::PipelineNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_events_and_budget() {
        let sink = Arc::new(VecEventSink::new());
        let mut config = AnalysisConfig::default();
        config.enumeration.max_steps = 1;
        let analyzer = PipelineAnalyzer::new(store(), listing())
            .with_event_sink(sink.clone())
            .with_config(config);

        let report = analyzer.analyze("edit", "shoot").await.unwrap();
        assert!(report.budget_exhausted);
        assert!(report.paths.is_empty());
        assert!(sink
            .events()
            .iter()
            .any(|e| matches!(e, EnumerationEvent::BudgetExhausted { .. })));
    }

    #[tokio::test]
    async fn test_directory_collection_end_to_end() {
        let temp_dir = TempDir::new().unwrap();
        let pipelines = temp_dir.path().join("pipelines");
        let photos = temp_dir.path().join("photos");
        std::fs::create_dir_all(&photos).unwrap();
        for name in ["XY120001.dng", "XY120001-hdr.tif", "XY120002.DNG"] {
            std::fs::write(photos.join(name), b"").unwrap();
        }

        let mut store = JsonPipelineStore::with_persistence(&pipelines);
        store.insert("edit", edit_pipeline()).unwrap();

        let analyzer = PipelineAnalyzer::new(
            Arc::new(store),
            Arc::new(DirectoryListing::with_root(temp_dir.path())),
        );
        let report = analyzer.analyze("edit", "photos").await.unwrap();
        let collection = report.collection.clone().unwrap();
        assert_eq!(collection.counts.consistent, 1);
        assert_eq!(collection.counts.partial, 1);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["pipelineId"], "edit");
        assert_eq!(json["collection"]["groups"]["XY120001"]["status"], "CONSISTENT");
        assert!(json["generatedAt"].is_string());
    }
}
