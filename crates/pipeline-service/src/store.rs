//! Pipeline storage with file persistence
//!
//! Pipelines are kept in memory for fast access, with optional persistence
//! to a directory holding one `<id>.json` file per pipeline.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use pipeline_engine::PipelineConfig;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ServiceError};

/// Metadata for a stored pipeline (for listing)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineSummary {
    pub id: String,
    pub name: String,
    pub version: String,
    pub description: String,
    pub node_count: usize,
    pub edge_count: usize,
}

impl PipelineSummary {
    fn new(id: &str, config: &PipelineConfig) -> Self {
        Self {
            id: id.to_string(),
            name: config.name.clone(),
            version: config.version.clone(),
            description: config.description.clone(),
            node_count: config.nodes.len(),
            edge_count: config.edges.len(),
        }
    }
}

/// Source of pipeline definitions
///
/// Abstracts over where pipelines live (a directory, a database, a remote
/// service) so the analyzer only depends on this lookup.
#[async_trait]
pub trait PipelineSource: Send + Sync {
    /// Load the pipeline stored under `id`
    async fn load(&self, id: &str) -> Result<PipelineConfig>;

    /// List every available pipeline, ordered by id
    async fn list(&self) -> Result<Vec<PipelineSummary>>;
}

/// In-memory pipeline store with optional JSON file persistence
///
/// # Example
///
/// ```ignore
/// use pipeline_service::JsonPipelineStore;
///
/// let mut store = JsonPipelineStore::with_persistence("pipelines");
/// let count = store.load_from_disk()?;
/// store.insert("basic", config)?;
/// ```
#[derive(Debug, Default)]
pub struct JsonPipelineStore {
    pipelines: HashMap<String, PipelineConfig>,
    persist_path: Option<PathBuf>,
}

impl JsonPipelineStore {
    /// Create a new in-memory store without persistence
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that persists to the given directory
    ///
    /// The directory is created on first save.
    pub fn with_persistence(path: impl AsRef<Path>) -> Self {
        Self {
            pipelines: HashMap::new(),
            persist_path: Some(path.as_ref().to_path_buf()),
        }
    }

    /// Load every `*.json` pipeline from the persistence directory
    ///
    /// Files that fail to parse are skipped with a warning. Returns the
    /// number of pipelines loaded.
    pub fn load_from_disk(&mut self) -> Result<usize> {
        let Some(ref path) = self.persist_path else {
            return Ok(0);
        };

        if !path.exists() {
            return Ok(0);
        }

        let mut count = 0;
        for entry in std::fs::read_dir(path)? {
            let file_path = entry?.path();
            if file_path.extension().map_or(true, |e| e != "json") {
                continue;
            }
            let Some(id) = file_path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            let content = std::fs::read_to_string(&file_path)?;
            match PipelineConfig::from_json(&content) {
                Ok(config) => {
                    log::info!("Loaded pipeline '{}' from {:?}", id, file_path);
                    self.pipelines.insert(id.to_string(), config);
                    count += 1;
                }
                Err(e) => {
                    log::warn!("Failed to parse pipeline from {:?}: {}", file_path, e);
                }
            }
        }
        Ok(count)
    }

    /// Path of `<id>.json`, or `None` without persistence
    ///
    /// Ids that would escape the directory are rejected.
    fn file_path(&self, id: &str) -> Result<Option<PathBuf>> {
        let Some(ref dir) = self.persist_path else {
            return Ok(None);
        };
        if id.is_empty() || id.contains(['/', '\\']) || id.starts_with('.') {
            return Err(ServiceError::InvalidPipelineId(id.to_string()));
        }
        Ok(Some(dir.join(format!("{}.json", id))))
    }

    fn save_to_disk(&self, id: &str, config: &PipelineConfig) -> Result<()> {
        let (Some(dir), Some(file_path)) = (&self.persist_path, self.file_path(id)?) else {
            return Ok(());
        };

        std::fs::create_dir_all(dir)?;
        std::fs::write(&file_path, serde_json::to_string_pretty(config)?)?;
        log::debug!("Saved pipeline '{}' to {:?}", id, file_path);
        Ok(())
    }

    fn delete_from_disk(&self, id: &str) -> Result<()> {
        let Ok(Some(file_path)) = self.file_path(id) else {
            return Ok(());
        };
        if file_path.exists() {
            std::fs::remove_file(&file_path)?;
            log::debug!("Deleted pipeline '{}' from {:?}", id, file_path);
        }
        Ok(())
    }

    /// Get a pipeline by id
    pub fn get(&self, id: &str) -> Option<&PipelineConfig> {
        self.pipelines.get(id)
    }

    /// Insert or replace a pipeline, persisting it if enabled
    pub fn insert(&mut self, id: impl Into<String>, config: PipelineConfig) -> Result<()> {
        let id = id.into();
        self.save_to_disk(&id, &config)?;
        self.pipelines.insert(id, config);
        Ok(())
    }

    /// Remove a pipeline, returning it if it existed
    pub fn remove(&mut self, id: &str) -> Result<Option<PipelineConfig>> {
        self.delete_from_disk(id)?;
        Ok(self.pipelines.remove(id))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.pipelines.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }
}

#[async_trait]
impl PipelineSource for JsonPipelineStore {
    async fn load(&self, id: &str) -> Result<PipelineConfig> {
        if let Some(config) = self.pipelines.get(id) {
            return Ok(config.clone());
        }

        // Pipelines written to the directory after startup
        let Some(file_path) = self.file_path(id)? else {
            return Err(ServiceError::PipelineNotFound(id.to_string()));
        };
        match tokio::fs::read_to_string(&file_path).await {
            Ok(content) => Ok(PipelineConfig::from_json(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ServiceError::PipelineNotFound(id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self) -> Result<Vec<PipelineSummary>> {
        let mut summaries: Vec<PipelineSummary> = self
            .pipelines
            .iter()
            .map(|(id, config)| PipelineSummary::new(id, config))
            .collect();
        summaries.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(summaries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipeline_engine::PipelineBuilder;
    use tempfile::TempDir;

    fn basic_pipeline(name: &str) -> PipelineConfig {
        PipelineBuilder::new(name, "1.0")
            .with_description("single jpg")
            .capture("cap")
            .file("jpg", "jpg")
            .termination("done", "archive")
            .edge("cap", "jpg")
            .edge("jpg", "done")
            .build()
    }

    #[tokio::test]
    async fn test_in_memory_store() {
        let mut store = JsonPipelineStore::new();
        store.insert("basic", basic_pipeline("Basic")).unwrap();

        assert!(store.contains("basic"));
        assert_eq!(store.load("basic").await.unwrap().name, "Basic");
        assert!(matches!(
            store.load("missing").await,
            Err(ServiceError::PipelineNotFound(_))
        ));

        let list = store.list().await.unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].id, "basic");
        assert_eq!(list[0].node_count, 3);
        assert_eq!(list[0].edge_count, 2);

        assert!(store.remove("basic").unwrap().is_some());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_persistent_store() {
        let temp_dir = TempDir::new().unwrap();
        let persist_path = temp_dir.path().join("pipelines");

        {
            let mut store = JsonPipelineStore::with_persistence(&persist_path);
            store.insert("basic", basic_pipeline("Basic")).unwrap();
            store.insert("other", basic_pipeline("Other")).unwrap();
        }

        let mut store = JsonPipelineStore::with_persistence(&persist_path);
        assert_eq!(store.load_from_disk().unwrap(), 2);
        let ids: Vec<String> = store.list().await.unwrap().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["basic", "other"]);

        store.remove("other").unwrap();
        assert!(!persist_path.join("other.json").exists());
    }

    #[tokio::test]
    async fn test_load_reads_files_added_later() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonPipelineStore::with_persistence(temp_dir.path());

        std::fs::write(
            temp_dir.path().join("late.json"),
            basic_pipeline("Late").to_json().unwrap(),
        )
        .unwrap();
        assert_eq!(store.load("late").await.unwrap().name, "Late");
        assert!(matches!(
            store.load("../late").await,
            Err(ServiceError::InvalidPipelineId(_))
        ));
    }

    #[test]
    fn test_insert_rejects_ids_outside_directory() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = JsonPipelineStore::with_persistence(temp_dir.path().join("pipelines"));

        for id in ["../escape", "nested/id", ".hidden", ""] {
            assert!(matches!(
                store.insert(id, basic_pipeline("Bad")),
                Err(ServiceError::InvalidPipelineId(_))
            ));
            assert!(!store.contains(id));
        }
        assert!(!temp_dir.path().join("escape.json").exists());

        // Without persistence any id is a map key
        let mut memory = JsonPipelineStore::new();
        memory.insert("nested/id", basic_pipeline("Memory")).unwrap();
        assert!(memory.contains("nested/id"));
    }

    #[test]
    fn test_unparsable_files_skipped() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("broken.json"), "{ not json").unwrap();
        std::fs::write(temp_dir.path().join("notes.txt"), "ignored").unwrap();
        std::fs::write(
            temp_dir.path().join("good.json"),
            basic_pipeline("Good").to_json().unwrap(),
        )
        .unwrap();

        let mut store = JsonPipelineStore::with_persistence(temp_dir.path());
        assert_eq!(store.load_from_disk().unwrap(), 1);
        assert!(store.contains("good"));
        assert!(!store.contains("broken"));
    }
}
