//! Collection listing
//!
//! A listing produces the filenames of one photo collection. Where the
//! files live (a local directory, a cloud bucket, a fixed fixture) is up to
//! the implementation.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::Result;

/// Trait for listing the filenames of a collection
#[async_trait]
pub trait FileListing: Send + Sync {
    /// Filenames (not paths) found at `location`
    async fn list_files(&self, location: &str) -> Result<Vec<String>>;
}

/// Lists regular files in a local directory
///
/// Locations are resolved relative to `root` when one is set.
#[derive(Debug, Clone, Default)]
pub struct DirectoryListing {
    root: Option<PathBuf>,
}

impl DirectoryListing {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    fn resolve(&self, location: &str) -> PathBuf {
        match &self.root {
            Some(root) => root.join(location),
            None => PathBuf::from(location),
        }
    }
}

#[async_trait]
impl FileListing for DirectoryListing {
    async fn list_files(&self, location: &str) -> Result<Vec<String>> {
        let dir = self.resolve(location);
        let mut entries = tokio::fs::read_dir(&dir).await?;

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) => files.push(name),
                Err(name) => log::warn!("Skipping non UTF-8 filename {:?} in {:?}", name, dir),
            }
        }
        files.sort();

        log::debug!("Listed {} file(s) in {:?}", files.len(), dir);
        Ok(files)
    }
}

/// Serves fixed filename lists, keyed by location
///
/// Unknown locations list as empty.
#[derive(Debug, Clone, Default)]
pub struct StaticListing {
    collections: HashMap<String, Vec<String>>,
}

impl StaticListing {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a collection at `location`
    pub fn with_collection<I, S>(mut self, location: impl Into<String>, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.collections
            .insert(location.into(), files.into_iter().map(Into::into).collect());
        self
    }
}

#[async_trait]
impl FileListing for StaticListing {
    async fn list_files(&self, location: &str) -> Result<Vec<String>> {
        Ok(self.collections.get(location).cloned().unwrap_or_default())
    }
}
