//! Reference registries for cross-reference validation
//!
//! Processing methods and file extensions are defined outside a pipeline.
//! The host fills a [`ReferenceRegistry`] from whatever store it keeps them
//! in and hands it to the structure validator, which checks that every
//! `method_id` and `extension` a pipeline mentions is known.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::types::normalize_extension;

/// A processing method definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingMethod {
    /// Identifier referenced by Process nodes
    pub id: String,
    /// Human-readable label
    pub label: String,
}

impl ProcessingMethod {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

/// Registry of known processing methods and file extensions
///
/// # Composability
///
/// Registries can be composed by merging:
/// ```
/// use pipeline_engine::ReferenceRegistry;
///
/// let mut registry = ReferenceRegistry::new();
/// registry.register_extension("dng");
///
/// let mut extra = ReferenceRegistry::new();
/// extra.register_extension(".JPG");
/// registry.merge(extra);
///
/// assert!(registry.has_extension("jpg"));
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceRegistry {
    methods: HashMap<String, ProcessingMethod>,
    extensions: BTreeSet<String>,
}

impl ReferenceRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from method ids and extensions
    pub fn with_entries<M, E>(methods: M, extensions: E) -> Self
    where
        M: IntoIterator,
        M::Item: Into<String>,
        E: IntoIterator,
        E::Item: AsRef<str>,
    {
        let mut registry = Self::new();
        for id in methods {
            let id = id.into();
            registry.register_method(ProcessingMethod::new(id.clone(), id));
        }
        for ext in extensions {
            registry.register_extension(ext.as_ref());
        }
        registry
    }

    /// Register a processing method
    pub fn register_method(&mut self, method: ProcessingMethod) {
        self.methods.insert(method.id.clone(), method);
    }

    /// Register a file extension (case and leading dot are ignored)
    pub fn register_extension(&mut self, extension: &str) {
        let normalized = normalize_extension(extension);
        if !normalized.is_empty() {
            self.extensions.insert(normalized);
        }
    }

    /// Get a processing method by id
    pub fn get_method(&self, id: &str) -> Option<&ProcessingMethod> {
        self.methods.get(id)
    }

    /// Check if a processing method is registered
    pub fn has_method(&self, id: &str) -> bool {
        self.methods.contains_key(id)
    }

    /// Check if a file extension is registered
    pub fn has_extension(&self, extension: &str) -> bool {
        self.extensions.contains(&normalize_extension(extension))
    }

    /// All registered method ids, sorted
    pub fn method_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.methods.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// All registered extensions, sorted
    pub fn extensions(&self) -> impl Iterator<Item = &str> {
        self.extensions.iter().map(String::as_str)
    }

    /// Merge another registry into this one
    ///
    /// Methods from `other` override methods in `self` with the same id.
    pub fn merge(&mut self, other: ReferenceRegistry) {
        self.methods.extend(other.methods);
        self.extensions.extend(other.extensions);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_normalization() {
        let mut registry = ReferenceRegistry::new();
        registry.register_extension(".CR3");
        registry.register_extension("");
        assert!(registry.has_extension("cr3"));
        assert!(registry.has_extension(".Cr3"));
        assert_eq!(registry.extensions().count(), 1);
    }

    #[test]
    fn test_methods() {
        let mut registry = ReferenceRegistry::with_entries(["hdr"], ["dng"]);
        registry.register_method(ProcessingMethod::new("bw", "Black & White"));
        assert!(registry.has_method("hdr"));
        assert_eq!(registry.get_method("bw").unwrap().label, "Black & White");
        assert_eq!(registry.method_ids(), vec!["bw", "hdr"]);
        assert!(!registry.has_method("pano"));
    }

    #[test]
    fn test_merge_overrides() {
        let mut a = ReferenceRegistry::new();
        a.register_method(ProcessingMethod::new("hdr", "old"));
        let mut b = ReferenceRegistry::new();
        b.register_method(ProcessingMethod::new("hdr", "new"));
        b.register_extension("tif");
        a.merge(b);
        assert_eq!(a.get_method("hdr").unwrap().label, "new");
        assert!(a.has_extension("tif"));
    }
}
