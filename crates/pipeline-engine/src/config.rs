//! Configuration types for enumeration and classification

use serde::{Deserialize, Serialize};

use crate::constants::defaults;

/// Bounds applied while enumerating paths
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EnumerationLimits {
    /// Times one node may occur on a single branch; the next occurrence
    /// truncates the branch
    pub max_node_visits: u32,
    /// Node expansions allowed for one run before giving up
    pub max_steps: usize,
}

impl Default for EnumerationLimits {
    fn default() -> Self {
        Self {
            max_node_visits: defaults::MAX_NODE_VISITS,
            max_steps: defaults::MAX_ENUMERATION_STEPS,
        }
    }
}

/// Options for collection classification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClassifierConfig {
    /// Termination types in order of preference when a group matches paths
    /// equally well. Unlisted types rank after listed ones.
    pub termination_priority: Vec<String>,
    /// Compare file extensions ignoring ASCII case
    pub case_insensitive_extensions: bool,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            termination_priority: Vec::new(),
            case_insensitive_extensions: defaults::CASE_INSENSITIVE_EXTENSIONS,
        }
    }
}

impl ClassifierConfig {
    /// Rank of a termination type; lower is preferred
    pub fn priority_of(&self, termination_type: Option<&str>) -> usize {
        termination_type
            .and_then(|t| self.termination_priority.iter().position(|p| p == t))
            .unwrap_or(self.termination_priority.len())
    }
}

/// Settings for one full analysis run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnalysisConfig {
    pub enumeration: EnumerationLimits,
    pub classification: ClassifierConfig,
    /// Classify collections even when the pipeline has structural errors
    pub classify_invalid: bool,
}
