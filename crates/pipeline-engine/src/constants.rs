//! Engine-wide constants
//!
//! Single source of truth for node kind names, property keys, and the
//! default limits used by enumeration and classification.

/// Node kind identifiers as they appear in pipeline configs
pub mod node_kinds {
    pub const CAPTURE: &str = "capture";
    pub const FILE: &str = "file";
    pub const PROCESS: &str = "process";
    pub const PAIRING: &str = "pairing";
    pub const BRANCHING: &str = "branching";
    pub const TERMINATION: &str = "termination";
}

/// Property keys read from `ConfigNode::properties`
pub mod properties {
    pub const EXTENSION: &str = "extension";
    pub const METHOD_IDS: &str = "method_ids";
    pub const TERMINATION_TYPE: &str = "termination_type";
    pub const PAIRING_TYPE: &str = "pairing_type";
}

/// Default values for enumeration and classification
pub mod defaults {
    /// Occurrences of one node allowed on a single branch before it is truncated
    pub const MAX_NODE_VISITS: u32 = 1;
    /// Work budget for one enumeration run (node expansions)
    pub const MAX_ENUMERATION_STEPS: usize = 100_000;
    /// Compare file extensions ignoring ASCII case
    pub const CASE_INSENSITIVE_EXTENSIONS: bool = true;
}

/// Filename conventions
pub mod naming {
    /// Separator placed before each processing method suffix
    pub const METHOD_SUFFIX_SEPARATOR: char = '-';
    /// Characters in a camera identifier
    pub const CAMERA_ID_LEN: usize = 4;
    /// Digits in a capture counter
    pub const COUNTER_LEN: usize = 4;
}
