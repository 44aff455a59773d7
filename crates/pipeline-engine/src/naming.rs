//! Expected filename derivation and filename parsing
//!
//! A capture is identified by a four-character camera id and a four-digit
//! counter; their concatenation is the `base` every derived filename starts
//! with. Walking a path, a Process node appends `-<method_id>` to the
//! current stem for each of its methods and a File node produces
//! `<stem>.<extension>`. At a Pairing join the two input stems are combined:
//! identical suffixes collapse into one, otherwise both suffixes are kept
//! in input order.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::constants::naming::{CAMERA_ID_LEN, COUNTER_LEN, METHOD_SUFFIX_SEPARATOR};
use crate::graph::PipelineGraph;
use crate::paths::{PathStep, PipelinePath};
use crate::types::{NodeId, NodeKind};

/// Base identity of an image group
pub fn base_name(camera_id: &str, counter: &str) -> String {
    format!("{camera_id}{counter}")
}

/// Filenames a path is expected to produce, in first-produced order
///
/// Pure: depends only on the graph, the path and the identity.
pub fn derive_filenames(
    graph: &PipelineGraph,
    path: &PipelinePath,
    camera_id: &str,
    counter: &str,
) -> Vec<String> {
    let mut filenames: Vec<String> = Vec::new();
    for entry in derive_trace(graph, path, &base_name(camera_id, counter)) {
        for file in entry.files {
            if !filenames.contains(&file) {
                filenames.push(file);
            }
        }
    }
    filenames
}

/// Expected filenames for every completed path, keyed by termination type
///
/// Truncated paths are skipped. Paths whose Termination node has no type
/// are collected under an empty key.
pub fn expected_files_by_termination(
    graph: &PipelineGraph,
    paths: &[PipelinePath],
    camera_id: &str,
    counter: &str,
) -> BTreeMap<String, BTreeSet<String>> {
    let mut expected: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for path in paths.iter().filter(|p| !p.is_truncated()) {
        let key = path.termination_type().unwrap_or_default().to_string();
        expected
            .entry(key)
            .or_default()
            .extend(derive_filenames(graph, path, camera_id, counter));
    }
    expected
}

/// Files produced at one node of a flattened path
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TraceEntry {
    pub node_id: NodeId,
    pub files: Vec<String>,
}

/// Per-node file production along a path, in flattened node order
pub(crate) fn derive_trace(graph: &PipelineGraph, path: &PipelinePath, base: &str) -> Vec<TraceEntry> {
    let mut trace = Vec::new();
    derive_steps(graph, &path.steps, base, &mut trace);
    trace
}

fn derive_steps(
    graph: &PipelineGraph,
    steps: &[PathStep],
    base: &str,
    trace: &mut Vec<TraceEntry>,
) -> String {
    let mut stem = base.to_string();

    for step in steps {
        match step {
            PathStep::Node(node_id) => {
                let mut files = Vec::new();
                match graph.node(node_id).map(|n| &n.kind) {
                    Some(NodeKind::File { extension }) if !extension.is_empty() => {
                        files.push(format!("{stem}.{extension}"));
                    }
                    Some(NodeKind::Process { method_ids }) => {
                        for method_id in method_ids.iter().map(|m| m.trim()).filter(|m| !m.is_empty()) {
                            stem.push(METHOD_SUFFIX_SEPARATOR);
                            stem.push_str(method_id);
                        }
                    }
                    _ => {}
                }
                trace.push(TraceEntry {
                    node_id: node_id.clone(),
                    files,
                });
            }
            PathStep::Join { pairing_id, inputs } => {
                let mut left = Vec::new();
                let stem_a = derive_steps(graph, &inputs[0], base, &mut left);
                let mut right = Vec::new();
                let stem_b = derive_steps(graph, &inputs[1], base, &mut right);

                for entry in right {
                    match left.iter_mut().find(|e| e.node_id == entry.node_id) {
                        Some(existing) => {
                            for file in entry.files {
                                if !existing.files.contains(&file) {
                                    existing.files.push(file);
                                }
                            }
                        }
                        None => left.push(entry),
                    }
                }
                trace.extend(left);
                trace.push(TraceEntry {
                    node_id: pairing_id.clone(),
                    files: Vec::new(),
                });
                stem = combine_stems(base, &stem_a, &stem_b);
            }
        }
    }

    stem
}

/// Combine the stems of two Pairing inputs derived from the same base
pub fn combine_stems(base: &str, stem_a: &str, stem_b: &str) -> String {
    let suffix_a = stem_a.strip_prefix(base).unwrap_or(stem_a);
    let suffix_b = stem_b.strip_prefix(base).unwrap_or(stem_b);
    if suffix_a == suffix_b {
        format!("{base}{suffix_a}")
    } else {
        format!("{base}{suffix_a}{suffix_b}")
    }
}

/// A filename split into its naming-convention parts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedFilename {
    pub camera_id: String,
    pub counter: String,
    /// Everything between the counter and the extension, e.g. "-hdr"
    pub suffix: String,
    pub extension: String,
}

impl ParsedFilename {
    /// Base identity of the group this file belongs to
    pub fn base(&self) -> String {
        base_name(&self.camera_id, &self.counter)
    }
}

/// Characters a File node extension may use so derived names parse back
const EXTENSION_PATTERN: &str = "[A-Za-z0-9]+";

/// Whether `extension` can end a filename that `parse_filename` accepts
pub(crate) fn is_filename_extension(extension: &str) -> bool {
    !extension.is_empty() && extension.bytes().all(|b| b.is_ascii_alphanumeric())
}

fn filename_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(
            r"^([A-Z0-9]{{{CAMERA_ID_LEN}}})([0-9]{{{COUNTER_LEN}}})((?:-.*)?)\.({EXTENSION_PATTERN})$"
        ))
        .expect("filename regex must compile")
    })
}

/// Parse a filename following the `<camera><counter>[-suffix].<ext>` convention
///
/// Returns `None` for names that do not follow it, including counter `0000`.
pub fn parse_filename(filename: &str) -> Option<ParsedFilename> {
    let captures = filename_re().captures(filename)?;
    let counter = &captures[2];
    if counter.bytes().all(|b| b == b'0') {
        return None;
    }
    Some(ParsedFilename {
        camera_id: captures[1].to_string(),
        counter: counter.to_string(),
        suffix: captures[3].to_string(),
        extension: captures[4].to_string(),
    })
}

/// Key used to compare a filename against expectations
pub(crate) fn comparison_key(filename: &str, case_insensitive_extensions: bool) -> String {
    match filename.rsplit_once('.') {
        Some((stem, extension)) if case_insensitive_extensions => {
            format!("{}.{}", stem, extension.to_ascii_lowercase())
        }
        _ => filename.to_string(),
    }
}
