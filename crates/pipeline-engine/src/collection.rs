//! Collection classification
//!
//! Actual filenames are grouped by base (camera id + counter) and every
//! group is compared against the files each completed path would produce
//! for that base.

use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use crate::config::ClassifierConfig;
use crate::graph::PipelineGraph;
use crate::naming::{base_name, comparison_key, derive_trace, parse_filename, TraceEntry};
use crate::paths::{enumerate_paths, PipelinePath};
use crate::types::NodeId;

/// How well an image group matches the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConsistencyStatus {
    /// Every file of at least one path is present
    Consistent,
    /// Some files of a path are present, but no path is complete
    Partial,
    /// No expected file of any path is present
    Inconsistent,
}

impl ConsistencyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsistencyStatus::Consistent => "CONSISTENT",
            ConsistencyStatus::Partial => "PARTIAL",
            ConsistencyStatus::Inconsistent => "INCONSISTENT",
        }
    }
}

impl std::fmt::Display for ConsistencyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Files sharing one base identity, with their classification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageGroup {
    pub base: String,
    pub camera_id: String,
    pub counter: String,
    /// Actual files of this group
    pub files: BTreeSet<String>,
    pub status: ConsistencyStatus,
    /// Nodes whose output is evidenced by the files present
    pub completed_nodes: BTreeSet<NodeId>,
    /// Expected files of the best-matching path that are absent
    pub missing_files: BTreeSet<String>,
    /// Files no path expects
    pub unexpected_files: BTreeSet<String>,
    /// Termination type of the best-matching path, unless inconsistent
    pub matched_termination: Option<String>,
}

/// Number of groups per status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCounts {
    pub consistent: usize,
    pub partial: usize,
    pub inconsistent: usize,
}

impl StatusCounts {
    fn record(&mut self, status: ConsistencyStatus) {
        match status {
            ConsistencyStatus::Consistent => self.consistent += 1,
            ConsistencyStatus::Partial => self.partial += 1,
            ConsistencyStatus::Inconsistent => self.inconsistent += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.consistent + self.partial + self.inconsistent
    }
}

/// Classification of a whole collection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionReport {
    pub groups: BTreeMap<String, ImageGroup>,
    /// Filenames that do not follow the naming convention
    pub unrecognized_files: Vec<String>,
    pub counts: StatusCounts,
}

/// Classify a collection against every path of `graph`, with default options
pub fn classify<S: AsRef<str>>(
    graph: &PipelineGraph,
    actual_filenames: &[S],
) -> BTreeMap<String, ImageGroup> {
    let paths = enumerate_paths(graph);
    classify_collection(graph, &paths, actual_filenames, &ClassifierConfig::default()).groups
}

/// Classify a collection against precomputed paths
///
/// Truncated paths are ignored.
pub fn classify_collection<S: AsRef<str>>(
    graph: &PipelineGraph,
    paths: &[PipelinePath],
    actual_filenames: &[S],
    config: &ClassifierConfig,
) -> CollectionReport {
    let mut report = CollectionReport::default();
    let mut grouped: BTreeMap<String, (String, String, Vec<&str>)> = BTreeMap::new();

    for filename in actual_filenames.iter().map(AsRef::as_ref) {
        match parse_filename(filename) {
            Some(parsed) => {
                grouped
                    .entry(parsed.base())
                    .or_insert_with(|| (parsed.camera_id.clone(), parsed.counter.clone(), Vec::new()))
                    .2
                    .push(filename);
            }
            None => report.unrecognized_files.push(filename.to_string()),
        }
    }

    if !report.unrecognized_files.is_empty() {
        log::debug!(
            "{} file(s) do not follow the naming convention",
            report.unrecognized_files.len()
        );
    }

    for (base, (camera_id, counter, files)) in grouped {
        let group = classify_image_group(graph, paths, &camera_id, &counter, &files, config);
        report.counts.record(group.status);
        report.groups.insert(base, group);
    }

    log::info!(
        "Classified {} image group(s) against '{}': {} consistent, {} partial, {} inconsistent",
        report.counts.total(),
        graph.name(),
        report.counts.consistent,
        report.counts.partial,
        report.counts.inconsistent
    );

    report
}

/// What one completed path expects for a given base
struct Candidate<'p> {
    index: usize,
    path: &'p PipelinePath,
    trace: Vec<TraceEntry>,
    /// Deduplicated expected filenames, in production order
    expected: Vec<String>,
    expected_keys: HashSet<String>,
    present: usize,
}

impl Candidate<'_> {
    fn is_complete(&self) -> bool {
        self.present == self.expected.len()
    }

    /// Nodes whose files are all present
    ///
    /// A node is evidenced by everything its path produces up to and
    /// including the first File output at or after it. A node with no File
    /// output downstream needs every file of the path.
    fn completed_nodes(&self, present: &HashSet<String>, case_insensitive: bool) -> Vec<NodeId> {
        let all_present = |files: &[&String]| {
            !files.is_empty()
                && files
                    .iter()
                    .all(|f| present.contains(&comparison_key(f, case_insensitive)))
        };

        let mut completed = Vec::new();
        let mut produced: Vec<&String> = Vec::new();
        let mut pending: Vec<&NodeId> = Vec::new();
        for entry in &self.trace {
            pending.push(&entry.node_id);
            if entry.files.is_empty() {
                continue;
            }
            produced.extend(entry.files.iter());
            if all_present(produced.as_slice()) {
                completed.extend(pending.iter().map(|id| (*id).clone()));
            }
            pending.clear();
        }
        if !pending.is_empty() && all_present(produced.as_slice()) {
            completed.extend(pending.into_iter().cloned());
        }
        completed
    }
}

/// Classify one group of files sharing a base
///
/// `files` may be empty; such a group is inconsistent with every expected
/// file missing from its best-matching path.
pub fn classify_image_group<S: AsRef<str>>(
    graph: &PipelineGraph,
    paths: &[PipelinePath],
    camera_id: &str,
    counter: &str,
    files: &[S],
    config: &ClassifierConfig,
) -> ImageGroup {
    let base = base_name(camera_id, counter);
    let case_insensitive = config.case_insensitive_extensions;
    let files: BTreeSet<String> = files.iter().map(|f| f.as_ref().to_string()).collect();
    let present: HashSet<String> = files
        .iter()
        .map(|f| comparison_key(f, case_insensitive))
        .collect();

    let candidates: Vec<Candidate<'_>> = paths
        .iter()
        .enumerate()
        .filter(|(_, path)| !path.is_truncated())
        .filter_map(|(index, path)| {
            let trace = derive_trace(graph, path, &base);
            let mut expected: Vec<String> = Vec::new();
            for file in trace.iter().flat_map(|e| e.files.iter()) {
                if !expected.contains(file) {
                    expected.push(file.clone());
                }
            }
            if expected.is_empty() {
                return None;
            }
            let expected_keys: HashSet<String> = expected
                .iter()
                .map(|f| comparison_key(f, case_insensitive))
                .collect();
            let present_count = expected_keys.iter().filter(|k| present.contains(*k)).count();
            Some(Candidate {
                index,
                path,
                trace,
                expected,
                present: present_count,
                expected_keys,
            })
        })
        .collect();

    let status = if candidates.iter().any(Candidate::is_complete) {
        ConsistencyStatus::Consistent
    } else if candidates.iter().any(|c| c.present > 0) {
        ConsistencyStatus::Partial
    } else {
        ConsistencyStatus::Inconsistent
    };

    let best = candidates
        .iter()
        .filter(|c| match status {
            ConsistencyStatus::Consistent => c.is_complete(),
            ConsistencyStatus::Partial => c.present > 0,
            ConsistencyStatus::Inconsistent => true,
        })
        .min_by(|a, b| rank(a, b, config));

    let mut completed_nodes = BTreeSet::new();
    for candidate in &candidates {
        completed_nodes.extend(candidate.completed_nodes(&present, case_insensitive));
    }

    let missing_files = best
        .map(|c| {
            c.expected
                .iter()
                .filter(|f| !present.contains(&comparison_key(f, case_insensitive)))
                .cloned()
                .collect()
        })
        .unwrap_or_default();

    let unexpected_files = files
        .iter()
        .filter(|f| {
            let key = comparison_key(f, case_insensitive);
            !candidates.iter().any(|c| c.expected_keys.contains(&key))
        })
        .cloned()
        .collect();

    let matched_termination = match status {
        ConsistencyStatus::Inconsistent => None,
        _ => best.and_then(|c| c.path.termination_type().map(str::to_string)),
    };

    ImageGroup {
        base,
        camera_id: camera_id.to_string(),
        counter: counter.to_string(),
        files,
        status,
        completed_nodes,
        missing_files,
        unexpected_files,
        matched_termination,
    }
}

/// Order candidates best first: most expected files present, then largest
/// expectation, then longest path, then termination priority, then
/// termination type, then enumeration order
fn rank(a: &Candidate<'_>, b: &Candidate<'_>, config: &ClassifierConfig) -> Ordering {
    let key = |c: &Candidate<'_>| {
        (
            Reverse(c.present),
            Reverse(c.expected.len()),
            Reverse(c.path.node_count()),
            config.priority_of(c.path.termination_type()),
            c.path.termination_type().unwrap_or_default().to_string(),
            c.index,
        )
    };
    key(a).cmp(&key(b))
}
