//! Manifest types for integrity checking.
//!
//! A manifest records every file under the vital paths with its SHA-256
//! content hash; two manifests are diffed by relative path to detect drift.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Hash recorded for a file that could not be read. Legitimate hashes are
/// lowercase hex, so this value can never collide with one.
pub const HASH_ERROR_SENTINEL: &str = "ERROR";

/// Metadata for a single file in the manifest, keyed by repo-relative path.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileRecord {
    pub path: String,
    pub hash: String,
    pub size: u64,
    pub mtime: i64,
    pub is_dir: bool,
}

/// Fingerprinted inventory of all vital paths at a point in time.
///
/// Serialized as `vitals.manifest.json`; exactly one current manifest is
/// persisted at any time. A `BTreeMap` keeps the file on disk and the diff
/// order deterministic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub total_files: usize,
    pub total_dirs: usize,
    pub files: BTreeMap<String, FileRecord>,
}

impl Manifest {
    pub fn empty() -> Self {
        Self {
            version: 1,
            created_at: Utc::now(),
            total_files: 0,
            total_dirs: 0,
            files: BTreeMap::new(),
        }
    }
}

/// Discrepancy kind between two manifests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueKind {
    Missing,
    New,
    Modified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

/// A detected discrepancy between the saved and the current manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub kind: IssueKind,
    pub path: String,
    pub severity: Severity,
}

impl Issue {
    pub fn new(kind: IssueKind, path: impl Into<String>) -> Self {
        // Severity is fixed per kind: a vital that disappeared is always
        // critical, a content change is a warning, a new file is informational.
        let severity = match kind {
            IssueKind::Missing => Severity::Critical,
            IssueKind::Modified => Severity::Warning,
            IssueKind::New => Severity::Info,
        };
        Self {
            kind,
            path: path.into(),
            severity,
        }
    }
}

/// Result of one integrity check.
#[derive(Debug, Clone)]
pub struct CheckReport {
    /// True iff no critical issue was found. Warnings and info never fail
    /// the check.
    pub all_ok: bool,
    pub issues: Vec<Issue>,
}

impl CheckReport {
    pub fn critical_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Critical)
            .count()
    }
}

/// Diff two manifests by relative path.
///
/// Ordering is deterministic: missing paths first, then new, then modified,
/// each group in path order.
pub fn diff_manifests(saved: &Manifest, current: &Manifest) -> Vec<Issue> {
    let mut issues = Vec::new();

    for path in saved.files.keys() {
        if !current.files.contains_key(path) {
            issues.push(Issue::new(IssueKind::Missing, path.clone()));
        }
    }

    for path in current.files.keys() {
        if !saved.files.contains_key(path) {
            issues.push(Issue::new(IssueKind::New, path.clone()));
        }
    }

    for (path, record) in &current.files {
        if let Some(old) = saved.files.get(path) {
            if old.hash != record.hash {
                issues.push(Issue::new(IssueKind::Modified, path.clone()));
            }
        }
    }

    issues
}
