//! Command classification and blast-radius estimation.
//!
//! A command string is matched against a fixed table of destructive-intent
//! patterns, its path arguments are resolved against the repository root,
//! and the result is condensed into a coarse risk level.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use vitals_guardian::fs::{count_entries, expand_glob, ScanOptions};

/// One destructive-intent pattern. `ultra` marks the handful of shapes
/// (`rm -rf .` and friends) that escalate risk on their own.
struct DestructivePattern {
    category: &'static str,
    regex: Regex,
    ultra: bool,
    recursive: bool,
}

impl DestructivePattern {
    fn new(category: &'static str, pattern: &str, ultra: bool, recursive: bool) -> Self {
        Self {
            category,
            // Case-insensitive per the classification contract
            regex: Regex::new(&format!("(?i){pattern}")).expect("static pattern"),
            ultra,
            recursive,
        }
    }
}

static PATTERNS: Lazy<Vec<DestructivePattern>> = Lazy::new(|| {
    vec![
        // Unix/Linux/Mac
        DestructivePattern::new("rm", r"^rm\s+-[rf]*[rf]", false, false),
        DestructivePattern::new("rm", r"^rm\s+.*\*", false, false),
        DestructivePattern::new("rm", r"^rm\s+-rf\s+\./?(\s|$)", true, true),
        DestructivePattern::new("rmdir", r"^rmdir\s+-p", false, false),
        DestructivePattern::new("rmdir", r"^rmdir\s+.*\*", false, false),
        // Windows shells
        DestructivePattern::new("del", r"^del\s+/[fq]", false, false),
        DestructivePattern::new("del", r"^del\s+.*\*", false, false),
        DestructivePattern::new("rmdir_win", r"^rmdir\s+/[sq]", false, true),
        DestructivePattern::new("erase", r"^erase\s+/[fq]", false, false),
        // PowerShell deletion cmdlets
        DestructivePattern::new("powershell", r"Remove-Item.*-Recurse", false, true),
        DestructivePattern::new("powershell", r"Remove-Item.*-Force", false, false),
        DestructivePattern::new("powershell", r"\bri\s+.*-r", false, true),
        DestructivePattern::new("powershell", r"\bdel\s+.*-r", false, true),
        // File-removal calls embedded in an invoked script
        DestructivePattern::new("script_call", r"shutil\.rmtree", false, true),
        DestructivePattern::new("script_call", r"os\.rmdir\s*\(", false, false),
        DestructivePattern::new("script_call", r"os\.remove\s*\(", false, false),
        DestructivePattern::new("script_call", r"os\.unlink\s*\(", false, false),
        DestructivePattern::new("script_call", r"fs::remove_(file|dir_all)", false, false),
        // Destructive output redirection
        DestructivePattern::new("redirect", r">\s*/dev/null", false, false),
        DestructivePattern::new("redirect", r">\s*[a-zA-Z]:", false, false),
    ]
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "low"),
            RiskLevel::Medium => write!(f, "medium"),
            RiskLevel::High => write!(f, "high"),
            RiskLevel::Critical => write!(f, "critical"),
        }
    }
}

/// Risk weights and thresholds. The exact magnitudes are tuning constants;
/// what matters is the ordering: a vital match outweighs everything else.
#[derive(Debug, Clone)]
pub struct RiskWeights {
    pub vital_weight: u32,
    pub ultra_pattern_weight: u32,
    pub large_wildcard_weight: u32,
    pub many_files_weight: u32,
    pub multi_dir_weight: u32,
    pub recursive_weight: u32,

    /// Estimated-file count above which a wildcard scope counts as large.
    pub large_wildcard_threshold: usize,
    /// Estimated-file count above which confirmation is always required.
    pub many_files_threshold: usize,

    pub critical_score: u32,
    pub high_score: u32,
    pub medium_score: u32,
}

impl Default for RiskWeights {
    fn default() -> Self {
        Self {
            vital_weight: 10,
            ultra_pattern_weight: 10,
            large_wildcard_weight: 5,
            many_files_weight: 3,
            multi_dir_weight: 4,
            recursive_weight: 3,
            large_wildcard_threshold: 50,
            many_files_threshold: 10,
            critical_score: 10,
            high_score: 7,
            medium_score: 3,
        }
    }
}

/// Ephemeral result of classifying one command string. Never persisted.
#[derive(Debug, Clone)]
pub struct CommandAnalysis {
    pub command: String,
    pub is_destructive: bool,
    pub risk_level: RiskLevel,
    pub patterns_matched: Vec<String>,
    pub affected_vitals: Vec<String>,
    pub affected_files: Vec<PathBuf>,
    pub affected_dirs: Vec<PathBuf>,
    pub estimated_files: usize,
    pub requires_confirmation: bool,
    pub reasons: Vec<String>,
    pub ultra_matched: bool,
    pub recursive_matched: bool,
}

impl CommandAnalysis {
    fn new(command: &str) -> Self {
        Self {
            command: command.to_string(),
            is_destructive: false,
            risk_level: RiskLevel::Low,
            patterns_matched: Vec::new(),
            affected_vitals: Vec::new(),
            affected_files: Vec::new(),
            affected_dirs: Vec::new(),
            estimated_files: 0,
            requires_confirmation: false,
            reasons: Vec::new(),
            ultra_matched: false,
            recursive_matched: false,
        }
    }
}

pub struct CommandAnalyzer {
    repo_root: PathBuf,
    vitals: Vec<PathBuf>,
    weights: RiskWeights,
    strict: bool,
    scan: ScanOptions,
}

impl CommandAnalyzer {
    pub fn new(repo_root: impl Into<PathBuf>, vitals: Vec<PathBuf>, strict: bool) -> Self {
        Self {
            repo_root: repo_root.into(),
            vitals,
            weights: RiskWeights::default(),
            strict,
            scan: ScanOptions::default(),
        }
    }

    pub fn with_weights(mut self, weights: RiskWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn weights(&self) -> &RiskWeights {
        &self.weights
    }

    /// Full pipeline: classify, extract affected paths, match vitals, score.
    pub fn analyze(&self, command: &str) -> CommandAnalysis {
        let mut analysis = self.classify(command);
        if !analysis.is_destructive {
            return analysis;
        }

        self.extract_affected_paths(&mut analysis);

        for vital in &self.vitals {
            let hit = analysis
                .affected_files
                .iter()
                .chain(analysis.affected_dirs.iter())
                .any(|path| paths_overlap(path, vital));
            if hit {
                let shown = vital
                    .strip_prefix(&self.repo_root)
                    .unwrap_or(vital)
                    .to_string_lossy()
                    .to_string();
                analysis.affected_vitals.push(shown);
            }
        }

        analysis.risk_level = self.calculate_risk(&analysis);
        analysis.requires_confirmation = self.requires_confirmation(&analysis);
        analysis
    }

    /// Match the raw command against the destructive-pattern table.
    /// Matching is additive: every category that matches is recorded.
    fn classify(&self, command: &str) -> CommandAnalysis {
        let mut analysis = CommandAnalysis::new(command);

        for pattern in PATTERNS.iter() {
            if pattern.regex.is_match(command) {
                analysis.is_destructive = true;
                analysis
                    .patterns_matched
                    .push(format!("{}:{}", pattern.category, pattern.regex.as_str()));
                analysis
                    .reasons
                    .push(format!("Destructive pattern detected: {}", pattern.category));
                analysis.ultra_matched |= pattern.ultra;
                analysis.recursive_matched |= pattern.recursive;
            }
        }

        analysis
    }

    /// Tokenize the command and resolve every non-flag token as a path
    /// candidate: wildcards are globbed against the repo root, literals are
    /// resolved and classified. Directories contribute their recursive
    /// descendant count to the estimate.
    fn extract_affected_paths(&self, analysis: &mut CommandAnalysis) {
        for (i, token) in analysis.command.split_whitespace().enumerate() {
            // Program name and flag-like tokens are not path candidates
            if i == 0 || token.starts_with('-') || token.starts_with('/') {
                continue;
            }

            if token.contains('*') || token.contains('?') {
                let matches = expand_glob(&self.repo_root, token, &self.scan).unwrap_or_default();
                analysis.estimated_files += matches.len();
                for hit in matches {
                    if hit.is_dir() {
                        analysis.affected_dirs.push(hit);
                    } else {
                        analysis.affected_files.push(hit);
                    }
                }
            } else {
                let path = Path::new(token);
                let full = if path.is_absolute() {
                    path.to_path_buf()
                } else {
                    self.repo_root.join(path)
                };
                if full.is_dir() {
                    analysis.estimated_files += 1 + count_entries(&full, &self.scan);
                    analysis.affected_dirs.push(full);
                } else if full.is_file() {
                    analysis.estimated_files += 1;
                    analysis.affected_files.push(full);
                }
            }
        }
    }

    /// Weighted risk score. Any vital match alone reaches at least the high
    /// band; the exact weights live in [`RiskWeights`].
    fn calculate_risk(&self, analysis: &CommandAnalysis) -> RiskLevel {
        let w = &self.weights;
        let mut score = 0u32;

        score += analysis.affected_vitals.len() as u32 * w.vital_weight;

        if analysis.estimated_files > w.large_wildcard_threshold {
            score += w.large_wildcard_weight;
        } else if analysis.estimated_files > w.many_files_threshold {
            score += w.many_files_weight;
        }

        if analysis.affected_dirs.len() > 1 {
            score += w.multi_dir_weight;
        }

        if analysis.ultra_matched {
            score += w.ultra_pattern_weight;
        }
        if analysis.recursive_matched {
            score += w.recursive_weight;
        }

        if score >= w.critical_score {
            RiskLevel::Critical
        } else if score >= w.high_score {
            RiskLevel::High
        } else if score >= w.medium_score {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    fn requires_confirmation(&self, analysis: &CommandAnalysis) -> bool {
        if !analysis.affected_vitals.is_empty() {
            return true;
        }
        if self.strict && analysis.is_destructive {
            return true;
        }
        if analysis.risk_level >= RiskLevel::High {
            return true;
        }
        analysis.estimated_files > self.weights.many_files_threshold
    }
}

/// Two paths overlap when they are equal after lexical normalization or one
/// contains the other. No filesystem access: the paths may already be gone.
pub fn paths_overlap(a: &Path, b: &Path) -> bool {
    let a = normalize(a);
    let b = normalize(b);
    a == b || a.starts_with(&b) || b.starts_with(&a)
}

/// Resolve `.` and `..` components without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}
