//! Configuration and filesystem context for the guardian.
//!
//! All state lives under `<repo-root>/.vitals/`. The context object is built
//! once at process start and passed by reference into every component; there
//! are no ambient globals.

use crate::utils::errors::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Directory name holding all guardian state under the repository root.
pub const VITALS_DIR_NAME: &str = ".vitals";
const CONFIG_FILE: &str = "vitals.config.json";
const MANIFEST_FILE: &str = "vitals.manifest.json";
const BACKUPS_DIR: &str = "backups";

/// Vital path patterns seeded when no config file exists yet.
pub const DEFAULT_VITALS: &[&str] = &["config/", "data/", "docs/", "workspaces/"];

/// Resolved filesystem layout for one repository.
#[derive(Debug, Clone)]
pub struct VitalsContext {
    pub repo_root: PathBuf,
    pub vitals_dir: PathBuf,
    pub config_path: PathBuf,
    pub manifest_path: PathBuf,
    pub backup_dir: PathBuf,
}

impl VitalsContext {
    pub fn new(repo_root: impl Into<PathBuf>) -> Self {
        let repo_root = repo_root.into();
        let vitals_dir = repo_root.join(VITALS_DIR_NAME);
        Self {
            config_path: vitals_dir.join(CONFIG_FILE),
            manifest_path: vitals_dir.join(MANIFEST_FILE),
            backup_dir: vitals_dir.join(BACKUPS_DIR),
            vitals_dir,
            repo_root,
        }
    }

    /// Create the vitals and backup directories if absent.
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.vitals_dir)?;
        std::fs::create_dir_all(&self.backup_dir)?;
        Ok(())
    }
}

/// Persisted guardian configuration (`vitals.config.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardianConfig {
    /// Vital path patterns: literal relative paths or glob patterns.
    pub vitals: Vec<String>,

    /// Optional remote repository URL for the external sync tooling.
    #[serde(default)]
    pub remote_repo: Option<String>,

    #[serde(default = "default_retention_days")]
    pub backup_retention_days: u32,

    #[serde(default = "default_max_backups")]
    pub max_backups: usize,

    #[serde(default = "default_true")]
    pub auto_backup_on_destructive: bool,

    #[serde(default = "default_true")]
    pub check_integrity_on_startup: bool,

    #[serde(default)]
    pub sync_to_remote: bool,
}

fn default_retention_days() -> u32 {
    30
}

fn default_max_backups() -> usize {
    50
}

fn default_true() -> bool {
    true
}

impl Default for GuardianConfig {
    fn default() -> Self {
        Self {
            vitals: DEFAULT_VITALS.iter().map(|s| s.to_string()).collect(),
            remote_repo: None,
            backup_retention_days: default_retention_days(),
            max_backups: default_max_backups(),
            auto_backup_on_destructive: true,
            check_integrity_on_startup: true,
            sync_to_remote: false,
        }
    }
}

impl GuardianConfig {
    /// Load the config file, seeding defaults when it does not exist.
    ///
    /// A missing file is written back so the config becomes the source of
    /// truth thereafter. A malformed file logs a warning and falls back to
    /// defaults without overwriting it; this never fails the process.
    pub fn load_or_seed(ctx: &VitalsContext) -> Self {
        if ctx.config_path.exists() {
            match std::fs::read_to_string(&ctx.config_path) {
                Ok(raw) => match serde_json::from_str::<GuardianConfig>(&raw) {
                    Ok(config) => return config,
                    Err(e) => {
                        warn!("Malformed config {}: {e}. Using defaults.", ctx.config_path.display());
                        return Self::default();
                    }
                },
                Err(e) => {
                    warn!("Cannot read config {}: {e}. Using defaults.", ctx.config_path.display());
                    return Self::default();
                }
            }
        }

        let config = Self::default();
        if let Err(e) = config.save(&ctx.config_path) {
            warn!("Cannot seed default config {}: {e}", ctx.config_path.display());
        }
        config
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(self)?;
        std::fs::write(path, raw)?;
        Ok(())
    }
}
