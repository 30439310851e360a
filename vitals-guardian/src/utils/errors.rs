//! Custom error types for the vitals guardian.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GuardianError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid glob pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("Snapshot not found: {0}")]
    SnapshotNotFound(String),

    #[error("Path is outside the repository root: {0}")]
    OutsideRepoRoot(String),
}

pub type Result<T> = std::result::Result<T, GuardianError>;
