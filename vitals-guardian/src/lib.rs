//! Vitals Guardian Library
//!
//! Protects a configured set of "vital" paths from silent loss: fingerprints
//! them into a manifest, detects drift across runs, and keeps timestamped
//! snapshots that can be restored.

pub mod config;
pub mod confirm;
pub mod fs;
pub mod guardian;
pub mod manifest;
pub mod registry;
pub mod snapshot;
pub mod utils;

// Re-export commonly used types
pub use config::{GuardianConfig, VitalsContext};
pub use confirm::{Confirmation, StdinConfirmer, Strictness};
pub use guardian::{VitalsGuardian, VitalsProtector};
pub use manifest::{CheckReport, Issue, IssueKind, Manifest, Severity};
pub use snapshot::{RestoreReport, SnapshotInfo};
pub use utils::errors::GuardianError;
pub type Result<T> = std::result::Result<T, GuardianError>;
