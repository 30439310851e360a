//! Snapshot Store: timestamped, reason-tagged copies of the vital paths.
//!
//! Each snapshot is a directory under `<vitals-dir>/backups/` mirroring the
//! repo-relative layout of every vital path, plus a `snapshot.json` metadata
//! record. The store owns the backup tree exclusively.

use crate::config::VitalsContext;
use crate::fs::{copy_dir_recursive, copy_file_with_parents, dir_size};
use crate::utils::errors::{GuardianError, Result};
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

const METADATA_FILE: &str = "snapshot.json";

/// Metadata record written alongside each snapshot's copied tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotMeta {
    pub created_at: DateTime<Utc>,
    pub reason: String,
    pub files_backed: usize,
    pub dirs_backed: usize,
    pub errors: Vec<String>,
}

/// A snapshot as seen by `list_snapshots`.
#[derive(Debug, Clone)]
pub struct SnapshotInfo {
    pub name: String,
    pub path: PathBuf,
    pub created_at: DateTime<Utc>,
    pub reason: String,
    pub files_backed: usize,
    pub size_bytes: u64,
}

/// Outcome of a restore operation.
#[derive(Debug, Clone)]
pub struct RestoreReport {
    pub restored: usize,
    pub errors: Vec<String>,
}

impl RestoreReport {
    pub fn success(&self) -> bool {
        self.errors.is_empty()
    }
}

pub struct SnapshotStore {
    ctx: VitalsContext,
    max_backups: usize,
}

impl SnapshotStore {
    pub fn new(ctx: VitalsContext, max_backups: usize) -> Self {
        Self { ctx, max_backups }
    }

    /// Copy every vital path into a fresh snapshot directory.
    ///
    /// Per-path copy failures are collected into the snapshot metadata; one
    /// failing vital never blocks backing up the rest. Retention pruning runs
    /// after the snapshot is written.
    pub fn create_snapshot(&self, vitals: &[PathBuf], reason: &str) -> Result<SnapshotInfo> {
        let created_at = Utc::now();
        let snapshot_dir = self.unique_snapshot_dir(reason)?;
        let name = snapshot_dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        info!("Creating snapshot: {name}");

        let mut files_backed = 0usize;
        let mut dirs_backed = 0usize;
        let mut errors = Vec::new();

        for vital in vitals {
            let rel = match vital.strip_prefix(&self.ctx.repo_root) {
                Ok(rel) => rel,
                Err(_) => {
                    errors.push(format!("outside repo root: {}", vital.display()));
                    continue;
                }
            };
            let dest = snapshot_dir.join(rel);

            if vital.is_dir() {
                let outcome = copy_dir_recursive(vital, &dest);
                files_backed += outcome.files_copied;
                errors.extend(outcome.errors);
                dirs_backed += 1;
            } else if vital.is_file() {
                match copy_file_with_parents(vital, &dest) {
                    Ok(()) => files_backed += 1,
                    Err(e) => errors.push(format!("copy {}: {e}", vital.display())),
                }
            }
        }

        let meta = SnapshotMeta {
            created_at,
            reason: reason.to_string(),
            files_backed,
            dirs_backed,
            errors,
        };
        let raw = serde_json::to_string_pretty(&meta)?;
        std::fs::write(snapshot_dir.join(METADATA_FILE), raw)?;

        if meta.errors.is_empty() {
            info!("Snapshot created: {files_backed} files, {dirs_backed} dirs");
        } else {
            warn!(
                "Snapshot created with {} error(s): {files_backed} files backed",
                meta.errors.len()
            );
        }

        self.prune(self.max_backups);

        Ok(SnapshotInfo {
            name,
            size_bytes: dir_size(&snapshot_dir),
            path: snapshot_dir,
            created_at,
            reason: meta.reason,
            files_backed,
        })
    }

    /// Pick a non-existing snapshot directory name: `<timestamp>_<reason>`,
    /// with a numeric suffix if two snapshots land within the same instant.
    fn unique_snapshot_dir(&self, reason: &str) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.ctx.backup_dir)?;

        let stamp = Local::now().format("%Y-%m-%d_%H-%M-%S%.3f").to_string();
        let reason_tag: String = reason
            .chars()
            .map(|c| if c.is_whitespace() { '_' } else { c })
            .collect();
        let base = format!("{stamp}_{reason_tag}");

        let mut candidate = self.ctx.backup_dir.join(&base);
        let mut counter = 2;
        while candidate.exists() {
            candidate = self.ctx.backup_dir.join(format!("{base}-{counter}"));
            counter += 1;
        }
        std::fs::create_dir_all(&candidate)?;
        Ok(candidate)
    }

    /// Enumerate all snapshots, newest first.
    ///
    /// Metadata is read from `snapshot.json`; a missing or corrupt record
    /// falls back to the directory mtime and defaults. A missing backup root
    /// yields an empty list.
    pub fn list_snapshots(&self) -> Vec<SnapshotInfo> {
        let Ok(entries) = std::fs::read_dir(&self.ctx.backup_dir) else {
            return Vec::new();
        };

        let mut snapshots = Vec::new();
        for entry in entries.filter_map(|e| e.ok()) {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }

            let meta = read_metadata(&path);
            let created_at = meta
                .as_ref()
                .map(|m| m.created_at)
                .unwrap_or_else(|| mtime_of(&path));

            snapshots.push(SnapshotInfo {
                name: entry.file_name().to_string_lossy().to_string(),
                size_bytes: dir_size(&path),
                path,
                created_at,
                reason: meta
                    .as_ref()
                    .map(|m| m.reason.clone())
                    .unwrap_or_else(|| "unknown".to_string()),
                files_backed: meta.map(|m| m.files_backed).unwrap_or(0),
            });
        }

        snapshots.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        snapshots
    }

    /// Delete the oldest snapshots beyond `max_count`, by directory mtime.
    /// A failing deletion is logged and does not block deleting the others.
    pub fn prune(&self, max_count: usize) {
        let Ok(entries) = std::fs::read_dir(&self.ctx.backup_dir) else {
            return;
        };

        let mut dirs: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_dir())
            .collect();
        dirs.sort_by_key(|p| std::cmp::Reverse(mtime_of(p)));

        for old in dirs.into_iter().skip(max_count) {
            match std::fs::remove_dir_all(&old) {
                Ok(()) => info!("Pruned old snapshot: {}", old.display()),
                Err(e) => error!("Cannot prune snapshot {}: {e}", old.display()),
            }
        }
    }

    /// Restore vital paths from a named snapshot.
    ///
    /// A safety snapshot of the current state is taken first, so a bad
    /// restore is itself recoverable. With `files = None` every top-level
    /// entry of the snapshot replaces its counterpart at the repo root
    /// (directories removed then copied in); with a specific list, only
    /// those relative paths are copied, creating parents as needed.
    ///
    /// A missing snapshot name is a hard error; everything else accumulates
    /// into the report.
    pub fn restore(
        &self,
        vitals: &[PathBuf],
        name: &str,
        files: Option<&[String]>,
    ) -> Result<RestoreReport> {
        let snapshot_dir = self.ctx.backup_dir.join(name);
        if !snapshot_dir.is_dir() {
            return Err(GuardianError::SnapshotNotFound(name.to_string()));
        }

        info!("Restoring from snapshot: {name}");
        let safety = self.create_snapshot(vitals, "prerestore_safety")?;
        info!("Safety snapshot created: {}", safety.name);

        let mut restored = 0usize;
        let mut errors = Vec::new();

        match files {
            None => {
                let entries = std::fs::read_dir(&snapshot_dir)?;
                for entry in entries.filter_map(|e| e.ok()) {
                    if entry.file_name().to_string_lossy() == METADATA_FILE {
                        continue;
                    }
                    let src = entry.path();
                    let dest = self.ctx.repo_root.join(entry.file_name());
                    match restore_entry(&src, &dest) {
                        Ok(()) => restored += 1,
                        Err(e) => errors.push(format!("restore {}: {e}", src.display())),
                    }
                }
            }
            Some(list) => {
                for rel in list {
                    let src = snapshot_dir.join(rel);
                    if !src.exists() {
                        errors.push(format!("not in snapshot: {rel}"));
                        continue;
                    }
                    let dest = self.ctx.repo_root.join(rel);
                    match copy_file_with_parents(&src, &dest) {
                        Ok(()) => restored += 1,
                        Err(e) => errors.push(format!("restore {rel}: {e}")),
                    }
                }
            }
        }

        if errors.is_empty() {
            info!("Restore completed: {restored} item(s)");
        } else {
            warn!("Restore completed with {} error(s)", errors.len());
        }

        Ok(RestoreReport { restored, errors })
    }
}

/// Replace `dest` with `src`: directories are removed before the copy so the
/// restored tree is exactly the snapshot's, not a merge.
fn restore_entry(src: &Path, dest: &Path) -> std::io::Result<()> {
    if src.is_dir() {
        if dest.exists() {
            std::fs::remove_dir_all(dest)?;
        }
        let outcome = copy_dir_recursive(src, dest);
        if let Some(first) = outcome.errors.into_iter().next() {
            return Err(std::io::Error::other(first));
        }
        Ok(())
    } else {
        copy_file_with_parents(src, dest)
    }
}

fn read_metadata(snapshot_dir: &Path) -> Option<SnapshotMeta> {
    let raw = std::fs::read_to_string(snapshot_dir.join(METADATA_FILE)).ok()?;
    match serde_json::from_str(&raw) {
        Ok(meta) => Some(meta),
        Err(e) => {
            warn!("Corrupt snapshot metadata in {}: {e}", snapshot_dir.display());
            None
        }
    }
}

fn mtime_of(path: &Path) -> DateTime<Utc> {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| DateTime::<Utc>::UNIX_EPOCH)
}
