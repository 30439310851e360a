//! Vitals Registry: expands configured patterns into concrete paths, builds
//! fingerprint manifests, and detects drift against the previous run.
//!
//! The registry has exclusive ownership of `vitals.manifest.json`.

use crate::config::VitalsContext;
use crate::fs::{expand_glob, walk_files, ScanOptions, ScannedFile};
use crate::manifest::{
    diff_manifests, CheckReport, FileRecord, Manifest, HASH_ERROR_SENTINEL,
};
use crate::utils::errors::Result;
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

pub struct VitalsRegistry {
    ctx: VitalsContext,
    vitals: Vec<PathBuf>,
    scan: ScanOptions,
}

impl VitalsRegistry {
    /// Expand the configured patterns and build a registry over the result.
    pub fn new(ctx: VitalsContext, patterns: &[String]) -> Self {
        let scan = ScanOptions::default();
        let vitals = expand_vitals(&ctx.repo_root, patterns, &scan);
        Self { ctx, vitals, scan }
    }

    /// Concrete, existing vital paths for this run.
    pub fn vital_paths(&self) -> &[PathBuf] {
        &self.vitals
    }

    /// Re-expand patterns after the filesystem changed (e.g. post-restore).
    pub fn refresh(&mut self, patterns: &[String]) {
        self.vitals = expand_vitals(&self.ctx.repo_root, patterns, &self.scan);
    }

    /// Walk every vital path and fingerprint its files.
    ///
    /// Unreadable files are recorded with the `ERROR` sentinel hash and the
    /// walk finishes regardless; a single bad file never aborts the batch.
    pub fn build_manifest(&self) -> Manifest {
        let mut manifest = Manifest::empty();

        for vital in &self.vitals {
            if vital.is_dir() {
                manifest.total_dirs += 1;
                let files = match walk_files(vital, &self.ctx.repo_root, &self.scan) {
                    Ok(files) => files,
                    Err(e) => {
                        error!("Cannot walk vital dir {}: {e}", vital.display());
                        continue;
                    }
                };
                for file in files {
                    self.record_file(&mut manifest, &file);
                }
            } else if vital.is_file() {
                match scanned_file(vital, &self.ctx.repo_root) {
                    Ok(file) => self.record_file(&mut manifest, &file),
                    Err(e) => error!("Cannot stat vital file {}: {e}", vital.display()),
                }
            }
        }

        info!(
            "Manifest built: {} files across {} vital dirs",
            manifest.total_files, manifest.total_dirs
        );
        manifest
    }

    fn record_file(&self, manifest: &mut Manifest, file: &ScannedFile) {
        let rel = file.relative_path.to_string_lossy().replace('\\', "/");
        let hash = match hash_file(&file.path) {
            Ok(hash) => hash,
            Err(e) => {
                error!("Cannot hash {}: {e}", file.path.display());
                HASH_ERROR_SENTINEL.to_string()
            }
        };
        manifest.files.insert(
            rel.clone(),
            FileRecord {
                path: rel,
                hash,
                size: file.size,
                mtime: file.mtime,
                is_dir: false,
            },
        );
        manifest.total_files = manifest.files.len();
    }

    /// Persist a manifest as the current one, replacing any prior copy.
    pub fn save_manifest(&self, manifest: &Manifest) -> Result<()> {
        if let Some(parent) = self.ctx.manifest_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(manifest)?;
        std::fs::write(&self.ctx.manifest_path, raw)?;
        Ok(())
    }

    /// Load the previously saved manifest, `None` when this is the first run
    /// or the on-disk copy is unreadable (first-run semantics re-apply).
    pub fn load_manifest(&self) -> Option<Manifest> {
        if !self.ctx.manifest_path.exists() {
            return None;
        }
        match std::fs::read_to_string(&self.ctx.manifest_path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(manifest) => Some(manifest),
                Err(e) => {
                    warn!("Corrupt manifest {}: {e}", self.ctx.manifest_path.display());
                    None
                }
            },
            Err(e) => {
                warn!("Cannot read manifest {}: {e}", self.ctx.manifest_path.display());
                None
            }
        }
    }

    /// Build the current manifest, diff it against the saved one, and persist
    /// the current state as the new baseline.
    ///
    /// The new manifest is persisted even when issues were found, so the next
    /// check diffs against the latest real state. On the first run there is
    /// nothing to compare against: the manifest is saved and the check passes.
    pub fn check_integrity(&self) -> Result<CheckReport> {
        let current = self.build_manifest();

        let Some(saved) = self.load_manifest() else {
            info!("No previous manifest; saving current state as baseline");
            self.save_manifest(&current)?;
            return Ok(CheckReport {
                all_ok: true,
                issues: Vec::new(),
            });
        };

        let issues = diff_manifests(&saved, &current);
        self.save_manifest(&current)?;

        let report = CheckReport {
            all_ok: issues.iter().all(|i| i.severity != crate::manifest::Severity::Critical),
            issues,
        };

        if report.all_ok {
            info!("Integrity verified: no vital files missing");
        } else {
            warn!("{} vital file(s) missing", report.critical_count());
        }

        Ok(report)
    }
}

/// Expand vital patterns to concrete, existing paths.
///
/// Patterns containing a wildcard are globbed against the repository root;
/// anything else is a literal relative path. The result is de-duplicated and
/// sorted.
pub fn expand_vitals(repo_root: &Path, patterns: &[String], scan: &ScanOptions) -> Vec<PathBuf> {
    let mut expanded = BTreeSet::new();

    for pattern in patterns {
        if pattern.contains('*') || pattern.contains('?') || pattern.contains('[') {
            match expand_glob(repo_root, pattern, scan) {
                Ok(matches) => expanded.extend(matches),
                Err(e) => warn!("Skipping vital pattern: {e}"),
            }
        } else {
            let path = repo_root.join(pattern.trim_end_matches('/'));
            if path.exists() {
                expanded.insert(path);
            }
        }
    }

    expanded.into_iter().collect()
}

fn scanned_file(path: &Path, base: &Path) -> std::io::Result<ScannedFile> {
    let metadata = std::fs::metadata(path)?;
    let mtime = metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(std::time::SystemTime::UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0);
    Ok(ScannedFile {
        path: path.to_path_buf(),
        relative_path: path.strip_prefix(base).unwrap_or(path).to_path_buf(),
        size: metadata.len(),
        mtime,
    })
}

/// Streaming SHA-256 of a file's contents, as lowercase hex.
pub fn hash_file(path: &Path) -> std::io::Result<String> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{IssueKind, Severity};
    use std::fs;
    use tempfile::TempDir;

    fn registry(temp: &TempDir, patterns: &[&str]) -> VitalsRegistry {
        let ctx = VitalsContext::new(temp.path());
        ctx.ensure_dirs().unwrap();
        let patterns: Vec<String> = patterns.iter().map(|s| s.to_string()).collect();
        VitalsRegistry::new(ctx, &patterns)
    }

    #[test]
    fn test_hash_file_matches_known_digest() -> std::io::Result<()> {
        let temp = TempDir::new()?;
        let path = temp.path().join("hello.txt");
        fs::write(&path, b"hello")?;

        // sha256("hello")
        assert_eq!(
            hash_file(&path)?,
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
        Ok(())
    }

    #[test]
    fn test_expand_vitals_literal_and_glob() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("config")).unwrap();
        fs::write(temp.path().join("a.md"), b"a").unwrap();
        fs::write(temp.path().join("b.md"), b"b").unwrap();

        let patterns = vec!["config/".to_string(), "*.md".to_string(), "missing/".to_string()];
        let vitals = expand_vitals(temp.path(), &patterns, &ScanOptions::default());

        assert_eq!(
            vitals,
            vec![
                temp.path().join("a.md"),
                temp.path().join("b.md"),
                temp.path().join("config"),
            ]
        );
    }

    #[test]
    fn test_expand_vitals_deduplicates() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("one.md"), b"1").unwrap();

        let patterns = vec!["one.md".to_string(), "*.md".to_string()];
        let vitals = expand_vitals(temp.path(), &patterns, &ScanOptions::default());
        assert_eq!(vitals.len(), 1);
    }

    #[test]
    fn test_first_check_saves_baseline_with_no_issues() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("vital")).unwrap();
        fs::write(temp.path().join("vital/a.txt"), b"a").unwrap();

        let reg = registry(&temp, &["vital/"]);
        let report = reg.check_integrity().unwrap();

        assert!(report.all_ok);
        assert!(report.issues.is_empty());
        assert!(reg.load_manifest().is_some());
    }

    #[test]
    fn test_deleted_file_reports_single_critical_issue() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("vital")).unwrap();
        fs::write(temp.path().join("vital/keep.txt"), b"keep").unwrap();
        fs::write(temp.path().join("vital/gone.txt"), b"gone").unwrap();

        let reg = registry(&temp, &["vital/"]);
        assert!(reg.check_integrity().unwrap().all_ok);

        fs::remove_file(temp.path().join("vital/gone.txt")).unwrap();
        let report = reg.check_integrity().unwrap();

        assert!(!report.all_ok);
        let critical: Vec<_> = report
            .issues
            .iter()
            .filter(|i| i.severity == Severity::Critical)
            .collect();
        assert_eq!(critical.len(), 1);
        assert_eq!(critical[0].path, "vital/gone.txt");
        assert_eq!(critical[0].kind, IssueKind::Missing);
    }

    #[test]
    fn test_modified_file_reports_warning_with_new_hash() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("vital")).unwrap();
        let target = temp.path().join("vital/doc.txt");
        fs::write(&target, b"before").unwrap();

        let reg = registry(&temp, &["vital/"]);
        reg.check_integrity().unwrap();
        let old_hash = reg.load_manifest().unwrap().files["vital/doc.txt"].hash.clone();

        fs::write(&target, b"after").unwrap();
        let report = reg.check_integrity().unwrap();

        assert!(report.all_ok);
        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.issues[0].kind, IssueKind::Modified);
        assert_eq!(report.issues[0].severity, Severity::Warning);

        let new_hash = &reg.load_manifest().unwrap().files["vital/doc.txt"].hash;
        assert_ne!(&old_hash, new_hash);
    }

    #[test]
    #[cfg(unix)]
    fn test_unreadable_file_records_sentinel_hash() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("vital")).unwrap();
        fs::write(temp.path().join("vital/ok.txt"), b"fine").unwrap();
        let locked = temp.path().join("vital/locked.txt");
        fs::write(&locked, b"no entry").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // Root ignores permission bits
        if fs::read(&locked).is_ok() {
            return;
        }

        let reg = registry(&temp, &["vital/"]);
        let manifest = reg.build_manifest();

        assert_eq!(manifest.total_files, 2);
        assert_eq!(manifest.files["vital/locked.txt"].hash, HASH_ERROR_SENTINEL);
        assert_ne!(manifest.files["vital/ok.txt"].hash, HASH_ERROR_SENTINEL);

        fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();
    }

    #[test]
    fn test_check_always_persists_latest_state() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("vital")).unwrap();
        fs::write(temp.path().join("vital/gone.txt"), b"gone").unwrap();

        let reg = registry(&temp, &["vital/"]);
        reg.check_integrity().unwrap();

        fs::remove_file(temp.path().join("vital/gone.txt")).unwrap();
        assert!(!reg.check_integrity().unwrap().all_ok);

        // The missing file was removed from the baseline, so the next check
        // passes again.
        assert!(reg.check_integrity().unwrap().all_ok);
    }
}
