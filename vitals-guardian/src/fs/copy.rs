//! Recursive copy helpers used by the snapshot store.
//!
//! Copies are best-effort: a failing entry is recorded and the rest of the
//! batch still runs. `std::fs::copy` carries permissions over where the
//! platform allows.

use std::path::Path;
use walkdir::WalkDir;

/// Outcome of a recursive directory copy.
#[derive(Debug, Default)]
pub struct CopyOutcome {
    pub files_copied: usize,
    pub errors: Vec<String>,
}

/// Copy a single file, creating any missing parent directories.
pub fn copy_file_with_parents(src: &Path, dest: &Path) -> std::io::Result<()> {
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::copy(src, dest)?;
    Ok(())
}

/// Copy a directory tree under `dest`, accumulating per-entry errors instead
/// of aborting on the first failure.
pub fn copy_dir_recursive(src: &Path, dest: &Path) -> CopyOutcome {
    let mut outcome = CopyOutcome::default();

    for entry in WalkDir::new(src) {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                outcome.errors.push(format!("walk {}: {e}", src.display()));
                continue;
            }
        };

        let relative = match entry.path().strip_prefix(src) {
            Ok(rel) => rel,
            Err(_) => continue,
        };
        let target = dest.join(relative);

        if entry.file_type().is_dir() {
            if let Err(e) = std::fs::create_dir_all(&target) {
                outcome.errors.push(format!("mkdir {}: {e}", target.display()));
            }
        } else {
            match copy_file_with_parents(entry.path(), &target) {
                Ok(()) => outcome.files_copied += 1,
                Err(e) => outcome
                    .errors
                    .push(format!("copy {}: {e}", entry.path().display())),
            }
        }
    }

    outcome
}

/// Total size in bytes of all files under a directory.
pub fn dir_size(root: &Path) -> u64 {
    WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.metadata().ok())
        .map(|m| m.len())
        .sum()
}
