//! Directory traversal and glob expansion over the repository tree.

use crate::config::VITALS_DIR_NAME;
use crate::utils::errors::{GuardianError, Result};
use globset::Glob;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Options for directory walking.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Follow symbolic links.
    pub follow_links: bool,

    /// Directory/file names skipped during traversal.
    pub exclude_names: Vec<String>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            follow_links: false,
            exclude_names: vec![
                ".git".to_string(),
                "node_modules".to_string(),
                ".DS_Store".to_string(),
                "target".to_string(),
                // Never fingerprint or glob into the guardian's own state
                VITALS_DIR_NAME.to_string(),
            ],
        }
    }
}

/// A regular file discovered during walking.
#[derive(Debug, Clone)]
pub struct ScannedFile {
    /// Full path to the file.
    pub path: PathBuf,

    /// Path relative to the walk base.
    pub relative_path: PathBuf,

    /// File size in bytes.
    pub size: u64,

    /// Last modified time, seconds since the Unix epoch.
    pub mtime: i64,
}

impl ScannedFile {
    /// Build from a walkdir entry. Symlinked directories and broken symlinks
    /// are skipped (returns `None`), matching the backup semantics: a symlink
    /// to a file is recorded with the target's size.
    fn from_entry(entry: &DirEntry, base: &Path) -> std::io::Result<Option<Self>> {
        let raw_metadata = entry.metadata()?;
        let path = entry.path().to_path_buf();
        let relative_path = path.strip_prefix(base).unwrap_or(&path).to_path_buf();

        let metadata = if raw_metadata.is_symlink() {
            match std::fs::metadata(&path) {
                Ok(resolved) if resolved.is_dir() => return Ok(None),
                Ok(resolved) => resolved,
                // Broken symlink
                Err(_) => return Ok(None),
            }
        } else {
            raw_metadata
        };

        let mtime = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(std::time::SystemTime::UNIX_EPOCH).ok())
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);

        Ok(Some(Self {
            path,
            relative_path,
            size: metadata.len(),
            mtime,
        }))
    }
}

fn is_excluded(entry: &DirEntry, exclude_names: &[String]) -> bool {
    let file_name = entry.file_name().to_string_lossy();
    exclude_names.iter().any(|name| file_name.as_ref() == name)
}

/// Walk a directory tree and collect every regular file under it.
///
/// Relative paths in the result are computed against `base`, which may be an
/// ancestor of `root` (e.g. the repository root when walking one vital dir).
pub fn walk_files(root: &Path, base: &Path, options: &ScanOptions) -> std::io::Result<Vec<ScannedFile>> {
    let mut files = Vec::new();

    let walker = WalkDir::new(root)
        .follow_links(options.follow_links)
        .into_iter()
        .filter_entry(|e| !is_excluded(e, &options.exclude_names));

    for entry in walker {
        let entry = entry.map_err(std::io::Error::other)?;

        if entry.file_type().is_dir() {
            continue;
        }

        if let Some(file) = ScannedFile::from_entry(&entry, base)? {
            files.push(file);
        }
    }

    Ok(files)
}

/// Count entries (files and directories) under a directory, the root excluded.
pub fn count_entries(root: &Path, options: &ScanOptions) -> usize {
    WalkDir::new(root)
        .follow_links(options.follow_links)
        .min_depth(1)
        .into_iter()
        .filter_entry(|e| !is_excluded(e, &options.exclude_names))
        .filter_map(|e| e.ok())
        .count()
}

/// Expand a glob pattern against the repository root.
///
/// Matches relative paths (files and directories) under `repo_root`; a
/// trailing `/` on the pattern is trimmed so directory patterns like
/// `workspaces/**/` still match.
pub fn expand_glob(repo_root: &Path, pattern: &str, options: &ScanOptions) -> Result<Vec<PathBuf>> {
    let trimmed = pattern.trim_end_matches('/');
    let glob = Glob::new(trimmed)
        .map_err(|source| GuardianError::Pattern {
            pattern: pattern.to_string(),
            source,
        })?
        .compile_matcher();

    let mut matches = Vec::new();
    let walker = WalkDir::new(repo_root)
        .follow_links(options.follow_links)
        .min_depth(1)
        .into_iter()
        .filter_entry(|e| !is_excluded(e, &options.exclude_names));

    for entry in walker.filter_map(|e| e.ok()) {
        let relative = match entry.path().strip_prefix(repo_root) {
            Ok(rel) => rel,
            Err(_) => continue,
        };
        if glob.is_match(relative) {
            matches.push(entry.path().to_path_buf());
        }
    }

    Ok(matches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_walk_empty_directory() -> std::io::Result<()> {
        let temp = TempDir::new()?;
        let files = walk_files(temp.path(), temp.path(), &ScanOptions::default())?;
        assert_eq!(files.len(), 0);
        Ok(())
    }

    #[test]
    fn test_walk_with_subdirectories() -> std::io::Result<()> {
        let temp = TempDir::new()?;
        fs::create_dir(temp.path().join("subdir"))?;
        fs::write(temp.path().join("file1.txt"), b"content1")?;
        fs::write(temp.path().join("subdir/file2.txt"), b"content2")?;

        let mut files = walk_files(temp.path(), temp.path(), &ScanOptions::default())?;
        files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));

        assert_eq!(files.len(), 2);
        assert_eq!(files[0].relative_path, PathBuf::from("file1.txt"));
        assert_eq!(files[0].size, 8);
        assert_eq!(files[1].relative_path, PathBuf::from("subdir/file2.txt"));
        Ok(())
    }

    #[test]
    fn test_relative_paths_against_outer_base() -> std::io::Result<()> {
        let temp = TempDir::new()?;
        fs::create_dir(temp.path().join("vital"))?;
        fs::write(temp.path().join("vital/a.txt"), b"a")?;

        let files = walk_files(&temp.path().join("vital"), temp.path(), &ScanOptions::default())?;
        assert_eq!(files[0].relative_path, PathBuf::from("vital/a.txt"));
        Ok(())
    }

    #[test]
    fn test_exclude_names_prune_subtrees() -> std::io::Result<()> {
        let temp = TempDir::new()?;
        fs::create_dir(temp.path().join(".git"))?;
        fs::write(temp.path().join(".git/HEAD"), b"ref")?;
        fs::write(temp.path().join("keep.txt"), b"keep")?;

        let files = walk_files(temp.path(), temp.path(), &ScanOptions::default())?;
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].relative_path, PathBuf::from("keep.txt"));
        Ok(())
    }

    #[test]
    fn test_count_entries() -> std::io::Result<()> {
        let temp = TempDir::new()?;
        fs::create_dir(temp.path().join("sub"))?;
        fs::write(temp.path().join("sub/a.txt"), b"a")?;
        fs::write(temp.path().join("b.txt"), b"b")?;

        // sub/, sub/a.txt, b.txt
        assert_eq!(count_entries(temp.path(), &ScanOptions::default()), 3);
        Ok(())
    }

    #[test]
    fn test_expand_glob() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("notes")).unwrap();
        fs::write(temp.path().join("notes/one.md"), b"1").unwrap();
        fs::write(temp.path().join("notes/two.md"), b"2").unwrap();
        fs::write(temp.path().join("notes/skip.txt"), b"3").unwrap();

        let matches = expand_glob(temp.path(), "notes/*.md", &ScanOptions::default()).unwrap();
        assert_eq!(matches.len(), 2);
    }

    #[test]
    fn test_expand_glob_trailing_slash_matches_dirs() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("OBSOLETE_old")).unwrap();

        let matches = expand_glob(temp.path(), "OBSOLETE*/", &ScanOptions::default()).unwrap();
        assert_eq!(matches, vec![temp.path().join("OBSOLETE_old")]);
    }

    #[test]
    fn test_expand_glob_invalid_pattern() {
        let temp = TempDir::new().unwrap();
        let err = expand_glob(temp.path(), "a[", &ScanOptions::default()).unwrap_err();
        assert!(matches!(err, GuardianError::Pattern { .. }));
    }
}
