//! File system helpers: traversal, glob expansion, recursive copy.

pub mod copy;
pub mod walker;

pub use copy::{copy_dir_recursive, copy_file_with_parents, dir_size};
pub use walker::{count_entries, expand_glob, walk_files, ScanOptions, ScannedFile};
