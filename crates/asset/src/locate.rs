//! Texture file lookup under a model asset root.

use std::path::{Path, PathBuf};

/// Append `default_extension` when `filename` has none.
pub fn with_default_extension(filename: &str, default_extension: &str) -> PathBuf {
    let path = PathBuf::from(filename);
    if path.extension().is_some() {
        return path;
    }
    let ext = default_extension.trim_start_matches('.');
    if ext.is_empty() {
        path
    } else {
        path.with_extension(ext)
    }
}

/// Find `filename` in the immediate subdirectories of `root`.
///
/// Subdirectories are visited in lexicographic order and the first match
/// wins. An unreadable root yields `None`.
pub fn find_texture_file(root: &Path, filename: &str, default_extension: &str) -> Option<PathBuf> {
    if filename.is_empty() {
        return None;
    }
    let relative = with_default_extension(filename, default_extension);

    let entries = match std::fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) => {
            log::warn!("Cannot read texture root {}: {e}", root.display());
            return None;
        }
    };

    let mut dirs: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .map(|entry| entry.path())
        .collect();
    dirs.sort();

    dirs.into_iter()
        .map(|dir| dir.join(&relative))
        .find(|candidate| candidate.is_file())
}
