// src/watch/path_utils.rs

//! Utility functions for path handling in the watcher.

use std::path::{Path, PathBuf};

/// Convert a path into a string relative to `root`, with forward slashes.
///
/// - First we try a direct `strip_prefix(root)`.
/// - If that fails (e.g. due to symlinks or different absolute prefixes),
///   we canonicalize both paths and try again.
/// - Only if both attempts fail do we give up.
///
/// When `root` is the path itself (a single watched file), the result is
/// the file name so ignore globs still have something to match.
///
/// Returns `None` if the path cannot be reasonably related to `root`.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    if let Some(s) = strip(root, path) {
        return Some(s);
    }

    // Some platforms (notably macOS) report events under a different
    // absolute prefix for the same directory (symlinks, /private/var/...).
    if let (Ok(root_canon), Ok(path_canon)) = (root.canonicalize(), path.canonicalize()) {
        if let Some(s) = strip(&root_canon, &path_canon) {
            return Some(s);
        }
    }

    None
}

fn strip(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    if rel.as_os_str().is_empty() {
        return path.file_name().map(|n| n.to_string_lossy().into_owned());
    }
    Some(rel.to_string_lossy().replace('\\', "/"))
}

/// Pick the most specific root containing `path`.
pub fn owning_root<'a>(roots: &'a [PathBuf], path: &Path) -> Option<&'a PathBuf> {
    roots
        .iter()
        .filter(|root| relative_str(root, path).is_some())
        .max_by_key(|root| root.components().count())
}
