// src/watch/patterns.rs

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::debug;

use crate::config::ConfigFile;
use crate::fs::FileSystem;

/// Decides which files the watcher reports.
///
/// A file passes when its extension is one of the source extensions and its
/// path relative to the watch root matches none of the ignore globs, e.g.
/// `"levels/intro.wc"` against `"**/generated/**"`.
#[derive(Clone)]
pub struct WatchFilter {
    extensions: HashSet<String>,
    ignore_set: Option<GlobSet>,
    /// Directories whose whole subtree is ignored: every `P/**` pattern
    /// contributes `P`.
    pruned_dirs: Option<GlobSet>,
}

impl fmt::Debug for WatchFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchFilter")
            .field("extensions", &self.extensions)
            .finish_non_exhaustive()
    }
}

impl WatchFilter {
    pub fn new(extensions: &[String], ignore: &[String]) -> Result<Self> {
        let extensions = extensions
            .iter()
            .map(|e| e.trim().trim_start_matches('.').to_string())
            .filter(|e| !e.is_empty())
            .collect();

        let ignore_set = if ignore.is_empty() {
            None
        } else {
            Some(build_globset(ignore).context("building ignore globset")?)
        };

        let subtree_patterns: Vec<String> = ignore
            .iter()
            .filter_map(|p| p.strip_suffix("/**"))
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect();
        let pruned_dirs = if subtree_patterns.is_empty() {
            None
        } else {
            Some(build_globset(&subtree_patterns).context("building ignored-directory globset")?)
        };

        Ok(Self {
            extensions,
            ignore_set,
            pruned_dirs,
        })
    }

    pub fn from_config(cfg: &ConfigFile) -> Result<Self> {
        Self::new(&cfg.watch.extensions, &cfg.watch.ignore)
    }

    pub fn has_source_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| self.extensions.contains(e))
    }

    /// `rel_path` uses forward slashes and is relative to the watch root.
    pub fn is_ignored(&self, rel_path: &str) -> bool {
        self.ignore_set
            .as_ref()
            .is_some_and(|set| set.is_match(rel_path))
    }

    /// True when nothing below the directory `rel_dir` can pass the filter,
    /// so a scan need not enter it.
    pub fn prunes_dir(&self, rel_dir: &str) -> bool {
        self.pruned_dirs
            .as_ref()
            .is_some_and(|set| set.is_match(rel_dir))
    }

    /// Full check for a file at `path` relative string `rel_path`.
    pub fn accepts(&self, path: &Path, rel_path: &str) -> bool {
        self.has_source_extension(path) && !self.is_ignored(rel_path)
    }
}

/// Build a GlobSet from simple string patterns.
fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat).with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

/// Collect all files under `root` that pass `filter`.
///
/// `root` may also be a single file, in which case it is matched by its
/// file name. Ignored subtrees are not entered and symlinked directories
/// are not followed. Results are sorted so scans are deterministic.
pub fn collect_matching_files(
    fs: &dyn FileSystem,
    root: &Path,
    filter: &WatchFilter,
) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    if fs.is_file(root) {
        let name = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if filter.accepts(root, &name) {
            files.push(root.to_path_buf());
        }
        return Ok(files);
    }

    let mut stack = vec![root.to_path_buf()];

    while let Some(dir) = stack.pop() {
        for path in fs.read_dir(&dir)? {
            let Ok(rel) = path.strip_prefix(root) else {
                continue;
            };
            let rel_str = rel.to_string_lossy().replace('\\', "/");

            if fs.is_dir(&path) {
                if fs.is_symlink(&path) {
                    debug!(dir = ?path, "not following symlinked directory");
                } else if filter.prunes_dir(&rel_str) {
                    debug!(dir = ?path, "skipping ignored directory");
                } else {
                    stack.push(path);
                }
            } else if fs.is_file(&path) && filter.accepts(&path, &rel_str) {
                files.push(path);
            }
        }
    }

    files.sort();
    Ok(files)
}
