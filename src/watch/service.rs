// src/watch/service.rs

//! Watch service: turns raw backend notifications into per-file
//! `Added` / `Changed` / `Removed` events for source files.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::errors::{HotCompileError, Result};
use crate::fs::FileSystem;
use crate::watch::path_utils::{owning_root, relative_str};
use crate::watch::patterns::{collect_matching_files, WatchFilter};
use crate::watch::watcher::{FileWatchSource, RawFsEvent};

/// Classified change to a single source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    Added(PathBuf),
    Changed(PathBuf),
    Removed(PathBuf),
}

impl WatchEvent {
    pub fn path(&self) -> &Path {
        match self {
            WatchEvent::Added(p) | WatchEvent::Changed(p) | WatchEvent::Removed(p) => p,
        }
    }
}

pub struct WatchService {
    fs: Arc<dyn FileSystem>,
    source: Box<dyn FileWatchSource>,
    filter: Option<WatchFilter>,
    roots: Vec<PathBuf>,
    /// Source files reported so far; decides `Added` vs `Changed`.
    known: BTreeSet<PathBuf>,
    active: bool,
}

impl std::fmt::Debug for WatchService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchService")
            .field("roots", &self.roots)
            .field("known", &self.known.len())
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}

impl WatchService {
    pub fn new(fs: Arc<dyn FileSystem>, source: Box<dyn FileWatchSource>) -> Self {
        Self {
            fs,
            source,
            filter: None,
            roots: Vec::new(),
            known: BTreeSet::new(),
            active: false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Begin observing `paths`, returning an `Added` event for every
    /// pre-existing source file.
    ///
    /// Roots are resolved to their canonical form first, so files are keyed
    /// the way the backend reports them. A missing path is a configuration
    /// error; a backend that refuses to watch an existing path is a watch
    /// error. Either way nothing stays watched.
    pub fn start(&mut self, paths: &[PathBuf], filter: WatchFilter) -> Result<Vec<WatchEvent>> {
        self.stop();

        let mut resolved: Vec<PathBuf> = Vec::with_capacity(paths.len());
        for path in paths {
            let root = self.resolve_root(path)?;
            if !resolved.contains(&root) {
                resolved.push(root);
            }
        }

        self.filter = Some(filter);
        let mut initial = Vec::new();
        for root in &resolved {
            match self.attach(root) {
                Ok(mut added) => initial.append(&mut added),
                Err(err) => {
                    self.stop();
                    return Err(err);
                }
            }
        }

        self.active = true;
        info!(
            roots = self.roots.len(),
            files = initial.len(),
            "watch service started"
        );
        Ok(initial)
    }

    /// Stop observing everything and forget known files.
    pub fn stop(&mut self) {
        for root in std::mem::take(&mut self.roots) {
            if let Err(err) = self.source.unwatch(&root) {
                debug!(root = ?root, error = %err, "unwatch failed during stop");
            }
        }
        self.known.clear();
        if self.active {
            info!("watch service stopped");
        }
        self.active = false;
    }

    /// Observe one more path while running.
    pub fn add_path(&mut self, path: &Path) -> Result<Vec<WatchEvent>> {
        if !self.active {
            return Err(HotCompileError::Watch(
                "cannot add a watch path while the watch service is stopped".to_string(),
            ));
        }
        let root = self.resolve_root(path)?;
        if self.roots.contains(&root) {
            return Ok(Vec::new());
        }
        self.attach(&root)
    }

    /// Stop observing one path, given in any spelling that resolves to a
    /// watched root. Returns `Removed` for every known file that is no
    /// longer covered by a remaining root.
    pub fn remove_path(&mut self, path: &Path) -> Vec<WatchEvent> {
        let key = self.path_key(path);
        let Some(idx) = self.roots.iter().position(|r| *r == key) else {
            return Vec::new();
        };
        let root = self.roots.remove(idx);
        if let Err(err) = self.source.unwatch(&root) {
            warn!(root = ?root, error = %err, "failed to release watch handle");
        }

        let orphaned: Vec<PathBuf> = self
            .known
            .iter()
            .filter(|p| owning_root(&self.roots, p).is_none())
            .cloned()
            .collect();

        orphaned
            .into_iter()
            .map(|p| {
                self.known.remove(&p);
                WatchEvent::Removed(p)
            })
            .collect()
    }

    /// Classify one raw backend notification.
    ///
    /// `Err` carries a backend failure message.
    pub fn translate(&mut self, raw: RawFsEvent) -> std::result::Result<Vec<WatchEvent>, String> {
        if !self.active {
            return Ok(Vec::new());
        }

        let paths = match raw {
            RawFsEvent::Failed(reason) => return Err(reason),
            RawFsEvent::Touched(paths) | RawFsEvent::Removed(paths) => paths,
        };

        let mut events = Vec::new();
        for path in paths {
            self.classify_path(path, &mut events);
        }
        Ok(events)
    }

    fn classify_path(&mut self, path: PathBuf, out: &mut Vec<WatchEvent>) {
        if self.fs.is_file(&path) {
            if !self.accepts(&path) {
                return;
            }
            if self.known.insert(path.clone()) {
                out.push(WatchEvent::Added(path));
            } else {
                out.push(WatchEvent::Changed(path));
            }
        } else if self.fs.is_dir(&path) {
            // A directory appeared (created or moved in): report what it holds.
            let Some(filter) = self.filter.as_ref() else {
                return;
            };
            let Some(root) = owning_root(&self.roots, &path).cloned() else {
                return;
            };
            match collect_matching_files(self.fs.as_ref(), &root, filter) {
                Ok(files) => {
                    for file in files.into_iter().filter(|f| f.starts_with(&path)) {
                        if self.known.insert(file.clone()) {
                            out.push(WatchEvent::Added(file));
                        }
                    }
                }
                Err(err) => warn!(dir = ?path, error = %err, "failed to scan new directory"),
            }
        } else {
            // Gone: a file, or a directory with known files beneath it.
            let gone: Vec<PathBuf> = self
                .known
                .iter()
                .filter(|k| **k == path || k.starts_with(&path))
                .cloned()
                .collect();
            for p in gone {
                self.known.remove(&p);
                out.push(WatchEvent::Removed(p));
            }
        }
    }

    /// Canonical key for `path`, or `path` itself once it no longer exists.
    pub fn path_key(&self, path: &Path) -> PathBuf {
        self.fs
            .canonicalize(path)
            .unwrap_or_else(|_| path.to_path_buf())
    }

    fn resolve_root(&self, path: &Path) -> Result<PathBuf> {
        self.fs.canonicalize(path).map_err(|e| {
            HotCompileError::ConfigError(format!(
                "watch path {:?} does not exist or cannot be resolved: {e:#}",
                path
            ))
        })
    }

    fn accepts(&self, path: &Path) -> bool {
        let Some(filter) = self.filter.as_ref() else {
            return false;
        };
        let Some(root) = owning_root(&self.roots, path) else {
            return false;
        };
        match relative_str(root, path) {
            Some(rel) => filter.accepts(path, &rel),
            None => false,
        }
    }

    fn attach(&mut self, path: &Path) -> Result<Vec<WatchEvent>> {
        self.source
            .watch(path)
            .map_err(|e| HotCompileError::Watch(format!("{e:#}")))?;
        self.roots.push(path.to_path_buf());

        let Some(filter) = self.filter.as_ref() else {
            return Ok(Vec::new());
        };
        let files = collect_matching_files(self.fs.as_ref(), path, filter)
            .map_err(|e| HotCompileError::Watch(format!("initial scan of {:?} failed: {e:#}", path)))?;

        let mut added = Vec::new();
        for file in files {
            if self.known.insert(file.clone()) {
                added.push(WatchEvent::Added(file));
            }
        }
        debug!(root = ?path, files = added.len(), "initial scan complete");
        Ok(added)
    }
}
