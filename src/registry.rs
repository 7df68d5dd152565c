// src/registry.rs

//! In-memory record of every watched source file.
//!
//! The registry remembers the last content seen for each path so that a
//! change notification with identical content (editors love to re-save)
//! does not trigger a recompile. It also keeps the latest
//! [`CompilationResult`] per `(path, target)`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use tracing::debug;

use crate::compiler::CompilationResult;
use crate::types::Target;

/// Snapshot of one watched file.
#[derive(Debug, Clone)]
pub struct SourceUnit {
    path: PathBuf,
    content: Arc<str>,
    digest: blake3::Hash,
    last_modified: SystemTime,
    results: BTreeMap<Target, CompilationResult>,
    last_target: Option<Target>,
}

impl SourceUnit {
    fn new(path: PathBuf, content: Arc<str>, last_modified: SystemTime) -> Self {
        let digest = blake3::hash(content.as_bytes());
        Self {
            path,
            content,
            digest,
            last_modified,
            results: BTreeMap::new(),
            last_target: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Shared handle to the content, for building requests without copying.
    pub fn shared_content(&self) -> Arc<str> {
        Arc::clone(&self.content)
    }

    /// blake3 digest of the current content, hex encoded.
    pub fn content_hash(&self) -> String {
        self.digest.to_hex().to_string()
    }

    pub fn last_modified(&self) -> SystemTime {
        self.last_modified
    }

    /// Most recently attached result, for any target.
    pub fn last_compilation_result(&self) -> Option<&CompilationResult> {
        self.last_target.and_then(|t| self.results.get(&t))
    }

    pub fn result_for(&self, target: Target) -> Option<&CompilationResult> {
        self.results.get(&target)
    }

    fn same_content(&self, content: &str) -> bool {
        self.digest == blake3::hash(content.as_bytes()) && &*self.content == content
    }
}

/// Outcome of [`SourceRegistry::record_change`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Changed,
    Unchanged,
}

#[derive(Debug, Default)]
pub struct SourceRegistry {
    units: BTreeMap<PathBuf, SourceUnit>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.units.contains_key(path)
    }

    pub fn get(&self, path: &Path) -> Option<&SourceUnit> {
        self.units.get(path)
    }

    pub fn clear(&mut self) {
        self.units.clear();
    }

    /// Create or overwrite the entry for `path`. Previous results are dropped.
    pub fn record_add(&mut self, path: PathBuf, content: impl Into<Arc<str>>, mtime: SystemTime) {
        let unit = SourceUnit::new(path.clone(), content.into(), mtime);
        self.units.insert(path, unit);
    }

    /// Update `path` if its content differs from the cached snapshot.
    ///
    /// An unknown path is recorded and reported as `Changed`. Identical
    /// content is a no-op: neither content nor mtime is touched.
    pub fn record_change(
        &mut self,
        path: &Path,
        content: impl Into<Arc<str>>,
        mtime: SystemTime,
    ) -> RecordOutcome {
        let content = content.into();
        match self.units.get_mut(path) {
            Some(unit) if unit.same_content(&content) => {
                debug!(path = ?path, "content unchanged; suppressing recompile");
                RecordOutcome::Unchanged
            }
            Some(unit) => {
                unit.digest = blake3::hash(content.as_bytes());
                unit.content = content;
                unit.last_modified = mtime;
                RecordOutcome::Changed
            }
            None => {
                self.record_add(path.to_path_buf(), content, mtime);
                RecordOutcome::Changed
            }
        }
    }

    pub fn remove(&mut self, path: &Path) -> Option<SourceUnit> {
        self.units.remove(path)
    }

    /// Every registered path, for "recompile everything".
    pub fn force_all(&self) -> Vec<PathBuf> {
        self.units.keys().cloned().collect()
    }

    /// Store `result` under `(path, result.target)`.
    ///
    /// Returns `false` when `path` is not registered (removed meanwhile).
    pub fn attach_result(&mut self, path: &Path, result: CompilationResult) -> bool {
        match self.units.get_mut(path) {
            Some(unit) => {
                unit.last_target = Some(result.target);
                unit.results.insert(result.target, result);
                true
            }
            None => false,
        }
    }

    pub fn result_for(&self, path: &Path, target: Target) -> Option<&CompilationResult> {
        self.units.get(path).and_then(|u| u.result_for(target))
    }
}
