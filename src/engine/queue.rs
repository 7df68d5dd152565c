// src/engine/queue.rs

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use tracing::debug;

/// Deduplicating FIFO of paths awaiting compilation plus the single-flight
/// guard for the compile loop.
///
/// Semantics:
/// - `enqueue` is idempotent: a path already waiting is not added twice.
/// - `begin_next` is the drain step. While a path is in flight it returns
///   `None`, so no two compile rounds can overlap. The owner calls `finish`
///   when every target for the in-flight path has been attempted and then
///   drains again until the queue is empty.
/// - A path re-enqueued while it is itself in flight waits for the next
///   round, so the latest content still gets compiled.
#[derive(Debug, Default)]
pub struct CompileQueue {
    pending: VecDeque<PathBuf>,
    in_flight: Option<PathBuf>,
}

impl CompileQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if nothing is waiting (an in-flight path may still exist).
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.pending.iter().any(|p| p == path)
    }

    pub fn in_flight(&self) -> Option<&Path> {
        self.in_flight.as_deref()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Add `path` unless already waiting. Returns whether it was added.
    pub fn enqueue(&mut self, path: PathBuf) -> bool {
        if self.contains(&path) {
            debug!(path = ?path, "already queued; not duplicating");
            return false;
        }
        self.pending.push_back(path);
        true
    }

    /// Take the next path and mark it in flight, unless a round is running.
    pub fn begin_next(&mut self) -> Option<PathBuf> {
        if self.in_flight.is_some() {
            return None;
        }
        let next = self.pending.pop_front()?;
        self.in_flight = Some(next.clone());
        Some(next)
    }

    /// Clear the single-flight flag for `path`.
    ///
    /// Returns `false` if `path` was not the in-flight entry (e.g. the queue
    /// was cleared meanwhile); the flag is left untouched in that case.
    pub fn finish(&mut self, path: &Path) -> bool {
        if self.in_flight.as_deref() == Some(path) {
            self.in_flight = None;
            true
        } else {
            false
        }
    }

    /// Drop a waiting entry. The in-flight entry is not affected.
    pub fn remove(&mut self, path: &Path) -> bool {
        let before = self.pending.len();
        self.pending.retain(|p| p != path);
        before != self.pending.len()
    }

    /// Drop every waiting entry but keep the in-flight marker.
    pub fn clear_pending(&mut self) -> usize {
        let n = self.pending.len();
        self.pending.clear();
        n
    }

    /// Forget everything, including the in-flight marker.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.in_flight = None;
    }
}
