// src/watch/watcher.rs

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Raw notification from an OS (or fake) watch backend.
///
/// Backends do not classify: `Touched` covers create/modify/rename and the
/// watch service decides what happened by looking at the filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawFsEvent {
    Touched(Vec<PathBuf>),
    Removed(Vec<PathBuf>),
    /// The backend reported an error; the pipeline treats it as a watch failure.
    Failed(String),
}

/// Capability to observe paths for changes.
///
/// Implementations deliver [`RawFsEvent`]s over a channel handed to them at
/// construction; `watch`/`unwatch` only manage the set of observed paths, so
/// paths can be added or dropped without restarting anything.
pub trait FileWatchSource: Send {
    fn watch(&mut self, path: &Path) -> Result<()>;
    fn unwatch(&mut self, path: &Path) -> Result<()>;
}

/// `notify`-backed watch source.
///
/// Holding this keeps the underlying `RecommendedWatcher` alive; dropping it
/// releases every OS watch handle.
pub struct NotifyWatchSource {
    inner: RecommendedWatcher,
}

impl std::fmt::Debug for NotifyWatchSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifyWatchSource").finish()
    }
}

impl NotifyWatchSource {
    /// Create a watcher that forwards every notification into `events_tx`.
    pub fn new(events_tx: mpsc::UnboundedSender<RawFsEvent>) -> Result<Self> {
        // Closure called synchronously by notify whenever an event arrives.
        let inner = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                let raw = match res {
                    Ok(event) => match event.kind {
                        EventKind::Access(_) => return,
                        EventKind::Remove(_) => RawFsEvent::Removed(event.paths),
                        _ => RawFsEvent::Touched(event.paths),
                    },
                    Err(err) => RawFsEvent::Failed(err.to_string()),
                };
                if let Err(err) = events_tx.send(raw) {
                    // We can't log via tracing here easily, so fallback to stderr.
                    eprintln!("hotcompile: failed to forward watch event: {err}");
                }
            },
            Config::default(),
        )
        .context("creating OS file watcher")?;

        Ok(Self { inner })
    }
}

impl FileWatchSource for NotifyWatchSource {
    fn watch(&mut self, path: &Path) -> Result<()> {
        let mode = if path.is_dir() {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };
        self.inner
            .watch(path, mode)
            .with_context(|| format!("watching {:?}", path))?;
        info!("file watcher started on {:?}", path);
        Ok(())
    }

    fn unwatch(&mut self, path: &Path) -> Result<()> {
        self.inner
            .unwatch(path)
            .with_context(|| format!("unwatching {:?}", path))?;
        debug!("file watcher released {:?}", path);
        Ok(())
    }
}
