// src/engine/runtime.rs

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::compiler::{CompilationResult, CompilerAdapter};
use crate::errors::{HotCompileError, Result};
use crate::fs::FileSystem;
use crate::registry::SourceUnit;
use crate::types::{PipelineState, Target};
use crate::watch::{RawFsEvent, WatchEvent, WatchFilter, WatchService};

use super::core::CoreRuntime;
use super::events::HotReloadEvent;
use super::{CompileJob, CoreCommand, CoreEvent, CoreStep, LoadedSource};

/// Requests sent by a `HotReloadHandle` to the runtime task.
#[derive(Debug)]
pub(crate) enum Control {
    Start {
        reply: oneshot::Sender<Result<()>>,
    },
    Stop {
        reply: oneshot::Sender<()>,
    },
    ForceRecompile {
        reply: oneshot::Sender<Result<usize>>,
    },
    AddPath {
        path: PathBuf,
        reply: oneshot::Sender<Result<()>>,
    },
    RemovePath {
        path: PathBuf,
        reply: oneshot::Sender<()>,
    },
    Source {
        path: PathBuf,
        reply: oneshot::Sender<Option<SourceUnit>>,
    },
    ResultFor {
        path: PathBuf,
        target: Target,
        reply: oneshot::Sender<Option<CompilationResult>>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Sleep target used when no debounce timer is pending; the branch is
/// disabled in that case but `select!` still builds the future.
const IDLE_SLEEP: Duration = Duration::from_secs(3600);

/// Drives the hot-reload core in response to control requests, watch
/// notifications, timer expiry and finished compile jobs.
///
/// This is a pure IO shell around `CoreRuntime`, which contains all the
/// pipeline semantics. Everything runs on this one task, so the registry
/// and queue are never touched concurrently; only compile jobs run on
/// their own tasks and report back through `done_rx`.
pub struct Runtime {
    core: CoreRuntime,
    fs: Arc<dyn FileSystem>,
    adapter: Arc<CompilerAdapter>,
    watch: WatchService,
    filter: WatchFilter,
    /// Roots to watch on the next start.
    paths: Vec<PathBuf>,
    version_checked: bool,
    control_rx: mpsc::Receiver<Control>,
    raw_rx: mpsc::UnboundedReceiver<RawFsEvent>,
    done_tx: mpsc::UnboundedSender<CoreEvent>,
    done_rx: mpsc::UnboundedReceiver<CoreEvent>,
    events_tx: broadcast::Sender<HotReloadEvent>,
    state_tx: watch::Sender<PipelineState>,
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .field("watch", &self.watch)
            .field("paths", &self.paths)
            .finish_non_exhaustive()
    }
}

/// Channels and collaborators a [`Runtime`] is built from.
pub(crate) struct RuntimeParts {
    pub core: CoreRuntime,
    pub fs: Arc<dyn FileSystem>,
    pub adapter: Arc<CompilerAdapter>,
    pub watch: WatchService,
    pub filter: WatchFilter,
    pub paths: Vec<PathBuf>,
    pub control_rx: mpsc::Receiver<Control>,
    pub raw_rx: mpsc::UnboundedReceiver<RawFsEvent>,
    pub events_tx: broadcast::Sender<HotReloadEvent>,
    pub state_tx: watch::Sender<PipelineState>,
}

impl Runtime {
    pub(crate) fn new(parts: RuntimeParts) -> Self {
        let (done_tx, done_rx) = mpsc::unbounded_channel();
        Self {
            core: parts.core,
            fs: parts.fs,
            adapter: parts.adapter,
            watch: parts.watch,
            filter: parts.filter,
            paths: parts.paths,
            version_checked: false,
            control_rx: parts.control_rx,
            raw_rx: parts.raw_rx,
            done_tx,
            done_rx,
            events_tx: parts.events_tx,
            state_tx: parts.state_tx,
        }
    }

    /// Main event loop.
    ///
    /// Exits on `Shutdown` or once every handle has been dropped.
    pub async fn run(mut self) {
        info!("hot-reload runtime started");

        loop {
            let deadline = self.core.next_debounce_deadline();
            let wake_at = deadline
                .map(Instant::from_std)
                .unwrap_or_else(|| Instant::now() + IDLE_SLEEP);

            tokio::select! {
                msg = self.control_rx.recv() => match msg {
                    Some(Control::Shutdown { reply }) => {
                        self.stop();
                        let _ = reply.send(());
                        break;
                    }
                    Some(msg) => self.handle_control(msg).await,
                    None => {
                        info!("all handles dropped; exiting");
                        self.stop();
                        break;
                    }
                },
                Some(raw) = self.raw_rx.recv() => self.handle_raw(raw),
                Some(done) = self.done_rx.recv() => self.apply(done),
                _ = tokio::time::sleep_until(wake_at), if deadline.is_some() => {
                    self.fire_debounces();
                }
            }
        }

        info!("hot-reload runtime exiting");
    }

    async fn handle_control(&mut self, msg: Control) {
        match msg {
            Control::Start { reply } => {
                let outcome = self.start().await;
                let _ = reply.send(outcome);
            }
            Control::Stop { reply } => {
                self.stop();
                let _ = reply.send(());
            }
            Control::ForceRecompile { reply } => {
                let outcome = match self.core.force_recompile() {
                    Ok((count, step)) => {
                        info!(files = count, "forced recompile");
                        self.execute(step);
                        Ok(count)
                    }
                    Err(err) => Err(err),
                };
                let _ = reply.send(outcome);
            }
            Control::AddPath { path, reply } => {
                let _ = reply.send(self.add_path(path));
            }
            Control::RemovePath { path, reply } => {
                self.remove_path(&path);
                let _ = reply.send(());
            }
            Control::Source { path, reply } => {
                let key = self.watch.path_key(&path);
                let _ = reply.send(self.core.registry().get(&key).cloned());
            }
            Control::ResultFor {
                path,
                target,
                reply,
            } => {
                let key = self.watch.path_key(&path);
                let _ = reply.send(self.core.result_for(&key, target).cloned());
            }
            Control::Shutdown { reply } => {
                let _ = reply.send(());
            }
        }
    }

    /// Check the toolchain version (once), start the watch service and seed the core.
    ///
    /// Configuration problems leave the pipeline `Idle`; a backend that
    /// refuses to watch leaves it in `Error`.
    async fn start(&mut self) -> Result<()> {
        if self.core.state() != PipelineState::Idle {
            debug!(state = %self.core.state(), "restarting watch session");
            self.stop();
        }

        if !self.version_checked {
            self.adapter.check_version().await?;
            self.version_checked = true;
        }

        let initial = match self.watch.start(&self.paths, self.filter.clone()) {
            Ok(events) => events,
            Err(err @ HotCompileError::Watch(_)) => {
                let step = self.core.step(CoreEvent::WatchFailed {
                    reason: err.to_string(),
                });
                self.execute(step);
                return Err(err);
            }
            Err(err) => return Err(err),
        };

        let sources = self.load_all(initial.iter().map(WatchEvent::path));
        self.apply(CoreEvent::WatchStarted { sources });
        Ok(())
    }

    fn stop(&mut self) {
        self.watch.stop();
        self.apply(CoreEvent::Stopped);
    }

    fn add_path(&mut self, path: PathBuf) -> Result<()> {
        let key = self.watch.path_key(&path);
        if !self.paths.iter().any(|p| self.watch.path_key(p) == key) {
            self.paths.push(path.clone());
        }
        if !self.watch.is_active() {
            return Ok(());
        }

        match self.watch.add_path(&path) {
            Ok(added) => {
                let sources = self.load_all(added.iter().map(WatchEvent::path));
                info!(root = ?path, files = sources.len(), "watch path added");
                self.apply(CoreEvent::SourcesDiscovered { sources });
                Ok(())
            }
            Err(err) => {
                let watch = &self.watch;
                self.paths.retain(|p| watch.path_key(p) != key);
                Err(err)
            }
        }
    }

    fn remove_path(&mut self, path: &Path) {
        let key = self.watch.path_key(path);
        let watch = &self.watch;
        self.paths.retain(|p| p != path && watch.path_key(p) != key);
        let removed = self.watch.remove_path(path);
        info!(root = ?path, files = removed.len(), "watch path removed");
        for event in removed {
            self.apply(CoreEvent::FileRemoved {
                path: event.path().to_path_buf(),
            });
        }
    }

    fn handle_raw(&mut self, raw: RawFsEvent) {
        match self.watch.translate(raw) {
            Ok(events) => {
                for event in events {
                    let core_event = match event {
                        WatchEvent::Added(path) | WatchEvent::Changed(path) => {
                            CoreEvent::FileTouched {
                                path,
                                now: Instant::now().into_std(),
                            }
                        }
                        WatchEvent::Removed(path) => CoreEvent::FileRemoved { path },
                    };
                    self.apply(core_event);
                }
            }
            Err(reason) => self.apply(CoreEvent::WatchFailed { reason }),
        }
    }

    fn fire_debounces(&mut self) {
        let ready = self.core.take_ready_debounces(Instant::now().into_std());
        for path in ready {
            if let Some(source) = self.load(&path) {
                self.apply(CoreEvent::SourceLoaded(source));
            }
        }
    }

    /// Read a source file; I/O errors are logged and the file skipped.
    fn load(&self, path: &Path) -> Option<LoadedSource> {
        let read = self
            .fs
            .read_to_string(path)
            .and_then(|content| Ok((content, self.fs.modified(path)?)));
        match read {
            Ok((content, modified)) => Some(LoadedSource {
                path: path.to_path_buf(),
                content,
                modified,
            }),
            Err(err) => {
                warn!(path = ?path, error = %err, "failed to read source; skipping");
                None
            }
        }
    }

    fn load_all<'a>(&self, paths: impl Iterator<Item = &'a Path>) -> Vec<LoadedSource> {
        paths.filter_map(|p| self.load(p)).collect()
    }

    fn apply(&mut self, event: CoreEvent) {
        let step = self.core.step(event);
        self.execute(step);
    }

    /// Execute the commands returned by the core, in order.
    fn execute(&mut self, step: CoreStep) {
        for command in step.commands {
            match command {
                CoreCommand::Publish(event) => {
                    debug!(kind = event.type_name(), file = ?event.filename(), "publishing event");
                    // No subscribers is fine.
                    let _ = self.events_tx.send(event);
                }
                CoreCommand::StateChanged(state) => {
                    self.state_tx.send_replace(state);
                }
                CoreCommand::Compile(job) => self.spawn_compile(job),
            }
        }
    }

    fn spawn_compile(&self, job: CompileJob) {
        let adapter = Arc::clone(&self.adapter);
        let done_tx = self.done_tx.clone();

        debug!(path = ?job.path, targets = job.requests.len(), "dispatching compile job");
        tokio::spawn(async move {
            let mut results = Vec::with_capacity(job.requests.len());
            for request in &job.requests {
                results.push(adapter.compile(request).await);
            }
            let _ = done_tx.send(CoreEvent::CompileFinished {
                generation: job.generation,
                path: job.path,
                results,
            });
        });
    }
}
