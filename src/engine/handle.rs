// src/engine/handle.rs

//! Public entry point of the hot-reload pipeline.
//!
//! [`HotReloadContext`] collects everything the pipeline needs (config,
//! filesystem, compiler invoker, watch backend) so nothing is global;
//! [`HotReloadContext::spawn`] starts the runtime task and returns a
//! cloneable [`HotReloadHandle`].

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, oneshot, watch};

use crate::compiler::{
    CompilationResult, CompilerAdapter, CompilerSettings, ExternalToolInvoker, ProcessInvoker,
    ValidationResult,
};
use crate::config::ConfigFile;
use crate::errors::{HotCompileError, Result};
use crate::fs::{FileSystem, RealFileSystem};
use crate::registry::SourceUnit;
use crate::types::{PipelineState, Target};
use crate::watch::{FileWatchSource, NotifyWatchSource, RawFsEvent, WatchFilter, WatchService};

use super::core::{CoreRuntime, CoreSettings};
use super::events::HotReloadEvent;
use super::runtime::{Control, Runtime, RuntimeParts};

const CONTROL_CAPACITY: usize = 32;
const EVENT_CAPACITY: usize = 256;

/// Collaborators of one hot-reload pipeline.
pub struct HotReloadContext {
    pub config: ConfigFile,
    pub fs: Arc<dyn FileSystem>,
    pub invoker: Arc<dyn ExternalToolInvoker>,
    pub watch_source: Box<dyn FileWatchSource>,
    /// Receiving end of the channel `watch_source` reports into.
    pub raw_events: mpsc::UnboundedReceiver<RawFsEvent>,
}

impl std::fmt::Debug for HotReloadContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HotReloadContext")
            .field("config", &self.config)
            .field("fs", &self.fs)
            .finish_non_exhaustive()
    }
}

impl HotReloadContext {
    /// Real filesystem, `notify` watcher and process-spawning invoker.
    pub fn native(config: ConfigFile) -> Result<Self> {
        let (raw_tx, raw_rx) = mpsc::unbounded_channel();
        let watch_source = NotifyWatchSource::new(raw_tx)?;
        Ok(Self {
            config,
            fs: Arc::new(RealFileSystem),
            invoker: Arc::new(ProcessInvoker),
            watch_source: Box::new(watch_source),
            raw_events: raw_rx,
        })
    }

    /// Start the runtime task. Must be called inside a Tokio runtime.
    ///
    /// The pipeline starts `Idle`; call [`HotReloadHandle::start_watching`].
    pub fn spawn(self) -> Result<HotReloadHandle> {
        let filter = WatchFilter::from_config(&self.config)?;
        let adapter = Arc::new(CompilerAdapter::new(
            CompilerSettings::from_config(&self.config),
            self.invoker,
        ));

        let (control_tx, control_rx) = mpsc::channel(CONTROL_CAPACITY);
        let (events_tx, _) = broadcast::channel(EVENT_CAPACITY);
        let (state_tx, state_rx) = watch::channel(PipelineState::Idle);

        let runtime = Runtime::new(RuntimeParts {
            core: CoreRuntime::new(CoreSettings::from_config(&self.config)),
            fs: Arc::clone(&self.fs),
            adapter: Arc::clone(&adapter),
            watch: WatchService::new(self.fs, self.watch_source),
            filter,
            paths: self.config.watch.paths.clone(),
            control_rx,
            raw_rx: self.raw_events,
            events_tx: events_tx.clone(),
            state_tx,
        });
        tokio::spawn(runtime.run());

        Ok(HotReloadHandle {
            control_tx,
            state_rx,
            events_tx,
            adapter,
        })
    }
}

/// Cloneable handle to a running pipeline.
#[derive(Debug, Clone)]
pub struct HotReloadHandle {
    control_tx: mpsc::Sender<Control>,
    state_rx: watch::Receiver<PipelineState>,
    events_tx: broadcast::Sender<HotReloadEvent>,
    adapter: Arc<CompilerAdapter>,
}

impl HotReloadHandle {
    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Control) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.control_tx
            .send(make(reply))
            .await
            .map_err(|_| HotCompileError::ChannelClosed)?;
        rx.await.map_err(|_| HotCompileError::ChannelClosed)
    }

    /// Check the compiler version (first time only), start watching the configured
    /// paths and seed the registry from the initial scan.
    ///
    /// Restarting from `Watching` or `Error` is allowed and begins a fresh
    /// session.
    pub async fn start_watching(&self) -> Result<()> {
        self.request(|reply| Control::Start { reply }).await?
    }

    /// Cancel pending timers, clear the queue and release every watch handle.
    pub async fn stop_watching(&self) -> Result<()> {
        self.request(|reply| Control::Stop { reply }).await
    }

    /// Recompile every registered file. Returns how many were queued.
    pub async fn force_recompile(&self) -> Result<usize> {
        self.request(|reply| Control::ForceRecompile { reply }).await?
    }

    pub async fn add_watch_path(&self, path: impl Into<PathBuf>) -> Result<()> {
        let path = path.into();
        self.request(|reply| Control::AddPath { path, reply }).await?
    }

    /// Unwatch `path`; its files leave the registry and queued work is dropped.
    pub async fn remove_watch_path(&self, path: impl Into<PathBuf>) -> Result<()> {
        let path = path.into();
        self.request(|reply| Control::RemovePath { path, reply }).await
    }

    /// Snapshot of one registered source.
    pub async fn source(&self, path: impl Into<PathBuf>) -> Result<Option<SourceUnit>> {
        let path = path.into();
        self.request(|reply| Control::Source { path, reply }).await
    }

    pub async fn result_for(
        &self,
        path: impl Into<PathBuf>,
        target: Target,
    ) -> Result<Option<CompilationResult>> {
        let path = path.into();
        self.request(|reply| Control::ResultFor {
            path,
            target,
            reply,
        })
        .await
    }

    pub fn state(&self) -> PipelineState {
        *self.state_rx.borrow()
    }

    /// Receiver that observes every state transition.
    pub fn state_changes(&self) -> watch::Receiver<PipelineState> {
        self.state_rx.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<HotReloadEvent> {
        self.events_tx.subscribe()
    }

    /// Editor-time syntax check; does not touch the registry.
    pub async fn validate(&self, source_code: &str, filename: &str) -> ValidationResult {
        self.adapter.validate(source_code, filename).await
    }

    /// Stop watching and end the runtime task.
    pub async fn shutdown(&self) -> Result<()> {
        self.request(|reply| Control::Shutdown { reply }).await
    }
}
