// src/engine/mod.rs

//! Hot-reload orchestration engine.
//!
//! This module ties together:
//! - the source registry (content snapshots, last results)
//! - the per-path debouncer
//! - the compile queue (dedup + single-flight)
//! - the pipeline state machine and event publication
//!
//! The pure core state machine lives in [`core`] (handlers in
//! [`event_handlers`]); the async/IO shell that owns the watch service and
//! the compiler adapter is implemented in [`runtime`]. Callers talk to the
//! shell through a [`HotReloadHandle`].

use std::path::PathBuf;
use std::time::{Instant, SystemTime};

use crate::compiler::{CompilationRequest, CompilationResult};

/// File content read by the shell and handed to the core.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedSource {
    pub path: PathBuf,
    pub content: String,
    pub modified: SystemTime,
}

/// Events flowing into the core from the shell.
#[derive(Debug, Clone)]
pub enum CoreEvent {
    /// The watch service is up; `sources` is the initial scan.
    WatchStarted { sources: Vec<LoadedSource> },
    /// A watch root was added at runtime; `sources` is its scan.
    SourcesDiscovered { sources: Vec<LoadedSource> },
    /// The watch backend failed.
    WatchFailed { reason: String },
    /// `stop_watching` was called.
    Stopped,
    /// A file was added or changed on disk (not yet debounced).
    FileTouched { path: PathBuf, now: Instant },
    /// A file is gone, or its root was unwatched.
    FileRemoved { path: PathBuf },
    /// Debounce elapsed and the shell read the file's latest content.
    SourceLoaded(LoadedSource),
    /// Every target of a compile job has been attempted.
    CompileFinished {
        generation: u64,
        path: PathBuf,
        results: Vec<CompilationResult>,
    },
}

/// One compile round: every configured target for one path.
#[derive(Debug, Clone)]
pub struct CompileJob {
    /// Incremented on every start/stop; results from older rounds are dropped.
    pub generation: u64,
    pub path: PathBuf,
    pub requests: Vec<CompilationRequest>,
}

pub mod core;
pub mod events;
pub mod event_handlers;
pub mod handle;
pub mod queue;
pub mod runtime;

pub use core::{CoreRuntime, CoreSettings};
pub use event_handlers::{CoreCommand, CoreStep};
pub use events::{HotReloadEvent, HotReloadEventKind};
pub use handle::{HotReloadContext, HotReloadHandle};
pub use queue::CompileQueue;
pub use runtime::Runtime;
