// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! This module contains a synchronous, deterministic "core runtime" that
//! consumes [`CoreEvent`]s and produces:
//! - an updated core state
//! - a list of "commands" describing what the IO shell should do next
//!
//! The async/IO-heavy shell (`engine::runtime::Runtime`) is responsible for:
//! - reading watch notifications and control requests from channels
//! - reading file contents once a debounce timer fires
//! - running compile jobs on the compiler adapter
//! - publishing events and state to subscribers
//!
//! The core is intended to be extensively unit tested without any Tokio,
//! channels, filesystem, or processes.

use std::path::Path;
use std::time::{Duration, Instant};

use crate::compiler::{CompilationResult, CompileOptions};
use crate::config::ConfigFile;
use crate::engine::queue::CompileQueue;
use crate::engine::{CoreEvent, CoreStep};
use crate::errors::{HotCompileError, Result};
use crate::registry::SourceRegistry;
use crate::types::{PipelineState, Target};
use crate::watch::Debouncer;

/// Static inputs of the core derived from configuration.
#[derive(Debug, Clone)]
pub struct CoreSettings {
    pub targets: Vec<Target>,
    pub options: CompileOptions,
    pub debounce: Duration,
    pub compile_on_start: bool,
}

impl CoreSettings {
    pub fn from_config(cfg: &ConfigFile) -> Self {
        Self {
            targets: cfg.targets().to_vec(),
            options: cfg.compile_options(),
            debounce: cfg.debounce_delay(),
            compile_on_start: cfg.watch.compile_on_start,
        }
    }
}

/// Pure core runtime state.
///
/// This owns:
/// - the pipeline state value
/// - the source registry
/// - the compile queue and its single-flight flag
/// - per-path debounce timers
///
/// It has **no** channels, no Tokio types, and does not perform any IO.
#[derive(Debug)]
pub struct CoreRuntime {
    pub(super) settings: CoreSettings,
    pub(super) state: PipelineState,
    pub(super) registry: SourceRegistry,
    pub(super) queue: CompileQueue,
    pub(super) debouncer: Debouncer,
    pub(super) generation: u64,
    /// Set by a backend failure; cleared only by start/stop.
    pub(super) watch_failed: bool,
    /// The in-flight path was removed; drop its results.
    pub(super) discard_in_flight: bool,
}

impl CoreRuntime {
    pub fn new(settings: CoreSettings) -> Self {
        let debouncer = Debouncer::new(settings.debounce);
        Self {
            settings,
            state: PipelineState::Idle,
            registry: SourceRegistry::new(),
            queue: CompileQueue::new(),
            debouncer,
            generation: 0,
            watch_failed: false,
            discard_in_flight: false,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    pub fn queue(&self) -> &CompileQueue {
        &self.queue
    }

    pub fn debouncer(&self) -> &Debouncer {
        &self.debouncer
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn result_for(&self, path: &Path, target: Target) -> Option<&CompilationResult> {
        self.registry.result_for(path, target)
    }

    /// When the shell should next wake up to fire debounce timers.
    pub fn next_debounce_deadline(&self) -> Option<Instant> {
        self.debouncer.next_deadline()
    }

    /// Paths whose debounce elapsed; the shell reads each one and feeds
    /// back [`CoreEvent::SourceLoaded`].
    pub fn take_ready_debounces(&mut self, now: Instant) -> Vec<std::path::PathBuf> {
        self.debouncer.take_ready(now)
    }

    /// Handle a single core event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: CoreEvent) -> CoreStep {
        let mut step = CoreStep::default();
        match event {
            CoreEvent::WatchStarted { sources } => self.handle_watch_started(sources, &mut step),
            CoreEvent::SourcesDiscovered { sources } => {
                self.handle_sources_discovered(sources, &mut step)
            }
            CoreEvent::WatchFailed { reason } => self.handle_watch_failed(&reason, &mut step),
            CoreEvent::Stopped => self.handle_stopped(&mut step),
            CoreEvent::FileTouched { path, now } => self.handle_file_touched(path, now),
            CoreEvent::FileRemoved { path } => self.handle_file_removed(&path),
            CoreEvent::SourceLoaded(source) => self.handle_source_loaded(source, &mut step),
            CoreEvent::CompileFinished {
                generation,
                path,
                results,
            } => self.handle_compile_finished(generation, path, results, &mut step),
        }
        step
    }

    /// Queue every registered path, bypassing the no-op check.
    ///
    /// Only valid while `Watching`. Returns how many paths were queued.
    pub fn force_recompile(&mut self) -> Result<(usize, CoreStep)> {
        if self.state != PipelineState::Watching {
            return Err(HotCompileError::InvalidState {
                operation: "force_recompile",
                state: self.state,
            });
        }

        let mut step = CoreStep::default();
        let paths = self.registry.force_all();
        let count = paths.len();
        for path in paths {
            self.queue.enqueue(path);
        }
        self.drain(&mut step);
        Ok((count, step))
    }

    /// Whether file activity is currently acted upon.
    pub(super) fn accepting(&self) -> bool {
        self.state != PipelineState::Idle && !self.watch_failed
    }
}
