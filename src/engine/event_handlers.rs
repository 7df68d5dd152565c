// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, error, info, warn};

use crate::compiler::{CompilationRequest, CompilationResult};
use crate::engine::core::CoreRuntime;
use crate::engine::events::{HotReloadEvent, HotReloadEventKind};
use crate::engine::{CompileJob, LoadedSource};
use crate::registry::RecordOutcome;
use crate::types::PipelineState;

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone)]
pub enum CoreCommand {
    /// Deliver this event to subscribers.
    Publish(HotReloadEvent),
    /// The pipeline moved to a new state.
    StateChanged(PipelineState),
    /// Run every request of this job on the compiler adapter, in order, then
    /// report back with `CoreEvent::CompileFinished`.
    Compile(CompileJob),
}

/// Decision returned by the core after handling a single `CoreEvent`.
#[derive(Debug, Clone, Default)]
pub struct CoreStep {
    /// Commands the IO shell should execute, in order.
    pub commands: Vec<CoreCommand>,
}

impl CoreStep {
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn events(&self) -> impl Iterator<Item = &HotReloadEvent> {
        self.commands.iter().filter_map(|c| match c {
            CoreCommand::Publish(ev) => Some(ev),
            _ => None,
        })
    }

    pub fn jobs(&self) -> impl Iterator<Item = &CompileJob> {
        self.commands.iter().filter_map(|c| match c {
            CoreCommand::Compile(job) => Some(job),
            _ => None,
        })
    }

    fn publish(&mut self, kind: HotReloadEventKind) {
        self.commands
            .push(CoreCommand::Publish(HotReloadEvent::now(kind)));
    }
}

impl CoreRuntime {
    fn set_state(&mut self, next: PipelineState, step: &mut CoreStep) {
        if self.state == next {
            return;
        }
        debug!(from = %self.state, to = %next, "pipeline state change");
        self.state = next;
        step.commands.push(CoreCommand::StateChanged(next));
    }

    /// Reset per-session bookkeeping. Anything still running belongs to an
    /// older generation afterwards.
    fn reset_session(&mut self) {
        self.generation += 1;
        self.debouncer.cancel_all();
        self.queue.clear();
        self.watch_failed = false;
        self.discard_in_flight = false;
    }

    /// Seed the registry from the initial scan and enter `Watching`.
    ///
    /// The scan does not compile anything unless `compile_on_start` is set.
    pub(super) fn handle_watch_started(&mut self, sources: Vec<LoadedSource>, step: &mut CoreStep) {
        self.reset_session();
        self.registry.clear();

        let count = sources.len();
        let compile = self.settings.compile_on_start;
        for source in sources {
            if compile {
                self.queue.enqueue(source.path.clone());
            }
            self.registry
                .record_add(source.path, source.content, source.modified);
        }
        info!(files = count, "watching sources");

        self.set_state(PipelineState::Watching, step);
        self.drain(step);
    }

    pub(super) fn handle_sources_discovered(
        &mut self,
        sources: Vec<LoadedSource>,
        step: &mut CoreStep,
    ) {
        if !self.accepting() {
            return;
        }
        for source in sources {
            if self.registry.contains(&source.path) {
                continue;
            }
            if self.settings.compile_on_start {
                self.queue.enqueue(source.path.clone());
            }
            self.registry
                .record_add(source.path, source.content, source.modified);
        }
        self.drain(step);
    }

    /// Enter `Error` and stop reacting to changes until the next start.
    pub(super) fn handle_watch_failed(&mut self, reason: &str, step: &mut CoreStep) {
        error!(reason, "watch backend failed; no further changes will be processed");
        self.watch_failed = true;
        self.debouncer.cancel_all();
        let dropped = self.queue.clear_pending();
        if dropped > 0 {
            debug!(dropped, "dropped queued compiles after watch failure");
        }
        self.set_state(PipelineState::Error, step);
    }

    pub(super) fn handle_stopped(&mut self, step: &mut CoreStep) {
        self.reset_session();
        self.set_state(PipelineState::Idle, step);
    }

    /// (Re)start the debounce timer; the read happens when it fires.
    pub(super) fn handle_file_touched(&mut self, path: PathBuf, now: Instant) {
        if !self.accepting() {
            debug!(path = ?path, state = %self.state, "ignoring file activity");
            return;
        }
        self.debouncer.trigger(path, now);
    }

    /// Forget the path entirely: timer, queue entry, snapshot and results.
    pub(super) fn handle_file_removed(&mut self, path: &Path) {
        self.debouncer.cancel(path);
        self.queue.remove(path);
        if self.queue.in_flight() == Some(path) {
            self.discard_in_flight = true;
        }
        if self.registry.remove(path).is_some() {
            info!(path = ?path, "source removed");
        }
    }

    pub(super) fn handle_source_loaded(&mut self, source: LoadedSource, step: &mut CoreStep) {
        if !self.accepting() {
            return;
        }
        let LoadedSource {
            path,
            content,
            modified,
        } = source;

        match self.registry.record_change(&path, content, modified) {
            RecordOutcome::Unchanged => {}
            RecordOutcome::Changed => {
                info!(path = ?path, "source changed");
                step.publish(HotReloadEventKind::FileChanged {
                    filename: path.clone(),
                });
                self.queue.enqueue(path);
                self.drain(step);
            }
        }
    }

    pub(super) fn handle_compile_finished(
        &mut self,
        generation: u64,
        path: PathBuf,
        results: Vec<CompilationResult>,
        step: &mut CoreStep,
    ) {
        if generation != self.generation {
            debug!(path = ?path, generation, current = self.generation, "discarding stale compile results");
            return;
        }
        if !self.queue.finish(&path) {
            warn!(path = ?path, "compile finished for a path that was not in flight");
            return;
        }

        let discard = std::mem::take(&mut self.discard_in_flight) || !self.registry.contains(&path);
        if discard {
            debug!(path = ?path, "source removed during compile; results dropped");
            if self.state == PipelineState::Compiling {
                let next = if self.watch_failed {
                    PipelineState::Error
                } else {
                    PipelineState::Watching
                };
                self.set_state(next, step);
            }
        } else {
            self.apply_results(path, results, step);
        }

        self.drain(step);
    }

    fn apply_results(&mut self, path: PathBuf, results: Vec<CompilationResult>, step: &mut CoreStep) {
        let mut failed = false;
        let mut succeeded = Vec::new();

        for result in results {
            self.registry.attach_result(&path, result.clone());
            step.publish(HotReloadEventKind::CompilationComplete {
                filename: path.clone(),
                result: result.clone(),
            });

            if result.success {
                info!(path = ?path, target = %result.target, ms = result.timing.total_time, "compiled");
                succeeded.push(result);
            } else {
                failed = true;
                let error = result.diagnostics.first().map(|d| d.message.clone());
                warn!(path = ?path, target = %result.target, error = ?error, "compilation failed");
                step.publish(HotReloadEventKind::CompilationError {
                    filename: path.clone(),
                    result,
                    error,
                });
            }
        }

        if !succeeded.is_empty() {
            self.set_state(PipelineState::Reloading, step);
            for result in succeeded {
                step.publish(HotReloadEventKind::ReloadTriggered {
                    filename: path.clone(),
                    result,
                });
            }
        }

        let next = if failed || self.watch_failed {
            PipelineState::Error
        } else {
            PipelineState::Watching
        };
        self.set_state(next, step);
    }

    /// Start the next compile round if none is running.
    pub(super) fn drain(&mut self, step: &mut CoreStep) {
        if !self.accepting() {
            return;
        }
        while let Some(path) = self.queue.begin_next() {
            let Some(unit) = self.registry.get(&path) else {
                self.queue.finish(&path);
                continue;
            };

            let filename = path.to_string_lossy().into_owned();
            let requests = self
                .settings
                .targets
                .iter()
                .map(|&target| {
                    CompilationRequest::new(
                        unit.shared_content(),
                        filename.clone(),
                        target,
                        Some(self.settings.options),
                    )
                })
                .collect();

            self.discard_in_flight = false;
            self.set_state(PipelineState::Compiling, step);
            step.publish(HotReloadEventKind::CompilationStarted {
                filename: Some(path.clone()),
            });
            step.commands.push(CoreCommand::Compile(CompileJob {
                generation: self.generation,
                path,
                requests,
            }));
            break;
        }
    }
}
