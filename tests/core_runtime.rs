// tests/core_runtime.rs
//
// Drives the pure core directly: no Tokio, no channels, no processes.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};

use hotcompile::compiler::{CompilationResult, CompileOptions};
use hotcompile::engine::{
    CompileJob, CoreCommand, CoreEvent, CoreRuntime, CoreSettings, CoreStep, LoadedSource,
};
use hotcompile::errors::HotCompileError;
use hotcompile::types::{PipelineState, Target};

const DEBOUNCE: Duration = Duration::from_millis(300);

fn core_with(targets: &[Target], compile_on_start: bool) -> CoreRuntime {
    CoreRuntime::new(CoreSettings {
        targets: targets.to_vec(),
        options: CompileOptions::default(),
        debounce: DEBOUNCE,
        compile_on_start,
    })
}

fn core() -> CoreRuntime {
    core_with(&[Target::Three], false)
}

fn src(path: &str, content: &str) -> LoadedSource {
    LoadedSource {
        path: PathBuf::from(path),
        content: content.to_string(),
        modified: SystemTime::UNIX_EPOCH,
    }
}

fn ok(target: Target) -> CompilationResult {
    let mut r = CompilationResult::failed(target, "x", Duration::ZERO);
    r.success = true;
    r.diagnostics.clear();
    r.output_code = Some("// ok".into());
    r
}

fn failed(target: Target) -> CompilationResult {
    CompilationResult::failed(target, "Unexpected token", Duration::ZERO)
}

fn started(core: &mut CoreRuntime, files: &[(&str, &str)]) -> CoreStep {
    let sources = files.iter().map(|(p, c)| src(p, c)).collect();
    core.step(CoreEvent::WatchStarted { sources })
}

fn event_types(step: &CoreStep) -> Vec<&'static str> {
    step.events().map(|e| e.type_name()).collect()
}

fn states(step: &CoreStep) -> Vec<PipelineState> {
    step.commands
        .iter()
        .filter_map(|c| match c {
            CoreCommand::StateChanged(s) => Some(*s),
            _ => None,
        })
        .collect()
}

fn single_job(step: &CoreStep) -> CompileJob {
    let jobs: Vec<_> = step.jobs().cloned().collect();
    assert_eq!(jobs.len(), 1, "expected exactly one compile job");
    jobs.into_iter().next().unwrap()
}

fn finish(core: &mut CoreRuntime, job: &CompileJob, results: Vec<CompilationResult>) -> CoreStep {
    core.step(CoreEvent::CompileFinished {
        generation: job.generation,
        path: job.path.clone(),
        results,
    })
}

#[test]
fn start_seeds_registry_without_compiling() {
    let mut core = core();
    let step = started(&mut core, &[("/p/a.wc", "a"), ("/p/b.wc", "b")]);

    assert_eq!(core.state(), PipelineState::Watching);
    assert_eq!(states(&step), vec![PipelineState::Watching]);
    assert_eq!(step.jobs().count(), 0);
    assert!(event_types(&step).is_empty());
    assert_eq!(core.registry().len(), 2);
}

#[test]
fn compile_on_start_queues_the_initial_scan() {
    let mut core = core_with(&[Target::Three], true);
    let step = started(&mut core, &[("/p/a.wc", "a"), ("/p/b.wc", "b")]);

    let job = single_job(&step);
    assert_eq!(job.path, Path::new("/p/a.wc"));
    assert_eq!(core.queue().len(), 1);
    assert_eq!(core.state(), PipelineState::Compiling);
}

#[test]
fn changed_content_emits_event_and_compiles_every_target() {
    let mut core = core_with(&[Target::Three, Target::Pixi], false);
    started(&mut core, &[("/p/a.wc", "v1")]);

    let step = core.step(CoreEvent::SourceLoaded(src("/p/a.wc", "v2")));

    assert_eq!(event_types(&step), vec!["file-changed", "compilation-started"]);
    assert_eq!(states(&step), vec![PipelineState::Compiling]);
    let job = single_job(&step);
    let targets: Vec<_> = job.requests.iter().map(|r| r.target()).collect();
    assert_eq!(targets, vec![Target::Three, Target::Pixi]);
    assert!(job.requests.iter().all(|r| r.source_code() == "v2"));
    assert_eq!(job.requests[0].filename(), "/p/a.wc");
}

#[test]
fn identical_content_is_suppressed() {
    let mut core = core();
    started(&mut core, &[("/p/a.wc", "same")]);

    let step = core.step(CoreEvent::SourceLoaded(src("/p/a.wc", "same")));

    assert!(step.is_empty());
    assert_eq!(core.state(), PipelineState::Watching);
}

#[test]
fn success_passes_through_reloading_back_to_watching() {
    let mut core = core_with(&[Target::Three, Target::Pixi], false);
    started(&mut core, &[("/p/a.wc", "v1")]);
    let job = single_job(&core.step(CoreEvent::SourceLoaded(src("/p/a.wc", "v2"))));

    let step = finish(&mut core, &job, vec![ok(Target::Three), ok(Target::Pixi)]);

    assert_eq!(
        event_types(&step),
        vec![
            "compilation-complete",
            "compilation-complete",
            "reload-triggered",
            "reload-triggered"
        ]
    );
    assert_eq!(
        states(&step),
        vec![PipelineState::Reloading, PipelineState::Watching]
    );
    assert!(core.result_for(Path::new("/p/a.wc"), Target::Pixi).is_some());
    assert!(!core.queue().is_in_flight());
}

#[test]
fn failure_ends_in_error_and_recovers_on_next_success() {
    let mut core = core();
    started(&mut core, &[("/p/a.wc", "v1")]);
    let job = single_job(&core.step(CoreEvent::SourceLoaded(src("/p/a.wc", "broken"))));

    let step = finish(&mut core, &job, vec![failed(Target::Three)]);
    assert_eq!(
        event_types(&step),
        vec!["compilation-complete", "compilation-error"]
    );
    assert_eq!(core.state(), PipelineState::Error);

    let job = single_job(&core.step(CoreEvent::SourceLoaded(src("/p/a.wc", "fixed"))));
    finish(&mut core, &job, vec![ok(Target::Three)]);
    assert_eq!(core.state(), PipelineState::Watching);
}

#[test]
fn compilation_error_event_carries_first_message() {
    let mut core = core();
    started(&mut core, &[("/p/a.wc", "v1")]);
    let job = single_job(&core.step(CoreEvent::SourceLoaded(src("/p/a.wc", "v2"))));

    let step = finish(&mut core, &job, vec![failed(Target::Three)]);
    let err = step
        .events()
        .find(|e| e.type_name() == "compilation-error")
        .unwrap();

    let json = serde_json::to_value(err).unwrap();
    assert_eq!(json["type"], "compilation-error");
    assert_eq!(json["error"], "Unexpected token");
    assert_eq!(json["filename"], "/p/a.wc");
    assert_eq!(json["result"]["success"], false);
    assert!(json["timestamp"].as_u64().unwrap() > 0);
}

#[test]
fn only_one_compile_is_in_flight() {
    let mut core = core();
    started(&mut core, &[("/p/a.wc", "a"), ("/p/b.wc", "b"), ("/p/c.wc", "c")]);

    let first = single_job(&core.step(CoreEvent::SourceLoaded(src("/p/a.wc", "a2"))));
    let s2 = core.step(CoreEvent::SourceLoaded(src("/p/b.wc", "b2")));
    let s3 = core.step(CoreEvent::SourceLoaded(src("/p/c.wc", "c2")));
    assert_eq!(s2.jobs().count() + s3.jobs().count(), 0);
    assert_eq!(core.queue().len(), 2);

    let next = single_job(&finish(&mut core, &first, vec![ok(Target::Three)]));
    assert_eq!(next.path, Path::new("/p/b.wc"));
    let last = single_job(&finish(&mut core, &next, vec![ok(Target::Three)]));
    assert_eq!(last.path, Path::new("/p/c.wc"));
    let done = finish(&mut core, &last, vec![ok(Target::Three)]);
    assert_eq!(done.jobs().count(), 0);
    assert_eq!(core.state(), PipelineState::Watching);
}

#[test]
fn change_during_flight_compiles_again_with_latest_content() {
    let mut core = core();
    started(&mut core, &[("/p/a.wc", "v1")]);
    let job = single_job(&core.step(CoreEvent::SourceLoaded(src("/p/a.wc", "v2"))));

    core.step(CoreEvent::SourceLoaded(src("/p/a.wc", "v3")));
    let next = single_job(&finish(&mut core, &job, vec![ok(Target::Three)]));

    assert_eq!(next.path, Path::new("/p/a.wc"));
    assert_eq!(next.requests[0].source_code(), "v3");
}

#[test]
fn debounce_timers_live_in_the_core() {
    let mut core = core();
    started(&mut core, &[("/p/a.wc", "v1")]);
    let t0 = Instant::now();

    core.step(CoreEvent::FileTouched { path: "/p/a.wc".into(), now: t0 });
    core.step(CoreEvent::FileTouched {
        path: "/p/a.wc".into(),
        now: t0 + Duration::from_millis(100),
    });

    assert_eq!(core.next_debounce_deadline(), Some(t0 + Duration::from_millis(400)));
    assert!(core.take_ready_debounces(t0 + DEBOUNCE).is_empty());
    assert_eq!(
        core.take_ready_debounces(t0 + Duration::from_millis(400)),
        vec![PathBuf::from("/p/a.wc")]
    );
}

#[test]
fn removal_cancels_timer_and_queued_compile() {
    let mut core = core();
    started(&mut core, &[("/p/a.wc", "a"), ("/p/b.wc", "b")]);
    let t0 = Instant::now();
    let job = single_job(&core.step(CoreEvent::SourceLoaded(src("/p/a.wc", "a2"))));
    core.step(CoreEvent::SourceLoaded(src("/p/b.wc", "b2")));
    core.step(CoreEvent::FileTouched { path: "/p/b.wc".into(), now: t0 });

    core.step(CoreEvent::FileRemoved { path: "/p/b.wc".into() });

    assert!(core.take_ready_debounces(t0 + DEBOUNCE * 2).is_empty());
    assert!(!core.queue().contains(Path::new("/p/b.wc")));
    assert!(core.registry().get(Path::new("/p/b.wc")).is_none());
    let after = finish(&mut core, &job, vec![ok(Target::Three)]);
    assert_eq!(after.jobs().count(), 0);
}

#[test]
fn results_for_a_path_removed_mid_flight_are_dropped() {
    let mut core = core();
    started(&mut core, &[("/p/a.wc", "a")]);
    let job = single_job(&core.step(CoreEvent::SourceLoaded(src("/p/a.wc", "a2"))));

    core.step(CoreEvent::FileRemoved { path: "/p/a.wc".into() });
    let step = finish(&mut core, &job, vec![ok(Target::Three)]);

    assert!(event_types(&step).is_empty());
    assert_eq!(core.state(), PipelineState::Watching);
    assert!(!core.queue().is_in_flight());
}

#[test]
fn removed_then_readded_mid_flight_still_drops_stale_results() {
    let mut core = core();
    started(&mut core, &[("/p/a.wc", "a")]);
    let job = single_job(&core.step(CoreEvent::SourceLoaded(src("/p/a.wc", "old"))));

    core.step(CoreEvent::FileRemoved { path: "/p/a.wc".into() });
    core.step(CoreEvent::SourceLoaded(src("/p/a.wc", "new")));
    let step = finish(&mut core, &job, vec![ok(Target::Three)]);

    assert!(!event_types(&step).contains(&"reload-triggered"));
    let next = single_job(&step);
    assert_eq!(next.requests[0].source_code(), "new");
}

#[test]
fn force_recompile_queues_every_file_regardless_of_content() {
    let mut core = core();
    started(&mut core, &[("/p/a.wc", "a"), ("/p/b.wc", "b")]);

    let (count, step) = core.force_recompile().unwrap();

    assert_eq!(count, 2);
    let job = single_job(&step);
    assert_eq!(job.requests[0].source_code(), "a");
    let next = single_job(&finish(&mut core, &job, vec![ok(Target::Three)]));
    assert_eq!(next.path, Path::new("/p/b.wc"));
}

#[test]
fn force_recompile_outside_watching_is_rejected() {
    let mut core = core();
    assert!(matches!(
        core.force_recompile(),
        Err(HotCompileError::InvalidState { state: PipelineState::Idle, .. })
    ));

    started(&mut core, &[("/p/a.wc", "a")]);
    core.step(CoreEvent::SourceLoaded(src("/p/a.wc", "b")));
    assert!(matches!(
        core.force_recompile(),
        Err(HotCompileError::InvalidState { state: PipelineState::Compiling, .. })
    ));
}

#[test]
fn stop_returns_to_idle_and_discards_stale_results() {
    let mut core = core();
    started(&mut core, &[("/p/a.wc", "a")]);
    let job = single_job(&core.step(CoreEvent::SourceLoaded(src("/p/a.wc", "a2"))));
    core.step(CoreEvent::FileTouched { path: "/p/a.wc".into(), now: Instant::now() });

    let step = core.step(CoreEvent::Stopped);

    assert_eq!(states(&step), vec![PipelineState::Idle]);
    assert_eq!(core.next_debounce_deadline(), None);
    assert!(!core.queue().is_in_flight());
    assert!(finish(&mut core, &job, vec![ok(Target::Three)]).is_empty());
    assert!(core.step(CoreEvent::SourceLoaded(src("/p/a.wc", "a3"))).is_empty());
}

#[test]
fn watch_failure_is_sticky_until_restart() {
    let mut core = core();
    started(&mut core, &[("/p/a.wc", "a"), ("/p/b.wc", "b")]);
    let job = single_job(&core.step(CoreEvent::SourceLoaded(src("/p/a.wc", "a2"))));
    core.step(CoreEvent::SourceLoaded(src("/p/b.wc", "b2")));

    let step = core.step(CoreEvent::WatchFailed { reason: "overflow".into() });
    assert_eq!(states(&step), vec![PipelineState::Error]);
    assert!(core.queue().is_empty());

    // The in-flight compile may finish, but nothing new starts.
    let after = finish(&mut core, &job, vec![ok(Target::Three)]);
    assert_eq!(after.jobs().count(), 0);
    assert_eq!(core.state(), PipelineState::Error);

    core.step(CoreEvent::FileTouched { path: "/p/a.wc".into(), now: Instant::now() });
    assert_eq!(core.next_debounce_deadline(), None);
    assert!(core.step(CoreEvent::SourceLoaded(src("/p/a.wc", "a3"))).is_empty());

    started(&mut core, &[("/p/a.wc", "a3")]);
    assert_eq!(core.state(), PipelineState::Watching);
}

#[test]
fn discovered_sources_join_the_registry() {
    let mut core = core();
    started(&mut core, &[("/p/a.wc", "a")]);

    let step = core.step(CoreEvent::SourcesDiscovered {
        sources: vec![src("/q/l1.wc", "l1"), src("/p/a.wc", "ignored")],
    });

    assert_eq!(step.jobs().count(), 0);
    assert_eq!(core.registry().len(), 2);
    assert_eq!(core.registry().get(Path::new("/p/a.wc")).unwrap().content(), "a");
}
