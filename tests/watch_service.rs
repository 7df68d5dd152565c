// tests/watch_service.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use hotcompile::errors::HotCompileError;
use hotcompile::fs::mock::MockFileSystem;
use hotcompile::watch::{RawFsEvent, WatchEvent, WatchFilter, WatchService};
use hotcompile_test_utils::manual_watch::{manual_watch, ManualWatchControl};

fn filter() -> WatchFilter {
    WatchFilter::new(&["wc".to_string()], &["**/generated/**".to_string()]).unwrap()
}

fn service(fs: &MockFileSystem) -> (WatchService, ManualWatchControl) {
    let (source, control, _rx) = manual_watch();
    (
        WatchService::new(Arc::new(fs.clone()), Box::new(source)),
        control,
    )
}

fn p(s: &str) -> PathBuf {
    PathBuf::from(s)
}

#[test]
fn start_reports_existing_sources_and_watches_roots() {
    let fs = MockFileSystem::new();
    fs.add_file("/proj/scripts/a.wc", "a");
    fs.add_file("/proj/scripts/lib/b.wc", "b");
    fs.add_file("/proj/scripts/generated/c.wc", "c");
    fs.add_file("/proj/scripts/readme.md", "");
    let (mut svc, control) = service(&fs);

    let initial = svc.start(&[p("/proj/scripts")], filter()).unwrap();

    assert_eq!(
        initial,
        vec![
            WatchEvent::Added(p("/proj/scripts/a.wc")),
            WatchEvent::Added(p("/proj/scripts/lib/b.wc")),
        ]
    );
    assert!(svc.is_active());
    assert_eq!(control.watched(), vec![p("/proj/scripts")]);
}

#[test]
fn missing_root_is_config_error_and_nothing_stays_watched() {
    let fs = MockFileSystem::new();
    fs.add_file("/proj/scripts/a.wc", "a");
    let (mut svc, control) = service(&fs);

    let err = svc
        .start(&[p("/proj/scripts"), p("/proj/missing")], filter())
        .unwrap_err();

    assert!(matches!(err, HotCompileError::ConfigError(_)));
    assert!(!svc.is_active());
    assert!(control.watched().is_empty());
}

#[test]
fn backend_refusal_is_watch_error() {
    let fs = MockFileSystem::new();
    fs.add_file("/proj/scripts/a.wc", "a");
    let (mut svc, control) = service(&fs);
    control.refuse_watch(true);

    let err = svc.start(&[p("/proj/scripts")], filter()).unwrap_err();

    assert!(matches!(err, HotCompileError::Watch(_)));
    assert!(!svc.is_active());
}

#[test]
fn touched_files_classify_as_added_then_changed() {
    let fs = MockFileSystem::new();
    fs.add_file("/proj/scripts/a.wc", "a");
    let (mut svc, _control) = service(&fs);
    svc.start(&[p("/proj/scripts")], filter()).unwrap();

    fs.add_file("/proj/scripts/new.wc", "n");
    let events = svc
        .translate(RawFsEvent::Touched(vec![
            p("/proj/scripts/a.wc"),
            p("/proj/scripts/new.wc"),
            p("/proj/scripts/skip.txt"),
        ]))
        .unwrap();

    assert_eq!(
        events,
        vec![
            WatchEvent::Changed(p("/proj/scripts/a.wc")),
            WatchEvent::Added(p("/proj/scripts/new.wc")),
        ]
    );

    let again = svc
        .translate(RawFsEvent::Touched(vec![p("/proj/scripts/new.wc")]))
        .unwrap();
    assert_eq!(again, vec![WatchEvent::Changed(p("/proj/scripts/new.wc"))]);
}

#[test]
fn ignored_paths_are_never_reported() {
    let fs = MockFileSystem::new();
    fs.add_file("/proj/scripts/a.wc", "a");
    let (mut svc, _control) = service(&fs);
    svc.start(&[p("/proj/scripts")], filter()).unwrap();

    fs.add_file("/proj/scripts/x/generated/out.wc", "");
    let events = svc
        .translate(RawFsEvent::Touched(vec![p("/proj/scripts/x/generated/out.wc")]))
        .unwrap();

    assert!(events.is_empty());
}

#[test]
fn vanished_paths_are_removed_including_directories() {
    let fs = MockFileSystem::new();
    fs.add_file("/proj/scripts/a.wc", "a");
    fs.add_file("/proj/scripts/lvl/one.wc", "1");
    fs.add_file("/proj/scripts/lvl/two.wc", "2");
    let (mut svc, _control) = service(&fs);
    svc.start(&[p("/proj/scripts")], filter()).unwrap();

    fs.remove_file("/proj/scripts/a.wc");
    let events = svc
        .translate(RawFsEvent::Removed(vec![p("/proj/scripts/a.wc")]))
        .unwrap();
    assert_eq!(events, vec![WatchEvent::Removed(p("/proj/scripts/a.wc"))]);

    fs.remove_file("/proj/scripts/lvl/one.wc");
    fs.remove_file("/proj/scripts/lvl/two.wc");
    fs.remove_file("/proj/scripts/lvl");
    let events = svc
        .translate(RawFsEvent::Removed(vec![p("/proj/scripts/lvl")]))
        .unwrap();
    assert_eq!(
        events,
        vec![
            WatchEvent::Removed(p("/proj/scripts/lvl/one.wc")),
            WatchEvent::Removed(p("/proj/scripts/lvl/two.wc")),
        ]
    );
}

#[test]
fn new_directory_reports_its_sources() {
    let fs = MockFileSystem::new();
    fs.add_file("/proj/scripts/a.wc", "a");
    let (mut svc, _control) = service(&fs);
    svc.start(&[p("/proj/scripts")], filter()).unwrap();

    fs.add_file("/proj/scripts/boss/phase1.wc", "");
    fs.add_file("/proj/scripts/boss/phase2.wc", "");
    let events = svc
        .translate(RawFsEvent::Touched(vec![p("/proj/scripts/boss")]))
        .unwrap();

    assert_eq!(
        events,
        vec![
            WatchEvent::Added(p("/proj/scripts/boss/phase1.wc")),
            WatchEvent::Added(p("/proj/scripts/boss/phase2.wc")),
        ]
    );
}

#[test]
fn backend_failure_surfaces_as_err() {
    let fs = MockFileSystem::new();
    fs.add_file("/proj/scripts/a.wc", "a");
    let (mut svc, _control) = service(&fs);
    svc.start(&[p("/proj/scripts")], filter()).unwrap();

    let res = svc.translate(RawFsEvent::Failed("inotify queue overflow".into()));

    assert_eq!(res, Err("inotify queue overflow".to_string()));
}

#[test]
fn add_and_remove_roots_at_runtime() {
    let fs = MockFileSystem::new();
    fs.add_file("/proj/scripts/a.wc", "a");
    fs.add_file("/proj/levels/l1.wc", "1");
    let (mut svc, control) = service(&fs);
    svc.start(&[p("/proj/scripts")], filter()).unwrap();

    let added = svc.add_path(Path::new("/proj/levels")).unwrap();
    assert_eq!(added, vec![WatchEvent::Added(p("/proj/levels/l1.wc"))]);
    assert_eq!(control.watched().len(), 2);
    assert!(svc.add_path(Path::new("/proj/levels")).unwrap().is_empty());
    assert!(matches!(
        svc.add_path(Path::new("/proj/nope")),
        Err(HotCompileError::ConfigError(_))
    ));

    let removed = svc.remove_path(Path::new("/proj/levels"));
    assert_eq!(removed, vec![WatchEvent::Removed(p("/proj/levels/l1.wc"))]);
    assert_eq!(control.watched(), vec![p("/proj/scripts")]);
    assert_eq!(svc.roots(), &[p("/proj/scripts")]);
}

#[test]
fn stopped_service_ignores_notifications() {
    let fs = MockFileSystem::new();
    fs.add_file("/proj/scripts/a.wc", "a");
    let (mut svc, control) = service(&fs);
    svc.start(&[p("/proj/scripts")], filter()).unwrap();

    svc.stop();

    assert!(control.watched().is_empty());
    assert_eq!(
        svc.translate(RawFsEvent::Touched(vec![p("/proj/scripts/a.wc")])),
        Ok(vec![])
    );
    assert!(svc.add_path(Path::new("/proj/scripts")).is_err());
}

#[test]
fn roots_are_keyed_by_their_resolved_spelling() {
    let fs = MockFileSystem::new();
    fs.add_file("/proj/scripts/a.wc", "a");
    fs.add_file("/proj/scripts/lvl/b.wc", "b");
    let (mut svc, control) = service(&fs);

    let initial = svc
        .start(
            &[p("/proj/scripts/./"), p("/proj/levels/../scripts")],
            filter(),
        )
        .unwrap();

    assert_eq!(svc.roots(), &[p("/proj/scripts")]);
    assert_eq!(control.watched(), vec![p("/proj/scripts")]);
    assert_eq!(initial.len(), 2);

    let edit = svc
        .translate(RawFsEvent::Touched(vec![p("/proj/scripts/a.wc")]))
        .unwrap();
    assert_eq!(edit, vec![WatchEvent::Changed(p("/proj/scripts/a.wc"))]);

    assert!(svc.add_path(Path::new("/proj/scripts/lvl/..")).unwrap().is_empty());
    assert_eq!(svc.roots().len(), 1);

    let removed = svc.remove_path(Path::new("/proj/./scripts/"));
    assert_eq!(
        removed,
        vec![
            WatchEvent::Removed(p("/proj/scripts/a.wc")),
            WatchEvent::Removed(p("/proj/scripts/lvl/b.wc")),
        ]
    );
    assert!(control.watched().is_empty());
}
