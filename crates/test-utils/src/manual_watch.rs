use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use hotcompile::watch::{FileWatchSource, RawFsEvent};

#[derive(Debug, Default)]
struct State {
    watched: Vec<PathBuf>,
    refuse: bool,
}

/// Watch backend driven entirely by the test through [`ManualWatchControl`].
#[derive(Debug)]
pub struct ManualWatchSource {
    state: Arc<Mutex<State>>,
}

impl FileWatchSource for ManualWatchSource {
    fn watch(&mut self, path: &Path) -> anyhow::Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.refuse {
            anyhow::bail!("watch limit reached for {:?}", path);
        }
        state.watched.push(path.to_path_buf());
        Ok(())
    }

    fn unwatch(&mut self, path: &Path) -> anyhow::Result<()> {
        self.state.lock().unwrap().watched.retain(|p| p != path);
        Ok(())
    }
}

/// Test-side handle: inject notifications and inspect watched roots.
#[derive(Debug, Clone)]
pub struct ManualWatchControl {
    tx: mpsc::UnboundedSender<RawFsEvent>,
    state: Arc<Mutex<State>>,
}

impl ManualWatchControl {
    pub fn touch(&self, path: impl Into<PathBuf>) {
        let _ = self.tx.send(RawFsEvent::Touched(vec![path.into()]));
    }

    pub fn remove(&self, path: impl Into<PathBuf>) {
        let _ = self.tx.send(RawFsEvent::Removed(vec![path.into()]));
    }

    /// Report a backend error.
    pub fn fail(&self, reason: &str) {
        let _ = self.tx.send(RawFsEvent::Failed(reason.to_string()));
    }

    /// Make subsequent `watch` calls fail.
    pub fn refuse_watch(&self, refuse: bool) {
        self.state.lock().unwrap().refuse = refuse;
    }

    pub fn watched(&self) -> Vec<PathBuf> {
        self.state.lock().unwrap().watched.clone()
    }
}

/// Build a manual source, its control handle, and the receiver the
/// pipeline reads raw events from.
pub fn manual_watch() -> (
    ManualWatchSource,
    ManualWatchControl,
    mpsc::UnboundedReceiver<RawFsEvent>,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    let state = Arc::new(Mutex::new(State::default()));
    (
        ManualWatchSource {
            state: Arc::clone(&state),
        },
        ManualWatchControl { tx, state },
        rx,
    )
}
