// src/engine/events.rs

//! Lifecycle events published to external listeners (editor UI, engine
//! runtime). Purely informational; the pipeline never reads them back.

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::compiler::CompilationResult;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HotReloadEvent {
    #[serde(flatten)]
    pub kind: HotReloadEventKind,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum HotReloadEventKind {
    FileChanged {
        filename: PathBuf,
    },
    CompilationStarted {
        #[serde(skip_serializing_if = "Option::is_none")]
        filename: Option<PathBuf>,
    },
    CompilationComplete {
        filename: PathBuf,
        result: CompilationResult,
    },
    CompilationError {
        filename: PathBuf,
        result: CompilationResult,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    ReloadTriggered {
        filename: PathBuf,
        result: CompilationResult,
    },
}

impl HotReloadEvent {
    pub fn now(kind: HotReloadEventKind) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        Self { kind, timestamp }
    }

    /// Wire name of the event type, e.g. `"file-changed"`.
    pub fn type_name(&self) -> &'static str {
        match self.kind {
            HotReloadEventKind::FileChanged { .. } => "file-changed",
            HotReloadEventKind::CompilationStarted { .. } => "compilation-started",
            HotReloadEventKind::CompilationComplete { .. } => "compilation-complete",
            HotReloadEventKind::CompilationError { .. } => "compilation-error",
            HotReloadEventKind::ReloadTriggered { .. } => "reload-triggered",
        }
    }

    pub fn filename(&self) -> Option<&PathBuf> {
        match &self.kind {
            HotReloadEventKind::FileChanged { filename }
            | HotReloadEventKind::CompilationComplete { filename, .. }
            | HotReloadEventKind::CompilationError { filename, .. }
            | HotReloadEventKind::ReloadTriggered { filename, .. } => Some(filename),
            HotReloadEventKind::CompilationStarted { filename } => filename.as_ref(),
        }
    }

    pub fn result(&self) -> Option<&CompilationResult> {
        match &self.kind {
            HotReloadEventKind::CompilationComplete { result, .. }
            | HotReloadEventKind::CompilationError { result, .. }
            | HotReloadEventKind::ReloadTriggered { result, .. } => Some(result),
            _ => None,
        }
    }
}
