// src/compiler/invoker.rs

//! Pluggable external-tool invocation.
//!
//! The adapter talks to an `ExternalToolInvoker` instead of spawning
//! processes itself. Production code uses [`ProcessInvoker`]; tests can
//! provide an implementation that returns scripted output without running
//! anything.

use std::ffi::OsString;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// A fully-built command line plus the time it is allowed to take.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub timeout: Duration,
}

/// Captured result of a finished process.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("failed to spawn {program:?}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{program:?} timed out after {}s", timeout.as_secs_f64())]
    TimedOut { program: PathBuf, timeout: Duration },

    #[error("I/O error while running external tool: {0}")]
    Io(#[from] std::io::Error),
}

pub type InvokeFuture<'a> =
    Pin<Box<dyn Future<Output = Result<ToolOutput, ToolError>> + Send + 'a>>;

/// Capability to run an external tool and capture its output.
pub trait ExternalToolInvoker: Send + Sync {
    /// Run `invocation`, enforcing `invocation.timeout`.
    fn invoke<'a>(&'a self, invocation: &'a ToolInvocation) -> InvokeFuture<'a>;
}

/// Real invoker backed by `tokio::process::Command`.
///
/// A timed-out child is killed when its future is dropped (`kill_on_drop`).
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessInvoker;

impl ExternalToolInvoker for ProcessInvoker {
    fn invoke<'a>(&'a self, invocation: &'a ToolInvocation) -> InvokeFuture<'a> {
        Box::pin(async move {
            debug!(
                program = ?invocation.program,
                args = ?invocation.args,
                timeout_ms = invocation.timeout.as_millis() as u64,
                "invoking external tool"
            );

            let child = Command::new(&invocation.program)
                .args(&invocation.args)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true)
                .spawn()
                .map_err(|source| ToolError::Spawn {
                    program: invocation.program.clone(),
                    source,
                })?;

            let output = match tokio::time::timeout(invocation.timeout, child.wait_with_output()).await
            {
                Ok(res) => res?,
                Err(_elapsed) => {
                    return Err(ToolError::TimedOut {
                        program: invocation.program.clone(),
                        timeout: invocation.timeout,
                    });
                }
            };

            Ok(ToolOutput {
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                exit_code: output.status.code(),
            })
        })
    }
}
