// src/compiler/adapter.rs

//! Out-of-process compiler adapter.
//!
//! Each request goes through the same pipeline:
//! 1. write the source to a fresh temp file in the work dir
//! 2. run the compiler with flags derived from the request
//! 3. parse stdout (payload or raw code) and stderr (diagnostics)
//! 4. delete the temp file, whatever happened in between
//!
//! Requests are serviced strictly one at a time in arrival order; callers
//! that arrive while the adapter is busy wait their turn.

use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use anyhow::{Context, Result as AnyResult};
use tempfile::TempPath;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::compiler::diagnostics::{parse_diagnostics, partition};
use crate::compiler::invoker::{ExternalToolInvoker, ToolInvocation, ToolOutput};
use crate::compiler::output::parse_stdout;
use crate::compiler::types::{
    CompilationRequest, CompilationResult, CompilationTiming, Diagnostic, ValidationResult,
};
use crate::config::ConfigFile;
use crate::errors::{HotCompileError, Result};

const DEFAULT_EXTENSION: &str = "wc";

/// Static settings for a [`CompilerAdapter`].
#[derive(Debug, Clone)]
pub struct CompilerSettings {
    pub binary: PathBuf,
    pub work_dir: PathBuf,
    pub compile_timeout: Duration,
    pub validate_timeout: Duration,
}

impl CompilerSettings {
    pub fn from_config(cfg: &ConfigFile) -> Self {
        Self {
            binary: cfg.compiler.binary.clone(),
            work_dir: cfg
                .compiler
                .work_dir
                .clone()
                .unwrap_or_else(std::env::temp_dir),
            compile_timeout: cfg.compile_timeout(),
            validate_timeout: cfg.validate_timeout(),
        }
    }
}

/// Drives the external compiler for compile and validate requests.
pub struct CompilerAdapter {
    settings: CompilerSettings,
    invoker: Arc<dyn ExternalToolInvoker>,
    /// FIFO turn-taking: tokio's mutex wakes waiters in arrival order.
    turn: Mutex<()>,
    waiting: AtomicUsize,
}

impl std::fmt::Debug for CompilerAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompilerAdapter")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl CompilerAdapter {
    pub fn new(settings: CompilerSettings, invoker: Arc<dyn ExternalToolInvoker>) -> Self {
        Self {
            settings,
            invoker,
            turn: Mutex::new(()),
            waiting: AtomicUsize::new(0),
        }
    }

    pub fn settings(&self) -> &CompilerSettings {
        &self.settings
    }

    /// Number of callers currently waiting for the adapter.
    pub fn queued_requests(&self) -> usize {
        self.waiting.load(Ordering::SeqCst)
    }

    /// Run `--version` once to fail fast when the toolchain is missing.
    pub async fn check_version(&self) -> Result<String> {
        let _turn = self.acquire_turn().await;
        let invocation = ToolInvocation {
            program: self.settings.binary.clone(),
            args: vec![OsString::from("--version")],
            timeout: self.settings.validate_timeout,
        };

        let missing = |reason: String| HotCompileError::ToolchainMissing {
            binary: self.settings.binary.clone(),
            reason,
        };

        let output = self
            .invoker
            .invoke(&invocation)
            .await
            .map_err(|e| missing(e.to_string()))?;

        if !output.success() {
            return Err(missing(format!(
                "`--version` exited with {:?}: {}",
                output.exit_code,
                output.stderr.trim()
            )));
        }

        let version = output.stdout.trim().to_string();
        info!(binary = ?self.settings.binary, %version, "compiler toolchain available");
        Ok(version)
    }

    /// Compile one request. Never fails: problems become diagnostics.
    pub async fn compile(&self, request: &CompilationRequest) -> CompilationResult {
        let _turn = self.acquire_turn().await;
        let started = Instant::now();

        debug!(
            file = %request.filename(),
            target = %request.target(),
            "compiling"
        );

        match self.compile_inner(request, started).await {
            Ok(result) => {
                info!(
                    file = %request.filename(),
                    target = %request.target(),
                    success = result.success,
                    errors = result.diagnostics.len(),
                    warnings = result.warnings.len(),
                    total_ms = result.timing.total_time,
                    "compilation finished"
                );
                result
            }
            Err(err) => {
                warn!(
                    file = %request.filename(),
                    target = %request.target(),
                    error = %format!("{err:#}"),
                    "compilation could not run"
                );
                CompilationResult::failed(request.target(), format!("{err:#}"), started.elapsed())
            }
        }
    }

    /// Syntax-check `source_code` without generating output.
    pub async fn validate(&self, source_code: &str, filename: &str) -> ValidationResult {
        let _turn = self.acquire_turn().await;

        match self.validate_inner(source_code, filename).await {
            Ok(result) => result,
            Err(err) => {
                warn!(file = %filename, error = %format!("{err:#}"), "validation could not run");
                ValidationResult {
                    valid: false,
                    diagnostics: vec![Diagnostic::error(format!("{err:#}"))],
                    warnings: Vec::new(),
                }
            }
        }
    }

    async fn acquire_turn(&self) -> MutexGuard<'_, ()> {
        self.waiting.fetch_add(1, Ordering::SeqCst);
        let guard = self.turn.lock().await;
        self.waiting.fetch_sub(1, Ordering::SeqCst);
        guard
    }

    async fn compile_inner(
        &self,
        request: &CompilationRequest,
        started: Instant,
    ) -> AnyResult<CompilationResult> {
        let temp = self.write_temp_source(request.filename(), request.source_code())?;
        let invocation = ToolInvocation {
            program: self.settings.binary.clone(),
            args: compile_args(request, &temp),
            timeout: self.settings.compile_timeout,
        };

        let outcome = self.invoker.invoke(&invocation).await;
        let temp_display = temp.to_path_buf();
        cleanup_temp(temp);
        let output = outcome?;

        Ok(build_compile_result(
            request,
            &temp_display,
            output,
            started.elapsed(),
        ))
    }

    async fn validate_inner(&self, source_code: &str, filename: &str) -> AnyResult<ValidationResult> {
        let temp = self.write_temp_source(filename, source_code)?;
        let invocation = ToolInvocation {
            program: self.settings.binary.clone(),
            args: vec![OsString::from("validate"), temp.as_os_str().to_os_string()],
            timeout: self.settings.validate_timeout,
        };

        let outcome = self.invoker.invoke(&invocation).await;
        let temp_display = temp.to_path_buf();
        cleanup_temp(temp);
        let output = outcome?;

        let mut diags = parse_diagnostics(&output.stderr);
        remap_filenames(&mut diags, &temp_display, filename);
        let (mut errors, warnings) = partition(diags);
        push_exit_status_error(&mut errors, &output);

        Ok(ValidationResult {
            valid: errors.is_empty(),
            diagnostics: errors,
            warnings,
        })
    }

    fn write_temp_source(&self, filename: &str, source: &str) -> AnyResult<TempPath> {
        let dir = &self.settings.work_dir;
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating compiler work dir {:?}", dir))?;

        let path = Path::new(filename);
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or(DEFAULT_EXTENSION);
        let stem: String = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("source")
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();

        let mut file = tempfile::Builder::new()
            .prefix(&format!("hotcompile-{stem}-"))
            .suffix(&format!(".{ext}"))
            .tempfile_in(dir)
            .with_context(|| format!("creating temp file in {:?}", dir))?;

        file.write_all(source.as_bytes())
            .context("writing source to temp file")?;
        file.flush().context("flushing temp file")?;

        Ok(file.into_temp_path())
    }
}

/// Command line for a compile request, after the program name.
pub fn compile_args(request: &CompilationRequest, source_path: &Path) -> Vec<OsString> {
    let opts = request.options().copied().unwrap_or_default();

    let mut args: Vec<OsString> = vec![
        "compile".into(),
        source_path.as_os_str().to_os_string(),
        "--target".into(),
        request.target().as_str().into(),
        "--optimization".into(),
        opts.optimization_level.as_str().into(),
        "--format".into(),
        opts.output_format.as_str().into(),
    ];

    if opts.minify {
        args.push("--minify".into());
    }
    if opts.source_maps {
        args.push("--source-maps".into());
    }
    if opts.type_declarations {
        args.push("--declarations".into());
    }
    if opts.strict_mode {
        args.push("--strict".into());
    }

    args
}

fn build_compile_result(
    request: &CompilationRequest,
    temp_path: &Path,
    output: ToolOutput,
    elapsed: Duration,
) -> CompilationResult {
    let stdout = parse_stdout(&output.stdout);

    let mut diags = parse_diagnostics(&output.stderr);
    remap_filenames(&mut diags, temp_path, request.filename());
    let (mut errors, warnings) = partition(diags);
    push_exit_status_error(&mut errors, &output);

    let mut timing = stdout
        .timing
        .unwrap_or_else(|| CompilationTiming::total_only(elapsed));
    if timing.total_time <= 0.0 {
        timing.total_time = elapsed.as_secs_f64() * 1000.0;
    }

    CompilationResult {
        success: errors.is_empty(),
        target: request.target(),
        output_code: stdout.code,
        output_files: stdout.files,
        diagnostics: errors,
        warnings,
        timing,
    }
}

/// A failed exit with no error lines on stderr still fails the compile.
fn push_exit_status_error(errors: &mut Vec<Diagnostic>, output: &ToolOutput) {
    if output.success() || !errors.is_empty() {
        return;
    }
    let message = match output.exit_code {
        Some(code) => format!("compiler exited with status {code}"),
        None => "compiler was terminated by a signal".to_string(),
    };
    errors.push(Diagnostic::error(message));
}

/// Point diagnostics that name the temp file back at the real source.
fn remap_filenames(diags: &mut [Diagnostic], temp_path: &Path, original: &str) {
    let full = temp_path.to_string_lossy();
    let short = temp_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    for d in diags.iter_mut() {
        if let Some(name) = d.filename.as_deref() {
            if name == full || (!short.is_empty() && name == short) {
                d.filename = Some(original.to_string());
            }
        }
    }
}

fn cleanup_temp(temp: TempPath) {
    let path = temp.to_path_buf();
    if let Err(err) = temp.close() {
        debug!(path = ?path, error = %err, "failed to remove temp file; ignoring");
    }
}
