// src/lib.rs

pub mod cli;
pub mod compiler;
pub mod config;
pub mod engine;
pub mod errors;
pub mod fs;
pub mod logging;
pub mod registry;
pub mod types;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::compiler::{
    CompilationRequest, CompilationResult, CompilerAdapter, CompilerSettings, ProcessInvoker,
};
use crate::config::{load_and_validate, ConfigFile};
use crate::engine::{HotReloadContext, HotReloadEvent, HotReloadEventKind};
use crate::fs::{FileSystem, RealFileSystem};
use crate::watch::{collect_matching_files, WatchFilter};

/// High-level entry point used by `main.rs`.
///
/// Returns `Ok(false)` when the requested work ran but reported failures
/// (a failed compile in `--once`, an invalid file in `--validate`).
pub async fn run(args: CliArgs) -> Result<bool> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)
        .with_context(|| format!("loading config {:?}", config_path))?;

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(true);
    }

    if let Some(file) = args.validate.as_deref() {
        return validate_file(&cfg, file).await;
    }

    if args.once {
        let adapter = CompilerAdapter::new(
            CompilerSettings::from_config(&cfg),
            Arc::new(ProcessInvoker),
        );
        adapter.check_version().await?;
        let results = compile_once(&cfg, &RealFileSystem, &adapter).await?;
        let mut ok = true;
        for (path, result) in results {
            ok &= result.success;
            print_event(&HotReloadEvent::now(HotReloadEventKind::CompilationComplete {
                filename: path,
                result,
            }))?;
        }
        return Ok(ok);
    }

    watch_until_interrupted(cfg).await?;
    Ok(true)
}

/// Compile every source file under the configured watch paths once, for
/// every configured target.
///
/// Unreadable files are logged and skipped.
pub async fn compile_once(
    cfg: &ConfigFile,
    fs: &dyn FileSystem,
    adapter: &CompilerAdapter,
) -> Result<Vec<(PathBuf, CompilationResult)>> {
    let filter = WatchFilter::from_config(cfg)?;
    let options = cfg.compile_options();

    let mut files = Vec::new();
    for root in &cfg.watch.paths {
        if !fs.exists(root) {
            anyhow::bail!("watch path {:?} does not exist", root);
        }
        files.extend(collect_matching_files(fs, root, &filter)?);
    }
    files.sort();
    files.dedup();
    info!(files = files.len(), "compiling sources once");

    let mut results = Vec::new();
    for path in files {
        let source = match fs.read_to_string(&path) {
            Ok(s) => s,
            Err(err) => {
                warn!(path = ?path, error = %err, "failed to read source; skipping");
                continue;
            }
        };
        let source: Arc<str> = source.into();
        let filename = path.to_string_lossy().into_owned();
        for &target in cfg.targets() {
            let request =
                CompilationRequest::new(Arc::clone(&source), filename.clone(), target, Some(options));
            results.push((path.clone(), adapter.compile(&request).await));
        }
    }
    Ok(results)
}

async fn validate_file(cfg: &ConfigFile, file: &Path) -> Result<bool> {
    let source = RealFileSystem.read_to_string(file)?;
    let adapter = CompilerAdapter::new(
        CompilerSettings::from_config(cfg),
        Arc::new(ProcessInvoker),
    );
    let result = adapter
        .validate(&source, &file.to_string_lossy())
        .await;
    println!("{}", serde_json::to_string(&result)?);
    Ok(result.valid)
}

/// Run the pipeline, printing every event as one JSON line on stdout until
/// Ctrl-C.
async fn watch_until_interrupted(cfg: ConfigFile) -> Result<()> {
    let handle = HotReloadContext::native(cfg)?.spawn()?;
    let mut events = handle.subscribe();
    let mut states = handle.state_changes();

    handle.start_watching().await?;
    info!("watching for changes; press Ctrl-C to stop");

    loop {
        tokio::select! {
            received = events.recv() => match received {
                Ok(event) => print_event(&event)?,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "event consumer fell behind; events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = *states.borrow_and_update();
                info!(%state, "pipeline state");
            }
            res = tokio::signal::ctrl_c() => {
                if let Err(e) = res {
                    warn!(error = %e, "failed to listen for Ctrl-C");
                }
                break;
            }
        }
    }

    handle.shutdown().await?;
    Ok(())
}

fn print_event(event: &HotReloadEvent) -> Result<()> {
    println!("{}", serde_json::to_string(event)?);
    Ok(())
}

/// Simple dry-run output: print the effective settings.
fn print_dry_run(cfg: &ConfigFile) {
    println!("hotcompile dry-run");
    println!("  watch.paths = {:?}", cfg.watch.paths);
    if !cfg.watch.ignore.is_empty() {
        println!("  watch.ignore = {:?}", cfg.watch.ignore);
    }
    println!("  watch.extensions = {:?}", cfg.watch.extensions);
    println!("  watch.debounce_ms = {}", cfg.watch.debounce_ms);
    println!("  watch.compile_on_start = {}", cfg.watch.compile_on_start);
    println!();

    let opts = cfg.compile_options();
    println!("compiler:");
    println!("  binary: {:?}", cfg.compiler.binary);
    if let Some(ref dir) = cfg.compiler.work_dir {
        println!("  work_dir: {:?}", dir);
    }
    let targets: Vec<_> = cfg.targets().iter().map(|t| t.as_str()).collect();
    println!("  targets: {}", targets.join(", "));
    println!("  optimization: {}", opts.optimization_level.as_str());
    println!("  format: {}", opts.output_format.as_str());
    println!(
        "  minify: {}  source_maps: {}  declarations: {}  strict: {}",
        opts.minify, opts.source_maps, opts.type_declarations, opts.strict_mode
    );
    println!(
        "  timeouts: compile {:?}, validate {:?}",
        cfg.compile_timeout(),
        cfg.validate_timeout()
    );

    debug!("dry-run complete (no execution)");
}
