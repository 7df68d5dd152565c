// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `hotcompile`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "hotcompile",
    version,
    about = "Keep compiled script artifacts in sync with their sources and signal hot reloads.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `HotCompile.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "HotCompile.toml")]
    pub config: String,

    /// Compile every watched source once for every target, then exit.
    #[arg(long, conflicts_with = "validate")]
    pub once: bool,

    /// Syntax-check a single file with the compiler's validate mode, then exit.
    #[arg(long, value_name = "FILE")]
    pub validate: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `HOTCOMPILE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate the config, print the effective settings, run nothing.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
