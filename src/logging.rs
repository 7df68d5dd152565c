// src/logging.rs

//! Logging setup for `hotcompile` using `tracing` + `tracing-subscriber`.
//!
//! The filter comes from, in order:
//! 1. `--log-level` CLI flag (a plain level for every target)
//! 2. `HOTCOMPILE_LOG`, in `EnvFilter` directive syntax, e.g.
//!    `"warn,hotcompile::engine=debug"`
//! 3. `info`
//!
//! Logs go to STDERR; stdout carries only the event stream consumed by the
//! editor.

use anyhow::Result;
use tracing_subscriber::{fmt, EnvFilter};

use crate::cli::LogLevel;

const ENV_VAR: &str = "HOTCOMPILE_LOG";
const DEFAULT_DIRECTIVES: &str = "info";

/// Install the global subscriber. Call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let env_value = std::env::var(ENV_VAR).ok();
    let directives = filter_directives(cli_level, env_value.as_deref());

    fmt()
        .with_env_filter(EnvFilter::new(&directives))
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))?;

    tracing::debug!(%directives, "logging initialised");
    Ok(())
}

/// Filter directives for the given flag and `HOTCOMPILE_LOG` value.
///
/// An empty or unparseable environment value falls back to `info` instead
/// of silencing everything.
pub fn filter_directives(cli_level: Option<LogLevel>, env_value: Option<&str>) -> String {
    if let Some(level) = cli_level {
        return level.as_directive().to_string();
    }
    match env_value.map(str::trim) {
        Some(value) if !value.is_empty() && EnvFilter::try_new(value).is_ok() => value.to_string(),
        _ => DEFAULT_DIRECTIVES.to_string(),
    }
}

impl LogLevel {
    fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}
