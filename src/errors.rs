// src/errors.rs

//! Crate-wide error aliases and helpers.
//!
//! Only configuration-class failures cross the subsystem boundary as errors.
//! Watch failures, process failures and unparseable compiler output are
//! represented as pipeline state and `CompilationResult` data instead.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::PipelineState;

#[derive(Error, Debug)]
pub enum HotCompileError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Compiler toolchain not available ({binary}): {reason}")]
    ToolchainMissing { binary: PathBuf, reason: String },

    #[error("Watch error: {0}")]
    Watch(String),

    #[error("Operation '{operation}' is not valid in state {state}")]
    InvalidState {
        operation: &'static str,
        state: PipelineState,
    },

    #[error("hot-reload runtime is no longer running")]
    ChannelClosed,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, HotCompileError>;
