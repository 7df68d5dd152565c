use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Code-generation backend the external compiler emits for.
///
/// The engine renders through two sibling viewports, so a script can be
/// compiled for either one or for both in a single invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Target {
    #[serde(rename = "threejs")]
    Three,
    #[serde(rename = "pixijs")]
    Pixi,
    #[serde(rename = "both")]
    Both,
}

impl Target {
    /// Value passed to the compiler's `--target` flag.
    pub fn as_str(self) -> &'static str {
        match self {
            Target::Three => "threejs",
            Target::Pixi => "pixijs",
            Target::Both => "both",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Target {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "threejs" | "three" => Ok(Target::Three),
            "pixijs" | "pixi" => Ok(Target::Pixi),
            "both" => Ok(Target::Both),
            other => Err(format!(
                "invalid compilation target: {other} (expected \"threejs\", \"pixijs\" or \"both\")"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizationLevel {
    None,
    #[default]
    Basic,
    Aggressive,
}

impl OptimizationLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            OptimizationLevel::None => "none",
            OptimizationLevel::Basic => "basic",
            OptimizationLevel::Aggressive => "aggressive",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Esm,
    Cjs,
    Iife,
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Esm => "esm",
            OutputFormat::Cjs => "cjs",
            OutputFormat::Iife => "iife",
        }
    }
}

/// Severity of a single compiler diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "error" => Ok(Severity::Error),
            "warning" | "warn" => Ok(Severity::Warning),
            "info" => Ok(Severity::Info),
            other => Err(format!("invalid diagnostic severity: {other}")),
        }
    }
}

/// Lifecycle state of the hot-reload pipeline.
///
/// `Idle` is the only state before `start_watching` and after
/// `stop_watching`. `Compiling` and `Reloading` are transient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineState {
    #[default]
    Idle,
    Watching,
    Compiling,
    Reloading,
    Error,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PipelineState::Idle => "idle",
            PipelineState::Watching => "watching",
            PipelineState::Compiling => "compiling",
            PipelineState::Reloading => "reloading",
            PipelineState::Error => "error",
        };
        f.write_str(s)
    }
}
