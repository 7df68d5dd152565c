// src/compiler/types.rs

//! Data exchanged with the compiler adapter.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::{OptimizationLevel, OutputFormat, Severity, Target};

/// Code-generation switches forwarded to the compiler command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileOptions {
    pub optimization_level: OptimizationLevel,
    pub output_format: OutputFormat,
    pub minify: bool,
    pub source_maps: bool,
    pub type_declarations: bool,
    pub strict_mode: bool,
}

/// One compile of one source for one target.
///
/// Immutable once built; the source text is shared so that fanning a single
/// change out to several targets does not copy it.
#[derive(Debug, Clone, PartialEq)]
pub struct CompilationRequest {
    source_code: Arc<str>,
    filename: String,
    target: Target,
    options: Option<CompileOptions>,
}

impl CompilationRequest {
    pub fn new(
        source_code: impl Into<Arc<str>>,
        filename: impl Into<String>,
        target: Target,
        options: Option<CompileOptions>,
    ) -> Self {
        Self {
            source_code: source_code.into(),
            filename: filename.into(),
            target,
            options,
        }
    }

    pub fn source_code(&self) -> &str {
        &self.source_code
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn target(&self) -> Target {
        self.target
    }

    pub fn options(&self) -> Option<&CompileOptions> {
        self.options.as_ref()
    }
}

/// A structured compiler message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl Diagnostic {
    /// Location-less error carrying `message` verbatim.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
            filename: None,
            line: None,
            column: None,
            code: None,
        }
    }
}

/// Phase timings in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompilationTiming {
    pub lexing_time: f64,
    pub parsing_time: f64,
    pub code_generation_time: f64,
    pub total_time: f64,
}

impl CompilationTiming {
    pub fn total_only(elapsed: Duration) -> Self {
        Self {
            total_time: elapsed.as_secs_f64() * 1000.0,
            ..Self::default()
        }
    }
}

/// Outcome of one [`CompilationRequest`].
///
/// `success` is always `diagnostics.is_empty()`: only error-severity
/// diagnostics land in `diagnostics`, everything else in `warnings`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompilationResult {
    pub success: bool,
    pub target: Target,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_files: Option<Vec<String>>,
    pub diagnostics: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
    pub timing: CompilationTiming,
}

impl CompilationResult {
    /// Failing result for a compile that never produced compiler output
    /// (spawn failure, timeout, temp-file error).
    pub fn failed(target: Target, message: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            success: false,
            target,
            output_code: None,
            output_files: None,
            diagnostics: vec![Diagnostic::error(message)],
            warnings: Vec::new(),
            timing: CompilationTiming::total_only(elapsed),
        }
    }
}

/// Outcome of a validate-only run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub diagnostics: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
}
