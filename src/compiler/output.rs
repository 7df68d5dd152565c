// src/compiler/output.rs

//! Interpretation of the compiler's stdout.

use serde::Deserialize;

use crate::compiler::types::CompilationTiming;

/// Structured payload the compiler prints when it supports JSON output.
#[derive(Debug, Deserialize)]
struct CompilerPayload {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    files: Option<Vec<String>>,
    #[serde(default)]
    timing: Option<CompilationTiming>,
}

/// What was extracted from stdout.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompilerStdout {
    pub code: Option<String>,
    pub files: Option<Vec<String>>,
    pub timing: Option<CompilationTiming>,
}

/// Parse stdout as a `{code, files, timing}` payload.
///
/// Anything that is not a JSON object carrying at least one of those keys is
/// taken to be the generated code itself. Empty stdout yields no code.
pub fn parse_stdout(stdout: &str) -> CompilerStdout {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return CompilerStdout::default();
    }

    if trimmed.starts_with('{') {
        if let Ok(payload) = serde_json::from_str::<CompilerPayload>(trimmed) {
            if payload.code.is_some() || payload.files.is_some() || payload.timing.is_some() {
                return CompilerStdout {
                    code: payload.code,
                    files: payload.files,
                    timing: payload.timing,
                };
            }
        }
    }

    CompilerStdout {
        code: Some(stdout.to_string()),
        files: None,
        timing: None,
    }
}
