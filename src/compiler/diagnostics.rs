// src/compiler/diagnostics.rs

//! Parsing of the compiler's free-form stderr into [`Diagnostic`]s.
//!
//! One diagnostic per line:
//!
//! ```text
//! [severity[code]: ]message[ at file:line:col]
//! ```
//!
//! Severity is case-insensitive and defaults to `error`. Lines that cannot be
//! parsed never fail; they become generic errors carrying the raw line.

use std::sync::OnceLock;

use regex::Regex;

use crate::compiler::types::Diagnostic;
use crate::types::Severity;

const DIAGNOSTIC_PATTERN: &str = r"^\s*(?:(?i:(error|warning|info))(?:\[([^\]]+)\])?\s*:\s*)?(.*?)(?:\s+at\s+(.+?):(\d+):(\d+))?\s*$";

fn diagnostic_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(DIAGNOSTIC_PATTERN).ok()).as_ref()
}

/// Parse a single stderr line.
pub fn parse_diagnostic_line(line: &str) -> Diagnostic {
    let Some(caps) = diagnostic_regex().and_then(|re| re.captures(line)) else {
        return Diagnostic::error(line.trim());
    };

    let severity = caps
        .get(1)
        .and_then(|m| m.as_str().parse::<Severity>().ok())
        .unwrap_or(Severity::Error);
    let code = caps.get(2).map(|m| m.as_str().to_string());
    let message = caps.get(3).map(|m| m.as_str()).unwrap_or_default();

    let location = match (caps.get(4), caps.get(5), caps.get(6)) {
        (Some(file), Some(line), Some(col)) => {
            match (line.as_str().parse::<u32>(), col.as_str().parse::<u32>()) {
                (Ok(l), Ok(c)) => Some((file.as_str().to_string(), l, c)),
                _ => None,
            }
        }
        _ => None,
    };

    match location {
        Some((filename, line_no, col)) => Diagnostic {
            severity,
            message: message.to_string(),
            filename: Some(filename),
            line: Some(line_no),
            column: Some(col),
            code,
        },
        // Numbers too large for u32: keep the whole tail in the message.
        None if caps.get(4).is_some() => Diagnostic {
            severity,
            message: caps
                .get(0)
                .map(|m| m.as_str().trim())
                .unwrap_or(line)
                .to_string(),
            filename: None,
            line: None,
            column: None,
            code,
        },
        None => Diagnostic {
            severity,
            message: message.to_string(),
            filename: None,
            line: None,
            column: None,
            code,
        },
    }
}

/// Parse every non-blank stderr line.
pub fn parse_diagnostics(stderr: &str) -> Vec<Diagnostic> {
    stderr
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(parse_diagnostic_line)
        .collect()
}

/// Split diagnostics into `(errors, warnings)`.
///
/// `info` messages are non-fatal and travel with the warnings.
pub fn partition(diagnostics: Vec<Diagnostic>) -> (Vec<Diagnostic>, Vec<Diagnostic>) {
    diagnostics
        .into_iter()
        .partition(|d| d.severity == Severity::Error)
}
