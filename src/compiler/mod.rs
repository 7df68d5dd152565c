// src/compiler/mod.rs

//! External compiler integration.
//!
//! - [`types`] holds requests, results and diagnostics.
//! - [`invoker`] abstracts process spawning behind `ExternalToolInvoker`.
//! - [`diagnostics`] turns stderr lines into structured diagnostics.
//! - [`output`] interprets stdout.
//! - [`adapter`] ties them together with temp-file handling and FIFO
//!   turn-taking.

pub mod adapter;
pub mod diagnostics;
pub mod invoker;
pub mod output;
pub mod types;

pub use adapter::{compile_args, CompilerAdapter, CompilerSettings};
pub use diagnostics::{parse_diagnostic_line, parse_diagnostics};
pub use invoker::{ExternalToolInvoker, ProcessInvoker, ToolError, ToolInvocation, ToolOutput};
pub use types::{
    CompilationRequest, CompilationResult, CompilationTiming, CompileOptions, Diagnostic,
    ValidationResult,
};
