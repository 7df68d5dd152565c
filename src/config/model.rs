// src/config/model.rs

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::compiler::CompileOptions;
use crate::types::{OptimizationLevel, OutputFormat, Target};

/// Raw configuration as read from a TOML file.
///
/// ```toml
/// [watch]
/// paths = ["scripts"]
/// ignore = ["**/node_modules/**"]
/// debounce_ms = 300
///
/// [compiler]
/// binary = "wcc"
/// targets = ["threejs", "pixijs"]
/// source_maps = true
/// ```
///
/// All sections are optional and have reasonable defaults, but the result
/// must pass validation before it becomes a [`ConfigFile`].
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub watch: WatchSection,

    #[serde(default)]
    pub compiler: CompilerSection,
}

/// `[watch]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchSection {
    /// Directories or single files to observe.
    #[serde(default)]
    pub paths: Vec<PathBuf>,

    /// Glob patterns (relative to the watch root) that are never reported.
    #[serde(default)]
    pub ignore: Vec<String>,

    /// Source-file extensions, without the leading dot.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Quiet period before a burst of changes turns into one compile.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Compile every file found by the initial scan right after startup.
    #[serde(default)]
    pub compile_on_start: bool,
}

fn default_extensions() -> Vec<String> {
    vec!["wc".to_string()]
}

fn default_debounce_ms() -> u64 {
    300
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            paths: Vec::new(),
            ignore: Vec::new(),
            extensions: default_extensions(),
            debounce_ms: default_debounce_ms(),
            compile_on_start: false,
        }
    }
}

/// `[compiler]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct CompilerSection {
    /// External compiler program (resolved through `PATH` if relative).
    #[serde(default = "default_binary")]
    pub binary: PathBuf,

    /// Directory for temporary source files. Defaults to the OS temp dir.
    #[serde(default)]
    pub work_dir: Option<PathBuf>,

    /// Every path is compiled once per listed target.
    #[serde(default = "default_targets")]
    pub targets: Vec<Target>,

    #[serde(default)]
    pub optimization: OptimizationLevel,

    #[serde(default)]
    pub format: OutputFormat,

    #[serde(default)]
    pub minify: bool,

    #[serde(default)]
    pub source_maps: bool,

    #[serde(default)]
    pub declarations: bool,

    #[serde(default)]
    pub strict: bool,

    #[serde(default = "default_compile_timeout_secs")]
    pub compile_timeout_secs: u64,

    #[serde(default = "default_validate_timeout_secs")]
    pub validate_timeout_secs: u64,
}

fn default_binary() -> PathBuf {
    PathBuf::from("wcc")
}

fn default_targets() -> Vec<Target> {
    vec![Target::Three]
}

fn default_compile_timeout_secs() -> u64 {
    30
}

fn default_validate_timeout_secs() -> u64 {
    10
}

impl Default for CompilerSection {
    fn default() -> Self {
        Self {
            binary: default_binary(),
            work_dir: None,
            targets: default_targets(),
            optimization: OptimizationLevel::default(),
            format: OutputFormat::default(),
            minify: false,
            source_maps: false,
            declarations: false,
            strict: false,
            compile_timeout_secs: default_compile_timeout_secs(),
            validate_timeout_secs: default_validate_timeout_secs(),
        }
    }
}

/// Validated configuration.
///
/// Only constructible through `TryFrom<RawConfigFile>` (see `validate.rs`),
/// so holders can rely on non-empty targets, extensions and watch paths.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub watch: WatchSection,
    pub compiler: CompilerSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(watch: WatchSection, compiler: CompilerSection) -> Self {
        Self { watch, compiler }
    }

    pub fn debounce_delay(&self) -> Duration {
        Duration::from_millis(self.watch.debounce_ms)
    }

    pub fn compile_timeout(&self) -> Duration {
        Duration::from_secs(self.compiler.compile_timeout_secs)
    }

    pub fn validate_timeout(&self) -> Duration {
        Duration::from_secs(self.compiler.validate_timeout_secs)
    }

    pub fn targets(&self) -> &[Target] {
        &self.compiler.targets
    }

    /// Options attached to every compilation request built from this config.
    pub fn compile_options(&self) -> CompileOptions {
        CompileOptions {
            optimization_level: self.compiler.optimization,
            output_format: self.compiler.format,
            minify: self.compiler.minify,
            source_maps: self.compiler.source_maps,
            type_declarations: self.compiler.declarations,
            strict_mode: self.compiler.strict,
        }
    }

    /// Make relative watch paths and the work dir relative to `root`
    /// (normally the directory holding the config file).
    ///
    /// A bare compiler name like `wcc` is left alone so it resolves via
    /// `PATH`; anything with a directory component is anchored to `root`.
    pub fn resolve_relative_to(mut self, root: &Path) -> Self {
        for p in self.watch.paths.iter_mut() {
            if p.is_relative() {
                *p = root.join(&*p);
            }
        }
        if let Some(dir) = self.compiler.work_dir.as_mut() {
            if dir.is_relative() {
                *dir = root.join(&*dir);
            }
        }
        let bin = &self.compiler.binary;
        if bin.is_relative() && bin.components().count() > 1 {
            self.compiler.binary = root.join(bin);
        }
        self
    }
}
