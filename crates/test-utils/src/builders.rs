#![allow(dead_code)]

use std::path::PathBuf;

use hotcompile::config::{ConfigFile, RawConfigFile};
use hotcompile::types::{OptimizationLevel, OutputFormat, Target};

/// Builder for `ConfigFile` to simplify test setup.
///
/// Starts from the same defaults a bare `HotCompile.toml` would produce.
pub struct ConfigBuilder {
    config: RawConfigFile,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn watch_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.watch.paths.push(path.into());
        self
    }

    pub fn ignore(mut self, pattern: &str) -> Self {
        self.config.watch.ignore.push(pattern.to_string());
        self
    }

    pub fn extensions(mut self, exts: &[&str]) -> Self {
        self.config.watch.extensions = exts.iter().map(|e| e.to_string()).collect();
        self
    }

    pub fn debounce_ms(mut self, ms: u64) -> Self {
        self.config.watch.debounce_ms = ms;
        self
    }

    pub fn compile_on_start(mut self, val: bool) -> Self {
        self.config.watch.compile_on_start = val;
        self
    }

    pub fn binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.config.compiler.binary = binary.into();
        self
    }

    pub fn work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.compiler.work_dir = Some(dir.into());
        self
    }

    pub fn targets(mut self, targets: &[Target]) -> Self {
        self.config.compiler.targets = targets.to_vec();
        self
    }

    pub fn optimization(mut self, level: OptimizationLevel) -> Self {
        self.config.compiler.optimization = level;
        self
    }

    pub fn format(mut self, format: OutputFormat) -> Self {
        self.config.compiler.format = format;
        self
    }

    pub fn source_maps(mut self, val: bool) -> Self {
        self.config.compiler.source_maps = val;
        self
    }

    pub fn declarations(mut self, val: bool) -> Self {
        self.config.compiler.declarations = val;
        self
    }

    pub fn minify(mut self, val: bool) -> Self {
        self.config.compiler.minify = val;
        self
    }

    pub fn strict(mut self, val: bool) -> Self {
        self.config.compiler.strict = val;
        self
    }

    pub fn compile_timeout_secs(mut self, secs: u64) -> Self {
        self.config.compiler.compile_timeout_secs = secs;
        self
    }

    /// The raw (unvalidated) config, for exercising validation itself.
    pub fn build_raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
