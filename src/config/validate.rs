use globset::Glob;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{HotCompileError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = HotCompileError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.watch, raw.compiler))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_watch_section(cfg)?;
    validate_ignore_patterns(cfg)?;
    validate_compiler_section(cfg)?;
    Ok(())
}

fn validate_watch_section(cfg: &RawConfigFile) -> Result<()> {
    if cfg.watch.paths.is_empty() {
        return Err(HotCompileError::ConfigError(
            "[watch].paths must list at least one directory or file".to_string(),
        ));
    }

    if cfg.watch.extensions.is_empty() {
        return Err(HotCompileError::ConfigError(
            "[watch].extensions must list at least one source extension".to_string(),
        ));
    }

    for ext in cfg.watch.extensions.iter() {
        if ext.trim().is_empty() {
            return Err(HotCompileError::ConfigError(
                "[watch].extensions contains an empty entry".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_ignore_patterns(cfg: &RawConfigFile) -> Result<()> {
    for pat in cfg.watch.ignore.iter() {
        if let Err(err) = Glob::new(pat) {
            return Err(HotCompileError::ConfigError(format!(
                "[watch].ignore has invalid glob pattern '{pat}': {err}"
            )));
        }
    }
    Ok(())
}

fn validate_compiler_section(cfg: &RawConfigFile) -> Result<()> {
    if cfg.compiler.binary.as_os_str().is_empty() {
        return Err(HotCompileError::ConfigError(
            "[compiler].binary must not be empty".to_string(),
        ));
    }

    if cfg.compiler.targets.is_empty() {
        return Err(HotCompileError::ConfigError(
            "[compiler].targets must list at least one target".to_string(),
        ));
    }

    if cfg.compiler.compile_timeout_secs == 0 {
        return Err(HotCompileError::ConfigError(
            "[compiler].compile_timeout_secs must be >= 1 (got 0)".to_string(),
        ));
    }

    if cfg.compiler.validate_timeout_secs == 0 {
        return Err(HotCompileError::ConfigError(
            "[compiler].validate_timeout_secs must be >= 1 (got 0)".to_string(),
        ));
    }

    Ok(())
}
