// tests/config_loading.rs

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use tempfile::NamedTempFile;

use hotcompile::config::{load_and_validate, ConfigFile};
use hotcompile::errors::HotCompileError;
use hotcompile::types::{OptimizationLevel, OutputFormat, Target};
use hotcompile_test_utils::builders::ConfigBuilder;

fn write_config(body: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{body}").unwrap();
    file
}

fn expect_config_error(body: &str, needle: &str) {
    let file = write_config(body);
    match load_and_validate(file.path()) {
        Err(HotCompileError::ConfigError(msg)) => {
            assert!(msg.contains(needle), "message {msg:?} should mention {needle:?}");
        }
        Err(e) => panic!("Expected ConfigError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn full_config_round_trips_into_settings() {
    let file = write_config(
        r#"
[watch]
paths = ["scripts", "/abs/levels"]
ignore = ["**/generated/**"]
extensions = ["wc", "wcs"]
debounce_ms = 150
compile_on_start = true

[compiler]
binary = "tools/wcc"
work_dir = ".hotcompile"
targets = ["threejs", "pixijs"]
optimization = "aggressive"
format = "iife"
minify = true
source_maps = true
declarations = true
strict = true
compile_timeout_secs = 5
validate_timeout_secs = 2
"#,
    );
    let root = file.path().parent().unwrap().to_path_buf();

    let cfg = load_and_validate(file.path()).unwrap();

    assert_eq!(
        cfg.watch.paths,
        vec![root.join("scripts"), PathBuf::from("/abs/levels")]
    );
    assert_eq!(cfg.compiler.binary, root.join("tools/wcc"));
    assert_eq!(cfg.compiler.work_dir, Some(root.join(".hotcompile")));
    assert_eq!(cfg.debounce_delay(), Duration::from_millis(150));
    assert_eq!(cfg.compile_timeout(), Duration::from_secs(5));
    assert_eq!(cfg.validate_timeout(), Duration::from_secs(2));
    assert_eq!(cfg.targets(), &[Target::Three, Target::Pixi]);
    assert!(cfg.watch.compile_on_start);

    let opts = cfg.compile_options();
    assert_eq!(opts.optimization_level, OptimizationLevel::Aggressive);
    assert_eq!(opts.output_format, OutputFormat::Iife);
    assert!(opts.minify && opts.source_maps && opts.type_declarations && opts.strict_mode);
}

#[test]
fn minimal_config_uses_defaults() {
    let file = write_config(
        r#"
[watch]
paths = ["scripts"]
"#,
    );

    let cfg = load_and_validate(file.path()).unwrap();

    assert_eq!(cfg.debounce_delay(), Duration::from_millis(300));
    assert_eq!(cfg.compile_timeout(), Duration::from_secs(30));
    assert_eq!(cfg.validate_timeout(), Duration::from_secs(10));
    assert_eq!(cfg.watch.extensions, vec!["wc".to_string()]);
    assert_eq!(cfg.compiler.binary, PathBuf::from("wcc"), "bare binary resolves via PATH");
    assert_eq!(cfg.compiler.work_dir, None);
    assert_eq!(cfg.targets(), &[Target::Three]);
    assert_eq!(cfg.compile_options().output_format, OutputFormat::Esm);
    assert!(!cfg.compile_options().source_maps);
}

#[test]
fn missing_watch_paths_is_config_error() {
    expect_config_error("[compiler]\nbinary = \"wcc\"\n", "paths");
}

#[test]
fn empty_targets_is_config_error() {
    expect_config_error(
        "[watch]\npaths = [\"s\"]\n[compiler]\ntargets = []\n",
        "targets",
    );
}

#[test]
fn blank_extension_is_config_error() {
    expect_config_error(
        "[watch]\npaths = [\"s\"]\nextensions = [\"wc\", \"  \"]\n",
        "extensions",
    );
}

#[test]
fn bad_glob_is_config_error() {
    expect_config_error(
        "[watch]\npaths = [\"s\"]\nignore = [\"a/**/[\"]\n",
        "invalid glob",
    );
}

#[test]
fn zero_timeout_is_config_error() {
    expect_config_error(
        "[watch]\npaths = [\"s\"]\n[compiler]\ncompile_timeout_secs = 0\n",
        "compile_timeout_secs",
    );
}

#[test]
fn unknown_target_is_toml_error() {
    let file = write_config("[watch]\npaths = [\"s\"]\n[compiler]\ntargets = [\"webgpu\"]\n");

    assert!(matches!(
        load_and_validate(file.path()),
        Err(HotCompileError::TomlError(_))
    ));
}

#[test]
fn missing_file_is_io_error() {
    assert!(matches!(
        load_and_validate("/definitely/not/here/HotCompile.toml"),
        Err(HotCompileError::IoError(_))
    ));
}

#[test]
fn builder_output_validates_like_a_file() {
    let raw = ConfigBuilder::new().build_raw();
    assert!(ConfigFile::try_from(raw).is_err(), "no watch paths");

    let cfg = ConfigBuilder::new()
        .watch_path("/proj/scripts")
        .targets(&[Target::Both])
        .build();
    assert_eq!(cfg.targets(), &[Target::Both]);
}
