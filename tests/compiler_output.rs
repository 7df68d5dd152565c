// tests/compiler_output.rs

use hotcompile::compiler::output::parse_stdout;

#[test]
fn structured_payload_is_extracted() {
    let stdout = r#"{"code":"export const x = 1;","files":["out/a.js","out/a.d.ts"],"timing":{"lexingTime":1.5,"parsingTime":2.0,"codeGenerationTime":3.25,"totalTime":7.0}}"#;
    let out = parse_stdout(stdout);

    assert_eq!(out.code.as_deref(), Some("export const x = 1;"));
    assert_eq!(
        out.files,
        Some(vec!["out/a.js".to_string(), "out/a.d.ts".to_string()])
    );
    let timing = out.timing.expect("timing present");
    assert_eq!(timing.lexing_time, 1.5);
    assert_eq!(timing.code_generation_time, 3.25);
    assert_eq!(timing.total_time, 7.0);
}

#[test]
fn partial_timing_fills_missing_phases_with_zero() {
    let out = parse_stdout(r#"{"code":"x","timing":{"totalTime":4}}"#);

    let timing = out.timing.expect("timing present");
    assert_eq!(timing.total_time, 4.0);
    assert_eq!(timing.parsing_time, 0.0);
}

#[test]
fn raw_stdout_is_taken_as_code() {
    let js = "const a = 1;\nexport default a;\n";
    let out = parse_stdout(js);

    assert_eq!(out.code.as_deref(), Some(js));
    assert_eq!(out.files, None);
    assert_eq!(out.timing, None);
}

#[test]
fn json_without_known_keys_is_raw_code() {
    let text = r#"{"unrelated": true}"#;
    let out = parse_stdout(text);

    assert_eq!(out.code.as_deref(), Some(text));
}

#[test]
fn malformed_json_is_raw_code() {
    let text = "{ not json";
    assert_eq!(parse_stdout(text).code.as_deref(), Some(text));
}

#[test]
fn empty_stdout_has_no_code() {
    assert_eq!(parse_stdout("  \n").code, None);
}
