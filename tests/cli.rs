use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use objectify::{load_schema, read_json_file, Error};
use tempfile::TempDir;

const SCHEMA: &str = r#"
    record test { c: string }
    record nested { a: int, b: test }
    type names = set<string>
"#;

fn write(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("write");
    path
}

fn objectify(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_objectify"))
        .args(args)
        .output()
        .expect("run objectify")
}

#[test]
fn schema_and_json_load_from_files() {
    let dir = TempDir::new().expect("tempdir");
    let schema_path = write(dir.path(), "app.schema", SCHEMA);
    let input_path = write(dir.path(), "input.json", r#"{"a": 1, "b": {"c": "xyz"}}"#);

    let schema = load_schema(&schema_path).expect("schema");
    assert!(schema.is_record("nested"));
    assert!(schema.is_alias("names"));

    let value = read_json_file(&input_path).expect("json");
    assert_eq!(value["b"]["c"], "xyz");
}

#[test]
fn missing_files_are_io_errors() {
    let dir = TempDir::new().expect("tempdir");
    let err = load_schema(&dir.path().join("absent.schema")).expect_err("missing");
    assert!(matches!(err, Error::Io(_)));
}

#[test]
fn convert_prints_the_instance() {
    let dir = TempDir::new().expect("tempdir");
    let schema_path = write(dir.path(), "app.schema", SCHEMA);
    let input_path = write(dir.path(), "input.json", r#"{"a": 1, "b": {"c": "xyz"}, "unused": 0}"#);

    let output = objectify(&[
        "convert",
        "--schema",
        schema_path.to_str().expect("utf-8 path"),
        "--type",
        "nested",
        input_path.to_str().expect("utf-8 path"),
    ]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let printed: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json output");
    assert_eq!(printed, serde_json::json!({"a": 1, "b": {"c": "xyz"}}));
}

#[test]
fn check_reports_each_input() {
    let dir = TempDir::new().expect("tempdir");
    let schema_path = write(dir.path(), "app.schema", SCHEMA);
    let good = write(dir.path(), "good.json", r#"["a", "b", "a"]"#);
    let bad = write(dir.path(), "bad.json", r#"["a", 1]"#);

    let output = objectify(&[
        "check",
        "--schema",
        schema_path.to_str().expect("utf-8 path"),
        "--type",
        "names",
        good.to_str().expect("utf-8 path"),
        bad.to_str().expect("utf-8 path"),
    ]);
    assert!(!output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("good.json: ok"), "stdout: {stdout}");
    assert!(stdout.contains("bad.json: conversion failed"), "stdout: {stdout}");
    assert!(stdout.contains("(at $[1])"), "stdout: {stdout}");
}

#[test]
fn inspect_lists_definitions_as_json() {
    let dir = TempDir::new().expect("tempdir");
    let schema_path = write(dir.path(), "app.schema", SCHEMA);

    let output = objectify(&[
        "inspect",
        "--schema",
        schema_path.to_str().expect("utf-8 path"),
        "--hashes",
        "--json",
    ]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json output");
    let records = report["records"].as_array().expect("records");
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["name"], "nested");
    assert_eq!(records[0]["fields"][1]["type"], "test");
    assert_eq!(records[0]["hash"].as_str().map(str::len), Some(64));
    assert_eq!(report["aliases"][0]["target"], "set<string>");
}

#[test]
fn max_depth_bounds_conversion() {
    let dir = TempDir::new().expect("tempdir");
    let schema_path = write(dir.path(), "deep.schema", "type grid = list<list<list<int>>>");
    let input_path = write(dir.path(), "grid.json", "[[[1, 2]], [[3]]]");
    let schema = schema_path.to_str().expect("utf-8 path");
    let input = input_path.to_str().expect("utf-8 path");

    let output = objectify(&["convert", "-s", schema, "-t", "grid", "--max-depth", "2", input]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("depth limit of 2"), "stderr: {stderr}");
    assert!(stderr.contains("(at $[0][0][0])"), "stderr: {stderr}");

    let output = objectify(&["convert", "-s", schema, "-t", "grid", "--max-depth", "3", input]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let printed: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json output");
    assert_eq!(printed, serde_json::json!([[[1, 2]], [[3]]]));

    let output = objectify(&["check", "-s", schema, "-t", "grid", "--max-depth", "2", input]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("grid.json: conversion failed"));
}
