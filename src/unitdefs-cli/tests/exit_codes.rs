//! Exit status and output behaviour of the unitdefs-reshaper binary

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

fn reshaper(input: &Path, output: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_unitdefs-reshaper"))
        .arg("--unitdefs-dir")
        .arg(input)
        .arg("--output-file")
        .arg(output)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to spawn unitdefs-reshaper")
}

#[test]
fn test_success_writes_document() {
    let input = tempfile::tempdir().unwrap();
    let out_dir = tempfile::tempdir().unwrap();
    let output = out_dir.path().join("unitdefs.json");
    fs::write(input.path().join("tank.json"), r#"{"name": "tank", "builds": ["factory"]}"#).unwrap();
    fs::write(input.path().join("factory.json"), r#"{"name": "factory", "builds": ["tank"]}"#).unwrap();

    let result = reshaper(input.path(), &output);
    assert!(result.status.success(), "{}", String::from_utf8_lossy(&result.stderr));

    let doc: serde_json::Value = serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(doc["tank"]["builds"][0], "factory");
}

#[test]
fn test_dangling_reference_exits_non_zero() {
    let input = tempfile::tempdir().unwrap();
    let out_dir = tempfile::tempdir().unwrap();
    let output = out_dir.path().join("unitdefs.json");
    fs::write(input.path().join("tank.json"), r#"{"name": "tank", "builds": ["factory"]}"#).unwrap();

    let result = reshaper(input.path(), &output);
    assert!(!result.status.success());
    let stderr = String::from_utf8_lossy(&result.stderr);
    assert!(stderr.contains("DanglingReferenceError"), "{stderr}");
    assert!(stderr.contains("factory"), "{stderr}");
    assert!(!output.exists());
}

#[test]
fn test_empty_directory_exits_non_zero() {
    let input = tempfile::tempdir().unwrap();
    let out_dir = tempfile::tempdir().unwrap();
    let output = out_dir.path().join("unitdefs.json");

    let result = reshaper(input.path(), &output);
    assert_eq!(result.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&result.stderr).contains("EmptyInputError"));
    assert!(!output.exists());
}
