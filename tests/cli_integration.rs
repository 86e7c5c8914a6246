//! CLI integration tests
//!
//! These run the built binary and only cover paths that never reach a
//! provider: help, the criteria table, and input rejection with exit codes.

use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;

fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_proposal-analyzer"))
        .args(args)
        .env_remove("RUST_LOG")
        .env("PROPOSAL_LOG_LEVEL", "error")
        .output()
        .expect("Failed to execute proposal-analyzer")
}

fn write_documents(dir: &TempDir, kp: &str) -> (PathBuf, PathBuf) {
    let tz = dir.path().join("tz.txt");
    let kp_path = dir.path().join("kp.txt");
    fs::write(&tz, "Веб-приложение, бюджет 1 000 000 руб., срок 3 месяца").unwrap();
    fs::write(&kp_path, kp).unwrap();
    (tz, kp_path)
}

#[test]
fn test_cli_help() {
    let output = run(&["--help"]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("analyze"));
    assert!(stdout.contains("criteria"));
}

#[test]
fn test_cli_version() {
    let output = run(&["--version"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_criteria_json() {
    let output = run(&["criteria", "--format", "json"]);
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let criteria = value["criteria"].as_array().unwrap();
    assert_eq!(criteria.len(), 10);
    assert_eq!(criteria[0]["key"], "budget_compliance");

    let sum: f64 = criteria.iter().map(|c| c["weight"].as_f64().unwrap()).sum();
    assert!((sum - 1.0).abs() < 1e-6);
}

#[test]
fn test_criteria_with_bad_weights_exits_with_2() {
    let output = run(&["criteria", "--weights", r#"{"budget_compliance": 0.2}"#]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_analyze_missing_file_exits_with_2() {
    let output = run(&["analyze", "--tz", "/nonexistent/tz.txt", "--kp", "/nonexistent/kp.txt"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("/nonexistent/tz.txt"));
}

#[test]
fn test_analyze_rejects_weights_above_one() {
    let dir = TempDir::new().unwrap();
    let (tz, kp) = write_documents(&dir, "Стоимость 1 200 000 руб., срок 4 месяца");

    let output = run(&[
        "analyze",
        "--tz",
        tz.to_str().unwrap(),
        "--kp",
        kp.to_str().unwrap(),
        "--weights",
        r#"{"budget_compliance": 0.2}"#,
        "--format",
        "json",
    ]);

    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("VALIDATION_ERROR"));
}

#[test]
fn test_analyze_rejects_blank_proposal() {
    let dir = TempDir::new().unwrap();
    let (tz, kp) = write_documents(&dir, "   \n");

    let output = run(&[
        "analyze",
        "--tz",
        tz.to_str().unwrap(),
        "--kp",
        kp.to_str().unwrap(),
    ]);

    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_invalid_subcommand() {
    let output = run(&["score-everything"]);
    assert!(!output.status.success());
}
