//! CLI integration tests
//!
//! These tests run the stress-writer binary end to end and check its exit
//! status, row output and JSON report.

use std::process::{Command, Output};
use tempfile::TempDir;

/// Execute the stress-writer CLI and return the output
fn execute_stress_writer(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_stress-writer"))
        .args(args)
        .env("RUST_LOG", "loadtest_framework=debug")
        .output()
        .expect("failed to run stress-writer")
}

/// Verify CLI command succeeded
fn assert_cli_success(output: &Output, command_desc: &str) {
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);
        panic!(
            "{} failed!\nExit code: {:?}\nStdout: {}\nStderr: {}",
            command_desc,
            output.status.code(),
            stdout,
            stderr
        );
    }
}

#[test]
fn test_write_command_outputs_rows_and_report() {
    let dir = TempDir::new().unwrap();
    let rows = dir.path().join("rows.jsonl");
    let report = dir.path().join("report.json");

    let output = execute_stress_writer(&[
        "write",
        "--total",
        "90",
        "--producers",
        "3",
        "--batch-size",
        "10",
        "--output",
        rows.to_str().unwrap(),
        "--report",
        report.to_str().unwrap(),
    ]);
    assert_cli_success(&output, "stress-writer write");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("PASSED"), "{stdout}");

    let content = std::fs::read_to_string(&rows).unwrap();
    assert_eq!(content.lines().count(), 90);

    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&report).unwrap()).unwrap();
    assert_eq!(report["status"], "passed");
    assert_eq!(report["config_summary"]["command"], "write");
    assert_eq!(report["metrics"]["units_succeeded"], 9);
    assert_eq!(report["sink"]["rows_persisted"], 90);
}

#[test]
fn test_mixed_command_reads_config_file() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("stress.yaml");
    let report = dir.path().join("report.json");
    std::fs::write(
        &config,
        r#"
total: 40
producers: 2
batch_size: 30
ratios:
  read: 1
  write: 3
clustering: "fixed(2)"
backoff:
  strategy: constant
  base: 10ms
"#,
    )
    .unwrap();

    let output = execute_stress_writer(&[
        "mixed",
        "--config",
        config.to_str().unwrap(),
        "--dry-run",
        "--report",
        report.to_str().unwrap(),
    ]);
    assert_cli_success(&output, "stress-writer mixed");

    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&report).unwrap()).unwrap();
    assert_eq!(report["config_summary"]["total"], 40);
    assert_eq!(report["config_summary"]["ratios"]["write"], 3.0);
    assert_eq!(report["metrics"]["rows_written"], 40);
}

#[test]
fn test_invalid_backoff_fails_before_running() {
    let output = execute_stress_writer(&["write", "--dry-run", "--backoff", "fibonacci"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("fibonacci"), "{stderr}");
}

#[test]
fn test_empty_ratio_table_fails() {
    let output = execute_stress_writer(&[
        "mixed",
        "--dry-run",
        "--ratio",
        "read=none",
        "--ratio",
        "write=0",
    ]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("non-zero ratio"), "{stderr}");
}

#[test]
fn test_direct_sink_writes_every_row() {
    let dir = TempDir::new().unwrap();
    let rows = dir.path().join("rows.jsonl");
    let report = dir.path().join("report.json");

    let output = execute_stress_writer(&[
        "write",
        "--sink",
        "direct",
        "--total",
        "50",
        "--producers",
        "2",
        "--output",
        rows.to_str().unwrap(),
        "--report",
        report.to_str().unwrap(),
    ]);
    assert_cli_success(&output, "stress-writer write --sink direct");

    let content = std::fs::read_to_string(&rows).unwrap();
    assert_eq!(content.lines().count(), 50);

    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&report).unwrap()).unwrap();
    assert_eq!(report["status"], "passed");
    assert_eq!(report["config_summary"]["sink"], "direct");
    assert_eq!(report["sink"]["rows_persisted"], 50);
}
