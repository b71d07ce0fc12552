//! End-to-end tests for the minmax CLI.
//!
//! These run the real `minmax` binary, which spawns real `minmax-worker`
//! processes.

#![allow(deprecated)] // Allow deprecated Command::cargo_bin for tests

use std::fs;

use assert_cmd::Command;
use minmax_core::{MinMax, generate_array};
use predicates::prelude::*;
use tempfile::TempDir;

// =============================================================================
// Test Helpers
// =============================================================================

fn minmax() -> Command {
    let mut cmd = Command::cargo_bin("minmax").expect("Failed to find minmax binary");
    cmd.env("MINMAX_WORKER_PATH", env!("CARGO_BIN_EXE_minmax-worker"));
    cmd.env_remove("RUST_LOG");
    cmd
}

/// Pull `(min, max)` out of the text report.
fn parse_text_report(stdout: &[u8]) -> (i32, i32) {
    let text = String::from_utf8_lossy(stdout);
    let field = |label: &str| -> i32 {
        text.lines()
            .find_map(|line| line.strip_prefix(label))
            .unwrap_or_else(|| panic!("missing {label:?} in output:\n{text}"))
            .trim()
            .parse()
            .expect("value is not an integer")
    };
    (field("Min:"), field("Max:"))
}

fn expected(seed: u32, size: usize) -> (i32, i32) {
    let expected = MinMax::of(&generate_array(seed, size));
    (expected.min, expected.max)
}

// =============================================================================
// run
// =============================================================================

#[test]
fn test_run_pipe_matches_sequential() {
    let output = minmax()
        .args(["run", "--seed", "42", "--array-size", "1000", "--pnum", "5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Elapsed time: "))
        .stdout(predicate::str::contains("ms"))
        .get_output()
        .stdout
        .clone();

    assert_eq!(parse_text_report(&output), expected(42, 1000));
}

#[test]
fn test_run_files_matches_pipe() {
    let results = TempDir::new().expect("Failed to create temp directory");

    let by_pipe = minmax()
        .args(["run", "--seed", "42", "--array-size", "1000", "--pnum", "5"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let by_files = minmax()
        .args(["run", "--seed", "42", "--array-size", "1000", "--pnum", "5", "--by-files"])
        .arg("--results-dir")
        .arg(results.path())
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    assert_eq!(parse_text_report(&by_pipe), parse_text_report(&by_files));

    // No result files or run directories outlive the run.
    let leftovers: Vec<_> = fs::read_dir(results.path()).unwrap().collect();
    assert!(leftovers.is_empty(), "left behind: {leftovers:?}");
}

#[test]
fn test_run_underscore_spellings() {
    let output = minmax()
        .args(["run", "--seed", "7", "--array_size", "64", "--pnum", "3", "--by_files"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    assert_eq!(parse_text_report(&output), expected(7, 64));
}

#[test]
fn test_run_short_file_flag() {
    let output = minmax()
        .args(["run", "-f", "--seed", "9", "--array-size", "50", "--pnum", "2"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    assert_eq!(parse_text_report(&output), expected(9, 50));
}

#[test]
fn test_run_single_worker() {
    let output = minmax()
        .args(["run", "--seed", "3", "--array-size", "10", "--pnum", "1"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    assert_eq!(parse_text_report(&output), expected(3, 10));
}

#[test]
fn test_run_one_element_per_worker() {
    let output = minmax()
        .args(["run", "--seed", "5", "--array-size", "4", "--pnum", "4"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    assert_eq!(parse_text_report(&output), expected(5, 4));
}

#[test]
fn test_run_generous_timeout() {
    let output = minmax()
        .args(["run", "--seed", "11", "--array-size", "200", "--pnum", "4"])
        .args(["--timeout", "10000"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    assert_eq!(parse_text_report(&output), expected(11, 200));
}

#[test]
fn test_run_json_report() {
    let output = minmax()
        .args(["run", "--seed", "42", "--array-size", "100", "--pnum", "4", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let report: serde_json::Value =
        serde_json::from_slice(&output).expect("report is not valid JSON");
    let (min, max) = expected(42, 100);

    assert_eq!(report["min"], min);
    assert_eq!(report["max"], max);
    assert_eq!(report["channel"], "pipe");
    assert_eq!(report["timed_out"], false);
    assert_eq!(report["workers"], 4);
    assert_eq!(report["reported"], 4);
    assert_eq!(report["degraded"], false);
    assert_eq!(report["outcomes"].as_array().map(Vec::len), Some(4));
}

#[test]
fn test_run_timeout_reports_identity() {
    let output = minmax()
        .args(["run", "--seed", "1", "--array-size", "40", "--pnum", "4"])
        .args(["--timeout", "200", "--linger-ms", "300", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let report: serde_json::Value =
        serde_json::from_slice(&output).expect("report is not valid JSON");

    assert_eq!(report["timed_out"], true);
    assert_eq!(report["reported"], 0);
    assert_eq!(report["degraded"], true);
    assert_eq!(report["min"], i32::MAX);
    assert_eq!(report["max"], i32::MIN);
    let elapsed_ms = report["elapsed_ms"].as_f64().unwrap();
    assert!((200.0..280.0).contains(&elapsed_ms), "elapsed {elapsed_ms}ms");
}

#[test]
fn test_run_timeout_text_output_is_clamped() {
    minmax()
        .args(["run", "--seed", "1", "--array-size", "40", "--pnum", "4", "--by-files"])
        .args(["--timeout", "200", "--linger-ms", "300"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Min: 0\n"))
        .stdout(predicate::str::contains("Max: 0\n"));
}

// =============================================================================
// Usage errors
// =============================================================================

#[test]
fn test_run_missing_option() {
    minmax()
        .args(["run", "--seed", "1", "--array-size", "10"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("--pnum"));
}

#[test]
fn test_run_rejects_zero_and_negative() {
    for args in [
        ["--seed", "0", "--array-size", "10", "--pnum", "2"],
        ["--seed", "1", "--array-size", "0", "--pnum", "2"],
        ["--seed", "1", "--array-size", "10", "--pnum", "0"],
        ["--seed", "-4", "--array-size", "10", "--pnum", "2"],
        ["--seed", "1", "--array-size", "ten", "--pnum", "2"],
    ] {
        minmax().arg("run").args(args).assert().code(1);
    }
}

#[test]
fn test_run_more_workers_than_elements() {
    minmax()
        .args(["run", "--seed", "1", "--array-size", "3", "--pnum", "5"])
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("hint:"));
}

#[test]
fn test_unknown_option() {
    minmax()
        .args(["run", "--seed", "1", "--array-size", "3", "--pnum", "1", "--bogus"])
        .assert()
        .code(1);
}

#[test]
fn test_no_subcommand() {
    minmax().assert().code(1);
}

#[test]
fn test_help_succeeds() {
    minmax()
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--pnum"))
        .stdout(predicate::str::contains("--by-files"))
        .stdout(predicate::str::contains("--linger-ms").not());
}

// =============================================================================
// sum
// =============================================================================

#[test]
fn test_sum_matches_sequential() {
    let expected: i64 = generate_array(42, 1000).iter().map(|&v| i64::from(v)).sum();

    minmax()
        .args(["sum", "--threads-num", "4", "--seed", "42", "--array-size", "1000"])
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("Total sum: {expected}\n")))
        .stdout(predicate::str::contains("Threads number: 4"))
        .stdout(predicate::str::contains("Array size: 1000"));
}

#[test]
fn test_sum_json() {
    let output = minmax()
        .args(["sum", "--threads_num", "3", "--seed", "8", "--array_size", "99", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let report: serde_json::Value =
        serde_json::from_slice(&output).expect("report is not valid JSON");
    let expected: i64 = generate_array(8, 99).iter().map(|&v| i64::from(v)).sum();

    assert_eq!(report["total"], expected);
    assert_eq!(report["threads"], 3);
    assert_eq!(report["seed"], 8);
    assert!(report["elapsed_seconds"].is_number());
}

#[test]
fn test_sum_rejects_zero_threads() {
    minmax()
        .args(["sum", "--threads-num", "0", "--seed", "1", "--array-size", "10"])
        .assert()
        .code(1);
}
