//! Integration tests for the CLI interface

mod common;

use assert_cmd::Command;
use common::TestSite;
use predicates::prelude::*;
use serde_json::json;

fn cli(site: &TestSite) -> Command {
    let mut cmd = Command::cargo_bin("mask-consensus").unwrap();
    cmd.arg("--source-root").arg(site.path());
    for var in [
        "SOURCE_ROOT",
        "OUTPUT_ROOT",
        "MASK_EXTENSION",
        "MAX_PARALLEL",
        "SHARDS",
        "SCRATCH_DIR",
        "LOG_LEVEL",
    ] {
        cmd.env_remove(format!("MASK_CONSENSUS_{}", var));
    }
    cmd
}

fn site_with_two_classes() -> TestSite {
    let site = TestSite::new();
    site.add_job(
        "a",
        "12",
        "2020-06-01",
        &json!({"1": [[1, 1], [0, -1]], "2": [[1, 0], [1, -1]]}),
    );
    site.add_job(
        "b",
        "12",
        "2020-06-01",
        &json!({"1": [[1, 1], [-1, -1]], "2": [[1, 0], [1, -1]]}),
    );
    site
}

#[test]
fn test_cli_help_flag() {
    let mut cmd = Command::cargo_bin("mask-consensus").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"))
        .stdout(predicate::str::contains("combine"))
        .stdout(predicate::str::contains("performance"));
}

#[test]
fn test_invalid_command() {
    let mut cmd = Command::cargo_bin("mask-consensus").unwrap();
    cmd.arg("invalid-command")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error:"));
}

#[test]
fn test_combine_prints_report() {
    let site = site_with_two_classes();
    cli(&site)
        .args(["combine", "--location", "12", "--date", "2020-06-01"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 new, 2 total"))
        .stdout(predicate::str::contains("classes: [1, 2]"));
}

#[test]
fn test_combine_json_report() {
    let site = site_with_two_classes();
    let output = cli(&site)
        .args([
            "combine",
            "-l",
            "12",
            "-d",
            "2020-06-01",
            "--class",
            "7",
            "--json",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["new_jobs"], 2);
    assert_eq!(report["classes"], json!(["1", "2", "7"]));
    assert_eq!(report["shape"], json!([2, 2]));
    assert_eq!(report["phases"][0]["phase"], "load_state");
}

#[test]
fn test_combine_without_any_job_fails() {
    let site = TestSite::new();
    cli(&site)
        .args(["combine", "--location", "12", "--date", "2020-06-01"])
        .assert()
        .code(6)
        .stderr(predicate::str::contains("image shape is unknown"));
}

#[test]
fn test_view_writes_pgm() {
    let site = site_with_two_classes();
    cli(&site)
        .args(["combine", "-l", "12", "-d", "2020-06-01"])
        .assert()
        .success();

    let out = site.path().join("class1.pgm");
    cli(&site)
        .args(["view", "-l", "12", "--class", "1", "--out"])
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote class 1"));

    // Class 1 resolves to [[1, 1], [0, -1]]
    let image = std::fs::read(&out).unwrap();
    assert!(image.starts_with(b"P5\n2 2\n255\n"));
    assert_eq!(&image[image.len() - 4..], &[255, 255, 0, 0]);
}

#[test]
fn test_view_unknown_class_lists_known() {
    let site = site_with_two_classes();
    cli(&site)
        .args(["combine", "-l", "12", "-d", "2020-06-01"])
        .assert()
        .success();

    cli(&site)
        .args(["view", "-l", "12", "--class", "9", "--out"])
        .arg(site.path().join("x.pgm"))
        .assert()
        .code(8)
        .stderr(predicate::str::contains("class '9' does not exist, choose from [1, 2]"));
}

#[test]
fn test_view_before_combine_fails() {
    let site = TestSite::new();
    cli(&site)
        .args(["view", "-l", "12", "--class", "1", "--out"])
        .arg(site.path().join("x.pgm"))
        .assert()
        .code(7)
        .stderr(predicate::str::contains("has not been combined"));
}

#[test]
fn test_performance_metric() {
    let site = site_with_two_classes();
    cli(&site)
        .args(["combine", "-l", "12", "-d", "2020-06-01"])
        .assert()
        .success();

    // Class 1: [[1, 1], [0, -1]]; class 2: [[1, 0], [1, -1]]
    // Voted pixels (0,0) (0,1) (1,0); overlap at (0,0)
    let output = cli(&site)
        .args(["performance", "-l", "12", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let metric: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(metric["voted_pixels"], 3);
    assert_eq!(metric["overlap_pixels"], 1);
}

#[test]
fn test_performance_needs_two_classes() {
    let site = TestSite::new();
    site.add_job("a", "12", "2020-06-01", &json!({"1": [[1]]}));
    cli(&site)
        .args(["combine", "-l", "12", "-d", "2020-06-01"])
        .assert()
        .success();

    cli(&site)
        .args(["performance", "-l", "12"])
        .assert()
        .code(8)
        .stderr(predicate::str::contains("at least two classes"));
}

#[test]
fn test_batch_runs_rows_in_order() {
    let site = site_with_two_classes();
    site.add_job("c", "12", "2020-06-02", &json!({"1": [[1, 1], [1, 1]]}));
    let table = site.path().join("jobs.csv");
    std::fs::write(
        &table,
        "loc_id,date,classes\n99.0,2020-01-01,{1}\n12.0,2020-06-01,\"{1,2}\"\n12,2020-06-02,\"{1,2,5}\"\n",
    )
    .unwrap();

    cli(&site)
        .arg("batch")
        .arg(&table)
        .args(["--skip-rows", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Combined 2 row(s)"));

    let state = site.store().load("12").unwrap();
    assert_eq!(state.metadata.jobs, 3);
    assert!(state.metadata.classes.contains("5"));
    assert!(site.store().load("99").unwrap().snapshot.is_none());
}

#[test]
fn test_batch_stops_on_first_failure() {
    let site = site_with_two_classes();
    let table = site.path().join("jobs.csv");
    std::fs::write(
        &table,
        "loc_id,date,classes\n40,2020-01-01,{1}\n12,2020-06-01,{1}\n",
    )
    .unwrap();

    cli(&site)
        .arg("batch")
        .arg(&table)
        .assert()
        .code(6);
    assert!(site.store().load("12").unwrap().snapshot.is_none());
}

#[test]
fn test_bad_config_file_is_reported() {
    let site = TestSite::new();
    let config = site.path().join("consensus.toml");
    std::fs::write(&config, "max_parallel = 0\n").unwrap();

    cli(&site)
        .arg("--config")
        .arg(&config)
        .args(["performance", "-l", "12"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("max_parallel must be at least 1"));
}
