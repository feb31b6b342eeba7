// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 feedflow contributors

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const FEED: &str = "\
Make,Model,Price,Fuel
Audi,A4,1500,D
Fiat,Panda,800,B
BMW,X5,4200,D
";

const PIPELINE: &str = r#"
name: cli-stock
download:
  type: file
  source: feed.csv
read:
  type: csv
filter:
  rules:
    - key: Price
      operator: greater_than
      value: 1000
map:
  rules:
    - source: Make
      target: make
      is_required: true
    - source: Price
      target: price
      transformation: int
    - source: Fuel
      target: fuel
      value_mapping:
        D: diesel
        B: petrol
"#;

fn project() -> TempDir {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("feed.csv"), FEED).unwrap();
    fs::write(temp.path().join("pipeline.yaml"), PIPELINE).unwrap();
    temp
}

fn feedflow(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("feedflow").unwrap();
    cmd.current_dir(dir).env("RUST_LOG", "off");
    cmd
}

#[test]
fn run_writes_saved_records() {
    let temp = project();

    feedflow(temp.path())
        .args(["run", "-c", "pipeline.yaml", "-o", "out.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Pipeline completed"));

    let saved: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(temp.path().join("out.json")).unwrap()).unwrap();
    let rows = saved.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["make"], "Audi");
    assert_eq!(rows[0]["price"], 1500);
    assert_eq!(rows[0]["fuel"], "diesel");
    assert_eq!(rows[1]["make"], "BMW");
}

#[test]
fn run_to_stage_previews_filtered_records() {
    let temp = project();

    feedflow(temp.path())
        .args(["run", "--to-stage", "filter", "--preview", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Stopped"))
        .stdout(predicate::str::contains("\"Make\": \"Audi\""))
        .stdout(predicate::str::contains("BMW").not());

    assert!(!temp.path().join("out.json").exists());
}

#[test]
fn run_json_report_lists_executed_stages() {
    let temp = project();

    let output = feedflow(temp.path())
        .args(["run", "--to-stage", "read", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["success"], true);
    assert_eq!(report["last_stage"], "read");
    let stages: Vec<&str> = report["stages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["stage"].as_str().unwrap())
        .collect();
    assert_eq!(stages, vec!["download", "read"]);
    assert_eq!(report["results"]["read"]["total"], 3);
}

#[test]
fn run_fails_when_feed_is_missing() {
    let temp = project();
    fs::remove_file(temp.path().join("feed.csv")).unwrap();

    feedflow(temp.path())
        .args(["run", "--to-stage", "read"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Download failed"));
}

#[test]
fn validate_reports_errors() {
    let temp = project();
    fs::write(
        temp.path().join("broken.yaml"),
        r#"
name: broken
download: { type: file, source: "" }
read: { type: csv }
filter:
  rules:
    - { key: year, operator: between, value: 2015 }
"#,
    )
    .unwrap();

    feedflow(temp.path())
        .args(["validate", "broken.yaml"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Errors"))
        .stdout(predicate::str::contains("Pipeline is invalid"));

    feedflow(temp.path())
        .args(["validate", "pipeline.yaml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Pipeline is valid"));
}

#[test]
fn validate_missing_file_fails() {
    let temp = TempDir::new().unwrap();

    feedflow(temp.path())
        .args(["validate", "nope.yaml"])
        .assert()
        .failure();
}

#[test]
fn export_normalizes_yaml() {
    let temp = project();

    feedflow(temp.path())
        .args(["export", "pipeline.yaml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("name: cli-stock"))
        .stdout(predicate::str::contains("source_field: Make"));

    feedflow(temp.path())
        .args(["export", "pipeline.yaml", "-o", "normalized.yaml"])
        .assert()
        .success();
    let normalized = fs::read_to_string(temp.path().join("normalized.yaml")).unwrap();
    assert!(normalized.contains("target_field: fuel"));
}

#[test]
fn cache_stats_on_empty_project() {
    let temp = TempDir::new().unwrap();

    feedflow(temp.path())
        .args(["cache", "stats"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Entries:  0"));

    feedflow(temp.path())
        .args(["cache", "clear", "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already empty"));
}
