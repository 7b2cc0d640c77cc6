// SPDX-License-Identifier: MIT OR Apache-2.0

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use tempfile::TempDir;

fn write_file(path: &std::path::Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent");
    }
    fs::write(path, content).expect("write file");
}

fn spangrep(cwd: &std::path::Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("spangrep"));
    cmd.current_dir(cwd)
        .env("HOME", cwd.join(".no-home"))
        .env("NO_COLOR", "1");
    cmd
}

fn fox_workspace() -> TempDir {
    let dir = TempDir::new().expect("tempdir");
    write_file(&dir.path().join("fileA.txt"), "the quick brown fox");
    write_file(&dir.path().join("fileB.js"), "function fox() {}");
    write_file(&dir.path().join("other.txt"), "lazy dog");
    dir
}

#[test]
fn search_ranks_matching_files() {
    let dir = fox_workspace();
    spangrep(dir.path())
        .args(["search", "fox"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with(
            "Found 2 matches for query \"fox\":",
        ))
        .stdout(predicate::str::contains("File: fileA.txt"))
        .stdout(predicate::str::contains("File: fileB.js"))
        .stdout(predicate::str::contains("Lines: 1-1"))
        .stdout(predicate::str::contains("other.txt").not())
        .stderr(predicate::str::contains("Found 2 matches"));
}

#[test]
fn include_glob_filters_files() {
    let dir = fox_workspace();
    spangrep(dir.path())
        .args(["s", "fox", "-i", "*.js"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with(
            "Found 1 match for query \"fox\" (filter: \"*.js\"):",
        ))
        .stdout(predicate::str::contains("File: fileB.js"))
        .stdout(predicate::str::contains("fileA.txt").not());
}

#[test]
fn empty_outcomes_are_not_failures() {
    let dir = fox_workspace();
    spangrep(dir.path())
        .args(["search", "wolf"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with(
            "No matches found for query \"wolf\"",
        ));

    spangrep(dir.path())
        .args(["search", "fox", "--include", "*.md"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No files found for query \"fox\""));
}

#[test]
fn chunk_parameters_shape_line_ranges() {
    let dir = TempDir::new().expect("tempdir");
    let body: Vec<String> = (1..=20)
        .map(|n| if n == 8 { "needle".to_string() } else { format!("line {n}") })
        .collect();
    write_file(&dir.path().join("src/long.txt"), &body.join("\n"));

    spangrep(dir.path())
        .args(["search", "needle", "src", "-c", "10", "-o", "5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("in path \"src\""))
        .stdout(predicate::str::contains("Lines: 1-10"))
        .stdout(predicate::str::contains("Lines: 6-15"))
        .stdout(predicate::str::contains("Lines: 11-20").not());
}

#[test]
fn json_format_reports_results() {
    let dir = fox_workspace();
    let output = spangrep(dir.path())
        .args(["--format", "json", "--compact", "search", "fox"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let report: Value = serde_json::from_slice(&output).expect("json report");
    assert_eq!(report["query"], "fox");
    assert_eq!(report["status"], "matches");
    assert_eq!(report["total_matches"], 2);
    let first = &report["results"][0];
    assert_eq!(first["start_line"], 1);
    assert!(first["score"].as_f64().unwrap_or_default() > 0.0);
    assert!(first["path"].as_str().is_some());
}

#[test]
fn path_outside_workspace_is_rejected() {
    let dir = fox_workspace();
    spangrep(dir.path())
        .args(["search", "fox", "-p", ".."])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Path validation failed"));
}

#[test]
fn invalid_chunking_is_rejected() {
    let dir = fox_workspace();
    spangrep(dir.path())
        .args(["search", "fox", "-c", "5", "-o", "5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "Invalid parameters provided. Reason:",
        ));
}

#[test]
fn extra_roots_are_searched_together() {
    let first = TempDir::new().expect("first");
    let second = TempDir::new().expect("second");
    write_file(&first.path().join("a.txt"), "fox in first root");
    write_file(&second.path().join("b.txt"), "fox in second root");

    spangrep(first.path())
        .args(["search", "fox", "--root"])
        .arg(first.path())
        .arg("--root")
        .arg(second.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Found 2 matches"))
        .stdout(predicate::str::contains("File: a.txt"))
        .stdout(predicate::str::contains("File: b.txt"));
}

#[test]
fn config_file_sets_chunk_defaults() {
    let dir = TempDir::new().expect("tempdir");
    write_file(
        &dir.path().join(".spangreprc.toml"),
        "chunk_size = 4\noverlap = 1\n",
    );
    write_file(&dir.path().join("notes.txt"), "a\nb\nc\nd\ne\nf\ng\nneedle");

    spangrep(dir.path())
        .args(["search", "needle"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Lines: 7-8"))
        .stdout(predicate::str::contains("Lines: 1-").not());
}
