//! End-to-end CLI tests using shell-script renderers.

#![cfg(unix)]

mod support;

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use support::{count_files, workspace, DECK, FAILING_DIAGRAMS, FAKE_RENDERERS};

#[test]
fn test_preprocess_renders_each_distinct_artifact_once() {
    let ws = workspace(FAKE_RENDERERS, DECK);

    let mut cmd = Command::cargo_bin("slidekit").unwrap();
    cmd.current_dir(ws.path())
        .arg("preprocess")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "3 artifacts resolved (2 rendered, 1 cached), 0 failed",
        ));

    let processed = fs::read_to_string(ws.path().join("slides/presentation.processed.md")).unwrap();
    assert!(processed.contains("![Mermaid diagram](images/mermaid/mermaid-"));
    assert!(processed.contains("![Repo](images/qr/qr-"));
    assert!(!processed.contains("```mermaid"));

    // Two artifacts, each with a primary and a raster output
    assert_eq!(count_files(&ws.path().join("cache")), 4);

    let mut again = Command::cargo_bin("slidekit").unwrap();
    again
        .current_dir(ws.path())
        .arg("preprocess")
        .assert()
        .success()
        .stdout(predicate::str::contains("(0 rendered, 3 cached)"));
}

#[test]
fn test_preprocess_json_summary() {
    let ws = workspace(FAKE_RENDERERS, DECK);

    let output = Command::cargo_bin("slidekit")
        .unwrap()
        .current_dir(ws.path())
        .args([
            "preprocess",
            "--theme",
            "rose-pine-moon",
            "--output-format",
            "json",
            "-o",
            "out/deck.md",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());

    let summary: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["theme"], "rose-pine-moon");
    assert_eq!(summary["resolved"].as_array().unwrap().len(), 3);
    assert_eq!(summary["stats"]["renders"], 2);
    let hit_rate = summary["hitRate"].as_f64().unwrap();
    assert!((hit_rate - 1.0 / 3.0).abs() < 1e-9);

    let diagram = ws
        .path()
        .join("cache")
        .join(summary["resolved"][0]["paths"]["primary"].as_str().unwrap());
    let rendered = fs::read_to_string(diagram).unwrap();
    assert!(rendered.contains("#3e8fb0"), "diagram should be recoloured");
    assert!(ws.path().join("out/deck.md").is_file());
}

#[test]
fn test_render_failure_keeps_block_with_placeholder() {
    let ws = workspace(FAILING_DIAGRAMS, DECK);

    let mut cmd = Command::cargo_bin("slidekit").unwrap();
    cmd.current_dir(ws.path())
        .arg("preprocess")
        .assert()
        .success()
        .stdout(predicate::str::contains("1 artifacts resolved"))
        .stdout(predicate::str::contains("2 failed"))
        .stdout(predicate::str::contains("Parse error on line 1"));

    let processed = fs::read_to_string(ws.path().join("slides/presentation.processed.md")).unwrap();
    assert!(processed.contains("<!-- slidekit: diagram rendering failed:"));
    assert!(processed.contains("```mermaid"));
    assert_eq!(count_files(&ws.path().join("cache/mermaid")), 0);
}

#[test]
fn test_render_failure_with_abort_policy() {
    let ws = workspace(FAILING_DIAGRAMS, DECK);

    let mut cmd = Command::cargo_bin("slidekit").unwrap();
    cmd.current_dir(ws.path())
        .args(["preprocess", "--on-error", "abort"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Preprocessing aborted"));

    assert!(!ws.path().join("slides/presentation.processed.md").exists());
}

#[test]
fn test_resolve_prints_cached_path() {
    let ws = workspace(FAKE_RENDERERS, DECK);

    let first = Command::cargo_bin("slidekit")
        .unwrap()
        .current_dir(ws.path())
        .args(["resolve", "qr", "--content", "https://example.com/repo"])
        .output()
        .unwrap();
    assert!(first.status.success());
    let path = String::from_utf8(first.stdout).unwrap();
    let path = path.trim();
    assert!(path.starts_with("cache/qr/qr-"));
    assert_eq!(
        fs::read_to_string(ws.path().join(path)).unwrap(),
        "https://example.com/repo"
    );

    let second = Command::cargo_bin("slidekit")
        .unwrap()
        .current_dir(ws.path())
        .args([
            "resolve",
            "qr",
            "--content",
            "https://example.com/repo",
            "--output-format",
            "json",
        ])
        .output()
        .unwrap();
    let result: Value = serde_json::from_slice(&second.stdout).unwrap();
    assert_eq!(result["cached"], true);
}

#[test]
fn test_bundle_flattens_theme_directories() {
    let ws = workspace(FAKE_RENDERERS, DECK);

    let mut cmd = Command::cargo_bin("slidekit").unwrap();
    cmd.current_dir(ws.path())
        .args(["bundle", "--theme", "rose-pine-moon", "--out", "dist"])
        .assert()
        .success()
        .stdout(predicate::str::contains("rose-pine-moon theme"));

    let deck = fs::read_to_string(ws.path().join("dist/presentation.md")).unwrap();
    assert!(deck.contains("theme: rose-pine-moon"));
    assert!(deck.contains("](images/mermaid/mermaid-"));
    assert!(!deck.contains("rose-pine-moon/"));
    assert_eq!(count_files(&ws.path().join("dist/images")), 4);
    assert!(ws.path().join("dist/manifest.json").is_file());

    // The source deck is left untouched
    let source = fs::read_to_string(ws.path().join("slides/presentation.md")).unwrap();
    assert_eq!(source, DECK);
}
