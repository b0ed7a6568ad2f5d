//! Integration tests for interrupted runs
//!
//! The builder kills massbuild while building `openssl`, leaving a
//! checkpoint behind that `status`, `resume` and `discard` work on.

#![cfg(unix)]

mod common;

use common::{stderr, stdout, TestProject, SAMPLE_ORDER};
use std::fs::OpenOptions;
use std::io::Write;

fn interrupted_project() -> TestProject {
    let project = TestProject::with_sample(&[]);
    project.write_builder(&[], Some("openssl"));

    let output = project.run(&["build", "--all", "--output", "out"]);
    assert!(!output.status.success(), "massbuild should have been killed");
    assert!(project.file_exists("out/checkpoint"));
    assert_eq!(project.built(), vec!["zlib"]);
    project
}

#[test]
fn test_resume_finishes_without_rebuilding() {
    let project = interrupted_project();

    let output = project.run(&["resume", "out/checkpoint"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    assert_eq!(project.built(), SAMPLE_ORDER);
    assert!(!project.file_exists("out/checkpoint"));
    let report = project.report("out");
    assert_eq!(report["summary"]["built"], serde_json::json!(["openssl", "curl"]));
    assert_eq!(report["failures"]["journal"]["kind"], "unschedulable");
}

#[test]
fn test_resume_after_torn_record() {
    let project = interrupted_project();
    let mut checkpoint = OpenOptions::new()
        .append(true)
        .open(project.path().join("out/checkpoint"))
        .unwrap();
    checkpoint.write_all(b"3f2a|{\"type\":\"Adva").unwrap();
    drop(checkpoint);

    let output = project.run(&["resume", "out/checkpoint"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(project.built(), SAMPLE_ORDER);
}

#[test]
fn test_resume_rejects_corrupt_checkpoint() {
    let project = interrupted_project();
    let path = project.path().join("out/checkpoint");
    let text = std::fs::read_to_string(&path).unwrap();
    std::fs::write(&path, text.replacen("zlib", "zlob", 1)).unwrap();

    let output = project.run(&["resume", "out/checkpoint"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("corrupt"), "stderr: {}", stderr(&output));
    assert_eq!(project.built(), vec!["zlib"]);
}

#[test]
fn test_status_reports_progress() {
    let project = interrupted_project();

    let output = project.run(&["--json", "status", "out/checkpoint"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let status: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(status["processed"], 1);
    assert_eq!(status["remaining"], serde_json::json!(["openssl", "curl"]));
    assert_eq!(status["failures"]["journal"]["kind"], "unschedulable");

    // status leaves the checkpoint resumable
    let output = project.run(&["status", "out/checkpoint"]);
    assert!(stdout(&output).contains("1 processed, 2 remaining"));
    assert!(project.file_exists("out/checkpoint"));
}

#[test]
fn test_discard_removes_checkpoint() {
    let project = interrupted_project();

    let output = project.run(&["discard", "out/checkpoint"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(!project.file_exists("out/checkpoint"));

    let output = project.run(&["resume", "out/checkpoint"]);
    assert!(!output.status.success());
}

#[test]
fn test_discard_missing_checkpoint() {
    let project = TestProject::with_sample(&[]);

    let output = project.run(&["discard", "out/checkpoint"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("No checkpoint"));
}
