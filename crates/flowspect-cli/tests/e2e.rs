//! End-to-end tests of the `flowspect` binary.

#![allow(deprecated)] // Allow deprecated Command::cargo_bin for tests

use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

// =============================================================================
// Test Helpers
// =============================================================================

fn flowspect() -> Command {
    Command::cargo_bin("flowspect").unwrap()
}

fn demo(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../demos/hello")
        .join(name)
}

// =============================================================================
// build
// =============================================================================

#[test]
fn test_build_hello_pipeline() {
    let temp = TempDir::new().unwrap();
    let location = temp.path().join("pipeline");

    flowspect()
        .arg("build")
        .arg(demo("pipeline.toml"))
        .arg("-o")
        .arg(&location)
        .assert()
        .success()
        .stdout(predicate::str::contains("helloWorld"));

    let main = fs::read_to_string(location.join("main.nf")).unwrap();
    assert!(main.contains("process helloWorld {"));
    assert!(location.join("nextflow.config").is_file());
    assert!(location.join("bin/helloWorld.py").is_file());
    assert!(location.join("bin/captureIntoNotebook.py").is_file());
}

#[test]
fn test_build_reports_hint() {
    let temp = TempDir::new().unwrap();
    let manifest = temp.path().join("pipeline.toml");
    fs::write(
        &manifest,
        "[pipeline]\nname = \"shell\"\n\n[[process]]\nname = \"countLines\"\ncommand = \"wc -l $table\"\n",
    )
    .unwrap();

    flowspect()
        .arg("build")
        .arg(&manifest)
        .assert()
        .failure()
        .stderr(predicate::str::contains("countLines").and(predicate::str::contains("hint:")));
}

#[test]
fn test_build_missing_manifest() {
    flowspect()
        .args(["build", "/nonexistent/pipeline.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Manifest not found"));
}

// =============================================================================
// save / inspect / capture / clean
// =============================================================================

#[test]
fn test_save_mapping_to_stdout() {
    flowspect()
        .arg("save")
        .write_stdin(r#"[{"destination": null, "value": {"a": 1, "b": "x"}}]"#)
        .assert()
        .success()
        .stdout("a\t1\nb\tx\n");
}

#[test]
fn test_save_with_peek_and_file() {
    let temp = TempDir::new().unwrap();
    let target = temp.path().join("counts.txt");
    let payload = format!(
        r#"[{{"destination": null, "value": [1, 2, 3]}}, {{"destination": "{}", "value": [4, 5, 6]}}]"#,
        target.display()
    );

    flowspect()
        .args(["save", "--peek", "2"])
        .write_stdin(payload)
        .assert()
        .success()
        .stdout("1\n2\n");
    assert_eq!(fs::read_to_string(&target).unwrap(), "4\n5\n");
}

#[test]
fn test_save_rejects_bad_peek() {
    flowspect()
        .args(["save", "--peek", "a,b"])
        .write_stdin("[]")
        .assert()
        .failure();
}

#[test]
fn test_inspect_hello() {
    flowspect()
        .arg("inspect")
        .arg(demo("hello.py"))
        .assert()
        .success()
        .stdout(
            predicate::str::contains("greeting")
                .and(predicate::str::contains("outFile"))
                .and(predicate::str::contains("version 1.0")),
        );
}

#[test]
fn test_inspect_unknown_function() {
    flowspect()
        .arg("inspect")
        .arg(demo("hello.py"))
        .args(["--function", "missing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("hint:"));
}

#[test]
fn test_capture_to_stdout() {
    let temp = TempDir::new().unwrap();
    let script = temp.path().join("greet.py");
    fs::write(
        &script,
        "import os\n\ndef process(name, *, times: int = 1):\n    \"\"\"Greet.\"\"\"\n\n    ### Build\n    text = name * times\n    return text\n",
    )
    .unwrap();

    flowspect()
        .args(["capture", "--notebooktitle", "Greeting"])
        .arg(&script)
        .args(["world", "--times", "2"])
        .assert()
        .success()
        .stdout(
            predicate::str::starts_with("# Greeting")
                .and(predicate::str::contains("name = 'world'\ntimes = 2\n"))
                .and(predicate::str::contains("text = name * times\ntext\n")),
        );
}

#[test]
fn test_clean() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    fs::write(root.join(".nextflow.log"), "").unwrap();
    fs::write(root.join("keep.txt"), "").unwrap();
    fs::create_dir_all(root.join("work/ab")).unwrap();
    fs::create_dir_all(root.join("pipeline")).unwrap();
    fs::write(root.join("pipeline/report.tex"), "").unwrap();

    flowspect()
        .args(["clean", "--no-pipeline"])
        .arg(root)
        .assert()
        .success();
    assert!(!root.join(".nextflow.log").exists());
    assert!(!root.join("work").exists());
    assert!(root.join("keep.txt").exists());
    assert!(root.join("pipeline/report.tex").exists());

    flowspect().arg("clean").arg(root).assert().success();
    assert!(!root.join("pipeline/report.tex").exists());
}
