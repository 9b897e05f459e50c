//! Command-line behavior of the two binaries

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn docsort(cwd: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("docsort");
    cmd.current_dir(cwd.path())
        .env_remove("API_KEY")
        .env_remove("GEMINI_API_KEY")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn missing_api_key_exits_with_failure() {
    let cwd = TempDir::new().unwrap();
    std::fs::create_dir(cwd.path().join("inbox")).unwrap();

    docsort(&cwd)
        .arg("inbox")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("API_KEY"));

    assert!(!cwd.path().join("sorted_documents").exists());
}

#[test]
fn missing_input_directory_exits_with_failure() {
    let cwd = TempDir::new().unwrap();

    docsort(&cwd)
        .env("API_KEY", "test-key")
        .arg("nowhere")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("nowhere"));
}

#[test]
fn empty_inbox_completes() {
    let cwd = TempDir::new().unwrap();
    std::fs::create_dir(cwd.path().join("inbox")).unwrap();

    docsort(&cwd)
        .env("API_KEY", "test-key")
        .args(["inbox", "--output-dir", "out"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Successfully moved and sorted: 0 files."));

    assert!(cwd.path().join("out/_failed_to_process").is_dir());
}

#[test]
fn sorter_help_lists_options() {
    let cwd = TempDir::new().unwrap();

    docsort(&cwd)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--output-directory"))
        .stdout(predicate::str::contains("--concurrency"))
        .stdout(predicate::str::contains("auto-rename"));
}

#[test]
fn zero_concurrency_is_rejected() {
    let cwd = TempDir::new().unwrap();

    docsort(&cwd)
        .args(["inbox", "-j", "0"])
        .assert()
        .failure();
}

#[test]
fn watcher_help_lists_options() {
    cargo_bin_cmd!("docsort-watch")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--watch-dir"))
        .stdout(predicate::str::contains("--debounce"))
        .stdout(predicate::str::contains("--processor-script"));
}
