use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn devx_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("devx");
    path
}

fn setup_tree() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();

    fs::create_dir_all(root.join("src")).unwrap();
    fs::write(
        root.join("src/a.go"),
        "package foo\n\n// Package foo implements the frobnicator.\nfunc Frob() {}\n",
    )
    .unwrap();
    fs::write(
        root.join("README.md"),
        "# Demo\n\nThis project demonstrates indexing and deployment workflows.\n",
    )
    .unwrap();
    fs::write(root.join("config.yaml"), "key: value\nmode: fast\n").unwrap();
    fs::write(root.join("Makefile"), "all:\n\techo build\n").unwrap();
    fs::write(root.join("image.png"), "not indexed").unwrap();

    fs::create_dir_all(root.join(".git")).unwrap();
    fs::write(root.join(".git/config"), "[core]\nbare = false\n").unwrap();

    fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
    fs::write(root.join("node_modules/pkg/index.json"), "{}").unwrap();

    tmp
}

fn run_kwb(root: &Path, args: &[&str]) -> (String, String, bool) {
    let index = root.join("kwb-index/kwb.db");
    let output = Command::new(devx_binary())
        .arg("kwb")
        .arg("--root")
        .arg(root)
        .arg("--index")
        .arg(&index)
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("failed to run devx: {}", e));

    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.success(),
    )
}

#[test]
fn build_reports_document_count() {
    let tmp = setup_tree();
    let (stdout, stderr, success) = run_kwb(tmp.path(), &["build"]);
    assert!(success, "build failed: {} {}", stdout, stderr);
    // a.go, README.md, config.yaml, Makefile — not image.png
    assert!(stdout.contains("Indexed 4 documents."), "got: {}", stdout);
}

#[test]
fn build_excludes_git_and_node_modules() {
    let tmp = setup_tree();
    run_kwb(tmp.path(), &["build"]);

    let (stdout, _, success) = run_kwb(tmp.path(), &["search", "bare"]);
    assert!(success);
    assert!(
        !stdout.contains(".git"),
        ".git contents must not be indexed: {}",
        stdout
    );

    let (stdout, _, _) = run_kwb(tmp.path(), &["search", "frobnicator"]);
    assert!(stdout.contains("a.go"), "expected a.go in: {}", stdout);
    assert!(!stdout.contains("node_modules"));
}

#[test]
fn search_round_trip_finds_content() {
    let tmp = setup_tree();
    run_kwb(tmp.path(), &["build"]);

    let (stdout, _, success) = run_kwb(tmp.path(), &["search", "deployment"]);
    assert!(success);
    assert!(stdout.contains("README.md"), "got: {}", stdout);
}

#[test]
fn search_no_results() {
    let tmp = setup_tree();
    run_kwb(tmp.path(), &["build"]);

    let (stdout, _, success) = run_kwb(tmp.path(), &["search", "xyzzynonexistent"]);
    assert!(success);
    assert!(stdout.contains("No results."));
}

#[test]
fn search_without_index_fails() {
    let tmp = setup_tree();
    let (_, stderr, success) = run_kwb(tmp.path(), &["search", "anything"]);
    assert!(!success);
    assert!(
        stderr.contains("index not found"),
        "expected missing-index error, got: {}",
        stderr
    );
}

#[test]
fn stats_reports_count_and_path() {
    let tmp = setup_tree();
    run_kwb(tmp.path(), &["build"]);

    let (stdout, _, success) = run_kwb(tmp.path(), &["stats"]);
    assert!(success);
    assert!(stdout.contains("documents: 4"), "got: {}", stdout);
    assert!(stdout.contains("kwb.db"));
}

#[test]
fn rebuild_replaces_old_index() {
    let tmp = setup_tree();
    run_kwb(tmp.path(), &["build"]);
    run_kwb(tmp.path(), &["build"]);

    let (stdout, _, success) = run_kwb(tmp.path(), &["stats"]);
    assert!(success);
    assert!(
        stdout.contains("documents: 4"),
        "rebuild must not duplicate documents: {}",
        stdout
    );
}

#[test]
fn invalid_index_type_is_rejected() {
    let tmp = setup_tree();
    let output = Command::new(devx_binary())
        .arg("kwb")
        .arg("--root")
        .arg(tmp.path())
        .arg("--index")
        .arg(tmp.path().join("kwb.db"))
        .args(["--index-type", "btree", "build"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid index type"), "got: {}", stderr);
}

#[test]
fn max_file_size_skips_large_files() {
    let tmp = setup_tree();
    let output = Command::new(devx_binary())
        .arg("kwb")
        .arg("--root")
        .arg(tmp.path())
        .arg("--index")
        .arg(tmp.path().join("kwb-small/kwb.db"))
        .args(["--max-file-size", "40", "build"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    // Only config.yaml (21 bytes) and Makefile (17 bytes) fit the budget.
    assert!(stdout.contains("Indexed 2 documents."), "got: {}", stdout);
}
