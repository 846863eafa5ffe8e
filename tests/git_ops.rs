//! Git operations tests against throwaway repositories.

use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

use devx::commit::git::GitOperations;

fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .current_dir(dir)
        .args(args)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

fn init_repo() -> TempDir {
    let tmp = TempDir::new().unwrap();
    git(tmp.path(), &["init", "--quiet", "-b", "main"]);
    git(tmp.path(), &["config", "user.name", "Test User"]);
    git(tmp.path(), &["config", "user.email", "test@example.com"]);
    git(tmp.path(), &["config", "commit.gpgsign", "false"]);
    tmp
}

fn commit_file(dir: &Path, name: &str, content: &str, message: &str) {
    std::fs::write(dir.join(name), content).unwrap();
    git(dir, &["add", name]);
    git(dir, &["commit", "--quiet", "-m", message]);
}

#[test]
fn stage_all_modified_files() {
    let tmp = init_repo();
    commit_file(tmp.path(), "base.txt", "base", "init");

    std::fs::write(tmp.path().join("a.txt"), "alpha").unwrap();
    std::fs::write(tmp.path().join("b.txt"), "beta").unwrap();

    let ops = GitOperations::open(tmp.path()).unwrap();
    let staged = ops.stage_files(&[], &[], false).unwrap();
    assert_eq!(staged.len(), 2);

    let diff = ops.staged_diff().unwrap();
    assert!(diff.contains("alpha"));
    assert!(diff.contains("beta"));
}

#[test]
fn stage_nothing_when_tree_is_clean() {
    let tmp = init_repo();
    commit_file(tmp.path(), "base.txt", "base", "init");

    let ops = GitOperations::open(tmp.path()).unwrap();
    let staged = ops.stage_files(&[], &[], false).unwrap();
    assert!(staged.is_empty());
    assert!(ops.staged_diff().unwrap().trim().is_empty());
}

#[test]
fn exclude_pattern_filters_files() {
    let tmp = init_repo();
    commit_file(tmp.path(), "base.txt", "base", "init");

    std::fs::write(tmp.path().join("keep.rs"), "fn main() {}").unwrap();
    std::fs::write(tmp.path().join("skip.log"), "noise").unwrap();

    let ops = GitOperations::open(tmp.path()).unwrap();
    let staged = ops
        .stage_files(&["*.log".to_string()], &[], false)
        .unwrap();
    assert_eq!(staged, vec!["keep.rs".to_string()]);
}

#[test]
fn include_pattern_limits_staging() {
    let tmp = init_repo();
    commit_file(tmp.path(), "base.txt", "base", "init");

    std::fs::write(tmp.path().join("one.rs"), "a").unwrap();
    std::fs::write(tmp.path().join("two.md"), "b").unwrap();

    let ops = GitOperations::open(tmp.path()).unwrap();
    let staged = ops.stage_files(&[], &["*.rs".to_string()], false).unwrap();
    assert_eq!(staged, vec!["one.rs".to_string()]);
}

#[test]
fn unstage_all_clears_the_index() {
    let tmp = init_repo();
    commit_file(tmp.path(), "base.txt", "base", "init");

    std::fs::write(tmp.path().join("new.txt"), "data").unwrap();
    git(tmp.path(), &["add", "new.txt"]);

    let ops = GitOperations::open(tmp.path()).unwrap();
    ops.unstage_all().unwrap();
    assert!(ops.staged_diff().unwrap().trim().is_empty());
}

#[test]
fn current_branch_is_reported() {
    let tmp = init_repo();
    commit_file(tmp.path(), "base.txt", "base", "init");
    let ops = GitOperations::open(tmp.path()).unwrap();
    assert_eq!(ops.current_branch().unwrap(), "main");
}

#[test]
fn latest_tag_picks_highest_semver() {
    let tmp = init_repo();
    commit_file(tmp.path(), "base.txt", "base", "init");

    for tag in ["v0.1.0", "v0.1.9", "v0.2.0", "not-a-version"] {
        git(tmp.path(), &["tag", tag]);
    }

    let ops = GitOperations::open(tmp.path()).unwrap();
    assert_eq!(ops.latest_tag().unwrap(), "v0.2.0");
}

#[test]
fn latest_tag_on_untagged_repo_is_empty() {
    let tmp = init_repo();
    commit_file(tmp.path(), "base.txt", "base", "init");
    let ops = GitOperations::open(tmp.path()).unwrap();
    assert_eq!(ops.latest_tag().unwrap(), "");
}

#[test]
fn minor_increment_creates_annotated_tag_at_head() {
    let tmp = init_repo();
    commit_file(tmp.path(), "base.txt", "base", "init");
    for tag in ["v0.1.0", "v0.1.9", "v0.2.0"] {
        git(tmp.path(), &["tag", tag]);
    }
    commit_file(tmp.path(), "feature.txt", "feature", "add feature");

    let ops = GitOperations::open(tmp.path()).unwrap();
    let latest = ops.latest_tag().unwrap();
    let next = ops.increment_version(&latest, "minor").unwrap();
    assert_eq!(next, "v0.3.0");
    ops.create_tag(&next, "add feature").unwrap();

    let head = git(tmp.path(), &["rev-parse", "HEAD"]);
    let tagged = git(tmp.path(), &["rev-list", "-n1", "v0.3.0"]);
    assert_eq!(head, tagged);

    // Annotated tags carry the message.
    let kind = git(tmp.path(), &["cat-file", "-t", "v0.3.0"]);
    assert_eq!(kind, "tag");
}

#[test]
fn create_commit_uses_configured_identity() {
    let tmp = init_repo();
    commit_file(tmp.path(), "base.txt", "base", "init");
    std::fs::write(tmp.path().join("x.txt"), "x").unwrap();

    let ops = GitOperations::open(tmp.path()).unwrap();
    ops.stage_files(&[], &[], false).unwrap();
    ops.create_commit("feat: add x").unwrap();

    let author = git(tmp.path(), &["log", "-1", "--pretty=format:%an <%ae>"]);
    assert_eq!(author, "Test User <test@example.com>");
    let message = git(tmp.path(), &["log", "-1", "--pretty=format:%s"]);
    assert_eq!(message, "feat: add x");
}

#[test]
fn create_commit_without_identity_fails() {
    let tmp = init_repo();
    commit_file(tmp.path(), "base.txt", "base", "init");

    // A repo-level empty identity shadows any global one.
    git(tmp.path(), &["config", "user.name", ""]);

    std::fs::write(tmp.path().join("x.txt"), "x").unwrap();
    git(tmp.path(), &["add", "x.txt"]);

    let ops = GitOperations::open(tmp.path()).unwrap();
    let err = ops.create_commit("msg").unwrap_err();
    assert!(
        format!("{:#}", err).contains("user.name not configured"),
        "got: {:#}",
        err
    );
}
