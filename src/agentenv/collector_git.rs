//! Git collector: repository state for the template context.

use anyhow::Result;
use serde_json::{json, Map, Value};
use std::path::PathBuf;
use std::process::Command;

use crate::agentenv::collector::Collector;

pub const GIT_COLLECTOR_NAME: &str = "git";

pub struct GitCollector {
    workdir: PathBuf,
}

impl GitCollector {
    pub fn new(workdir: PathBuf) -> Self {
        Self { workdir }
    }

    fn run_git(&self, args: &[&str]) -> Option<String> {
        let output = Command::new("git")
            .current_dir(&self.workdir)
            .args(args)
            .output()
            .ok()?;
        if !output.status.success() {
            return None;
        }
        Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn git_installed(&self) -> bool {
        Command::new("git")
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }
}

impl Collector for GitCollector {
    fn name(&self) -> &str {
        GIT_COLLECTOR_NAME
    }

    fn priority(&self) -> i32 {
        10
    }

    fn collect(&self) -> Result<Map<String, Value>> {
        let mut result = Map::new();

        if !self.git_installed() {
            return Ok(result);
        }

        if let Some(branch) = self.run_git(&["rev-parse", "--abbrev-ref", "HEAD"]) {
            result.insert("branch".into(), json!(branch));
        }
        if let Some(commit) = self.run_git(&["rev-parse", "HEAD"]) {
            result.insert("commit".into(), json!(commit));
        }
        if let Some(short) = self.run_git(&["rev-parse", "--short", "HEAD"]) {
            result.insert("commit_short".into(), json!(short));
        }
        if let Some(remote) = self.run_git(&["config", "--get", "remote.origin.url"]) {
            result.insert("remote".into(), json!(remote));
        }
        if let Some(status) = self.run_git(&["status", "--porcelain"]) {
            result.insert("is_clean".into(), json!(status.is_empty()));
        }
        if let Some(tag) = self.run_git(&["describe", "--exact-match", "--tags", "HEAD"]) {
            result.insert("tag".into(), json!(tag));
        }
        if let Some(author) = self.run_git(&["log", "-1", "--pretty=format:%an"]) {
            result.insert("last_author".into(), json!(author));
        }
        if let Some(email) = self.run_git(&["log", "-1", "--pretty=format:%ae"]) {
            result.insert("last_author_email".into(), json!(email));
        }

        Ok(result)
    }
}
