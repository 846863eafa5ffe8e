//! Commit message transformer modules.
//!
//! A module may rewrite the prompt before generation and the commit
//! message after selection. Each transform reports whether it did any
//! work; errors are logged by the pipeline and the chain continues.

use anyhow::Result;
use regex::Regex;
use std::sync::OnceLock;

pub trait Module: Send + Sync {
    fn name(&self) -> &str;
    fn transform_prompt(&self, prompt: &str) -> Result<(String, bool)>;
    fn transform_commit_message(&self, message: &str) -> Result<(String, bool)>;
}

fn jira_patterns() -> &'static Vec<Regex> {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"^([A-Z]+-\d+)",
            r"^feature/([A-Z]+-\d+)(?:-.*)?$",
            r"^bugfix/([A-Z]+-\d+)(?:-.*)?$",
            r"^hotfix/([A-Z]+-\d+)(?:-.*)?$",
            r"^chore/([A-Z]+-\d+)(?:-.*)?$",
            r"/([A-Z]+-\d+)(?:-|$)",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("static jira pattern"))
        .collect()
    })
}

/// Extract a `ABC-123: ` prefix from a branch name, or `""` when the
/// branch carries no ticket (or is a mainline branch).
pub fn detect_jira_prefix(branch: &str) -> String {
    if branch.is_empty() || branch == "main" || branch == "master" || branch == "develop" {
        return String::new();
    }
    for pattern in jira_patterns() {
        if let Some(captures) = pattern.captures(branch) {
            if let Some(ticket) = captures.get(1) {
                if !ticket.as_str().is_empty() {
                    return format!("{}: ", ticket.as_str());
                }
            }
        }
    }
    String::new()
}

/// Prepend the prefix unless the message already starts with it.
pub fn apply_jira_prefix(message: &str, prefix: &str) -> String {
    if prefix.is_empty() || message.starts_with(prefix) {
        return message.to_string();
    }
    format!("{}{}", prefix, message)
}

/// Prefixes commit messages with the ticket id found in the branch name.
pub struct JiraPrefixDetector {
    branch: String,
}

impl JiraPrefixDetector {
    pub fn new(branch: &str) -> Self {
        Self {
            branch: branch.to_string(),
        }
    }
}

impl Module for JiraPrefixDetector {
    fn name(&self) -> &str {
        "jiraPrefixDetector"
    }

    fn transform_prompt(&self, prompt: &str) -> Result<(String, bool)> {
        Ok((prompt.to_string(), false))
    }

    fn transform_commit_message(&self, message: &str) -> Result<(String, bool)> {
        let prefix = detect_jira_prefix(&self.branch);
        if prefix.is_empty() {
            return Ok((message.to_string(), false));
        }
        let transformed = apply_jira_prefix(message, &prefix);
        let did_work = transformed != message;
        Ok((transformed, did_work))
    }
}
