//! Provider fan-out orchestrator.
//!
//! Fans a single prompt out to every usable provider concurrently and
//! reduces the replies into a `provider name → message` map. Two
//! collection modes:
//!
//! - **first-wins** (`first = true`): the first successful reply wins,
//!   everything still in flight is cancelled, and the map holds one entry.
//! - **all-wins** (`first = false`): every provider runs to completion
//!   (or deadline) and the map holds one entry per success.
//!
//! Each worker gets a private deadline of `timeout`. Per-provider errors
//! and timeouts are logged and dropped; they never abort the fan-out.
//! The returned map has no order contract — the first-wins branch is
//! non-deterministic.
//!
//! Cancellation: dropping the fan-out future aborts the [`JoinSet`],
//! which cancels every in-flight HTTP call. In first-wins mode every
//! task drops its channel sender on exit, so the collection read
//! terminates with `None` when all providers fail instead of blocking.

use anyhow::{bail, Result};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

use crate::commit::providers::{available_providers, Provider};

const DEFAULT_PROMPT: &str = include_str!("prompts/prompt.md");
const FORMAT_SINGLE: &str = include_str!("prompts/format-single.md");
const FORMAT_MULTI: &str = include_str!("prompts/format-multi.md");

pub struct AiService {
    timeout: Duration,
    providers: HashMap<String, Arc<dyn Provider>>,
}

impl AiService {
    /// Register every provider with a credential in the environment.
    pub fn new(timeout: Duration) -> Self {
        let mut providers: HashMap<String, Arc<dyn Provider>> = HashMap::new();
        for provider in available_providers() {
            providers.insert(provider.name().to_string(), Arc::from(provider));
        }
        Self { timeout, providers }
    }

    /// Build a service over an explicit provider set.
    pub fn with_providers(timeout: Duration, list: Vec<Arc<dyn Provider>>) -> Self {
        let mut providers = HashMap::new();
        for provider in list {
            if provider.is_available() {
                providers.insert(provider.name().to_string(), provider);
            }
        }
        Self { timeout, providers }
    }

    pub fn has_providers(&self) -> bool {
        !self.providers.is_empty()
    }

    pub fn provider_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.providers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Select providers by the caller-supplied identifier list.
    /// Empty list (or the `all` keyword) selects every registered provider;
    /// matching is case-insensitive.
    fn filter_providers(&self, requested: &[String]) -> Vec<Arc<dyn Provider>> {
        if requested.is_empty() || requested.iter().any(|r| r.eq_ignore_ascii_case("all")) {
            return self.providers.values().cloned().collect();
        }
        requested
            .iter()
            .filter_map(|name| self.providers.get(&name.to_lowercase()).cloned())
            .collect()
    }

    /// Fan the prompt out and collect replies.
    ///
    /// Fails only when zero providers survive filtering. Zero successful
    /// replies yields an empty map — the caller must check.
    #[allow(clippy::too_many_arguments)]
    pub async fn generate_commit_messages(
        &self,
        diff: &str,
        branch: &str,
        files: &[String],
        providers: &[String],
        custom_prompt: &str,
        first: bool,
        multi_line: bool,
    ) -> Result<HashMap<String, String>> {
        let active = self.filter_providers(providers);
        if active.is_empty() {
            bail!("no ai providers available");
        }

        let prompt = if custom_prompt.is_empty() {
            build_prompt(diff, branch, files, multi_line)
        } else {
            build_custom_prompt(custom_prompt, diff, branch, files)
        };

        let (tx, mut rx) = mpsc::channel::<(String, String)>(active.len());
        let mut tasks = JoinSet::new();

        for provider in active {
            let tx = tx.clone();
            let prompt = prompt.clone();
            let timeout = self.timeout;
            tasks.spawn(async move {
                debug!(provider = provider.name(), "requesting message from provider");
                match tokio::time::timeout(timeout, provider.ask(&prompt)).await {
                    Ok(Ok(messages)) => {
                        if let Some(message) = messages.into_iter().next() {
                            let _ = tx.send((provider.name().to_string(), message)).await;
                        } else {
                            warn!(provider = provider.name(), "no messages received from provider");
                        }
                    }
                    Ok(Err(err)) => {
                        error!(
                            provider = provider.name(),
                            error = %err,
                            "failed to request message from provider"
                        );
                    }
                    Err(_) => {
                        warn!(provider = provider.name(), "provider timed out");
                    }
                }
            });
        }
        // Only worker tasks hold senders now; the channel closes once every
        // worker has exited, so the first-wins read below cannot block
        // forever when all providers fail.
        drop(tx);

        let mut results = HashMap::new();

        if first {
            if let Some((name, message)) = rx.recv().await {
                results.insert(name, message);
            }
            tasks.abort_all();
            while tasks.join_next().await.is_some() {}
            return Ok(results);
        }

        while tasks.join_next().await.is_some() {}
        while let Ok((name, message)) = rx.try_recv() {
            results.insert(name, message);
        }
        Ok(results)
    }
}

/// Substitute `{format}`, `{branch}`, `{files}`, `{diff}` into the default
/// prompt template.
pub fn build_prompt(diff: &str, branch: &str, files: &[String], multi_line: bool) -> String {
    let format = if multi_line {
        FORMAT_MULTI.trim_end()
    } else {
        FORMAT_SINGLE.trim_end()
    };
    DEFAULT_PROMPT
        .replace("{format}", format)
        .replace("{branch}", branch)
        .replace("{files}", &files.join(", "))
        .replace("{diff}", diff)
}

/// Substitute `{branch}`, `{files}`, `{diff}` into a user-supplied prompt.
pub fn build_custom_prompt(prompt: &str, diff: &str, branch: &str, files: &[String]) -> String {
    prompt
        .replace("{branch}", branch)
        .replace("{files}", &files.join(", "))
        .replace("{diff}", diff)
}
