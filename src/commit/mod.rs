//! Commit subsystem: stage changes, fan a prompt out to LLM providers,
//! pick a message (interactively or automatically), transform it, then
//! commit / push / tag.
//!
//! ```text
//! working tree → stage set → diff+branch+files → prompt
//!      → {provider₁ … providerₙ} → candidates → selection
//!      → transform chain → commit → push → tag → push tag
//! ```
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`ai`] | provider fan-out orchestrator and prompt building |
//! | [`providers`] | OpenAI / Claude / Gemini HTTP clients |
//! | [`git`] | git CLI operations, staging filters, semver tags |
//! | [`modules`] | commit message transformers (JIRA prefixing) |
//! | [`ui`] | interactive candidate selection |

pub mod ai;
pub mod git;
pub mod modules;
pub mod providers;
pub mod ui;

use anyhow::{bail, Context, Result};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use ai::AiService;
use git::GitOperations;
use modules::{JiraPrefixDetector, Module};

/// Immutable commit pipeline configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Provider identifiers to use; empty means all available.
    pub providers: Vec<String>,
    /// Per-provider request budget; must be positive.
    pub timeout: Duration,
    /// Custom prompt template; empty selects the built-in prompt.
    pub custom_prompt: String,
    /// First-reply-wins instead of collecting all replies.
    pub first: bool,
    /// Skip the interactive UI and pick any candidate.
    pub auto: bool,
    /// Do everything except mutate the repository.
    pub dry_run: bool,
    pub exclude_patterns: Vec<String>,
    pub include_patterns: Vec<String>,
    /// Transformer modules to run over the selected message, in order.
    pub modules: Vec<String>,
    /// Multi-line prompt format instead of single-line.
    pub multi_line: bool,
    /// Push the branch (and tag) after committing.
    pub push: bool,
    /// Tag increment kind: `""`, `major`, `minor`, or `patch`.
    pub tag: String,
    /// Honor the global gitignore when staging.
    pub use_global_gitignore: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            providers: Vec::new(),
            timeout: Duration::from_secs(30),
            custom_prompt: String::new(),
            first: false,
            auto: false,
            dry_run: false,
            exclude_patterns: Vec::new(),
            include_patterns: Vec::new(),
            modules: Vec::new(),
            multi_line: false,
            push: false,
            tag: String::new(),
            use_global_gitignore: false,
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if self.timeout.is_zero() {
            bail!("timeout must be greater than zero");
        }
        if !matches!(self.tag.as_str(), "" | "major" | "minor" | "patch") {
            bail!(
                "invalid tag increment type: {} (must be major, minor, or patch)",
                self.tag
            );
        }
        Ok(())
    }
}

pub struct Service {
    settings: Settings,
    git_ops: GitOperations,
    ai_service: AiService,
}

impl Service {
    pub fn new(settings: Settings, repo_path: &Path) -> Result<Self> {
        let ai_service = AiService::new(settings.timeout);
        Self::with_ai_service(settings, repo_path, ai_service)
    }

    /// Construct over an explicit provider set (tests stub providers here).
    pub fn with_ai_service(
        settings: Settings,
        repo_path: &Path,
        ai_service: AiService,
    ) -> Result<Self> {
        settings.validate().context("invalid options")?;
        let git_ops =
            GitOperations::open(repo_path).context("failed to initialize git operations")?;
        Ok(Self {
            settings,
            git_ops,
            ai_service,
        })
    }

    fn build_modules(&self, branch: &str) -> Vec<Box<dyn Module>> {
        let mut modules: Vec<Box<dyn Module>> = Vec::new();
        for name in &self.settings.modules {
            match name.as_str() {
                "jiraPrefixDetector" => {
                    modules.push(Box::new(JiraPrefixDetector::new(branch)));
                }
                other => warn!(module = other, "unknown module"),
            }
        }
        modules
    }

    /// Run the full pipeline. Success-shaped early exits (nothing staged,
    /// empty diff) log a warning and return `Ok`.
    pub async fn execute(&mut self) -> Result<()> {
        if !self.ai_service.has_providers() {
            warn!("no providers configured");
            bail!("no api keys found in environment");
        }

        debug!("unstaging all files");
        self.git_ops
            .unstage_all()
            .context("failed to unstage files")?;

        debug!("staging files");
        let staged_files = self
            .git_ops
            .stage_files(
                &self.settings.exclude_patterns,
                &self.settings.include_patterns,
                self.settings.use_global_gitignore,
            )
            .context("failed to stage files")?;

        if staged_files.is_empty() {
            warn!("no files to commit");
            return Ok(());
        }

        debug!("getting staged diff");
        let diff = self.git_ops.staged_diff().context("failed to get diff")?;
        if diff.trim().is_empty() {
            warn!("no changes staged for commit");
            return Ok(());
        }

        let branch = self
            .git_ops
            .current_branch()
            .context("failed to get current branch")?;

        debug!("requesting commit messages");
        let candidates = self
            .ai_service
            .generate_commit_messages(
                &diff,
                &branch,
                &staged_files,
                &self.settings.providers,
                &self.settings.custom_prompt,
                self.settings.first,
                self.settings.multi_line,
            )
            .await
            .context("failed to generate suggestions")?;

        let mut commit_message = if self.settings.auto {
            let message = pick_any(&candidates);
            if message.is_empty() {
                warn!("no valid suggestions available for auto-commit");
                bail!("no valid suggestions available for auto-commit");
            }
            debug!(message = %message, "auto-selected commit message");
            message
        } else {
            debug!("using interactive mode");
            let initial: HashMap<&str, bool> = HashMap::from([
                (ui::CHECKBOX_DRY_RUN, self.settings.dry_run),
                (ui::CHECKBOX_PUSH, self.settings.push),
                (ui::CHECKBOX_TAG_MAJOR, self.settings.tag == "major"),
                (ui::CHECKBOX_TAG_MINOR, self.settings.tag == "minor"),
                (ui::CHECKBOX_TAG_PATCH, self.settings.tag == "patch"),
            ]);
            let (message, checkboxes) = ui::run_interactive(&candidates, &initial)
                .context("failed to run interactive ui")?;

            // The footer state overrides the flag-level settings.
            self.settings.dry_run = checkboxes
                .get(ui::CHECKBOX_DRY_RUN)
                .copied()
                .unwrap_or(self.settings.dry_run);
            self.settings.push = checkboxes
                .get(ui::CHECKBOX_PUSH)
                .copied()
                .unwrap_or(self.settings.push);
            self.settings.tag = if checkboxes.get(ui::CHECKBOX_TAG_MAJOR) == Some(&true) {
                "major".to_string()
            } else if checkboxes.get(ui::CHECKBOX_TAG_MINOR) == Some(&true) {
                "minor".to_string()
            } else if checkboxes.get(ui::CHECKBOX_TAG_PATCH) == Some(&true) {
                "patch".to_string()
            } else {
                String::new()
            };
            message
        };

        if commit_message.is_empty() {
            warn!("no commit message provided");
            bail!("no commit message provided");
        }

        for module in self.build_modules(&branch) {
            debug!(module = module.name(), "running module");
            match module.transform_commit_message(&commit_message) {
                Ok((transformed, true)) => {
                    debug!(module = module.name(), message = %transformed, "transformed commit message");
                    commit_message = transformed;
                }
                Ok((_, false)) => {
                    debug!(module = module.name(), "module did not transform commit message");
                }
                Err(err) => {
                    error!(module = module.name(), error = %err, "failed to transform commit message");
                }
            }
        }

        let commit_message = commit_message.trim().to_string();

        if self.settings.dry_run {
            warn!(message = %commit_message, "dry run enabled, no artifacts created");
            return Ok(());
        }

        self.git_ops
            .create_commit(&commit_message)
            .context("failed to create commit")?;
        info!(message = %commit_message, "commit created");

        if self.settings.push {
            self.git_ops.push().context("failed to push")?;
            info!("pushed to remote");
        }

        if !self.settings.tag.is_empty() {
            let latest = self
                .git_ops
                .latest_tag()
                .context("failed to get latest tag")?;
            if latest.is_empty() {
                warn!("no existing tags found, will create first tag");
            } else {
                info!(tag = %latest, "latest tag found");
            }

            let new_tag = self
                .git_ops
                .increment_version(&latest, &self.settings.tag)
                .context("failed to increment version")?;

            self.git_ops
                .create_tag(&new_tag, &commit_message)
                .with_context(|| format!("failed to create tag {}", new_tag))?;
            info!(tag = %new_tag, "tag created");

            if self.settings.push {
                self.git_ops
                    .push_tag(&new_tag)
                    .with_context(|| format!("failed to push tag {}", new_tag))?;
                info!(tag = %new_tag, "tag pushed to remote");
            }
        }

        Ok(())
    }
}

/// Any candidate will do in auto mode; map iteration order is fine.
fn pick_any(candidates: &HashMap<String, String>) -> String {
    candidates.values().next().cloned().unwrap_or_default()
}
