//! Agent-environment subsystem: render per-provider instruction files
//! and JSON sidecars from a project-level YAML config.
//!
//! ```text
//! agentenv.yaml + template dir
//!        │
//!        ▼
//!   collectors (project, git, environment, github, analysis, conventions)
//!        │
//!        ▼
//!   template context ──▶ per-provider renderers ──▶ output tree
//! ```
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | YAML configuration and validation |
//! | [`collector`] | collector trait + priority-ordered manager |
//! | [`template`] | `{{ … }}` templater with fragment injection |
//! | [`generator`] | collectors → context → renderer dispatch |
//! | [`provider`] | renderer trait and shared rendering pipeline |

pub mod collector;
pub mod collector_env;
pub mod collector_git;
pub mod collector_github;
pub mod collector_notes;
pub mod collector_project;
pub mod config;
pub mod generator;
pub mod provider;
pub mod provider_claude;
pub mod provider_copilot;
pub mod provider_crush;
pub mod provider_gemini;
pub mod template;

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use collector_notes::ANALYSIS_FILE_NAME;
use generator::Generator;

pub const AGENT_ENV_DIR: &str = ".agentenv";
pub const CONFIG_FILE: &str = "agentenv.yaml";

const GITIGNORE_FILE: &str = ".gitignore";
const GITIGNORE_MARKER: &str = "# agentenv";

const IGNORE_FILES: &[&str] = &[
    ".agentenv/",
    ".claude/",
    ".mcp.json",
    "CLAUDE.md",
    ".gemini/",
    "GEMINI.md",
    ".crush/",
    ".crush.json",
    "CRUSH.md",
    ".github/copilot-instructions.md",
];

/// Default template tree extracted by `init`.
const EMBEDDED_TEMPLATE: &[(&str, &str)] = &[
    ("agentenv.yaml", include_str!("templates/agentenv.yaml")),
    ("claude.tpl.md", include_str!("templates/claude.tpl.md")),
    ("gemini.tpl.md", include_str!("templates/gemini.tpl.md")),
    ("crush.tpl.md", include_str!("templates/crush.tpl.md")),
    ("copilot.tpl.md", include_str!("templates/copilot.tpl.md")),
    (
        "chunks/conventions.md",
        include_str!("templates/chunks/conventions.md"),
    ),
    (
        "agents/code-reviewer.tpl.md",
        include_str!("templates/agents/code-reviewer.tpl.md"),
    ),
];

const ANALYSE_PROMPT: &str = include_str!("templates/analyse.md");

const ANALYSIS_BEGIN_MARKER: &str = "### BEGIN ANALYSIS ###";
const ANALYSIS_END_MARKER: &str = "### END ANALYSIS ###";

const PROVIDER_CLAUDE_CLI: &str = "claude";
const MODEL_CLAUDE: &str = "claude-opus-4-1";
const PROVIDER_GEMINI_CLI: &str = "gemini";
const MODEL_GEMINI: &str = "gemini-2.5-pro";
const PROVIDER_CODEX_CLI: &str = "codex";

#[derive(Debug, Clone)]
pub struct Settings {
    /// Project root: templates live under `<output>/.agentenv/`, rendered
    /// artifacts land directly underneath.
    pub output_path: PathBuf,
    /// CLI tool used by `analyse`: `claude`, `gemini`, or `codex`.
    pub analysis_provider: String,
    /// Model override for the analysis tool; empty selects its default.
    pub analysis_model: String,
    pub analysis_timeout: Duration,
}

pub struct Service {
    settings: Settings,
}

impl Service {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    /// Extract the embedded default template tree and register the
    /// generated paths in `.gitignore`. Idempotent.
    pub fn init(&self) -> Result<()> {
        info!("initializing agentenv");

        let target_dir = self.settings.output_path.join(AGENT_ENV_DIR);
        if target_dir.exists() {
            info!("configuration already exists");
            return Ok(());
        }

        info!("creating default configuration");
        for (relative, content) in EMBEDDED_TEMPLATE {
            let path = target_dir.join(relative);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
            std::fs::write(&path, content)
                .with_context(|| format!("failed to extract template: {}", path.display()))?;
        }

        update_gitignore(&self.settings.output_path).context("failed to update .gitignore")?;

        info!("agentenv initialized successfully");
        Ok(())
    }

    /// Run an agent CLI over the repository and save the extracted
    /// analysis to `.agentenv/analysis.gen.md`.
    pub async fn analyse(&self) -> Result<()> {
        if self.settings.analysis_provider.is_empty() {
            bail!("analysis provider is not set");
        }

        info!(provider = %self.settings.analysis_provider, "analysing project");

        let provider = self.settings.analysis_provider.as_str();
        if !tool_in_path(provider) {
            bail!("provider tool '{}' not found in PATH", provider);
        }

        let mut command = tokio::process::Command::new(provider);
        command.current_dir(&self.settings.output_path);
        match provider {
            PROVIDER_CLAUDE_CLI => {
                let model = non_empty_or(&self.settings.analysis_model, MODEL_CLAUDE);
                command.args(["--model", model, ANALYSE_PROMPT]);
            }
            PROVIDER_GEMINI_CLI => {
                let model = non_empty_or(&self.settings.analysis_model, MODEL_GEMINI);
                command.args(["--model", model, "--prompt", ANALYSE_PROMPT]);
            }
            PROVIDER_CODEX_CLI => {
                command.arg(ANALYSE_PROMPT);
            }
            other => bail!("unsupported provider: {}", other),
        }

        info!("running analysis");
        let output = tokio::time::timeout(self.settings.analysis_timeout, command.output())
            .await
            .map_err(|_| {
                anyhow::anyhow!(
                    "analysis timed out after {:?}",
                    self.settings.analysis_timeout
                )
            })?
            .context("failed to run analysis command")?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        let mut result = stdout;
        if !output.status.success() {
            warn!(status = %output.status, stderr = %stderr, "analysis command failed");
            if result.is_empty() && !stderr.is_empty() {
                result = stderr;
            }
        }
        if result.is_empty() {
            bail!("no output from analysis");
        }

        let analysis = extract_analysis(&result);

        let target_dir = self.settings.output_path.join(AGENT_ENV_DIR);
        std::fs::create_dir_all(&target_dir)
            .with_context(|| format!("creating {}", target_dir.display()))?;
        let output_file = target_dir.join(ANALYSIS_FILE_NAME);
        std::fs::write(&output_file, analysis).context("failed to write analysis")?;

        info!(file = %output_file.display(), "analysis saved");
        Ok(())
    }

    /// Load the config and render every configured provider.
    pub fn generate(&self) -> Result<()> {
        let absolute = self
            .settings
            .output_path
            .canonicalize()
            .unwrap_or_else(|_| self.settings.output_path.clone());
        info!(dir = %absolute.display(), "generating agentenv");

        let template_dir = self.settings.output_path.join(AGENT_ENV_DIR);
        let config_path = template_dir.join(CONFIG_FILE);
        let config = config::load_config(&config_path).context("failed to load config")?;

        let generator = Generator::new(
            config,
            template_dir,
            self.settings.output_path.clone(),
        );
        generator.generate().context("generation failed")?;

        info!("generation completed");
        Ok(())
    }
}

fn non_empty_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.is_empty() {
        fallback
    } else {
        value
    }
}

fn tool_in_path(tool: &str) -> bool {
    let Some(paths) = std::env::var_os("PATH") else {
        return false;
    };
    std::env::split_paths(&paths).any(|dir| dir.join(tool).is_file())
}

/// Extract the text between the analysis markers; fall back to the full
/// output (with a warning) when the markers are missing or inverted.
fn extract_analysis(input: &str) -> String {
    let Some(begin) = input.find(ANALYSIS_BEGIN_MARKER) else {
        warn!("begin marker not found in analysis output");
        return input.to_string();
    };
    let content_start = begin + ANALYSIS_BEGIN_MARKER.len();
    let Some(end) = input.find(ANALYSIS_END_MARKER).filter(|&e| e > begin) else {
        warn!("end marker not found or invalid in analysis output");
        return input.to_string();
    };
    let mut output = input[content_start..end].trim_matches(['\n', ' ']).to_string();
    output.push('\n');
    output
}

/// Append the marker block to `.gitignore` unless it is already present.
fn update_gitignore(output_path: &Path) -> Result<()> {
    let gitignore_path = output_path.join(GITIGNORE_FILE);

    let existing = match std::fs::read_to_string(&gitignore_path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(err) => return Err(err).context("failed to read .gitignore"),
    };

    if existing.contains(GITIGNORE_MARKER) {
        return Ok(());
    }

    let mut block = String::new();
    if !existing.is_empty() && !existing.ends_with('\n') {
        block.push('\n');
    }
    block.push('\n');
    block.push_str(GITIGNORE_MARKER);
    block.push('\n');
    for file in IGNORE_FILES {
        block.push_str(file);
        block.push('\n');
    }

    use std::io::Write;
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&gitignore_path)
        .context("failed to open .gitignore")?;
    file.write_all(block.as_bytes())
        .context("failed to write to .gitignore")?;
    Ok(())
}
