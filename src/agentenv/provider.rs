//! Provider renderer plumbing shared by all four renderers.
//!
//! Every renderer runs the same primary pipeline: load the template,
//! inject chunk/mode/workflow fragments (one blank-line-separated blob
//! per slot, each replacing its placeholder exactly once), run the
//! template engine over the collected context, and write the artifact
//! atomically under the output directory. Sidecar generation is
//! renderer-specific.

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::agentenv::config::{Config, ProviderCfg};
use crate::agentenv::template::TemplateEngine;

pub const PROVIDER_CLAUDE: &str = "claude";
pub const PROVIDER_GEMINI: &str = "gemini";
pub const PROVIDER_CRUSH: &str = "crush";
pub const PROVIDER_COPILOT: &str = "copilot";

pub trait ProviderRenderer {
    fn name(&self) -> &str;
    fn generate(&self, ctx: &Map<String, Value>, provider_config: &ProviderCfg) -> Result<()>;
    fn validate_tools(&self, tools: &[String]) -> Result<()>;
}

pub struct RendererBase {
    pub config: Config,
    pub engine: TemplateEngine,
    pub template_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl RendererBase {
    pub fn new(config: Config, template_dir: PathBuf, output_dir: PathBuf) -> Self {
        Self {
            config,
            engine: TemplateEngine::new(),
            template_dir,
            output_dir,
        }
    }

    pub fn load_template(&self, relative: &str) -> Result<String> {
        let path = self.template_dir.join(relative);
        std::fs::read_to_string(&path)
            .with_context(|| format!("failed to load template {}", path.display()))
    }

    pub fn load_templates(&self, relatives: &[String]) -> Result<Vec<String>> {
        relatives.iter().map(|r| self.load_template(r)).collect()
    }

    pub fn merge_fragments(&self, fragments: &[String]) -> String {
        fragments
            .iter()
            .map(|f| f.trim_end())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// The shared primary pipeline: template → fragments → render.
    pub fn render_primary(
        &self,
        ctx: &Map<String, Value>,
        provider_config: &ProviderCfg,
    ) -> Result<String> {
        let mut content = self
            .load_template(&provider_config.template)
            .context("failed to load template")?;

        if !provider_config.chunks.is_empty() {
            let chunks = self
                .load_templates(&provider_config.chunks)
                .context("failed to load chunks")?;
            content = self.engine.inject_chunks(&content, &self.merge_fragments(&chunks));
        }
        if !provider_config.modes.is_empty() {
            let modes = self
                .load_templates(&provider_config.modes)
                .context("failed to load modes")?;
            content = self.engine.inject_modes(&content, &self.merge_fragments(&modes));
        }
        if !provider_config.workflows.is_empty() {
            let workflows = self
                .load_templates(&provider_config.workflows)
                .context("failed to load workflows")?;
            content = self
                .engine
                .inject_workflows(&content, &self.merge_fragments(&workflows));
        }

        self.engine
            .process(&content, ctx)
            .context("failed to process template")
    }

    /// Render the primary artifact and write it to the configured output.
    pub fn generate_primary(
        &self,
        ctx: &Map<String, Value>,
        provider_config: &ProviderCfg,
    ) -> Result<()> {
        let output = self.render_primary(ctx, provider_config)?;
        let output_path = self.output_dir.join(&provider_config.output);
        self.write_output(&output_path, &output)
            .context("failed to write output")?;
        info!(file = %output_path.display(), "generated output");
        Ok(())
    }

    /// Atomic write: temp file in the target directory, then rename.
    pub fn write_output(&self, path: &Path, content: &str) -> Result<()> {
        let parent = path.parent().unwrap_or(Path::new("."));
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating directory {}", parent.display()))?;

        let tmp = parent.join(format!(
            ".{}.tmp",
            path.file_name().and_then(|n| n.to_str()).unwrap_or("artifact")
        ));
        std::fs::write(&tmp, content)
            .with_context(|| format!("writing {}", tmp.display()))?;
        std::fs::rename(&tmp, path)
            .with_context(|| format!("renaming into place: {}", path.display()))?;
        Ok(())
    }

    /// Serialize with 2-space indentation and write atomically.
    pub fn write_json<T: Serialize>(&self, path: &Path, data: &T) -> Result<()> {
        let content = serde_json::to_string_pretty(data)?;
        self.write_output(path, &content)?;
        info!(file = %path.display(), "generated output");
        Ok(())
    }
}

/// Reject tools outside `allowed`; `mcp__*`-prefixed names always pass.
pub fn validate_against(provider: &str, tools: &[String], allowed: &[&str]) -> Result<()> {
    for tool in tools {
        if !tool.starts_with("mcp__") && !allowed.contains(&tool.as_str()) {
            anyhow::bail!("invalid tool for {}: {}", provider, tool);
        }
    }
    Ok(())
}
