//! Agent-environment YAML configuration.
//!
//! Loaded from `<output>/.agentenv/agentenv.yaml`. Missing optional
//! fields stay at their zero value; no defaults are injected. Validation
//! enforces the minimum shape required for generation.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

pub const MCP_SERVER_TYPE_STDIO: &str = "stdio";
pub const MCP_SERVER_TYPE_HTTP: &str = "http";
pub const MCP_SERVER_TYPE_SSE: &str = "sse";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub project: Project,
    #[serde(default)]
    pub providers: BTreeMap<String, ProviderCfg>,
    #[serde(default)]
    pub mcp: BTreeMap<String, McpServer>,
    #[serde(default)]
    pub env_vars: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Project {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

/// Per-provider generation recipe. Paths are relative to the template
/// directory.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderCfg {
    #[serde(default)]
    pub template: String,
    #[serde(default)]
    pub output: String,
    #[serde(default)]
    pub chunks: Vec<String>,
    #[serde(default)]
    pub modes: Vec<String>,
    #[serde(default)]
    pub workflows: Vec<String>,
    #[serde(default)]
    pub agents: Vec<String>,
    #[serde(default)]
    pub hooks: Vec<String>,
    #[serde(default)]
    pub tools: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct McpServer {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, rename = "type")]
    pub server_type: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub tools: Vec<String>,
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;
    let config: Config =
        serde_yaml::from_str(&content).context("failed to parse YAML")?;
    config.validate().context("invalid config")?;
    Ok(config)
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.version.is_empty() {
            bail!("version is required");
        }
        if self.project.name.is_empty() {
            bail!("project name is required");
        }
        if self.providers.is_empty() {
            bail!("at least one provider is required");
        }
        for (name, provider) in &self.providers {
            if provider.template.is_empty() {
                bail!("provider {}: template is required", name);
            }
            if provider.output.is_empty() {
                bail!("provider {}: output is required", name);
            }
        }
        for (name, server) in &self.mcp {
            if server.name.is_empty() {
                bail!("MCP server {}: name is required", name);
            }
            if server.command.is_empty() {
                bail!("MCP server {}: command is required", name);
            }
            if !server.server_type.is_empty() {
                match server.server_type.as_str() {
                    MCP_SERVER_TYPE_STDIO | MCP_SERVER_TYPE_HTTP | MCP_SERVER_TYPE_SSE => {}
                    other => bail!("MCP server {}: invalid type {}", name, other),
                }
            }
        }
        Ok(())
    }

    /// Enabled MCP servers, in deterministic name order.
    pub fn enabled_mcp(&self) -> impl Iterator<Item = (&String, &McpServer)> {
        self.mcp.iter().filter(|(_, s)| s.enabled)
    }
}
