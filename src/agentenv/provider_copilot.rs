//! Copilot renderer: primary artifact plus `.github/.copilot.mcp.json`.

use anyhow::{bail, Context, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::agentenv::config::{Config, ProviderCfg};
use crate::agentenv::provider::{ProviderRenderer, RendererBase, PROVIDER_COPILOT};

const COPILOT_MCP_CONFIG_DIR: &str = ".github";
const COPILOT_MCP_CONFIG_FILE: &str = ".copilot.mcp.json";

/// `.github/.copilot.mcp.json` shape.
#[derive(Debug, Serialize)]
struct CopilotMcpConfig {
    #[serde(rename = "mcpServers")]
    mcp_servers: BTreeMap<String, CopilotMcpServer>,
}

#[derive(Debug, Serialize)]
struct CopilotMcpServer {
    #[serde(rename = "type")]
    server_type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    url: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    command: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    args: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    env: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    headers: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<String>,
}

pub struct CopilotRenderer {
    base: RendererBase,
}

impl CopilotRenderer {
    pub fn new(config: Config, template_dir: PathBuf, output_dir: PathBuf) -> Self {
        Self {
            base: RendererBase::new(config, template_dir, output_dir),
        }
    }

    fn generate_config_files(&self) -> Result<()> {
        let mut mcp_servers = BTreeMap::new();
        for (name, server) in self.base.config.enabled_mcp() {
            mcp_servers.insert(
                name.clone(),
                CopilotMcpServer {
                    server_type: server.server_type.clone(),
                    url: server.url.clone(),
                    command: server.command.clone(),
                    args: server.args.clone(),
                    env: server.env.clone(),
                    headers: server.headers.clone(),
                    tools: server.tools.clone(),
                },
            );
        }

        let config = CopilotMcpConfig {
            mcp_servers,
        };
        let path = self
            .base
            .output_dir
            .join(COPILOT_MCP_CONFIG_DIR)
            .join(COPILOT_MCP_CONFIG_FILE);
        self.base
            .write_json(&path, &config)
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }
}

impl ProviderRenderer for CopilotRenderer {
    fn name(&self) -> &str {
        PROVIDER_COPILOT
    }

    fn generate(&self, ctx: &Map<String, Value>, provider_config: &ProviderCfg) -> Result<()> {
        self.validate_tools(&provider_config.tools)?;
        self.base.generate_primary(ctx, provider_config)?;
        self.generate_config_files()
            .context("failed to generate config files")?;
        Ok(())
    }

    fn validate_tools(&self, tools: &[String]) -> Result<()> {
        if !tools.is_empty() {
            bail!("copilot provider does not support tools");
        }
        Ok(())
    }
}
