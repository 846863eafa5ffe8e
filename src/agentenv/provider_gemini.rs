//! Gemini renderer: primary artifact plus `.gemini/settings.json`.

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::agentenv::config::{Config, ProviderCfg};
use crate::agentenv::provider::{validate_against, ProviderRenderer, RendererBase, PROVIDER_GEMINI};

const GEMINI_SETTINGS_DIR: &str = ".gemini";
const GEMINI_SETTINGS_FILE: &str = "settings.json";

const MCP_DEFAULT_TIMEOUT_MS: u64 = 30_000;
const MCP_DEFAULT_TRUST: bool = true;
const MAX_SESSION_TURNS: u32 = 10;
const MAX_SESSION_DURATION_SECS: u32 = 600;
const CHECKPOINTING_ENABLED: bool = true;
const AUTO_ACCEPT_ENABLED: bool = true;
const USAGE_STATISTICS_ENABLED: bool = false;

const VALID_TOOLS: &[&str] = &[
    "LSTool",
    "ReadFileTool",
    "WriteFileTool",
    "GrepTool",
    "GlobTool",
    "EditTool",
    "ReadManyFilesTool",
    "ShellTool",
    "WebFetchTool",
    "WebSearchTool",
    "MemoryTool",
];

/// `.gemini/settings.json` shape.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiSettings {
    core_tools: Vec<String>,
    exclude_tools: Vec<String>,
    max_session_turns: u32,
    max_session_duration: u32,
    checkpointing: GeminiCheckpointing,
    auto_accept: bool,
    #[serde(rename = "mcpServers")]
    mcp_servers: BTreeMap<String, GeminiMcpServerConfig>,
    #[serde(rename = "allowMCPServers")]
    allow_mcp_servers: Vec<String>,
    usage_statistics_enabled: bool,
}

#[derive(Debug, Serialize)]
struct GeminiCheckpointing {
    enabled: bool,
}

#[derive(Debug, Serialize)]
struct GeminiMcpServerConfig {
    #[serde(skip_serializing_if = "String::is_empty")]
    url: String,
    command: String,
    args: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    env: BTreeMap<String, String>,
    timeout: u64,
    trust: bool,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    headers: BTreeMap<String, String>,
}

pub struct GeminiRenderer {
    base: RendererBase,
}

impl GeminiRenderer {
    pub fn new(config: Config, template_dir: PathBuf, output_dir: PathBuf) -> Self {
        Self {
            base: RendererBase::new(config, template_dir, output_dir),
        }
    }

    fn generate_config_files(&self, provider_config: &ProviderCfg) -> Result<()> {
        let mut all_tools = provider_config.tools.clone();
        let mut enabled_servers = Vec::new();
        let mut mcp_servers = BTreeMap::new();

        for (name, server) in self.base.config.enabled_mcp() {
            enabled_servers.push(name.clone());
            all_tools.extend(server.tools.iter().cloned());
            mcp_servers.insert(
                name.clone(),
                GeminiMcpServerConfig {
                    url: server.url.clone(),
                    command: server.command.clone(),
                    args: server.args.clone(),
                    env: server.env.clone(),
                    timeout: MCP_DEFAULT_TIMEOUT_MS,
                    trust: MCP_DEFAULT_TRUST,
                    headers: server.headers.clone(),
                },
            );
        }

        let settings = GeminiSettings {
            core_tools: all_tools,
            exclude_tools: Vec::new(),
            max_session_turns: MAX_SESSION_TURNS,
            max_session_duration: MAX_SESSION_DURATION_SECS,
            checkpointing: GeminiCheckpointing {
                enabled: CHECKPOINTING_ENABLED,
            },
            auto_accept: AUTO_ACCEPT_ENABLED,
            mcp_servers,
            allow_mcp_servers: enabled_servers,
            usage_statistics_enabled: USAGE_STATISTICS_ENABLED,
        };

        let path = self
            .base
            .output_dir
            .join(GEMINI_SETTINGS_DIR)
            .join(GEMINI_SETTINGS_FILE);
        self.base
            .write_json(&path, &settings)
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }
}

impl ProviderRenderer for GeminiRenderer {
    fn name(&self) -> &str {
        PROVIDER_GEMINI
    }

    fn generate(&self, ctx: &Map<String, Value>, provider_config: &ProviderCfg) -> Result<()> {
        self.validate_tools(&provider_config.tools)?;
        self.base.generate_primary(ctx, provider_config)?;
        self.generate_config_files(provider_config)
            .context("failed to generate config files")?;
        Ok(())
    }

    fn validate_tools(&self, tools: &[String]) -> Result<()> {
        validate_against("Gemini", tools, VALID_TOOLS)
    }
}
