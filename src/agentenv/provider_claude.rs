//! Claude renderer: primary artifact, `.claude/settings.json`,
//! `.mcp.json`, and rendered sub-agents.

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::info;

use crate::agentenv::config::{Config, ProviderCfg};
use crate::agentenv::provider::{validate_against, ProviderRenderer, RendererBase, PROVIDER_CLAUDE};

const CLAUDE_SETTINGS_DIR: &str = ".claude";
const CLAUDE_SETTINGS_FILE: &str = "settings.json";
const CLAUDE_MCP_FILE: &str = ".mcp.json";
const CLAUDE_AGENTS_DIR: &str = "agents";

const VALID_TOOLS: &[&str] = &[
    "Edit",
    "Glob",
    "Grep",
    "LS",
    "MultiEdit",
    "Read",
    "Task",
    "TodoWrite",
    "WebFetch",
    "WebSearch",
    "Write",
    "Bash",
];

/// `.claude/settings.json` shape.
#[derive(Debug, Serialize)]
struct ClaudeSettings {
    permissions: ClaudePermissions,
    #[serde(rename = "enabledMcpjsonServers")]
    enabled_mcp_servers: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ClaudePermissions {
    allow: Vec<String>,
    deny: Vec<String>,
}

/// `.mcp.json` shape.
#[derive(Debug, Serialize)]
struct ClaudeMcpConfig {
    #[serde(rename = "mcpServers")]
    mcp_servers: BTreeMap<String, ClaudeMcpServerConfig>,
}

#[derive(Debug, Serialize)]
struct ClaudeMcpServerConfig {
    command: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    url: String,
    #[serde(rename = "type", skip_serializing_if = "String::is_empty")]
    server_type: String,
    args: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    env: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    headers: BTreeMap<String, String>,
}

pub struct ClaudeRenderer {
    base: RendererBase,
}

impl ClaudeRenderer {
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
                ClaudeMcpServerConfig {
                    command: server.command.clone(),
                    url: server.url.clone(),
                    server_type: server.server_type.clone(),
                    args: server.args.clone(),
                    env: server.env.clone(),
                    headers: server.headers.clone(),
                },
            );
        }

        let settings = ClaudeSettings {
            permissions: ClaudePermissions {
                allow: all_tools,
                deny: Vec::new(),
            },
            enabled_mcp_servers: enabled_servers,
        };

        let settings_path = self
            .base
            .output_dir
            .join(CLAUDE_SETTINGS_DIR)
            .join(CLAUDE_SETTINGS_FILE);
        self.base
            .write_json(&settings_path, &settings)
            .with_context(|| format!("failed to write {}", settings_path.display()))?;

        let mcp_path = self.base.output_dir.join(CLAUDE_MCP_FILE);
        let mcp_config = ClaudeMcpConfig {
            mcp_servers,
        };
        self.base
            .write_json(&mcp_path, &mcp_config)
            .with_context(|| format!("failed to write {}", mcp_path.display()))?;

        Ok(())
    }

    /// Render each configured agent template into `.claude/agents/<name>.md`.
    fn copy_agents(&self, provider_config: &ProviderCfg, ctx: &Map<String, Value>) -> Result<()> {
        if provider_config.agents.is_empty() {
            return Ok(());
        }

        let dest_dir = self
            .base
            .output_dir
            .join(CLAUDE_SETTINGS_DIR)
            .join(CLAUDE_AGENTS_DIR);

        for agent_path in &provider_config.agents {
            let base_name = std::path::Path::new(agent_path)
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or(agent_path);
            let agent_name = base_name.strip_suffix(".tpl.md").unwrap_or(base_name);

            let template = self
                .base
                .load_template(agent_path)
                .with_context(|| format!("failed to read agent template {}", agent_path))?;
            let rendered = self
                .base
                .engine
                .process(&template, ctx)
                .with_context(|| format!("failed to process agent template {}", agent_path))?;

            let dest = dest_dir.join(format!("{}.md", agent_name));
            self.base
                .write_output(&dest, &rendered)
                .with_context(|| format!("failed to write agent {}", agent_name))?;
            info!(source = agent_path, name = agent_name, dest = %dest.display(), "processed agent");
        }

        Ok(())
    }
}

impl ProviderRenderer for ClaudeRenderer {
    fn name(&self) -> &str {
        PROVIDER_CLAUDE
    }

    fn generate(&self, ctx: &Map<String, Value>, provider_config: &ProviderCfg) -> Result<()> {
        self.validate_tools(&provider_config.tools)?;
        self.base.generate_primary(ctx, provider_config)?;
        self.generate_config_files(provider_config)
            .context("failed to generate config files")?;
        self.copy_agents(provider_config, ctx)
            .context("failed to copy agents")?;
        Ok(())
    }

    fn validate_tools(&self, tools: &[String]) -> Result<()> {
        validate_against("Claude", tools, VALID_TOOLS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn renderer(dir: &std::path::Path, config: Config) -> ClaudeRenderer {
        ClaudeRenderer::new(config, dir.join("tpl"), dir.to_path_buf())
    }

    fn test_config() -> Config {
        serde_yaml::from_str(
            r#"
version: "1"
project: {name: demo}
providers:
  claude: {template: claude.tpl.md, output: CLAUDE.md, tools: [Read, Bash]}
mcp:
  kwb: {enabled: true, type: stdio, name: kwb, command: devx, args: [kwb, serve], tools: [mcp__kwb__search]}
"#,
        )
        .unwrap()
    }

    #[test]
    fn generates_primary_settings_and_mcp_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config();
        std::fs::create_dir_all(dir.path().join("tpl")).unwrap();
        std::fs::write(
            dir.path().join("tpl/claude.tpl.md"),
            "# {{ .project.name }}\n",
        )
        .unwrap();

        let renderer = renderer(dir.path(), config.clone());
        let mut ctx = Map::new();
        ctx.insert(
            "project".into(),
            serde_json::json!({"name": "demo"}),
        );
        let provider_config = config.providers.get("claude").unwrap();
        renderer.generate(&ctx, provider_config).unwrap();

        let primary = std::fs::read_to_string(dir.path().join("CLAUDE.md")).unwrap();
        assert_eq!(primary, "# demo\n");

        let settings: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(dir.path().join(".claude/settings.json")).unwrap(),
        )
        .unwrap();
        let allow = settings["permissions"]["allow"].as_array().unwrap();
        assert!(allow.iter().any(|t| t == "Read"));
        assert!(allow.iter().any(|t| t == "mcp__kwb__search"));
        assert_eq!(settings["enabledMcpjsonServers"][0], "kwb");

        let mcp: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(dir.path().join(".mcp.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(mcp["mcpServers"]["kwb"]["command"], "devx");
    }

    #[test]
    fn renders_agents_with_context() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config();
        config.providers.get_mut("claude").unwrap().agents =
            vec!["agents/reviewer.tpl.md".to_string()];

        std::fs::create_dir_all(dir.path().join("tpl/agents")).unwrap();
        std::fs::write(dir.path().join("tpl/claude.tpl.md"), "x").unwrap();
        std::fs::write(
            dir.path().join("tpl/agents/reviewer.tpl.md"),
            "Review {{ .project.name }}",
        )
        .unwrap();

        let renderer = renderer(dir.path(), config.clone());
        let mut ctx = Map::new();
        ctx.insert("project".into(), serde_json::json!({"name": "demo"}));
        renderer
            .generate(&ctx, config.providers.get("claude").unwrap())
            .unwrap();

        let agent =
            std::fs::read_to_string(dir.path().join(".claude/agents/reviewer.md")).unwrap();
        assert_eq!(agent, "Review demo");
    }

    #[test]
    fn rejects_invalid_tools() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = renderer(dir.path(), test_config());
        assert!(renderer
            .validate_tools(&["Hammer".to_string()])
            .is_err());
        assert!(renderer
            .validate_tools(&["mcp__anything".to_string()])
            .is_ok());
    }
}
