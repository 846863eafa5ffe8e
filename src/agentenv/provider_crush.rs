//! Crush renderer: primary artifact plus `.crush.json`.

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::agentenv::config::{Config, ProviderCfg};
use crate::agentenv::provider::{validate_against, ProviderRenderer, RendererBase, PROVIDER_CRUSH};

const CRUSH_SCHEMA: &str = "https://charm.land/crush.json";
const CRUSH_CONFIG_FILE: &str = ".crush.json";

const VALID_TOOLS: &[&str] = &["view", "ls", "grep", "edit"];

/// `.crush.json` shape.
#[derive(Debug, Serialize)]
struct CrushConfig {
    #[serde(rename = "$schema")]
    schema: String,
    lsp: BTreeMap<String, LspConfig>,
    mcp: BTreeMap<String, CrushMcpConfig>,
    permissions: CrushPermissions,
}

#[derive(Debug, Serialize)]
struct LspConfig {
    command: String,
}

#[derive(Debug, Serialize)]
struct CrushMcpConfig {
    #[serde(rename = "type")]
    server_type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    url: String,
    command: String,
    args: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    env: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    headers: BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
struct CrushPermissions {
    allowed_tools: Vec<String>,
}

pub struct CrushRenderer {
    base: RendererBase,
}

impl CrushRenderer {
    pub fn new(config: Config, template_dir: PathBuf, output_dir: PathBuf) -> Self {
        Self {
            base: RendererBase::new(config, template_dir, output_dir),
        }
    }

    fn generate_config_files(&self, provider_config: &ProviderCfg) -> Result<()> {
        let mut all_tools = provider_config.tools.clone();
        let mut mcp_servers = BTreeMap::new();

        for (name, server) in self.base.config.enabled_mcp() {
            // crush has built-in gopls support; registering it again as an
            // MCP server causes issues.
            if server.command == "gopls" {
                continue;
            }
            all_tools.extend(server.tools.iter().cloned());
            mcp_servers.insert(
                name.clone(),
                CrushMcpConfig {
                    server_type: server.server_type.clone(),
                    url: server.url.clone(),
                    command: server.command.clone(),
                    args: server.args.clone(),
                    env: server.env.clone(),
                    headers: server.headers.clone(),
                },
            );
        }

        let config = CrushConfig {
            schema: CRUSH_SCHEMA.to_string(),
            lsp: BTreeMap::from([(
                "go".to_string(),
                LspConfig {
                    command: "gopls".to_string(),
                },
            )]),
            mcp: mcp_servers,
            permissions: CrushPermissions {
                allowed_tools: all_tools,
            },
        };

        let path = self.base.output_dir.join(CRUSH_CONFIG_FILE);
        self.base
            .write_json(&path, &config)
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }
}

impl ProviderRenderer for CrushRenderer {
    fn name(&self) -> &str {
        PROVIDER_CRUSH
    }

    fn generate(&self, ctx: &Map<String, Value>, provider_config: &ProviderCfg) -> Result<()> {
        self.validate_tools(&provider_config.tools)?;
        self.base.generate_primary(ctx, provider_config)?;
        self.generate_config_files(provider_config)
            .context("failed to generate config files")?;
        Ok(())
    }

    fn validate_tools(&self, tools: &[String]) -> Result<()> {
        validate_against("Crush", tools, VALID_TOOLS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn omits_gopls_mcp_servers() {
        let dir = tempfile::tempdir().unwrap();
        let config: Config = serde_yaml::from_str(
            r#"
version: "1"
project: {name: demo}
providers:
  crush: {template: crush.tpl.md, output: CRUSH.md}
mcp:
  kwb: {enabled: true, name: kwb, command: devx, type: stdio}
  gopls: {enabled: true, name: gopls, command: gopls, type: stdio}
"#,
        )
        .unwrap();

        std::fs::create_dir_all(dir.path().join("tpl")).unwrap();
        std::fs::write(dir.path().join("tpl/crush.tpl.md"), "x").unwrap();

        let renderer =
            CrushRenderer::new(config.clone(), dir.path().join("tpl"), dir.path().to_path_buf());
        renderer
            .generate(&Map::new(), config.providers.get("crush").unwrap())
            .unwrap();

        let crush: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(dir.path().join(".crush.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(crush["$schema"], CRUSH_SCHEMA);
        assert_eq!(crush["lsp"]["go"]["command"], "gopls");
        assert!(crush["mcp"].get("kwb").is_some());
        assert!(crush["mcp"].get("gopls").is_none());
    }
}
