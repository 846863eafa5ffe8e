//! Project collector: configuration-derived context.

use anyhow::Result;
use serde_json::{json, Map, Value};

use crate::agentenv::collector::Collector;
use crate::agentenv::config::Config;

pub const PROJECT_COLLECTOR_NAME: &str = "project";

pub struct ProjectCollector {
    config: Config,
}

impl ProjectCollector {
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

impl Collector for ProjectCollector {
    fn name(&self) -> &str {
        PROJECT_COLLECTOR_NAME
    }

    fn priority(&self) -> i32 {
        5
    }

    fn collect(&self) -> Result<Map<String, Value>> {
        let mut result = Map::new();

        result.insert("name".into(), json!(self.config.project.name));
        result.insert("language".into(), json!(self.config.project.language));
        result.insert(
            "description".into(),
            json!(self.config.project.description),
        );
        result.insert("version".into(), json!(self.config.version));

        if !self.config.project.tags.is_empty() {
            result.insert("tags".into(), json!(self.config.project.tags));
        }
        if !self.config.project.metadata.is_empty() {
            result.insert("metadata".into(), json!(self.config.project.metadata));
        }

        let providers: Vec<&String> = self.config.providers.keys().collect();
        result.insert("providers".into(), json!(providers));

        let mcp_servers: Vec<Value> = self
            .config
            .enabled_mcp()
            .map(|(name, server)| {
                json!({
                    "name": name,
                    "type": server.server_type,
                    "command": server.command,
                })
            })
            .collect();
        if !mcp_servers.is_empty() {
            result.insert("mcp_servers".into(), Value::Array(mcp_servers));
        }

        Ok(result)
    }
}
