//! Generation pipeline: collectors → template context → per-provider
//! renderers.
//!
//! The context is built exactly once per [`Generator::generate`] call and
//! handed read-only to every renderer. Unknown provider names and
//! per-provider render failures are logged and skipped; only failures to
//! build the context abort generation.

use anyhow::Result;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{error, info, warn};

use crate::agentenv::collector::Manager;
use crate::agentenv::collector_env::EnvironmentCollector;
use crate::agentenv::collector_git::GitCollector;
use crate::agentenv::collector_github::GitHubActionsCollector;
use crate::agentenv::collector_notes::{AnalysisCollector, ConventionsCollector};
use crate::agentenv::collector_project::ProjectCollector;
use crate::agentenv::config::Config;
use crate::agentenv::provider::{
    ProviderRenderer, PROVIDER_CLAUDE, PROVIDER_COPILOT, PROVIDER_CRUSH, PROVIDER_GEMINI,
};
use crate::agentenv::provider_claude::ClaudeRenderer;
use crate::agentenv::provider_copilot::CopilotRenderer;
use crate::agentenv::provider_crush::CrushRenderer;
use crate::agentenv::provider_gemini::GeminiRenderer;

pub struct Generator {
    config: Config,
    template_dir: PathBuf,
    output_dir: PathBuf,
    renderers: BTreeMap<String, Box<dyn ProviderRenderer>>,
}

impl Generator {
    pub fn new(config: Config, template_dir: PathBuf, output_dir: PathBuf) -> Self {
        let mut renderers: BTreeMap<String, Box<dyn ProviderRenderer>> = BTreeMap::new();
        renderers.insert(
            PROVIDER_CLAUDE.to_string(),
            Box::new(ClaudeRenderer::new(
                config.clone(),
                template_dir.clone(),
                output_dir.clone(),
            )),
        );
        renderers.insert(
            PROVIDER_GEMINI.to_string(),
            Box::new(GeminiRenderer::new(
                config.clone(),
                template_dir.clone(),
                output_dir.clone(),
            )),
        );
        renderers.insert(
            PROVIDER_CRUSH.to_string(),
            Box::new(CrushRenderer::new(
                config.clone(),
                template_dir.clone(),
                output_dir.clone(),
            )),
        );
        renderers.insert(
            PROVIDER_COPILOT.to_string(),
            Box::new(CopilotRenderer::new(
                config.clone(),
                template_dir.clone(),
                output_dir.clone(),
            )),
        );

        Self {
            config,
            template_dir,
            output_dir,
            renderers,
        }
    }

    pub fn generate(&self) -> Result<()> {
        info!("starting generation");

        let ctx = self.build_template_context();

        for (name, provider_config) in &self.config.providers {
            info!(provider = name, "generating for provider");

            let Some(renderer) = self.renderers.get(name) else {
                warn!(provider = name, "unknown provider");
                continue;
            };

            if let Err(err) = renderer.generate(&ctx, provider_config) {
                error!(provider = name, error = %err, "provider generation failed");
                continue;
            }

            info!(provider = name, "provider generation completed");
        }

        Ok(())
    }

    fn build_template_context(&self) -> Map<String, Value> {
        let mut manager = Manager::new();
        manager.register(Box::new(ProjectCollector::new(self.config.clone())));
        manager.register(Box::new(GitCollector::new(self.output_dir.clone())));
        manager.register(Box::new(EnvironmentCollector::new(
            self.config.env_vars.clone(),
        )));
        manager.register(Box::new(GitHubActionsCollector::new()));
        manager.register(Box::new(AnalysisCollector::new(self.template_dir.clone())));
        manager.register(Box::new(ConventionsCollector::new(self.output_dir.clone())));
        manager.collect()
    }
}
