//! LLM provider clients for commit message generation.
//!
//! Defines the [`Provider`] trait and three HTTP implementations:
//!
//! | Provider | Endpoint | Key env | Model env |
//! |----------|----------|---------|-----------|
//! | `openai` | `api.openai.com/v1/chat/completions` | `OPENAI_API_KEY` | `OPENAI_MODEL` |
//! | `claude` | `api.anthropic.com/v1/messages` | `ANTHROPIC_API_KEY` | `ANTHROPIC_MODEL` |
//! | `gemini` | `generativelanguage.googleapis.com` | `GEMINI_API_KEY` | `GEMINI_MODEL` |
//!
//! A provider is available when its key env var is set; the orchestrator
//! ([`crate::commit::ai`]) owns the per-request deadline, so the clients
//! carry no timeout of their own.

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;

const OPENAI_API: &str = "https://api.openai.com/v1/chat/completions";
const OPENAI_DEFAULT_MODEL: &str = "gpt-5-nano";

const ANTHROPIC_API: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_DEFAULT_MODEL: &str = "claude-3-5-haiku-latest";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const ANTHROPIC_MAX_TOKENS: u32 = 200;

const GEMINI_API: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const GEMINI_DEFAULT_MODEL: &str = "gemini-2.5-flash-lite";

/// A large-language-model backend.
///
/// `ask` must respect cancellation (the orchestrator aborts the task on
/// deadline or fan-out cancellation) and return a non-empty list on
/// success. The orchestrator consumes only element 0.
#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &str;
    fn is_available(&self) -> bool;
    async fn ask(&self, prompt: &str) -> Result<Vec<String>>;
}

/// Construct every provider that has a credential in the environment.
pub fn available_providers() -> Vec<Box<dyn Provider>> {
    let mut providers: Vec<Box<dyn Provider>> = Vec::new();
    let openai = OpenAi::from_env();
    if openai.is_available() {
        providers.push(Box::new(openai));
    }
    let claude = Claude::from_env();
    if claude.is_available() {
        providers.push(Box::new(claude));
    }
    let gemini = Gemini::from_env();
    if gemini.is_available() {
        providers.push(Box::new(gemini));
    }
    providers
}

fn api_error_message(body: &serde_json::Value) -> Option<String> {
    body.get("error")
        .and_then(|e| e.get("message"))
        .and_then(|m| m.as_str())
        .map(|s| s.to_string())
}

// ============ OpenAI ============

pub struct OpenAi {
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl OpenAi {
    pub fn from_env() -> Self {
        Self {
            api_key: std::env::var("OPENAI_API_KEY").unwrap_or_default(),
            model: std::env::var("OPENAI_MODEL")
                .unwrap_or_else(|_| OPENAI_DEFAULT_MODEL.to_string()),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Provider for OpenAi {
    fn name(&self) -> &str {
        "openai"
    }

    fn is_available(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn ask(&self, prompt: &str) -> Result<Vec<String>> {
        if !self.is_available() {
            bail!("OpenAI api key not available");
        }

        let body = serde_json::json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
            "n": 1,
        });

        let response = self
            .client
            .post(OPENAI_API)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await?;

        let json: serde_json::Value = response.json().await?;
        if let Some(message) = api_error_message(&json) {
            bail!("OpenAI API error: {}", message);
        }

        let text = json
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|t| t.as_str())
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| anyhow!("no content received from OpenAI"))?;

        Ok(vec![text.to_string()])
    }
}

// ============ Claude ============

pub struct Claude {
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl Claude {
    pub fn from_env() -> Self {
        Self {
            api_key: std::env::var("ANTHROPIC_API_KEY").unwrap_or_default(),
            model: std::env::var("ANTHROPIC_MODEL")
                .unwrap_or_else(|_| ANTHROPIC_DEFAULT_MODEL.to_string()),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Provider for Claude {
    fn name(&self) -> &str {
        "claude"
    }

    fn is_available(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn ask(&self, prompt: &str) -> Result<Vec<String>> {
        if !self.is_available() {
            bail!("anthropic API key not available");
        }

        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": ANTHROPIC_MAX_TOKENS,
            "messages": [{"role": "user", "content": prompt}],
        });

        let response = self
            .client
            .post(ANTHROPIC_API)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await?;

        let json: serde_json::Value = response.json().await?;
        if let Some(message) = api_error_message(&json) {
            bail!("Claude API error: {}", message);
        }

        let text = json
            .get("content")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("text"))
            .and_then(|t| t.as_str())
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| anyhow!("no content received from Claude"))?;

        Ok(vec![text.to_string()])
    }
}

// ============ Gemini ============

pub struct Gemini {
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl Gemini {
    pub fn from_env() -> Self {
        Self {
            api_key: std::env::var("GEMINI_API_KEY").unwrap_or_default(),
            model: std::env::var("GEMINI_MODEL")
                .unwrap_or_else(|_| GEMINI_DEFAULT_MODEL.to_string()),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Provider for Gemini {
    fn name(&self) -> &str {
        "gemini"
    }

    fn is_available(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn ask(&self, prompt: &str) -> Result<Vec<String>> {
        if !self.is_available() {
            bail!("google API key not available");
        }

        let body = serde_json::json!({
            "contents": [{"parts": [{"text": prompt}]}],
        });

        let url = format!("{}/{}:generateContent", GEMINI_API, self.model);
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let json: serde_json::Value = response.json().await?;
        if let Some(message) = api_error_message(&json) {
            bail!("Gemini API error: {}", message);
        }

        let text = json
            .get("candidates")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("content"))
            .and_then(|c| c.get("parts"))
            .and_then(|p| p.get(0))
            .and_then(|p| p.get("text"))
            .and_then(|t| t.as_str())
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| anyhow!("no content received from Gemini"))?;

        Ok(vec![text.to_string()])
    }
}
