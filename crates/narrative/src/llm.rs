//! LLM-backed narrator over an OpenAI-compatible chat completions API.

use crate::prompts::system_prompt;
use crate::{AnalysisKind, Narrative, NarrativeError, NarrativeGenerator, NarrativeResult};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_MODEL: &str = "gpt-4.1";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// Settings of the LLM backend.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

impl LlmConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(60),
        }
    }

    fn completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

/// Narrator asking a chat model for a JSON narrative.
pub struct LlmNarrator {
    client: Client,
    config: LlmConfig,
}

impl LlmNarrator {
    /// Create a narrator.
    ///
    /// # Arguments
    /// * `config` - API key, endpoint, model and timeout
    pub fn new(config: LlmConfig) -> NarrativeResult<Self> {
        if config.api_key.trim().is_empty() {
            return Err(NarrativeError::NotConfigured);
        }
        let client = Client::builder().timeout(config.timeout).build()?;
        info!("Initialized LLM narrator with model {}", config.model);
        Ok(Self { client, config })
    }

    fn request_body(&self, analysis: &Value) -> Value {
        json!({
            "model": self.config.model,
            "temperature": 0.2,
            "response_format": { "type": "json_object" },
            "messages": [
                { "role": "system", "content": system_prompt(AnalysisKind::of(analysis)) },
                { "role": "user", "content": analysis.to_string() }
            ]
        })
    }
}

/// Extract the narrative from a chat completions response body.
pub fn parse_completion(body: &Value) -> NarrativeResult<Narrative> {
    let content = body
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .ok_or_else(|| NarrativeError::Malformed("no message content".to_string()))?;
    serde_json::from_str(content).map_err(|e| NarrativeError::Malformed(e.to_string()))
}

#[async_trait]
impl NarrativeGenerator for LlmNarrator {
    async fn generate(&self, analysis: &Value) -> NarrativeResult<Narrative> {
        debug!("Requesting narrative from {}", self.config.model);
        let response = self
            .client
            .post(self.config.completions_url())
            .bearer_auth(&self.config.api_key)
            .json(&self.request_body(analysis))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(NarrativeError::Status(response.status().as_u16()));
        }

        let body: Value = response.json().await?;
        parse_completion(&body)
    }
}
