//! OpenAI-compatible LLM gateway backend.

use async_trait::async_trait;
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use ifrof_core::defaults::LLM_TIMEOUT_SECS;
use ifrof_core::{Error, GenerationBackend, ImageInput, Result};

use super::types::*;
use crate::error::{error_from_response, Upstream};
use crate::require_env;

/// Default gateway endpoint.
pub const DEFAULT_LLM_URL: &str = "https://api.openai.com/v1";

/// Default chat model. Must accept image input for image searches.
pub const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";

/// Default sampling temperature. Low, since every caller wants JSON.
pub const DEFAULT_TEMPERATURE: f32 = 0.2;

/// Configuration for the LLM gateway.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Base URL for the API endpoint.
    pub base_url: String,
    /// Bearer token for the gateway.
    pub api_key: Option<String>,
    /// Chat model.
    pub model: String,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
    /// Sampling temperature.
    pub temperature: Option<f32>,
    /// Ask for `response_format: {"type": "json_object"}`.
    pub json_mode: bool,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_LLM_URL.to_string(),
            api_key: None,
            model: DEFAULT_LLM_MODEL.to_string(),
            timeout_seconds: LLM_TIMEOUT_SECS,
            temperature: Some(DEFAULT_TEMPERATURE),
            json_mode: true,
        }
    }
}

impl LlmConfig {
    /// Read `LLM_BASE_URL`, `LLM_API_KEY` (required), `LLM_MODEL`,
    /// `LLM_TIMEOUT`, and `LLM_JSON_MODE`.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            base_url: std::env::var("LLM_BASE_URL").unwrap_or_else(|_| DEFAULT_LLM_URL.to_string()),
            api_key: Some(require_env("LLM_API_KEY")?),
            model: std::env::var("LLM_MODEL").unwrap_or_else(|_| DEFAULT_LLM_MODEL.to_string()),
            timeout_seconds: std::env::var("LLM_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(LLM_TIMEOUT_SECS),
            temperature: Some(DEFAULT_TEMPERATURE),
            json_mode: std::env::var("LLM_JSON_MODE")
                .map(|v| v == "1" || v.to_lowercase() == "true")
                .unwrap_or(true),
        })
    }
}

/// Chat-completions client for the LLM gateway.
pub struct LlmGateway {
    client: Client,
    config: LlmConfig,
}

impl LlmGateway {
    /// Create a new gateway client with the given configuration.
    pub fn new(config: LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| Error::Inference(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            subsystem = "inference",
            component = "llm_gateway",
            url = %config.base_url,
            model = %config.model,
            timeout_secs = config.timeout_seconds,
            "Initializing LLM gateway"
        );

        Ok(Self { client, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(LlmConfig::from_env()?)
    }

    /// Get the current configuration.
    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    /// Build a request with authentication if configured.
    fn build_request(&self, endpoint: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), endpoint);
        let mut req = self.client.post(&url);

        if let Some(ref api_key) = self.config.api_key {
            req = req.bearer_auth(api_key);
        }

        req.header("Content-Type", "application/json")
    }

    async fn complete(&self, op: &'static str, messages: Vec<ChatMessage>) -> Result<String> {
        let start = Instant::now();
        let request = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages,
            temperature: self.config.temperature,
            max_tokens: None,
            response_format: self.config.json_mode.then(ResponseFormat::json_object),
            search_recency_filter: None,
        };

        let response = self
            .build_request("/chat/completions")
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Inference(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(error_from_response(Upstream::Llm, response).await);
        }

        let result: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| Error::Inference(format!("Failed to parse response: {}", e)))?;

        let content = result.first_content();
        debug!(
            subsystem = "inference",
            component = "llm_gateway",
            op,
            model = %self.config.model,
            response_len = content.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Generation complete"
        );
        Ok(content)
    }
}

fn messages_for(system: &str, user: ChatMessage) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(2);
    if !system.is_empty() {
        messages.push(ChatMessage::system(system));
    }
    messages.push(user);
    messages
}

#[async_trait]
impl GenerationBackend for LlmGateway {
    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String> {
        self.complete("generate", messages_for(system, ChatMessage::user(prompt)))
            .await
    }

    async fn generate_with_image(
        &self,
        system: &str,
        prompt: &str,
        image: &ImageInput,
    ) -> Result<String> {
        let user = ChatMessage::user_with_image(prompt, image.data_url());
        self.complete("generate_with_image", messages_for(system, user))
            .await
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LlmConfig::default();
        assert_eq!(config.base_url, DEFAULT_LLM_URL);
        assert_eq!(config.model, DEFAULT_LLM_MODEL);
        assert_eq!(config.timeout_seconds, LLM_TIMEOUT_SECS);
        assert!(config.api_key.is_none());
        assert!(config.json_mode);
    }

    #[test]
    fn test_model_name_accessor() {
        let gateway = LlmGateway::new(LlmConfig {
            model: "vision-model".to_string(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(gateway.model_name(), "vision-model");
    }

    #[test]
    fn test_messages_skip_empty_system() {
        let messages = messages_for("", ChatMessage::user("hi"));
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, "user");

        let messages = messages_for("be terse", ChatMessage::user("hi"));
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
    }
}
