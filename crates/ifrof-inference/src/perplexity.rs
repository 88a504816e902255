//! Web search/answer API client (Perplexity-style `/chat/completions`).

use async_trait::async_trait;
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::debug;

use ifrof_core::defaults::SEARCH_TIMEOUT_SECS;
use ifrof_core::{Error, Result, WebSearchResult, WebSearcher};

use crate::error::{error_from_response, Upstream};
use crate::openai::{ChatCompletionRequest, ChatCompletionResponse, ChatMessage};
use crate::require_env;

pub const DEFAULT_SEARCH_URL: &str = "https://api.perplexity.ai";
pub const DEFAULT_SEARCH_MODEL: &str = "sonar";

/// Only sources from the last month are considered.
pub const SEARCH_RECENCY: &str = "month";

const SEARCH_SYSTEM_PROMPT: &str = "You are a sourcing researcher. Find real manufacturers \
and factories (not trading companies or resellers) that produce the requested product. \
For each company give its full name, Chinese name if known, city and province, official \
website, marketplace listings, and any evidence of own production lines, factory area, \
workers, or certifications. Mention clearly when a company looks like a trader.";

/// Configuration for the web search/answer API.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub timeout_seconds: u64,
}

impl SearchConfig {
    /// Read `PERPLEXITY_BASE_URL`, `PERPLEXITY_API_KEY` (required),
    /// `PERPLEXITY_MODEL`, and `PERPLEXITY_TIMEOUT`.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            base_url: std::env::var("PERPLEXITY_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_SEARCH_URL.to_string()),
            api_key: require_env("PERPLEXITY_API_KEY")?,
            model: std::env::var("PERPLEXITY_MODEL")
                .unwrap_or_else(|_| DEFAULT_SEARCH_MODEL.to_string()),
            timeout_seconds: std::env::var("PERPLEXITY_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(SEARCH_TIMEOUT_SECS),
        })
    }
}

/// Manufacturer-focused web searcher.
pub struct PerplexitySearcher {
    client: Client,
    config: SearchConfig,
}

impl PerplexitySearcher {
    pub fn new(config: SearchConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| Error::Search(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(SearchConfig::from_env()?)
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }
}

#[async_trait]
impl WebSearcher for PerplexitySearcher {
    async fn search(&self, query: &str) -> Result<WebSearchResult> {
        let start = Instant::now();
        let request = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage::system(SEARCH_SYSTEM_PROMPT),
                ChatMessage::user(query),
            ],
            temperature: None,
            max_tokens: None,
            response_format: None,
            search_recency_filter: Some(SEARCH_RECENCY.to_string()),
        };

        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Search(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(error_from_response(Upstream::Search, response).await);
        }

        let result: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| Error::Search(format!("Failed to parse response: {}", e)))?;

        let content = result.first_content();
        debug!(
            subsystem = "inference",
            component = "web_search",
            op = "search",
            query,
            citations = result.citations.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Search complete"
        );

        Ok(WebSearchResult {
            query: query.to_string(),
            content,
            citations: result.citations,
        })
    }
}
