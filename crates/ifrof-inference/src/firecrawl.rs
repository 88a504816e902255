//! Scrape API client (Firecrawl-style `POST /v1/scrape`).

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::debug;

use ifrof_core::defaults::SCRAPE_TIMEOUT_SECS;
use ifrof_core::{Error, PageScraper, Result};

use crate::error::{error_from_response, Upstream};
use crate::require_env;

pub const DEFAULT_SCRAPE_URL: &str = "https://api.firecrawl.dev";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScrapeRequest<'a> {
    url: &'a str,
    formats: [&'static str; 1],
    only_main_content: bool,
}

#[derive(Debug, Deserialize)]
struct ScrapeResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Option<ScrapeData>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ScrapeData {
    #[serde(default)]
    markdown: Option<String>,
}

/// Configuration for the scrape API.
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout_seconds: u64,
}

impl ScrapeConfig {
    /// Read `FIRECRAWL_BASE_URL`, `FIRECRAWL_API_KEY` (required), and
    /// `FIRECRAWL_TIMEOUT`.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            base_url: std::env::var("FIRECRAWL_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_SCRAPE_URL.to_string()),
            api_key: require_env("FIRECRAWL_API_KEY")?,
            timeout_seconds: std::env::var("FIRECRAWL_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(SCRAPE_TIMEOUT_SECS),
        })
    }
}

/// Main-content page scraper.
pub struct FirecrawlScraper {
    client: Client,
    config: ScrapeConfig,
}

impl FirecrawlScraper {
    pub fn new(config: ScrapeConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| Error::Scrape(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(ScrapeConfig::from_env()?)
    }
}

#[async_trait]
impl PageScraper for FirecrawlScraper {
    async fn scrape(&self, url: &str) -> Result<String> {
        let start = Instant::now();
        let endpoint = format!("{}/v1/scrape", self.config.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&ScrapeRequest {
                url,
                formats: ["markdown"],
                only_main_content: true,
            })
            .send()
            .await
            .map_err(|e| Error::Scrape(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(error_from_response(Upstream::Scrape, response).await);
        }

        let body: ScrapeResponse = response
            .json()
            .await
            .map_err(|e| Error::Scrape(format!("Failed to parse response: {}", e)))?;

        if !body.success {
            return Err(Error::Scrape(
                body.error
                    .unwrap_or_else(|| "scrape reported success=false".to_string()),
            ));
        }

        let markdown = body.data.and_then(|d| d.markdown).unwrap_or_default();
        debug!(
            subsystem = "inference",
            component = "scraper",
            op = "scrape",
            url,
            content_len = markdown.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Scrape complete"
        );
        Ok(markdown)
    }
}
