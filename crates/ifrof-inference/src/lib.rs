//! # ifrof-inference
//!
//! Clients for the external services used by the factory search:
//!
//! - [`openai::LlmGateway`]: OpenAI-compatible chat completions with vision
//!   input, implementing [`ifrof_core::GenerationBackend`]
//! - [`perplexity::PerplexitySearcher`]: web search/answer API, implementing
//!   [`ifrof_core::WebSearcher`]
//! - [`firecrawl::FirecrawlScraper`]: page scrape API, implementing
//!   [`ifrof_core::PageScraper`]
//!
//! plus [`json`], which recovers JSON payloads from free-form model output.

pub mod error;
pub mod firecrawl;
pub mod json;
pub mod openai;
pub mod perplexity;

pub use error::{to_ifrof_error, Upstream, UpstreamErrorCode};
pub use firecrawl::{FirecrawlScraper, ScrapeConfig};
pub use json::{extract_json_value, parse_lenient, parse_lenient_list};
pub use openai::{LlmConfig, LlmGateway};
pub use perplexity::{PerplexitySearcher, SearchConfig};

use ifrof_core::{Error, Result};

/// Read a required, non-empty environment variable.
pub(crate) fn require_env(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(Error::Config(format!("{} is not set", name))),
    }
}
