//! Trait definitions at the pipeline's seams.
//!
//! Every external collaborator (LLM gateway, web search API, scrape API,
//! relational store) sits behind one of these traits so the pipeline can be
//! driven by real clients in production and by in-memory fakes in tests.

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    AuthPrincipal, FactoryCandidate, FactoryResult, ImageInput, NewSearch, NormalizedProduct,
    RateLimitDecision, Result, Search, Verification, WebSearchResult,
};

// =============================================================================
// INFERENCE TRAITS
// =============================================================================

/// Backend for text generation (LLM chat completions).
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Generate text given a prompt.
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.generate_with_system("", prompt).await
    }

    /// Generate text with system context.
    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String>;

    /// Generate text from a prompt plus an attached image.
    async fn generate_with_image(
        &self,
        system: &str,
        prompt: &str,
        image: &ImageInput,
    ) -> Result<String>;

    /// Get the model name being used.
    fn model_name(&self) -> &str;
}

// =============================================================================
// DISCOVERY TRAITS
// =============================================================================

/// Web search/answer API returning manufacturer-focused results.
#[async_trait]
pub trait WebSearcher: Send + Sync {
    /// Run one query.
    async fn search(&self, query: &str) -> Result<WebSearchResult>;
}

/// Scrape API returning the main content of a page.
#[async_trait]
pub trait PageScraper: Send + Sync {
    /// Fetch the main textual content of `url`.
    async fn scrape(&self, url: &str) -> Result<String>;
}

// =============================================================================
// STORAGE TRAITS
// =============================================================================

/// Atomic per-user daily quota.
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Check the quota and consume one unit if allowed.
    async fn check_and_consume(&self, user_id: Uuid) -> Result<RateLimitDecision>;
}

/// Repository for searches and their accepted factory results.
#[async_trait]
pub trait SearchRepository: Send + Sync {
    /// Insert a search in `processing` state.
    async fn create(&self, req: NewSearch) -> Result<Uuid>;

    /// Store the normalized product of a processing search.
    async fn set_normalized_product(&self, id: Uuid, product: &NormalizedProduct) -> Result<()>;

    /// Persist the accepted candidates and transition `processing -> completed`
    /// as one unit. On error nothing is stored. Returns the new result ids.
    async fn mark_completed(
        &self,
        id: Uuid,
        accepted: &[(FactoryCandidate, Verification)],
    ) -> Result<Vec<Uuid>>;

    /// Transition `processing -> failed`, keeping the internal message server-side.
    async fn mark_failed(&self, id: Uuid, message: &str) -> Result<()>;

    /// Fetch a search.
    async fn get(&self, id: Uuid) -> Result<Option<Search>>;

    /// Non-excluded results of a search, best score first.
    async fn list_results(&self, search_id: Uuid) -> Result<Vec<FactoryResult>>;
}

/// Resolves bearer tokens to principals.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    /// `Ok(None)` for unknown, expired, or revoked tokens.
    async fn verify(&self, token: &str) -> Result<Option<AuthPrincipal>>;
}
