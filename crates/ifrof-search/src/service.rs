//! Factory search pipeline orchestration.
//!
//! validate -> rate limit -> create search -> scrape (url only) -> normalize
//! -> discover -> extract -> verify -> persist accepted -> complete.
//!
//! Failures before the search row exists are reported without a search id.
//! Failures after it exists mark the row `failed` with the internal message.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use ifrof_core::{
    FactoryResult, GenerationBackend, NewSearch, NormalizedProduct, PageScraper, RateLimitStore,
    Result, Search, SearchInput, SearchRepository, ValidatedSearch, WebSearcher,
};

use crate::discovery::{build_search_queries, WebDiscovery};
use crate::extractor::CandidateExtractor;
use crate::normalizer::ProductNormalizer;
use crate::validation::{validate, SearchRequestBody, ValidationError};
use crate::verifier::verify;

/// Why a pipeline run did not produce an outcome.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("daily search limit reached, retry in {retry_after_secs}s")]
    RateLimited {
        retry_after_secs: u64,
        reset_at: DateTime<Utc>,
    },

    #[error("rate limit check unavailable: {0}")]
    RateLimitUnavailable(String),

    #[error("could not create search: {0}")]
    Persistence(String),

    #[error("search {search_id} failed: {message}")]
    Failed { search_id: Uuid, message: String },
}

impl PipelineError {
    /// Search id, if the row was created before the failure.
    pub fn search_id(&self) -> Option<Uuid> {
        match self {
            Self::Failed { search_id, .. } => Some(*search_id),
            _ => None,
        }
    }
}

/// Successful pipeline result returned to the client.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchOutcome {
    pub search_id: Uuid,
    pub normalized_product: NormalizedProduct,
    pub factories_count: usize,
    pub excluded_count: usize,
}

/// A stored search with its visible factory results.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchDetails {
    pub search: Search,
    pub factories: Vec<FactoryResult>,
}

/// Runs factory searches end to end.
#[derive(Clone)]
pub struct FactorySearchService {
    rate_limits: Arc<dyn RateLimitStore>,
    searches: Arc<dyn SearchRepository>,
    scraper: Arc<dyn PageScraper>,
    normalizer: ProductNormalizer,
    discovery: WebDiscovery,
    extractor: CandidateExtractor,
}

impl FactorySearchService {
    pub fn new(
        llm: Arc<dyn GenerationBackend>,
        searcher: Arc<dyn WebSearcher>,
        scraper: Arc<dyn PageScraper>,
        rate_limits: Arc<dyn RateLimitStore>,
        searches: Arc<dyn SearchRepository>,
    ) -> Self {
        Self {
            rate_limits,
            searches,
            scraper,
            normalizer: ProductNormalizer::new(llm.clone()),
            discovery: WebDiscovery::new(searcher),
            extractor: CandidateExtractor::new(llm),
        }
    }

    /// Run one search for `user_id`.
    pub async fn run(
        &self,
        user_id: Uuid,
        body: &SearchRequestBody,
    ) -> std::result::Result<SearchOutcome, PipelineError> {
        let validated = validate(body)?;

        let decision = self
            .rate_limits
            .check_and_consume(user_id)
            .await
            .map_err(|e| {
                error!(
                    subsystem = "search",
                    component = "service",
                    user_id = %user_id,
                    error = %e,
                    "Rate limit check failed"
                );
                PipelineError::RateLimitUnavailable(e.to_string())
            })?;

        if !decision.allowed {
            info!(
                subsystem = "search",
                component = "service",
                user_id = %user_id,
                reset_at = %decision.reset_at,
                "Daily search limit reached"
            );
            return Err(PipelineError::RateLimited {
                retry_after_secs: decision.retry_after_secs(Utc::now()),
                reset_at: decision.reset_at,
            });
        }

        let search_id = self
            .searches
            .create(NewSearch {
                user_id,
                search_type: validated.input.search_type(),
                input_value: validated.input.stored_value(),
                optional_params: validated.optional.clone(),
            })
            .await
            .map_err(|e| {
                error!(
                    subsystem = "search",
                    component = "service",
                    user_id = %user_id,
                    error = %e,
                    "Could not create search"
                );
                PipelineError::Persistence(e.to_string())
            })?;

        info!(
            subsystem = "search",
            component = "service",
            op = "run",
            search_id = %search_id,
            user_id = %user_id,
            search_type = %validated.input.search_type(),
            remaining = decision.remaining,
            "Search started"
        );

        let start = Instant::now();
        match self.execute(search_id, &validated).await {
            Ok(outcome) => {
                info!(
                    subsystem = "search",
                    component = "service",
                    op = "run",
                    search_id = %search_id,
                    result_count = outcome.factories_count,
                    excluded = outcome.excluded_count,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Search completed"
                );
                Ok(outcome)
            }
            Err(e) => {
                let message = e.to_string();
                error!(
                    subsystem = "search",
                    component = "service",
                    op = "run",
                    search_id = %search_id,
                    error = %message,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Search failed"
                );
                if let Err(mark_err) = self.searches.mark_failed(search_id, &message).await {
                    error!(
                        subsystem = "search",
                        component = "service",
                        search_id = %search_id,
                        error = %mark_err,
                        "Could not mark search as failed"
                    );
                }
                Err(PipelineError::Failed { search_id, message })
            }
        }
    }

    async fn execute(&self, search_id: Uuid, validated: &ValidatedSearch) -> Result<SearchOutcome> {
        let scraped = match &validated.input {
            SearchInput::Url(url) => Some(self.scrape_or_empty(url).await),
            _ => None,
        };

        let product = self
            .normalizer
            .normalize(validated, scraped.as_deref())
            .await;
        self.searches
            .set_normalized_product(search_id, &product)
            .await?;

        let queries = build_search_queries(&product);
        let report = self.discovery.discover(&queries).await;
        let candidates = self.extractor.extract(&product, &report.results).await;

        let mut accepted = Vec::new();
        let mut excluded_count = 0;
        for candidate in candidates {
            let verification = verify(&candidate);
            if verification.is_accepted {
                accepted.push((candidate, verification));
            } else {
                excluded_count += 1;
            }
        }

        let factories_count = self.searches.mark_completed(search_id, &accepted).await?.len();

        Ok(SearchOutcome {
            search_id,
            normalized_product: product,
            factories_count,
            excluded_count,
        })
    }

    async fn scrape_or_empty(&self, url: &str) -> String {
        match self.scraper.scrape(url).await {
            Ok(text) => text,
            Err(e) => {
                warn!(
                    subsystem = "search",
                    component = "service",
                    url,
                    error = %e,
                    "Scrape failed, normalizing from the bare url"
                );
                String::new()
            }
        }
    }

    /// A search owned by `user_id`, with its non-excluded results.
    ///
    /// Searches of other users are reported as absent.
    pub async fn find_for_user(&self, user_id: Uuid, id: Uuid) -> Result<Option<SearchDetails>> {
        let search = match self.searches.get(id).await? {
            Some(search) if search.user_id == user_id => search,
            _ => return Ok(None),
        };
        let factories = self.searches.list_results(id).await?;
        Ok(Some(SearchDetails { search, factories }))
    }
}
