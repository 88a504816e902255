//! In-memory fakes of the pipeline's external seams.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ifrof_search::testing::*;
//!
//! let llm = Arc::new(ScriptedLlm::new().then_ok(r#"{"productTitle_en":"Bottle"}"#));
//! let repo = Arc::new(InMemorySearchRepository::new());
//! ```

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use ifrof_core::defaults::SEARCH_RETENTION_DAYS;
use ifrof_core::{
    AuthPrincipal, Error, FactoryCandidate, FactoryResult, GenerationBackend, ImageInput,
    NewSearch, NormalizedProduct, PageScraper, RateLimitDecision, RateLimitStore, Result, Search,
    SearchRepository, SearchStatus, TokenVerifier, Verification, WebSearchResult, WebSearcher,
};

// =============================================================================
// LLM
// =============================================================================

/// A recorded generation call.
#[derive(Debug, Clone)]
pub struct LlmCall {
    pub system: String,
    pub prompt: String,
    pub with_image: bool,
}

/// LLM that replays queued responses in order.
///
/// Calls beyond the script fail with an inference error.
#[derive(Default)]
pub struct ScriptedLlm {
    script: Mutex<VecDeque<std::result::Result<String, String>>>,
    calls: Mutex<Vec<LlmCall>>,
}

impl ScriptedLlm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful response.
    pub fn then_ok(self, response: impl Into<String>) -> Self {
        self.script.lock().unwrap().push_back(Ok(response.into()));
        self
    }

    /// Queue a failure.
    pub fn then_err(self, message: impl Into<String>) -> Self {
        self.script.lock().unwrap().push_back(Err(message.into()));
        self
    }

    pub fn calls(&self) -> Vec<LlmCall> {
        self.calls.lock().unwrap().clone()
    }

    fn next(&self, system: &str, prompt: &str, with_image: bool) -> Result<String> {
        self.calls.lock().unwrap().push(LlmCall {
            system: system.to_string(),
            prompt: prompt.to_string(),
            with_image,
        });
        match self.script.lock().unwrap().pop_front() {
            Some(Ok(text)) => Ok(text),
            Some(Err(msg)) => Err(Error::Inference(msg)),
            None => Err(Error::Inference("no scripted response left".to_string())),
        }
    }
}

#[async_trait]
impl GenerationBackend for ScriptedLlm {
    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String> {
        self.next(system, prompt, false)
    }

    async fn generate_with_image(
        &self,
        system: &str,
        prompt: &str,
        _image: &ImageInput,
    ) -> Result<String> {
        self.next(system, prompt, true)
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

// =============================================================================
// WEB SEARCH AND SCRAPE
// =============================================================================

/// Web searcher returning one canned answer for every query.
pub struct FakeSearcher {
    answer: Option<(String, Vec<String>)>,
    failing: HashSet<String>,
    queries: Mutex<Vec<String>>,
}

impl FakeSearcher {
    /// Answers every query with `content` and `citations`.
    pub fn answering(content: &str, citations: &[&str]) -> Self {
        Self {
            answer: Some((
                content.to_string(),
                citations.iter().map(|c| c.to_string()).collect(),
            )),
            failing: HashSet::new(),
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Fails every query.
    pub fn failing() -> Self {
        Self {
            answer: None,
            failing: HashSet::new(),
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Fail this specific query.
    pub fn failing_on(mut self, query: &str) -> Self {
        self.failing.insert(query.to_string());
        self
    }

    /// Queries received so far, in order.
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl WebSearcher for FakeSearcher {
    async fn search(&self, query: &str) -> Result<WebSearchResult> {
        self.queries.lock().unwrap().push(query.to_string());
        match &self.answer {
            Some((content, citations)) if !self.failing.contains(query) => Ok(WebSearchResult {
                query: query.to_string(),
                content: content.clone(),
                citations: citations.clone(),
            }),
            _ => Err(Error::Search(format!("search failed for {}", query))),
        }
    }
}

/// Scraper returning fixed text or failing.
pub struct FakeScraper {
    page: Option<String>,
    urls: Mutex<Vec<String>>,
}

impl FakeScraper {
    pub fn returning(text: &str) -> Self {
        Self {
            page: Some(text.to_string()),
            urls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            page: None,
            urls: Mutex::new(Vec::new()),
        }
    }

    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageScraper for FakeScraper {
    async fn scrape(&self, url: &str) -> Result<String> {
        self.urls.lock().unwrap().push(url.to_string());
        self.page
            .clone()
            .ok_or_else(|| Error::Scrape(format!("scrape failed for {}", url)))
    }
}

// =============================================================================
// STORAGE
// =============================================================================

/// Daily quota kept in memory with a fixed reset instant.
pub struct InMemoryRateLimits {
    daily_limit: i32,
    reset_at: DateTime<Utc>,
    unavailable: bool,
    used: Mutex<HashMap<Uuid, i32>>,
}

impl InMemoryRateLimits {
    pub fn new(daily_limit: i32) -> Self {
        Self {
            daily_limit,
            reset_at: Utc::now() + Duration::hours(1),
            unavailable: false,
            used: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_reset_at(mut self, reset_at: DateTime<Utc>) -> Self {
        self.reset_at = reset_at;
        self
    }

    /// Every check fails as if the store were down.
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::new(0)
        }
    }

    pub fn used(&self, user_id: Uuid) -> i32 {
        self.used.lock().unwrap().get(&user_id).copied().unwrap_or(0)
    }
}

#[async_trait]
impl RateLimitStore for InMemoryRateLimits {
    async fn check_and_consume(&self, user_id: Uuid) -> Result<RateLimitDecision> {
        if self.unavailable {
            return Err(Error::RateLimit("quota store unreachable".to_string()));
        }
        let mut used = self.used.lock().unwrap();
        let count = used.entry(user_id).or_insert(0);
        let allowed = *count < self.daily_limit;
        if allowed {
            *count += 1;
        }
        Ok(RateLimitDecision {
            allowed,
            remaining: (self.daily_limit - *count).max(0),
            reset_at: self.reset_at,
        })
    }
}

/// Search repository kept in memory, with the same guarded transitions as
/// the PostgreSQL one.
#[derive(Default)]
pub struct InMemorySearchRepository {
    searches: Mutex<HashMap<Uuid, Search>>,
    results: Mutex<Vec<FactoryResult>>,
    fail_inserts: bool,
    fail_create: bool,
}

impl InMemorySearchRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every completion that carries accepted results fails.
    pub fn failing_inserts() -> Self {
        Self {
            fail_inserts: true,
            ..Self::default()
        }
    }

    /// Every `create` fails.
    pub fn failing_create() -> Self {
        Self {
            fail_create: true,
            ..Self::default()
        }
    }

    pub fn all_searches(&self) -> Vec<Search> {
        self.searches.lock().unwrap().values().cloned().collect()
    }

    pub fn all_results(&self) -> Vec<FactoryResult> {
        self.results.lock().unwrap().clone()
    }

    fn update(&self, id: Uuid, f: impl FnOnce(&mut Search)) -> Result<()> {
        let mut searches = self.searches.lock().unwrap();
        match searches.get_mut(&id) {
            Some(search) if search.status == SearchStatus::Processing => {
                f(search);
                search.updated_at = Utc::now();
                Ok(())
            }
            _ => Err(Error::NotFound(format!("processing search {}", id))),
        }
    }
}

#[async_trait]
impl SearchRepository for InMemorySearchRepository {
    async fn create(&self, req: NewSearch) -> Result<Uuid> {
        if self.fail_create {
            return Err(Error::Internal("create disabled".to_string()));
        }
        let id = Uuid::now_v7();
        let now = Utc::now();
        self.searches.lock().unwrap().insert(
            id,
            Search {
                id,
                search_type: req.search_type,
                input_value: req.input_value,
                optional_params: req.optional_params,
                normalized_product: None,
                status: SearchStatus::Processing,
                error_message: None,
                user_id: req.user_id,
                created_at: now,
                updated_at: now,
                expires_at: now + Duration::days(SEARCH_RETENTION_DAYS as i64),
            },
        );
        Ok(id)
    }

    async fn set_normalized_product(&self, id: Uuid, product: &NormalizedProduct) -> Result<()> {
        self.update(id, |s| s.normalized_product = Some(product.clone()))
    }

    async fn mark_completed(
        &self,
        id: Uuid,
        accepted: &[(FactoryCandidate, Verification)],
    ) -> Result<Vec<Uuid>> {
        if self.fail_inserts && !accepted.is_empty() {
            return Err(Error::Internal("insert disabled".to_string()));
        }
        let now = Utc::now();
        let rows: Vec<FactoryResult> = accepted
            .iter()
            .map(|(candidate, verification)| FactoryResult {
                id: Uuid::now_v7(),
                search_id: id,
                name: candidate.name.trim().to_string(),
                name_zh: candidate.name_zh.clone(),
                location: candidate.location().map(str::to_string),
                website: candidate.website().map(str::to_string),
                links: candidate.links.clone(),
                score: verification.score,
                why_factory: verification.why_factory.clone(),
                evidence: verification.evidence.clone(),
                red_flags: verification.red_flags.clone(),
                verification_steps: verification.verification_steps.clone(),
                is_excluded: false,
                created_at: now,
            })
            .collect();

        self.update(id, |s| s.status = SearchStatus::Completed)?;
        let ids = rows.iter().map(|r| r.id).collect();
        self.results.lock().unwrap().extend(rows);
        Ok(ids)
    }

    async fn mark_failed(&self, id: Uuid, message: &str) -> Result<()> {
        self.update(id, |s| {
            s.status = SearchStatus::Failed;
            s.error_message = Some(message.to_string());
        })
    }

    async fn get(&self, id: Uuid) -> Result<Option<Search>> {
        Ok(self.searches.lock().unwrap().get(&id).cloned())
    }

    async fn list_results(&self, search_id: Uuid) -> Result<Vec<FactoryResult>> {
        let mut results: Vec<FactoryResult> = self
            .results
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.search_id == search_id && !r.is_excluded)
            .cloned()
            .collect();
        results.sort_by(|a, b| b.score.cmp(&a.score).then(a.created_at.cmp(&b.created_at)));
        Ok(results)
    }
}

// =============================================================================
// AUTH
// =============================================================================

/// Token verifier backed by a fixed token table.
#[derive(Default)]
pub struct StaticTokens {
    tokens: HashMap<String, AuthPrincipal>,
    broken: bool,
}

impl StaticTokens {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `token` for `user_id`.
    pub fn with_token(mut self, token: &str, user_id: Uuid) -> Self {
        self.tokens.insert(
            token.to_string(),
            AuthPrincipal {
                user_id,
                token_id: Uuid::new_v4(),
            },
        );
        self
    }

    /// Every lookup fails as if the store were down.
    pub fn broken() -> Self {
        Self {
            broken: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl TokenVerifier for StaticTokens {
    async fn verify(&self, token: &str) -> Result<Option<AuthPrincipal>> {
        if self.broken {
            return Err(Error::Internal("token store unreachable".to_string()));
        }
        Ok(self.tokens.get(token).cloned())
    }
}
