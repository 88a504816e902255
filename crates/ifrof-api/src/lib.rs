//! # ifrof-api
//!
//! HTTP surface of the IFROF factory search.
//!
//! Routes:
//! - `POST /functions/v1/factory-search` (also `POST /api/v1/factory-search`)
//! - `GET /api/v1/searches/:id`
//! - `GET /health`

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod maintenance;
pub mod messages;

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{DefaultBodyLimit, Request, State};
use axum::http::{header, HeaderName, Method};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use governor::clock::{Clock, DefaultClock};
use governor::{Quota, RateLimiter};
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{
    MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use tower_http::trace::TraceLayer;
use tracing::warn;
use uuid::Uuid;

use ifrof_core::TokenVerifier;
use ifrof_search::FactorySearchService;

use crate::config::{BurstLimitConfig, HttpConfig};
use crate::error::ApiError;
use crate::messages::Locale;

pub use config::AppConfig;

/// Process-wide request limiter (not keyed by caller).
pub type GlobalRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Generates time-ordered UUIDv7 request ids.
#[derive(Clone, Default)]
struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: FactorySearchService,
    pub tokens: Arc<dyn TokenVerifier>,
    /// None when burst limiting is disabled.
    pub burst_limiter: Option<Arc<GlobalRateLimiter>>,
}

impl AppState {
    pub fn new(service: FactorySearchService, tokens: Arc<dyn TokenVerifier>) -> Self {
        Self {
            service,
            tokens,
            burst_limiter: None,
        }
    }

    pub fn with_burst_limit(mut self, config: &BurstLimitConfig) -> Self {
        self.burst_limiter = build_burst_limiter(config);
        self
    }
}

/// Allow `requests` per `period_secs`, refilled evenly.
pub fn build_burst_limiter(config: &BurstLimitConfig) -> Option<Arc<GlobalRateLimiter>> {
    if !config.enabled {
        return None;
    }
    let (Some(burst), true) = (NonZeroU32::new(config.requests), config.period_secs > 0) else {
        warn!(
            subsystem = "api",
            requests = config.requests,
            period_secs = config.period_secs,
            "Burst limit misconfigured, disabling"
        );
        return None;
    };
    let quota = Quota::with_period(Duration::from_secs(config.period_secs) / burst.get())?
        .allow_burst(burst);
    Some(Arc::new(RateLimiter::direct(quota)))
}

async fn burst_limit_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if let Some(limiter) = &state.burst_limiter {
        if let Err(not_until) = limiter.check() {
            let wait = not_until.wait_time_from(DefaultClock::default().now());
            let retry_after_secs = wait.as_secs() + u64::from(wait.subsec_nanos() > 0);
            warn!(subsystem = "api", retry_after_secs, "Burst limit exceeded");
            return ApiError::TooManyRequests {
                retry_after_secs: retry_after_secs.max(1),
                locale: Locale::from_headers(request.headers()),
            }
            .into_response();
        }
    }
    next.run(request).await
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT_LANGUAGE,
            HeaderName::from_static("x-client-info"),
            HeaderName::from_static("apikey"),
        ])
        .expose_headers([header::RETRY_AFTER, HeaderName::from_static("x-request-id")])
        .max_age(Duration::from_secs(3600))
}

/// Build the application router.
pub fn router(state: AppState, http: &HttpConfig) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/functions/v1/factory-search", post(handlers::factory_search))
        .route("/api/v1/factory-search", post(handlers::factory_search))
        .route("/api/v1/searches/:id", get(handlers::get_search))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            burst_limit_middleware,
        ))
        .layer(DefaultBodyLimit::max(http.max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .layer(cors_layer())
        .with_state(state)
}
