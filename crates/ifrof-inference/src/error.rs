//! Upstream HTTP error classification.
//!
//! All three external services report failures as a non-2xx status plus a
//! JSON body in one of two shapes: `{"error": {"message": ...}}` or
//! `{"error": "..."}`. Both are mapped onto `ifrof_core::Error` here.

use ifrof_core::Error;
use reqwest::Response;

use crate::openai::ApiErrorResponse;

/// Maximum body characters kept when the error body is not JSON.
const MAX_RAW_ERROR_CHARS: usize = 300;

/// Which upstream produced the error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upstream {
    Llm,
    Search,
    Scrape,
}

impl Upstream {
    fn wrap(self, message: String) -> Error {
        match self {
            Self::Llm => Error::Inference(message),
            Self::Search => Error::Search(message),
            Self::Scrape => Error::Scrape(message),
        }
    }
}

/// Classified upstream error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamErrorCode {
    /// Invalid authentication credentials.
    AuthenticationError,
    /// Payment required or credits exhausted.
    QuotaExhausted,
    /// Rate limit exceeded.
    RateLimitExceeded,
    /// Model or resource not found.
    NotFound,
    /// Request too large for the model.
    ContextLengthExceeded,
    /// Server error.
    ServerError,
    /// Unknown error.
    Unknown,
}

impl UpstreamErrorCode {
    /// Determine error code from HTTP status and error type.
    pub fn from_response(status: u16, error_type: &str) -> Self {
        match (status, error_type) {
            (401, _) | (403, _) => Self::AuthenticationError,
            (402, _) => Self::QuotaExhausted,
            (429, _) => Self::RateLimitExceeded,
            (404, _) | (_, "model_not_found") => Self::NotFound,
            (400, _) if error_type.contains("context_length") => Self::ContextLengthExceeded,
            (500..=599, _) => Self::ServerError,
            _ => Self::Unknown,
        }
    }
}

/// Convert a classified upstream error into an IFROF error.
pub fn to_ifrof_error(upstream: Upstream, code: UpstreamErrorCode, message: &str) -> Error {
    match code {
        UpstreamErrorCode::AuthenticationError => {
            Error::Config(format!("Authentication failed: {}", message))
        }
        UpstreamErrorCode::QuotaExhausted => upstream.wrap(format!("Quota exhausted: {}", message)),
        UpstreamErrorCode::RateLimitExceeded => {
            upstream.wrap(format!("Rate limit exceeded: {}", message))
        }
        UpstreamErrorCode::NotFound => upstream.wrap(format!("Not found: {}", message)),
        UpstreamErrorCode::ContextLengthExceeded => {
            upstream.wrap(format!("Context too long: {}", message))
        }
        UpstreamErrorCode::ServerError => upstream.wrap(format!("Server error: {}", message)),
        UpstreamErrorCode::Unknown => upstream.wrap(message.to_string()),
    }
}

/// Extract `(error_type, message)` from an error body.
fn parse_error_body(body: &str) -> (String, String) {
    if let Ok(parsed) = serde_json::from_str::<ApiErrorResponse>(body) {
        return (
            parsed.error.error_type.unwrap_or_default(),
            parsed.error.message,
        );
    }
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(msg) = value.get("error").and_then(|e| e.as_str()) {
            return (String::new(), msg.to_string());
        }
    }
    if body.trim().is_empty() {
        return (String::new(), "Unknown error".to_string());
    }
    (
        String::new(),
        body.chars().take(MAX_RAW_ERROR_CHARS).collect(),
    )
}

/// Consume a non-2xx response and turn it into an error.
pub(crate) async fn error_from_response(upstream: Upstream, response: Response) -> Error {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let (error_type, message) = parse_error_body(&body);
    let code = UpstreamErrorCode::from_response(status.as_u16(), &error_type);
    to_ifrof_error(upstream, code, &format!("{}: {}", status, message))
}
