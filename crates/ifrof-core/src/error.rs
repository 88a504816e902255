//! Error types for the IFROF factory search.

use thiserror::Error;

/// Result type alias using the crate-wide Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type shared by every IFROF crate.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// LLM gateway call failed
    #[error("Inference error: {0}")]
    Inference(String),

    /// Web search/answer API call failed
    #[error("Search error: {0}")]
    Search(String),

    /// Scrape API call failed
    #[error("Scrape error: {0}")]
    Scrape(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// Daily quota store rejected or could not be reached
    #[error("Rate limit error: {0}")]
    RateLimit(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}
