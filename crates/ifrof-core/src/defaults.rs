//! Centralized default constants for the factory search.
//!
//! All crates reference these constants instead of defining their own magic
//! numbers. Scoring constants are part of the acceptance contract and must not
//! change without a migration of stored scores.

// =============================================================================
// INPUT LIMITS
// =============================================================================

/// Maximum product name length, in characters.
pub const MAX_PRODUCT_NAME_CHARS: usize = 200;

/// Maximum product URL length, in characters.
pub const MAX_PRODUCT_URL_CHARS: usize = 500;

/// Maximum decoded image size (5 MiB).
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Maximum length of an optional free-text field.
pub const MAX_OPTIONAL_TEXT_CHARS: usize = 200;

/// Maximum number of certifications accepted in `optional.certs`.
pub const MAX_CERTS: usize = 20;

/// Maximum length of a single certification name.
pub const MAX_CERT_CHARS: usize = 100;

/// HS code pattern applied after stripping whitespace.
pub const HS_CODE_PATTERN: &str = r"^[0-9]{4,10}(\.[0-9]{2})?$";

// =============================================================================
// PIPELINE
// =============================================================================

/// Maximum number of search queries built from a normalized product.
pub const MAX_SEARCH_QUERIES: usize = 4;

/// Queries shorter than this (in characters) are dropped.
pub const MIN_QUERY_CHARS: usize = 10;

/// Number of keywords joined into a single query.
pub const QUERY_KEYWORDS: usize = 3;

/// Maximum candidates passed from the extractor to the verifier.
pub const MAX_CANDIDATES: usize = 15;

/// Scraped page text is truncated to this many characters before prompting.
pub const MAX_SCRAPED_CHARS: usize = 8000;

/// Each search result is truncated to this many characters before prompting.
pub const MAX_RESULT_CHARS: usize = 6000;

// =============================================================================
// SCORING
// =============================================================================

/// Starting score of every candidate.
pub const SCORE_BASE: i32 = 50;

/// Bonus per manufacturing signal.
pub const SCORE_MANUFACTURING_SIGNAL: i32 = 5;

/// Penalty per trading signal.
pub const SCORE_TRADING_SIGNAL: i32 = -15;

/// Bonus for a known website.
pub const SCORE_WEBSITE: i32 = 5;

/// Bonus for a known location.
pub const SCORE_LOCATION: i32 = 5;

/// Bonus for being listed in more than one place.
pub const SCORE_MULTIPLE_LINKS: i32 = 5;

/// Maximum listing evidence entries.
pub const MAX_LISTING_EVIDENCE: usize = 3;

/// Maximum `why_factory` reasons kept.
pub const MAX_WHY_FACTORY: usize = 6;

/// Minimum score for acceptance.
pub const ACCEPT_MIN_SCORE: i32 = 40;

/// Minimum `why_factory` reasons for acceptance.
pub const ACCEPT_MIN_REASONS: usize = 2;

/// Acceptance requires strictly fewer red flags than this.
pub const ACCEPT_MAX_RED_FLAGS: usize = 3;

// =============================================================================
// QUOTA AND RETENTION
// =============================================================================

/// Searches allowed per user per UTC day.
pub const SEARCH_DAILY_LIMIT: i32 = 10;

/// Days a search and its results are kept before cleanup.
pub const SEARCH_RETENTION_DAYS: i32 = 30;

/// Interval between maintenance runs, in seconds.
pub const MAINTENANCE_INTERVAL_SECS: u64 = 3600;

// =============================================================================
// HTTP
// =============================================================================

/// Request body limit; a 5 MiB image is ~6.7 MiB in base64 plus JSON overhead.
pub const MAX_BODY_BYTES: usize = 8 * 1024 * 1024;

/// Default timeout for LLM gateway calls, in seconds.
pub const LLM_TIMEOUT_SECS: u64 = 120;

/// Default timeout for web search calls, in seconds.
pub const SEARCH_TIMEOUT_SECS: u64 = 60;

/// Default timeout for scrape calls, in seconds.
pub const SCRAPE_TIMEOUT_SECS: u64 = 45;
