//! # ifrof-search
//!
//! The factory search pipeline.
//!
//! Given a product image, URL, name, or HS code, the pipeline:
//!
//! 1. validates and sanitizes the request ([`validation`])
//! 2. consumes one unit of the caller's daily quota
//! 3. normalizes the product with the LLM gateway ([`normalizer`])
//! 4. searches the web for manufacturers ([`discovery`])
//! 5. extracts candidate companies ([`extractor`])
//! 6. scores each candidate deterministically ([`verifier`])
//! 7. persists accepted factories
//!
//! [`service::FactorySearchService`] ties the stages together.

pub mod discovery;
pub mod extractor;
pub mod normalizer;
pub mod prompts;
pub mod service;
pub mod validation;
pub mod verifier;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use discovery::{build_search_queries, DiscoveryReport, WebDiscovery};
pub use extractor::CandidateExtractor;
pub use normalizer::ProductNormalizer;
pub use service::{FactorySearchService, PipelineError, SearchDetails, SearchOutcome};
pub use validation::{validate, RawOptionalParams, SearchRequestBody, ValidationError};
pub use verifier::{verify, VERIFICATION_STEPS};
