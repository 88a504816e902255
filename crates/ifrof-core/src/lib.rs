//! # ifrof-core
//!
//! Core types, traits, and abstractions for the IFROF factory search.
//!
//! This crate provides the data structures and trait seams that the database,
//! inference, pipeline, and API crates depend on.
//!
//! Structured log events across the workspace use the fields `subsystem`,
//! `component`, `op`, `search_id`, `user_id`, `duration_ms`, and
//! `result_count`. WARN marks a degraded upstream replaced by a safe default;
//! ERROR marks a fatal pipeline failure.

pub mod defaults;
pub mod error;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use models::*;
pub use traits::*;
