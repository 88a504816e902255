//! OpenAI-compatible LLM gateway client.
//!
//! Works with any endpoint that speaks the chat-completions dialect and
//! accepts `image_url` content parts for vision input.
//!
//! # Example
//!
//! ```rust,no_run
//! use ifrof_inference::openai::{LlmConfig, LlmGateway};
//! use ifrof_core::GenerationBackend;
//!
//! #[tokio::main]
//! async fn main() -> ifrof_core::Result<()> {
//!     let gateway = LlmGateway::new(LlmConfig {
//!         api_key: Some("sk-test".to_string()),
//!         ..Default::default()
//!     })?;
//!     let json = gateway
//!         .generate_with_system("Reply with a JSON object.", "Describe a water bottle")
//!         .await?;
//!     println!("{}", json);
//!     Ok(())
//! }
//! ```

mod backend;
mod types;

pub use backend::{
    LlmConfig, LlmGateway, DEFAULT_LLM_MODEL, DEFAULT_LLM_URL, DEFAULT_TEMPERATURE,
};
pub use types::*;
