//! Language model access
//!
//! The rest of the crate talks to a model through one capability,
//! [`LlmClient::generate`], so the Gemini HTTP client and the scripted
//! [`MockLlmClient`] are interchangeable.
//!
//! # Feature Flags
//!
//! - `llm-online`: enable the HTTP transport of [`GeminiClient`]
//!
//! Without the feature, configuration, prompts and the mock client remain available
//! but [`GeminiClient`] returns feature-not-available errors.

pub mod client;
pub mod config;
pub mod error;
pub mod gemini;
pub mod prompt;
pub mod retry;

pub use client::{ChatTurn, LlmClient, MockCall, MockLlmClient, Role};
pub use config::LlmConfig;
pub use error::{LlmError, LlmResult};
pub use gemini::GeminiClient;
pub use prompt::{estimate_tokens, extract_json};
pub use retry::{RetryPolicy, generate_with_retry};
