//! LLM provider abstraction layer.
//!
//! Recommendations are requested through the `LlmProvider` trait so the
//! discovery pipeline can run against any OpenAI-compatible backend, or an
//! in-memory fake in tests.

mod openai;
mod provider;
mod types;

pub use openai::OpenAIProvider;
pub use provider::{CompletionOptions, LlmError, LlmProvider};
pub use types::{Completion, FinishReason, TokenUsage};
