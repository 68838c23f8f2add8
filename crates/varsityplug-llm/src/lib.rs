//! varsityplug-llm: chat assistant plumbing.
//!
//! A [`ChatBackend`] trait over OpenAI-compatible chat-completion APIs, the
//! assistant's prompt and reply handling, and the per-user rate limiter that
//! guards it.

pub mod assistant;
pub mod backend;
pub mod rate_limit;

pub use assistant::{validate_message, Assistant, ChatContext, REFUSAL_PHRASES};
pub use backend::{ChatBackend, LlmError, LlmRequest, LlmResponse, Message, OpenAiCompatibleBackend};
pub use rate_limit::ChatRateLimiter;
