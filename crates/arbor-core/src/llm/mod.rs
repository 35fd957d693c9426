//! LLM integration via OpenRouter
//!
//! Chat completions against the OpenAI-compatible OpenRouter API with
//! model fallback and rate-limit backoff.

pub mod client;
pub mod types;

pub use client::{LlmClient, LlmClientBuilder};
pub use types::{ChatRequest, ChatResponse, FinishReason, LlmResponse, Message, MessageRole};
