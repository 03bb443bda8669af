//! Anthropic Claude LLM provider implementation.
//!
//! [`AnthropicProvider`] implements the
//! [`LlmProvider`](gleaner_core::llm::provider::LlmProvider) trait for the
//! non-streaming Anthropic Messages API.

pub mod client;
pub mod types;

pub use client::AnthropicProvider;
