//! Pluggable LLM backend abstraction
//!
//! This module provides a provider-agnostic interface for expense
//! classification.
//!
//! # Architecture
//!
//! - `LlmBackend` trait: the operations every provider supports
//! - `LlmClient` enum: concrete wrapper providing Clone + compile-time dispatch
//! - Backend implementations: `OpenAIBackend`, `GroqBackend`, `MockBackend`
//!
//! # Usage
//!
//! ```rust,ignore
//! let llm = LlmClient::from_env()?;
//! let reply = llm.completion(&messages).await?;
//! let response = reply.into_categorization()?;
//! println!("Category: {}", response.category);
//! ```
//!
//! # Configuration
//!
//! Environment variables:
//! - `LLM_PROVIDER`: Backend to use (openai, groq, mock). Default: openai
//! - `OPENAI_API_KEY`, `OPENAI_MODEL`, `OPENAI_BASE_URL`: see [`openai`]
//! - `GROQ_API_KEY`, `GROQ_MODEL`: see [`groq`]

pub mod chat;
pub mod groq;
mod mock;
pub mod openai;
pub mod parsing;
pub mod pricing;
pub mod types;

pub use groq::GroqBackend;
pub use mock::{classify_keywords, MockBackend, MOCK_MODEL};
pub use openai::{OpenAIBackend, ToolCallRecord};
pub use types::*;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::error::{Error, Result};
use crate::tools::ToolBox;

/// Trait defining the interface for all LLM backends
///
/// Backends should be Send + Sync to allow use across async tasks.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Run a chat completion over `messages`
    async fn completion(&self, messages: &[ChatMessage]) -> Result<AssistantReply>;

    /// Cost in USD of a call with the given token counts
    fn calculate_cost(&self, prompt_tokens: u32, completion_tokens: u32) -> Decimal;

    /// Model ids the provider exposes
    async fn get_available_models(&self) -> Result<Vec<String>>;

    /// Get the model name (for logging)
    fn model(&self) -> &str;

    /// Short provider name (for logging)
    fn provider(&self) -> &'static str;
}

/// Concrete LLM client enum
///
/// Provides Clone and compile-time dispatch without Box<dyn> overhead.
#[derive(Clone)]
pub enum LlmClient {
    OpenAI(OpenAIBackend),
    Groq(GroqBackend),
    /// Offline keyword classifier for tests and demos
    Mock(MockBackend),
}

impl LlmClient {
    /// Create an LLM client from environment variables
    ///
    /// Checks `LLM_PROVIDER` to determine which backend to use. The OpenAI
    /// backend gets the currency/datetime tools wired in.
    ///
    /// Fails with a configuration error when the selected provider's API
    /// key is missing.
    pub fn from_env() -> Result<Self> {
        let provider = std::env::var("LLM_PROVIDER").unwrap_or_else(|_| "openai".to_string());

        match provider.trim().to_lowercase().as_str() {
            "openai" => Ok(LlmClient::OpenAI(
                OpenAIBackend::from_env()?.with_tools(ToolBox::from_env()),
            )),
            "groq" => Ok(LlmClient::Groq(GroqBackend::from_env()?)),
            "mock" => Ok(LlmClient::Mock(MockBackend::new())),
            other => Err(Error::Configuration(format!(
                "Unknown LLM_PROVIDER '{}' (expected openai, groq or mock)",
                other
            ))),
        }
    }

    /// Create a mock backend for testing
    pub fn mock() -> Self {
        LlmClient::Mock(MockBackend::new())
    }
}

#[async_trait]
impl LlmBackend for LlmClient {
    async fn completion(&self, messages: &[ChatMessage]) -> Result<AssistantReply> {
        match self {
            LlmClient::OpenAI(b) => b.completion(messages).await,
            LlmClient::Groq(b) => b.completion(messages).await,
            LlmClient::Mock(b) => b.completion(messages).await,
        }
    }

    fn calculate_cost(&self, prompt_tokens: u32, completion_tokens: u32) -> Decimal {
        match self {
            LlmClient::OpenAI(b) => b.calculate_cost(prompt_tokens, completion_tokens),
            LlmClient::Groq(b) => b.calculate_cost(prompt_tokens, completion_tokens),
            LlmClient::Mock(b) => b.calculate_cost(prompt_tokens, completion_tokens),
        }
    }

    async fn get_available_models(&self) -> Result<Vec<String>> {
        match self {
            LlmClient::OpenAI(b) => b.get_available_models().await,
            LlmClient::Groq(b) => b.get_available_models().await,
            LlmClient::Mock(b) => b.get_available_models().await,
        }
    }

    fn model(&self) -> &str {
        match self {
            LlmClient::OpenAI(b) => b.model(),
            LlmClient::Groq(b) => b.model(),
            LlmClient::Mock(b) => b.model(),
        }
    }

    fn provider(&self) -> &'static str {
        match self {
            LlmClient::OpenAI(b) => b.provider(),
            LlmClient::Groq(b) => b.provider(),
            LlmClient::Mock(b) => b.provider(),
        }
    }
}

#[cfg(test)]
mod tests;
