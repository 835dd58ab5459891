//! Groq backend
//!
//! Groq serves an OpenAI-compatible API. Replies are parsed the same way as
//! OpenAI's, but the cost is always reported as zero.
//!
//! # Configuration
//!
//! - `GROQ_API_KEY`: API key (required)
//! - `GROQ_MODEL`: Model name (default: llama-3.3-70b-versatile)

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::error::{Error, Result};

use super::chat::ChatApi;
use super::parsing::parse_categorization;
use super::types::{AssistantReply, ChatMessage};
use super::LlmBackend;

pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_GROQ_MODEL: &str = "llama-3.3-70b-versatile";

#[derive(Clone)]
pub struct GroqBackend {
    api: ChatApi,
}

impl GroqBackend {
    pub fn new(api_key: &str, model: &str) -> Self {
        Self::with_base_url(GROQ_BASE_URL, api_key, model)
    }

    pub fn with_base_url(base_url: &str, api_key: &str, model: &str) -> Self {
        Self {
            api: ChatApi::new(base_url, Some(api_key.to_string()), model),
        }
    }

    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("GROQ_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| Error::Configuration("GROQ_API_KEY is not set".to_string()))?;
        let model = std::env::var("GROQ_MODEL").unwrap_or_else(|_| DEFAULT_GROQ_MODEL.to_string());
        Ok(Self::new(&api_key, &model))
    }
}

#[async_trait]
impl LlmBackend for GroqBackend {
    async fn completion(&self, messages: &[ChatMessage]) -> Result<AssistantReply> {
        let reply = self.api.complete(messages, &[], true).await?;
        let content = reply.message.content.unwrap_or_default();
        let mut response = parse_categorization(&content)?;
        response.cost = Decimal::ZERO;
        Ok(AssistantReply::Categorization(response))
    }

    fn calculate_cost(&self, _prompt_tokens: u32, _completion_tokens: u32) -> Decimal {
        Decimal::ZERO
    }

    async fn get_available_models(&self) -> Result<Vec<String>> {
        self.api.list_models().await
    }

    fn model(&self) -> &str {
        self.api.model()
    }

    fn provider(&self) -> &'static str {
        "groq"
    }
}
