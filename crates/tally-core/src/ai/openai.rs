//! OpenAI backend
//!
//! The reference backend: structured JSON output plus local tool dispatch.
//!
//! Flow for one `completion` call:
//! 1. Send the messages, with tool declarations when a `ToolBox` is set.
//! 2. If the model requests tools, run each one locally, append the
//!    assistant turn and one `tool` message per result, then ask again for
//!    the final answer, returned as text.
//! 3. Otherwise parse the reply as an `ExpenseCategorizationResponse` and
//!    replace its `cost` with the locally computed value.
//!
//! # Configuration
//!
//! - `OPENAI_API_KEY`: API key (required)
//! - `OPENAI_MODEL`: Model name (default: gpt-4.1-nano-2025-04-14)
//! - `OPENAI_BASE_URL`: Override the API root (default: https://api.openai.com/v1)

use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::tools::ToolBox;

use super::chat::{ChatApi, SamplingParams};
use super::parsing::parse_categorization;
use super::pricing;
use super::types::{AssistantReply, ChatMessage, ToolDefinition};
use super::LlmBackend;

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4.1-nano-2025-04-14";

/// A tool call executed during a completion
#[derive(Debug, Clone)]
pub struct ToolCallRecord {
    pub name: String,
    pub arguments: String,
    pub success: bool,
    pub output: String,
}

#[derive(Clone)]
pub struct OpenAIBackend {
    api: ChatApi,
    toolbox: Option<ToolBox>,
    structured_output: bool,
}

impl OpenAIBackend {
    pub fn new(api_key: &str, model: &str) -> Self {
        Self::with_base_url(OPENAI_BASE_URL, Some(api_key.to_string()), model)
    }

    /// Talk to any OpenAI-compatible server
    pub fn with_base_url(base_url: &str, api_key: Option<String>, model: &str) -> Self {
        Self {
            api: ChatApi::new(base_url, api_key, model),
            toolbox: None,
            structured_output: true,
        }
    }

    /// Declare tools and execute the calls the model makes
    pub fn with_tools(mut self, toolbox: ToolBox) -> Self {
        self.toolbox = Some(toolbox);
        self
    }

    /// Return raw text instead of parsing a categorization
    pub fn without_structured_output(mut self) -> Self {
        self.structured_output = false;
        self
    }

    pub fn with_params(mut self, params: SamplingParams) -> Self {
        self.api = self.api.with_params(params);
        self
    }

    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| Error::Configuration("OPENAI_API_KEY is not set".to_string()))?;
        let model =
            std::env::var("OPENAI_MODEL").unwrap_or_else(|_| DEFAULT_OPENAI_MODEL.to_string());
        let base_url =
            std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| OPENAI_BASE_URL.to_string());

        Ok(Self::with_base_url(&base_url, Some(api_key), &model))
    }

    fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.toolbox
            .as_ref()
            .map(ToolBox::definitions)
            .unwrap_or_default()
    }

    /// Run the requested tools and return the follow-up conversation
    async fn run_tools(
        &self,
        toolbox: &ToolBox,
        messages: &[ChatMessage],
        assistant: ChatMessage,
    ) -> (Vec<ChatMessage>, Vec<ToolCallRecord>) {
        let mut conversation = messages.to_vec();
        let mut records = Vec::with_capacity(assistant.tool_calls.len());
        let calls = assistant.tool_calls.clone();
        conversation.push(ChatMessage::assistant_tool_calls(calls.clone()));

        for call in calls {
            let name = call.function.name.as_str();
            let arguments = call.function.arguments.as_str();
            let (success, output) = match toolbox.execute(name, arguments).await {
                Ok(output) => {
                    debug!(tool = %name, output_len = output.len(), "Tool succeeded");
                    (true, output)
                }
                Err(e) => {
                    warn!(tool = %name, error = %e, "Tool failed");
                    (false, format!("Error: {}", e))
                }
            };
            conversation.push(ChatMessage::tool_result(&call.id, &output));
            records.push(ToolCallRecord {
                name: name.to_string(),
                arguments: arguments.to_string(),
                success,
                output,
            });
        }

        (conversation, records)
    }
}

#[async_trait]
impl LlmBackend for OpenAIBackend {
    async fn completion(&self, messages: &[ChatMessage]) -> Result<AssistantReply> {
        let tools = self.tool_definitions();
        let first = self
            .api
            .complete(messages, &tools, self.structured_output)
            .await?;

        if !first.message.tool_calls.is_empty() {
            let toolbox = self.toolbox.as_ref().ok_or_else(|| {
                Error::Upstream("Model requested tool calls but no tools are enabled".into())
            })?;
            let (conversation, records) = self.run_tools(toolbox, messages, first.message).await;
            info!(
                tools = records.len(),
                failed = records.iter().filter(|r| !r.success).count(),
                "Executed tool calls"
            );

            let follow_up = self.api.complete(&conversation, &[], false).await?;
            return Ok(AssistantReply::Text(
                follow_up.message.content.unwrap_or_default(),
            ));
        }

        let content = first.message.content.unwrap_or_default();
        if !self.structured_output {
            return Ok(AssistantReply::Text(content));
        }

        let mut response = parse_categorization(&content)?;
        response.cost =
            self.calculate_cost(first.usage.prompt_tokens, first.usage.completion_tokens);
        debug!(
            category = %response.category,
            prompt_tokens = first.usage.prompt_tokens,
            completion_tokens = first.usage.completion_tokens,
            cost = %response.cost,
            "Parsed structured output"
        );
        Ok(AssistantReply::Categorization(response))
    }

    fn calculate_cost(&self, prompt_tokens: u32, completion_tokens: u32) -> Decimal {
        pricing::calculate_cost(self.api.model(), prompt_tokens, completion_tokens)
    }

    async fn get_available_models(&self) -> Result<Vec<String>> {
        self.api.list_models().await
    }

    fn model(&self) -> &str {
        self.api.model()
    }

    fn provider(&self) -> &'static str {
        "openai"
    }
}
