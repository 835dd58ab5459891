//! LLM message and response types
//!
//! These types are provider-agnostic. The chat message shapes follow the
//! OpenAI chat completions wire format, which Groq also speaks.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::Currency;

/// Chat message author
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// One message in a chat completion conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Tool invocations requested by the assistant
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// Set on `Role::Tool` messages to link the result to its call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self::text(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::text(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::text(Role::Assistant, content)
    }

    /// Assistant turn that only requests tool calls
    pub fn assistant_tool_calls(tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content: None,
            tool_calls,
            tool_call_id: None,
        }
    }

    /// Result of executing a tool call
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: Some(tool_call_id.into()),
        }
    }

    fn text(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }
}

/// A function call requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type", default = "function_kind")]
    pub kind: String,
    pub function: FunctionCall,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// JSON-encoded arguments, as sent by the provider
    pub arguments: String,
}

/// A tool the model may call, in chat completions format
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    pub kind: String,
    pub function: FunctionDefinition,
}

#[derive(Debug, Clone, Serialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

impl ToolDefinition {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            kind: function_kind(),
            function: FunctionDefinition {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }
}

fn function_kind() -> String {
    "function".to_string()
}

/// Token counts reported by the provider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

/// Structured classification extracted from the model's reply
///
/// Canonical keys are snake_case. The aliases cover the title-case
/// spellings the classification prompt's field list tends to elicit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseCategorizationResponse {
    #[serde(alias = "Category")]
    pub category: String,
    #[serde(alias = "Total Amount", alias = "total amount", alias = "TotalAmount")]
    pub total_amount: Decimal,
    #[serde(alias = "Currency")]
    pub currency: Currency,
    #[serde(alias = "Confidence")]
    pub confidence: f64,
    /// Cost of the classification call in USD
    #[serde(alias = "Cost", default)]
    pub cost: Decimal,
    #[serde(alias = "Comments", default)]
    pub comments: Option<String>,
    #[serde(alias = "Timestamp", default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl ExpenseCategorizationResponse {
    /// Reject values outside the schema's ranges
    pub fn validate(&self) -> Result<()> {
        if self.category.trim().is_empty() {
            return Err(Error::Upstream("LLM returned an empty category".into()));
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(Error::Upstream(format!(
                "LLM confidence {} outside 0.0..=1.0",
                self.confidence
            )));
        }
        Ok(())
    }
}

/// What a completion call produced
#[derive(Debug, Clone, PartialEq)]
pub enum AssistantReply {
    /// Parsed structured output
    Categorization(ExpenseCategorizationResponse),
    /// Free text (tool-call follow-ups, or backends without structured output)
    Text(String),
}

impl AssistantReply {
    pub fn into_categorization(self) -> Result<ExpenseCategorizationResponse> {
        match self {
            AssistantReply::Categorization(response) => Ok(response),
            AssistantReply::Text(text) => Err(Error::Upstream(format!(
                "Expected a structured classification, got text: {}",
                crate::ai::parsing::truncate_raw(&text)
            ))),
        }
    }
}
