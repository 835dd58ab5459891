//! OpenAI chat completions wire client
//!
//! Shared by the OpenAI and Groq backends, which speak the same protocol
//! and differ only in base URL, credentials and pricing.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

use super::types::{ChatMessage, Role, TokenUsage, ToolCall, ToolDefinition};

pub const DEFAULT_MAX_TOKENS: u32 = 500;
pub const DEFAULT_TEMPERATURE: f32 = 0.3;
pub const DEFAULT_TOP_P: f32 = 1.0;

/// Per-request limit for provider calls
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Sampling parameters sent with every request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingParams {
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            top_p: DEFAULT_TOP_P,
        }
    }
}

/// One assistant turn plus the tokens it consumed
#[derive(Debug, Clone)]
pub struct ChatCompletion {
    pub message: ChatMessage,
    pub usage: TokenUsage,
}

#[derive(Clone)]
pub struct ChatApi {
    http_client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    params: SamplingParams,
    timeout: Duration,
}

impl ChatApi {
    pub fn new(base_url: &str, api_key: Option<String>, model: &str) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model: model.to_string(),
            params: SamplingParams::default(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_params(mut self, params: SamplingParams) -> Self {
        self.params = params;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.api_key {
            Some(ref api_key) => request.header("Authorization", format!("Bearer {}", api_key)),
            None => request,
        }
    }

    /// POST `{base}/chat/completions`
    ///
    /// `json_mode` asks the provider for a JSON object reply.
    pub async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
        json_mode: bool,
    ) -> Result<ChatCompletion> {
        let request = ChatCompletionRequest {
            model: &self.model,
            messages,
            max_tokens: self.params.max_tokens,
            temperature: self.params.temperature,
            top_p: self.params.top_p,
            tools,
            response_format: json_mode.then(|| ResponseFormat {
                kind: "json_object",
            }),
        };

        debug!(
            model = %self.model,
            messages = messages.len(),
            tools = tools.len(),
            json_mode,
            "Sending chat completion"
        );

        let response = self
            .authorize(
                self.http_client
                    .post(format!("{}/chat/completions", self.base_url)),
            )
            .json(&request)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| Error::from_request(e, "LLM API"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Upstream(format!("LLM API error {}: {}", status, body)));
        }

        let chat_response: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| Error::from_request(e, "LLM API"))?;
        let usage = chat_response.usage.unwrap_or_default();

        let message = chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or_else(|| Error::Upstream("No choices in LLM response".into()))?;

        Ok(ChatCompletion {
            message: ChatMessage {
                role: Role::Assistant,
                content: message.content,
                tool_calls: message.tool_calls.unwrap_or_default(),
                tool_call_id: None,
            },
            usage,
        })
    }

    /// GET `{base}/models`, returning the model ids
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let response = self
            .authorize(self.http_client.get(format!("{}/models", self.base_url)))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| Error::from_request(e, "LLM API"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Upstream(format!("LLM API error {}: {}", status, body)));
        }

        let models: ModelsResponse = response.json().await?;
        Ok(models.data.into_iter().map(|m| m.id).collect())
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
    #[serde(skip_serializing_if = "no_tools")]
    tools: &'a [ToolDefinition],
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

fn no_tools(tools: &&[ToolDefinition]) -> bool {
    tools.is_empty()
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<TokenUsage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCall>>,
}

#[derive(Deserialize)]
struct ModelsResponse {
    data: Vec<ModelEntry>,
}

#[derive(Deserialize)]
struct ModelEntry {
    id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::post, Json, Router};
    use serde_json::{json, Value};

    async fn start_slow_server() -> String {
        async fn slow_completion() -> Json<Value> {
            tokio::time::sleep(std::time::Duration::from_secs(2)).await;
            Json(json!({"choices": []}))
        }

        let app = Router::new().route("/v1/chat/completions", post(slow_completion));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/v1", addr)
    }

    #[tokio::test]
    async fn test_stalled_provider_times_out() {
        let base = start_slow_server().await;
        let api = ChatApi::new(&base, Some("key".to_string()), "gpt-4.1-nano-2025-04-14")
            .with_timeout(Duration::from_millis(200));

        let err = api
            .complete(&[ChatMessage::user("Lunch 12 EUR")], &[], true)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Upstream(_)));
        assert!(err.to_string().contains("timed out"));
    }
}
