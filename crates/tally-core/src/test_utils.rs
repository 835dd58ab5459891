//! Test utilities for tally-core
//!
//! This module provides a mock OpenAI-compatible server that can be used
//! for development and integration tests. It serves `/v1/chat/completions`
//! and `/v1/models`, so point a backend at [`MockOpenAIServer::base_url`].

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tokio::sync::oneshot;

use crate::ai::classify_keywords;

/// Token counts reported for every mock completion
pub const MOCK_PROMPT_TOKENS: u32 = 1000;
pub const MOCK_COMPLETION_TOKENS: u32 = 500;

/// A scripted reply for one chat completion request
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Assistant message with this text content
    Content(String),
    /// Assistant message requesting tools: `(name, json arguments)`
    ToolCalls(Vec<(String, String)>),
    /// Non-success HTTP status with this body
    Error(u16, String),
}

#[derive(Default)]
struct MockState {
    replies: VecDeque<MockReply>,
    requests: Vec<Value>,
}

type SharedState = Arc<Mutex<MockState>>;

/// Mock OpenAI-compatible server for testing and development
///
/// Scripted replies are served in order. Once they run out, the server
/// classifies the last user message with the offline keyword classifier.
pub struct MockOpenAIServer {
    addr: SocketAddr,
    state: SharedState,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockOpenAIServer {
    /// Start the mock server on an available port
    pub async fn start() -> Self {
        Self::with_replies(Vec::new()).await
    }

    /// Start the mock server with scripted replies
    pub async fn with_replies(replies: Vec<MockReply>) -> Self {
        let state: SharedState = Arc::new(Mutex::new(MockState {
            replies: replies.into(),
            requests: Vec::new(),
        }));

        let app = Router::new()
            .route("/v1/chat/completions", post(handle_chat))
            .route("/v1/models", get(handle_models))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            state,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Get the root URL for this mock server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// API root to hand to a backend (`{url}/v1`)
    pub fn base_url(&self) -> String {
        format!("{}/v1", self.url())
    }

    /// Chat completion request bodies received so far
    pub fn requests(&self) -> Vec<Value> {
        self.state.lock().unwrap().requests.clone()
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockOpenAIServer {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn handle_models() -> Json<Value> {
    Json(json!({
        "object": "list",
        "data": [
            {"id": "gpt-4.1-nano-2025-04-14", "object": "model"},
            {"id": "gpt-4.1-mini-2025-04-14", "object": "model"},
        ]
    }))
}

async fn handle_chat(State(state): State<SharedState>, Json(request): Json<Value>) -> Response {
    let reply = {
        let mut state = state.lock().unwrap();
        state.requests.push(request.clone());
        state.replies.pop_front()
    };

    let message = match reply {
        Some(MockReply::Content(content)) => json!({"role": "assistant", "content": content}),
        Some(MockReply::ToolCalls(calls)) => {
            let tool_calls: Vec<Value> = calls
                .into_iter()
                .enumerate()
                .map(|(i, (name, arguments))| {
                    json!({
                        "id": format!("call_{}", i),
                        "type": "function",
                        "function": {"name": name, "arguments": arguments},
                    })
                })
                .collect();
            json!({"role": "assistant", "content": null, "tool_calls": tool_calls})
        }
        Some(MockReply::Error(status, body)) => {
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            return (status, body).into_response();
        }
        None => {
            let description = last_user_message(&request).unwrap_or_default();
            let classification = classify_keywords(&description);
            json!({
                "role": "assistant",
                "content": serde_json::to_string(&classification).unwrap(),
            })
        }
    };

    Json(json!({
        "id": "chatcmpl-mock",
        "object": "chat.completion",
        "model": request["model"],
        "choices": [{"index": 0, "message": message, "finish_reason": "stop"}],
        "usage": {
            "prompt_tokens": MOCK_PROMPT_TOKENS,
            "completion_tokens": MOCK_COMPLETION_TOKENS,
            "total_tokens": MOCK_PROMPT_TOKENS + MOCK_COMPLETION_TOKENS,
        },
    }))
    .into_response()
}

fn last_user_message(request: &Value) -> Option<String> {
    request["messages"]
        .as_array()?
        .iter()
        .rev()
        .find(|m| m["role"] == "user")
        .and_then(|m| m["content"].as_str())
        .map(str::to_string)
}
