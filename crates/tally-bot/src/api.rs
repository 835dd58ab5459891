//! Telegram Bot API client
//!
//! Only the handful of methods the bot needs, over plain JSON POSTs.
//! Handlers talk to [`BotTransport`] so tests can record outgoing calls.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::error::{BotError, Result};

pub const TELEGRAM_API_URL: &str = "https://api.telegram.org";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    #[serde(default)]
    pub from: Option<User>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub first_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    /// The message carrying the pressed keyboard
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub data: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlineKeyboardButton {
    pub text: String,
    pub callback_data: String,
}

impl InlineKeyboardButton {
    pub fn new(text: impl Into<String>, callback_data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            callback_data: callback_data.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlineKeyboardMarkup {
    pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

/// Bot API envelope: `{"ok": true, "result": ...}`
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: DeserializeOwned"))]
struct ApiResponse<T> {
    ok: bool,
    #[serde(default)]
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
}

/// Outgoing side of the bot
#[async_trait]
pub trait BotTransport: Send + Sync {
    /// Long-poll for updates starting at `offset`
    async fn get_updates(&self, offset: i64, timeout_secs: u64) -> Result<Vec<Update>>;

    /// Send a message, returning it (for later edits or deletion)
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<&InlineKeyboardMarkup>,
    ) -> Result<Message>;

    /// Replace a message's text; the inline keyboard is dropped
    async fn edit_message_text(&self, chat_id: i64, message_id: i64, text: &str) -> Result<()>;

    async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<()>;

    /// Acknowledge a button press so the client stops its spinner
    async fn answer_callback_query(&self, callback_query_id: &str) -> Result<()>;
}

/// reqwest-backed Bot API client
#[derive(Clone)]
pub struct TelegramApi {
    client: reqwest::Client,
    base_url: String,
}

impl TelegramApi {
    pub fn new(token: &str) -> Self {
        Self::with_base_url(TELEGRAM_API_URL, token)
    }

    /// Point at another Bot API server (local server or tests)
    pub fn with_base_url(api_url: &str, token: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: format!("{}/bot{}", api_url.trim_end_matches('/'), token),
        }
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: Value,
        timeout: Duration,
    ) -> Result<T> {
        debug!(method, "Telegram API call");

        let response: ApiResponse<T> = self
            .client
            .post(format!("{}/{}", self.base_url, method))
            .timeout(timeout)
            .json(&body)
            .send()
            .await?
            .json()
            .await?;

        match (response.ok, response.result) {
            (true, Some(result)) => Ok(result),
            (true, None) => Err(BotError::Telegram(format!("{}: empty result", method))),
            (false, _) => Err(BotError::Telegram(format!(
                "{}: {}",
                method,
                response.description.as_deref().unwrap_or("unknown")
            ))),
        }
    }
}

/// Timeout for ordinary calls
const CALL_TIMEOUT: Duration = Duration::from_secs(30);

#[async_trait]
impl BotTransport for TelegramApi {
    async fn get_updates(&self, offset: i64, timeout_secs: u64) -> Result<Vec<Update>> {
        let body = json!({
            "offset": offset,
            "timeout": timeout_secs,
            "allowed_updates": ["message", "callback_query"],
        });
        // Leave headroom over the server-side long-poll timeout
        let timeout = Duration::from_secs(timeout_secs) + CALL_TIMEOUT;
        self.call("getUpdates", body, timeout).await
    }

    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<&InlineKeyboardMarkup>,
    ) -> Result<Message> {
        let mut body = json!({ "chat_id": chat_id, "text": text });
        if let Some(keyboard) = keyboard {
            body["reply_markup"] = serde_json::to_value(keyboard)
                .map_err(|e| BotError::Telegram(e.to_string()))?;
        }
        self.call("sendMessage", body, CALL_TIMEOUT).await
    }

    async fn edit_message_text(&self, chat_id: i64, message_id: i64, text: &str) -> Result<()> {
        let body = json!({ "chat_id": chat_id, "message_id": message_id, "text": text });
        // Returns the edited Message; only success matters here
        let _: Value = self.call("editMessageText", body, CALL_TIMEOUT).await?;
        Ok(())
    }

    async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<()> {
        let body = json!({ "chat_id": chat_id, "message_id": message_id });
        let _: bool = self.call("deleteMessage", body, CALL_TIMEOUT).await?;
        Ok(())
    }

    async fn answer_callback_query(&self, callback_query_id: &str) -> Result<()> {
        let body = json!({ "callback_query_id": callback_query_id });
        let _: bool = self.call("answerCallbackQuery", body, CALL_TIMEOUT).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Path, routing::post, Json, Router};

    async fn start_stub() -> String {
        async fn handle(Path(method): Path<String>, Json(body): Json<Value>) -> Json<Value> {
            let reply = match method.as_str() {
                "getUpdates" => json!({
                    "ok": true,
                    "result": [{
                        "update_id": 10,
                        "message": {
                            "message_id": 1,
                            "chat": {"id": 5},
                            "from": {"id": 7, "first_name": "Ana"},
                            "text": "Coffee 3 EUR"
                        }
                    }]
                }),
                "sendMessage" => json!({
                    "ok": true,
                    "result": {
                        "message_id": 99,
                        "chat": {"id": body["chat_id"]},
                        "text": body["text"],
                    }
                }),
                "deleteMessage" => json!({
                    "ok": false,
                    "description": "Bad Request: message to delete not found",
                }),
                _ => json!({ "ok": true, "result": true }),
            };
            Json(reply)
        }

        let app = Router::new().route("/bottoken/:method", post(handle));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_get_updates_parses_messages() {
        let api = TelegramApi::with_base_url(&start_stub().await, "token");
        let updates = api.get_updates(0, 0).await.unwrap();

        assert_eq!(updates.len(), 1);
        let message = updates[0].message.as_ref().unwrap();
        assert_eq!(message.chat.id, 5);
        assert_eq!(message.from.as_ref().unwrap().id, 7);
        assert_eq!(message.text.as_deref(), Some("Coffee 3 EUR"));
        assert!(updates[0].callback_query.is_none());
    }

    #[tokio::test]
    async fn test_send_message_returns_message() {
        let api = TelegramApi::with_base_url(&start_stub().await, "token");
        let keyboard = InlineKeyboardMarkup {
            inline_keyboard: vec![vec![InlineKeyboardButton::new("A", "category:A")]],
        };
        let sent = api.send_message(5, "hello", Some(&keyboard)).await.unwrap();
        assert_eq!(sent.message_id, 99);
        assert_eq!(sent.chat.id, 5);

        api.edit_message_text(5, 99, "edited").await.unwrap();
        api.answer_callback_query("cb").await.unwrap();
    }

    #[tokio::test]
    async fn test_not_ok_is_telegram_error() {
        let api = TelegramApi::with_base_url(&start_stub().await, "token");
        let err = api.delete_message(5, 1).await.unwrap_err();
        assert!(matches!(
            err,
            BotError::Telegram(msg) if msg.contains("message to delete not found")
        ));
    }

    #[test]
    fn test_keyboard_serialization() {
        let keyboard = InlineKeyboardMarkup {
            inline_keyboard: vec![vec![InlineKeyboardButton::new("✅ Travel", "category:Travel")]],
        };
        assert_eq!(
            serde_json::to_value(&keyboard).unwrap(),
            json!({"inline_keyboard": [[{"text": "✅ Travel", "callback_data": "category:Travel"}]]})
        );
    }
}
