//! Mock backend for testing
//!
//! Classifies offline with a keyword table so the CLI, server and bot can
//! run end to end without network access. Tests can pin a fixed response
//! or force failures.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use chrono::Utc;
use regex::Regex;
use rust_decimal::Decimal;

use crate::error::{Error, Result};
use crate::models::Currency;

use super::types::{AssistantReply, ChatMessage, ExpenseCategorizationResponse, Role};
use super::LlmBackend;

pub const MOCK_MODEL: &str = "mock-classifier";

fn amount_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+(?:[.,]\d{1,2})?)").expect("valid regex"))
}

/// Keyword table: first match wins
const KEYWORDS: &[(&[&str], &str)] = &[
    (
        &[
            "starbucks", "coffee", "cafe", "restaurant", "lunch", "dinner", "breakfast", "pizza",
            "groceries", "supermarket",
        ],
        "Food & Dining",
    ),
    (
        &["uber", "lyft", "taxi", "bus", "train", "metro", "gas", "fuel", "parking"],
        "Transportation",
    ),
    (&["netflix", "spotify", "subscription", "membership"], "Subscriptions"),
    (&["electric", "water bill", "internet", "phone bill", "utility"], "Utilities"),
    (&["cinema", "movie", "concert", "game", "theater"], "Entertainment"),
    (&["doctor", "pharmacy", "medicine", "dentist", "hospital"], "Healthcare"),
    (&["amazon", "clothes", "shoes", "shopping", "mall"], "Shopping"),
    (&["rent", "mortgage", "furniture"], "Housing"),
    (&["course", "book", "tuition", "school"], "Education"),
    (&["hotel", "flight", "airbnb", "airline"], "Travel"),
    (&["haircut", "salon", "spa", "gym"], "Personal Care"),
];

/// Deterministic keyword classification of an expense description
pub fn classify_keywords(description: &str) -> ExpenseCategorizationResponse {
    let lower = description.to_lowercase();

    let category = KEYWORDS
        .iter()
        .find(|(words, _)| words.iter().any(|w| lower.contains(w)))
        .map(|(_, category)| *category);

    let currency = if lower.contains('$') || lower.contains("usd") || lower.contains("dollar") {
        Currency::Usd
    } else if lower.contains("gbp") || lower.contains('£') || lower.contains("pound") {
        Currency::Gbp
    } else if lower.contains("jpy") || lower.contains('¥') || lower.contains("yen") {
        Currency::Jpy
    } else {
        Currency::Eur
    };

    let total_amount = amount_re()
        .captures(description)
        .and_then(|caps| caps[1].replace(',', ".").parse::<Decimal>().ok())
        .unwrap_or(Decimal::ZERO);

    ExpenseCategorizationResponse {
        category: category.unwrap_or("Other").to_string(),
        total_amount,
        currency,
        confidence: if category.is_some() { 0.9 } else { 0.4 },
        cost: Decimal::ZERO,
        comments: None,
        timestamp: Utc::now(),
    }
}

/// Mock LLM backend for testing
///
/// Clones share the call counter.
#[derive(Clone, Default)]
pub struct MockBackend {
    fixed: Option<ExpenseCategorizationResponse>,
    failure: Option<String>,
    calls: Arc<AtomicUsize>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always answer with `response`
    pub fn with_response(response: ExpenseCategorizationResponse) -> Self {
        Self {
            fixed: Some(response),
            ..Self::default()
        }
    }

    /// Fail every completion with an upstream error
    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::default()
        }
    }

    /// Number of completion calls made so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmBackend for MockBackend {
    async fn completion(&self, messages: &[ChatMessage]) -> Result<AssistantReply> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(ref message) = self.failure {
            return Err(Error::Upstream(message.clone()));
        }
        if let Some(ref response) = self.fixed {
            return Ok(AssistantReply::Categorization(response.clone()));
        }

        let description = messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .and_then(|m| m.content.as_deref())
            .unwrap_or_default();
        Ok(AssistantReply::Categorization(classify_keywords(description)))
    }

    fn calculate_cost(&self, _prompt_tokens: u32, _completion_tokens: u32) -> Decimal {
        Decimal::ZERO
    }

    async fn get_available_models(&self) -> Result<Vec<String>> {
        Ok(vec![MOCK_MODEL.to_string()])
    }

    fn model(&self) -> &str {
        MOCK_MODEL
    }

    fn provider(&self) -> &'static str {
        "mock"
    }
}
