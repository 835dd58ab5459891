//! Update handlers
//!
//! Commands reply directly. Free text runs the classify-and-confirm
//! conversation: preprocess, classify, show the category keyboard, then
//! persist whichever category the user presses.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{error, info, warn};

use tally_core::models::Currency;
use tally_core::repo::UserPreferenceRepository;
use tally_core::{
    preprocess, ClassificationResult, ClassificationService, CurrencyConverter, Database,
    DbCategoryRepo, DbExpenseRepo, DbUserPreferenceRepo, ExpenseCategorizationResponse, LlmClient,
    PreprocessResult, Session,
};

use crate::api::{BotTransport, CallbackQuery, Message, Update};
use crate::conversation::{ConversationKey, ConversationState, ConversationStore};
use crate::error::{BotError, Result};
use crate::keyboards::{category_confirmation_keyboard, currency_selection_keyboard, Callback};

pub const WELCOME_TEXT: &str = "Welcome to Tally!\n\n\
I can help you track your expenses using AI-powered categorization.\n\n\
How to use:\n\
1. Send me an expense description (e.g. 'Coffee at Starbucks $5.50')\n\
2. I'll analyze it and suggest a category\n\
3. Confirm or choose a different category\n\
4. Your expense is saved!\n\n\
Commands:\n\
/help     - Show this help message\n\
/currency - Set your preferred display currency\n\
/cancel   - Cancel the current operation";

pub const HELP_TEXT: &str = "Tally - Help\n\n\
Recording an expense:\n\
Simply send a text message describing your expense. Include:\n\
- Amount (with or without currency symbol)\n\
- Description of what you bought\n\n\
Examples:\n\
  Coffee at Starbucks $5.50\n\
  Uber ride to airport 25 EUR\n\
  Monthly Netflix subscription 15.99\n\
  Groceries at Whole Foods $87.32\n\n\
Commands:\n\
/start    - Introduction\n\
/help     - This help message\n\
/currency - Set your preferred display currency\n\
/cancel   - Cancel current operation";

pub const CANCEL_TEXT: &str = "Operation cancelled. Send me an expense anytime!";
pub const UNKNOWN_COMMAND_TEXT: &str = "Unknown command. Use /help to see what I can do.";
pub const ANALYZING_TEXT: &str = "Analyzing your expense...";
pub const INVALID_SELECTION_TEXT: &str = "Invalid selection. Please try again.";
pub const INVALID_CURRENCY_TEXT: &str = "Invalid currency selection.";
pub const SESSION_EXPIRED_TEXT: &str = "Session expired. Please send your expense again.";
pub const CLASSIFY_FAILED_TEXT: &str = "Sorry, I couldn't classify your expense. Please try again.";
pub const SAVE_FAILED_TEXT: &str = "Sorry, I couldn't save your expense. Please try again.";
pub const GENERIC_ERROR_TEXT: &str = "An error occurred. Please try again or use /cancel.";

/// Telegram expense bot over any [`BotTransport`]
pub struct ExpenseBot<T: BotTransport> {
    transport: T,
    db: Database,
    llm: LlmClient,
    converter: CurrencyConverter,
    conversations: ConversationStore,
}

impl<T: BotTransport> ExpenseBot<T> {
    pub fn new(transport: T, db: Database, llm: LlmClient, converter: CurrencyConverter) -> Self {
        Self {
            transport,
            db,
            llm,
            converter,
            conversations: ConversationStore::new(),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn conversations(&self) -> &ConversationStore {
        &self.conversations
    }

    #[cfg(test)]
    pub(crate) fn database(&self) -> &Database {
        &self.db
    }

    /// Handle one update; failures are logged and reported to the chat
    pub async fn handle_update(&self, update: &Update) {
        let result = if let Some(query) = &update.callback_query {
            self.handle_callback(query).await
        } else if let Some(message) = &update.message {
            self.handle_message(message).await
        } else {
            Ok(())
        };

        if let Err(e) = result {
            error!(update_id = update.update_id, error = %e, "Update handling failed");
            if let Some(chat_id) = update_chat_id(update) {
                if let Err(e) = self
                    .transport
                    .send_message(chat_id, GENERIC_ERROR_TEXT, None)
                    .await
                {
                    warn!(error = %e, "Failed to send error reply");
                }
            }
        }
    }

    async fn handle_message(&self, message: &Message) -> Result<()> {
        let (Some(text), Some(user)) = (message.text.as_deref(), message.from.as_ref()) else {
            return Ok(());
        };
        let chat_id = message.chat.id;

        match command_name(text) {
            Some("start") => self.reply(chat_id, WELCOME_TEXT).await,
            Some("help") => self.reply(chat_id, HELP_TEXT).await,
            Some("cancel") => {
                self.conversations.clear((chat_id, user.id));
                self.reply(chat_id, CANCEL_TEXT).await
            }
            Some("currency") => self.currency_command(chat_id, user.id).await,
            Some(_) => self.reply(chat_id, UNKNOWN_COMMAND_TEXT).await,
            None => self.handle_expense_text(chat_id, user.id, text).await,
        }
    }

    async fn reply(&self, chat_id: i64, text: &str) -> Result<()> {
        self.transport.send_message(chat_id, text, None).await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Step 1: receive text -> classify -> present keyboard
    // ------------------------------------------------------------------

    async fn handle_expense_text(&self, chat_id: i64, user_id: i64, text: &str) -> Result<()> {
        let preview: String = text.chars().take(80).collect();
        info!(user_id, expense = %preview, "Expense message received");

        let cleaned = match validate_input(text) {
            Ok(cleaned) => cleaned,
            Err(BotError::InvalidInput(errors)) => {
                return self
                    .reply(chat_id, &format!("Invalid input:\n{}", errors))
                    .await;
            }
            Err(e) => return Err(e),
        };

        if !cleaned.warnings.is_empty() {
            self.reply(chat_id, &format!("Note: {}", cleaned.warnings.join("; ")))
                .await?;
        }

        let processing = self
            .transport
            .send_message(chat_id, ANALYZING_TEXT, None)
            .await?;

        let response = match self.classify(&cleaned.cleaned_text, user_id).await {
            Ok(response) => response,
            Err(e) => {
                error!(user_id, error = %e, "Classification failed");
                self.transport
                    .edit_message_text(chat_id, processing.message_id, CLASSIFY_FAILED_TEXT)
                    .await?;
                return Ok(());
            }
        };

        if let Err(e) = self
            .transport
            .delete_message(chat_id, processing.message_id)
            .await
        {
            warn!(error = %e, "Failed to delete processing message");
        }

        self.conversations.await_confirmation(
            (chat_id, user_id),
            cleaned.cleaned_text.clone(),
            response.clone(),
        );

        let preferred = self.preferred_currency(user_id)?;
        let amount = self
            .format_amount(response.total_amount, response.currency, preferred)
            .await;
        let keyboard = category_confirmation_keyboard(&response.category);

        self.transport
            .send_message(
                chat_id,
                &confirmation_text(&response, &amount),
                Some(&keyboard),
            )
            .await?;
        Ok(())
    }

    async fn classify(
        &self,
        description: &str,
        user_id: i64,
    ) -> Result<ExpenseCategorizationResponse> {
        ClassificationService::new(self.llm.clone())
            .classify(description, false, Some(user_id))
            .await
            .map(|result| result.response)
            .map_err(|e| BotError::Classification(e.to_string()))
    }

    // ------------------------------------------------------------------
    // Step 2: user picks a category -> persist -> confirm
    // ------------------------------------------------------------------

    async fn handle_callback(&self, query: &CallbackQuery) -> Result<()> {
        self.transport.answer_callback_query(&query.id).await?;

        let Some(message) = &query.message else {
            return Ok(());
        };
        let chat_id = message.chat.id;
        let message_id = message.message_id;
        let key = (chat_id, query.from.id);

        match query.data.as_deref().and_then(Callback::parse) {
            Some(Callback::Category(category)) => {
                self.handle_category_selection(key, message_id, &category)
                    .await
            }
            Some(Callback::Currency(code)) => {
                self.handle_currency_selection(chat_id, message_id, query.from.id, &code)
                    .await
            }
            None => {
                self.conversations.clear(key);
                self.transport
                    .edit_message_text(chat_id, message_id, INVALID_SELECTION_TEXT)
                    .await
            }
        }
    }

    async fn handle_category_selection(
        &self,
        key: ConversationKey,
        message_id: i64,
        selected: &str,
    ) -> Result<()> {
        let (chat_id, user_id) = key;

        let Some(ConversationState::WaitingForConfirmation {
            description,
            response,
        }) = self.conversations.take(key)
        else {
            return self
                .transport
                .edit_message_text(chat_id, message_id, SESSION_EXPIRED_TEXT)
                .await;
        };

        info!(user_id, category = %selected, "Category selected");

        let saved = match self.persist(&description, &response, selected, user_id) {
            Ok(saved) => saved,
            Err(e) => {
                error!(user_id, error = %e, "Error persisting expense");
                return self
                    .transport
                    .edit_message_text(chat_id, message_id, SAVE_FAILED_TEXT)
                    .await;
            }
        };

        let resp = &saved.response;
        let preferred = self.preferred_currency(user_id)?;
        let amount = self
            .format_amount(resp.total_amount, resp.currency, preferred)
            .await;

        let text = format!(
            "✅ Expense saved!\n\n\
             Amount: {}\n\
             Category: {}\n\
             Description: {}\n\n\
             Send another expense to record it, or use /cancel to stop.",
            amount, resp.category, description
        );
        self.transport
            .edit_message_text(chat_id, message_id, &text)
            .await
    }

    /// Store the expense and its category in one transaction
    fn persist(
        &self,
        description: &str,
        response: &ExpenseCategorizationResponse,
        selected: &str,
        user_id: i64,
    ) -> Result<ClassificationResult> {
        let to_persistence = |e: tally_core::Error| BotError::Persistence(e.to_string());

        let session = Session::begin(&self.db).map_err(to_persistence)?;
        let service = ClassificationService::with_repos(
            self.llm.clone(),
            Arc::new(DbCategoryRepo::with_session(session.clone())),
            Arc::new(DbExpenseRepo::with_session(session.clone())),
        );
        let saved = service
            .persist_with_category(description, response, selected, Some(user_id))
            .map_err(to_persistence)?;
        session.commit().map_err(to_persistence)?;
        Ok(saved)
    }

    // ------------------------------------------------------------------
    // Preferred currency
    // ------------------------------------------------------------------

    async fn currency_command(&self, chat_id: i64, user_id: i64) -> Result<()> {
        let current = self.preferred_currency(user_id)?;
        let text = format!(
            "Select your preferred display currency.\nCurrent: {} {}",
            current.symbol(),
            current
        );
        self.transport
            .send_message(chat_id, &text, Some(&currency_selection_keyboard(current)))
            .await?;
        Ok(())
    }

    async fn handle_currency_selection(
        &self,
        chat_id: i64,
        message_id: i64,
        user_id: i64,
        code: &str,
    ) -> Result<()> {
        let Ok(currency) = code.parse::<Currency>() else {
            return self
                .transport
                .edit_message_text(chat_id, message_id, INVALID_CURRENCY_TEXT)
                .await;
        };

        DbUserPreferenceRepo::new(self.db.clone()).upsert(user_id, currency)?;
        info!(user_id, currency = %currency, "Preferred currency updated");

        let text = format!(
            "✅ Preferred currency set to {} {}\n\n\
             All expenses will now be displayed in this currency.",
            currency.symbol(),
            currency
        );
        self.transport
            .edit_message_text(chat_id, message_id, &text)
            .await
    }

    fn preferred_currency(&self, user_id: i64) -> Result<Currency> {
        let preference = DbUserPreferenceRepo::new(self.db.clone()).get_by_user_id(user_id)?;
        Ok(preference
            .map(|p| p.preferred_currency)
            .unwrap_or_default())
    }

    /// "$5.50 USD", plus "(≈ €5.06 EUR)" when the preferred currency differs
    /// and conversion succeeds
    async fn format_amount(
        &self,
        amount: Decimal,
        currency: Currency,
        preferred: Currency,
    ) -> String {
        let original = format!("{}{} {}", currency.symbol(), amount, currency);
        if currency == preferred {
            return original;
        }

        match self.converter.convert(amount, currency, preferred).await {
            Ok(converted) => format!(
                "{} (≈ {}{:.2} {})",
                original,
                preferred.symbol(),
                converted,
                preferred
            ),
            Err(e) => {
                warn!(from = %currency, to = %preferred, error = %e, "Currency conversion failed");
                original
            }
        }
    }
}

/// Run preprocessing, turning rejections into [`BotError::InvalidInput`]
pub fn validate_input(text: &str) -> Result<PreprocessResult> {
    let cleaned = preprocess(text);
    if cleaned.is_valid {
        Ok(cleaned)
    } else {
        Err(BotError::InvalidInput(cleaned.errors.join("\n")))
    }
}

/// "/start@TallyBot now" -> Some("start"); plain text -> None
fn command_name(text: &str) -> Option<&str> {
    let first = text.trim_start().split_whitespace().next()?;
    let command = first.strip_prefix('/')?;
    Some(command.split('@').next().unwrap_or(command))
}

fn confidence_icon(confidence: f64) -> &'static str {
    if confidence > 0.8 {
        "🟢"
    } else if confidence > 0.5 {
        "🟡"
    } else {
        "🔴"
    }
}

fn confirmation_text(response: &ExpenseCategorizationResponse, amount: &str) -> String {
    let mut text = format!(
        "💰 Expense Classification\n\n\
         Amount: {}\n\
         Suggested Category: {}\n\
         {} Confidence: {:.0}%\n",
        amount,
        response.category,
        confidence_icon(response.confidence),
        response.confidence * 100.0
    );
    if let Some(comments) = response.comments.as_deref().filter(|c| !c.is_empty()) {
        text.push_str(&format!("\n{}\n", comments));
    }
    text.push_str("\nPlease confirm or choose a different category:");
    text
}

fn update_chat_id(update: &Update) -> Option<i64> {
    update
        .message
        .as_ref()
        .map(|m| m.chat.id)
        .or_else(|| {
            update
                .callback_query
                .as_ref()
                .and_then(|q| q.message.as_ref())
                .map(|m| m.chat.id)
        })
}
