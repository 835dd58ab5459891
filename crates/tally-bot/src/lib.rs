//! Tally Telegram Bot
//!
//! Long-polls the Bot API and runs each update through [`ExpenseBot`]:
//! - `/start`, `/help`, `/cancel` and `/currency` commands
//! - Free-text expenses go through classify, confirm, persist
//! - Category and currency choices arrive as inline keyboard callbacks

use std::time::Duration;

use tracing::{info, warn};

use tally_core::{CurrencyConverter, Database, LlmClient};

pub mod api;
pub mod conversation;
pub mod error;
pub mod handlers;
pub mod keyboards;

pub use api::{BotTransport, TelegramApi, Update};
pub use error::{BotError, Result};
pub use handlers::ExpenseBot;

/// Server-side long-poll timeout for getUpdates
pub const DEFAULT_POLL_TIMEOUT_SECS: u64 = 30;

/// Pause after a failed getUpdates before polling again
const RETRY_DELAY: Duration = Duration::from_secs(5);

/// Bot configuration
#[derive(Clone)]
pub struct BotConfig {
    pub token: String,
    pub poll_timeout_secs: u64,
}

impl BotConfig {
    /// Read `TELEGRAM_BOT_TOKEN` (required)
    pub fn from_env() -> Result<Self> {
        let token = std::env::var("TELEGRAM_BOT_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| {
                tally_core::Error::Configuration("TELEGRAM_BOT_TOKEN is not set".to_string())
            })?;

        Ok(Self {
            token,
            poll_timeout_secs: DEFAULT_POLL_TIMEOUT_SECS,
        })
    }
}

/// Fetch one batch of updates and handle them in order
///
/// Returns the offset for the next poll.
pub async fn poll_once<T: BotTransport>(
    bot: &ExpenseBot<T>,
    offset: i64,
    timeout_secs: u64,
) -> Result<i64> {
    let updates = bot.transport().get_updates(offset, timeout_secs).await?;

    let mut next = offset;
    for update in &updates {
        next = next.max(update.update_id + 1);
        bot.handle_update(update).await;
    }
    Ok(next)
}

/// Poll until Ctrl-C
pub async fn run_polling<T: BotTransport>(bot: &ExpenseBot<T>, timeout_secs: u64) -> Result<()> {
    info!("Starting bot polling...");
    let mut offset = 0;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down bot");
                return Ok(());
            }
            polled = poll_once(bot, offset, timeout_secs) => match polled {
                Ok(next) => offset = next,
                Err(e) => {
                    warn!(error = %e, "getUpdates failed, retrying in {}s", RETRY_DELAY.as_secs());
                    tokio::time::sleep(RETRY_DELAY).await;
                }
            },
        }
    }
}

/// Start the bot against the real Bot API
pub async fn run(
    config: BotConfig,
    db: Database,
    llm: LlmClient,
    converter: CurrencyConverter,
) -> Result<()> {
    let seeded = db.seed_categories()?;
    if seeded > 0 {
        info!("Seeded {} default categories", seeded);
    }
    if !converter.has_api_key() {
        info!("ℹ️  EXCHANGE_RATE_API_KEY not set - amounts shown without conversion");
    }

    info!("Bot configured (LLM: {})", tally_core::ai::LlmBackend::provider(&llm));

    let bot = ExpenseBot::new(TelegramApi::new(&config.token), db, llm, converter);
    run_polling(&bot, config.poll_timeout_secs).await
}
