//! Telegram bot command

use std::path::Path;

use anyhow::{Context, Result};
use tally_bot::BotConfig;
use tally_core::CurrencyConverter;

use super::{llm_from_env, open_db};

pub async fn cmd_bot(db_path: &Path) -> Result<()> {
    let config = BotConfig::from_env().context("Failed to configure Telegram bot")?;
    let llm = llm_from_env()?;
    let converter = CurrencyConverter::from_env();
    let db = open_db(db_path)?;

    println!("🤖 Starting Tally Telegram bot...");
    println!("   Database: {}", db_path.display());
    println!("   Press Ctrl-C to stop");
    println!();

    tally_bot::run(config, db, llm, converter)
        .await
        .context("Telegram bot stopped with an error")
}
