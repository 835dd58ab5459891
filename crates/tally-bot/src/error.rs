//! Error types for the Telegram bot

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BotError {
    /// Input rejected by preprocessing
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Classification failed: {0}")]
    Classification(String),

    #[error("Failed to save expense: {0}")]
    Persistence(String),

    /// Bot API transport failure or `ok: false` reply
    #[error("Telegram API error: {0}")]
    Telegram(String),

    #[error(transparent)]
    Core(#[from] tally_core::Error),
}

impl From<reqwest::Error> for BotError {
    fn from(err: reqwest::Error) -> Self {
        BotError::Telegram(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BotError>;
