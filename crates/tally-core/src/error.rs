//! Error types for Tally

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Decimal error: {0}")]
    Decimal(#[from] rust_decimal::Error),

    #[error("Category not found: {0}")]
    CategoryNotFound(String),

    #[error("Expense not found: {0}")]
    ExpenseNotFound(i64),

    #[error("Category already exists: {0}")]
    CategoryExists(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    /// LLM or exchange-rate provider failure, including malformed output
    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl Error {
    /// Map a failed HTTP call, reporting timeouts as upstream failures
    pub(crate) fn from_request(err: reqwest::Error, service: &str) -> Self {
        if err.is_timeout() {
            Error::Upstream(format!("{} request timed out", service))
        } else {
            Error::Http(err)
        }
    }

    /// True for the category/expense not-found kinds
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::CategoryNotFound(_) | Error::ExpenseNotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
