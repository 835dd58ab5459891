//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - init and shared utilities (open_db, llm_from_env)
//! - `classify` - one-shot expense classification
//! - `expenses` - list, show and delete stored expenses
//! - `categories` - category listing
//! - `dashboard` - terminal spending overview
//! - `models` - provider model listing
//! - `serve` - REST API server
//! - `bot` - Telegram bot

pub mod bot;
pub mod categories;
pub mod classify;
pub mod core;
pub mod dashboard;
pub mod expenses;
pub mod models;
pub mod serve;

// Re-export command functions for main.rs
pub use self::core::*;
pub use bot::*;
pub use categories::*;
pub use classify::*;
pub use dashboard::*;
pub use expenses::*;
pub use models::*;
pub use serve::*;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
