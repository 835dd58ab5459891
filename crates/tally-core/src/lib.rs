//! Tally Core Library
//!
//! Shared functionality for the Tally expense tracker:
//! - Database access, migrations and transactional sessions
//! - Repository contracts with in-memory and SQLite implementations
//! - Pluggable LLM backends (OpenAI, Groq, offline mock)
//! - Classification pipeline with human-in-the-loop category override
//! - Input preprocessing
//! - Currency conversion and LLM tools
//! - Terminal dashboard

pub mod ai;
pub mod classification;
pub mod currency;
pub mod dashboard;
pub mod db;
pub mod error;
pub mod models;
pub mod preprocess;
pub mod prompts;
pub mod repo;
pub mod tools;

/// Test utilities including mock OpenAI-compatible server
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use ai::{
    AssistantReply, ChatMessage, ExpenseCategorizationResponse, GroqBackend, LlmBackend,
    LlmClient, MockBackend, OpenAIBackend,
};
pub use classification::{ClassificationResult, ClassificationService};
pub use currency::CurrencyConverter;
pub use dashboard::{analytics_summary, Dashboard};
pub use db::{Database, DbCategoryRepo, DbExpenseRepo, DbUserPreferenceRepo, Session};
pub use error::{Error, Result};
pub use preprocess::{preprocess, PreprocessResult};
pub use repo::{
    CategoryRepository, ExpenseRepository, InMemoryCategoryRepo, InMemoryExpenseRepo,
    InMemoryUserPreferenceRepo, UserPreferenceRepository,
};
pub use tools::ToolBox;
