//! Core command implementations and shared utilities
//!
//! - `open_db` - open (and migrate) the database
//! - `llm_from_env` - build the configured LLM client
//! - `cmd_init` - initialize the database

use std::path::Path;

use anyhow::{Context, Result};
use tally_core::{Database, LlmClient};

pub fn open_db(db_path: &Path) -> Result<Database> {
    let path_str = db_path
        .to_str()
        .with_context(|| format!("Database path is not valid UTF-8: {}", db_path.display()))?;
    Database::new(path_str).context("Failed to open database")
}

pub fn llm_from_env() -> Result<LlmClient> {
    LlmClient::from_env()
        .context("Failed to configure LLM provider (set LLM_PROVIDER and its API key)")
}

pub fn cmd_init(db_path: &Path) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    let db = open_db(db_path)?;
    let seeded = db
        .seed_categories()
        .context("Failed to seed default categories")?;
    if seeded > 0 {
        println!("   Seeded {} default categories", seeded);
    } else {
        println!("   Default categories already present");
    }

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Classify an expense: tally classify \"Lunch 12.50 EUR\" --db");
    println!("  2. Review spending: tally dashboard");

    Ok(())
}
