//! CLI argument definitions using clap
//!
//! The command implementations live in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Tally - AI-assisted expense tracking
#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "Classify, store and review expenses with an LLM", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "tally.db", global = true)]
    pub database: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the database and seed the default categories
    Init,

    /// Classify a free-text expense description
    Classify {
        /// Expense description, e.g. "Coffee at Starbucks $5.50"
        description: String,

        /// Save the classified expense to the database
        #[arg(long = "db", overrides_with = "no_db")]
        db: bool,

        /// Only classify, do not save (default)
        #[arg(long = "no-db", overrides_with = "db")]
        no_db: bool,

        /// Owner to record on the saved expense
        #[arg(long)]
        user: Option<i64>,
    },

    /// Start the REST API server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },

    /// Run the Telegram bot (requires TELEGRAM_BOT_TOKEN)
    Bot,

    /// Show the spending dashboard
    Dashboard {
        /// Only this user's expenses
        #[arg(long)]
        user: Option<i64>,

        /// Months covered by the trend (1-1200)
        #[arg(long, default_value = "12", value_parser = clap::value_parser!(u32).range(1..=1200))]
        months: u32,
    },

    /// Manage stored expenses
    Expenses {
        #[command(subcommand)]
        action: ExpenseAction,
    },

    /// List expense categories
    Categories,

    /// List models offered by the configured LLM provider
    Models,
}

#[derive(Subcommand)]
pub enum ExpenseAction {
    /// List expenses, newest first
    List {
        /// Only this user's expenses
        #[arg(long)]
        user: Option<i64>,

        /// Maximum number to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Show one expense
    Show {
        /// Expense ID
        id: i64,
    },

    /// Delete an expense
    Delete {
        /// Expense ID
        id: i64,
    },
}
