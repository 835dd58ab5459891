//! Tally CLI - AI-assisted expense tracker
//!
//! Usage:
//!   tally init                          Initialize database
//!   tally classify "Lunch 12.50 EUR"    Classify an expense (add --db to save)
//!   tally dashboard                     Spending overview
//!   tally serve --port 8000             Start REST API
//!   tally bot                           Start Telegram bot

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.database),
        Commands::Classify {
            description,
            db,
            no_db,
            user,
        } => {
            let db_path = (db && !no_db).then_some(cli.database.as_path());
            commands::cmd_classify(db_path, commands::llm_from_env, &description, user)
                .await
                .map(|_| ())
        }
        Commands::Serve { port, host } => commands::cmd_serve(&cli.database, &host, port).await,
        Commands::Bot => commands::cmd_bot(&cli.database).await,
        Commands::Dashboard { user, months } => {
            let db = commands::open_db(&cli.database)?;
            commands::cmd_dashboard(&db, user, months)
        }
        Commands::Expenses { action } => {
            let db = commands::open_db(&cli.database)?;
            match action {
                ExpenseAction::List { user, limit } => {
                    commands::cmd_expenses_list(&db, user, limit)
                }
                ExpenseAction::Show { id } => commands::cmd_expenses_show(&db, id),
                ExpenseAction::Delete { id } => commands::cmd_expenses_delete(&db, id),
            }
        }
        Commands::Categories => {
            let db = commands::open_db(&cli.database)?;
            commands::cmd_categories(&db)
        }
        Commands::Models => {
            let llm = commands::llm_from_env()?;
            commands::cmd_models(&llm).await
        }
    }
}
