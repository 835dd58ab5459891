//! Expense commands (list, show, delete)

use anyhow::{Context, Result};
use tally_core::models::Expense;
use tally_core::{Database, DbExpenseRepo, ExpenseRepository};

use super::truncate;

/// Newest-first expenses, optionally limited to one owner
fn newest_first(repo: &DbExpenseRepo, user_id: Option<i64>) -> Result<Vec<Expense>> {
    match user_id {
        Some(user) => Ok(repo.list_by_user(user)?),
        None => {
            let mut expenses = repo.list()?;
            expenses.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));
            Ok(expenses)
        }
    }
}

pub fn cmd_expenses_list(db: &Database, user_id: Option<i64>, limit: usize) -> Result<()> {
    let repo = DbExpenseRepo::new(db.clone());
    let expenses = newest_first(&repo, user_id)?;

    if expenses.is_empty() {
        println!("No expenses found. Add one with:");
        println!("  tally classify \"Lunch 12.50 EUR\" --db");
        return Ok(());
    }

    println!();
    println!("📝 Expenses ({} total)", expenses.len());
    println!("   ─────────────────────────────────────────────────────────────");

    for expense in expenses.iter().take(limit) {
        println!(
            "   [{:>4}] {} │ {:>10} {} │ {:16} │ {}",
            expense.id,
            expense.date.format("%Y-%m-%d"),
            expense.amount.to_string(),
            expense.currency.as_str(),
            expense.category_name().unwrap_or("-"),
            truncate(expense.description.as_deref().unwrap_or(""), 35)
        );
    }

    Ok(())
}

pub fn cmd_expenses_show(db: &Database, id: i64) -> Result<()> {
    let repo = DbExpenseRepo::new(db.clone());
    let expense = repo
        .get(id)
        .with_context(|| format!("Expense {} not found", id))?;

    println!();
    println!("🧾 Expense #{}", expense.id);
    println!("   ─────────────────────────────────────────────────────────────");
    println!(
        "   Amount:      {}{} {}",
        expense.currency.symbol(),
        expense.amount,
        expense.currency
    );
    println!(
        "   Category:    {}",
        expense.category_name().unwrap_or("(uncategorized)")
    );
    println!(
        "   Description: {}",
        expense.description.as_deref().unwrap_or("")
    );
    println!("   Date:        {}", expense.date.format("%Y-%m-%d %H:%M UTC"));
    if let Some(user) = expense.telegram_user_id {
        println!("   User:        {}", user);
    }
    println!("   Created:     {}", expense.created_at.format("%Y-%m-%d %H:%M UTC"));
    println!("   Updated:     {}", expense.updated_at.format("%Y-%m-%d %H:%M UTC"));

    Ok(())
}

pub fn cmd_expenses_delete(db: &Database, id: i64) -> Result<()> {
    let repo = DbExpenseRepo::new(db.clone());
    repo.delete(id)
        .with_context(|| format!("Failed to delete expense {}", id))?;
    println!("🗑️  Deleted expense #{}", id);
    Ok(())
}
