//! Spending dashboard
//!
//! `analytics_summary` backs the REST analytics endpoint; `Dashboard`
//! adds the recent-expense list and renders the terminal view.

use std::fmt::{self, Write};

use chrono::Utc;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::error::Result;
use crate::models::{AnalyticsSummary, Expense};
use crate::repo::{category_totals, monthly_totals, ExpenseRepository};

pub const RECENT_EXPENSES: usize = 5;
const BAR_WIDTH: usize = 24;

/// Totals for one user over the last `months` calendar months
///
/// `total_expenses` is the sum of the category totals; `expense_count`
/// covers all of the user's expenses.
pub fn analytics_summary(
    repo: &dyn ExpenseRepository,
    user_id: i64,
    months: u32,
) -> Result<AnalyticsSummary> {
    let category_totals = repo.get_category_totals(user_id)?;
    let monthly_totals = repo.get_monthly_totals(user_id, months)?;
    let expense_count = repo.list_by_user(user_id)?.len();

    Ok(AnalyticsSummary {
        total_expenses: category_totals.iter().map(|c| c.total).sum(),
        expense_count,
        category_totals,
        monthly_totals,
    })
}

#[derive(Debug, Clone)]
pub struct Dashboard {
    pub summary: AnalyticsSummary,
    pub recent: Vec<Expense>,
}

impl Dashboard {
    /// Load one user's dashboard, or everyone's when `user_id` is `None`
    pub fn load(repo: &dyn ExpenseRepository, user_id: Option<i64>, months: u32) -> Result<Self> {
        let expenses = match user_id {
            Some(id) => repo.list_by_user(id)?,
            None => {
                let mut all = repo.list()?;
                all.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| b.id.cmp(&a.id)));
                all
            }
        };
        Ok(Self::from_expenses(&expenses, months))
    }

    /// Build from expenses sorted newest first
    pub fn from_expenses(expenses: &[Expense], months: u32) -> Self {
        let category_totals = category_totals(expenses);
        let summary = AnalyticsSummary {
            total_expenses: category_totals.iter().map(|c| c.total).sum(),
            expense_count: expenses.len(),
            monthly_totals: monthly_totals(expenses, months, Utc::now().date_naive()),
            category_totals,
        };
        Self {
            summary,
            recent: expenses.iter().take(RECENT_EXPENSES).cloned().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.summary.expense_count == 0
    }

    pub fn render(&self) -> String {
        self.to_string()
    }

    fn write_to(&self, out: &mut impl Write) -> fmt::Result {
        let summary = &self.summary;

        writeln!(out)?;
        writeln!(out, "╭─────────────────────────────────────────╮")?;
        writeln!(out, "│           💰 Tally Dashboard            │")?;
        writeln!(out, "╰─────────────────────────────────────────╯")?;
        writeln!(out)?;

        if self.is_empty() {
            writeln!(out, "  No expenses recorded yet. Classify one with:")?;
            writeln!(out, "    tally classify \"Coffee at Starbucks $5.50\"")?;
            return Ok(());
        }

        writeln!(out, "  Total spent:     {:.2}", summary.total_expenses)?;
        writeln!(out, "  Expenses:        {}", summary.expense_count)?;
        writeln!(out, "  Categories:      {}", summary.category_totals.len())?;
        writeln!(out)?;

        writeln!(out, "  📊 By category")?;
        writeln!(out, "   ─────────────────────────────────────────────────────────────")?;
        let top = summary
            .category_totals
            .iter()
            .map(|c| c.total)
            .max()
            .unwrap_or(Decimal::ZERO);
        for total in &summary.category_totals {
            writeln!(
                out,
                "   {:18} │ {:<width$} │ {:>10.2}",
                total.category,
                bar(total.total, top),
                total.total,
                width = BAR_WIDTH
            )?;
        }
        writeln!(out)?;

        writeln!(out, "  📈 Monthly trend")?;
        writeln!(out, "   ─────────────────────────────────────────────────────────────")?;
        if summary.monthly_totals.is_empty() {
            writeln!(out, "   No spending in this period.")?;
        }
        let top = summary
            .monthly_totals
            .iter()
            .map(|m| m.total)
            .max()
            .unwrap_or(Decimal::ZERO);
        for month in &summary.monthly_totals {
            writeln!(
                out,
                "   {:18} │ {:<width$} │ {:>10.2}",
                month.month,
                bar(month.total, top),
                month.total,
                width = BAR_WIDTH
            )?;
        }
        writeln!(out)?;

        writeln!(out, "  🕒 Recent expenses")?;
        writeln!(out, "   ─────────────────────────────────────────────────────────────")?;
        for expense in &self.recent {
            writeln!(
                out,
                "   {} │ {:>10.2} {} │ {:16} │ {}",
                expense.date.format("%Y-%m-%d"),
                expense.amount,
                expense.currency,
                expense.category_name().unwrap_or("-"),
                expense.description.as_deref().unwrap_or("")
            )?;
        }

        Ok(())
    }
}

impl fmt::Display for Dashboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_to(f)
    }
}

/// Horizontal bar scaled against `max`
fn bar(value: Decimal, max: Decimal) -> String {
    if max <= Decimal::ZERO || value <= Decimal::ZERO {
        return String::new();
    }
    let cells = (value * Decimal::from(BAR_WIDTH) / max)
        .round()
        .to_usize()
        .unwrap_or(BAR_WIDTH)
        .clamp(1, BAR_WIDTH);
    "█".repeat(cells)
}
