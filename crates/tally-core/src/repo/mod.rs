//! Repository contracts for categories, expenses, and user preferences
//!
//! Two implementations share each contract:
//! - `memory` - map-backed, process lifetime, auto-incrementing ids
//! - `crate::db` - SQLite-backed, pooled or session-scoped connections
//!
//! Lookups and deletes of a missing key return
//! [`Error::CategoryNotFound`] / [`Error::ExpenseNotFound`]. Searches that
//! match nothing return an empty list.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;

use crate::error::{Error, Result};
use crate::models::{
    CategoryTotal, Currency, Expense, ExpenseCategory, MonthlyTotal, NewExpense, UserPreference,
};

mod memory;

pub use memory::{InMemoryCategoryRepo, InMemoryExpenseRepo, InMemoryUserPreferenceRepo};

/// Label used in category totals for expenses without a category
pub const UNCATEGORIZED: &str = "Uncategorized";

pub trait CategoryRepository: Send + Sync {
    /// Create a category. Fails with `CategoryExists` on a duplicate name.
    fn add(&self, name: &str) -> Result<ExpenseCategory>;

    /// Rename a category by id
    fn update(&self, category: &ExpenseCategory) -> Result<()>;

    /// Exact, case-sensitive lookup by name
    fn get(&self, name: &str) -> Result<ExpenseCategory>;

    fn delete(&self, name: &str) -> Result<()>;

    /// All categories ordered by name
    fn list(&self) -> Result<Vec<ExpenseCategory>>;

    /// Return the named category, creating it when absent
    fn get_or_create(&self, name: &str) -> Result<ExpenseCategory> {
        match self.get(name) {
            Ok(category) => Ok(category),
            Err(Error::CategoryNotFound(_)) => self.add(name),
            Err(e) => Err(e),
        }
    }
}

pub trait ExpenseRepository: Send + Sync {
    fn add(&self, expense: NewExpense) -> Result<Expense>;

    fn get(&self, id: i64) -> Result<Expense>;

    /// Overwrite amount, currency, description, date, category and owner
    fn update(&self, expense: &Expense) -> Result<()>;

    fn delete(&self, id: i64) -> Result<()>;

    fn list(&self) -> Result<Vec<Expense>>;

    /// Expenses dated within `from..=to`
    fn search_by_dates(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Vec<Expense>>;

    fn search_by_category(&self, category: &ExpenseCategory) -> Result<Vec<Expense>>;

    /// A user's expenses, newest first
    fn list_by_user(&self, user_id: i64) -> Result<Vec<Expense>>;

    /// Per-category totals for a user, largest first
    fn get_category_totals(&self, user_id: i64) -> Result<Vec<CategoryTotal>> {
        Ok(category_totals(&self.list_by_user(user_id)?))
    }

    /// Per-month totals for a user over the last `months` calendar months
    fn get_monthly_totals(&self, user_id: i64, months: u32) -> Result<Vec<MonthlyTotal>> {
        Ok(monthly_totals(
            &self.list_by_user(user_id)?,
            months,
            Utc::now().date_naive(),
        ))
    }
}

pub trait UserPreferenceRepository: Send + Sync {
    fn get_by_user_id(&self, user_id: i64) -> Result<Option<UserPreference>>;

    /// Insert or update the user's preferred currency
    fn upsert(&self, user_id: i64, currency: Currency) -> Result<UserPreference>;
}

/// Sum amounts per category name, largest total first.
///
/// Amounts are summed as-is regardless of currency.
pub fn category_totals(expenses: &[Expense]) -> Vec<CategoryTotal> {
    let mut totals: BTreeMap<String, Decimal> = BTreeMap::new();
    for expense in expenses {
        let name = expense.category_name().unwrap_or(UNCATEGORIZED).to_string();
        *totals.entry(name).or_default() += expense.amount;
    }

    let mut totals: Vec<CategoryTotal> = totals
        .into_iter()
        .map(|(category, total)| CategoryTotal { category, total })
        .collect();
    totals.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.category.cmp(&b.category)));
    totals
}

/// Sum amounts per "YYYY-MM", oldest first, keeping only the calendar month
/// of `today` and the `months - 1` months before it.
pub fn monthly_totals(expenses: &[Expense], months: u32, today: NaiveDate) -> Vec<MonthlyTotal> {
    if months == 0 {
        return Vec::new();
    }

    let start = first_month(today, months);
    let mut totals: BTreeMap<String, Decimal> = BTreeMap::new();
    for expense in expenses.iter().filter(|e| e.date.date_naive() >= start) {
        let month = expense.date.format("%Y-%m").to_string();
        *totals.entry(month).or_default() += expense.amount;
    }

    totals
        .into_iter()
        .map(|(month, total)| MonthlyTotal { month, total })
        .collect()
}

/// First day of the month `months - 1` months before `today`'s month
///
/// Windows reaching past the earliest representable date start at
/// `NaiveDate::MIN`.
fn first_month(today: NaiveDate, months: u32) -> NaiveDate {
    let back = i64::from(months.saturating_sub(1));
    let index = i64::from(today.year()) * 12 + i64::from(today.month0()) - back;
    i32::try_from(index.div_euclid(12))
        .ok()
        .and_then(|year| NaiveDate::from_ymd_opt(year, index.rem_euclid(12) as u32 + 1, 1))
        .unwrap_or(NaiveDate::MIN)
}

#[cfg(test)]
pub(crate) mod tests;
