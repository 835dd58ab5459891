//! Map-backed repositories (non-persistent)

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use super::{CategoryRepository, ExpenseRepository, UserPreferenceRepository};
use crate::error::{Error, Result};
use crate::models::{Currency, Expense, ExpenseCategory, NewExpense, UserPreference};

/// Map plus the next id to hand out
struct Table<T> {
    rows: BTreeMap<i64, T>,
    next_id: i64,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            next_id: 1,
        }
    }
}

impl<T> Table<T> {
    fn allocate_id(&mut self) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| Error::InvalidData("In-memory repository lock poisoned".into()))
}

#[derive(Default)]
pub struct InMemoryCategoryRepo {
    table: Mutex<Table<ExpenseCategory>>,
}

impl InMemoryCategoryRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CategoryRepository for InMemoryCategoryRepo {
    fn add(&self, name: &str) -> Result<ExpenseCategory> {
        let mut table = lock(&self.table)?;
        if table.rows.values().any(|c| c.name == name) {
            return Err(Error::CategoryExists(name.to_string()));
        }
        let category = ExpenseCategory {
            id: table.allocate_id(),
            name: name.to_string(),
        };
        table.rows.insert(category.id, category.clone());
        Ok(category)
    }

    fn update(&self, category: &ExpenseCategory) -> Result<()> {
        let mut table = lock(&self.table)?;
        if table
            .rows
            .values()
            .any(|c| c.name == category.name && c.id != category.id)
        {
            return Err(Error::CategoryExists(category.name.clone()));
        }
        match table.rows.get_mut(&category.id) {
            Some(existing) => {
                existing.name = category.name.clone();
                Ok(())
            }
            None => Err(Error::CategoryNotFound(category.name.clone())),
        }
    }

    fn get(&self, name: &str) -> Result<ExpenseCategory> {
        lock(&self.table)?
            .rows
            .values()
            .find(|c| c.name == name)
            .cloned()
            .ok_or_else(|| Error::CategoryNotFound(name.to_string()))
    }

    fn delete(&self, name: &str) -> Result<()> {
        let mut table = lock(&self.table)?;
        let id = table
            .rows
            .values()
            .find(|c| c.name == name)
            .map(|c| c.id)
            .ok_or_else(|| Error::CategoryNotFound(name.to_string()))?;
        table.rows.remove(&id);
        Ok(())
    }

    fn list(&self) -> Result<Vec<ExpenseCategory>> {
        let mut categories: Vec<ExpenseCategory> =
            lock(&self.table)?.rows.values().cloned().collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }
}

#[derive(Default)]
pub struct InMemoryExpenseRepo {
    table: Mutex<Table<Expense>>,
}

impl InMemoryExpenseRepo {
    pub fn new() -> Self {
        Self::default()
    }

    fn filtered(&self, keep: impl Fn(&Expense) -> bool) -> Result<Vec<Expense>> {
        Ok(lock(&self.table)?
            .rows
            .values()
            .filter(|e| keep(e))
            .cloned()
            .collect())
    }
}

impl ExpenseRepository for InMemoryExpenseRepo {
    fn add(&self, expense: NewExpense) -> Result<Expense> {
        let mut table = lock(&self.table)?;
        let now = Utc::now();
        let expense = Expense {
            id: table.allocate_id(),
            amount: expense.amount,
            currency: expense.currency,
            description: expense.description,
            date: expense.date.unwrap_or(now),
            created_at: now,
            updated_at: now,
            category: expense.category,
            telegram_user_id: expense.telegram_user_id,
        };
        table.rows.insert(expense.id, expense.clone());
        Ok(expense)
    }

    fn get(&self, id: i64) -> Result<Expense> {
        lock(&self.table)?
            .rows
            .get(&id)
            .cloned()
            .ok_or(Error::ExpenseNotFound(id))
    }

    fn update(&self, expense: &Expense) -> Result<()> {
        let mut table = lock(&self.table)?;
        match table.rows.get_mut(&expense.id) {
            Some(existing) => {
                *existing = Expense {
                    created_at: existing.created_at,
                    updated_at: Utc::now(),
                    ..expense.clone()
                };
                Ok(())
            }
            None => Err(Error::ExpenseNotFound(expense.id)),
        }
    }

    fn delete(&self, id: i64) -> Result<()> {
        lock(&self.table)?
            .rows
            .remove(&id)
            .map(|_| ())
            .ok_or(Error::ExpenseNotFound(id))
    }

    fn list(&self) -> Result<Vec<Expense>> {
        self.filtered(|_| true)
    }

    fn search_by_dates(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Vec<Expense>> {
        self.filtered(|e| e.date >= from && e.date <= to)
    }

    fn search_by_category(&self, category: &ExpenseCategory) -> Result<Vec<Expense>> {
        self.filtered(|e| e.category.as_ref().map(|c| c.id) == Some(category.id))
    }

    fn list_by_user(&self, user_id: i64) -> Result<Vec<Expense>> {
        let mut expenses = self.filtered(|e| e.telegram_user_id == Some(user_id))?;
        expenses.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| b.id.cmp(&a.id)));
        Ok(expenses)
    }
}

#[derive(Default)]
pub struct InMemoryUserPreferenceRepo {
    table: Mutex<Table<UserPreference>>,
}

impl InMemoryUserPreferenceRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UserPreferenceRepository for InMemoryUserPreferenceRepo {
    fn get_by_user_id(&self, user_id: i64) -> Result<Option<UserPreference>> {
        Ok(lock(&self.table)?
            .rows
            .values()
            .find(|p| p.telegram_user_id == user_id)
            .cloned())
    }

    fn upsert(&self, user_id: i64, currency: Currency) -> Result<UserPreference> {
        let mut table = lock(&self.table)?;
        let now = Utc::now();

        if let Some(existing) = table
            .rows
            .values_mut()
            .find(|p| p.telegram_user_id == user_id)
        {
            existing.preferred_currency = currency;
            existing.updated_at = now;
            return Ok(existing.clone());
        }

        let preference = UserPreference {
            id: table.allocate_id(),
            telegram_user_id: user_id,
            preferred_currency: currency,
            created_at: now,
            updated_at: now,
        };
        table.rows.insert(preference.id, preference.clone());
        Ok(preference)
    }
}
