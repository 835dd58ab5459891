//! SQLite-backed expense repository

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;

use super::{format_datetime, parse_datetime, ConnSource, Database, Session};
use crate::error::{Error, Result};
use crate::models::{Currency, Expense, ExpenseCategory, NewExpense};
use crate::repo::ExpenseRepository;

const SELECT_EXPENSE: &str = "SELECT e.id, e.amount, e.currency, e.description, e.date,
        e.created_at, e.updated_at, e.telegram_user_id, c.id, c.name
    FROM expenses e
    LEFT JOIN expense_categories c ON c.id = e.category_id";

#[derive(Clone)]
pub struct DbExpenseRepo {
    source: ConnSource,
}

impl DbExpenseRepo {
    /// Repository that checks out a pooled connection per call
    pub fn new(db: Database) -> Self {
        Self {
            source: ConnSource::Pool(db),
        }
    }

    /// Repository that writes through a caller-owned session
    pub fn with_session(session: Arc<Session>) -> Self {
        Self {
            source: ConnSource::Session(session),
        }
    }

    fn query(&self, filter: &str, args: impl rusqlite::Params) -> Result<Vec<Expense>> {
        self.source.with_conn(|conn| query_expenses(conn, filter, args))
    }
}

fn query_expenses(
    conn: &Connection,
    filter: &str,
    args: impl rusqlite::Params,
) -> Result<Vec<Expense>> {
    let sql = format!("{} {}", SELECT_EXPENSE, filter);
    let mut stmt = conn.prepare(&sql)?;
    let expenses = stmt
        .query_map(args, row_to_expense)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(expenses)
}

fn row_to_expense(row: &Row) -> rusqlite::Result<Expense> {
    let amount: String = row.get(1)?;
    let amount: Decimal = amount
        .parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e)))?;
    let currency: String = row.get(2)?;
    let currency: Currency = currency
        .parse()
        .map_err(|e: String| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, e.into()))?;

    let category_id: Option<i64> = row.get(8)?;
    let category_name: Option<String> = row.get(9)?;
    let category = match (category_id, category_name) {
        (Some(id), Some(name)) => Some(ExpenseCategory { id, name }),
        _ => None,
    };

    Ok(Expense {
        id: row.get(0)?,
        amount,
        currency,
        description: row.get(3)?,
        date: parse_datetime(&row.get::<_, String>(4)?),
        created_at: parse_datetime(&row.get::<_, String>(5)?),
        updated_at: parse_datetime(&row.get::<_, String>(6)?),
        telegram_user_id: row.get(7)?,
        category,
    })
}

impl ExpenseRepository for DbExpenseRepo {
    fn add(&self, expense: NewExpense) -> Result<Expense> {
        let now = Utc::now();
        let date = expense.date.unwrap_or(now);

        self.source.with_conn(|conn| {
            conn.execute(
                "INSERT INTO expenses (amount, currency, description, date,
                     created_at, updated_at, category_id, telegram_user_id)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    expense.amount.to_string(),
                    expense.currency.as_str(),
                    expense.description,
                    format_datetime(&date),
                    format_datetime(&now),
                    format_datetime(&now),
                    expense.category.as_ref().map(|c| c.id),
                    expense.telegram_user_id,
                ],
            )?;
            let id = conn.last_insert_rowid();

            query_expenses(conn, "WHERE e.id = ?", params![id])?
                .into_iter()
                .next()
                .ok_or(Error::ExpenseNotFound(id))
        })
    }

    fn get(&self, id: i64) -> Result<Expense> {
        self.source.with_conn(|conn| {
            let sql = format!("{} WHERE e.id = ?", SELECT_EXPENSE);
            conn.query_row(&sql, params![id], row_to_expense)
                .optional()?
                .ok_or(Error::ExpenseNotFound(id))
        })
    }

    fn update(&self, expense: &Expense) -> Result<()> {
        self.source.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE expenses SET amount = ?, currency = ?, description = ?, date = ?,
                    updated_at = ?, category_id = ?, telegram_user_id = ?
                 WHERE id = ?",
                params![
                    expense.amount.to_string(),
                    expense.currency.as_str(),
                    expense.description,
                    format_datetime(&expense.date),
                    format_datetime(&Utc::now()),
                    expense.category.as_ref().map(|c| c.id),
                    expense.telegram_user_id,
                    expense.id,
                ],
            )?;
            if updated == 0 {
                return Err(Error::ExpenseNotFound(expense.id));
            }
            Ok(())
        })
    }

    fn delete(&self, id: i64) -> Result<()> {
        self.source.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM expenses WHERE id = ?", params![id])?;
            if deleted == 0 {
                return Err(Error::ExpenseNotFound(id));
            }
            Ok(())
        })
    }

    fn list(&self) -> Result<Vec<Expense>> {
        self.query("ORDER BY e.id", [])
    }

    fn search_by_dates(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Vec<Expense>> {
        self.query(
            "WHERE e.date >= ? AND e.date <= ? ORDER BY e.date",
            params![format_datetime(&from), format_datetime(&to)],
        )
    }

    fn search_by_category(&self, category: &ExpenseCategory) -> Result<Vec<Expense>> {
        self.query(
            "WHERE e.category_id = ? ORDER BY e.date",
            params![category.id],
        )
    }

    fn list_by_user(&self, user_id: i64) -> Result<Vec<Expense>> {
        self.query(
            "WHERE e.telegram_user_id = ? ORDER BY e.date DESC, e.id DESC",
            params![user_id],
        )
    }
}
