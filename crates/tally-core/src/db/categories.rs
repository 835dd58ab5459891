//! SQLite-backed category repository

use std::sync::Arc;

use rusqlite::{params, OptionalExtension};

use super::{ConnSource, Database, Session};
use crate::error::{Error, Result};
use crate::models::ExpenseCategory;
use crate::repo::CategoryRepository;

#[derive(Clone)]
pub struct DbCategoryRepo {
    source: ConnSource,
}

impl DbCategoryRepo {
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
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

impl CategoryRepository for DbCategoryRepo {
    fn add(&self, name: &str) -> Result<ExpenseCategory> {
        self.source.with_conn(|conn| {
            match conn.execute(
                "INSERT INTO expense_categories (name) VALUES (?)",
                params![name],
            ) {
                Ok(_) => Ok(ExpenseCategory {
                    id: conn.last_insert_rowid(),
                    name: name.to_string(),
                }),
                Err(e) if is_unique_violation(&e) => Err(Error::CategoryExists(name.to_string())),
                Err(e) => Err(e.into()),
            }
        })
    }

    fn update(&self, category: &ExpenseCategory) -> Result<()> {
        self.source.with_conn(|conn| {
            let updated = conn
                .execute(
                    "UPDATE expense_categories SET name = ? WHERE id = ?",
                    params![category.name, category.id],
                )
                .map_err(|e| {
                    if is_unique_violation(&e) {
                        Error::CategoryExists(category.name.clone())
                    } else {
                        e.into()
                    }
                })?;
            if updated == 0 {
                return Err(Error::CategoryNotFound(category.name.clone()));
            }
            Ok(())
        })
    }

    fn get(&self, name: &str) -> Result<ExpenseCategory> {
        self.source.with_conn(|conn| {
            conn.query_row(
                "SELECT id, name FROM expense_categories WHERE name = ?",
                params![name],
                |row| {
                    Ok(ExpenseCategory {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                },
            )
            .optional()?
            .ok_or_else(|| Error::CategoryNotFound(name.to_string()))
        })
    }

    fn delete(&self, name: &str) -> Result<()> {
        self.source.with_conn(|conn| {
            let deleted = conn.execute(
                "DELETE FROM expense_categories WHERE name = ?",
                params![name],
            )?;
            if deleted == 0 {
                return Err(Error::CategoryNotFound(name.to_string()));
            }
            Ok(())
        })
    }

    fn list(&self) -> Result<Vec<ExpenseCategory>> {
        self.source.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id, name FROM expense_categories ORDER BY name")?;
            let categories = stmt
                .query_map([], |row| {
                    Ok(ExpenseCategory {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(categories)
        })
    }
}
