//! SQLite-backed user preference repository

use std::sync::Arc;

use chrono::Utc;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};

use super::{format_datetime, parse_datetime, ConnSource, Database, Session};
use crate::error::Result;
use crate::models::{Currency, UserPreference};
use crate::repo::UserPreferenceRepository;

#[derive(Clone)]
pub struct DbUserPreferenceRepo {
    source: ConnSource,
}

impl DbUserPreferenceRepo {
    pub fn new(db: Database) -> Self {
        Self {
            source: ConnSource::Pool(db),
        }
    }

    pub fn with_session(session: Arc<Session>) -> Self {
        Self {
            source: ConnSource::Session(session),
        }
    }
}

fn select_preference(conn: &Connection, user_id: i64) -> Result<Option<UserPreference>> {
    let preference = conn
        .query_row(
            "SELECT id, telegram_user_id, preferred_currency, created_at, updated_at
             FROM user_preferences WHERE telegram_user_id = ?",
            params![user_id],
            |row| {
                let currency: String = row.get(2)?;
                let preferred_currency: Currency = currency.parse().map_err(|e: String| {
                    rusqlite::Error::FromSqlConversionFailure(2, Type::Text, e.into())
                })?;
                Ok(UserPreference {
                    id: row.get(0)?,
                    telegram_user_id: row.get(1)?,
                    preferred_currency,
                    created_at: parse_datetime(&row.get::<_, String>(3)?),
                    updated_at: parse_datetime(&row.get::<_, String>(4)?),
                })
            },
        )
        .optional()?;
    Ok(preference)
}

impl UserPreferenceRepository for DbUserPreferenceRepo {
    fn get_by_user_id(&self, user_id: i64) -> Result<Option<UserPreference>> {
        self.source.with_conn(|conn| select_preference(conn, user_id))
    }

    fn upsert(&self, user_id: i64, currency: Currency) -> Result<UserPreference> {
        let now = format_datetime(&Utc::now());
        self.source.with_conn(|conn| {
            conn.execute(
                "INSERT INTO user_preferences
                    (telegram_user_id, preferred_currency, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?3)
                 ON CONFLICT(telegram_user_id) DO UPDATE SET
                    preferred_currency = excluded.preferred_currency,
                    updated_at = excluded.updated_at",
                params![user_id, currency.as_str(), now],
            )?;
            select_preference(conn, user_id)?.ok_or_else(|| {
                crate::error::Error::InvalidData(format!(
                    "Preference for user {} missing after upsert",
                    user_id
                ))
            })
        })
    }
}
