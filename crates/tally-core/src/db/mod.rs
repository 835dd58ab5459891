//! Database access layer with connection pooling and migrations
//!
//! This module is organized by domain:
//! - `categories` - SQLite-backed category repository
//! - `expenses` - SQLite-backed expense repository and aggregates
//! - `preferences` - SQLite-backed user preference repository
//!
//! Every repository can run in one of two modes (see [`ConnSource`]):
//! a pooled connection checked out for the duration of each call, or a
//! caller-owned [`Session`] whose transaction the caller commits.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::models::DEFAULT_CATEGORIES;

mod categories;
mod expenses;
mod preferences;

pub use categories::DbCategoryRepo;
pub use expenses::DbExpenseRepo;
pub use preferences::DbUserPreferenceRepo;

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// Storage format for timestamps (UTC, second precision, sorts lexically)
pub(crate) const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parse a SQLite datetime string into a DateTime<Utc>
pub(crate) fn parse_datetime(s: &str) -> DateTime<Utc> {
    chrono::NaiveDateTime::parse_from_str(s, DATETIME_FORMAT)
        .map(|dt| dt.and_utc())
        .unwrap_or_else(|_| Utc::now())
}

/// Format a DateTime<Utc> for storage
pub(crate) fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.format(DATETIME_FORMAT).to_string()
}

/// Database wrapper with connection pooling
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
    /// Path to the database file
    db_path: String,
}

impl Database {
    /// Open (or create) the database at `path` and run migrations
    pub fn new(path: &str) -> Result<Self> {
        // Foreign keys are a per-connection setting in SQLite
        let manager = SqliteConnectionManager::file(path).with_init(|conn| {
            conn.execute_batch("PRAGMA foreign_keys = ON;")?;
            Ok(())
        });
        let pool = Pool::builder().max_size(10).build(manager)?;

        let db = Self {
            pool,
            db_path: path.to_string(),
        };
        db.run_migrations()?;

        debug!(path, "Database opened");
        Ok(db)
    }

    /// Get the path to the database file
    pub fn path(&self) -> &str {
        &self.db_path
    }

    /// Create an in-memory database (for testing)
    ///
    /// Note: Uses a unique temporary file rather than `:memory:` because each
    /// pooled connection to `:memory:` would see its own empty database.
    pub fn in_memory() -> Result<Self> {
        use std::sync::atomic::AtomicU64;
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = std::env::temp_dir().join(format!(
            "tally_test_{}_{}.db",
            std::process::id(),
            id
        ));
        let path = path.to_string_lossy().to_string();

        // Remove any existing file
        let _ = std::fs::remove_file(&path);

        Self::new(&path)
    }

    /// Get a connection from the pool
    pub fn conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    /// Insert the default categories that are not present yet.
    ///
    /// Returns the number of categories created.
    pub fn seed_categories(&self) -> Result<usize> {
        let conn = self.conn()?;
        let mut created = 0;
        for name in DEFAULT_CATEGORIES {
            created += conn.execute(
                "INSERT OR IGNORE INTO expense_categories (name) VALUES (?)",
                [name],
            )?;
        }
        if created > 0 {
            info!(created, "Seeded default categories");
        }
        Ok(created)
    }

    /// Run database migrations
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            -- WAL mode: readers don't block the writer
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;

            -- Expense categories (names are unique, exact match)
            CREATE TABLE IF NOT EXISTS expense_categories (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL UNIQUE
            );

            -- Expenses
            -- amount is stored as decimal text to keep full precision
            CREATE TABLE IF NOT EXISTS expenses (
                id INTEGER PRIMARY KEY,
                amount TEXT NOT NULL,
                currency TEXT NOT NULL DEFAULT 'EUR',
                description TEXT,
                date DATETIME NOT NULL,
                created_at DATETIME NOT NULL,
                updated_at DATETIME NOT NULL,
                category_id INTEGER REFERENCES expense_categories(id) ON DELETE SET NULL,
                telegram_user_id INTEGER
            );

            CREATE INDEX IF NOT EXISTS idx_expenses_date ON expenses(date);
            CREATE INDEX IF NOT EXISTS idx_expenses_category ON expenses(category_id);
            CREATE INDEX IF NOT EXISTS idx_expenses_user ON expenses(telegram_user_id);

            -- Per-user display preferences
            CREATE TABLE IF NOT EXISTS user_preferences (
                id INTEGER PRIMARY KEY,
                telegram_user_id INTEGER NOT NULL UNIQUE,
                preferred_currency TEXT NOT NULL DEFAULT 'EUR',
                created_at DATETIME NOT NULL,
                updated_at DATETIME NOT NULL
            );
            "#,
        )?;

        Ok(())
    }
}

/// A caller-owned connection with an open transaction.
///
/// Repositories built with a session share its connection, so every write
/// they make is committed (or rolled back) together. Dropping a session
/// that was neither committed nor rolled back rolls it back.
pub struct Session {
    conn: Mutex<DbConn>,
    finished: AtomicBool,
}

impl Session {
    /// Check out a connection and open a transaction on it
    pub fn begin(db: &Database) -> Result<Arc<Self>> {
        let conn = db.conn()?;
        conn.execute("BEGIN TRANSACTION", [])?;
        Ok(Arc::new(Self {
            conn: Mutex::new(conn),
            finished: AtomicBool::new(false),
        }))
    }

    pub fn commit(&self) -> Result<()> {
        self.finish("COMMIT")
    }

    pub fn rollback(&self) -> Result<()> {
        self.finish("ROLLBACK")
    }

    fn finish(&self, statement: &str) -> Result<()> {
        if self.finished.swap(true, Ordering::SeqCst) {
            return Err(Error::InvalidData("Session already finished".into()));
        }
        self.with_conn(|conn| {
            conn.execute(statement, [])?;
            Ok(())
        })
    }

    pub(crate) fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| Error::InvalidData("Session connection lock poisoned".into()))?;
        f(&conn)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.finished.load(Ordering::SeqCst) {
            return;
        }
        if let Ok(conn) = self.conn.get_mut() {
            if let Err(e) = conn.execute("ROLLBACK", []) {
                warn!(error = %e, "Failed to roll back abandoned session");
            }
        }
    }
}

/// Where a repository gets its connection from
#[derive(Clone)]
pub enum ConnSource {
    /// A pooled connection per call
    Pool(Database),
    /// A shared connection owned by the caller
    Session(Arc<Session>),
}

impl ConnSource {
    pub(crate) fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        match self {
            ConnSource::Pool(db) => {
                let conn = db.conn()?;
                f(&conn)
            }
            ConnSource::Session(session) => session.with_conn(f),
        }
    }
}
