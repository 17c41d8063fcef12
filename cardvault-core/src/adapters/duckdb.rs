//! DuckDB repository implementation

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use duckdb::{params, Connection};

use crate::domain::result::Error;
use crate::domain::{CreditCard, User};
use crate::migrations::MIGRATIONS;
use crate::ports::Repository;
use crate::services::{MigrationResult, MigrationService, EMAIL_EXISTS, EMAIL_IN_USE};

/// Maximum number of retries when database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400, 800ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

const USER_COLUMNS: &str = "id, email, name, created_at, updated_at";

const CARD_COLUMNS: &str =
    "id, card_number, card_holder, expiry_date, cvv, user_id, created_at, updated_at";

/// Check if an error message indicates a file locking issue that should be retried
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    // Windows error messages
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        // Unix/macOS error messages
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("could not set lock on file")
        || lower.contains("file is already open")
}

/// A unique index rejected the write
fn is_unique_violation(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    lower.contains("duplicate key") || lower.contains("violates unique constraint")
}

/// Report a taken email as a conflict, anything else as-is
fn email_conflict(err: duckdb::Error, message: &str) -> anyhow::Error {
    if is_unique_violation(&err.to_string()) {
        Error::conflict(message).into()
    } else {
        err.into()
    }
}

/// DuckDB repository implementation
///
/// Clones share one connection.
#[derive(Clone)]
pub struct DuckDbRepository {
    conn: Arc<Mutex<Connection>>,
    db_path: Option<PathBuf>,
}

impl DuckDbRepository {
    /// Open (or create) the database file at `db_path`
    ///
    /// Retries with exponential backoff while another process holds the file
    /// lock, e.g. a running `cv serve` next to a CLI command.
    pub fn new(db_path: &Path) -> Result<Self> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            match Self::try_open_connection(db_path) {
                Ok(conn) => {
                    return Ok(Self {
                        conn: Arc::new(Mutex::new(conn)),
                        db_path: Some(db_path.to_path_buf()),
                    });
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    if is_retryable_error(&err_msg) && attempt < MAX_RETRIES - 1 {
                        let delay =
                            Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                        tracing::warn!(
                            delay_ms = delay.as_millis() as u64,
                            attempt = attempt + 1,
                            max = MAX_RETRIES,
                            error = %err_msg,
                            "Database busy, retrying"
                        );
                        thread::sleep(delay);
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| anyhow!("Failed to open database after {} retries", MAX_RETRIES)))
    }

    /// Open a throwaway in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        let conn = Connection::open_in_memory_with_flags(config)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            db_path: None,
        })
    }

    fn try_open_connection(db_path: &Path) -> Result<Connection> {
        // Cached extensions in ~/.duckdb/extensions are never needed
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        Ok(Connection::open_with_flags(db_path, config)?)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| anyhow!("Lock poisoned: {}", e))
    }

    /// Path of the database file, `None` when in memory
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Run database migrations, returning what was applied
    pub fn run_migrations(&self) -> Result<MigrationResult> {
        let conn = self.lock()?;
        MigrationService::new(&conn, MIGRATIONS).run_pending()
    }

    /// Ensure database schema exists (runs pending migrations)
    pub fn ensure_schema(&self) -> Result<()> {
        let result = self.run_migrations()?;
        if !result.applied.is_empty() {
            tracing::info!(applied = ?result.applied, "Database schema upgraded");
        }
        Ok(())
    }

    // === User operations ===

    pub fn insert_user(&self, user: &User) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO users (id, email, name, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
            params![
                user.id,
                user.email,
                user.name,
                format_timestamp(&user.created_at),
                format_timestamp(&user.updated_at),
            ],
        )
        .map_err(|e| email_conflict(e, EMAIL_EXISTS))?;
        Ok(())
    }

    pub fn get_user(&self, id: &str) -> Result<Option<User>> {
        self.query_user(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"), id)
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.query_user(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ? LIMIT 1"),
            email,
        )
    }

    fn query_user(&self, sql: &str, key: &str) -> Result<Option<User>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql)?;
        let mut rows = stmt.query_map([key], row_to_user)?;
        Ok(rows.next().transpose()?)
    }

    pub fn list_users(&self) -> Result<Vec<User>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC, seq DESC"
        ))?;
        let users = stmt
            .query_map([], row_to_user)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(users)
    }

    /// Write back email, name and updated_at
    ///
    /// The indexed email column is only touched when it actually changes.
    pub fn update_user(&self, user: &User) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE users SET email = ? WHERE id = ? AND email <> ?",
            params![user.email, user.id, user.email],
        )
        .map_err(|e| email_conflict(e, EMAIL_IN_USE))?;
        conn.execute(
            "UPDATE users SET name = ?, updated_at = ? WHERE id = ?",
            params![user.name, format_timestamp(&user.updated_at), user.id],
        )?;
        Ok(())
    }

    /// Delete a user and all of their cards
    ///
    /// Cards go first so a failure part-way never leaves cards pointing at a
    /// missing user.
    pub fn delete_user(&self, id: &str) -> Result<()> {
        let conn = self.lock()?;
        let cards = conn.execute("DELETE FROM credit_cards WHERE user_id = ?", params![id])?;
        conn.execute("DELETE FROM users WHERE id = ?", params![id])?;
        tracing::debug!(user_id = id, cards, "Deleted user with cards");
        Ok(())
    }

    // === Card operations ===

    pub fn insert_card(&self, card: &CreditCard) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO credit_cards
                (id, card_number, card_holder, expiry_date, cvv, user_id, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                card.id,
                card.card_number,
                card.card_holder,
                card.expiry_date,
                card.cvv,
                card.user_id,
                format_timestamp(&card.created_at),
                format_timestamp(&card.updated_at),
            ],
        )?;
        Ok(())
    }

    pub fn get_card(&self, id: &str) -> Result<Option<CreditCard>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {CARD_COLUMNS} FROM credit_cards WHERE id = ?"
        ))?;
        let mut rows = stmt.query_map([id], row_to_card)?;
        Ok(rows.next().transpose()?)
    }

    pub fn list_cards(&self, user_id: Option<&str>) -> Result<Vec<CreditCard>> {
        let conn = self.lock()?;
        let cards = match user_id {
            Some(owner) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {CARD_COLUMNS} FROM credit_cards WHERE user_id = ?
                     ORDER BY created_at DESC, seq DESC"
                ))?;
                let rows = stmt.query_map([owner], row_to_card)?;
                rows.collect::<std::result::Result<Vec<_>, _>>()?
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {CARD_COLUMNS} FROM credit_cards ORDER BY created_at DESC, seq DESC"
                ))?;
                let rows = stmt.query_map([], row_to_card)?;
                rows.collect::<std::result::Result<Vec<_>, _>>()?
            }
        };
        Ok(cards)
    }

    pub fn update_card(&self, card: &CreditCard) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE credit_cards
             SET card_number = ?, card_holder = ?, expiry_date = ?, cvv = ?, user_id = ?,
                 updated_at = ?
             WHERE id = ?",
            params![
                card.card_number,
                card.card_holder,
                card.expiry_date,
                card.cvv,
                card.user_id,
                format_timestamp(&card.updated_at),
                card.id,
            ],
        )?;
        Ok(())
    }

    pub fn delete_card(&self, id: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM credit_cards WHERE id = ?", params![id])?;
        Ok(())
    }

    // === Maintenance ===

    /// Row counts for (users, cards)
    pub fn counts(&self) -> Result<(u64, u64)> {
        let conn = self.lock()?;
        let users: u64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        let cards: u64 =
            conn.query_row("SELECT COUNT(*) FROM credit_cards", [], |row| row.get(0))?;
        Ok((users, cards))
    }
}

impl DuckDbRepository {
    /// Run `f` on the blocking pool so a busy connection never stalls the runtime
    async fn blocking<T, F>(&self, f: F) -> crate::Result<T>
    where
        F: FnOnce(&DuckDbRepository) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let repo = self.clone();
        match tokio::task::spawn_blocking(move || f(&repo)).await {
            Ok(result) => Ok(result?),
            Err(e) => Err(Error::database(format!("Database task failed: {}", e))),
        }
    }
}

#[async_trait]
impl Repository for DuckDbRepository {
    async fn ensure_schema_upgraded(&self) -> crate::Result<()> {
        self.blocking(|repo| repo.ensure_schema()).await
    }

    async fn insert_user(&self, user: &User) -> crate::Result<()> {
        let user = user.clone();
        self.blocking(move |repo| repo.insert_user(&user)).await
    }

    async fn get_user(&self, id: &str) -> crate::Result<Option<User>> {
        let id = id.to_string();
        self.blocking(move |repo| repo.get_user(&id)).await
    }

    async fn get_user_by_email(&self, email: &str) -> crate::Result<Option<User>> {
        let email = email.to_string();
        self.blocking(move |repo| repo.get_user_by_email(&email)).await
    }

    async fn list_users(&self) -> crate::Result<Vec<User>> {
        self.blocking(|repo| repo.list_users()).await
    }

    async fn update_user(&self, user: &User) -> crate::Result<()> {
        let user = user.clone();
        self.blocking(move |repo| repo.update_user(&user)).await
    }

    async fn delete_user(&self, id: &str) -> crate::Result<()> {
        let id = id.to_string();
        self.blocking(move |repo| repo.delete_user(&id)).await
    }

    async fn insert_card(&self, card: &CreditCard) -> crate::Result<()> {
        let card = card.clone();
        self.blocking(move |repo| repo.insert_card(&card)).await
    }

    async fn get_card(&self, id: &str) -> crate::Result<Option<CreditCard>> {
        let id = id.to_string();
        self.blocking(move |repo| repo.get_card(&id)).await
    }

    async fn list_cards(&self, user_id: Option<&str>) -> crate::Result<Vec<CreditCard>> {
        let user_id = user_id.map(str::to_string);
        self.blocking(move |repo| repo.list_cards(user_id.as_deref()))
            .await
    }

    async fn update_card(&self, card: &CreditCard) -> crate::Result<()> {
        let card = card.clone();
        self.blocking(move |repo| repo.update_card(&card)).await
    }

    async fn delete_card(&self, id: &str) -> crate::Result<()> {
        let id = id.to_string();
        self.blocking(move |repo| repo.delete_card(&id)).await
    }
}

// Helper functions

fn row_to_user(row: &duckdb::Row) -> duckdb::Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        name: row.get(2)?,
        created_at: parse_timestamp(&row.get::<_, String>(3)?),
        updated_at: parse_timestamp(&row.get::<_, String>(4)?),
    })
}

fn row_to_card(row: &duckdb::Row) -> duckdb::Result<CreditCard> {
    Ok(CreditCard {
        id: row.get(0)?,
        card_number: row.get(1)?,
        card_holder: row.get(2)?,
        expiry_date: row.get(3)?,
        cvv: row.get(4)?,
        user_id: row.get(5)?,
        created_at: parse_timestamp(&row.get::<_, String>(6)?),
        updated_at: parse_timestamp(&row.get::<_, String>(7)?),
    })
}

/// Fixed-width UTC form so that string order equals time order
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
