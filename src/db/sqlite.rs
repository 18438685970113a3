// SPDX-License-Identifier: MIT

//! SQLite client wrapper with typed operations on the `users` table.
//!
//! The table is keyed by the identity-provider subject; all lookups and
//! upserts go through it, never through email.

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::error::AppError;
use crate::models::{ProfileChanges, User};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    subject     TEXT NOT NULL UNIQUE,
    email       TEXT,
    first_name  TEXT,
    last_name   TEXT,
    age         INTEGER,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
)
"#;

/// SQLite database client.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (creating if missing) the database at `url`.
    pub async fn connect(url: &str) -> Result<Self, AppError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| AppError::Database(format!("Invalid database URL: {}", e)))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| AppError::Database(format!("Failed to open database: {}", e)))?;

        tracing::info!(url = %url, "Connected to SQLite");

        Ok(Self { pool })
    }

    /// Open an in-memory database.
    ///
    /// Pinned to a single pooled connection so the data survives for the
    /// lifetime of the pool.
    pub async fn in_memory() -> Result<Self, AppError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| AppError::Database(e.to_string()))?;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| AppError::Database(format!("Failed to open database: {}", e)))?;

        Ok(Self { pool })
    }

    /// Create the `users` table if it does not exist yet.
    pub async fn init_schema(&self) -> Result<(), AppError> {
        sqlx::query(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Database(format!("Schema creation failed: {}", e)))?;
        Ok(())
    }

    /// Get a user row by identity-provider subject.
    pub async fn get_user_by_subject(&self, subject: &str) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE subject = ?1")
            .bind(subject)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create or refresh the row for a subject at login time.
    ///
    /// A never-seen subject gets a new row with the provider email; an
    /// existing row keeps its profile fields and only has its email replaced
    /// when the new value is non-empty.
    pub async fn upsert_login(
        &self,
        subject: &str,
        email: Option<&str>,
    ) -> Result<User, AppError> {
        let now = chrono::Utc::now().to_rfc3339();

        match self.get_user_by_subject(subject).await? {
            None => {
                sqlx::query(
                    "INSERT INTO users (subject, email, created_at, updated_at) \
                     VALUES (?1, ?2, ?3, ?3)",
                )
                .bind(subject)
                .bind(email)
                .bind(&now)
                .execute(&self.pool)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            }
            Some(existing) => {
                let email = email
                    .filter(|value| !value.is_empty())
                    .map(str::to_string)
                    .or(existing.email);

                sqlx::query("UPDATE users SET email = ?2, updated_at = ?3 WHERE subject = ?1")
                    .bind(subject)
                    .bind(email)
                    .bind(&now)
                    .execute(&self.pool)
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
            }
        }

        self.get_user_by_subject(subject)
            .await?
            .ok_or_else(|| AppError::Database("User row missing after upsert".to_string()))
    }

    /// Persist sanitized profile edits for a subject.
    ///
    /// Creates the row when absent (using the session email as the initial
    /// value); otherwise updates the editable fields in place. Email is never
    /// changed by a profile edit.
    pub async fn save_profile(
        &self,
        subject: &str,
        session_email: Option<&str>,
        changes: &ProfileChanges,
    ) -> Result<User, AppError> {
        let now = chrono::Utc::now().to_rfc3339();

        match self.get_user_by_subject(subject).await? {
            None => {
                sqlx::query(
                    "INSERT INTO users \
                     (subject, email, first_name, last_name, age, created_at, updated_at) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
                )
                .bind(subject)
                .bind(session_email)
                .bind(&changes.first_name)
                .bind(&changes.last_name)
                .bind(changes.age)
                .bind(&now)
                .execute(&self.pool)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            }
            Some(_) => {
                sqlx::query(
                    "UPDATE users \
                     SET first_name = ?2, last_name = ?3, age = ?4, updated_at = ?5 \
                     WHERE subject = ?1",
                )
                .bind(subject)
                .bind(&changes.first_name)
                .bind(&changes.last_name)
                .bind(changes.age)
                .bind(&now)
                .execute(&self.pool)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            }
        }

        self.get_user_by_subject(subject)
            .await?
            .ok_or_else(|| AppError::Database("User row missing after profile save".to_string()))
    }
}
