//! Login sessions and their pending flash messages.

use crate::database::Database;
use crate::error::Result;
use crate::schema::{FlashMessage, Session};
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use std::sync::Arc;

#[derive(Clone)]
pub struct SessionRepository {
    db: Arc<Database>,
}

impl SessionRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub async fn create(&self, token_hash: &str, user_id: i64, expires_at: DateTime<Utc>) -> Result<()> {
        sqlx::query("INSERT INTO sessions (token_hash, user_id, expires_at) VALUES (?, ?, ?)")
            .bind(token_hash)
            .bind(user_id)
            .bind(expires_at)
            .execute(self.db.pool())
            .await?;
        Ok(())
    }

    /// The session for `token_hash` if it has not expired.
    pub async fn find_valid(&self, token_hash: &str, now: DateTime<Utc>) -> Result<Option<Session>> {
        let row = sqlx::query_as("SELECT * FROM sessions WHERE token_hash = ? AND expires_at > ?")
            .bind(token_hash)
            .bind(now)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(row)
    }

    pub async fn delete(&self, token_hash: &str) -> Result<()> {
        sqlx::query("DELETE FROM sessions WHERE token_hash = ?")
            .bind(token_hash)
            .execute(self.db.pool())
            .await?;
        Ok(())
    }

    pub async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let done = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(now)
            .execute(self.db.pool())
            .await?;
        Ok(done.rows_affected())
    }

    pub async fn push_flash(&self, token_hash: &str, message: FlashMessage) -> Result<()> {
        let mut tx = self.db.pool().begin().await?;
        let current: Option<Json<Vec<FlashMessage>>> =
            sqlx::query_scalar("SELECT flash FROM sessions WHERE token_hash = ?")
                .bind(token_hash)
                .fetch_optional(&mut *tx)
                .await?;

        if let Some(Json(mut messages)) = current {
            messages.push(message);
            sqlx::query("UPDATE sessions SET flash = ? WHERE token_hash = ?")
                .bind(Json(&messages))
                .bind(token_hash)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Return and clear pending messages.
    pub async fn take_flash(&self, token_hash: &str) -> Result<Vec<FlashMessage>> {
        let mut tx = self.db.pool().begin().await?;
        let taken: Option<Json<Vec<FlashMessage>>> =
            sqlx::query_scalar("SELECT flash FROM sessions WHERE token_hash = ?")
                .bind(token_hash)
                .fetch_optional(&mut *tx)
                .await?;

        let messages = taken.map(|j| j.0).unwrap_or_default();
        if !messages.is_empty() {
            sqlx::query("UPDATE sessions SET flash = '[]' WHERE token_hash = ?")
                .bind(token_hash)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(messages)
    }
}
