//! University selections. One row per (student, university); the profile's
//! `application_count` is rewritten in the same transaction as every change.

use crate::database::Database;
use crate::error::{DbError, Result};
use crate::schema::{StudentProfile, University};
use chrono::Utc;
use sqlx::SqliteConnection;
use std::collections::BTreeSet;
use std::sync::Arc;
use varsityplug_admissions::SelectionError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectOutcome {
    Selected,
    AlreadySelected,
    Rejected(SelectionError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplaceOutcome {
    Saved { added: usize, removed: usize },
    Rejected(SelectionError),
}

#[derive(Clone)]
pub struct SelectionRepository {
    db: Arc<Database>,
}

impl SelectionRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Selected universities, alphabetical.
    pub async fn list(&self, user_id: i64) -> Result<Vec<University>> {
        let rows = sqlx::query_as(
            r#"
            SELECT u.* FROM universities u
            JOIN selections s ON s.university_id = u.id
            WHERE s.user_id = ?
            ORDER BY u.name
            "#,
        )
        .bind(user_id)
        .fetch_all(self.db.pool())
        .await?;
        Ok(rows)
    }

    pub async fn ids(&self, user_id: i64) -> Result<Vec<i64>> {
        let ids = sqlx::query_scalar(
            "SELECT university_id FROM selections WHERE user_id = ? ORDER BY university_id",
        )
        .bind(user_id)
        .fetch_all(self.db.pool())
        .await?;
        Ok(ids)
    }

    /// Add one university, subject to the subscription gate.
    pub async fn select(&self, user_id: i64, university_id: i64) -> Result<SelectOutcome> {
        let mut tx = self.db.pool().begin().await?;

        let exists: Option<i64> = sqlx::query_scalar(
            "SELECT 1 FROM selections WHERE user_id = ? AND university_id = ?",
        )
        .bind(user_id)
        .bind(university_id)
        .fetch_optional(&mut *tx)
        .await?;
        if exists.is_some() {
            return Ok(SelectOutcome::AlreadySelected);
        }

        let profile = load_profile(&mut tx, user_id).await?;
        if let Err(e) = profile.subscription().check_selection() {
            return Ok(SelectOutcome::Rejected(e));
        }

        insert_selection(&mut tx, user_id, university_id).await?;
        sync_count(&mut tx, user_id).await?;
        tx.commit().await?;

        tracing::info!(user_id, university_id, "University selected");
        Ok(SelectOutcome::Selected)
    }

    /// Remove one university. Returns whether anything was removed.
    pub async fn deselect(&self, user_id: i64, university_id: i64) -> Result<bool> {
        let mut tx = self.db.pool().begin().await?;

        let done = sqlx::query("DELETE FROM selections WHERE user_id = ? AND university_id = ?")
            .bind(user_id)
            .bind(university_id)
            .execute(&mut *tx)
            .await?;
        if done.rows_affected() > 0 {
            drop_untouched_status(&mut tx, user_id, university_id).await?;
            sync_count(&mut tx, user_id).await?;
        }
        tx.commit().await?;

        let removed = done.rows_affected() > 0;
        if removed {
            tracing::info!(user_id, university_id, "University deselected");
        }
        Ok(removed)
    }

    /// Replace the whole selection set, as the bulk form on the university
    /// list does. The new total must fit the package.
    pub async fn replace(&self, user_id: i64, university_ids: &[i64]) -> Result<ReplaceOutcome> {
        let wanted: BTreeSet<i64> = university_ids.iter().copied().collect();
        let mut tx = self.db.pool().begin().await?;

        let profile = load_profile(&mut tx, user_id).await?;
        let total = u32::try_from(wanted.len()).unwrap_or(u32::MAX);
        if let Err(e) = profile.subscription().check_total(total) {
            return Ok(ReplaceOutcome::Rejected(e));
        }

        let current: BTreeSet<i64> = sqlx::query_scalar::<_, i64>(
            "SELECT university_id FROM selections WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_all(&mut *tx)
        .await?
        .into_iter()
        .collect();

        let removed: Vec<i64> = current.difference(&wanted).copied().collect();
        let added: Vec<i64> = wanted.difference(&current).copied().collect();

        for id in &removed {
            sqlx::query("DELETE FROM selections WHERE user_id = ? AND university_id = ?")
                .bind(user_id)
                .bind(id)
                .execute(&mut *tx)
                .await?;
            drop_untouched_status(&mut tx, user_id, *id).await?;
        }
        for id in &added {
            insert_selection(&mut tx, user_id, *id).await?;
        }
        sync_count(&mut tx, user_id).await?;
        tx.commit().await?;

        tracing::info!(user_id, added = added.len(), removed = removed.len(), "Selections replaced");
        Ok(ReplaceOutcome::Saved { added: added.len(), removed: removed.len() })
    }
}

async fn load_profile(conn: &mut SqliteConnection, user_id: i64) -> Result<StudentProfile> {
    sqlx::query_as("SELECT * FROM student_profiles WHERE user_id = ?")
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::NotFound(format!("profile for user {user_id}")))
}

/// Insert the selection and make sure an application-status row exists.
async fn insert_selection(conn: &mut SqliteConnection, user_id: i64, university_id: i64) -> Result<()> {
    let now = Utc::now();
    sqlx::query("INSERT INTO selections (user_id, university_id, selected_at) VALUES (?, ?, ?)")
        .bind(user_id)
        .bind(university_id)
        .bind(now)
        .execute(&mut *conn)
        .await?;
    sqlx::query(
        r#"
        INSERT INTO application_statuses (user_id, university_id, application_date, last_updated)
        VALUES (?, ?, ?, ?)
        ON CONFLICT (user_id, university_id) DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(university_id)
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Status rows nobody has worked on yet go away with the selection.
pub(crate) async fn drop_untouched_status(conn: &mut SqliteConnection, user_id: i64, university_id: i64) -> Result<()> {
    sqlx::query(
        r#"
        DELETE FROM application_statuses
        WHERE user_id = ? AND university_id = ?
          AND status = 'not_started' AND payment_verified = 0
        "#,
    )
    .bind(user_id)
    .bind(university_id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn sync_count(conn: &mut SqliteConnection, user_id: i64) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE student_profiles
        SET application_count = (SELECT COUNT(*) FROM selections WHERE user_id = ?)
        WHERE user_id = ?
        "#,
    )
    .bind(user_id)
    .bind(user_id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}
