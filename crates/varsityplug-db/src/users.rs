//! User and student-profile repository.

use crate::database::Database;
use crate::error::{DbError, Result};
use crate::schema::{MarksMap, StudentProfile, User};
use crate::selections::drop_untouched_status;
use chrono::Utc;
use sqlx::types::Json;
use std::sync::Arc;
use varsityplug_admissions::PackageChange;
use varsityplug_common::SubscriptionPackage;

/// Repository for accounts and their one-to-one student profiles.
#[derive(Clone)]
pub struct UserRepository {
    db: Arc<Database>,
}

impl UserRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    // ── Users ────────────────────────────────────────────────────────────────

    /// Create a user and an empty profile in one transaction.
    pub async fn create(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
        is_staff: bool,
    ) -> Result<User> {
        let mut tx = self.db.pool().begin().await?;
        let now = Utc::now();

        let user: User = sqlx::query_as(
            r#"
            INSERT INTO users (username, email, password_hash, is_staff, date_joined)
            VALUES (?, ?, ?, ?, ?)
            RETURNING id, username, email, password_hash, is_staff, date_joined
            "#,
        )
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .bind(is_staff)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::Duplicate(_) => DbError::Duplicate(format!("username {username}")),
            other => other,
        })?;

        sqlx::query("INSERT INTO student_profiles (user_id) VALUES (?)")
            .bind(user.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::info!(user_id = user.id, "Created user {}", user.username);
        Ok(user)
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<User>> {
        let user = sqlx::query_as("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(user)
    }

    /// Usernames compare case-insensitively.
    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = sqlx::query_as("SELECT * FROM users WHERE username = ?")
            .bind(username.trim())
            .fetch_optional(self.db.pool())
            .await?;
        Ok(user)
    }

    // ── Profiles ─────────────────────────────────────────────────────────────

    pub async fn profile(&self, user_id: i64) -> Result<StudentProfile> {
        sqlx::query_as("SELECT * FROM student_profiles WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(self.db.pool())
            .await?
            .ok_or_else(|| DbError::NotFound(format!("profile for user {user_id}")))
    }

    /// Store a validated mark sheet together with its APS.
    pub async fn save_marks(&self, user_id: i64, marks: &MarksMap, aps: u32) -> Result<()> {
        sqlx::query(
            "UPDATE student_profiles SET marks = ?, stored_aps_score = ? WHERE user_id = ?",
        )
        .bind(Json(marks))
        .bind(i64::from(aps))
        .bind(user_id)
        .execute(self.db.pool())
        .await?;
        tracing::info!(user_id, aps, "Stored marks and APS");
        Ok(())
    }

    pub async fn set_stored_aps(&self, user_id: i64, aps: Option<u32>) -> Result<()> {
        sqlx::query("UPDATE student_profiles SET stored_aps_score = ? WHERE user_id = ?")
            .bind(aps.map(i64::from))
            .bind(user_id)
            .execute(self.db.pool())
            .await?;
        Ok(())
    }

    /// Persist a package change. When the change resets selections, the
    /// selection rows and their untouched application rows are removed in
    /// the same transaction.
    pub async fn apply_package_change(
        &self,
        user_id: i64,
        package: SubscriptionPackage,
        change: PackageChange,
    ) -> Result<()> {
        let mut tx = self.db.pool().begin().await?;

        sqlx::query(
            r#"
            UPDATE student_profiles
            SET subscription_package = ?, subscription_status = 1, subscription_date = ?
            WHERE user_id = ?
            "#,
        )
        .bind(package)
        .bind(Utc::now())
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        if change.reset_selections {
            let cleared: Vec<i64> = sqlx::query_scalar("SELECT university_id FROM selections WHERE user_id = ?")
                .bind(user_id)
                .fetch_all(&mut *tx)
                .await?;
            for university_id in cleared {
                drop_untouched_status(&mut tx, user_id, university_id).await?;
            }
            sqlx::query("DELETE FROM selections WHERE user_id = ?")
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
            sqlx::query("UPDATE student_profiles SET application_count = 0 WHERE user_id = ?")
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        tracing::info!(user_id, %package, reset = change.reset_selections, "Subscription updated");
        Ok(())
    }

    pub async fn update_contact(
        &self,
        user_id: i64,
        phone_number: Option<&str>,
        whatsapp_enabled: bool,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE student_profiles SET phone_number = ?, whatsapp_enabled = ? WHERE user_id = ?",
        )
        .bind(phone_number)
        .bind(whatsapp_enabled)
        .bind(user_id)
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    pub async fn touch_chat(&self, user_id: i64) -> Result<()> {
        sqlx::query("UPDATE student_profiles SET last_chat_date = ? WHERE user_id = ?")
            .bind(Utc::now())
            .bind(user_id)
            .execute(self.db.pool())
            .await?;
        Ok(())
    }
}
