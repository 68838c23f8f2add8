//! Per-university application status, maintained by staff.

use crate::database::Database;
use crate::error::Result;
use crate::schema::{ApplicationStatus, ApplicationWithNames};
use chrono::Utc;
use std::sync::Arc;
use varsityplug_common::ApplicationState;

#[derive(Clone)]
pub struct ApplicationRepository {
    db: Arc<Database>,
}

const WITH_NAMES: &str = r#"
    SELECT a.*, usr.username AS username, uni.name AS university_name
    FROM application_statuses a
    JOIN users usr ON usr.id = a.user_id
    JOIN universities uni ON uni.id = a.university_id
"#;

impl ApplicationRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub async fn find(&self, id: i64) -> Result<Option<ApplicationStatus>> {
        let row = sqlx::query_as("SELECT * FROM application_statuses WHERE id = ?")
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(row)
    }

    pub async fn list_for_user(&self, user_id: i64) -> Result<Vec<ApplicationWithNames>> {
        let rows = sqlx::query_as(&format!("{WITH_NAMES} WHERE a.user_id = ? ORDER BY uni.name"))
            .bind(user_id)
            .fetch_all(self.db.pool())
            .await?;
        Ok(rows)
    }

    /// Everything, most recently updated first.
    pub async fn list_all(&self) -> Result<Vec<ApplicationWithNames>> {
        let rows = sqlx::query_as(&format!("{WITH_NAMES} ORDER BY a.last_updated DESC, a.id DESC"))
            .fetch_all(self.db.pool())
            .await?;
        Ok(rows)
    }

    /// Change the status; an empty tracking number clears it.
    pub async fn update(
        &self,
        id: i64,
        status: ApplicationState,
        tracking_number: Option<&str>,
    ) -> Result<Option<ApplicationStatus>> {
        let tracking = tracking_number.map(str::trim).filter(|t| !t.is_empty());
        let row: Option<ApplicationStatus> = sqlx::query_as(
            r#"
            UPDATE application_statuses
            SET status = ?, tracking_number = ?, last_updated = ?
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(status)
        .bind(tracking)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(self.db.pool())
        .await?;

        if let Some(app) = &row {
            tracing::info!(application_id = app.id, %status, "Application status updated");
        }
        Ok(row)
    }
}
