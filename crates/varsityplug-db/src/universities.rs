//! University catalog repository.

use crate::database::Database;
use crate::error::Result;
use crate::schema::University;
use std::sync::Arc;
use varsityplug_admissions::Catalog;

#[derive(Clone)]
pub struct UniversityRepository {
    db: Arc<Database>,
}

impl UniversityRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert or refresh every catalog entry, keyed by name. Safe to run on
    /// every startup.
    pub async fn seed(&self, catalog: &Catalog) -> Result<usize> {
        let mut tx = self.db.pool().begin().await?;
        for u in catalog.universities() {
            sqlx::query(
                r#"
                INSERT INTO universities
                    (name, minimum_aps, province, description, application_fee, due_date)
                VALUES (?, ?, ?, ?, ?, ?)
                ON CONFLICT (name) DO UPDATE SET
                    minimum_aps     = excluded.minimum_aps,
                    province        = excluded.province,
                    description     = excluded.description,
                    application_fee = excluded.application_fee,
                    due_date        = excluded.due_date
                "#,
            )
            .bind(&u.name)
            .bind(i64::from(u.minimum_aps))
            .bind(&u.province)
            .bind(&u.description)
            .bind(&u.application_fee)
            .bind(u.due_date)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        let count = catalog.universities().len();
        tracing::info!("Seeded {} universities", count);
        Ok(count)
    }

    /// All universities, alphabetical.
    pub async fn list(&self) -> Result<Vec<University>> {
        let rows = sqlx::query_as("SELECT * FROM universities ORDER BY name")
            .fetch_all(self.db.pool())
            .await?;
        Ok(rows)
    }

    pub async fn find(&self, id: i64) -> Result<Option<University>> {
        let row = sqlx::query_as("SELECT * FROM universities WHERE id = ?")
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(row)
    }

    pub async fn find_many(&self, ids: &[i64]) -> Result<Vec<University>> {
        let mut found = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(u) = self.find(*id).await? {
                found.push(u);
            }
        }
        found.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(found)
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<University>> {
        let row = sqlx::query_as("SELECT * FROM universities WHERE name = ?")
            .bind(name)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(row)
    }
}
