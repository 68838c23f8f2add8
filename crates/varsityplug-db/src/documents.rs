//! Uploaded documents and their verification.

use crate::database::Database;
use crate::error::Result;
use crate::schema::{Document, DocumentWithOwner, NewDocument};
use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use std::sync::Arc;
use varsityplug_common::{DocumentType, PaymentStatus};

#[derive(Clone)]
pub struct DocumentRepository {
    db: Arc<Database>,
}

impl DocumentRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub async fn create(&self, doc: &NewDocument) -> Result<Document> {
        let row = sqlx::query_as(
            r#"
            INSERT INTO documents (user_id, document_type, file_path, original_name, uploaded_at, university_id)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(doc.user_id)
        .bind(doc.document_type)
        .bind(&doc.file_path)
        .bind(&doc.original_name)
        .bind(Utc::now())
        .bind(doc.university_id)
        .fetch_one(self.db.pool())
        .await?;
        Ok(row)
    }

    pub async fn find(&self, id: i64) -> Result<Option<Document>> {
        let row = sqlx::query_as("SELECT * FROM documents WHERE id = ?")
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(row)
    }

    /// Newest first.
    pub async fn list_for_user(&self, user_id: i64) -> Result<Vec<Document>> {
        let rows = sqlx::query_as(
            "SELECT * FROM documents WHERE user_id = ? ORDER BY uploaded_at DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(self.db.pool())
        .await?;
        Ok(rows)
    }

    /// Swap the file and type of a document. The replacement needs verifying
    /// again.
    pub async fn replace_file(
        &self,
        id: i64,
        document_type: DocumentType,
        file_path: &str,
        original_name: &str,
    ) -> Result<Option<Document>> {
        let row = sqlx::query_as(
            r#"
            UPDATE documents
            SET document_type = ?, file_path = ?, original_name = ?, uploaded_at = ?,
                verified = 0, verification_date = NULL
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(document_type)
        .bind(file_path)
        .bind(original_name)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(self.db.pool())
        .await?;
        Ok(row)
    }

    pub async fn set_type(&self, id: i64, document_type: DocumentType) -> Result<Option<Document>> {
        let row = sqlx::query_as("UPDATE documents SET document_type = ? WHERE id = ? RETURNING *")
            .bind(document_type)
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(row)
    }

    /// Delete and return the row so the caller can remove the file.
    pub async fn delete(&self, id: i64) -> Result<Option<Document>> {
        let row = sqlx::query_as("DELETE FROM documents WHERE id = ? RETURNING *")
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(row)
    }

    /// Staff queue: unverified documents, oldest first.
    pub async fn list_unverified(&self) -> Result<Vec<DocumentWithOwner>> {
        let rows = sqlx::query_as(
            r#"
            SELECT d.*, usr.username AS username, uni.name AS university_name
            FROM documents d
            JOIN users usr ON usr.id = d.user_id
            LEFT JOIN universities uni ON uni.id = d.university_id
            WHERE d.verified = 0
            ORDER BY d.uploaded_at, d.id
            "#,
        )
        .fetch_all(self.db.pool())
        .await?;
        Ok(rows)
    }

    /// Mark a document verified. A payment proof also verifies its payment
    /// rows and, when tied to a university, the application's payment flag.
    pub async fn verify(&self, id: i64, notes: Option<&str>) -> Result<Option<Document>> {
        let mut tx = self.db.pool().begin().await?;
        let now = Utc::now();

        let doc: Option<Document> = sqlx::query_as(
            r#"
            UPDATE documents
            SET verified = 1, verification_date = ?, notes = COALESCE(?, notes)
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(now)
        .bind(notes)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(doc) = doc else {
            return Ok(None);
        };

        if doc.document_type.is_payment() {
            sqlx::query(
                "UPDATE payments SET status = ?, verified_at = ? WHERE document_id = ? AND status != ?",
            )
            .bind(PaymentStatus::Verified)
            .bind(now)
            .bind(doc.id)
            .bind(PaymentStatus::Verified)
            .execute(&mut *tx)
            .await?;

            if let Some(university_id) = doc.university_id {
                mark_application_paid(&mut tx, doc.user_id, university_id).await?;
            }
        }

        tx.commit().await?;
        tracing::info!(document_id = doc.id, user_id = doc.user_id, "Document verified");
        Ok(Some(doc))
    }

    /// Verify a user's non-payment documents uploaded at or before `cutoff`.
    /// Proofs of payment always wait for staff.
    pub async fn auto_verify_stale(&self, user_id: i64, cutoff: DateTime<Utc>) -> Result<u64> {
        let done = sqlx::query(
            r#"
            UPDATE documents
            SET verified = 1, verification_date = ?, notes = COALESCE(notes, 'Automatically verified')
            WHERE user_id = ? AND verified = 0 AND uploaded_at <= ?
              AND document_type NOT IN (?, ?)
            "#,
        )
        .bind(Utc::now())
        .bind(user_id)
        .bind(cutoff)
        .bind(DocumentType::PaymentProof)
        .bind(DocumentType::SubscriptionPayment)
        .execute(self.db.pool())
        .await?;

        let count = done.rows_affected();
        if count > 0 {
            tracing::info!(user_id, count, "Auto-verified documents past the review window");
        }
        Ok(count)
    }
}

/// Set `payment_verified` on the (user, university) application, creating
/// the row when the student paid before selecting.
pub(crate) async fn mark_application_paid(
    conn: &mut SqliteConnection,
    user_id: i64,
    university_id: i64,
) -> Result<()> {
    let now = Utc::now();
    sqlx::query(
        r#"
        INSERT INTO application_statuses
            (user_id, university_id, payment_verified, application_date, last_updated)
        VALUES (?, ?, 1, ?, ?)
        ON CONFLICT (user_id, university_id) DO UPDATE SET
            payment_verified = 1,
            last_updated     = excluded.last_updated
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

/// Clear `payment_verified` on the (user, university) application unless
/// another verified payment still covers it.
pub(crate) async fn clear_application_paid(
    conn: &mut SqliteConnection,
    user_id: i64,
    university_id: i64,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE application_statuses
        SET payment_verified = 0, last_updated = ?
        WHERE user_id = ? AND university_id = ? AND payment_verified = 1
          AND NOT EXISTS (
              SELECT 1 FROM payments
              WHERE user_id = ? AND university_id = ? AND status = 'verified'
          )
        "#,
    )
    .bind(Utc::now())
    .bind(user_id)
    .bind(university_id)
    .bind(user_id)
    .bind(university_id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}
