//! Payments recorded from uploaded proofs of payment.

use crate::database::Database;
use crate::documents::{clear_application_paid, mark_application_paid};
use crate::error::Result;
use crate::schema::{Payment, PaymentWithOwner};
use chrono::Utc;
use std::sync::Arc;
use varsityplug_common::PaymentStatus;

#[derive(Clone)]
pub struct PaymentRepository {
    db: Arc<Database>,
}

impl PaymentRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub async fn create(
        &self,
        user_id: i64,
        university_id: Option<i64>,
        amount: i64,
        document_id: Option<i64>,
    ) -> Result<Payment> {
        let row: Payment = sqlx::query_as(
            r#"
            INSERT INTO payments (user_id, university_id, amount, status, document_id, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(university_id)
        .bind(amount)
        .bind(PaymentStatus::Pending)
        .bind(document_id)
        .bind(Utc::now())
        .fetch_one(self.db.pool())
        .await?;
        tracing::info!(payment_id = row.id, user_id, amount, "Payment recorded");
        Ok(row)
    }

    pub async fn find(&self, id: i64) -> Result<Option<Payment>> {
        let row = sqlx::query_as("SELECT * FROM payments WHERE id = ?")
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(row)
    }

    pub async fn list_for_user(&self, user_id: i64) -> Result<Vec<Payment>> {
        let rows = sqlx::query_as("SELECT * FROM payments WHERE user_id = ? ORDER BY created_at DESC, id DESC")
            .bind(user_id)
            .fetch_all(self.db.pool())
            .await?;
        Ok(rows)
    }

    /// Staff queue. `None` lists every payment; pending ones come first.
    pub async fn list_with_owner(&self, status: Option<PaymentStatus>) -> Result<Vec<PaymentWithOwner>> {
        let rows = sqlx::query_as(
            r#"
            SELECT p.*, usr.username AS username, uni.name AS university_name
            FROM payments p
            JOIN users usr ON usr.id = p.user_id
            LEFT JOIN universities uni ON uni.id = p.university_id
            WHERE (? IS NULL OR p.status = ?)
            ORDER BY CASE p.status WHEN 'pending' THEN 0 ELSE 1 END, p.created_at, p.id
            "#,
        )
        .bind(status)
        .bind(status)
        .fetch_all(self.db.pool())
        .await?;
        Ok(rows)
    }

    /// Set a payment's status. Verification also verifies the proof
    /// document and flags the matching application as paid; any other
    /// status undoes both.
    pub async fn set_status(&self, id: i64, status: PaymentStatus) -> Result<Option<Payment>> {
        let mut tx = self.db.pool().begin().await?;
        let now = Utc::now();
        let verified_at = (status == PaymentStatus::Verified).then_some(now);

        let payment: Option<Payment> = sqlx::query_as(
            "UPDATE payments SET status = ?, verified_at = ? WHERE id = ? RETURNING *",
        )
        .bind(status)
        .bind(verified_at)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(payment) = payment else {
            return Ok(None);
        };

        if status == PaymentStatus::Verified {
            if let Some(document_id) = payment.document_id {
                sqlx::query(
                    "UPDATE documents SET verified = 1, verification_date = ? WHERE id = ? AND verified = 0",
                )
                .bind(now)
                .bind(document_id)
                .execute(&mut *tx)
                .await?;
            }
            if let Some(university_id) = payment.university_id {
                mark_application_paid(&mut tx, payment.user_id, university_id).await?;
            }
        } else {
            if let Some(document_id) = payment.document_id {
                sqlx::query("UPDATE documents SET verified = 0, verification_date = NULL WHERE id = ?")
                    .bind(document_id)
                    .execute(&mut *tx)
                    .await?;
            }
            if let Some(university_id) = payment.university_id {
                clear_application_paid(&mut tx, payment.user_id, university_id).await?;
            }
        }

        tx.commit().await?;
        tracing::info!(payment_id = payment.id, %status, "Payment status changed");
        Ok(Some(payment))
    }
}
