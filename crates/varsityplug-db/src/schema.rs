//! Row types for every table, plus the joined rows the staff queues use.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use std::collections::BTreeMap;
use varsityplug_admissions::{Admissible, SubscriptionState};
use varsityplug_common::{ApplicationState, DocumentType, PaymentStatus, SubscriptionPackage};

// =============================================================================
// Accounts
// =============================================================================

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip)]
    pub password_hash: String,
    pub is_staff: bool,
    pub date_joined: DateTime<Utc>,
}

/// Marks as stored: canonical subject name → percentage.
pub type MarksMap = BTreeMap<String, i32>;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StudentProfile {
    pub user_id: i64,
    pub marks: Option<Json<MarksMap>>,
    pub stored_aps_score: Option<i64>,
    pub subscription_package: SubscriptionPackage,
    pub subscription_status: bool,
    pub subscription_date: Option<DateTime<Utc>>,
    pub application_count: i64,
    pub phone_number: Option<String>,
    pub whatsapp_enabled: bool,
    pub last_chat_date: Option<DateTime<Utc>>,
}

impl StudentProfile {
    pub fn marks(&self) -> Option<&MarksMap> {
        self.marks.as_ref().map(|m| &m.0)
    }

    pub fn aps(&self) -> Option<u32> {
        self.stored_aps_score.and_then(|a| u32::try_from(a).ok())
    }

    pub fn subscription(&self) -> SubscriptionState {
        SubscriptionState {
            package: self.subscription_package,
            active: self.subscription_status,
            application_count: u32::try_from(self.application_count).unwrap_or(0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlashLevel {
    Success,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashMessage {
    pub level: FlashLevel,
    pub text: String,
}

impl FlashMessage {
    pub fn new(level: FlashLevel, text: impl Into<String>) -> Self {
        Self { level, text: text.into() }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct Session {
    pub token_hash: String,
    pub user_id: i64,
    pub expires_at: DateTime<Utc>,
    pub flash: Json<Vec<FlashMessage>>,
}

// =============================================================================
// Catalog
// =============================================================================

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct University {
    pub id: i64,
    pub name: String,
    pub minimum_aps: i64,
    pub province: String,
    pub description: String,
    pub application_fee: String,
    pub due_date: Option<NaiveDate>,
}

impl Admissible for University {
    fn name(&self) -> &str {
        &self.name
    }

    fn minimum_aps(&self) -> u32 {
        u32::try_from(self.minimum_aps).unwrap_or(0)
    }
}

// =============================================================================
// Documents, applications, payments
// =============================================================================

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Document {
    pub id: i64,
    pub user_id: i64,
    pub document_type: DocumentType,
    /// Relative to the media root.
    pub file_path: String,
    pub original_name: String,
    pub uploaded_at: DateTime<Utc>,
    pub verified: bool,
    pub verification_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub university_id: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct NewDocument {
    pub user_id: i64,
    pub document_type: DocumentType,
    pub file_path: String,
    pub original_name: String,
    pub university_id: Option<i64>,
}

/// Document joined with its owner and university for the staff queue.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct DocumentWithOwner {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub document: Document,
    pub username: String,
    pub university_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ApplicationStatus {
    pub id: i64,
    pub user_id: i64,
    pub university_id: i64,
    pub status: ApplicationState,
    pub payment_verified: bool,
    pub tracking_number: Option<String>,
    pub application_date: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ApplicationWithNames {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub application: ApplicationStatus,
    pub username: String,
    pub university_name: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Payment {
    pub id: i64,
    pub user_id: i64,
    /// `None` for subscription payments.
    pub university_id: Option<i64>,
    /// Whole rand.
    pub amount: i64,
    pub status: PaymentStatus,
    pub document_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub verified_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PaymentWithOwner {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub payment: Payment,
    pub username: String,
    pub university_name: Option<String>,
}
