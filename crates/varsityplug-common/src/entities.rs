//! Shared enums stored in the database and rendered in templates.
//! All of them persist as lowercase snake_case TEXT.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid {kind}: {value}")]
pub struct ParseChoiceError {
    pub kind: &'static str,
    pub value: String,
}

// ---------------------------------------------------------------------------
// Subscription package
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum SubscriptionPackage {
    #[default]
    Basic,
    Standard,
    Premium,
    Ultimate,
}

impl SubscriptionPackage {
    pub const ALL: [SubscriptionPackage; 4] = [
        SubscriptionPackage::Basic,
        SubscriptionPackage::Standard,
        SubscriptionPackage::Premium,
        SubscriptionPackage::Ultimate,
    ];

    /// Position in the tier ladder; higher is a bigger package.
    pub fn rank(self) -> u8 {
        match self {
            SubscriptionPackage::Basic    => 1,
            SubscriptionPackage::Standard => 2,
            SubscriptionPackage::Premium  => 3,
            SubscriptionPackage::Ultimate => 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SubscriptionPackage::Basic    => "basic",
            SubscriptionPackage::Standard => "standard",
            SubscriptionPackage::Premium  => "premium",
            SubscriptionPackage::Ultimate => "ultimate",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SubscriptionPackage::Basic    => "Basic Package",
            SubscriptionPackage::Standard => "Standard Package",
            SubscriptionPackage::Premium  => "Premium Package",
            SubscriptionPackage::Ultimate => "Ultimate Package",
        }
    }
}

impl fmt::Display for SubscriptionPackage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubscriptionPackage {
    type Err = ParseChoiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SubscriptionPackage::ALL
            .into_iter()
            .find(|p| p.as_str() == s.trim())
            .ok_or_else(|| ParseChoiceError { kind: "package", value: s.to_string() })
    }
}

// ---------------------------------------------------------------------------
// Uploaded document type
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum DocumentType {
    IdDocument,
    Grade11Results,
    Grade12Results,
    ProofOfResidence,
    PaymentProof,
    SubscriptionPayment,
}

impl DocumentType {
    pub const ALL: [DocumentType; 6] = [
        DocumentType::IdDocument,
        DocumentType::Grade11Results,
        DocumentType::Grade12Results,
        DocumentType::ProofOfResidence,
        DocumentType::PaymentProof,
        DocumentType::SubscriptionPayment,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DocumentType::IdDocument          => "id_document",
            DocumentType::Grade11Results      => "grade_11_results",
            DocumentType::Grade12Results      => "grade_12_results",
            DocumentType::ProofOfResidence    => "proof_of_residence",
            DocumentType::PaymentProof        => "payment_proof",
            DocumentType::SubscriptionPayment => "subscription_payment",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DocumentType::IdDocument          => "ID Document",
            DocumentType::Grade11Results      => "Grade 11 Results",
            DocumentType::Grade12Results      => "Grade 12 Results",
            DocumentType::ProofOfResidence    => "Proof of Residence",
            DocumentType::PaymentProof        => "Proof of Payment",
            DocumentType::SubscriptionPayment => "Subscription Payment",
        }
    }

    /// Proofs of payment feed the payment-verification queue.
    pub fn is_payment(self) -> bool {
        matches!(self, DocumentType::PaymentProof | DocumentType::SubscriptionPayment)
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentType {
    type Err = ParseChoiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DocumentType::ALL
            .into_iter()
            .find(|d| d.as_str() == s.trim())
            .ok_or_else(|| ParseChoiceError { kind: "document type", value: s.to_string() })
    }
}

// ---------------------------------------------------------------------------
// Application status (per student + university)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum ApplicationState {
    NotStarted,
    Pending,
    Submitted,
    Processing,
    Completed,
    Rejected,
}

impl ApplicationState {
    pub const ALL: [ApplicationState; 6] = [
        ApplicationState::NotStarted,
        ApplicationState::Pending,
        ApplicationState::Submitted,
        ApplicationState::Processing,
        ApplicationState::Completed,
        ApplicationState::Rejected,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ApplicationState::NotStarted => "not_started",
            ApplicationState::Pending    => "pending",
            ApplicationState::Submitted  => "submitted",
            ApplicationState::Processing => "processing",
            ApplicationState::Completed  => "completed",
            ApplicationState::Rejected   => "rejected",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ApplicationState::NotStarted => "Not Started",
            ApplicationState::Pending    => "Pending",
            ApplicationState::Submitted  => "Submitted",
            ApplicationState::Processing => "Processing",
            ApplicationState::Completed  => "Completed",
            ApplicationState::Rejected   => "Rejected",
        }
    }
}

impl fmt::Display for ApplicationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApplicationState {
    type Err = ParseChoiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ApplicationState::ALL
            .into_iter()
            .find(|a| a.as_str() == s.trim())
            .ok_or_else(|| ParseChoiceError { kind: "application status", value: s.to_string() })
    }
}

// ---------------------------------------------------------------------------
// Payment status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Verified,
    Rejected,
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Pending  => "pending",
            PaymentStatus::Verified => "verified",
            PaymentStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = ParseChoiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "pending"  => Ok(PaymentStatus::Pending),
            "verified" => Ok(PaymentStatus::Verified),
            "rejected" => Ok(PaymentStatus::Rejected),
            other      => Err(ParseChoiceError { kind: "payment status", value: other.to_string() }),
        }
    }
}
