//! varsityplug-common: Shared types and errors used across all Varsity Plug crates.

pub mod error;
pub mod entities;

// Re-export commonly used types
pub use entities::{ApplicationState, DocumentType, PaymentStatus, SubscriptionPackage};
pub use error::{ApiError, Result, VarsityError};
