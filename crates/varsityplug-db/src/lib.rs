//! Varsity Plug database layer.
//!
//! SQLite via sqlx, one repository per aggregate. Every repository holds an
//! `Arc<Database>` and can be created cheaply per request.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use varsityplug_db::{Database, UserRepository};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::open("sqlite://varsityplug.db?mode=rwc", 5).await?;
//!     db.initialize().await?;
//!
//!     let users = UserRepository::new(Arc::new(db));
//!     let _ = users.find_by_username("thabo").await?;
//!     Ok(())
//! }
//! ```

pub mod database;
pub mod error;
pub mod schema;
pub mod users;
pub mod sessions;
pub mod universities;
pub mod selections;
pub mod documents;
pub mod applications;
pub mod payments;

pub use database::{Database, DatabaseStats};
pub use error::{DbError, Result};
pub use schema::{
    ApplicationStatus, ApplicationWithNames, Document, DocumentWithOwner, FlashLevel,
    FlashMessage, MarksMap, NewDocument, Payment, PaymentWithOwner, Session, StudentProfile,
    University, User,
};
pub use users::UserRepository;
pub use sessions::SessionRepository;
pub use universities::UniversityRepository;
pub use selections::{ReplaceOutcome, SelectOutcome, SelectionRepository};
pub use documents::DocumentRepository;
pub use applications::ApplicationRepository;
pub use payments::PaymentRepository;
