//! varsityplug-web: the Varsity Plug web application.
//! Server-rendered pages for students:
//!   - Registration, login and subscription packages
//!   - Marks entry with APS calculation
//!   - University eligibility, selection and fee payment instructions
//!   - Document and proof-of-payment uploads
//!   - The chat assistant
//!
//! plus the staff verification queues.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod router;
pub mod state;
pub mod templates;

pub use router::build_router;
pub use state::{AppState, SharedState};
