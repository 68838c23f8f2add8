//! varsityplug-security: password hashing, session tokens and input checks.

pub mod password;
pub mod token;
pub mod validation;

pub use password::{hash_password, validate_new_password, verify_password, PasswordError};
pub use token::{generate_session_token, hash_session_token};
pub use validation::{validate_phone_number, validate_upload, validate_username, UploadError};
