//! Argon2id password hashing and the registration password policy.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use thiserror::Error;

pub const MIN_PASSWORD_LENGTH: usize = 8;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PasswordError {
    #[error("The two password fields didn't match.")]
    Mismatch,

    #[error("This password is too short. It must contain at least 8 characters.")]
    TooShort,

    #[error("This password is entirely numeric.")]
    EntirelyNumeric,

    #[error("The password is too similar to the username.")]
    TooSimilar,

    #[error("password hashing failed: {0}")]
    Hash(String),
}

pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError::Hash(e.to_string()))
}

/// `false` for a wrong password and for a stored hash that cannot be parsed.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::warn!("Stored password hash is malformed: {}", e);
            false
        }
    }
}

/// Checks applied when an account is created.
pub fn validate_new_password(
    password: &str,
    confirmation: &str,
    username: &str,
) -> Result<(), PasswordError> {
    if password != confirmation {
        return Err(PasswordError::Mismatch);
    }
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(PasswordError::TooShort);
    }
    if password.chars().all(|c| c.is_ascii_digit()) {
        return Err(PasswordError::EntirelyNumeric);
    }
    let user = username.trim().to_lowercase();
    if !user.is_empty() && password.to_lowercase().contains(&user) {
        return Err(PasswordError::TooSimilar);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("correct horse battery").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse battery", &hash));
        assert!(!verify_password("wrong", &hash));
    }

    #[test]
    fn test_hashes_are_salted() {
        let a = hash_password("same-password").unwrap();
        let b = hash_password("same-password").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_malformed_hash_does_not_verify() {
        assert!(!verify_password("anything", "not-a-hash"));
    }

    #[test]
    fn test_policy() {
        assert_eq!(validate_new_password("abcdefgh1", "abcdefgh2", "thabo"), Err(PasswordError::Mismatch));
        assert_eq!(validate_new_password("short", "short", "thabo"), Err(PasswordError::TooShort));
        assert_eq!(validate_new_password("12345678", "12345678", "thabo"), Err(PasswordError::EntirelyNumeric));
        assert_eq!(validate_new_password("thabo2025!", "thabo2025!", "Thabo"), Err(PasswordError::TooSimilar));
        assert_eq!(validate_new_password("Matric!2025", "Matric!2025", "thabo"), Ok(()));
    }
}
