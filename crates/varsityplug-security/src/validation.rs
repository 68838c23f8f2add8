//! Form input checks shared by the web handlers.

use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+27\d{9}$").expect("phone pattern is valid"));

static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w.@+-]{1,150}$").expect("username pattern is valid"));

pub const ALLOWED_EXTENSIONS: [&str; 4] = ["pdf", "jpg", "jpeg", "png"];
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// South African numbers in international form, e.g. `+27821234567`.
pub fn validate_phone_number(phone: &str) -> bool {
    PHONE_RE.is_match(phone.trim())
}

/// Letters, digits and `@ . + - _`, at most 150 characters.
pub fn validate_username(username: &str) -> bool {
    USERNAME_RE.is_match(username)
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UploadError {
    #[error("Please choose a file to upload.")]
    Empty,

    #[error("Only PDF, JPG and PNG files are allowed.")]
    Extension,

    #[error("File size must not exceed 5MB.")]
    TooLarge,
}

/// Check a file name and size; returns the lowercase extension.
pub fn validate_upload(file_name: &str, size: usize) -> Result<String, UploadError> {
    if size == 0 {
        return Err(UploadError::Empty);
    }
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .ok_or(UploadError::Extension)?;
    if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        return Err(UploadError::Extension);
    }
    if size > MAX_UPLOAD_BYTES {
        return Err(UploadError::TooLarge);
    }
    Ok(ext)
}
