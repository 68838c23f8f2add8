//! Database error types.

use thiserror::Error;
use varsityplug_common::VarsityError;

pub type Result<T> = std::result::Result<T, DbError>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("SQL error: {0}")]
    Sqlx(sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Duplicate entry: {0}")]
    Duplicate(String),
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                DbError::Duplicate(db.message().to_string())
            }
            _ => DbError::Sqlx(err),
        }
    }
}

impl From<DbError> for VarsityError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound(what) => VarsityError::NotFound(what),
            DbError::Duplicate(what) => VarsityError::Validation(what),
            DbError::Sqlx(e) => VarsityError::Database(e),
            DbError::Serialization(e) => VarsityError::Serialization(e),
        }
    }
}
