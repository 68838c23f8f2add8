use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VarsityError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, VarsityError>;

/// Error returned by JSON endpoints.
///
/// Every variant renders as `{"success": false, "message": …}` with the
/// matching status code; internal details are logged, never returned.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Authentication required")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    MethodNotAllowed(String),

    #[error("{0}")]
    TooManyRequests(String),

    #[error("{0}")]
    Unavailable(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_)       => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized        => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_)        => StatusCode::FORBIDDEN,
            ApiError::NotFound(_)         => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::TooManyRequests(_)  => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Unavailable(_)      => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_)         => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = json!({
            "success": false,
            "message": self.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

impl From<VarsityError> for ApiError {
    fn from(err: VarsityError) -> Self {
        match err {
            VarsityError::NotFound(what) => ApiError::NotFound(what),
            VarsityError::Validation(msg) => ApiError::BadRequest(msg),
            other => {
                tracing::error!("Unhandled error in API handler: {}", other);
                ApiError::Internal("An unexpected error occurred. Please try again.".to_string())
            }
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        VarsityError::from(err).into()
    }
}
