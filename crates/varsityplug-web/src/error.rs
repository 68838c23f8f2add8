//! Errors returned by page handlers.

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use thiserror::Error;
use varsityplug_db::DbError;

/// Characters escaped in the login `next` parameter; path separators stay readable.
const NEXT_PARAM: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

#[derive(Debug, Error)]
pub enum PageError {
    /// Not logged in; `next` is the path to come back to.
    #[error("login required")]
    Unauthenticated { next: String },

    #[error("You do not have permission to view this page.")]
    Forbidden,

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type PageResult<T> = std::result::Result<T, PageError>;

impl From<DbError> for PageError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound(what) => PageError::NotFound(what),
            other => PageError::Internal(other.to_string()),
        }
    }
}

impl From<minijinja::Error> for PageError {
    fn from(err: minijinja::Error) -> Self {
        PageError::Internal(format!("template error: {err:#}"))
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        let (status, title, detail) = match &self {
            PageError::Unauthenticated { next } => {
                let next = utf8_percent_encode(next, NEXT_PARAM);
                return Redirect::to(&format!("/accounts/login?next={next}")).into_response();
            }
            PageError::Forbidden => (
                StatusCode::FORBIDDEN,
                "Access denied",
                self.to_string(),
            ),
            PageError::NotFound(what) => {
                tracing::debug!("Page not found: {}", what);
                (
                    StatusCode::NOT_FOUND,
                    "Page not found",
                    "The page you were looking for does not exist.".to_string(),
                )
            }
            PageError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "Bad request", msg.clone()),
            PageError::Internal(msg) => {
                tracing::error!("Request failed: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Something went wrong",
                    "An unexpected error occurred. Please try again later or contact support."
                        .to_string(),
                )
            }
        };
        (status, Html(render_error_page(status, title, &detail))).into_response()
    }
}

/// Error pages avoid the template engine so they render even when it fails.
fn render_error_page(status: StatusCode, title: &str, detail: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>{title} | Varsity Plug</title>
    <link rel="stylesheet" href="/static/css/main.css">
</head>
<body>
<main class="container error-page">
    <h1>{code}</h1>
    <h2>{title}</h2>
    <p>{detail}</p>
    <a class="btn btn-primary" href="/">Back to home</a>
</main>
</body>
</html>"#,
        code = status.as_u16(),
        title = escape(title),
        detail = escape(detail),
    )
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
