//! Registration, login and logout.

use crate::auth::{end_session, start_session, CurrentUser, MaybeUser};
use crate::error::{PageError, PageResult};
use crate::state::SharedState;
use crate::templates::{render_page, Page};
use axum::{
    extract::{Query, State},
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use minijinja::context;
use serde::Deserialize;
use varsityplug_db::{DbError, FlashLevel, FlashMessage};
use varsityplug_security::{hash_password, validate_new_password, validate_username, verify_password};

// ── Register ─────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password1: String,
    #[serde(default)]
    pub password2: String,
}

pub async fn register_page(State(state): State<SharedState>, user: MaybeUser) -> PageResult<Html<String>> {
    let page = Page::for_optional(&state, user.0.as_ref()).await?;
    render_page(&state, "register.html", page, context! { username => "", email => "", errors => Vec::<String>::new() })
}

pub async fn register_submit(
    State(state): State<SharedState>,
    Form(form): Form<RegisterForm>,
) -> PageResult<Response> {
    let username = form.username.trim();
    let email = form.email.trim();
    let mut errors = Vec::new();

    if !validate_username(username) {
        errors.push(
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters."
                .to_string(),
        );
    }
    if let Err(e) = validate_new_password(&form.password1, &form.password2, username) {
        errors.push(e.to_string());
    }

    if errors.is_empty() {
        let hash = hash_password(&form.password1).map_err(|e| PageError::Internal(e.to_string()))?;
        match state.users().create(username, email, &hash, false).await {
            Ok(user) => {
                let (token_hash, headers) = start_session(&state, user.id).await?;
                let current = CurrentUser { user, token_hash };
                current
                    .flash(&state, FlashLevel::Success, "Registration successful! Welcome to Varsity Plug.")
                    .await;
                return Ok((headers, Redirect::to("/subscription")).into_response());
            }
            Err(DbError::Duplicate(_)) => {
                errors.push("A user with that username already exists.".to_string());
            }
            Err(e) => return Err(e.into()),
        }
    }

    tracing::debug!("Registration rejected for {:?}: {:?}", username, errors);
    let page = Page {
        flashes: vec![FlashMessage::new(
            FlashLevel::Error,
            "Registration failed. Please correct the errors below.",
        )],
        ..Page::anonymous()
    };
    let html = render_page(
        &state,
        "register.html",
        page,
        context! { username => username, email => email, errors => errors },
    )?;
    Ok(html.into_response())
}

// ── Login / logout ───────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub next: String,
}

/// Only same-site paths are followed after login.
fn safe_next(next: &str) -> Option<&str> {
    let local = next.starts_with('/') && !next.starts_with("//");
    let clean = !next.bytes().any(|b| b == b'\\' || b < 0x20 || b == 0x7f);
    (local && clean).then_some(next)
}

pub async fn login_page(
    State(state): State<SharedState>,
    Query(query): Query<NextQuery>,
) -> PageResult<Html<String>> {
    let next = query.next.as_deref().and_then(safe_next).unwrap_or("");
    render_page(&state, "login.html", Page::anonymous(), context! { next => next, username => "", error => false })
}

pub async fn login_submit(
    State(state): State<SharedState>,
    Form(form): Form<LoginForm>,
) -> PageResult<Response> {
    let username = form.username.trim();
    let user = state.users().find_by_username(username).await?;

    match user {
        Some(user) if verify_password(&form.password, &user.password_hash) => {
            let (_, headers) = start_session(&state, user.id).await?;
            tracing::info!(user_id = user.id, "User {} logged in", user.username);
            let target = safe_next(&form.next).unwrap_or("/redirect_after_login");
            Ok((headers, Redirect::to(target)).into_response())
        }
        _ => {
            tracing::info!("Failed login attempt for {:?}", username);
            let html = render_page(
                &state,
                "login.html",
                Page::anonymous(),
                context! { next => safe_next(&form.next).unwrap_or(""), username => username, error => true },
            )?;
            Ok(html.into_response())
        }
    }
}

pub async fn logout(State(state): State<SharedState>, user: CurrentUser) -> PageResult<Response> {
    let headers = end_session(&state, &user).await?;
    tracing::info!(user_id = user.id(), "User {} logged out", user.user.username);
    Ok((headers, Redirect::to("/")).into_response())
}

/// Students without an active package pick one first.
pub async fn redirect_after_login(State(state): State<SharedState>, user: CurrentUser) -> PageResult<Redirect> {
    let profile = state.users().profile(user.id()).await?;
    if profile.subscription_status {
        Ok(Redirect::to("/dashboard/student"))
    } else {
        Ok(Redirect::to("/subscription"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_next() {
        assert_eq!(safe_next("/universities"), Some("/universities"));
        assert_eq!(safe_next("//evil.example.com"), None);
        assert_eq!(safe_next("https://evil.example.com"), None);
        assert_eq!(safe_next(""), None);
    }

    #[test]
    fn test_safe_next_rejects_backslash_and_control_bytes() {
        assert_eq!(safe_next("/\\evil.example.com"), None);
        assert_eq!(safe_next("/universities\\x"), None);
        assert_eq!(safe_next("/x\ny"), None);
        assert_eq!(safe_next("/x\ty"), None);
        assert_eq!(safe_next("/x\u{7f}y"), None);
        assert_eq!(safe_next("/pay/all?x=1"), Some("/pay/all?x=1"));
    }
}
