//! Cookie sessions and the extractors that resolve them.
//!
//! The cookie carries a random token; only its keyed hash is stored, so a
//! leaked sessions table cannot be replayed.

use crate::error::{PageError, PageResult};
use crate::state::{AppState, SharedState};
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap, HeaderValue},
};
use axum_extra::extract::CookieJar;
use chrono::{Duration, Utc};
use varsityplug_common::ApiError;
use varsityplug_db::{DbError, FlashLevel, FlashMessage, User};
use varsityplug_security::{generate_session_token, hash_session_token};

/// The logged-in user behind the request.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    /// Hash of the session token; flash messages hang off it.
    pub token_hash: String,
}

impl CurrentUser {
    pub fn id(&self) -> i64 {
        self.user.id
    }

    pub async fn flash(&self, state: &AppState, level: FlashLevel, text: impl Into<String>) {
        let message = FlashMessage::new(level, text);
        if let Err(e) = state.sessions().push_flash(&self.token_hash, message).await {
            tracing::warn!("Could not store flash message for {}: {}", self.user.username, e);
        }
    }
}

async fn resolve(parts: &Parts, state: &AppState) -> Result<Option<CurrentUser>, DbError> {
    let jar = CookieJar::from_headers(&parts.headers);
    let Some(cookie) = jar.get(&state.config.session.cookie_name) else {
        return Ok(None);
    };
    let token_hash = hash_session_token(state.config.secret_key(), cookie.value());
    let Some(session) = state.sessions().find_valid(&token_hash, Utc::now()).await? else {
        return Ok(None);
    };
    let user = state.users().find_by_id(session.user_id).await?;
    Ok(user.map(|user| CurrentUser { user, token_hash }))
}

impl FromRequestParts<SharedState> for CurrentUser {
    type Rejection = PageError;

    async fn from_request_parts(parts: &mut Parts, state: &SharedState) -> Result<Self, Self::Rejection> {
        resolve(parts, state)
            .await?
            .ok_or_else(|| PageError::Unauthenticated {
                next: parts
                    .uri
                    .path_and_query()
                    .map(|pq| pq.as_str().to_string())
                    .unwrap_or_else(|| parts.uri.path().to_string()),
            })
    }
}

/// A logged-in user with the staff flag.
#[derive(Debug, Clone)]
pub struct StaffUser(pub CurrentUser);

impl FromRequestParts<SharedState> for StaffUser {
    type Rejection = PageError;

    async fn from_request_parts(parts: &mut Parts, state: &SharedState) -> Result<Self, Self::Rejection> {
        let current = CurrentUser::from_request_parts(parts, state).await?;
        if !current.user.is_staff {
            tracing::warn!("Non-staff user {} tried to open {}", current.user.username, parts.uri.path());
            return Err(PageError::Forbidden);
        }
        Ok(StaffUser(current))
    }
}

/// Public pages: the user if there is one.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<CurrentUser>);

impl FromRequestParts<SharedState> for MaybeUser {
    type Rejection = PageError;

    async fn from_request_parts(parts: &mut Parts, state: &SharedState) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(resolve(parts, state).await?))
    }
}

/// JSON endpoints answer 401 instead of redirecting.
#[derive(Debug, Clone)]
pub struct ApiUser(pub CurrentUser);

impl FromRequestParts<SharedState> for ApiUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &SharedState) -> Result<Self, Self::Rejection> {
        match resolve(parts, state).await {
            Ok(Some(user)) => Ok(ApiUser(user)),
            Ok(None) => Err(ApiError::Unauthorized),
            Err(e) => {
                tracing::error!("Session lookup failed: {}", e);
                Err(ApiError::Internal("An unexpected error occurred. Please try again.".to_string()))
            }
        }
    }
}

/// Open a session for `user_id` and return the `Set-Cookie` header for it.
pub async fn start_session(state: &AppState, user_id: i64) -> PageResult<(String, HeaderMap)> {
    let token = generate_session_token();
    let token_hash = hash_session_token(state.config.secret_key(), &token);
    let ttl = Duration::hours(state.config.session.ttl_hours);
    state.sessions().create(&token_hash, user_id, Utc::now() + ttl).await?;

    let headers = set_cookie_headers(&session_cookie(state, &token, ttl.num_seconds()))?;
    Ok((token_hash, headers))
}

/// Delete the session and return a header that clears the cookie.
pub async fn end_session(state: &AppState, user: &CurrentUser) -> PageResult<HeaderMap> {
    state.sessions().delete(&user.token_hash).await?;
    set_cookie_headers(&session_cookie(state, "", 0))
}

/// `Set-Cookie` header map; a value that is not a valid header is an error.
fn set_cookie_headers(cookie: &str) -> PageResult<HeaderMap> {
    let value = HeaderValue::from_str(cookie).map_err(|e| {
        PageError::Internal(format!("session cookie is not a valid header value: {e}"))
    })?;
    let mut headers = HeaderMap::new();
    headers.insert(header::SET_COOKIE, value);
    Ok(headers)
}

fn session_cookie(state: &AppState, value: &str, max_age: i64) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        state.config.session.cookie_name, value, max_age
    );
    if !state.config.server.debug {
        cookie.push_str("; Secure");
    }
    cookie
}
