//! Chat endpoint proxying student questions to the assistant.

use crate::auth::ApiUser;
use crate::state::SharedState;
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use varsityplug_llm::{validate_message, ChatContext, LlmError};

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    message: String,
}

/// Failures answered as `{"error": ...}`.
#[derive(Debug)]
pub enum ChatError {
    Unavailable,
    NotSubscribed,
    TooManyRequests,
    InvalidJson,
    EmptyMessage,
    Storage,
    Provider(LlmError),
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ChatError::Unavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "AI chat is not available right now. Please try again later.",
            ),
            ChatError::NotSubscribed => (
                StatusCode::FORBIDDEN,
                "Your current subscription package does not include chat support.",
            ),
            ChatError::TooManyRequests => (
                StatusCode::TOO_MANY_REQUESTS,
                "You are sending messages too quickly. Please wait a minute and try again.",
            ),
            ChatError::InvalidJson => (StatusCode::BAD_REQUEST, "Invalid request format. Send JSON."),
            ChatError::EmptyMessage => (StatusCode::BAD_REQUEST, "Message cannot be empty"),
            ChatError::Storage => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An unexpected error occurred. Please try again.",
            ),
            ChatError::Provider(LlmError::Auth(detail)) => {
                tracing::error!("Chat provider rejected the API key: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "AI chat service configuration error. Please contact support.",
                )
            }
            ChatError::Provider(LlmError::RateLimitExceeded) => {
                tracing::warn!("Chat provider rate limit hit");
                (StatusCode::TOO_MANY_REQUESTS, "AI assistant is busy. Please try again in a moment.")
            }
            ChatError::Provider(other) => {
                tracing::error!("Chat provider failed: {}", other);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Could not get response from AI assistant. Please try again later.",
                )
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

pub async fn ai_chat(
    State(state): State<SharedState>,
    ApiUser(user): ApiUser,
    body: Bytes,
) -> Result<Json<serde_json::Value>, ChatError> {
    let assistant = state.assistant.as_ref().ok_or(ChatError::Unavailable)?;

    let profile = state.users().profile(user.id()).await.map_err(|e| {
        tracing::error!("Could not load profile for chat: {}", e);
        ChatError::Storage
    })?;
    if !profile.subscription_status {
        return Err(ChatError::NotSubscribed);
    }

    if !state.chat_limiter.check(user.id()) {
        tracing::info!(user_id = user.id(), "Chat rate limit reached");
        return Err(ChatError::TooManyRequests);
    }

    let request: ChatRequest = serde_json::from_slice(&body).map_err(|_| ChatError::InvalidJson)?;
    let message = validate_message(&request.message).ok_or(ChatError::EmptyMessage)?;

    let ctx = ChatContext {
        username: user.user.username.clone(),
        package: profile.subscription_package,
        aps: profile.aps(),
    };
    let reply = assistant.reply(&ctx, message).await.map_err(ChatError::Provider)?;

    if let Err(e) = state.users().touch_chat(user.id()).await {
        tracing::warn!("Could not record chat time for {}: {}", user.user.username, e);
    }
    Ok(Json(json!({ "response": reply })))
}
