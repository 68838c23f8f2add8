//! The Varsity Plug assistant: a scoped system prompt, one user turn, and a
//! check on the reply for refusals.

use crate::backend::{ChatBackend, LlmError, LlmRequest, Message};
use std::sync::Arc;
use varsityplug_common::SubscriptionPackage;

const SCOPE_PROMPT: &str = "You are VarsityPlug Assistant, helping South African students with \
university applications via the VarsityPlug app. Focus ONLY on app features (marks, documents, \
selection limits, fees shown in app), general SA university application advice (deadlines, \
requirements if known), and basic career guidance related to common fields (like linking \
subjects to faculties). Keep answers concise, friendly, and encouraging. Use bullet points for \
lists. DO NOT answer questions outside this scope (e.g., specific course content, personal \
advice, complex financial aid details, non-SA unis, controversial topics). If asked about \
something outside the scope, politely state you cannot help with that specific topic and \
suggest contacting the university directly or VarsityPlug support for app issues. If asked \
about specific university requirements not programmed, state that requirements vary and they \
should check the university's official website or the app's university details section.";

/// Phrases that suggest the model declined to answer.
pub const REFUSAL_PHRASES: [&str; 4] = ["cannot assist", "can't help", "outside my scope", "contact support"];

/// Who is asking, injected into the system prompt.
#[derive(Debug, Clone)]
pub struct ChatContext {
    pub username: String,
    pub package: SubscriptionPackage,
    pub aps: Option<u32>,
}

impl ChatContext {
    pub fn line(&self) -> String {
        let mut line = format!("User: {}. Subscription: {}. ", self.username, self.package.label());
        if let Some(aps) = self.aps.filter(|a| *a > 0) {
            line.push_str(&format!("APS Score: {aps}. "));
        }
        line
    }

    pub fn system_prompt(&self) -> String {
        format!("{SCOPE_PROMPT} Current context: {}", self.line())
    }
}

/// Trimmed message text, or `None` when there is nothing to send.
pub fn validate_message(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

pub fn looks_like_refusal(reply: &str) -> bool {
    let lower = reply.to_lowercase();
    REFUSAL_PHRASES.iter().any(|p| lower.contains(p))
}

pub struct Assistant {
    backend: Arc<dyn ChatBackend>,
    max_tokens: u32,
    temperature: f32,
}

impl Assistant {
    pub fn new(backend: Arc<dyn ChatBackend>, max_tokens: u32, temperature: f32) -> Self {
        Self { backend, max_tokens, temperature }
    }

    pub fn model_id(&self) -> &str {
        self.backend.model_id()
    }

    pub fn build_request(&self, ctx: &ChatContext, message: &str) -> LlmRequest {
        LlmRequest {
            messages: vec![Message::system(ctx.system_prompt()), Message::user(message)],
            model: None,
            max_tokens: Some(self.max_tokens),
            temperature: Some(self.temperature),
        }
    }

    /// Ask the backend and return the trimmed reply text.
    pub async fn reply(&self, ctx: &ChatContext, message: &str) -> Result<String, LlmError> {
        let resp = self.backend.complete(self.build_request(ctx, message)).await?;
        tracing::info!(
            "Chat reply for {} ({} prompt / {} completion tokens)",
            ctx.username,
            resp.prompt_tokens,
            resp.completion_tokens
        );
        if looks_like_refusal(&resp.content) {
            let preview: String = resp.content.chars().take(100).collect();
            tracing::warn!("Chat reply for {} might be a refusal: '{}...'", ctx.username, preview);
        }
        Ok(resp.content)
    }
}
