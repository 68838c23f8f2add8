//! Shared application state for the web server.

use crate::templates::Templates;
use std::sync::Arc;
use varsityplug_admissions::Catalog;
use varsityplug_config::Config;
use varsityplug_db::{
    ApplicationRepository, Database, DocumentRepository, PaymentRepository, SelectionRepository,
    SessionRepository, UniversityRepository, UserRepository,
};
use varsityplug_llm::{Assistant, ChatBackend, ChatRateLimiter, OpenAiCompatibleBackend};

/// Shared state injected into every Axum handler.
pub struct AppState {
    pub db: Arc<Database>,
    pub config: Arc<Config>,
    pub catalog: Arc<Catalog>,
    pub templates: Templates,
    /// `None` when no chat API key is configured.
    pub assistant: Option<Assistant>,
    pub chat_limiter: ChatRateLimiter,
}

impl AppState {
    pub fn new(db: Arc<Database>, config: Config, catalog: Catalog) -> Result<Self, minijinja::Error> {
        let assistant = config.chat_api_key().map(|key| {
            let backend = OpenAiCompatibleBackend::new(&config.chat.base_url, key, &config.chat.model);
            Assistant::new(Arc::new(backend), config.chat.max_tokens, config.chat.temperature)
        });
        if assistant.is_none() {
            tracing::warn!("No chat API key configured; the assistant is disabled");
        }

        Ok(Self {
            db,
            chat_limiter: ChatRateLimiter::per_minute(config.chat.rate_limit_per_minute),
            config: Arc::new(config),
            catalog: Arc::new(catalog),
            templates: Templates::new()?,
            assistant,
        })
    }

    /// Swap in another chat backend, e.g. a local model or a test double.
    pub fn with_chat_backend(mut self, backend: Arc<dyn ChatBackend>) -> Self {
        self.assistant = Some(Assistant::new(
            backend,
            self.config.chat.max_tokens,
            self.config.chat.temperature,
        ));
        self
    }

    pub fn users(&self) -> UserRepository {
        UserRepository::new(self.db.clone())
    }

    pub fn sessions(&self) -> SessionRepository {
        SessionRepository::new(self.db.clone())
    }

    pub fn universities(&self) -> UniversityRepository {
        UniversityRepository::new(self.db.clone())
    }

    pub fn selections(&self) -> SelectionRepository {
        SelectionRepository::new(self.db.clone())
    }

    pub fn documents(&self) -> DocumentRepository {
        DocumentRepository::new(self.db.clone())
    }

    pub fn applications(&self) -> ApplicationRepository {
        ApplicationRepository::new(self.db.clone())
    }

    pub fn payments(&self) -> PaymentRepository {
        PaymentRepository::new(self.db.clone())
    }
}

pub type SharedState = Arc<AppState>;
