//! Test harness: an in-memory app driven through `tower::ServiceExt::oneshot`.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;
use varsityplug_admissions::Catalog;
use varsityplug_common::SubscriptionPackage;
use varsityplug_config::Config;
use varsityplug_db::{Database, University, UniversityRepository, UserRepository};
use varsityplug_llm::{ChatBackend, LlmError, LlmRequest, LlmResponse};
use varsityplug_test_utils::{form_body, temp_media_dir, unique_username, STRONG_PASSWORD};
use varsityplug_web::{build_router, AppState};

pub struct TestApp {
    pub router: Router,
    pub db: Arc<Database>,
    pub media: TempDir,
}

/// What the stub chat backend answers with.
#[derive(Debug, Clone)]
pub enum StubReply {
    Text(&'static str),
    BadKey,
    Busy,
    Down,
}

pub struct StubBackend(pub StubReply);

#[async_trait]
impl ChatBackend for StubBackend {
    async fn complete(&self, _req: LlmRequest) -> Result<LlmResponse, LlmError> {
        match &self.0 {
            StubReply::Text(text) => Ok(LlmResponse {
                content: text.to_string(),
                model: "stub".to_string(),
                prompt_tokens: 12,
                completion_tokens: 8,
            }),
            StubReply::BadKey => Err(LlmError::Auth("invalid api key".to_string())),
            StubReply::Busy => Err(LlmError::RateLimitExceeded),
            StubReply::Down => Err(LlmError::Unavailable("connection refused".to_string())),
        }
    }

    fn model_id(&self) -> &str {
        "stub"
    }
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::build(None, |_| {}).await
    }

    pub async fn with_chat(reply: StubReply) -> Self {
        Self::build(Some(Arc::new(StubBackend(reply))), |_| {}).await
    }

    pub async fn build(backend: Option<Arc<dyn ChatBackend>>, tweak: impl FnOnce(&mut Config)) -> Self {
        let db = Arc::new(Database::in_memory().await.expect("in-memory database"));
        let catalog = Catalog::embedded().expect("embedded catalog");
        UniversityRepository::new(db.clone()).seed(&catalog).await.expect("seed catalog");

        let media = temp_media_dir();
        let mut config = Config::for_tests();
        config.server.media_root = media.path().to_path_buf();
        tweak(&mut config);

        let mut state = AppState::new(db.clone(), config, catalog).expect("app state");
        if let Some(backend) = backend {
            state = state.with_chat_backend(backend);
        }
        Self { router: build_router(state), db, media }
    }

    pub async fn send(&self, req: Request<Body>) -> Response {
        self.router.clone().oneshot(req).await.expect("router is infallible")
    }

    pub async fn get(&self, path: &str, cookie: Option<&str>) -> Response {
        let mut req = Request::get(path).header(header::HOST, "localhost");
        if let Some(c) = cookie {
            req = req.header(header::COOKIE, c);
        }
        self.send(req.body(Body::empty()).unwrap()).await
    }

    pub async fn post_form<K: AsRef<str>, V: AsRef<str>>(
        &self,
        path: &str,
        cookie: Option<&str>,
        pairs: &[(K, V)],
    ) -> Response {
        let mut req = Request::post(path)
            .header(header::HOST, "localhost")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(c) = cookie {
            req = req.header(header::COOKIE, c);
        }
        self.send(req.body(Body::from(form_body(pairs))).unwrap()).await
    }

    pub async fn post_json(&self, path: &str, cookie: Option<&str>, body: &str) -> Response {
        let mut req = Request::post(path)
            .header(header::HOST, "localhost")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(c) = cookie {
            req = req.header(header::COOKIE, c);
        }
        self.send(req.body(Body::from(body.to_string())).unwrap()).await
    }

    pub async fn post_multipart(&self, path: &str, cookie: &str, (content_type, body): (String, Vec<u8>)) -> Response {
        let req = Request::post(path)
            .header(header::HOST, "localhost")
            .header(header::CONTENT_TYPE, content_type)
            .header(header::COOKIE, cookie)
            .body(Body::from(body))
            .unwrap();
        self.send(req).await
    }

    /// Register a fresh student; returns (username, cookie).
    pub async fn register(&self) -> (String, String) {
        let username = unique_username("student");
        let resp = self
            .post_form(
                "/register",
                None,
                &[
                    ("username", username.as_str()),
                    ("email", "student@example.com"),
                    ("password1", STRONG_PASSWORD),
                    ("password2", STRONG_PASSWORD),
                ],
            )
            .await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER, "registration failed");
        let cookie = session_cookie(&resp).expect("session cookie");
        (username, cookie)
    }

    /// Register and activate `package`.
    pub async fn subscribed_student(&self, package: SubscriptionPackage) -> (String, String) {
        let (username, cookie) = self.register().await;
        let resp = self.post_form("/subscription", Some(&cookie), &[("package", package.as_str())]).await;
        assert_eq!(location(&resp), "/dashboard/student");
        (username, cookie)
    }

    pub async fn user_id(&self, username: &str) -> i64 {
        UserRepository::new(self.db.clone())
            .find_by_username(username)
            .await
            .unwrap()
            .expect("user exists")
            .id
    }

    pub async fn universities(&self) -> Vec<University> {
        UniversityRepository::new(self.db.clone()).list().await.unwrap()
    }
}

/// `name=value` from the response's Set-Cookie, ready for a Cookie header.
pub fn session_cookie(resp: &Response) -> Option<String> {
    let raw = resp.headers().get(header::SET_COOKIE)?.to_str().ok()?;
    raw.split(';').next().map(|s| s.trim().to_string())
}

pub fn location(resp: &Response) -> String {
    resp.headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

pub async fn body_text(resp: Response) -> String {
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.expect("read body");
    String::from_utf8_lossy(&bytes).into_owned()
}

pub async fn body_json(resp: Response) -> serde_json::Value {
    let text = body_text(resp).await;
    serde_json::from_str(&text).unwrap_or_else(|e| panic!("not JSON ({e}): {text}"))
}
