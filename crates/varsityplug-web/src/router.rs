//! Axum router: maps all URL paths to handlers.

use axum::{
    Router,
    body::Body,
    extract::{DefaultBodyLimit, State},
    http::{header, Request, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tower_http::{
    services::ServeDir,
    cors::CorsLayer,
    trace::TraceLayer,
    compression::CompressionLayer,
};
use std::sync::Arc;
use crate::state::{AppState, SharedState};
use crate::handlers::{
    accounts::{login_page, login_submit, logout, redirect_after_login, register_page, register_submit},
    chat::ai_chat,
    dashboard::{dashboard, submit_marks, update_profile},
    documents::{delete_document, download_document, edit_document, upload_document},
    health::health,
    pages::{about, contact, home, services},
    payments::{pay_all, pay_instructions, pay_redirect},
    staff::{applications_list, documents_queue, payments_queue, update_application, verify_document, verify_payment},
    subscription::{subscription_page, subscription_submit},
    universities::{
        deselect_university, select_university, universities_page, universities_submit,
        university_detail, university_faculties,
    },
};

/// Uploads are capped at 5MB per file; leave room for the multipart framing.
const UPLOAD_BODY_LIMIT: usize = 6 * 1024 * 1024;

/// Reject requests whose `Host` header is not an allowed host.
async fn check_host(State(state): State<SharedState>, req: Request<Body>, next: Next) -> Response {
    let host = req
        .headers()
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .or_else(|| req.uri().authority().map(|a| a.as_str()));

    match host {
        Some(host) if state.config.is_allowed_host(host) => next.run(req).await,
        other => {
            tracing::warn!("Rejected request for disallowed host {:?}", other);
            (StatusCode::BAD_REQUEST, "Bad Request (400)").into_response()
        }
    }
}

/// Build and return the full Axum router.
pub fn build_router(state: AppState) -> Router {
    let shared: SharedState = Arc::new(state);
    let static_root = shared.config.server.static_root.clone();

    Router::new()
        // Public pages
        .route("/",         get(home))
        .route("/about",    get(about))
        .route("/services", get(services))
        .route("/contact",  get(contact))
        .route("/health",   get(health))

        // Accounts
        .route("/register",              get(register_page).post(register_submit))
        .route("/accounts/login",        get(login_page).post(login_submit))
        .route("/accounts/logout",       post(logout))
        .route("/redirect_after_login",  get(redirect_after_login))
        .route("/subscription",          get(subscription_page).post(subscription_submit))

        // Dashboard
        .route("/dashboard/student", get(dashboard))
        .route("/dashboard/marks",   post(submit_marks))
        .route("/dashboard/profile", post(update_profile))

        // Documents
        .route("/documents/upload",
               post(upload_document).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)))
        .route("/document/edit/{id}",
               post(edit_document).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)))
        .route("/document/delete/{id}", post(delete_document))
        .route("/document/{id}/file",    get(download_document))

        // Universities
        .route("/universities",                 get(universities_page).post(universities_submit))
        .route("/university/{id}",              get(university_detail))
        .route("/university/{id}/faculties",    get(university_faculties))
        .route("/select-university/{id}",       post(select_university))
        .route("/deselect-university/{id}",     post(deselect_university))

        // Payments
        .route("/pay/all",                get(pay_all))
        .route("/pay/{id}",               get(pay_redirect))
        .route("/pay/{id}/instructions",  get(pay_instructions))

        // Assistant
        .route("/ai-chat", post(ai_chat))

        // Staff
        .route("/staff/documents",               get(documents_queue))
        .route("/staff/documents/{id}/verify",   post(verify_document))
        .route("/staff/payments",                get(payments_queue))
        .route("/staff/payments/{id}/verify",    post(verify_payment))
        .route("/staff/applications",            get(applications_list))
        .route("/staff/applications/{id}",       post(update_application))

        // Static files
        .nest_service("/static", ServeDir::new(static_root))

        // Middleware
        .layer(middleware::from_fn_with_state(shared.clone(), check_host))
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(shared)
}
