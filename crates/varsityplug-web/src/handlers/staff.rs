//! Staff queues: document verification, payments and application statuses.

use crate::auth::StaffUser;
use crate::error::{PageError, PageResult};
use crate::state::SharedState;
use crate::templates::{render_page, Page};
use axum::{
    extract::{Path, Query, State},
    response::{Html, Redirect},
    Form,
};
use minijinja::context;
use serde::Deserialize;
use varsityplug_common::{ApplicationState, PaymentStatus};
use varsityplug_db::FlashLevel;

// ── Documents ────────────────────────────────────────────────────────────────

pub async fn documents_queue(State(state): State<SharedState>, StaffUser(staff): StaffUser) -> PageResult<Html<String>> {
    let documents = state.documents().list_unverified().await?;
    let page = Page::for_user(&state, &staff).await?;
    render_page(&state, "staff_documents.html", page, context! { documents => documents })
}

#[derive(Debug, Default, Deserialize)]
pub struct VerifyDocumentForm {
    #[serde(default)]
    pub notes: String,
}

pub async fn verify_document(
    State(state): State<SharedState>,
    StaffUser(staff): StaffUser,
    Path(id): Path<i64>,
    Form(form): Form<VerifyDocumentForm>,
) -> PageResult<Redirect> {
    let notes = form.notes.trim();
    let doc = state
        .documents()
        .verify(id, (!notes.is_empty()).then_some(notes))
        .await?
        .ok_or_else(|| PageError::NotFound(format!("document {id}")))?;

    tracing::info!(staff = %staff.user.username, document_id = doc.id, "Document verified");
    staff
        .flash(&state, FlashLevel::Success, format!("{} #{} marked as verified.", doc.document_type.label(), doc.id))
        .await;
    Ok(Redirect::to("/staff/documents"))
}

// ── Payments ─────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct PaymentFilter {
    pub status: Option<String>,
}

pub async fn payments_queue(
    State(state): State<SharedState>,
    StaffUser(staff): StaffUser,
    Query(filter): Query<PaymentFilter>,
) -> PageResult<Html<String>> {
    let status = match filter.status.as_deref().map(str::trim).filter(|s| !s.is_empty() && *s != "all") {
        None => None,
        Some(raw) => Some(
            raw.parse::<PaymentStatus>()
                .map_err(|e| PageError::BadRequest(e.to_string()))?,
        ),
    };
    let payments = state.payments().list_with_owner(status).await?;
    let page = Page::for_user(&state, &staff).await?;
    render_page(
        &state,
        "staff_payments.html",
        page,
        context! {
            payments => payments,
            status => status.map(|s| s.as_str()).unwrap_or("all"),
        },
    )
}

#[derive(Debug, Default, Deserialize)]
pub struct PaymentActionForm {
    #[serde(default)]
    pub action: String,
}

pub async fn verify_payment(
    State(state): State<SharedState>,
    StaffUser(staff): StaffUser,
    Path(id): Path<i64>,
    Form(form): Form<PaymentActionForm>,
) -> PageResult<Redirect> {
    let back = Redirect::to("/staff/payments");
    let status = match form.action.as_str() {
        "verify" | "" => PaymentStatus::Verified,
        "reject" => PaymentStatus::Rejected,
        other => {
            staff.flash(&state, FlashLevel::Error, format!("Unknown payment action '{other}'.")).await;
            return Ok(back);
        }
    };

    let payment = state
        .payments()
        .set_status(id, status)
        .await?
        .ok_or_else(|| PageError::NotFound(format!("payment {id}")))?;

    tracing::info!(staff = %staff.user.username, payment_id = payment.id, %status, "Payment reviewed");
    let text = match status {
        PaymentStatus::Verified => format!("Payment #{} of R{} verified.", payment.id, payment.amount),
        _ => format!("Payment #{} marked as {}.", payment.id, status),
    };
    staff.flash(&state, FlashLevel::Success, text).await;
    Ok(back)
}

// ── Applications ─────────────────────────────────────────────────────────────

pub async fn applications_list(
    State(state): State<SharedState>,
    StaffUser(staff): StaffUser,
) -> PageResult<Html<String>> {
    let applications = state.applications().list_all().await?;
    let page = Page::for_user(&state, &staff).await?;
    render_page(
        &state,
        "staff_applications.html",
        page,
        context! {
            applications => applications,
            states => ApplicationState::ALL.iter().map(|s| (s.as_str(), s.label())).collect::<Vec<_>>(),
        },
    )
}

#[derive(Debug, Default, Deserialize)]
pub struct ApplicationUpdateForm {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub tracking_number: String,
}

pub async fn update_application(
    State(state): State<SharedState>,
    StaffUser(staff): StaffUser,
    Path(id): Path<i64>,
    Form(form): Form<ApplicationUpdateForm>,
) -> PageResult<Redirect> {
    let back = Redirect::to("/staff/applications");
    let Ok(status) = form.status.parse::<ApplicationState>() else {
        staff.flash(&state, FlashLevel::Error, format!("'{}' is not a valid application status.", form.status)).await;
        return Ok(back);
    };

    let app = state
        .applications()
        .update(id, status, Some(&form.tracking_number))
        .await?
        .ok_or_else(|| PageError::NotFound(format!("application {id}")))?;

    staff
        .flash(&state, FlashLevel::Success, format!("Application #{} set to {}.", app.id, status.label()))
        .await;
    Ok(back)
}
