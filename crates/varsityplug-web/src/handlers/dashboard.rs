//! Student dashboard: marks, APS, documents, selections and recommendations.

use crate::auth::CurrentUser;
use crate::error::PageResult;
use crate::state::{AppState, SharedState};
use crate::templates::{render_page, Page};
use axum::{
    extract::State,
    response::{IntoResponse, Redirect, Response},
    Form,
};
use chrono::{Duration, Utc};
use minijinja::context;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use varsityplug_admissions::eligibility::{eligible, recommend};
use varsityplug_admissions::fees::parse_fee;
use varsityplug_admissions::subjects::{mark_slots, REQUIRED_SUBJECTS};
use varsityplug_admissions::{Feature, MarkSheet, SortOrder, SubjectMark};
use varsityplug_common::DocumentType;
use varsityplug_db::{Document, FlashLevel, StudentProfile, University};
use varsityplug_security::validate_phone_number;

const RECOMMENDATIONS: usize = 5;

#[derive(Debug, Serialize)]
struct DocumentRow {
    #[serde(flatten)]
    document: Document,
    type_label: &'static str,
}

#[derive(Debug, Serialize)]
struct SelectedRow {
    id: i64,
    name: String,
    due_date: Option<String>,
    application_fee: String,
    fee_payable: bool,
    status: Option<&'static str>,
    payment_verified: bool,
}

#[derive(Debug, Serialize)]
struct UniversityCard<'a> {
    id: i64,
    name: &'a str,
    province: &'a str,
    description: &'a str,
    minimum_aps: i64,
    due_date: Option<String>,
    application_fee: &'a str,
}

impl<'a> From<&'a University> for UniversityCard<'a> {
    fn from(u: &'a University) -> Self {
        Self {
            id: u.id,
            name: &u.name,
            province: &u.province,
            description: &u.description,
            minimum_aps: u.minimum_aps,
            due_date: u.due_date.map(|d| d.format("%d %B %Y").to_string()),
            application_fee: &u.application_fee,
        }
    }
}

/// The stored APS, recomputed from stored marks when it is missing.
async fn current_aps(state: &AppState, profile: &StudentProfile) -> PageResult<Option<u32>> {
    if let Some(aps) = profile.aps() {
        return Ok(Some(aps));
    }
    let Some(marks) = profile.marks() else {
        return Ok(None);
    };
    match MarkSheet::from_map(marks) {
        Ok(sheet) => {
            let aps = sheet.aps();
            state.users().set_stored_aps(profile.user_id, Some(aps)).await?;
            tracing::info!(user_id = profile.user_id, aps, "Recomputed missing APS from stored marks");
            Ok(Some(aps))
        }
        Err(e) => {
            tracing::warn!(user_id = profile.user_id, "Stored marks no longer validate: {}", e);
            Ok(None)
        }
    }
}

pub async fn dashboard(State(state): State<SharedState>, user: CurrentUser) -> PageResult<Response> {
    let profile = state.users().profile(user.id()).await?;
    if !profile.subscription_status {
        user.flash(&state, FlashLevel::Info, "Please select a subscription package to access the dashboard features.")
            .await;
        return Ok(Redirect::to("/subscription").into_response());
    }

    let hours = state.config.verification.auto_verify_hours;
    if hours > 0 {
        let cutoff = Utc::now() - Duration::hours(i64::from(hours));
        let verified = state.documents().auto_verify_stale(user.id(), cutoff).await?;
        if verified > 0 {
            tracing::info!(user_id = user.id(), verified, "Auto-verified stale documents");
        }
    }

    let aps = current_aps(&state, &profile).await?;
    let subscription = profile.subscription();

    let documents: Vec<DocumentRow> = state
        .documents()
        .list_for_user(user.id())
        .await?
        .into_iter()
        .map(|document| DocumentRow { type_label: document.document_type.label(), document })
        .collect();

    let applications = state.applications().list_for_user(user.id()).await?;
    let statuses: HashMap<i64, (&'static str, bool)> = applications
        .iter()
        .map(|a| {
            (a.application.university_id, (a.application.status.label(), a.application.payment_verified))
        })
        .collect();

    let selected: Vec<SelectedRow> = state
        .selections()
        .list(user.id())
        .await?
        .into_iter()
        .map(|u| {
            let status = statuses.get(&u.id).copied();
            SelectedRow {
                id: u.id,
                due_date: u.due_date.map(|d| d.format("%d %B %Y").to_string()),
                fee_payable: parse_fee(&u.application_fee).is_payable(),
                application_fee: u.application_fee,
                name: u.name,
                status: status.map(|s| s.0),
                payment_verified: status.is_some_and(|s| s.1),
            }
        })
        .collect();

    let universities = state.universities().list().await?;
    let (recommended, qualified): (Vec<UniversityCard>, Vec<UniversityCard>) = match aps {
        Some(aps) => (
            recommend(aps, &universities, RECOMMENDATIONS).into_iter().map(UniversityCard::from).collect(),
            eligible(aps, &universities, SortOrder::Name).into_iter().map(UniversityCard::from).collect(),
        ),
        None => (Vec::new(), Vec::new()),
    };

    let payments = state.payments().list_for_user(user.id()).await?;
    let page = Page::for_user(&state, &user).await?;
    let html = render_page(
        &state,
        "dashboard.html",
        page,
        context! {
            profile => &profile,
            package_label => profile.subscription_package.label(),
            aps => aps,
            remaining => subscription.remaining(),
            slots => mark_slots(profile.marks()),
            documents => documents,
            document_types => DocumentType::ALL.iter().map(|t| (t.as_str(), t.label())).collect::<Vec<_>>(),
            selected => selected,
            recommended => recommended,
            qualified => qualified,
            payments => payments,
            whatsapp_available => subscription.has_feature(Feature::WhatsappChat),
            chat_available => state.assistant.is_some(),
        },
    )?;
    Ok(html.into_response())
}

// ── Marks ────────────────────────────────────────────────────────────────────

/// Read the seven `subject_{i}` / `mark_{i}` pairs. Errors are user-facing.
fn parse_marks_form(form: &HashMap<String, String>) -> Result<Vec<SubjectMark>, String> {
    let mut marks = Vec::with_capacity(REQUIRED_SUBJECTS);
    for i in 0..REQUIRED_SUBJECTS {
        let subject = form.get(&format!("subject_{i}")).map(|s| s.trim()).unwrap_or("");
        if subject.is_empty() {
            return Err(format!("Missing subject for entry {}.", i + 1));
        }
        let raw = form.get(&format!("mark_{i}")).map(|s| s.trim()).unwrap_or("");
        if raw.is_empty() {
            return Err(format!("Missing mark for {subject}."));
        }
        let mark: i32 = raw
            .parse()
            .map_err(|_| format!("Invalid mark '{raw}' for {subject}. Please enter a whole number."))?;
        marks.push(SubjectMark::new(subject, mark));
    }
    Ok(marks)
}

pub async fn submit_marks(
    State(state): State<SharedState>,
    user: CurrentUser,
    Form(form): Form<HashMap<String, String>>,
) -> PageResult<Redirect> {
    let sheet = parse_marks_form(&form).and_then(|marks| MarkSheet::new_strict(marks).map_err(|e| e.to_string()));

    match sheet {
        Ok(sheet) => {
            let aps = sheet.aps();
            state.users().save_marks(user.id(), &sheet.to_map(), aps).await?;
            user.flash(
                &state,
                FlashLevel::Success,
                format!("Marks updated successfully! Your new APS score is {aps}."),
            )
            .await;
        }
        Err(message) => {
            tracing::debug!(user_id = user.id(), "Marks rejected: {}", message);
            user.flash(&state, FlashLevel::Error, message).await;
        }
    }
    Ok(Redirect::to("/dashboard/student"))
}

// ── Contact details ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ContactForm {
    #[serde(default)]
    pub phone_number: String,
    /// Checkbox; present only when ticked.
    #[serde(default)]
    pub whatsapp_enabled: Option<String>,
}

pub async fn update_profile(
    State(state): State<SharedState>,
    user: CurrentUser,
    Form(form): Form<ContactForm>,
) -> PageResult<Redirect> {
    let phone = form.phone_number.trim();
    let phone = (!phone.is_empty()).then_some(phone);

    if let Some(number) = phone {
        if !validate_phone_number(number) {
            user.flash(
                &state,
                FlashLevel::Error,
                "Phone number must be entered in the format: '+27XXXXXXXXX'. Exactly 9 digits after +27.",
            )
            .await;
            return Ok(Redirect::to("/dashboard/student"));
        }
    }

    let profile = state.users().profile(user.id()).await?;
    let wants_whatsapp = form.whatsapp_enabled.is_some();
    if wants_whatsapp && !profile.subscription().has_feature(Feature::WhatsappChat) {
        user.flash(&state, FlashLevel::Warning, "WhatsApp support is included with the Premium and Ultimate packages.")
            .await;
        return Ok(Redirect::to("/dashboard/student"));
    }
    if wants_whatsapp && phone.is_none() {
        user.flash(&state, FlashLevel::Error, "Add a phone number to receive WhatsApp support.").await;
        return Ok(Redirect::to("/dashboard/student"));
    }

    state.users().update_contact(user.id(), phone, wants_whatsapp).await?;
    user.flash(&state, FlashLevel::Success, "Contact details updated.").await;
    Ok(Redirect::to("/dashboard/student"))
}
