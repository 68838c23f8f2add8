//! University list, detail and faculty pages, plus selection endpoints.

use crate::auth::{ApiUser, CurrentUser};
use crate::error::{PageError, PageResult};
use crate::state::SharedState;
use crate::templates::{render_page, Page};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    Json,
};
use axum_extra::extract::Form;
use minijinja::context;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashSet;
use varsityplug_admissions::eligibility::{above_threshold, eligible, Admissible};
use varsityplug_admissions::fees::fee_display;
use varsityplug_admissions::subscription::terms;
use varsityplug_admissions::{Feature, PaymentBreakdown, SortOrder};
use varsityplug_common::{ApiError, VarsityError};
use varsityplug_db::{FlashLevel, ReplaceOutcome, SelectOutcome, University};

#[derive(Debug, Serialize)]
struct EligibleRow<'a> {
    university: &'a University,
    fee: String,
    due_date: String,
    is_selected: bool,
}

#[derive(Debug, Serialize)]
struct SelectedDetail<'a> {
    university: &'a University,
    due_date: String,
    faculties: Vec<String>,
    application_fee: &'a str,
}

fn due_date_text(u: &University) -> String {
    u.due_date.map(|d| d.format("%d %B %Y").to_string()).unwrap_or_else(|| "TBD".to_string())
}

pub async fn universities_page(State(state): State<SharedState>, user: CurrentUser) -> PageResult<Html<String>> {
    let profile = state.users().profile(user.id()).await?;
    let subscription = profile.subscription();
    let aps = profile.aps();

    let universities = state.universities().list().await?;
    let selected = state.selections().list(user.id()).await?;
    let selected_ids: HashSet<i64> = selected.iter().map(|u| u.id).collect();
    let guidance = subscription.has_feature(Feature::FeeGuidance);

    let eligible_rows: Vec<EligibleRow> = match aps {
        Some(aps) => eligible(aps, &universities, SortOrder::Name)
            .into_iter()
            .map(|u| EligibleRow {
                fee: fee_display(&u.application_fee, guidance),
                due_date: due_date_text(u),
                is_selected: selected_ids.contains(&u.id),
                university: u,
            })
            .collect(),
        None => Vec::new(),
    };

    let selected_details: Vec<SelectedDetail> = selected
        .iter()
        .map(|u| SelectedDetail {
            university: u,
            due_date: due_date_text(u),
            faculties: state.catalog.faculties(&u.name).to_vec(),
            application_fee: &u.application_fee,
        })
        .collect();

    let breakdown = PaymentBreakdown::build(
        selected.iter().map(|u| (u.id, u.name.as_str(), u.application_fee.as_str())),
        terms(profile.subscription_package).price,
    );

    let page = Page::for_user(&state, &user).await?;
    render_page(
        &state,
        "universities.html",
        page,
        context! {
            aps => aps,
            package_label => profile.subscription_package.label(),
            limit => subscription.terms().application_limit,
            application_count => profile.application_count,
            eligible => eligible_rows,
            all_universities => &universities,
            selected => selected_details,
            selected_ids => selected_ids,
            breakdown => breakdown,
        },
    )
}

#[derive(Debug, Default, Deserialize)]
pub struct BulkSelectionForm {
    #[serde(default)]
    pub universities: Vec<String>,
}

/// Replace the whole selection set from the bulk form.
pub async fn universities_submit(
    State(state): State<SharedState>,
    user: CurrentUser,
    Form(form): Form<BulkSelectionForm>,
) -> PageResult<Redirect> {
    let back = Redirect::to("/universities");

    let mut ids = Vec::with_capacity(form.universities.len());
    for raw in &form.universities {
        match raw.trim().parse::<i64>() {
            Ok(id) => ids.push(id),
            Err(_) => {
                user.flash(&state, FlashLevel::Error, format!("Invalid university ID received: {raw}")).await;
                return Ok(back);
            }
        }
    }

    let chosen = state.universities().find_many(&ids).await?;
    let chosen_ids: Vec<i64> = chosen.iter().map(|u| u.id).collect();

    match state.selections().replace(user.id(), &chosen_ids).await? {
        ReplaceOutcome::Rejected(e) => {
            tracing::info!(user_id = user.id(), wanted = chosen_ids.len(), "Bulk selection rejected: {}", e);
            user.flash(&state, FlashLevel::Error, e.to_string()).await;
        }
        ReplaceOutcome::Saved { added, removed } => {
            let profile = state.users().profile(user.id()).await?;
            let risky = above_threshold(profile.aps(), &chosen);
            if let (Some(aps), false) = (profile.aps(), risky.is_empty()) {
                user.flash(
                    &state,
                    FlashLevel::Warning,
                    format!(
                        "Warning: Your APS score ({aps}) might not meet the minimum requirement for: {}. \
                         Your selections have been saved, but admission is less likely for these.",
                        risky.join(", ")
                    ),
                )
                .await;
            }
            tracing::info!(user_id = user.id(), added, removed, "Selected universities updated");
            user.flash(&state, FlashLevel::Success, "Selected universities updated successfully!").await;
        }
    }
    Ok(back)
}

pub async fn university_detail(
    State(state): State<SharedState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> PageResult<Html<String>> {
    let university = state
        .universities()
        .find(id)
        .await?
        .ok_or_else(|| PageError::NotFound(format!("university {id}")))?;
    let profile = state.users().profile(user.id()).await?;
    let selected = state.selections().ids(user.id()).await?;
    let faculties = state.catalog.faculties(&university.name);

    let page = Page::for_user(&state, &user).await?;
    render_page(
        &state,
        "university_detail.html",
        page,
        context! {
            university => &university,
            application_fee => if university.application_fee.is_empty() { "Not available" } else { university.application_fee.as_str() },
            due_date => due_date_text(&university),
            faculties => faculties,
            eligible => profile.aps().map(|aps| university.admits(aps)),
            is_selected => selected.contains(&id),
        },
    )
}

#[derive(Debug, Serialize)]
struct FacultyRow<'a> {
    faculty: &'a str,
    courses: Vec<&'a str>,
}

pub async fn university_faculties(
    State(state): State<SharedState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> PageResult<Html<String>> {
    let university = state
        .universities()
        .find(id)
        .await?
        .ok_or_else(|| PageError::NotFound(format!("university {id}")))?;
    let profile = state.users().profile(user.id()).await?;

    let courses = state.catalog.courses(&university.name);
    let faculties: Vec<FacultyRow> = state
        .catalog
        .faculties(&university.name)
        .iter()
        .map(|faculty| FacultyRow {
            faculty,
            courses: courses
                .iter()
                .find(|c| &c.faculty == faculty)
                .map(|c| c.names.iter().map(String::as_str).collect())
                .unwrap_or_else(|| vec!["Course list pending update."]),
        })
        .collect();

    let page = Page::for_user(&state, &user).await?;
    render_page(
        &state,
        "university_faculties.html",
        page,
        context! {
            university => &university,
            faculties => faculties,
            show_course_advice => profile.subscription().has_feature(Feature::CourseAdvice),
        },
    )
}

// ── JSON selection endpoints ─────────────────────────────────────────────────

async fn find_university(state: &SharedState, id: i64) -> Result<University, ApiError> {
    match state.universities().find(id).await {
        Ok(Some(u)) => Ok(u),
        Ok(None) => Err(ApiError::NotFound("University not found.".to_string())),
        Err(e) => Err(VarsityError::from(e).into()),
    }
}

async fn application_count(state: &SharedState, user_id: i64) -> Result<i64, ApiError> {
    state
        .users()
        .profile(user_id)
        .await
        .map(|p| p.application_count)
        .map_err(|e| VarsityError::from(e).into())
}

pub async fn select_university(
    State(state): State<SharedState>,
    ApiUser(user): ApiUser,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let university = find_university(&state, id).await?;
    let outcome = state
        .selections()
        .select(user.id(), id)
        .await
        .map_err(VarsityError::from)?;

    match outcome {
        SelectOutcome::Selected => {
            let count = application_count(&state, user.id()).await?;
            Ok(Json(json!({
                "success": true,
                "message": format!("{} has been successfully selected!", university.name),
                "application_count": count,
            }))
            .into_response())
        }
        SelectOutcome::AlreadySelected => {
            tracing::debug!(user_id = user.id(), university_id = id, "University already selected");
            Err(ApiError::BadRequest(format!("{} is already selected.", university.name)))
        }
        SelectOutcome::Rejected(e) => {
            tracing::warn!(user_id = user.id(), university_id = id, "Selection rejected: {}", e);
            Err(ApiError::Forbidden(e.to_string()))
        }
    }
}

pub async fn deselect_university(
    State(state): State<SharedState>,
    ApiUser(user): ApiUser,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let university = find_university(&state, id).await?;
    let removed = state
        .selections()
        .deselect(user.id(), id)
        .await
        .map_err(VarsityError::from)?;
    if !removed {
        return Err(ApiError::BadRequest(format!("{} is not in your selections.", university.name)));
    }
    let count = application_count(&state, user.id()).await?;
    Ok((
        StatusCode::OK,
        Json(json!({
            "success": true,
            "message": format!("{} has been removed from your selections.", university.name),
            "application_count": count,
        })),
    )
        .into_response())
}
