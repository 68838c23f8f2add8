//! Bank-deposit instructions for application fees and packages.

use crate::auth::CurrentUser;
use crate::error::{PageError, PageResult};
use crate::state::SharedState;
use crate::templates::{render_page, Page};
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use minijinja::context;
use varsityplug_admissions::fees::{bulk_reference, parse_fee, single_fee_reference, BankDetails, FeeKind};
use varsityplug_admissions::subscription::terms;
use varsityplug_admissions::PaymentBreakdown;
use varsityplug_db::FlashLevel;

pub async fn pay_redirect(Path(id): Path<i64>) -> Redirect {
    Redirect::to(&format!("/pay/{id}/instructions"))
}

pub async fn pay_instructions(
    State(state): State<SharedState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> PageResult<Response> {
    let university = state
        .universities()
        .find(id)
        .await?
        .ok_or_else(|| PageError::NotFound(format!("university {id}")))?;

    let quote = parse_fee(&university.application_fee);
    match quote.kind {
        FeeKind::Unavailable => {
            user.flash(
                &state,
                FlashLevel::Error,
                format!("Application fee information for {} is not available.", university.name),
            )
            .await;
            return Ok(Redirect::to("/universities").into_response());
        }
        FeeKind::Free => {
            user.flash(
                &state,
                FlashLevel::Info,
                format!("No application fee is required for {}.", university.name),
            )
            .await;
            return Ok(Redirect::to("/universities").into_response());
        }
        FeeKind::Fixed | FeeKind::Tiered => {}
    }

    let bank = BankDetails::with_reference(single_fee_reference(user.id(), university.id));
    let page = Page::for_user(&state, &user).await?;
    let html = render_page(
        &state,
        "pay_instructions.html",
        page,
        context! {
            university => &university,
            quote => quote,
            bank => bank,
        },
    )?;
    Ok(html.into_response())
}

/// One deposit for every selected university plus the package.
pub async fn pay_all(State(state): State<SharedState>, user: CurrentUser) -> PageResult<Response> {
    let selected = state.selections().list(user.id()).await?;
    if selected.is_empty() {
        user.flash(&state, FlashLevel::Warning, "You have not selected any universities to apply to yet.").await;
        return Ok(Redirect::to("/universities").into_response());
    }

    let profile = state.users().profile(user.id()).await?;
    let breakdown = PaymentBreakdown::build(
        selected.iter().map(|u| (u.id, u.name.as_str(), u.application_fee.as_str())),
        terms(profile.subscription_package).price,
    );
    if breakdown.total == 0 {
        user.flash(
            &state,
            FlashLevel::Info,
            "No payment is required for your selected package and universities at this time.",
        )
        .await;
        return Ok(Redirect::to("/dashboard/student").into_response());
    }

    let payable: Vec<i64> = breakdown.payable().map(|l| l.university_id).collect();
    let bank = BankDetails::with_reference(bulk_reference(user.id(), &payable, breakdown.package_cost > 0));
    tracing::debug!(user_id = user.id(), total = breakdown.total, reference = %bank.reference, "Bulk payment instructions");

    let page = Page::for_user(&state, &user).await?;
    let html = render_page(
        &state,
        "pay_all.html",
        page,
        context! {
            package_label => profile.subscription_package.label(),
            breakdown => breakdown,
            bank => bank,
        },
    )?;
    Ok(html.into_response())
}
