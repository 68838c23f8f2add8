//! Package selection and upgrades.

use crate::auth::CurrentUser;
use crate::error::PageResult;
use crate::state::SharedState;
use crate::templates::{render_page, Page};
use axum::{
    extract::State,
    response::{Html, Redirect},
    Form,
};
use minijinja::context;
use serde::Deserialize;
use varsityplug_admissions::subscription::terms;
use varsityplug_admissions::ChangeKind;
use varsityplug_common::SubscriptionPackage;
use varsityplug_db::FlashLevel;

pub async fn subscription_page(State(state): State<SharedState>, user: CurrentUser) -> PageResult<Html<String>> {
    let profile = state.users().profile(user.id()).await?;
    let page = Page::for_user(&state, &user).await?;
    let packages: Vec<_> = SubscriptionPackage::ALL.iter().map(|p| terms(*p)).collect();
    render_page(
        &state,
        "subscription.html",
        page,
        context! {
            packages => packages,
            is_upgrade => profile.subscription_status,
            current_package => profile.subscription_package,
        },
    )
}

#[derive(Debug, Deserialize)]
pub struct PackageForm {
    #[serde(default)]
    pub package: String,
}

pub async fn subscription_submit(
    State(state): State<SharedState>,
    user: CurrentUser,
    Form(form): Form<PackageForm>,
) -> PageResult<Redirect> {
    let Ok(package) = form.package.parse::<SubscriptionPackage>() else {
        user.flash(&state, FlashLevel::Error, "Invalid package selected. Please try again.").await;
        return Ok(Redirect::to("/subscription"));
    };

    let profile = state.users().profile(user.id()).await?;
    let mut subscription = profile.subscription();
    let change = subscription.change_package(package);
    state.users().apply_package_change(user.id(), package, change).await?;

    let message = match change.kind {
        ChangeKind::Subscribed => format!("You have successfully subscribed to the {}!", package.label()),
        ChangeKind::Upgraded => format!(
            "You have successfully upgraded to the {}! Your application count and selections have been reset.",
            package.label()
        ),
        ChangeKind::Changed => format!("You have successfully changed to the {}!", package.label()),
    };
    user.flash(&state, FlashLevel::Success, message).await;
    Ok(Redirect::to("/dashboard/student"))
}
