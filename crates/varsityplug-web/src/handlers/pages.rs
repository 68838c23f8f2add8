//! Public marketing pages.

use crate::auth::MaybeUser;
use crate::error::PageResult;
use crate::state::SharedState;
use crate::templates::{render_page, Page};
use axum::{extract::State, response::Html};
use minijinja::context;
use varsityplug_admissions::subscription::{service_fee, terms};
use varsityplug_common::SubscriptionPackage;

async fn static_page(state: &SharedState, user: MaybeUser, name: &str) -> PageResult<Html<String>> {
    let page = Page::for_optional(state, user.0.as_ref()).await?;
    let packages: Vec<_> = SubscriptionPackage::ALL.iter().map(|p| terms(*p)).collect();
    let service_fees: Vec<_> = SubscriptionPackage::ALL.iter().map(|p| service_fee(*p)).collect();
    render_page(state, name, page, context! { packages => packages, service_fees => service_fees })
}

pub async fn home(State(state): State<SharedState>, user: MaybeUser) -> PageResult<Html<String>> {
    static_page(&state, user, "home.html").await
}

pub async fn about(State(state): State<SharedState>, user: MaybeUser) -> PageResult<Html<String>> {
    static_page(&state, user, "about.html").await
}

pub async fn services(State(state): State<SharedState>, user: MaybeUser) -> PageResult<Html<String>> {
    static_page(&state, user, "services.html").await
}

pub async fn contact(State(state): State<SharedState>, user: MaybeUser) -> PageResult<Html<String>> {
    static_page(&state, user, "contact.html").await
}
