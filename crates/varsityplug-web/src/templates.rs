//! Page templates, compiled into the binary and rendered with minijinja.

use crate::auth::CurrentUser;
use crate::error::PageResult;
use crate::state::AppState;
use axum::response::Html;
use minijinja::{context, Environment, Value};
use serde::Serialize;
use varsityplug_db::FlashMessage;

const TEMPLATES: &[(&str, &str)] = &[
    ("base.html",                include_str!("../templates/base.html")),
    ("home.html",                include_str!("../templates/home.html")),
    ("about.html",               include_str!("../templates/about.html")),
    ("services.html",            include_str!("../templates/services.html")),
    ("contact.html",             include_str!("../templates/contact.html")),
    ("register.html",            include_str!("../templates/register.html")),
    ("login.html",               include_str!("../templates/login.html")),
    ("subscription.html",        include_str!("../templates/subscription.html")),
    ("dashboard.html",           include_str!("../templates/dashboard.html")),
    ("universities.html",        include_str!("../templates/universities.html")),
    ("university_detail.html",   include_str!("../templates/university_detail.html")),
    ("university_faculties.html", include_str!("../templates/university_faculties.html")),
    ("pay_instructions.html",    include_str!("../templates/pay_instructions.html")),
    ("pay_all.html",             include_str!("../templates/pay_all.html")),
    ("staff_documents.html",     include_str!("../templates/staff_documents.html")),
    ("staff_payments.html",      include_str!("../templates/staff_payments.html")),
    ("staff_applications.html",  include_str!("../templates/staff_applications.html")),
];

pub struct Templates {
    env: Environment<'static>,
}

impl Templates {
    pub fn new() -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        for (name, source) in TEMPLATES {
            env.add_template(name, source)?;
        }
        env.add_filter("rand", |amount: i64| format!("R{amount}"));
        Ok(Self { env })
    }

    pub fn render(&self, name: &str, ctx: Value) -> PageResult<Html<String>> {
        let template = self.env.get_template(name)?;
        Ok(Html(template.render(ctx)?))
    }
}

/// Header data every page needs: who is logged in and pending flash messages.
#[derive(Debug, Default, Serialize)]
pub struct Page {
    pub username: Option<String>,
    pub is_staff: bool,
    pub flashes: Vec<FlashMessage>,
}

impl Page {
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Header for a logged-in user; drains their flash messages.
    pub async fn for_user(state: &AppState, user: &CurrentUser) -> PageResult<Self> {
        let flashes = state.sessions().take_flash(&user.token_hash).await?;
        Ok(Self {
            username: Some(user.user.username.clone()),
            is_staff: user.user.is_staff,
            flashes,
        })
    }

    pub async fn for_optional(state: &AppState, user: Option<&CurrentUser>) -> PageResult<Self> {
        match user {
            Some(user) => Self::for_user(state, user).await,
            None => Ok(Self::anonymous()),
        }
    }
}

/// Render `name` with `page` available to the layout.
pub fn render_page(state: &AppState, name: &str, page: Page, ctx: Value) -> PageResult<Html<String>> {
    state.templates.render(name, context! { page => page, ..ctx })
}
