// src/web/dashboard_handlers.rs
use crate::{
    error::AppResult,
    services::{dashboard_service, navigation::Page, session_service::SessionContext, settings_service::HIGH_CONTRAST_COOKIE},
    state::AppState,
    templates::DashboardPage,
    web::shell::{back_to, render, safe_next, Viewer},
};
use axum::{
    extract::{Extension, Form, State},
    response::{Redirect, Response},
};
use serde::Deserialize;
use tower_cookies::{Cookie, Cookies};

// GET /dashboard
pub async fn dashboard_page(State(state): State<AppState>, viewer: Viewer) -> AppResult<Response> {
    let (shell, ctx) = viewer.shell(&state, Page::Dashboard).await?;
    let dashboard = dashboard_service::build(state.repo.as_ref(), &ctx).await?;
    render(&DashboardPage::new(shell, dashboard))
}

#[derive(Deserialize, Debug)]
pub struct NextForm {
    #[serde(default)]
    next: Option<String>,
}

// POST /notifications/read
pub async fn mark_notifications_read(
    State(state): State<AppState>,
    Extension(ctx): Extension<SessionContext>,
    Form(form): Form<NextForm>,
) -> AppResult<Redirect> {
    let user = ctx.current_user()?;
    let count = state.repo.mark_notifications_read(&user.id).await?;
    tracing::debug!("{} notificações de '{}' marcadas como lidas", count, user.id);
    back_to(
        safe_next(form.next.as_deref()),
        Ok(format!("{} notificações marcadas como lidas.", count)),
    )
}

#[derive(Deserialize, Debug)]
pub struct ContrastForm {
    #[serde(default)]
    next: Option<String>,
    #[serde(default)]
    high_contrast: Option<String>,
}

// POST /preferences/contrast
pub async fn set_high_contrast(
    State(state): State<AppState>,
    cookies: Cookies,
    Form(form): Form<ContrastForm>,
) -> Redirect {
    let signed = cookies.signed(&state.cookie_key);
    if form.high_contrast.is_some() {
        signed.add(
            Cookie::build((HIGH_CONTRAST_COOKIE, "1"))
                .path("/")
                .http_only(true)
                .max_age(time::Duration::days(365))
                .build(),
        );
    } else {
        signed.remove(Cookie::build(HIGH_CONTRAST_COOKIE).path("/").build());
    }
    tracing::debug!("Alto contraste: {}", form.high_contrast.is_some());
    Redirect::to(safe_next(form.next.as_deref()))
}
