// src/web/admin_handlers.rs
use crate::{
    error::{AppError, AppResult},
    models::user::{NewUser, Role},
    services::{navigation::Page, session_service::SessionContext, settings_service, user_service},
    state::AppState,
    templates::{SelectOption, SettingsPage, UserRow, UsersPage},
    web::shell::{back_to, render, Viewer},
};
use axum::{
    extract::{Extension, Form, Path, Query, State},
    response::{Redirect, Response},
};
use serde::Deserialize;

const USERS_PATH: &str = "/users";

/// Pares do formulário tal como chegam; os perfis vêm repetidos (`roles=...&roles=...`).
type FormFields = Vec<(String, String)>;

fn field<'a>(fields: &'a [(String, String)], name: &str) -> &'a str {
    fields
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.trim())
        .unwrap_or("")
}

fn roles_in(fields: &[(String, String)]) -> AppResult<Vec<Role>> {
    fields
        .iter()
        .filter(|(key, _)| key == "roles")
        .map(|(_, value)| value.parse())
        .collect()
}

fn optional_semester(raw: &str) -> AppResult<Option<u32>> {
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse()
        .map(Some)
        .map_err(|_| AppError::Validation(format!("Semestre inválido: '{}'", raw)))
}

#[derive(Deserialize, Debug, Default)]
pub struct UserSearch {
    #[serde(default)]
    search: String,
}

// GET /users
pub async fn users_page(
    State(state): State<AppState>,
    viewer: Viewer,
    Query(query): Query<UserSearch>,
) -> AppResult<Response> {
    let (shell, ctx) = viewer.shell(&state, Page::Users).await?;
    let me = ctx.current_user()?;
    let users = user_service::search_users(state.repo.as_ref(), &ctx, &query.search).await?;

    let rows = users
        .into_iter()
        .map(|user| UserRow {
            role_labels: user.roles.iter().map(|r| r.label()).collect::<Vec<_>>().join(", "),
            role_checks: Role::ALL
                .into_iter()
                .map(|r| SelectOption::new(r.as_str(), r.label(), user.has_role(r)))
                .collect(),
            is_self: user.id == me.id,
            user,
        })
        .collect();

    render(&UsersPage {
        shell,
        rows,
        search: query.search,
        role_options: Role::ALL
            .into_iter()
            .map(|r| SelectOption::new(r.as_str(), r.label(), false))
            .collect(),
    })
}

// POST /users
pub async fn handle_create_user(
    State(state): State<AppState>,
    Extension(ctx): Extension<SessionContext>,
    Form(fields): Form<FormFields>,
) -> AppResult<Redirect> {
    tracing::info!("POST /users: criando '{}'", field(&fields, "email"));
    let outcome = create_from_fields(&state, &ctx, &fields)
        .await
        .map(|name| format!("Usuário {} criado com sucesso.", name));
    back_to(USERS_PATH, outcome)
}

async fn create_from_fields(state: &AppState, ctx: &SessionContext, fields: &[(String, String)]) -> AppResult<String> {
    let course = field(fields, "course");
    let new_user = NewUser {
        name: field(fields, "name").to_string(),
        email: field(fields, "email").to_lowercase(),
        registration: field(fields, "registration").to_string(),
        roles: roles_in(fields)?,
        course: Some(course.to_string()).filter(|c| !c.is_empty()),
        semester: optional_semester(field(fields, "semester"))?,
    };
    let user = user_service::create_user(state.repo.as_ref(), ctx, new_user).await?;
    Ok(user.name)
}

// POST /users/{id}/roles
pub async fn handle_set_roles(
    State(state): State<AppState>,
    Extension(ctx): Extension<SessionContext>,
    Path(id): Path<String>,
    Form(fields): Form<FormFields>,
) -> AppResult<Redirect> {
    let outcome = match roles_in(&fields) {
        Ok(roles) => user_service::set_user_roles(state.repo.as_ref(), &ctx, &id, &roles)
            .await
            .map(|u| format!("Perfis de {} atualizados.", u.name)),
        Err(e) => Err(e),
    };
    back_to(USERS_PATH, outcome)
}

// POST /users/{id}/delete
pub async fn handle_delete_user(
    State(state): State<AppState>,
    Extension(ctx): Extension<SessionContext>,
    Path(id): Path<String>,
) -> AppResult<Redirect> {
    let outcome = user_service::delete_user(state.repo.as_ref(), &ctx, &id)
        .await
        .map(|()| "Usuário removido.".to_string());
    back_to(USERS_PATH, outcome)
}

// GET /settings
pub async fn settings_page(State(state): State<AppState>, viewer: Viewer) -> AppResult<Response> {
    let (shell, _) = viewer.shell(&state, Page::Settings).await?;
    render(&SettingsPage {
        shell,
        notifications_enabled: state.notifications_enabled().await,
    })
}

#[derive(Deserialize, Debug)]
pub struct SettingsForm {
    #[serde(default)]
    notifications_enabled: Option<String>,
}

// POST /settings
pub async fn handle_settings(
    State(state): State<AppState>,
    Extension(ctx): Extension<SessionContext>,
    Form(form): Form<SettingsForm>,
) -> AppResult<Redirect> {
    let enabled = form.notifications_enabled.is_some();
    let outcome = settings_service::set_notifications_enabled(&state.settings, &ctx, enabled)
        .await
        .map(|()| "Configurações salvas.".to_string());
    back_to(Page::Settings.path(), outcome)
}
