// src/web/shell.rs
//! Peças comuns aos handlers: contexto do pedido, moldura da página,
//! renderização e redirecionamentos Post/Redirect/Get.
use crate::{
    error::{AppError, AppResult},
    services::{
        navigation::{self, Page},
        session_service::SessionContext,
        settings_service::HIGH_CONTRAST_COOKIE,
    },
    state::AppState,
    templates::{NavLink, SelectOption, Shell},
};
use askama::Template;
use axum::{
    extract::{FromRequestParts, Query},
    http::request::Parts,
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_cookies::Cookies;

/// Mensagens `?success=` / `?error=` deixadas pelo redirecionamento anterior.
#[derive(Debug, Default, Deserialize)]
pub struct Feedback {
    pub success: Option<String>,
    pub error: Option<String>,
}

/// Quem pede a página e com que preferências. Só existe atrás de `require_auth`.
pub struct Viewer {
    pub ctx: SessionContext,
    pub high_contrast: bool,
    pub feedback: Feedback,
}

impl FromRequestParts<AppState> for Viewer {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let ctx = parts
            .extensions
            .get::<SessionContext>()
            .cloned()
            .ok_or(AppError::Unauthorized)?;

        let high_contrast = match Cookies::from_request_parts(parts, state).await {
            Ok(cookies) => high_contrast_enabled(&cookies, state),
            Err((_, msg)) => {
                tracing::warn!("Cookies indisponíveis: {}", msg);
                false
            }
        };

        let feedback = Query::<Feedback>::from_request_parts(parts, state)
            .await
            .map(|Query(feedback)| feedback)
            .unwrap_or_default();

        Ok(Self {
            ctx,
            high_contrast,
            feedback,
        })
    }
}

impl Viewer {
    /// Monta a moldura da página: cabeçalho, navegação e notificações.
    pub async fn shell(self, state: &AppState, page: Page) -> AppResult<(Shell, SessionContext)> {
        let user = self.ctx.current_user()?;
        let role = self.ctx.active_role()?;
        let notifications = state.repo.list_notifications(&user.id).await?;
        let unread = notifications.iter().filter(|n| !n.read).count();

        let shell = Shell {
            title: page.label(),
            current_path: page.path(),
            user_name: user.name.clone(),
            initials: user.initials(),
            registration: user.registration.clone(),
            role_label: role.label(),
            roles: user
                .roles
                .iter()
                .map(|r| SelectOption::new(r.as_str(), r.label(), *r == role))
                .collect(),
            nav: navigation::visible_pages(role)
                .into_iter()
                .map(|p| NavLink {
                    path: p.path(),
                    label: p.label(),
                    active: p == page,
                })
                .collect(),
            mobile_nav: navigation::mobile_nav(role)
                .into_iter()
                .map(|item| NavLink {
                    path: item.path,
                    label: item.label,
                    active: item.id == page.id(),
                })
                .collect(),
            notifications,
            unread,
            high_contrast: self.high_contrast,
            success: self.feedback.success,
            error: self.feedback.error,
        };
        Ok((shell, self.ctx))
    }
}

pub fn high_contrast_enabled(cookies: &Cookies, state: &AppState) -> bool {
    cookies
        .signed(&state.cookie_key)
        .get(HIGH_CONTRAST_COOKIE)
        .is_some_and(|cookie| cookie.value() == "1")
}

pub fn render<T: Template>(template: &T) -> AppResult<Response> {
    match template.render() {
        Ok(html) => Ok(Html(html).into_response()),
        Err(e) => {
            tracing::error!("Falha ao renderizar template: {}", e);
            Err(AppError::InternalServerError)
        }
    }
}

/// Fecha um POST com redirecionamento: sucesso em `?success=`, erros que o
/// utilizador pode corrigir em `?error=`. Os restantes propagam-se.
pub fn back_to(path: &str, outcome: AppResult<String>) -> AppResult<Redirect> {
    match outcome {
        Ok(message) => Ok(Redirect::to(&with_message(path, "success", &message))),
        Err(e) if e.is_user_facing() => {
            tracing::warn!("Ação recusada em {}: {}", path, e);
            Ok(Redirect::to(&with_message(path, "error", &e.user_message())))
        }
        Err(e) => Err(e),
    }
}

fn with_message(path: &str, key: &str, message: &str) -> String {
    let separator = if path.contains('?') { '&' } else { '?' };
    format!("{}{}{}={}", path, separator, key, urlencoding::encode(message))
}

/// Destino interno de um campo `next`; qualquer outro valor volta ao painel.
/// Os browsers tratam `/\` como `//`, por isso a barra invertida também é recusada.
pub fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(path) if is_local_path(path) => path,
        _ => Page::Dashboard.path(),
    }
}

fn is_local_path(path: &str) -> bool {
    let mut chars = path.chars();
    chars.next() == Some('/')
        && chars.next() != Some('/')
        && !path.chars().any(|c| c.is_control() || c == '\\')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feedback_is_url_encoded() {
        assert_eq!(
            with_message("/users", "error", "E-mail já existe & outro"),
            "/users?error=E-mail%20j%C3%A1%20existe%20%26%20outro"
        );
        assert_eq!(with_message("/x?a=1", "success", "ok"), "/x?a=1&success=ok");
    }

    #[test]
    fn next_only_accepts_local_paths() {
        assert_eq!(safe_next(Some("/certificates")), "/certificates");
        assert_eq!(safe_next(Some("//evil.example")), "/dashboard");
        assert_eq!(safe_next(Some("https://evil.example")), "/dashboard");
        assert_eq!(safe_next(Some("/\\evil.example")), "/dashboard");
        assert_eq!(safe_next(Some("/\tevil.example")), "/dashboard");
        assert_eq!(safe_next(Some("/certificates\r\nSet-Cookie: x=1")), "/dashboard");
        assert_eq!(safe_next(Some("/opportunities?search=a%2Fb")), "/opportunities?search=a%2Fb");
        assert_eq!(safe_next(None), "/dashboard");
    }
}
