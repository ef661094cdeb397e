// src/web/mw_page.rs
use crate::{
    error::AppError,
    services::{navigation::Page, session_service::SessionContext},
};
use axum::{
    extract::{Extension, Request, State},
    middleware::Next,
    response::Response,
};

/// Barra as rotas de uma página aos perfis que não a veem na navegação.
/// Corre depois de `require_auth`.
pub async fn require_page(
    State(page): State<Page>,
    Extension(ctx): Extension<SessionContext>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if ctx.can_view(page) {
        Ok(next.run(request).await)
    } else {
        tracing::warn!(
            "Página MW: perfil {:?} sem acesso a '{}'",
            ctx.role().map(|r| r.as_str()),
            page.id()
        );
        Err(AppError::Forbidden)
    }
}
