// src/web/mw_auth.rs
use crate::{error::AppError, services::session_service};
use axum::{
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

/// Reconstrói o `SessionContext` a partir da sessão e deixa-o nas extensões
/// do pedido. Sem utilizador autenticado, redireciona para /login.
pub async fn require_auth(
    session: Session,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let ctx = session_service::rehydrate(&session).await?;

    match ctx.user() {
        Some(user) => {
            tracing::debug!(
                "Autenticação MW: '{}' como {:?}. Prosseguindo...",
                user.id,
                ctx.role().map(|r| r.as_str())
            );
            request.extensions_mut().insert(ctx);
            Ok(next.run(request).await)
        }
        None => {
            tracing::debug!("Autenticação MW: Não autenticado. Redirecionando para /login");
            Ok(Redirect::to("/login").into_response())
        }
    }
}
