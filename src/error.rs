// src/error.rs
use crate::templates::ErrorPage;
use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Redirect},
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Erro na base de dados: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Erro de migração da base de dados: {0}")]
    SqlxMigrateError(#[from] sqlx::migrate::MigrateError),

    #[error("Erro de variável de ambiente: {0}")]
    EnvVarError(#[from] std::env::VarError),

    #[error("Erro de serialização: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Erro na sessão: {0}")]
    SessionError(String),

    /// Dados de formulário inválidos; a mensagem é mostrada ao utilizador.
    #[error("{0}")]
    Validation(String),

    #[error("Registo não encontrado: {0}")]
    NotFound(&'static str),

    /// Escrita concorrente ou transição já realizada (token de versão desatualizado).
    #[error("{0}")]
    Conflict(String),

    #[error("Acesso negado")]
    Forbidden,

    #[error("Não autenticado")]
    Unauthorized,

    #[error("Erro interno inesperado")]
    InternalServerError,
}

impl AppError {
    /// Mensagem segura para exibir em formulários (padrão Post/Redirect/Get).
    pub fn user_message(&self) -> String {
        match self {
            AppError::Validation(msg) | AppError::Conflict(msg) => msg.clone(),
            AppError::NotFound(what) => format!("Não encontrado: {}.", what),
            AppError::Forbidden => "O seu perfil não tem permissão para esta ação.".to_string(),
            AppError::Unauthorized => "Inicie sessão para continuar.".to_string(),
            _ => "Ocorreu um erro inesperado. Tente novamente.".to_string(),
        }
    }

    /// Erros que o utilizador pode corrigir e que voltam ao formulário.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            AppError::Validation(_) | AppError::Conflict(_) | AppError::NotFound(_) | AppError::Forbidden
        )
    }
}

// Como converter AppError numa resposta HTTP
impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, user_message) = match &self {
            AppError::SqlxError(_) | AppError::SqlxMigrateError(_) => {
                tracing::error!("Erro processado: {:?}", self);
                (StatusCode::INTERNAL_SERVER_ERROR, "Erro ao aceder aos dados.".to_string())
            }
            AppError::EnvVarError(_) => {
                tracing::error!("Erro processado: {:?}", self);
                (StatusCode::INTERNAL_SERVER_ERROR, "Erro de configuração.".to_string())
            }
            AppError::SessionError(_) => {
                tracing::error!("Erro processado: {:?}", self);
                (StatusCode::INTERNAL_SERVER_ERROR, "Erro na gestão da sua sessão.".to_string())
            }
            AppError::Unauthorized => {
                tracing::debug!("Pedido não autenticado, redirecionando para /login");
                return Redirect::to("/login").into_response();
            }
            AppError::Validation(_) => {
                tracing::warn!("Erro processado: {:?}", self);
                (StatusCode::BAD_REQUEST, self.user_message())
            }
            AppError::NotFound(_) => {
                tracing::warn!("Erro processado: {:?}", self);
                (StatusCode::NOT_FOUND, self.user_message())
            }
            AppError::Conflict(_) => {
                tracing::warn!("Erro processado: {:?}", self);
                (StatusCode::CONFLICT, self.user_message())
            }
            AppError::Forbidden => {
                tracing::warn!("Erro processado: {:?}", self);
                (StatusCode::FORBIDDEN, self.user_message())
            }
            _ => {
                tracing::error!("Erro processado: {:?}", self);
                (StatusCode::INTERNAL_SERVER_ERROR, "Ocorreu um erro inesperado.".to_string())
            }
        };

        let page = ErrorPage {
            status_code: status.as_u16(),
            message: user_message,
        };
        match page.render() {
            Ok(html) => (status, Html(html)).into_response(),
            Err(e) => {
                tracing::error!("Falha ao renderizar página de erro: {}", e);
                (status, page.message).into_response()
            }
        }
    }
}

// Tipo Result padrão para a aplicação
pub type AppResult<T = ()> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_of(error: AppError) -> (StatusCode, String) {
        let resp = error.into_response();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn conflict_maps_to_409_with_message() {
        let (status, body) = body_of(AppError::Conflict("Já analisada.".into())).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body.contains("Já analisada."));
    }

    #[tokio::test]
    async fn forbidden_maps_to_403() {
        let (status, _) = body_of(AppError::Forbidden).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn validation_message_is_escaped() {
        let (status, body) = body_of(AppError::Validation("<b>x</b>".into())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!body.contains("<b>x</b>"));
        assert!(body.contains("Erro 400"));
    }

    #[tokio::test]
    async fn unauthorized_redirects_to_login() {
        let resp = AppError::Unauthorized.into_response();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(resp.headers()["location"], "/login");
    }

    #[test]
    fn internal_errors_do_not_leak_details() {
        let err = AppError::SessionError("tabela sessions em falta".into());
        assert!(!err.is_user_facing());
        assert!(!err.user_message().contains("sessions"));
    }
}
