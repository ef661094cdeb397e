// src/web/auth_handlers.rs
use crate::{
    error::{AppError, AppResult},
    models::user::{LoginForm, Role},
    services::{
        session_service::{self, SessionContext},
        user_service::{self, PendingSignup, INSTITUTIONAL_DOMAIN},
    },
    state::AppState,
    templates::{ForgotPasswordPage, LoginPage, SignupPage, SignupVerifyPage},
    web::shell::{back_to, render, Feedback},
};
use axum::{
    extract::{Extension, Form, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;

pub const LOGIN_ERROR: &str = "E-mail ou senha incorretos. Verifique seus dados e tente novamente.";
/// Dados do cadastro entre o primeiro passo e a verificação do código.
const PENDING_SIGNUP_KEY: &str = "pendingSignup";

// GET /login
pub async fn show_login_form(session: Session, Query(feedback): Query<Feedback>) -> AppResult<Response> {
    if session_service::rehydrate(&session).await?.is_authenticated() {
        tracing::debug!("GET /login: Utilizador já logado, redirecionando para /dashboard");
        return Ok(Redirect::to("/dashboard").into_response());
    }
    render(&LoginPage {
        email: String::new(),
        error: feedback.error,
        success: feedback.success,
    })
}

// POST /login
pub async fn handle_login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> AppResult<Response> {
    tracing::info!("Tentativa de login para: {}", form.email.trim());

    let mut ctx = SessionContext::default();
    let ok = session_service::login(state.repo.as_ref(), &session, &mut ctx, &form.email, &form.password).await?;
    if ok {
        return Ok(Redirect::to("/dashboard").into_response());
    }
    // E-mail desconhecido e senha errada dão a mesma resposta
    render(&LoginPage {
        email: form.email,
        error: Some(LOGIN_ERROR.to_string()),
        success: None,
    })
}

// GET /logout
pub async fn handle_logout(session: Session) -> AppResult<Redirect> {
    let mut ctx = session_service::rehydrate(&session).await?;
    session_service::logout(&session, &mut ctx).await?;
    Ok(Redirect::to("/login"))
}

#[derive(Deserialize, Debug)]
pub struct RoleForm {
    role: String,
}

// POST /session/role
pub async fn handle_switch_role(
    session: Session,
    Extension(mut ctx): Extension<SessionContext>,
    Form(form): Form<RoleForm>,
) -> AppResult<Redirect> {
    // Um valor desconhecido é tratado como perfil que o utilizador não tem
    let Ok(role) = form.role.parse::<Role>() else {
        tracing::warn!("Troca de perfil com valor desconhecido: '{}'", form.role);
        return Ok(Redirect::to("/dashboard"));
    };
    if session_service::switch_role(&session, &mut ctx, role).await? {
        back_to("/dashboard", Ok(format!("Perfil ativo: {}.", role.label())))
    } else {
        Ok(Redirect::to("/dashboard"))
    }
}

// --- Cadastro ---

#[derive(Deserialize, Debug)]
pub struct SignupForm {
    name: String,
    registration: String,
    email: String,
}

#[derive(Deserialize, Debug)]
pub struct VerifyForm {
    code: String,
}

// GET /signup
pub async fn show_signup_form() -> AppResult<Response> {
    render(&SignupPage {
        name: String::new(),
        registration: String::new(),
        email: String::new(),
        domain: INSTITUTIONAL_DOMAIN,
        error: None,
    })
}

// POST /signup
pub async fn handle_signup(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<SignupForm>,
) -> AppResult<Response> {
    match user_service::start_signup(state.repo.as_ref(), &form.name, &form.registration, &form.email).await {
        Ok(pending) => {
            session
                .insert(PENDING_SIGNUP_KEY, &pending)
                .await
                .map_err(|e| AppError::SessionError(format!("Falha ao guardar cadastro: {}", e)))?;
            Ok(Redirect::to("/signup/verify").into_response())
        }
        Err(e) if e.is_user_facing() => render(&SignupPage {
            name: form.name,
            registration: form.registration,
            email: form.email,
            domain: INSTITUTIONAL_DOMAIN,
            error: Some(e.user_message()),
        }),
        Err(e) => Err(e),
    }
}

async fn pending_signup(session: &Session) -> AppResult<Option<PendingSignup>> {
    session
        .get::<PendingSignup>(PENDING_SIGNUP_KEY)
        .await
        .map_err(|e| AppError::SessionError(format!("Falha ao ler cadastro: {}", e)))
}

// GET /signup/verify
pub async fn show_verify_form(session: Session) -> AppResult<Response> {
    match pending_signup(&session).await? {
        Some(pending) => render(&SignupVerifyPage {
            email: pending.email,
            error: None,
        }),
        None => Ok(Redirect::to("/signup").into_response()),
    }
}

// POST /signup/verify
pub async fn handle_verify(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<VerifyForm>,
) -> AppResult<Response> {
    let Some(pending) = pending_signup(&session).await? else {
        return Ok(Redirect::to("/signup").into_response());
    };
    let email = pending.email.clone();

    match user_service::complete_signup(state.repo.as_ref(), pending, &form.code).await {
        Ok(user) => {
            session
                .remove::<PendingSignup>(PENDING_SIGNUP_KEY)
                .await
                .map_err(|e| AppError::SessionError(format!("Falha ao limpar cadastro: {}", e)))?;
            let message = format!("Cadastro concluído! Entre com {}.", user.email);
            Ok(back_to("/login", Ok(message))?.into_response())
        }
        Err(e) if e.is_user_facing() => render(&SignupVerifyPage {
            email,
            error: Some(e.user_message()),
        }),
        Err(e) => Err(e),
    }
}

// --- Recuperação de senha ---

#[derive(Deserialize, Debug)]
pub struct ForgotPasswordForm {
    email: String,
}

// GET /forgot-password
pub async fn show_forgot_password() -> AppResult<Response> {
    render(&ForgotPasswordPage {
        email: String::new(),
        sent: false,
        error: None,
    })
}

// POST /forgot-password
pub async fn handle_forgot_password(
    State(state): State<AppState>,
    Form(form): Form<ForgotPasswordForm>,
) -> AppResult<Response> {
    let outcome = user_service::request_password_reset(state.repo.as_ref(), &form.email).await;
    match outcome {
        Ok(()) => render(&ForgotPasswordPage {
            email: form.email.trim().to_string(),
            sent: true,
            error: None,
        }),
        Err(e) if e.is_user_facing() => render(&ForgotPasswordPage {
            email: form.email,
            sent: false,
            error: Some(e.user_message()),
        }),
        Err(e) => Err(e),
    }
}
