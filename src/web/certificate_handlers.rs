// src/web/certificate_handlers.rs
use crate::{
    error::AppResult,
    models::user::Role,
    services::{
        certificate_service::{self, CertificateStats, ValidationOutcome},
        navigation::Page,
        session_service::SessionContext,
    },
    state::AppState,
    templates::{CertificatesPage, ValidateCertificatePage},
    web::shell::{back_to, render, Viewer},
};
use axum::{
    extract::{Extension, Form, Query, State},
    response::{Redirect, Response},
};
use serde::Deserialize;

#[derive(Deserialize, Debug, Default)]
pub struct SearchQuery {
    #[serde(default)]
    search: String,
}

// GET /certificates
pub async fn certificates_page(
    State(state): State<AppState>,
    viewer: Viewer,
    Query(query): Query<SearchQuery>,
) -> AppResult<Response> {
    let (shell, ctx) = viewer.shell(&state, Page::Certificates).await?;
    let role = ctx.active_role()?;

    let mut certificates = certificate_service::list_visible(state.repo.as_ref(), &ctx, &query.search).await?;
    certificates.sort_by(|a, b| b.issue_date.cmp(&a.issue_date));
    let stats = CertificateStats::from_certificates(&certificates);

    render(&CertificatesPage {
        shell,
        latest_issue: stats
            .latest_issue
            .map(|d| d.format("%d/%m/%Y").to_string())
            .unwrap_or_else(|| "-".to_string()),
        stats,
        certificates,
        search: query.search,
        show_holder: role != Role::Discente,
    })
}

#[derive(Deserialize, Debug)]
pub struct IssueForm {
    opportunity_id: String,
    participant_id: String,
}

// POST /certificates/issue
pub async fn handle_issue(
    State(state): State<AppState>,
    Extension(ctx): Extension<SessionContext>,
    Form(form): Form<IssueForm>,
) -> AppResult<Redirect> {
    let notify = state.notifications_enabled().await;
    let outcome = certificate_service::issue(
        state.repo.as_ref(),
        &ctx,
        notify,
        &form.opportunity_id,
        &form.participant_id,
    )
    .await
    .map(|c| format!("Certificado {} emitido para {}.", c.code, c.user_name));
    back_to(&format!("/opportunities/{}", form.opportunity_id), outcome)
}

#[derive(Deserialize, Debug, Default)]
pub struct CodeForm {
    #[serde(default)]
    code: Option<String>,
}

// GET /validate-certificate (o QR do certificado aponta para aqui com ?code=)
pub async fn show_validate_certificate(
    State(state): State<AppState>,
    Query(query): Query<CodeForm>,
) -> AppResult<Response> {
    match query.code {
        Some(code) => validate_and_render(&state, code).await,
        None => render(&ValidateCertificatePage {
            code: String::new(),
            checked: false,
            valid: false,
            message: String::new(),
            certificate: None,
        }),
    }
}

// POST /validate-certificate
pub async fn handle_validate_certificate(
    State(state): State<AppState>,
    Form(form): Form<CodeForm>,
) -> AppResult<Response> {
    validate_and_render(&state, form.code.unwrap_or_default()).await
}

async fn validate_and_render(state: &AppState, code: String) -> AppResult<Response> {
    let outcome = certificate_service::validate(state.repo.as_ref(), &code).await?;
    let message = outcome.message();
    let valid = outcome.is_valid();
    let certificate = match outcome {
        ValidationOutcome::Valid(certificate) => Some(certificate),
        ValidationOutcome::Empty | ValidationOutcome::Invalid => None,
    };
    render(&ValidateCertificatePage {
        code: code.trim().to_string(),
        checked: true,
        valid,
        message,
        certificate,
    })
}
