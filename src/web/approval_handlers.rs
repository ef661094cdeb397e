// src/web/approval_handlers.rs
use crate::{
    error::AppResult,
    models::{
        approval::{CertificateMetadata, NewApprovalRequest, ReviewDecision},
        user::Role,
    },
    services::{
        approval_service::{self, RequestStats, REVIEWER_ROLES},
        navigation::Page,
        session_service::SessionContext,
    },
    state::AppState,
    templates::{ApprovalRequestsPage, RequestRow},
    web::shell::{back_to, render, Viewer},
};
use axum::{
    extract::{Extension, Form, Path, State},
    response::{Redirect, Response},
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;

const REQUESTS_PATH: &str = "/approval-requests";

// GET /approval-requests
pub async fn approval_requests_page(State(state): State<AppState>, viewer: Viewer) -> AppResult<Response> {
    let (shell, ctx) = viewer.shell(&state, Page::ApprovalRequests).await?;
    let role = ctx.active_role()?;

    let mut requests = approval_service::list_visible(state.repo.as_ref(), &ctx).await?;
    requests.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
    let stats = RequestStats::from_requests(&requests);

    let today = Utc::now().date_naive();
    let rows = requests
        .into_iter()
        .map(|request| RequestRow {
            open: request.status.is_open(),
            overdue: request.is_deadline_passed(today),
            request,
        })
        .collect();

    render(&ApprovalRequestsPage {
        shell,
        rows,
        stats,
        can_submit: role == Role::Discente,
        can_review: REVIEWER_ROLES.contains(&role),
    })
}

#[derive(Deserialize, Debug)]
pub struct SubmitRequestForm {
    description: String,
    requested_hours: u32,
    certificate_title: String,
    issuer: String,
    certificate_date: NaiveDate,
    #[serde(default)]
    certificate_file: String,
}

// POST /approval-requests
pub async fn handle_submit_request(
    State(state): State<AppState>,
    Extension(ctx): Extension<SessionContext>,
    Form(form): Form<SubmitRequestForm>,
) -> AppResult<Redirect> {
    let new = NewApprovalRequest {
        description: form.description,
        requested_hours: form.requested_hours,
        certificate_file: form.certificate_file,
        certificate_metadata: CertificateMetadata {
            issuer: form.issuer.trim().to_string(),
            date: form.certificate_date,
            title: form.certificate_title.trim().to_string(),
        },
    };
    let outcome = approval_service::submit(state.repo.as_ref(), &ctx, new)
        .await
        .map(|r| format!("Solicitação de {}h enviada para análise.", r.requested_hours));
    back_to(REQUESTS_PATH, outcome)
}

#[derive(Deserialize, Debug)]
pub struct ReviewForm {
    decision: ReviewDecision,
    #[serde(default)]
    feedback: String,
    version: i64,
}

// POST /approval-requests/{id}/review
pub async fn handle_review(
    State(state): State<AppState>,
    Extension(ctx): Extension<SessionContext>,
    Path(id): Path<String>,
    Form(form): Form<ReviewForm>,
) -> AppResult<Redirect> {
    let notify = state.notifications_enabled().await;
    let outcome = approval_service::review(
        state.repo.as_ref(),
        &ctx,
        notify,
        &id,
        form.version,
        form.decision,
        &form.feedback,
    )
    .await
    .map(|r| format!("Solicitação de {} {}.", r.user_name, r.status.label().to_lowercase()));
    back_to(REQUESTS_PATH, outcome)
}
