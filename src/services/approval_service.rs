// src/services/approval_service.rs
use crate::{
    error::{AppError, AppResult},
    models::{
        approval::{ApprovalRequest, NewApprovalRequest, RequestStatus, Review, ReviewDecision},
        notification::{Notification, NotificationKind},
        user::Role,
    },
    repository::PortalRepository,
    services::{navigation::filter_owned, session_service::SessionContext},
};
use chrono::Utc;

pub const REVIEWER_ROLES: &[Role] = &[Role::Coordenador, Role::Secretaria];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestStats {
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
}

impl RequestStats {
    pub fn from_requests(requests: &[ApprovalRequest]) -> Self {
        requests.iter().fold(Self::default(), |mut stats, request| {
            match request.status {
                RequestStatus::Pendente | RequestStatus::EmAnalise => stats.pending += 1,
                RequestStatus::Aprovado => stats.approved += 1,
                RequestStatus::Indeferido => stats.rejected += 1,
            }
            stats
        })
    }
}

/// Solicitações visíveis ao perfil ativo (o discente só vê as suas).
pub async fn list_visible(repo: &dyn PortalRepository, ctx: &SessionContext) -> AppResult<Vec<ApprovalRequest>> {
    let requests = repo.list_approval_requests().await?;
    Ok(filter_owned(requests, ctx))
}

pub async fn submit(
    repo: &dyn PortalRepository,
    ctx: &SessionContext,
    new: NewApprovalRequest,
) -> AppResult<ApprovalRequest> {
    ctx.require_role(&[Role::Discente])?;
    let user = ctx.current_user()?;
    new.validate()?;

    let request = repo
        .submit_approval_request(new.into_request(user, Utc::now()))
        .await?;
    tracing::info!(
        "Solicitação '{}' enviada por '{}' ({}h)",
        request.id,
        user.id,
        request.requested_hours
    );
    Ok(request)
}

/// Decide uma solicitação pendente. O indeferimento exige justificação.
/// Se `notify` estiver ativo, o solicitante recebe uma notificação.
pub async fn review(
    repo: &dyn PortalRepository,
    ctx: &SessionContext,
    notify: bool,
    id: &str,
    expected_version: i64,
    decision: ReviewDecision,
    feedback: &str,
) -> AppResult<ApprovalRequest> {
    ctx.require_role(REVIEWER_ROLES)?;
    let reviewer = ctx.current_user()?;
    if decision == ReviewDecision::Indeferido && feedback.trim().is_empty() {
        return Err(AppError::Validation(
            "Informe o motivo do indeferimento.".to_string(),
        ));
    }

    let review = Review {
        decision,
        reviewer_id: reviewer.id.clone(),
        reviewer_name: reviewer.name.clone(),
        feedback: feedback.to_string(),
        reviewed_at: Utc::now(),
    };
    let reviewed = repo.review_approval_request(id, expected_version, &review).await?;
    tracing::info!(
        "Solicitação '{}' {} por '{}'",
        id,
        reviewed.status.as_str(),
        reviewer.id
    );

    if notify {
        let (kind, title) = match decision {
            ReviewDecision::Aprovado => (NotificationKind::Success, "Solicitação aprovada"),
            ReviewDecision::Indeferido => (NotificationKind::Error, "Solicitação indeferida"),
        };
        let message = match &reviewed.feedback {
            Some(feedback) => format!(
                "{} ({}h): {}",
                reviewed.certificate_metadata.title, reviewed.requested_hours, feedback
            ),
            None => format!(
                "{} ({}h)",
                reviewed.certificate_metadata.title, reviewed.requested_hours
            ),
        };
        repo.push_notifications(vec![Notification::new(
            &reviewed.user_id,
            kind,
            title,
            message,
            Some("/approval-requests"),
        )])
        .await?;
    }
    Ok(reviewed)
}
