// src/services/certificate_service.rs
use crate::{
    error::{AppError, AppResult},
    models::{
        certificate::Certificate,
        metrics::total_hours,
        notification::{Notification, NotificationKind},
        opportunity::OpportunityStatus,
        user::Role,
    },
    repository::PortalRepository,
    services::{navigation::filter_owned, session_service::SessionContext},
};
use chrono::{NaiveDate, Utc};

pub const ISSUER_ROLES: &[Role] = &[Role::Coordenador, Role::Secretaria];

pub const EMPTY_CODE_MESSAGE: &str = "Por favor, insira o código do certificado.";
pub const INVALID_CODE_MESSAGE: &str = "Código inválido. Verifique o código e tente novamente.";

/// Resultado da validação pública de um código.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationOutcome {
    Empty,
    Valid(Certificate),
    Invalid,
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationOutcome::Valid(_))
    }

    pub fn message(&self) -> String {
        match self {
            ValidationOutcome::Empty => EMPTY_CODE_MESSAGE.to_string(),
            ValidationOutcome::Invalid => INVALID_CODE_MESSAGE.to_string(),
            ValidationOutcome::Valid(certificate) => format!(
                "Certificado válido! Emitido para {} referente a \"{}\" com carga horária de {}h.",
                certificate.user_name, certificate.opportunity_title, certificate.workload
            ),
        }
    }
}

pub async fn validate(repo: &dyn PortalRepository, code: &str) -> AppResult<ValidationOutcome> {
    let code = Certificate::normalize_code(code);
    if code.is_empty() {
        return Ok(ValidationOutcome::Empty);
    }
    let outcome = match repo.find_certificate_by_code(&code).await? {
        Some(certificate) => ValidationOutcome::Valid(certificate),
        None => ValidationOutcome::Invalid,
    };
    tracing::info!("Validação do certificado '{}': {}", code, outcome.is_valid());
    Ok(outcome)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CertificateStats {
    pub count: usize,
    pub total_workload: u32,
    pub latest_issue: Option<NaiveDate>,
}

impl CertificateStats {
    pub fn from_certificates(certificates: &[Certificate]) -> Self {
        Self {
            count: certificates.len(),
            total_workload: total_hours(certificates.iter().map(|c| c.workload)),
            latest_issue: certificates.iter().map(|c| c.issue_date).max(),
        }
    }
}

/// Certificados visíveis ao perfil ativo, filtrados pelo termo de pesquisa.
pub async fn list_visible(
    repo: &dyn PortalRepository,
    ctx: &SessionContext,
    search: &str,
) -> AppResult<Vec<Certificate>> {
    let certificates = filter_owned(repo.list_certificates().await?, ctx);
    Ok(certificates
        .into_iter()
        .filter(|certificate| certificate.matches_search(search))
        .collect())
}

/// Emite o certificado de um participante numa oportunidade encerrada.
pub async fn issue(
    repo: &dyn PortalRepository,
    ctx: &SessionContext,
    notify: bool,
    opportunity_id: &str,
    participant_id: &str,
) -> AppResult<Certificate> {
    ctx.require_role(ISSUER_ROLES)?;
    let opportunity = repo
        .find_opportunity(opportunity_id)
        .await?
        .ok_or(AppError::NotFound("oportunidade"))?;
    if opportunity.status != OpportunityStatus::Encerrada {
        return Err(AppError::Validation(
            "Só é possível emitir certificados de oportunidades encerradas.".to_string(),
        ));
    }
    let participant = opportunity
        .participant(participant_id)
        .ok_or(AppError::NotFound("participante"))?;
    if !participant.status.is_valid() {
        return Err(AppError::Validation(format!(
            "A participação de {} está {}.",
            participant.user_name,
            participant.status.label().to_lowercase()
        )));
    }
    let already_issued = repo.list_certificates().await?.into_iter().any(|c| {
        c.user_id == participant.user_id && c.opportunity_id.as_deref() == Some(opportunity_id)
    });
    if already_issued {
        return Err(AppError::Conflict(format!(
            "{} já tem certificado desta oportunidade.",
            participant.user_name
        )));
    }

    let code = Certificate::generate_code();
    let certificate = Certificate {
        id: uuid::Uuid::new_v4().to_string(),
        qr_code: Certificate::qr_path(&code),
        code,
        user_id: participant.user_id.clone(),
        user_name: participant.user_name.clone(),
        opportunity_id: Some(opportunity.id.clone()),
        opportunity_title: opportunity.title.clone(),
        workload: opportunity.workload,
        issue_date: Utc::now().date_naive(),
    };
    let issued = repo.issue_certificate(certificate).await?;
    tracing::info!("🎓 Certificado {} emitido para '{}'.", issued.code, issued.user_id);

    if notify {
        repo.push_notifications(vec![Notification::new(
            &issued.user_id,
            NotificationKind::Success,
            "Certificado disponível",
            format!(
                "O seu certificado de \"{}\" ({}h) já pode ser consultado. Código: {}",
                issued.opportunity_title, issued.workload, issued.code
            ),
            Some("/certificates"),
        )])
        .await?;
    }
    Ok(issued)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{fixtures, repository::InMemoryRepository};

    fn ctx(user_index: usize, role: Role) -> SessionContext {
        SessionContext::for_tests(fixtures::users().remove(user_index), role)
    }

    #[tokio::test]
    async fn demo_code_is_valid_regardless_of_case_and_spaces() {
        let repo = InMemoryRepository::seeded();
        for input in ["VALIDO123", "  valido123 "] {
            let outcome = validate(&repo, input).await.unwrap();
            let ValidationOutcome::Valid(certificate) = &outcome else {
                panic!("esperado válido para {:?}", input);
            };
            assert_eq!(certificate.user_name, "João Silva");
            assert_eq!(certificate.workload, 40);
            assert!(outcome.message().contains("React.js"));
        }
    }

    #[tokio::test]
    async fn empty_and_unknown_codes() {
        let repo = InMemoryRepository::seeded();
        let empty = validate(&repo, "   ").await.unwrap();
        assert_eq!(empty, ValidationOutcome::Empty);
        assert_eq!(empty.message(), EMPTY_CODE_MESSAGE);

        let invalid = validate(&repo, "NAOEXISTE").await.unwrap();
        assert_eq!(invalid, ValidationOutcome::Invalid);
        assert_eq!(invalid.message(), INVALID_CODE_MESSAGE);
    }

    #[tokio::test]
    async fn duplicate_or_unfinished_issue_is_rejected() {
        let repo = InMemoryRepository::seeded();
        let secretary = ctx(3, Role::Secretaria);
        // João já tem o VALIDO123 da oportunidade 6
        let opportunity = repo.find_opportunity("6").await.unwrap().unwrap();
        let err = issue(&repo, &secretary, true, "6", "1").await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert!(opportunity.participant("1").is_some());

        let err = issue(&repo, &secretary, true, "1", "1").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn issue_for_a_closed_opportunity() {
        let repo = InMemoryRepository::seeded();
        let coordinator = ctx(2, Role::Coordenador);
        let running = repo.find_opportunity("2").await.unwrap().unwrap();
        let closed = repo
            .update_opportunity_status("2", running.version, OpportunityStatus::Encerrada)
            .await
            .unwrap();
        let holder = closed.participants[0].user_id.clone();

        let certificate = issue(&repo, &coordinator, true, "2", &holder).await.unwrap();
        assert!(certificate.code.starts_with("EXT-"));
        assert_eq!(certificate.workload, closed.workload);
        assert!(validate(&repo, &certificate.code.to_lowercase()).await.unwrap().is_valid());
    }

    #[tokio::test]
    async fn student_lists_only_own_certificates() {
        let repo = InMemoryRepository::seeded();
        let own = list_visible(&repo, &ctx(0, Role::Discente), "").await.unwrap();
        assert!(!own.is_empty());
        assert!(own.iter().all(|c| c.user_id == "1"));

        let searched = list_visible(&repo, &ctx(2, Role::Coordenador), "react").await.unwrap();
        assert!(searched.iter().all(|c| c.opportunity_title.to_lowercase().contains("react")));

        let stats = CertificateStats::from_certificates(&own);
        assert_eq!(stats.count, own.len());
        assert!(stats.latest_issue.is_some());
    }
}
