// src/models/approval.rs
use crate::{
    error::AppError,
    models::{user::User, MAX_HOURS},
};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Prazo de análise contado a partir do envio.
pub const REVIEW_DEADLINE_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pendente,
    EmAnalise,
    Aprovado,
    Indeferido,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pendente => "pendente",
            RequestStatus::EmAnalise => "em_analise",
            RequestStatus::Aprovado => "aprovado",
            RequestStatus::Indeferido => "indeferido",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RequestStatus::Pendente => "Pendente",
            RequestStatus::EmAnalise => "Em análise",
            RequestStatus::Aprovado => "Aprovado",
            RequestStatus::Indeferido => "Indeferido",
        }
    }

    /// Ainda aguarda decisão de um revisor.
    pub fn is_open(&self) -> bool {
        matches!(self, RequestStatus::Pendente | RequestStatus::EmAnalise)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for RequestStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pendente" => Ok(RequestStatus::Pendente),
            "em_analise" => Ok(RequestStatus::EmAnalise),
            "aprovado" => Ok(RequestStatus::Aprovado),
            "indeferido" => Ok(RequestStatus::Indeferido),
            other => Err(AppError::Validation(format!(
                "Estado de solicitação desconhecido: '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertificateMetadata {
    pub issuer: String,
    pub date: NaiveDate,
    pub title: String,
}

/// Solicitação de aproveitamento de horas externas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub id: String,
    pub user_id: String,
    pub user_name: String,
    pub user_email: String,
    pub description: String,
    pub requested_hours: u32,
    pub certificate_file: String,
    pub certificate_metadata: CertificateMetadata,
    pub status: RequestStatus,
    pub submitted_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<String>,
    pub reviewer_name: Option<String>,
    pub feedback: Option<String>,
    pub deadline: Option<NaiveDate>,
    pub version: i64,
}

/// Decisão do revisor; só existem dois desfechos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewDecision {
    Aprovado,
    Indeferido,
}

impl ReviewDecision {
    pub fn status(&self) -> RequestStatus {
        match self {
            ReviewDecision::Aprovado => RequestStatus::Aprovado,
            ReviewDecision::Indeferido => RequestStatus::Indeferido,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Review {
    pub decision: ReviewDecision,
    pub reviewer_id: String,
    pub reviewer_name: String,
    pub feedback: String,
    pub reviewed_at: DateTime<Utc>,
}

impl ApprovalRequest {
    /// Transição única pendente/em análise -> aprovado/indeferido.
    pub fn apply_review(&mut self, review: &Review) -> Result<(), AppError> {
        if !self.status.is_open() {
            return Err(AppError::Conflict(format!(
                "Esta solicitação já foi analisada ({}).",
                self.status.label()
            )));
        }
        self.status = review.decision.status();
        self.reviewed_at = Some(review.reviewed_at);
        self.reviewed_by = Some(review.reviewer_id.clone());
        self.reviewer_name = Some(review.reviewer_name.clone());
        self.feedback = Some(review.feedback.trim().to_string()).filter(|f| !f.is_empty());
        self.version += 1;
        Ok(())
    }

    pub fn is_deadline_passed(&self, today: NaiveDate) -> bool {
        self.status.is_open() && self.deadline.is_some_and(|deadline| deadline < today)
    }
}

/// Dados do formulário de nova solicitação.
#[derive(Debug, Clone)]
pub struct NewApprovalRequest {
    pub description: String,
    pub requested_hours: u32,
    pub certificate_file: String,
    pub certificate_metadata: CertificateMetadata,
}

impl NewApprovalRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.description.trim().is_empty() {
            return Err(AppError::Validation("Descreva a atividade realizada.".to_string()));
        }
        if self.requested_hours == 0 {
            return Err(AppError::Validation(
                "Informe a quantidade de horas solicitadas.".to_string(),
            ));
        }
        if self.requested_hours > MAX_HOURS {
            return Err(AppError::Validation(format!(
                "O pedido não pode passar de {}h.",
                MAX_HOURS
            )));
        }
        if self.certificate_metadata.issuer.trim().is_empty()
            || self.certificate_metadata.title.trim().is_empty()
        {
            return Err(AppError::Validation(
                "Informe o emissor e o título do certificado.".to_string(),
            ));
        }
        Ok(())
    }

    /// Constrói o registo pendente em nome do solicitante.
    pub fn into_request(self, requester: &User, now: DateTime<Utc>) -> ApprovalRequest {
        ApprovalRequest {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: requester.id.clone(),
            user_name: requester.name.clone(),
            user_email: requester.email.clone(),
            description: self.description.trim().to_string(),
            requested_hours: self.requested_hours,
            certificate_file: self.certificate_file.trim().to_string(),
            certificate_metadata: self.certificate_metadata,
            status: RequestStatus::Pendente,
            submitted_at: now,
            reviewed_at: None,
            reviewed_by: None,
            reviewer_name: None,
            feedback: None,
            deadline: Some(now.date_naive() + Duration::days(REVIEW_DEADLINE_DAYS)),
            version: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    fn review(decision: ReviewDecision) -> Review {
        Review {
            decision,
            reviewer_id: "3".into(),
            reviewer_name: "Carlos Mendes".into(),
            feedback: "  Documentação completa.  ".into(),
            reviewed_at: Utc::now(),
        }
    }

    fn pending_request() -> ApprovalRequest {
        fixtures::approval_requests()
            .into_iter()
            .find(|r| r.status == RequestStatus::Pendente)
            .unwrap()
    }

    #[test]
    fn review_moves_pending_to_decision_once() {
        let mut request = pending_request();
        let version = request.version;
        request.apply_review(&review(ReviewDecision::Aprovado)).unwrap();
        assert_eq!(request.status, RequestStatus::Aprovado);
        assert_eq!(request.reviewed_by.as_deref(), Some("3"));
        assert_eq!(request.feedback.as_deref(), Some("Documentação completa."));
        assert_eq!(request.version, version + 1);

        let err = request.apply_review(&review(ReviewDecision::Indeferido)).unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(request.status, RequestStatus::Aprovado);
    }

    #[test]
    fn new_request_starts_pending_with_deadline() {
        let user = fixtures::users().remove(0);
        let now = Utc::now();
        let new = NewApprovalRequest {
            description: "Monitoria".into(),
            requested_hours: 12,
            certificate_file: "monitoria.pdf".into(),
            certificate_metadata: CertificateMetadata {
                issuer: "Instituto".into(),
                date: now.date_naive(),
                title: "Monitoria de Cálculo".into(),
            },
        };
        new.validate().unwrap();
        let request = new.into_request(&user, now);
        assert_eq!(request.status, RequestStatus::Pendente);
        assert_eq!(request.user_id, user.id);
        assert_eq!(
            request.deadline,
            Some(now.date_naive() + Duration::days(REVIEW_DEADLINE_DAYS))
        );
    }

    #[test]
    fn hours_outside_bounds_are_rejected() {
        let mut new = NewApprovalRequest {
            description: "Algo".into(),
            requested_hours: 0,
            certificate_file: String::new(),
            certificate_metadata: CertificateMetadata {
                issuer: "X".into(),
                date: Utc::now().date_naive(),
                title: "Y".into(),
            },
        };
        assert!(matches!(new.validate(), Err(AppError::Validation(_))));
        new.requested_hours = MAX_HOURS + 1;
        assert!(matches!(new.validate(), Err(AppError::Validation(_))));
        new.requested_hours = MAX_HOURS;
        assert!(new.validate().is_ok());
    }
}
