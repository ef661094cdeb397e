// src/repository/memory.rs
use crate::{
    error::{AppError, AppResult},
    fixtures,
    models::{
        approval::{ApprovalRequest, Review},
        certificate::Certificate,
        group::{Group, Ppc},
        notification::Notification,
        opportunity::{AttendanceRecord, Opportunity, OpportunityFilter, OpportunityStatus, Participant},
        user::{normalize_email, NewUser, Role, User},
    },
    repository::PortalRepository,
};
use async_trait::async_trait;
use tokio::sync::RwLock;

/// Todas as coleções do portal, guardadas juntas.
#[derive(Debug, Clone, Default)]
pub struct PortalData {
    pub users: Vec<User>,
    pub opportunities: Vec<Opportunity>,
    pub approval_requests: Vec<ApprovalRequest>,
    pub certificates: Vec<Certificate>,
    pub groups: Vec<Group>,
    pub ppcs: Vec<Ppc>,
    pub notifications: Vec<Notification>,
}

impl PortalData {
    /// Conjunto de demonstração.
    pub fn seeded() -> Self {
        Self {
            users: fixtures::users(),
            opportunities: fixtures::opportunities(),
            approval_requests: fixtures::approval_requests(),
            certificates: fixtures::certificates(),
            groups: fixtures::groups(),
            ppcs: fixtures::ppcs(),
            notifications: fixtures::notifications(),
        }
    }
}

/// Repositório em memória. Um único RwLock serializa os escritores, por isso
/// a verificação de versão e a mutação acontecem sem janelas intermédias.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    data: RwLock<PortalData>,
}

impl InMemoryRepository {
    pub fn new(data: PortalData) -> Self {
        Self {
            data: RwLock::new(data),
        }
    }

    pub fn seeded() -> Self {
        Self::new(PortalData::seeded())
    }
}

fn check_version(found: i64, expected: i64, what: &str) -> AppResult<()> {
    if found != expected {
        tracing::warn!(
            "Conflito de versão em {}: esperada {}, encontrada {}",
            what,
            expected,
            found
        );
        return Err(AppError::Conflict(format!(
            "Este registo ({}) foi alterado por outra pessoa. Recarregue a página e tente novamente.",
            what
        )));
    }
    Ok(())
}

#[async_trait]
impl PortalRepository for InMemoryRepository {
    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let email = normalize_email(email);
        let data = self.data.read().await;
        Ok(data.users.iter().find(|u| normalize_email(&u.email) == email).cloned())
    }

    async fn find_user_by_id(&self, id: &str) -> AppResult<Option<User>> {
        let data = self.data.read().await;
        Ok(data.users.iter().find(|u| u.id == id).cloned())
    }

    async fn list_users(&self) -> AppResult<Vec<User>> {
        Ok(self.data.read().await.users.clone())
    }

    async fn create_user(&self, new_user: NewUser) -> AppResult<User> {
        let mut data = self.data.write().await;
        let email = normalize_email(&new_user.email);
        if data.users.iter().any(|u| normalize_email(&u.email) == email) {
            return Err(AppError::Conflict(format!(
                "Já existe um utilizador com o e-mail {}.",
                email
            )));
        }
        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            name: new_user.name.trim().to_string(),
            email,
            registration: new_user.registration.trim().to_string(),
            roles: new_user.roles,
            course: new_user.course,
            semester: new_user.semester,
        };
        data.users.push(user.clone());
        Ok(user)
    }

    async fn set_user_roles(&self, user_id: &str, roles: &[Role]) -> AppResult<User> {
        let mut data = self.data.write().await;
        let user = data
            .users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or(AppError::NotFound("utilizador"))?;
        user.roles = roles.to_vec();
        Ok(user.clone())
    }

    async fn delete_user(&self, user_id: &str) -> AppResult<()> {
        let mut data = self.data.write().await;
        let before = data.users.len();
        data.users.retain(|u| u.id != user_id);
        if data.users.len() == before {
            return Err(AppError::NotFound("utilizador"));
        }
        Ok(())
    }

    async fn list_opportunities(&self, filter: &OpportunityFilter) -> AppResult<Vec<Opportunity>> {
        let data = self.data.read().await;
        Ok(data
            .opportunities
            .iter()
            .filter(|o| filter.matches(o))
            .cloned()
            .collect())
    }

    async fn find_opportunity(&self, id: &str) -> AppResult<Option<Opportunity>> {
        let data = self.data.read().await;
        Ok(data.opportunities.iter().find(|o| o.id == id).cloned())
    }

    async fn create_opportunity(&self, opportunity: Opportunity) -> AppResult<Opportunity> {
        let mut data = self.data.write().await;
        data.opportunities.push(opportunity.clone());
        Ok(opportunity)
    }

    async fn update_opportunity_status(
        &self,
        id: &str,
        expected_version: i64,
        next: OpportunityStatus,
    ) -> AppResult<Opportunity> {
        let mut data = self.data.write().await;
        let opportunity = data
            .opportunities
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or(AppError::NotFound("oportunidade"))?;
        check_version(opportunity.version, expected_version, "oportunidade")?;
        opportunity.status = next;
        opportunity.version += 1;
        Ok(opportunity.clone())
    }

    async fn enroll(
        &self,
        opportunity_id: &str,
        expected_version: i64,
        participant: Participant,
    ) -> AppResult<Opportunity> {
        let mut data = self.data.write().await;
        let opportunity = data
            .opportunities
            .iter_mut()
            .find(|o| o.id == opportunity_id)
            .ok_or(AppError::NotFound("oportunidade"))?;
        check_version(opportunity.version, expected_version, "oportunidade")?;
        opportunity.apply_enrollment(participant)?;
        Ok(opportunity.clone())
    }

    async fn record_attendance(
        &self,
        opportunity_id: &str,
        expected_version: i64,
        user_id: &str,
        record: AttendanceRecord,
    ) -> AppResult<Opportunity> {
        let mut data = self.data.write().await;
        let opportunity = data
            .opportunities
            .iter_mut()
            .find(|o| o.id == opportunity_id)
            .ok_or(AppError::NotFound("oportunidade"))?;
        check_version(opportunity.version, expected_version, "oportunidade")?;
        opportunity.apply_attendance(user_id, record)?;
        Ok(opportunity.clone())
    }

    async fn list_approval_requests(&self) -> AppResult<Vec<ApprovalRequest>> {
        Ok(self.data.read().await.approval_requests.clone())
    }

    async fn find_approval_request(&self, id: &str) -> AppResult<Option<ApprovalRequest>> {
        let data = self.data.read().await;
        Ok(data.approval_requests.iter().find(|r| r.id == id).cloned())
    }

    async fn submit_approval_request(&self, request: ApprovalRequest) -> AppResult<ApprovalRequest> {
        let mut data = self.data.write().await;
        data.approval_requests.push(request.clone());
        Ok(request)
    }

    async fn review_approval_request(
        &self,
        id: &str,
        expected_version: i64,
        review: &Review,
    ) -> AppResult<ApprovalRequest> {
        let mut data = self.data.write().await;
        let request = data
            .approval_requests
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(AppError::NotFound("solicitação"))?;
        check_version(request.version, expected_version, "solicitação")?;
        request.apply_review(review)?;
        Ok(request.clone())
    }

    async fn list_certificates(&self) -> AppResult<Vec<Certificate>> {
        Ok(self.data.read().await.certificates.clone())
    }

    async fn find_certificate_by_code(&self, code: &str) -> AppResult<Option<Certificate>> {
        let data = self.data.read().await;
        Ok(data
            .certificates
            .iter()
            .find(|c| c.code.eq_ignore_ascii_case(code))
            .cloned())
    }

    async fn issue_certificate(&self, certificate: Certificate) -> AppResult<Certificate> {
        let mut data = self.data.write().await;
        if data
            .certificates
            .iter()
            .any(|c| c.code.eq_ignore_ascii_case(&certificate.code))
        {
            return Err(AppError::Conflict("Código de certificado duplicado.".to_string()));
        }
        data.certificates.push(certificate.clone());
        Ok(certificate)
    }

    async fn list_groups(&self) -> AppResult<Vec<Group>> {
        Ok(self.data.read().await.groups.clone())
    }

    async fn list_ppcs(&self) -> AppResult<Vec<Ppc>> {
        Ok(self.data.read().await.ppcs.clone())
    }

    async fn list_notifications(&self, user_id: &str) -> AppResult<Vec<Notification>> {
        let data = self.data.read().await;
        let mut notifications: Vec<_> = data
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect();
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(notifications)
    }

    async fn push_notifications(&self, notifications: Vec<Notification>) -> AppResult<()> {
        self.data.write().await.notifications.extend(notifications);
        Ok(())
    }

    async fn mark_notifications_read(&self, user_id: &str) -> AppResult<usize> {
        let mut data = self.data.write().await;
        let mut changed = 0;
        for notification in data
            .notifications
            .iter_mut()
            .filter(|n| n.user_id == user_id && !n.read)
        {
            notification.read = true;
            changed += 1;
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::opportunity::EnrollmentStatus;
    use chrono::Utc;
    use std::sync::Arc;

    fn participant(user_id: &str) -> Participant {
        Participant {
            user_id: user_id.into(),
            user_name: format!("Aluno {}", user_id),
            user_email: format!("aluno{}@universidade.edu.br", user_id),
            status: EnrollmentStatus::Inscrito,
            enrolled_at: Utc::now(),
            completed_hours: 0,
            attendance: vec![],
        }
    }

    #[tokio::test]
    async fn finds_users_by_email_case_insensitively() {
        let repo = InMemoryRepository::seeded();
        let user = repo
            .find_user_by_email("  JOAO.SILVA@universidade.edu.br ")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(user.id, "1");
        assert!(repo.find_user_by_email("nonexistent@x.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let repo = InMemoryRepository::seeded();
        let err = repo
            .create_user(NewUser {
                name: "Outro João".into(),
                email: "joao.silva@universidade.edu.br".into(),
                registration: "1".into(),
                roles: vec![Role::Discente],
                course: None,
                semester: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn stale_version_enrollment_is_rejected() {
        let repo = InMemoryRepository::seeded();
        let opportunity = repo.find_opportunity("5").await.unwrap().unwrap();
        let updated = repo
            .enroll("5", opportunity.version, participant("a"))
            .await
            .unwrap();
        assert_eq!(updated.available_vacancies, opportunity.available_vacancies - 1);

        // Segundo pedido com a versão antiga (duas abas abertas)
        let err = repo
            .enroll("5", opportunity.version, participant("b"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        let current = repo.find_opportunity("5").await.unwrap().unwrap();
        assert_eq!(current.available_vacancies, updated.available_vacancies);
    }

    #[tokio::test]
    async fn concurrent_enrollments_never_overbook() {
        let repo = Arc::new(InMemoryRepository::seeded());
        let start = repo.find_opportunity("5").await.unwrap().unwrap();
        assert_eq!(start.available_vacancies, 3);

        let mut handles = Vec::new();
        for i in 0..10 {
            let repo = Arc::clone(&repo);
            handles.push(tokio::spawn(async move {
                // Cada tarefa relê e tenta até conseguir ou ficar sem vagas
                loop {
                    let current = repo.find_opportunity("5").await.unwrap().unwrap();
                    if !current.can_enroll() {
                        return false;
                    }
                    match repo
                        .enroll("5", current.version, participant(&format!("c{}", i)))
                        .await
                    {
                        Ok(_) => return true,
                        Err(AppError::Conflict(_)) => continue,
                        Err(AppError::Validation(_)) => return false,
                        Err(other) => panic!("erro inesperado: {:?}", other),
                    }
                }
            }));
        }
        let mut enrolled = 0;
        for handle in handles {
            if handle.await.unwrap() {
                enrolled += 1;
            }
        }
        assert_eq!(enrolled, 3);
        let end = repo.find_opportunity("5").await.unwrap().unwrap();
        assert_eq!(end.available_vacancies, 0);
        assert_eq!(end.participants.len(), 3);
    }

    #[tokio::test]
    async fn marks_only_the_owner_notifications_as_read() {
        let repo = InMemoryRepository::seeded();
        let changed = repo.mark_notifications_read("1").await.unwrap();
        assert_eq!(changed, 2);
        assert!(repo.list_notifications("1").await.unwrap().iter().all(|n| n.read));
        assert!(repo.list_notifications("3").await.unwrap().iter().any(|n| !n.read));
    }
}
