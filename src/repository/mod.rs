// src/repository/mod.rs
//! Fronteira de dados do portal. As páginas e serviços só conhecem este trait.
use crate::{
    error::AppResult,
    models::{
        approval::{ApprovalRequest, Review},
        certificate::Certificate,
        group::{Group, Ppc},
        notification::Notification,
        opportunity::{AttendanceRecord, Opportunity, OpportunityFilter, OpportunityStatus, Participant},
        user::{NewUser, Role, User},
    },
};
use async_trait::async_trait;

pub mod memory;
pub mod sqlite;

pub use memory::InMemoryRepository;
pub use sqlite::SqliteRepository;

/// Operações de persistência. As escritas sobre oportunidades e solicitações
/// recebem a versão lida pelo chamador; uma versão desatualizada devolve
/// `AppError::Conflict` sem alterar nada.
#[async_trait]
pub trait PortalRepository: Send + Sync {
    // --- Utilizadores ---
    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>>;
    async fn find_user_by_id(&self, id: &str) -> AppResult<Option<User>>;
    async fn list_users(&self) -> AppResult<Vec<User>>;
    /// Falha com `Conflict` se o e-mail já existir.
    async fn create_user(&self, new_user: NewUser) -> AppResult<User>;
    async fn set_user_roles(&self, user_id: &str, roles: &[Role]) -> AppResult<User>;
    async fn delete_user(&self, user_id: &str) -> AppResult<()>;

    // --- Oportunidades ---
    async fn list_opportunities(&self, filter: &OpportunityFilter) -> AppResult<Vec<Opportunity>>;
    async fn find_opportunity(&self, id: &str) -> AppResult<Option<Opportunity>>;
    async fn create_opportunity(&self, opportunity: Opportunity) -> AppResult<Opportunity>;
    async fn update_opportunity_status(
        &self,
        id: &str,
        expected_version: i64,
        next: OpportunityStatus,
    ) -> AppResult<Opportunity>;
    /// Inscreve e decrementa as vagas numa só operação atómica.
    async fn enroll(
        &self,
        opportunity_id: &str,
        expected_version: i64,
        participant: Participant,
    ) -> AppResult<Opportunity>;
    async fn record_attendance(
        &self,
        opportunity_id: &str,
        expected_version: i64,
        user_id: &str,
        record: AttendanceRecord,
    ) -> AppResult<Opportunity>;

    // --- Solicitações de aproveitamento ---
    async fn list_approval_requests(&self) -> AppResult<Vec<ApprovalRequest>>;
    async fn find_approval_request(&self, id: &str) -> AppResult<Option<ApprovalRequest>>;
    async fn submit_approval_request(&self, request: ApprovalRequest) -> AppResult<ApprovalRequest>;
    async fn review_approval_request(
        &self,
        id: &str,
        expected_version: i64,
        review: &Review,
    ) -> AppResult<ApprovalRequest>;

    // --- Certificados ---
    async fn list_certificates(&self) -> AppResult<Vec<Certificate>>;
    /// Procura pelo código já normalizado (maiúsculas, sem espaços).
    async fn find_certificate_by_code(&self, code: &str) -> AppResult<Option<Certificate>>;
    async fn issue_certificate(&self, certificate: Certificate) -> AppResult<Certificate>;

    // --- Grupos e PPC ---
    async fn list_groups(&self) -> AppResult<Vec<Group>>;
    async fn list_ppcs(&self) -> AppResult<Vec<Ppc>>;

    // --- Notificações ---
    async fn list_notifications(&self, user_id: &str) -> AppResult<Vec<Notification>>;
    async fn push_notifications(&self, notifications: Vec<Notification>) -> AppResult<()>;
    async fn mark_notifications_read(&self, user_id: &str) -> AppResult<usize>;
}
