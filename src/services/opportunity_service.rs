// src/services/opportunity_service.rs
use crate::{
    error::{AppError, AppResult},
    models::{
        metrics::percent_of,
        opportunity::{
            AttendanceRecord, EnrollmentStatus, NewOpportunity, Opportunity, OpportunityAction,
            OpportunityFilter, OpportunityStatus, Participant,
        },
        user::Role,
    },
    repository::PortalRepository,
    services::session_service::SessionContext,
};
use chrono::Utc;

/// Perfis que podem propor oportunidades.
pub const CREATOR_ROLES: &[Role] = &[Role::Discente, Role::Docente, Role::Coordenador];
/// Perfis que registam presença.
pub const ATTENDANCE_ROLES: &[Role] = &[Role::Docente, Role::Coordenador];

/// Resultado filtrado mais o total sem filtro ("Mostrando N de M").
#[derive(Debug, Clone)]
pub struct OpportunityListing {
    pub items: Vec<Opportunity>,
    pub total: usize,
}

pub async fn list(repo: &dyn PortalRepository, filter: &OpportunityFilter) -> AppResult<OpportunityListing> {
    let total = repo
        .list_opportunities(&OpportunityFilter {
            public_only: filter.public_only,
            ..Default::default()
        })
        .await?
        .len();
    let items = repo.list_opportunities(filter).await?;
    tracing::debug!("Oportunidades: {} de {} após filtros {:?}", items.len(), total, filter);
    Ok(OpportunityListing { items, total })
}

pub async fn get(repo: &dyn PortalRepository, id: &str) -> AppResult<Opportunity> {
    repo.find_opportunity(id)
        .await?
        .ok_or(AppError::NotFound("oportunidade"))
}

/// Cria uma oportunidade em rascunho, com todas as vagas livres.
pub async fn create(
    repo: &dyn PortalRepository,
    ctx: &SessionContext,
    new: NewOpportunity,
) -> AppResult<Opportunity> {
    ctx.require_role(CREATOR_ROLES)?;
    new.validate()?;

    let opportunity = Opportunity {
        id: uuid::Uuid::new_v4().to_string(),
        title: new.title.trim().to_string(),
        description: new.description.trim().to_string(),
        modality: new.modality,
        workload: new.workload,
        start_date: new.start_date,
        end_date: new.end_date,
        vacancies: new.vacancies,
        available_vacancies: new.vacancies,
        status: OpportunityStatus::Rascunho,
        responsible_id: new.responsible_id,
        responsible_name: new.responsible_name,
        created_by: new.created_by,
        created_at: Utc::now(),
        participants: Vec::new(),
        version: 1,
    };
    let created = repo.create_opportunity(opportunity).await?;
    tracing::info!("Oportunidade '{}' criada ({}).", created.title, created.id);
    Ok(created)
}

/// Executa uma ação administrativa da máquina de estados.
pub async fn apply_action(
    repo: &dyn PortalRepository,
    ctx: &SessionContext,
    id: &str,
    action: OpportunityAction,
    expected_version: i64,
) -> AppResult<Opportunity> {
    let role = ctx.require_role(action.allowed_roles())?;
    let opportunity = get(repo, id).await?;
    let Some(next) = action.transition(opportunity.status) else {
        tracing::warn!(
            "Ação '{}' recusada em '{}' (estado {})",
            action.as_str(),
            id,
            opportunity.status.as_str()
        );
        return Err(AppError::Validation(format!(
            "Não é possível \"{}\" uma oportunidade no estado {}.",
            action.label(),
            opportunity.status.label()
        )));
    };

    let updated = repo.update_opportunity_status(id, expected_version, next).await?;
    tracing::info!(
        "Oportunidade '{}': {} -> {} por perfil {}",
        id,
        opportunity.status.as_str(),
        next.as_str(),
        role.as_str()
    );
    Ok(updated)
}

/// Inscrição do discente autenticado.
pub async fn enroll(
    repo: &dyn PortalRepository,
    ctx: &SessionContext,
    id: &str,
    expected_version: i64,
) -> AppResult<Opportunity> {
    ctx.require_role(&[Role::Discente])?;
    let user = ctx.current_user()?;

    let participant = Participant {
        user_id: user.id.clone(),
        user_name: user.name.clone(),
        user_email: user.email.clone(),
        status: EnrollmentStatus::Inscrito,
        enrolled_at: Utc::now(),
        completed_hours: 0,
        attendance: Vec::new(),
    };
    let updated = repo.enroll(id, expected_version, participant).await?;
    tracing::info!(
        "Discente '{}' inscrito em '{}' ({} vagas restantes)",
        user.id,
        id,
        updated.available_vacancies
    );
    Ok(updated)
}

pub async fn record_attendance(
    repo: &dyn PortalRepository,
    ctx: &SessionContext,
    id: &str,
    expected_version: i64,
    participant_id: &str,
    record: AttendanceRecord,
) -> AppResult<Opportunity> {
    ctx.require_role(ATTENDANCE_ROLES)?;
    let updated = repo
        .record_attendance(id, expected_version, participant_id, record)
        .await?;
    tracing::info!("Presença registada para '{}' em '{}'.", participant_id, id);
    Ok(updated)
}

/// Uma inscrição do discente com o progresso em horas.
#[derive(Debug, Clone)]
pub struct EnrollmentView {
    pub opportunity: Opportunity,
    pub participant: Participant,
}

impl EnrollmentView {
    pub fn progress_percent(&self) -> u32 {
        percent_of(self.participant.completed_hours, self.opportunity.workload)
    }
}

pub async fn my_enrollments(repo: &dyn PortalRepository, user_id: &str) -> AppResult<Vec<EnrollmentView>> {
    let opportunities = repo.list_opportunities(&OpportunityFilter::default()).await?;
    Ok(opportunities
        .into_iter()
        .filter_map(|opportunity| {
            let participant = opportunity.participant(user_id)?.clone();
            Some(EnrollmentView {
                opportunity,
                participant,
            })
        })
        .collect())
}
