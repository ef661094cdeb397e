// src/web/opportunity_handlers.rs
use crate::{
    error::AppResult,
    models::{
        opportunity::{
            AttendanceRecord, Modality, NewOpportunity, Opportunity, OpportunityAction, OpportunityFilter,
            OpportunityStatus,
        },
        user::Role,
    },
    services::{
        certificate_service::ISSUER_ROLES,
        navigation::Page,
        opportunity_service::{self, ATTENDANCE_ROLES, CREATOR_ROLES},
        session_service::{self, SessionContext},
    },
    state::AppState,
    templates::{
        MyEnrollmentsPage, OpportunitiesPage, OpportunityDetailPage, OpportunityRow, PublicPortalPage, SelectOption,
    },
    web::shell::{back_to, render, Viewer},
};
use axum::{
    extract::{Extension, Form, Path, Query, State},
    response::{Redirect, Response},
};
use chrono::NaiveDate;
use serde::Deserialize;
use tower_sessions::Session;

/// Filtros da listagem; `all` ou vazio desligam o filtro.
#[derive(Deserialize, Debug, Default)]
pub struct OpportunityQuery {
    #[serde(default)]
    search: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    modality: Option<String>,
}

impl OpportunityQuery {
    fn to_filter(&self, public_only: bool) -> OpportunityFilter {
        OpportunityFilter {
            search: self.search.clone().filter(|s| !s.trim().is_empty()),
            status: chosen(&self.status).and_then(|s| s.parse().ok()),
            modality: chosen(&self.modality).and_then(|m| m.parse().ok()),
            public_only,
        }
    }
}

fn chosen(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty() && *v != "all")
}

fn status_options(selected: Option<OpportunityStatus>) -> Vec<SelectOption> {
    let mut options = vec![SelectOption::new("all", "Todos os estados", selected.is_none())];
    options.extend(
        OpportunityStatus::ALL
            .into_iter()
            .map(|s| SelectOption::new(s.as_str(), s.label(), selected == Some(s))),
    );
    options
}

fn modality_options(selected: Option<Modality>) -> Vec<SelectOption> {
    let mut options = vec![SelectOption::new("all", "Todas as modalidades", selected.is_none())];
    options.extend(modality_choices(selected));
    options
}

fn modality_choices(selected: Option<Modality>) -> Vec<SelectOption> {
    Modality::ALL
        .into_iter()
        .map(|m| SelectOption::new(m.as_str(), m.label(), selected == Some(m)))
        .collect()
}

fn opportunity_path(id: &str) -> String {
    format!("/opportunities/{}", id)
}

// GET /opportunities
pub async fn opportunities_page(
    State(state): State<AppState>,
    viewer: Viewer,
    Query(query): Query<OpportunityQuery>,
) -> AppResult<Response> {
    let (shell, ctx) = viewer.shell(&state, Page::Opportunities).await?;
    let user = ctx.current_user()?;
    let role = ctx.active_role()?;

    let filter = query.to_filter(false);
    let listing = opportunity_service::list(state.repo.as_ref(), &filter).await?;
    let rows = listing
        .items
        .into_iter()
        .map(|opportunity| {
            let enrolled = opportunity.is_enrolled(&user.id);
            OpportunityRow {
                can_enroll: role == Role::Discente && !enrolled && opportunity.can_enroll(),
                enrolled,
                opportunity,
            }
        })
        .collect();

    render(&OpportunitiesPage {
        shell,
        rows,
        total: listing.total,
        search: query.search.clone().unwrap_or_default(),
        filtered: filter.is_active(),
        statuses: status_options(filter.status),
        modalities: modality_options(filter.modality),
        modality_choices: modality_choices(None),
        can_create: CREATOR_ROLES.contains(&role),
    })
}

#[derive(Deserialize, Debug)]
pub struct CreateOpportunityForm {
    title: String,
    description: String,
    modality: String,
    workload: u32,
    start_date: NaiveDate,
    end_date: NaiveDate,
    vacancies: u32,
}

// POST /opportunities
pub async fn handle_create_opportunity(
    State(state): State<AppState>,
    Extension(ctx): Extension<SessionContext>,
    Form(form): Form<CreateOpportunityForm>,
) -> AppResult<Redirect> {
    let outcome = create_from_form(&state, &ctx, form)
        .await
        .map(|created| format!("Oportunidade \"{}\" criada como rascunho.", created.title));
    back_to("/opportunities", outcome)
}

async fn create_from_form(state: &AppState, ctx: &SessionContext, form: CreateOpportunityForm) -> AppResult<Opportunity> {
    let user = ctx.current_user()?;
    let new = NewOpportunity {
        title: form.title,
        description: form.description,
        modality: form.modality.parse()?,
        workload: form.workload,
        start_date: form.start_date,
        end_date: form.end_date,
        vacancies: form.vacancies,
        responsible_id: user.id.clone(),
        responsible_name: user.name.clone(),
        created_by: user.id.clone(),
    };
    opportunity_service::create(state.repo.as_ref(), ctx, new).await
}

// GET /opportunities/{id}
pub async fn opportunity_detail_page(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let (shell, ctx) = viewer.shell(&state, Page::Opportunities).await?;
    let user = ctx.current_user()?;
    let role = ctx.active_role()?;
    let opportunity = opportunity_service::get(state.repo.as_ref(), &id).await?;

    let enrolled = opportunity.is_enrolled(&user.id);
    let issuable = if ISSUER_ROLES.contains(&role) && opportunity.status == OpportunityStatus::Encerrada {
        let certificates = state.repo.list_certificates().await?;
        opportunity
            .participants
            .iter()
            .filter(|p| p.status.is_valid())
            .filter(|p| {
                !certificates
                    .iter()
                    .any(|c| c.user_id == p.user_id && c.opportunity_id.as_deref() == Some(opportunity.id.as_str()))
            })
            .cloned()
            .collect()
    } else {
        Vec::new()
    };

    render(&OpportunityDetailPage {
        shell,
        actions: opportunity.available_actions(role),
        enrolled,
        can_enroll: role == Role::Discente && !enrolled && opportunity.can_enroll(),
        can_record_attendance: can_record_attendance(&opportunity, role),
        can_issue: !issuable.is_empty(),
        issuable,
        opportunity,
    })
}

fn can_record_attendance(opportunity: &Opportunity, role: Role) -> bool {
    ATTENDANCE_ROLES.contains(&role)
        && opportunity.status == OpportunityStatus::EmExecucao
        && !opportunity.participants.is_empty()
}

#[derive(Deserialize, Debug)]
pub struct ActionForm {
    action: OpportunityAction,
    version: i64,
}

// POST /opportunities/{id}/action
pub async fn handle_action(
    State(state): State<AppState>,
    Extension(ctx): Extension<SessionContext>,
    Path(id): Path<String>,
    Form(form): Form<ActionForm>,
) -> AppResult<Redirect> {
    let outcome = opportunity_service::apply_action(state.repo.as_ref(), &ctx, &id, form.action, form.version)
        .await
        .map(|o| format!("\"{}\" agora está {}.", o.title, o.status.label()));
    back_to(&opportunity_path(&id), outcome)
}

#[derive(Deserialize, Debug)]
pub struct EnrollForm {
    version: i64,
}

// POST /opportunities/{id}/enroll
pub async fn handle_enroll(
    State(state): State<AppState>,
    Extension(ctx): Extension<SessionContext>,
    Path(id): Path<String>,
    Form(form): Form<EnrollForm>,
) -> AppResult<Redirect> {
    let outcome = opportunity_service::enroll(state.repo.as_ref(), &ctx, &id, form.version)
        .await
        .map(|o| format!("Inscrição realizada em \"{}\".", o.title));
    back_to(&opportunity_path(&id), outcome)
}

#[derive(Deserialize, Debug)]
pub struct AttendanceForm {
    version: i64,
    participant_id: String,
    date: NaiveDate,
    hours: u32,
    #[serde(default)]
    description: String,
}

// POST /opportunities/{id}/attendance
pub async fn handle_attendance(
    State(state): State<AppState>,
    Extension(ctx): Extension<SessionContext>,
    Path(id): Path<String>,
    Form(form): Form<AttendanceForm>,
) -> AppResult<Redirect> {
    let record = AttendanceRecord {
        date: form.date,
        hours: form.hours,
        description: form.description.trim().to_string(),
    };
    let outcome = opportunity_service::record_attendance(
        state.repo.as_ref(),
        &ctx,
        &id,
        form.version,
        &form.participant_id,
        record,
    )
    .await
    .map(|_| format!("Presença de {}h registada.", form.hours));
    back_to(&opportunity_path(&id), outcome)
}

// GET /my-enrollments
pub async fn my_enrollments_page(State(state): State<AppState>, viewer: Viewer) -> AppResult<Response> {
    let (shell, ctx) = viewer.shell(&state, Page::MyEnrollments).await?;
    let user = ctx.current_user()?;
    let enrollments = opportunity_service::my_enrollments(state.repo.as_ref(), &user.id).await?;
    render(&MyEnrollmentsPage { shell, enrollments })
}

// GET /public-portal (sem login)
pub async fn public_portal_page(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<OpportunityQuery>,
) -> AppResult<Response> {
    let logged_in = session_service::rehydrate(&session).await?.is_authenticated();
    let filter = OpportunityFilter {
        status: None,
        ..query.to_filter(true)
    };
    let listing = opportunity_service::list(state.repo.as_ref(), &filter).await?;

    render(&PublicPortalPage {
        opportunities: listing.items,
        total: listing.total,
        search: query.search.clone().unwrap_or_default(),
        modalities: modality_options(filter.modality),
        logged_in,
    })
}
