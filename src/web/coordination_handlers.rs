// src/web/coordination_handlers.rs
use crate::{
    error::AppResult,
    models::group::current_ppc,
    services::{
        communication_service::{self, Audience},
        navigation::Page,
        report_service::{self, Period, PERIOD_CHOICES},
        session_service::SessionContext,
    },
    state::AppState,
    templates::{CommunicationsPage, GroupsPage, PpcPage, ReportsPage, SelectOption},
    web::shell::{back_to, render, Viewer},
};
use axum::{
    extract::{Extension, Form, Query, State},
    http::header,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;

// GET /groups
pub async fn groups_page(State(state): State<AppState>, viewer: Viewer) -> AppResult<Response> {
    let (shell, _) = viewer.shell(&state, Page::Groups).await?;
    let groups = state.repo.list_groups().await?;
    render(&GroupsPage { shell, groups })
}

// GET /ppc
pub async fn ppc_page(State(state): State<AppState>, viewer: Viewer) -> AppResult<Response> {
    let (shell, _) = viewer.shell(&state, Page::Ppc).await?;
    let mut history = state.repo.list_ppcs().await?;
    history.sort_by(|a, b| b.effective_from.cmp(&a.effective_from));
    let current = current_ppc(&history).cloned();
    render(&PpcPage { shell, current, history })
}

/// `?period=AAAA.N`; vazio ou `all` cobre todo o histórico.
#[derive(Deserialize, Debug, Default)]
pub struct ReportQuery {
    #[serde(default)]
    period: Option<String>,
}

impl ReportQuery {
    fn period(&self) -> AppResult<Option<Period>> {
        match self.period.as_deref().map(str::trim) {
            None | Some("") | Some("all") => Ok(None),
            Some(raw) => raw.parse().map(Some),
        }
    }
}

fn period_options(selected: Option<Period>) -> Vec<SelectOption> {
    let mut options = vec![SelectOption::new("all", "Todos os períodos", selected.is_none())];
    options.extend(PERIOD_CHOICES.into_iter().map(|choice| {
        let chosen = selected.is_some_and(|p| p.to_string() == choice);
        SelectOption::new(choice, choice, chosen)
    }));
    options
}

// GET /reports
pub async fn reports_page(
    State(state): State<AppState>,
    viewer: Viewer,
    Query(query): Query<ReportQuery>,
) -> AppResult<Response> {
    let (shell, _) = viewer.shell(&state, Page::Reports).await?;
    let period = query.period()?;
    let summary = report_service::build(state.repo.as_ref(), period).await?;
    render(&ReportsPage {
        shell,
        summary,
        periods: period_options(period),
        export_query: period.map_or_else(String::new, |p| format!("?period={}", p)),
    })
}

// GET /reports/export.csv
pub async fn export_report_csv(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> AppResult<Response> {
    let period = query.period()?;
    let summary = report_service::build(state.repo.as_ref(), period).await?;
    let filename = match period {
        Some(p) => format!("relatorio-horas-{}.csv", p),
        None => "relatorio-horas.csv".to_string(),
    };
    tracing::info!("Exportando relatório CSV ({} discentes)", summary.students.len());
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", filename)),
        ],
        report_service::to_csv(&summary),
    )
        .into_response())
}

// GET /communications
pub async fn communications_page(State(state): State<AppState>, viewer: Viewer) -> AppResult<Response> {
    let (shell, _) = viewer.shell(&state, Page::Communications).await?;
    let users = state.repo.list_users().await?;
    let audiences = communication_service::audience_options(&users)
        .into_iter()
        .map(|a| SelectOption::new(a.to_string(), a.label(), a == Audience::All))
        .collect();
    render(&CommunicationsPage {
        shell,
        audiences,
        notifications_enabled: state.notifications_enabled().await,
    })
}

#[derive(Deserialize, Debug)]
pub struct CommunicationForm {
    audience: String,
    subject: String,
    message: String,
}

// POST /communications
pub async fn handle_send_communication(
    State(state): State<AppState>,
    Extension(ctx): Extension<SessionContext>,
    Form(form): Form<CommunicationForm>,
) -> AppResult<Redirect> {
    let enabled = state.notifications_enabled().await;
    let outcome = match form.audience.parse::<Audience>() {
        Ok(audience) => {
            communication_service::send(state.repo.as_ref(), &ctx, enabled, &audience, &form.subject, &form.message)
                .await
                .map(|count| {
                    if enabled {
                        format!("Comunicado enviado para {} usuários ({}).", count, audience.label())
                    } else {
                        "Notificações desativadas: o comunicado não foi entregue.".to_string()
                    }
                })
        }
        Err(e) => Err(e),
    };
    back_to(Page::Communications.path(), outcome)
}
