// src/services/dashboard_service.rs
use crate::{
    error::AppResult,
    models::{
        approval::{ApprovalRequest, RequestStatus},
        certificate::Certificate,
        group::current_ppc,
        metrics::{total_hours, AdminMetrics, CoordinatorMetrics, RoleCount, StudentMetrics, TeacherMetrics},
        opportunity::{Opportunity, OpportunityFilter, OpportunityStatus},
        user::{Role, User},
    },
    repository::PortalRepository,
    services::session_service::SessionContext,
};

/// Painel de acordo com o perfil ativo.
#[derive(Debug, Clone)]
pub enum Dashboard {
    Student {
        metrics: StudentMetrics,
        recent_requests: Vec<ApprovalRequest>,
        open_opportunities: Vec<Opportunity>,
    },
    Teacher {
        metrics: TeacherMetrics,
        opportunities: Vec<Opportunity>,
    },
    Coordination {
        metrics: CoordinatorMetrics,
        pending_requests: Vec<ApprovalRequest>,
    },
    Admin {
        metrics: AdminMetrics,
    },
}

/// Horas concluídas: solicitações aprovadas mais certificados do discente.
pub fn student_metrics(
    user_id: &str,
    requests: &[ApprovalRequest],
    certificates: &[Certificate],
    total_required: u32,
) -> StudentMetrics {
    let own_requests = requests.iter().filter(|r| r.user_id == user_id);
    let (approved, pending): (Vec<_>, Vec<_>) = own_requests
        .filter(|r| r.status != RequestStatus::Indeferido)
        .partition(|r| r.status == RequestStatus::Aprovado);
    let own_certificates: Vec<_> = certificates.iter().filter(|c| c.user_id == user_id).collect();

    StudentMetrics {
        completed_hours: total_hours(
            approved
                .iter()
                .map(|r| r.requested_hours)
                .chain(own_certificates.iter().map(|c| c.workload)),
        ),
        pending_hours: total_hours(pending.iter().map(|r| r.requested_hours)),
        total_required,
        certificates: own_certificates.len(),
        pending_requests: pending.len(),
    }
}

pub fn coordinator_metrics(requests: &[ApprovalRequest], opportunities: &[Opportunity]) -> CoordinatorMetrics {
    let mut enrolled: Vec<&str> = opportunities
        .iter()
        .filter(|o| o.status.is_active())
        .flat_map(|o| o.participants.iter().map(|p| p.user_id.as_str()))
        .collect();
    enrolled.sort_unstable();
    enrolled.dedup();

    CoordinatorMetrics {
        pending_requests: requests.iter().filter(|r| r.status.is_open()).count(),
        active_opportunities: opportunities.iter().filter(|o| o.status.is_active()).count(),
        awaiting_approval: opportunities
            .iter()
            .filter(|o| o.status == OpportunityStatus::AguardandoAprovacao)
            .count(),
        enrolled_students: enrolled.len(),
        approved_requests: requests
            .iter()
            .filter(|r| r.status == RequestStatus::Aprovado)
            .count(),
        rejected_requests: requests
            .iter()
            .filter(|r| r.status == RequestStatus::Indeferido)
            .count(),
    }
}

pub fn teacher_metrics(user_id: &str, opportunities: &[Opportunity]) -> TeacherMetrics {
    let mine: Vec<_> = opportunities.iter().filter(|o| o.responsible_id == user_id).collect();
    TeacherMetrics {
        my_opportunities: mine.len(),
        open_opportunities: mine.iter().filter(|o| o.status.is_active()).count(),
        participants: mine.iter().map(|o| o.participants.len()).sum(),
    }
}

pub fn admin_metrics(users: &[User], opportunities: usize, certificates: usize) -> AdminMetrics {
    AdminMetrics {
        users_by_role: Role::ALL
            .into_iter()
            .map(|role| RoleCount {
                label: role.label(),
                count: users.iter().filter(|u| u.has_role(role)).count(),
            })
            .collect(),
        total_users: users.len(),
        total_opportunities: opportunities,
        total_certificates: certificates,
    }
}

pub async fn build(repo: &dyn PortalRepository, ctx: &SessionContext) -> AppResult<Dashboard> {
    let user = ctx.current_user()?;
    let role = ctx.active_role()?;
    tracing::debug!("Montando painel de '{}' como {}", user.id, role.as_str());

    let dashboard = match role {
        Role::Discente => {
            let requests = repo.list_approval_requests().await?;
            let certificates = repo.list_certificates().await?;
            let required = current_ppc(&repo.list_ppcs().await?).map_or(0, |ppc| ppc.minimum_workload);
            let metrics = student_metrics(&user.id, &requests, &certificates, required);

            let mut recent_requests: Vec<_> = requests.into_iter().filter(|r| r.user_id == user.id).collect();
            recent_requests.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
            recent_requests.truncate(3);

            let open_opportunities = repo
                .list_opportunities(&OpportunityFilter {
                    status: Some(OpportunityStatus::Aberta),
                    ..Default::default()
                })
                .await?
                .into_iter()
                .take(3)
                .collect();

            Dashboard::Student {
                metrics,
                recent_requests,
                open_opportunities,
            }
        }
        Role::Docente => {
            let opportunities: Vec<_> = repo
                .list_opportunities(&OpportunityFilter::default())
                .await?
                .into_iter()
                .filter(|o| o.responsible_id == user.id)
                .collect();
            Dashboard::Teacher {
                metrics: teacher_metrics(&user.id, &opportunities),
                opportunities,
            }
        }
        Role::Coordenador | Role::Secretaria => {
            let requests = repo.list_approval_requests().await?;
            let opportunities = repo.list_opportunities(&OpportunityFilter::default()).await?;
            let metrics = coordinator_metrics(&requests, &opportunities);
            Dashboard::Coordination {
                metrics,
                pending_requests: requests.into_iter().filter(|r| r.status.is_open()).take(5).collect(),
            }
        }
        Role::Administrador => {
            let users = repo.list_users().await?;
            let opportunities = repo.list_opportunities(&OpportunityFilter::default()).await?.len();
            let certificates = repo.list_certificates().await?.len();
            Dashboard::Admin {
                metrics: admin_metrics(&users, opportunities, certificates),
            }
        }
    };
    Ok(dashboard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{fixtures, repository::InMemoryRepository};

    #[test]
    fn student_hours_combine_requests_and_certificates() {
        let requests = fixtures::approval_requests();
        let certificates = fixtures::certificates();
        let metrics = student_metrics("1", &requests, &certificates, 120);

        let approved: u32 = requests
            .iter()
            .filter(|r| r.user_id == "1" && r.status == RequestStatus::Aprovado)
            .map(|r| r.requested_hours)
            .sum();
        let certified: u32 = certificates.iter().filter(|c| c.user_id == "1").map(|c| c.workload).sum();
        assert_eq!(metrics.completed_hours, approved + certified);
        assert_eq!(metrics.pending_requests, 1);
        assert!(metrics.progress_percent() <= 100);
    }

    #[test]
    fn coordinator_counts_open_requests() {
        let metrics = coordinator_metrics(&fixtures::approval_requests(), &fixtures::opportunities());
        assert_eq!(metrics.pending_requests, 2);
        assert_eq!(metrics.awaiting_approval, 1);
        assert_eq!(metrics.approved_requests, 1);
        assert_eq!(metrics.rejected_requests, 1);
    }

    #[tokio::test]
    async fn dashboard_follows_the_active_role() {
        let repo = InMemoryRepository::seeded();
        let carlos = fixtures::users().remove(2);

        let as_coordinator = SessionContext::for_tests(carlos.clone(), Role::Coordenador);
        assert!(matches!(build(&repo, &as_coordinator).await.unwrap(), Dashboard::Coordination { .. }));

        let as_teacher = SessionContext::for_tests(carlos, Role::Docente);
        let Dashboard::Teacher { opportunities, .. } = build(&repo, &as_teacher).await.unwrap() else {
            panic!("esperado painel de docente");
        };
        assert!(opportunities.iter().all(|o| o.responsible_id == "3"));

        let admin = SessionContext::for_tests(fixtures::users().remove(4), Role::Administrador);
        let Dashboard::Admin { metrics } = build(&repo, &admin).await.unwrap() else {
            panic!("esperado painel de administração");
        };
        assert_eq!(metrics.total_users, fixtures::users().len());
        assert_eq!(metrics.users_by_role.len(), Role::ALL.len());
    }
}
