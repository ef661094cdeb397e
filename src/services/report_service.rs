// src/services/report_service.rs
use crate::{
    error::{AppError, AppResult},
    models::{
        approval::{ApprovalRequest, RequestStatus},
        certificate::Certificate,
        group::current_ppc,
        metrics::{total_hours, HoursBucket, ReportSummary, StudentHours},
        user::{Role, User},
    },
    repository::PortalRepository,
};
use chrono::{Datelike, NaiveDate};
use std::{fmt, str::FromStr};

/// Limites inferiores das faixas de horas concluídas.
const BUCKETS: [(&str, u32); 5] = [("0-20", 0), ("20-40", 20), ("40-60", 40), ("60-80", 60), ("80+", 80)];
const RANKING_SIZE: usize = 3;
/// Semestres oferecidos no seletor da página, do mais recente para o mais antigo.
pub const PERIOD_CHOICES: [&str; 3] = ["2025.1", "2024.2", "2024.1"];

/// Semestre letivo `AAAA.1` (janeiro a junho) ou `AAAA.2` (julho a dezembro).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    pub year: i32,
    pub half: u32,
}

impl Period {
    pub fn contains(&self, date: NaiveDate) -> bool {
        let half = if date.month() <= 6 { 1 } else { 2 };
        date.year() == self.year && half == self.half
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.year, self.half)
    }
}

impl FromStr for Period {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AppError::Validation(format!("Período inválido: '{}'", s));
        let (year, half) = s.trim().split_once('.').ok_or_else(invalid)?;
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let half: u32 = half.parse().map_err(|_| invalid())?;
        if !(1..=2).contains(&half) {
            return Err(invalid());
        }
        Ok(Period { year, half })
    }
}

/// Horas por discente: aprovadas + certificados, e pendentes em análise.
pub fn hours_per_student(
    users: &[User],
    requests: &[ApprovalRequest],
    certificates: &[Certificate],
) -> Vec<StudentHours> {
    users
        .iter()
        .filter(|u| u.has_role(Role::Discente))
        .map(|u| {
            let own = requests.iter().filter(|r| r.user_id == u.id);
            let approved = total_hours(
                own.clone()
                    .filter(|r| r.status == RequestStatus::Aprovado)
                    .map(|r| r.requested_hours),
            );
            let pending = total_hours(own.filter(|r| r.status.is_open()).map(|r| r.requested_hours));
            let certified = total_hours(
                certificates
                    .iter()
                    .filter(|c| c.user_id == u.id)
                    .map(|c| c.workload),
            );
            StudentHours {
                user_id: u.id.clone(),
                name: u.name.clone(),
                course: u.course.clone().unwrap_or_default(),
                completed_hours: approved.saturating_add(certified),
                pending_hours: pending,
            }
        })
        .collect()
}

pub fn summarize(students: Vec<StudentHours>, minimum_workload: u32) -> ReportSummary {
    let distribution = BUCKETS
        .iter()
        .enumerate()
        .map(|(i, (label, lower))| {
            let upper = BUCKETS.get(i + 1).map(|(_, next)| *next);
            HoursBucket {
                label: *label,
                students: students
                    .iter()
                    .filter(|s| s.completed_hours >= *lower && upper.map_or(true, |u| s.completed_hours < u))
                    .count(),
            }
        })
        .collect();

    let mut ranking = students.clone();
    let mut by_name = students.clone();
    by_name.sort_by(|a, b| a.name.cmp(&b.name));
    ranking.sort_by(|a, b| b.completed_hours.cmp(&a.completed_hours).then_with(|| a.name.cmp(&b.name)));
    ranking.truncate(RANKING_SIZE);

    let critical = students
        .iter()
        .filter(|s| s.completed_hours.saturating_mul(2) < minimum_workload)
        .cloned()
        .collect();

    ReportSummary {
        completed_hours: total_hours(students.iter().map(|s| s.completed_hours)),
        pending_hours: total_hours(students.iter().map(|s| s.pending_hours)),
        remaining_hours: total_hours(
            students
                .iter()
                .map(|s| minimum_workload.saturating_sub(s.completed_hours)),
        ),
        minimum_workload,
        distribution,
        ranking,
        critical,
        students: by_name,
    }
}

/// Relatório geral; com `period`, só contam pedidos submetidos e certificados emitidos nesse semestre.
pub async fn build(repo: &dyn PortalRepository, period: Option<Period>) -> AppResult<ReportSummary> {
    let users = repo.list_users().await?;
    let mut requests = repo.list_approval_requests().await?;
    let mut certificates = repo.list_certificates().await?;
    if let Some(period) = period {
        requests.retain(|r| period.contains(r.submitted_at.date_naive()));
        certificates.retain(|c| period.contains(c.issue_date));
    }
    let minimum = current_ppc(&repo.list_ppcs().await?).map_or(0, |ppc| ppc.minimum_workload);

    let students = hours_per_student(&users, &requests, &certificates);
    tracing::debug!(
        "Relatório calculado para {} discentes (período: {}).",
        students.len(),
        period.map_or_else(|| "todos".to_string(), |p| p.to_string())
    );
    Ok(summarize(students, minimum))
}

const CSV_HEADER: &str = "Nome;Curso;Horas concluídas;Horas em análise;Horas restantes";

/// Campo CSV com `;` como separador: aspas quando há separador, aspas ou quebra de linha.
fn csv_field(value: &str) -> String {
    if value.contains([';', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Tabela por discente, pronta para abrir numa folha de cálculo.
pub fn to_csv(summary: &ReportSummary) -> String {
    let mut out = String::from(CSV_HEADER);
    out.push_str("\r\n");
    for s in &summary.students {
        let row = [
            csv_field(&s.name),
            csv_field(&s.course),
            s.completed_hours.to_string(),
            s.pending_hours.to_string(),
            summary.minimum_workload.saturating_sub(s.completed_hours).to_string(),
        ];
        out.push_str(&row.join(";"));
        out.push_str("\r\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryRepository;

    fn student(name: &str, completed: u32) -> StudentHours {
        StudentHours {
            user_id: name.to_lowercase(),
            name: name.into(),
            course: "Engenharia".into(),
            completed_hours: completed,
            pending_hours: 0,
        }
    }

    #[test]
    fn buckets_ranking_and_critical_list() {
        let students = vec![
            student("Ana", 0),
            student("Bruno", 20),
            student("Carla", 59),
            student("Diego", 80),
            student("Eva", 130),
        ];
        let summary = summarize(students, 120);

        let counts: Vec<_> = summary.distribution.iter().map(|b| b.students).collect();
        assert_eq!(counts, vec![1, 1, 1, 0, 2]);

        let top: Vec<_> = summary.ranking.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(top, vec!["Eva", "Diego", "Carla"]);

        let critical: Vec<_> = summary.critical.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(critical, vec!["Ana", "Bruno", "Carla"]);
        assert_eq!(summary.remaining_hours, 120 + 100 + 61 + 40);
    }

    #[tokio::test]
    async fn report_uses_the_current_ppc_minimum() {
        let repo = InMemoryRepository::seeded();
        let summary = build(&repo, None).await.unwrap();
        assert_eq!(summary.minimum_workload, 120);
        let total: usize = summary.distribution.iter().map(|b| b.students).sum();
        assert_eq!(total, 3); // João, Pedro e Maria Santos
    }

    #[test]
    fn huge_hours_saturate_instead_of_overflowing() {
        let summary = summarize(vec![student("Ana", u32::MAX), student("Bruno", u32::MAX)], 120);
        assert_eq!(summary.completed_hours, u32::MAX);
        assert!(summary.critical.is_empty());
        assert_eq!(summary.remaining_hours, 0);
    }

    #[test]
    fn periods_parse_and_cover_half_a_year() {
        let period: Period = "2025.1".parse().unwrap();
        assert_eq!(period, Period { year: 2025, half: 1 });
        assert_eq!(period.to_string(), "2025.1");
        assert!(period.contains(NaiveDate::from_ymd_opt(2025, 6, 30).unwrap()));
        assert!(!period.contains(NaiveDate::from_ymd_opt(2025, 7, 1).unwrap()));
        assert!(!period.contains(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()));
        for bad in ["2025", "2025.3", "abc.1", ""] {
            assert!(bad.parse::<Period>().is_err(), "{}", bad);
        }
    }

    #[tokio::test]
    async fn a_period_without_activity_counts_no_hours() {
        let repo = InMemoryRepository::seeded();
        let summary = build(&repo, Some(Period { year: 2019, half: 1 })).await.unwrap();
        assert_eq!(summary.completed_hours, 0);
        assert_eq!(summary.pending_hours, 0);
        assert_eq!(summary.students.len(), 3);
    }

    #[test]
    fn csv_has_one_row_per_student_and_quotes_separators() {
        let mut ana = student("Ana", 30);
        ana.course = "Direito; noturno".into();
        let summary = summarize(vec![student("Bruno", 130), ana], 120);
        let csv = to_csv(&summary);
        let lines: Vec<_> = csv.lines().collect();
        assert_eq!(lines[0], CSV_HEADER);
        assert_eq!(lines[1], "Ana;\"Direito; noturno\";30;0;90");
        assert_eq!(lines[2], "Bruno;Engenharia;130;0;0");
        assert_eq!(lines.len(), 3);
    }
}
