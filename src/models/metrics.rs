// src/models/metrics.rs
use serde::Serialize;

/// Soma de horas que satura em vez de transbordar.
pub fn total_hours<I: IntoIterator<Item = u32>>(hours: I) -> u32 {
    hours.into_iter().fold(0, u32::saturating_add)
}

/// `part` em percentagem de `whole`, limitado a 100. `whole == 0` dá 0.
pub fn percent_of(part: u32, whole: u32) -> u32 {
    if whole == 0 {
        return 0;
    }
    let pct = (u64::from(part) * 100 / u64::from(whole)).min(100);
    pct as u32
}

/// Indicadores do painel do discente.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StudentMetrics {
    pub completed_hours: u32,
    pub pending_hours: u32,
    pub total_required: u32,
    pub certificates: usize,
    pub pending_requests: usize,
}

impl StudentMetrics {
    /// Horas ainda por cumprir, descontando as que estão em análise.
    pub fn remaining_hours(&self) -> u32 {
        self.total_required
            .saturating_sub(self.completed_hours.saturating_add(self.pending_hours))
    }

    /// Progresso em percentagem, limitado a 100.
    pub fn progress_percent(&self) -> u32 {
        if self.total_required == 0 {
            return 100;
        }
        percent_of(self.completed_hours, self.total_required)
    }
}

/// Indicadores do painel de coordenação e secretaria.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CoordinatorMetrics {
    pub pending_requests: usize,
    pub active_opportunities: usize,
    pub awaiting_approval: usize,
    pub enrolled_students: usize,
    pub approved_requests: usize,
    pub rejected_requests: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TeacherMetrics {
    pub my_opportunities: usize,
    pub open_opportunities: usize,
    pub participants: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoleCount {
    pub label: &'static str,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AdminMetrics {
    pub users_by_role: Vec<RoleCount>,
    pub total_users: usize,
    pub total_opportunities: usize,
    pub total_certificates: usize,
}

/// Horas de um discente usadas nos relatórios.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentHours {
    pub user_id: String,
    pub name: String,
    pub course: String,
    pub completed_hours: u32,
    pub pending_hours: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoursBucket {
    pub label: &'static str,
    pub students: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReportSummary {
    pub completed_hours: u32,
    pub pending_hours: u32,
    pub remaining_hours: u32,
    pub minimum_workload: u32,
    pub distribution: Vec<HoursBucket>,
    pub ranking: Vec<StudentHours>,
    /// Discentes abaixo de metade da carga mínima.
    pub critical: Vec<StudentHours>,
    /// Todos os discentes, por nome (tabela exportada).
    pub students: Vec<StudentHours>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn huge_hour_counts_do_not_overflow() {
        let metrics = StudentMetrics {
            completed_hours: 50_000_000,
            pending_hours: u32::MAX,
            total_required: 120,
            ..Default::default()
        };
        assert_eq!(metrics.progress_percent(), 100);
        assert_eq!(metrics.remaining_hours(), 0);
        assert_eq!(total_hours([u32::MAX, 10]), u32::MAX);
    }

    #[test]
    fn percent_of_rounds_down_and_caps() {
        assert_eq!(percent_of(30, 120), 25);
        assert_eq!(percent_of(500, 120), 100);
        assert_eq!(percent_of(5, 0), 0);
    }

    #[test]
    fn nothing_required_means_complete() {
        let metrics = StudentMetrics::default();
        assert_eq!(metrics.progress_percent(), 100);
    }
}
