// src/models/opportunity.rs
use crate::{
    error::AppError,
    models::{metrics::percent_of, user::Role, MAX_ATTENDANCE_HOURS, MAX_HOURS, MAX_VACANCIES},
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

// --- Estados da oportunidade ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpportunityStatus {
    Rascunho,
    AguardandoAprovacao,
    Publicada,
    Aberta,
    EmExecucao,
    Encerrada,
    Cancelada,
}

impl OpportunityStatus {
    pub const ALL: [OpportunityStatus; 7] = [
        OpportunityStatus::Rascunho,
        OpportunityStatus::AguardandoAprovacao,
        OpportunityStatus::Publicada,
        OpportunityStatus::Aberta,
        OpportunityStatus::EmExecucao,
        OpportunityStatus::Encerrada,
        OpportunityStatus::Cancelada,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OpportunityStatus::Rascunho => "rascunho",
            OpportunityStatus::AguardandoAprovacao => "aguardando_aprovacao",
            OpportunityStatus::Publicada => "publicada",
            OpportunityStatus::Aberta => "aberta",
            OpportunityStatus::EmExecucao => "em_execucao",
            OpportunityStatus::Encerrada => "encerrada",
            OpportunityStatus::Cancelada => "cancelada",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            OpportunityStatus::Rascunho => "Rascunho",
            OpportunityStatus::AguardandoAprovacao => "Aguardando Aprovação",
            OpportunityStatus::Publicada => "Publicada",
            OpportunityStatus::Aberta => "Aberta",
            OpportunityStatus::EmExecucao => "Em Execução",
            OpportunityStatus::Encerrada => "Encerrada",
            OpportunityStatus::Cancelada => "Cancelada",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OpportunityStatus::Encerrada | OpportunityStatus::Cancelada)
    }

    /// Oportunidades "ativas" nos painéis de coordenação.
    pub fn is_active(&self) -> bool {
        matches!(self, OpportunityStatus::Aberta | OpportunityStatus::EmExecucao)
    }

    /// Visível no portal público.
    pub fn is_public(&self) -> bool {
        matches!(self, OpportunityStatus::Aberta | OpportunityStatus::Publicada)
    }
}

impl fmt::Display for OpportunityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for OpportunityStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OpportunityStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| AppError::Validation(format!("Estado desconhecido: '{}'", s)))
    }
}

/// Ações administrativas que movem uma oportunidade na máquina de estados.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpportunityAction {
    Submit,
    Approve,
    Open,
    Start,
    Close,
    Cancel,
}

impl OpportunityAction {
    pub const ALL: [OpportunityAction; 6] = [
        OpportunityAction::Submit,
        OpportunityAction::Approve,
        OpportunityAction::Open,
        OpportunityAction::Start,
        OpportunityAction::Close,
        OpportunityAction::Cancel,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OpportunityAction::Submit => "submit",
            OpportunityAction::Approve => "approve",
            OpportunityAction::Open => "open",
            OpportunityAction::Start => "start",
            OpportunityAction::Close => "close",
            OpportunityAction::Cancel => "cancel",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            OpportunityAction::Submit => "Enviar para aprovação",
            OpportunityAction::Approve => "Aprovar e publicar",
            OpportunityAction::Open => "Abrir inscrições",
            OpportunityAction::Start => "Iniciar execução",
            OpportunityAction::Close => "Encerrar",
            OpportunityAction::Cancel => "Cancelar",
        }
    }

    /// Estado resultante, se a ação for válida a partir de `from`.
    pub fn transition(&self, from: OpportunityStatus) -> Option<OpportunityStatus> {
        use OpportunityStatus::*;
        match (self, from) {
            (OpportunityAction::Submit, Rascunho) => Some(AguardandoAprovacao),
            (OpportunityAction::Approve, AguardandoAprovacao) => Some(Publicada),
            (OpportunityAction::Open, Publicada) => Some(Aberta),
            (OpportunityAction::Start, Aberta) => Some(EmExecucao),
            (OpportunityAction::Close, EmExecucao) => Some(Encerrada),
            (OpportunityAction::Cancel, status) if !status.is_terminal() => Some(Cancelada),
            _ => None,
        }
    }

    pub fn allowed_roles(&self) -> &'static [Role] {
        match self {
            OpportunityAction::Submit => &[Role::Discente, Role::Docente, Role::Coordenador],
            OpportunityAction::Approve | OpportunityAction::Cancel => &[Role::Coordenador],
            OpportunityAction::Open | OpportunityAction::Start | OpportunityAction::Close => {
                &[Role::Docente, Role::Coordenador]
            }
        }
    }
}

// --- Modalidades ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modality {
    Oficina,
    Curso,
    Projeto,
    Evento,
    PrestacaoServico,
    Outro,
}

impl Modality {
    pub const ALL: [Modality; 6] = [
        Modality::Oficina,
        Modality::Curso,
        Modality::Projeto,
        Modality::Evento,
        Modality::PrestacaoServico,
        Modality::Outro,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Modality::Oficina => "oficina",
            Modality::Curso => "curso",
            Modality::Projeto => "projeto",
            Modality::Evento => "evento",
            Modality::PrestacaoServico => "prestacao_servico",
            Modality::Outro => "outro",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Modality::Oficina => "Oficina",
            Modality::Curso => "Curso",
            Modality::Projeto => "Projeto",
            Modality::Evento => "Evento",
            Modality::PrestacaoServico => "Prestação de Serviço",
            Modality::Outro => "Outro",
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Modality {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Modality::ALL
            .into_iter()
            .find(|modality| modality.as_str() == s)
            .ok_or_else(|| AppError::Validation(format!("Modalidade desconhecida: '{}'", s)))
    }
}

// --- Participantes ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnrollmentStatus {
    Inscrito,
    Aprovado,
    Rejeitado,
    Cancelado,
}

impl EnrollmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnrollmentStatus::Inscrito => "inscrito",
            EnrollmentStatus::Aprovado => "aprovado",
            EnrollmentStatus::Rejeitado => "rejeitado",
            EnrollmentStatus::Cancelado => "cancelado",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            EnrollmentStatus::Inscrito => "Inscrito",
            EnrollmentStatus::Aprovado => "Aprovado",
            EnrollmentStatus::Rejeitado => "Rejeitado",
            EnrollmentStatus::Cancelado => "Cancelado",
        }
    }

    /// Participação que ainda conta para certificado.
    pub fn is_valid(&self) -> bool {
        matches!(self, EnrollmentStatus::Inscrito | EnrollmentStatus::Aprovado)
    }
}

impl fmt::Display for EnrollmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for EnrollmentStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inscrito" => Ok(EnrollmentStatus::Inscrito),
            "aprovado" => Ok(EnrollmentStatus::Aprovado),
            "rejeitado" => Ok(EnrollmentStatus::Rejeitado),
            "cancelado" => Ok(EnrollmentStatus::Cancelado),
            other => Err(AppError::Validation(format!(
                "Estado de inscrição desconhecido: '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub date: NaiveDate,
    pub hours: u32,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub user_id: String,
    pub user_name: String,
    pub user_email: String,
    pub status: EnrollmentStatus,
    pub enrolled_at: DateTime<Utc>,
    pub completed_hours: u32,
    pub attendance: Vec<AttendanceRecord>,
}

// --- Oportunidade ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    pub id: String,
    pub title: String,
    pub description: String,
    pub modality: Modality,
    pub workload: u32, // carga horária
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub vacancies: u32,
    pub available_vacancies: u32,
    pub status: OpportunityStatus,
    pub responsible_id: String,
    pub responsible_name: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub participants: Vec<Participant>,
    /// Token de concorrência otimista; incrementa a cada escrita.
    pub version: i64,
}

impl Opportunity {
    /// Regra de elegibilidade: inscrições abertas e vagas disponíveis.
    pub fn can_enroll(&self) -> bool {
        self.status == OpportunityStatus::Aberta && self.available_vacancies > 0
    }

    pub fn participant(&self, user_id: &str) -> Option<&Participant> {
        self.participants.iter().find(|p| p.user_id == user_id)
    }

    pub fn is_enrolled(&self, user_id: &str) -> bool {
        self.participant(user_id).is_some()
    }

    pub fn filled_vacancies(&self) -> u32 {
        self.vacancies.saturating_sub(self.available_vacancies)
    }

    /// Percentagem de vagas preenchidas (0-100).
    pub fn fill_percent(&self) -> u32 {
        percent_of(self.filled_vacancies(), self.vacancies)
    }

    /// Ações que a máquina de estados aceita a partir do estado atual para o perfil dado.
    pub fn available_actions(&self, role: Role) -> Vec<OpportunityAction> {
        OpportunityAction::ALL
            .into_iter()
            .filter(|action| action.allowed_roles().contains(&role))
            .filter(|action| action.transition(self.status).is_some())
            .collect()
    }

    /// Inscreve o participante e consome uma vaga.
    pub fn apply_enrollment(&mut self, participant: Participant) -> Result<(), AppError> {
        if self.is_enrolled(&participant.user_id) {
            return Err(AppError::Conflict(
                "Já está inscrito nesta oportunidade.".to_string(),
            ));
        }
        if !self.can_enroll() {
            return Err(AppError::Validation(
                "Inscrições fechadas ou sem vagas disponíveis.".to_string(),
            ));
        }
        self.available_vacancies -= 1;
        self.participants.push(participant);
        self.version += 1;
        Ok(())
    }

    /// Regista presença de um participante durante a execução.
    pub fn apply_attendance(&mut self, user_id: &str, record: AttendanceRecord) -> Result<(), AppError> {
        if self.status != OpportunityStatus::EmExecucao {
            return Err(AppError::Validation(
                "Só é possível registar presença durante a execução.".to_string(),
            ));
        }
        if record.hours == 0 {
            return Err(AppError::Validation("Informe as horas da presença.".to_string()));
        }
        if record.hours > MAX_ATTENDANCE_HOURS {
            return Err(AppError::Validation(format!(
                "Uma presença tem no máximo {}h.",
                MAX_ATTENDANCE_HOURS
            )));
        }
        let participant = self
            .participants
            .iter_mut()
            .find(|p| p.user_id == user_id)
            .ok_or(AppError::NotFound("participante"))?;
        participant.completed_hours = participant.completed_hours.saturating_add(record.hours);
        participant.attendance.push(record);
        self.version += 1;
        Ok(())
    }
}

/// Dados de criação vindos do formulário.
#[derive(Debug, Clone)]
pub struct NewOpportunity {
    pub title: String,
    pub description: String,
    pub modality: Modality,
    pub workload: u32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub vacancies: u32,
    pub responsible_id: String,
    pub responsible_name: String,
    pub created_by: String,
}

impl NewOpportunity {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.title.trim().is_empty() || self.description.trim().is_empty() {
            return Err(AppError::Validation(
                "Título e descrição são obrigatórios.".to_string(),
            ));
        }
        if self.workload == 0 {
            return Err(AppError::Validation(
                "A carga horária deve ser de pelo menos 1 hora.".to_string(),
            ));
        }
        if self.workload > MAX_HOURS {
            return Err(AppError::Validation(format!(
                "A carga horária não pode passar de {}h.",
                MAX_HOURS
            )));
        }
        if self.vacancies == 0 {
            return Err(AppError::Validation("Informe pelo menos 1 vaga.".to_string()));
        }
        if self.vacancies > MAX_VACANCIES {
            return Err(AppError::Validation(format!(
                "Uma oportunidade tem no máximo {} vagas.",
                MAX_VACANCIES
            )));
        }
        if self.end_date < self.start_date {
            return Err(AppError::Validation(
                "A data de término deve ser posterior à de início.".to_string(),
            ));
        }
        Ok(())
    }
}

/// Filtros da listagem ("all" = sem filtro).
#[derive(Debug, Clone, Default)]
pub struct OpportunityFilter {
    pub search: Option<String>,
    pub status: Option<OpportunityStatus>,
    pub modality: Option<Modality>,
    /// Portal público: apenas abertas ou publicadas.
    pub public_only: bool,
}

impl OpportunityFilter {
    pub fn matches(&self, opportunity: &Opportunity) -> bool {
        if self.public_only && !opportunity.status.is_public() {
            return false;
        }
        if let Some(status) = self.status {
            if opportunity.status != status {
                return false;
            }
        }
        if let Some(modality) = self.modality {
            if opportunity.modality != modality {
                return false;
            }
        }
        match self.search.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => {
                let term = term.to_lowercase();
                opportunity.title.to_lowercase().contains(&term)
                    || opportunity.description.to_lowercase().contains(&term)
            }
            _ => true,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status.is_some()
            || self.modality.is_some()
            || self.search.as_deref().is_some_and(|s| !s.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    fn open_opportunity(available: u32) -> Opportunity {
        let mut opportunity = fixtures::opportunities().remove(0);
        opportunity.status = OpportunityStatus::Aberta;
        opportunity.vacancies = 2;
        opportunity.available_vacancies = available;
        opportunity.participants.clear();
        opportunity
    }

    fn participant(user_id: &str) -> Participant {
        Participant {
            user_id: user_id.into(),
            user_name: "Teste".into(),
            user_email: "teste@universidade.edu.br".into(),
            status: EnrollmentStatus::Inscrito,
            enrolled_at: Utc::now(),
            completed_hours: 0,
            attendance: vec![],
        }
    }

    #[test]
    fn linear_transitions_follow_the_lifecycle() {
        use OpportunityStatus::*;
        let path = [
            (OpportunityAction::Submit, Rascunho, AguardandoAprovacao),
            (OpportunityAction::Approve, AguardandoAprovacao, Publicada),
            (OpportunityAction::Open, Publicada, Aberta),
            (OpportunityAction::Start, Aberta, EmExecucao),
            (OpportunityAction::Close, EmExecucao, Encerrada),
        ];
        for (action, from, to) in path {
            assert_eq!(action.transition(from), Some(to), "{:?} from {:?}", action, from);
            for other in OpportunityStatus::ALL.into_iter().filter(|s| *s != from) {
                assert_eq!(action.transition(other), None, "{:?} from {:?}", action, other);
            }
        }
    }

    #[test]
    fn cancel_is_reachable_only_from_non_terminal_states() {
        for status in OpportunityStatus::ALL {
            let expected = (!status.is_terminal()).then_some(OpportunityStatus::Cancelada);
            assert_eq!(OpportunityAction::Cancel.transition(status), expected);
        }
    }

    #[test]
    fn enrollment_consumes_one_vacancy_and_bumps_version() {
        let mut opportunity = open_opportunity(1);
        let version = opportunity.version;
        opportunity.apply_enrollment(participant("u1")).unwrap();
        assert_eq!(opportunity.available_vacancies, 0);
        assert_eq!(opportunity.version, version + 1);
        assert!(!opportunity.can_enroll());

        let err = opportunity.apply_enrollment(participant("u2")).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(opportunity.available_vacancies, 0);
    }

    #[test]
    fn enrolling_twice_is_a_conflict() {
        let mut opportunity = open_opportunity(2);
        opportunity.apply_enrollment(participant("u1")).unwrap();
        let err = opportunity.apply_enrollment(participant("u1")).unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(opportunity.available_vacancies, 1);
    }

    #[test]
    fn enrollment_requires_open_status() {
        let mut opportunity = open_opportunity(2);
        opportunity.status = OpportunityStatus::Publicada;
        assert!(!opportunity.can_enroll());
        assert!(opportunity.apply_enrollment(participant("u1")).is_err());
    }

    #[test]
    fn attendance_hours_are_bounded_per_record() {
        let mut opportunity = open_opportunity(1);
        opportunity.apply_enrollment(participant("u1")).unwrap();
        opportunity.status = OpportunityStatus::EmExecucao;
        let record = |hours| AttendanceRecord {
            date: Utc::now().date_naive(),
            hours,
            description: "Encontro".into(),
        };

        let err = opportunity.apply_attendance("u1", record(MAX_ATTENDANCE_HOURS + 1)).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        opportunity.apply_attendance("u1", record(8)).unwrap();
        assert_eq!(opportunity.participant("u1").unwrap().completed_hours, 8);
    }

    #[test]
    fn filter_matches_search_status_and_modality() {
        let opportunity = open_opportunity(2);
        let mut filter = OpportunityFilter {
            search: Some(opportunity.title.to_uppercase()),
            ..Default::default()
        };
        assert!(filter.matches(&opportunity));
        filter.status = Some(OpportunityStatus::Encerrada);
        assert!(!filter.matches(&opportunity));
        filter.status = None;
        filter.modality = Some(opportunity.modality);
        assert!(filter.matches(&opportunity));
        filter.search = Some("nada-parecido".into());
        assert!(!filter.matches(&opportunity));
    }

    #[test]
    fn new_opportunity_validation() {
        let today = Utc::now().date_naive();
        let mut new = NewOpportunity {
            title: "Oficina".into(),
            description: "Descrição".into(),
            modality: Modality::Oficina,
            workload: 10,
            start_date: today,
            end_date: today,
            vacancies: 5,
            responsible_id: "2".into(),
            responsible_name: "Maria".into(),
            created_by: "2".into(),
        };
        assert!(new.validate().is_ok());
        new.end_date = today.pred_opt().unwrap();
        assert!(new.validate().is_err());
        new.end_date = today;
        new.vacancies = 0;
        assert!(new.validate().is_err());
        new.vacancies = MAX_VACANCIES + 1;
        assert!(new.validate().is_err());
        new.vacancies = 5;
        new.workload = MAX_HOURS + 1;
        assert!(new.validate().is_err());
    }

    #[test]
    fn fill_percent_handles_huge_vacancy_counts() {
        let mut opportunity = open_opportunity(0);
        opportunity.vacancies = u32::MAX;
        opportunity.available_vacancies = 0;
        assert_eq!(opportunity.fill_percent(), 100);
    }
}
