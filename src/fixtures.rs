// src/fixtures.rs
//! Dados de demonstração usados para semear os repositórios.
use crate::models::{
    approval::{ApprovalRequest, CertificateMetadata, RequestStatus},
    certificate::Certificate,
    group::{Group, GroupMember, Ppc},
    notification::{Notification, NotificationKind},
    opportunity::{
        AttendanceRecord, EnrollmentStatus, Modality, Opportunity, OpportunityStatus, Participant,
    },
    user::{Role, User},
};
use chrono::{DateTime, NaiveDate, Utc};

/// Código aceite pelo ecrã de validação na demonstração.
pub const DEMO_CERTIFICATE_CODE: &str = "VALIDO123";

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
}

fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
    date(y, m, d).and_hms_opt(h, 0, 0).unwrap_or_default().and_utc()
}

fn user(id: &str, name: &str, email: &str, registration: &str, roles: &[Role]) -> User {
    User {
        id: id.into(),
        name: name.into(),
        email: email.into(),
        registration: registration.into(),
        roles: roles.to_vec(),
        course: None,
        semester: None,
    }
}

pub fn users() -> Vec<User> {
    let mut joao = user(
        "1",
        "João Silva",
        "joao.silva@universidade.edu.br",
        "2021001234",
        &[Role::Discente],
    );
    joao.course = Some("Engenharia de Software".into());
    joao.semester = Some(6);

    let mut pedro = user(
        "6",
        "Pedro Costa",
        "pedro.costa@universidade.edu.br",
        "2020004321",
        &[Role::Discente],
    );
    pedro.course = Some("Administração".into());
    pedro.semester = Some(8);

    let mut maria_santos = user(
        "7",
        "Maria Santos",
        "maria.santos@universidade.edu.br",
        "2019007788",
        &[Role::Discente],
    );
    maria_santos.course = Some("Engenharia Civil".into());
    maria_santos.semester = Some(9);

    vec![
        joao,
        user(
            "2",
            "Maria Souza",
            "maria.souza@universidade.edu.br",
            "1234567",
            &[Role::Docente],
        ),
        user(
            "3",
            "Carlos Mendes",
            "carlos.mendes@universidade.edu.br",
            "7654321",
            &[Role::Coordenador, Role::Docente],
        ),
        user(
            "4",
            "Ana Paula Ribeiro",
            "ana.ribeiro@universidade.edu.br",
            "5551234",
            &[Role::Secretaria],
        ),
        user(
            "5",
            "Roberto Lima",
            "admin@universidade.edu.br",
            "0000001",
            &[Role::Administrador],
        ),
        pedro,
        maria_santos,
    ]
}

fn participant(
    user_id: &str,
    user_name: &str,
    user_email: &str,
    status: EnrollmentStatus,
    enrolled_at: DateTime<Utc>,
    attendance: Vec<AttendanceRecord>,
) -> Participant {
    Participant {
        user_id: user_id.into(),
        user_name: user_name.into(),
        user_email: user_email.into(),
        status,
        enrolled_at,
        completed_hours: attendance.iter().map(|a| a.hours).sum(),
        attendance,
    }
}

fn attendance(y: i32, m: u32, d: u32, hours: u32, description: &str) -> AttendanceRecord {
    AttendanceRecord {
        date: date(y, m, d),
        hours,
        description: description.into(),
    }
}

#[allow(clippy::too_many_arguments)]
fn opportunity(
    id: &str,
    title: &str,
    description: &str,
    modality: Modality,
    workload: u32,
    (start_date, end_date): (NaiveDate, NaiveDate),
    (vacancies, available_vacancies): (u32, u32),
    status: OpportunityStatus,
    (responsible_id, responsible_name): (&str, &str),
    created_by: &str,
    participants: Vec<Participant>,
) -> Opportunity {
    Opportunity {
        id: id.into(),
        title: title.into(),
        description: description.into(),
        modality,
        workload,
        start_date,
        end_date,
        vacancies,
        available_vacancies,
        status,
        responsible_id: responsible_id.into(),
        responsible_name: responsible_name.into(),
        created_by: created_by.into(),
        created_at: at(2025, 1, 15, 10),
        participants,
        version: 1,
    }
}

pub fn opportunities() -> Vec<Opportunity> {
    vec![
        opportunity(
            "1",
            "Oficina de Fotografia Comunitária",
            "Oficina prática de fotografia com registo de histórias do bairro.",
            Modality::Oficina,
            20,
            (date(2025, 6, 2), date(2025, 6, 27)),
            (30, 12),
            OpportunityStatus::Aberta,
            ("2", "Maria Souza"),
            "2",
            vec![participant(
                "1",
                "João Silva",
                "joao.silva@universidade.edu.br",
                EnrollmentStatus::Inscrito,
                at(2025, 5, 12, 14),
                vec![],
            )],
        ),
        opportunity(
            "2",
            "Projeto Horta Escolar",
            "Implantação e manutenção de hortas em escolas públicas do município.",
            Modality::Projeto,
            60,
            (date(2025, 3, 10), date(2025, 11, 28)),
            (15, 0),
            OpportunityStatus::EmExecucao,
            ("3", "Carlos Mendes"),
            "3",
            vec![
                participant(
                    "1",
                    "João Silva",
                    "joao.silva@universidade.edu.br",
                    EnrollmentStatus::Aprovado,
                    at(2025, 3, 1, 9),
                    vec![
                        attendance(2025, 3, 15, 8, "Preparação dos canteiros"),
                        attendance(2025, 4, 12, 8, "Plantio com as turmas"),
                        attendance(2025, 5, 10, 8, "Oficina de compostagem"),
                    ],
                ),
                participant(
                    "6",
                    "Pedro Costa",
                    "pedro.costa@universidade.edu.br",
                    EnrollmentStatus::Aprovado,
                    at(2025, 3, 2, 11),
                    vec![attendance(2025, 3, 15, 8, "Preparação dos canteiros")],
                ),
            ],
        ),
        opportunity(
            "3",
            "Curso de Libras Básico",
            "Introdução à Língua Brasileira de Sinais para a comunidade.",
            Modality::Curso,
            40,
            (date(2025, 8, 4), date(2025, 9, 26)),
            (25, 25),
            OpportunityStatus::Publicada,
            ("2", "Maria Souza"),
            "2",
            vec![],
        ),
        opportunity(
            "4",
            "Semana de Inovação e Tecnologia",
            "Evento proposto pelos discentes com palestras e hackathon.",
            Modality::Evento,
            16,
            (date(2025, 10, 20), date(2025, 10, 24)),
            (200, 200),
            OpportunityStatus::AguardandoAprovacao,
            ("2", "Maria Souza"),
            "1",
            vec![],
        ),
        opportunity(
            "5",
            "Assessoria Jurídica Popular",
            "Atendimento jurídico gratuito supervisionado à comunidade.",
            Modality::PrestacaoServico,
            80,
            (date(2025, 4, 1), date(2025, 12, 12)),
            (10, 3),
            OpportunityStatus::Aberta,
            ("3", "Carlos Mendes"),
            "3",
            vec![],
        ),
        opportunity(
            "6",
            "Curso de React.js",
            "Desenvolvimento de interfaces web modernas com React.",
            Modality::Curso,
            40,
            (date(2025, 2, 3), date(2025, 3, 14)),
            (30, 0),
            OpportunityStatus::Encerrada,
            ("2", "Maria Souza"),
            "2",
            vec![participant(
                "1",
                "João Silva",
                "joao.silva@universidade.edu.br",
                EnrollmentStatus::Aprovado,
                at(2025, 1, 20, 10),
                vec![
                    attendance(2025, 2, 14, 20, "Módulos 1 a 4"),
                    attendance(2025, 3, 14, 20, "Módulos 5 a 8 e projeto final"),
                ],
            )],
        ),
        opportunity(
            "7",
            "Mutirão de Saúde Bucal",
            "Ação de orientação e triagem odontológica.",
            Modality::Evento,
            8,
            (date(2025, 5, 17), date(2025, 5, 17)),
            (40, 40),
            OpportunityStatus::Cancelada,
            ("3", "Carlos Mendes"),
            "3",
            vec![],
        ),
        opportunity(
            "8",
            "Oficina de Escrita Acadêmica",
            "Técnicas de escrita científica para estudantes de graduação.",
            Modality::Oficina,
            12,
            (date(2025, 9, 1), date(2025, 9, 12)),
            (20, 20),
            OpportunityStatus::Rascunho,
            ("2", "Maria Souza"),
            "2",
            vec![],
        ),
    ]
}

#[allow(clippy::too_many_arguments)]
fn request(
    id: &str,
    (user_id, user_name, user_email): (&str, &str, &str),
    description: &str,
    requested_hours: u32,
    (issuer, cert_date, title): (&str, NaiveDate, &str),
    status: RequestStatus,
    submitted_at: DateTime<Utc>,
    review: Option<(DateTime<Utc>, &str, &str, &str)>,
) -> ApprovalRequest {
    ApprovalRequest {
        id: id.into(),
        user_id: user_id.into(),
        user_name: user_name.into(),
        user_email: user_email.into(),
        description: description.into(),
        requested_hours,
        certificate_file: format!("certificado-{}.pdf", id),
        certificate_metadata: CertificateMetadata {
            issuer: issuer.into(),
            date: cert_date,
            title: title.into(),
        },
        status,
        submitted_at,
        reviewed_at: review.map(|r| r.0),
        reviewed_by: review.map(|r| r.1.to_string()),
        reviewer_name: review.map(|r| r.2.to_string()),
        feedback: review.map(|r| r.3.to_string()),
        deadline: Some(submitted_at.date_naive() + chrono::Duration::days(30)),
        version: 1,
    }
}

pub fn approval_requests() -> Vec<ApprovalRequest> {
    vec![
        request(
            "1",
            ("1", "João Silva", "joao.silva@universidade.edu.br"),
            "Voluntariado em ações de reforço escolar.",
            20,
            ("ONG Amigos do Bairro", date(2025, 4, 30), "Voluntariado Educacional"),
            RequestStatus::Pendente,
            at(2025, 5, 10, 15),
            None,
        ),
        request(
            "2",
            ("1", "João Silva", "joao.silva@universidade.edu.br"),
            "Monitoria da disciplina de Programação I.",
            30,
            ("Departamento de Computação", date(2024, 12, 15), "Monitoria de Programação"),
            RequestStatus::Aprovado,
            at(2025, 1, 8, 9),
            Some((at(2025, 1, 20, 16), "3", "Carlos Mendes", "Atividade compatível com o PPC.")),
        ),
        request(
            "3",
            ("6", "Pedro Costa", "pedro.costa@universidade.edu.br"),
            "Curso online de planilhas eletrónicas.",
            15,
            ("Plataforma EAD Livre", date(2025, 2, 1), "Excel Avançado"),
            RequestStatus::Indeferido,
            at(2025, 2, 5, 11),
            Some((at(2025, 2, 18, 10), "4", "Ana Paula Ribeiro", "Atividade não caracteriza extensão universitária.")),
        ),
        request(
            "4",
            ("7", "Maria Santos", "maria.santos@universidade.edu.br"),
            "Participação na organização do congresso regional.",
            10,
            ("Sociedade de Engenharia", date(2025, 4, 5), "Comissão Organizadora"),
            RequestStatus::EmAnalise,
            at(2025, 4, 20, 13),
            None,
        ),
    ]
}

fn certificate(
    id: &str,
    code: &str,
    (user_id, user_name): (&str, &str),
    opportunity: Option<&str>,
    opportunity_title: &str,
    workload: u32,
    issue_date: NaiveDate,
) -> Certificate {
    Certificate {
        id: id.into(),
        code: code.into(),
        user_id: user_id.into(),
        user_name: user_name.into(),
        opportunity_id: opportunity.map(str::to_string),
        opportunity_title: opportunity_title.into(),
        workload,
        issue_date,
        qr_code: Certificate::qr_path(code),
    }
}

pub fn certificates() -> Vec<Certificate> {
    vec![
        certificate(
            "1",
            DEMO_CERTIFICATE_CODE,
            ("1", "João Silva"),
            Some("6"),
            "React.js",
            40,
            date(2025, 3, 20),
        ),
        certificate(
            "2",
            "EXT-7F3A9C21",
            ("1", "João Silva"),
            None,
            "Palestra sobre Sustentabilidade",
            4,
            date(2024, 11, 8),
        ),
        certificate(
            "3",
            "EXT-2B8D4E10",
            ("6", "Pedro Costa"),
            None,
            "Semana Acadêmica 2024",
            12,
            date(2024, 10, 30),
        ),
    ]
}

pub fn groups() -> Vec<Group> {
    vec![
        Group {
            id: "1".into(),
            name: "Liga Acadêmica de Empreendedorismo".into(),
            description: "Promove eventos e mentorias de empreendedorismo social.".into(),
            email: "liga.empreende@universidade.edu.br".into(),
            responsible_id: "2".into(),
            responsible_name: "Maria Souza".into(),
            members: vec![
                GroupMember {
                    user_id: "1".into(),
                    user_name: "João Silva".into(),
                    role: Some("Diretor de Eventos".into()),
                    joined_at: date(2024, 3, 1),
                },
                GroupMember {
                    user_id: "6".into(),
                    user_name: "Pedro Costa".into(),
                    role: None,
                    joined_at: date(2024, 8, 12),
                },
            ],
            created_at: at(2024, 2, 20, 10),
        },
        Group {
            id: "2".into(),
            name: "Núcleo de Extensão em Saúde".into(),
            description: "Articula ações de saúde comunitária com os cursos da área.".into(),
            email: "nes@universidade.edu.br".into(),
            responsible_id: "3".into(),
            responsible_name: "Carlos Mendes".into(),
            members: vec![GroupMember {
                user_id: "7".into(),
                user_name: "Maria Santos".into(),
                role: Some("Secretária".into()),
                joined_at: date(2024, 9, 2),
            }],
            created_at: at(2024, 8, 1, 9),
        },
    ]
}

pub fn ppcs() -> Vec<Ppc> {
    vec![
        Ppc {
            id: "1".into(),
            version: "2019.1".into(),
            minimum_workload: 90,
            created_by: "Carlos Mendes".into(),
            created_at: at(2018, 11, 5, 10),
            effective_from: date(2019, 2, 1),
            effective_until: Some(date(2022, 12, 31)),
        },
        Ppc {
            id: "2".into(),
            version: "2023.1".into(),
            minimum_workload: 120,
            created_by: "Carlos Mendes".into(),
            created_at: at(2022, 10, 10, 10),
            effective_from: date(2023, 1, 1),
            effective_until: None,
        },
    ]
}

#[allow(clippy::too_many_arguments)]
fn notification(
    id: &str,
    user_id: &str,
    kind: NotificationKind,
    title: &str,
    message: &str,
    read: bool,
    created_at: DateTime<Utc>,
    action_url: Option<&str>,
) -> Notification {
    Notification {
        id: id.into(),
        user_id: user_id.into(),
        kind,
        title: title.into(),
        message: message.into(),
        read,
        created_at,
        action_url: action_url.map(str::to_string),
    }
}

pub fn notifications() -> Vec<Notification> {
    vec![
        notification(
            "1",
            "1",
            NotificationKind::Success,
            "Solicitação aprovada",
            "A sua solicitação de 30h de monitoria foi aprovada.",
            true,
            at(2025, 1, 20, 16),
            Some("/approval-requests"),
        ),
        notification(
            "2",
            "1",
            NotificationKind::Info,
            "Nova oportunidade disponível",
            "Inscrições abertas para a Assessoria Jurídica Popular.",
            false,
            at(2025, 5, 2, 8),
            Some("/opportunities"),
        ),
        notification(
            "3",
            "1",
            NotificationKind::Warning,
            "Prazo a aproximar-se",
            "Faltam 30 horas para atingir a carga mínima do PPC.",
            false,
            at(2025, 5, 20, 8),
            None,
        ),
        notification(
            "4",
            "3",
            NotificationKind::Info,
            "Nova solicitação de aproveitamento",
            "João Silva enviou uma solicitação de 20h.",
            false,
            at(2025, 5, 10, 15),
            Some("/approval-requests"),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn every_user_has_roles_and_unique_email() {
        let users = users();
        let emails: HashSet<_> = users.iter().map(|u| u.email.to_lowercase()).collect();
        assert_eq!(emails.len(), users.len());
        assert!(users.iter().all(|u| !u.roles.is_empty()));
    }

    #[test]
    fn opportunities_respect_vacancy_invariant() {
        for opportunity in opportunities() {
            assert!(opportunity.available_vacancies <= opportunity.vacancies, "{}", opportunity.id);
            assert!(opportunity.end_date >= opportunity.start_date, "{}", opportunity.id);
        }
    }

    #[test]
    fn demo_certificate_belongs_to_joao() {
        let certificate = certificates()
            .into_iter()
            .find(|c| c.code == DEMO_CERTIFICATE_CODE)
            .unwrap();
        assert_eq!(certificate.user_name, "João Silva");
        assert_eq!(certificate.workload, 40);
    }
}
