// src/services/communication_service.rs
use crate::{
    error::{AppError, AppResult},
    models::{
        notification::{Notification, NotificationKind},
        user::{Role, User},
    },
    repository::PortalRepository,
    services::session_service::SessionContext,
};
use std::{fmt, str::FromStr};

pub const SENDER_ROLES: &[Role] = &[Role::Coordenador, Role::Secretaria];

/// Público de um comunicado.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Audience {
    All,
    Students,
    Teachers,
    /// Coordenação e secretaria.
    Coordination,
    Course(String),
    Semester(u32),
}

impl Audience {
    pub fn includes(&self, user: &User) -> bool {
        match self {
            Audience::All => true,
            Audience::Students => user.has_role(Role::Discente),
            Audience::Teachers => user.has_role(Role::Docente),
            Audience::Coordination => user.has_role(Role::Coordenador) || user.has_role(Role::Secretaria),
            Audience::Course(course) => {
                user.has_role(Role::Discente)
                    && user.course.as_deref().is_some_and(|c| c.eq_ignore_ascii_case(course))
            }
            Audience::Semester(semester) => user.has_role(Role::Discente) && user.semester == Some(*semester),
        }
    }

    pub fn label(&self) -> String {
        match self {
            Audience::All => "Todos os usuários".to_string(),
            Audience::Students => "Apenas discentes".to_string(),
            Audience::Teachers => "Apenas docentes".to_string(),
            Audience::Coordination => "Coordenadores e secretaria".to_string(),
            Audience::Course(course) => format!("Alunos de {}", course),
            Audience::Semester(semester) => format!("Alunos do {}º semestre", semester),
        }
    }
}

/// Valor usado nos formulários (`all`, `students`, `course-<nome>`, `semester-<n>`...).
impl fmt::Display for Audience {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Audience::All => f.write_str("all"),
            Audience::Students => f.write_str("students"),
            Audience::Teachers => f.write_str("teachers"),
            Audience::Coordination => f.write_str("coordinators"),
            Audience::Course(course) => write!(f, "course-{}", course),
            Audience::Semester(semester) => write!(f, "semester-{}", semester),
        }
    }
}

impl FromStr for Audience {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || AppError::Validation(format!("Público desconhecido: '{}'", s));
        match s.trim() {
            "all" => Ok(Audience::All),
            "students" => Ok(Audience::Students),
            "teachers" => Ok(Audience::Teachers),
            "coordinators" => Ok(Audience::Coordination),
            other => {
                if let Some(course) = other.strip_prefix("course-").filter(|c| !c.trim().is_empty()) {
                    Ok(Audience::Course(course.trim().to_string()))
                } else if let Some(semester) = other.strip_prefix("semester-") {
                    semester.parse().map(Audience::Semester).map_err(|_| unknown())
                } else {
                    Err(unknown())
                }
            }
        }
    }
}

/// Opções do formulário: públicos fixos mais cursos e semestres existentes.
pub fn audience_options(users: &[User]) -> Vec<Audience> {
    let mut options = vec![Audience::All, Audience::Students, Audience::Teachers, Audience::Coordination];

    let mut courses: Vec<&str> = users.iter().filter_map(|u| u.course.as_deref()).collect();
    courses.sort_unstable();
    courses.dedup();
    options.extend(courses.into_iter().map(|c| Audience::Course(c.to_string())));

    let mut semesters: Vec<u32> = users.iter().filter_map(|u| u.semester).collect();
    semesters.sort_unstable();
    semesters.dedup();
    options.extend(semesters.into_iter().map(Audience::Semester));
    options
}

/// Envia o comunicado como notificação `info` a cada utilizador do público.
/// Devolve quantos utilizadores foram notificados (0 se as notificações
/// estiverem desativadas).
pub async fn send(
    repo: &dyn PortalRepository,
    ctx: &SessionContext,
    notifications_enabled: bool,
    audience: &Audience,
    subject: &str,
    message: &str,
) -> AppResult<usize> {
    ctx.require_role(SENDER_ROLES)?;
    let sender = ctx.current_user()?;
    if subject.trim().is_empty() || message.trim().is_empty() {
        return Err(AppError::Validation(
            "Assunto e mensagem são obrigatórios.".to_string(),
        ));
    }
    if !notifications_enabled {
        tracing::info!("Comunicado '{}' não enviado: notificações desativadas.", subject.trim());
        return Ok(0);
    }

    let notifications: Vec<_> = repo
        .list_users()
        .await?
        .iter()
        .filter(|user| audience.includes(user))
        .map(|user| {
            Notification::new(
                &user.id,
                NotificationKind::Info,
                subject.trim(),
                message.trim(),
                None,
            )
        })
        .collect();
    let count = notifications.len();
    repo.push_notifications(notifications).await?;
    tracing::info!(
        "📣 Comunicado '{}' enviado por '{}' a {} utilizadores ({})",
        subject.trim(),
        sender.id,
        count,
        audience
    );
    Ok(count)
}
