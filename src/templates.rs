// src/templates.rs
use crate::{
    models::{
        approval::ApprovalRequest,
        certificate::Certificate,
        group::{Group, Ppc},
        metrics::{AdminMetrics, CoordinatorMetrics, ReportSummary, StudentMetrics, TeacherMetrics},
        notification::Notification,
        opportunity::{Opportunity, OpportunityAction, Participant},
        user::User,
    },
    services::{
        approval_service::RequestStats, certificate_service::CertificateStats,
        dashboard_service::Dashboard, opportunity_service::EnrollmentView,
    },
};
use askama::Template;

// --- Peças partilhadas ---

/// Opção de `<select>` ou caixa de seleção já marcada ou não.
#[derive(Debug, Clone)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

impl SelectOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>, selected: bool) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
            selected,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NavLink {
    pub path: &'static str,
    pub label: &'static str,
    pub active: bool,
}

/// Cabeçalho, barra lateral e navegação inferior de todas as páginas autenticadas.
#[derive(Debug, Clone)]
pub struct Shell {
    pub title: &'static str,
    pub current_path: &'static str,
    pub user_name: String,
    pub initials: String,
    pub registration: String,
    pub role_label: &'static str,
    pub roles: Vec<SelectOption>,
    pub nav: Vec<NavLink>,
    pub mobile_nav: Vec<NavLink>,
    pub notifications: Vec<Notification>,
    pub unread: usize,
    pub high_contrast: bool,
    pub success: Option<String>,
    pub error: Option<String>,
}

impl Shell {
    /// O seletor de perfil só aparece com mais de um perfil.
    pub fn can_switch(&self) -> bool {
        self.roles.len() > 1
    }
}

// --- Páginas públicas ---

/// Página devolvida por `AppError::into_response`.
#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorPage {
    pub status_code: u16,
    pub message: String,
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginPage {
    pub email: String,
    pub error: Option<String>,
    pub success: Option<String>,
}

#[derive(Template)]
#[template(path = "signup.html")]
pub struct SignupPage {
    pub name: String,
    pub registration: String,
    pub email: String,
    pub domain: &'static str,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "signup_verify.html")]
pub struct SignupVerifyPage {
    pub email: String,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "forgot_password.html")]
pub struct ForgotPasswordPage {
    pub email: String,
    pub sent: bool,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "validate_certificate.html")]
pub struct ValidateCertificatePage {
    pub code: String,
    pub checked: bool,
    pub valid: bool,
    pub message: String,
    pub certificate: Option<Certificate>,
}

#[derive(Template)]
#[template(path = "public_portal.html")]
pub struct PublicPortalPage {
    pub opportunities: Vec<Opportunity>,
    pub total: usize,
    pub search: String,
    pub modalities: Vec<SelectOption>,
    pub logged_in: bool,
}

// --- Páginas autenticadas ---

pub struct StudentPanel {
    pub metrics: StudentMetrics,
    pub recent_requests: Vec<ApprovalRequest>,
    pub open_opportunities: Vec<Opportunity>,
}

pub struct TeacherPanel {
    pub metrics: TeacherMetrics,
    pub opportunities: Vec<Opportunity>,
}

pub struct CoordinationPanel {
    pub metrics: CoordinatorMetrics,
    pub pending_requests: Vec<ApprovalRequest>,
}

#[derive(Template)]
#[template(path = "dashboard.html")]
pub struct DashboardPage {
    pub shell: Shell,
    pub student: Option<StudentPanel>,
    pub teacher: Option<TeacherPanel>,
    pub coordination: Option<CoordinationPanel>,
    pub admin: Option<AdminMetrics>,
}

impl DashboardPage {
    pub fn new(shell: Shell, dashboard: Dashboard) -> Self {
        let mut page = Self {
            shell,
            student: None,
            teacher: None,
            coordination: None,
            admin: None,
        };
        match dashboard {
            Dashboard::Student {
                metrics,
                recent_requests,
                open_opportunities,
            } => {
                page.student = Some(StudentPanel {
                    metrics,
                    recent_requests,
                    open_opportunities,
                })
            }
            Dashboard::Teacher { metrics, opportunities } => {
                page.teacher = Some(TeacherPanel { metrics, opportunities })
            }
            Dashboard::Coordination {
                metrics,
                pending_requests,
            } => {
                page.coordination = Some(CoordinationPanel {
                    metrics,
                    pending_requests,
                })
            }
            Dashboard::Admin { metrics } => page.admin = Some(metrics),
        }
        page
    }
}

/// Linha da listagem de oportunidades.
pub struct OpportunityRow {
    pub opportunity: Opportunity,
    pub enrolled: bool,
    pub can_enroll: bool,
}

#[derive(Template)]
#[template(path = "opportunities.html")]
pub struct OpportunitiesPage {
    pub shell: Shell,
    pub rows: Vec<OpportunityRow>,
    pub total: usize,
    pub search: String,
    pub filtered: bool,
    pub statuses: Vec<SelectOption>,
    pub modalities: Vec<SelectOption>,
    /// Modalidades do formulário de criação (sem "todas").
    pub modality_choices: Vec<SelectOption>,
    pub can_create: bool,
}

#[derive(Template)]
#[template(path = "opportunity_detail.html")]
pub struct OpportunityDetailPage {
    pub shell: Shell,
    pub opportunity: Opportunity,
    pub actions: Vec<OpportunityAction>,
    pub enrolled: bool,
    pub can_enroll: bool,
    pub can_record_attendance: bool,
    pub can_issue: bool,
    /// Participantes que ainda podem receber certificado.
    pub issuable: Vec<Participant>,
}

#[derive(Template)]
#[template(path = "my_enrollments.html")]
pub struct MyEnrollmentsPage {
    pub shell: Shell,
    pub enrollments: Vec<EnrollmentView>,
}

pub struct RequestRow {
    pub request: ApprovalRequest,
    pub open: bool,
    pub overdue: bool,
}

#[derive(Template)]
#[template(path = "approval_requests.html")]
pub struct ApprovalRequestsPage {
    pub shell: Shell,
    pub rows: Vec<RequestRow>,
    pub stats: RequestStats,
    pub can_submit: bool,
    pub can_review: bool,
}

#[derive(Template)]
#[template(path = "certificates.html")]
pub struct CertificatesPage {
    pub shell: Shell,
    pub certificates: Vec<Certificate>,
    pub stats: CertificateStats,
    pub latest_issue: String,
    pub search: String,
    pub show_holder: bool,
}

#[derive(Template)]
#[template(path = "groups.html")]
pub struct GroupsPage {
    pub shell: Shell,
    pub groups: Vec<Group>,
}

#[derive(Template)]
#[template(path = "ppc.html")]
pub struct PpcPage {
    pub shell: Shell,
    pub current: Option<Ppc>,
    pub history: Vec<Ppc>,
}

#[derive(Template)]
#[template(path = "reports.html")]
pub struct ReportsPage {
    pub shell: Shell,
    pub summary: ReportSummary,
    pub periods: Vec<SelectOption>,
    /// Query string do período escolhido, repetida no link de exportação.
    pub export_query: String,
}

#[derive(Template)]
#[template(path = "communications.html")]
pub struct CommunicationsPage {
    pub shell: Shell,
    pub audiences: Vec<SelectOption>,
    pub notifications_enabled: bool,
}

pub struct UserRow {
    pub user: User,
    pub role_labels: String,
    pub role_checks: Vec<SelectOption>,
    pub is_self: bool,
}

#[derive(Template)]
#[template(path = "users.html")]
pub struct UsersPage {
    pub shell: Shell,
    pub rows: Vec<UserRow>,
    pub search: String,
    pub role_options: Vec<SelectOption>,
}

#[derive(Template)]
#[template(path = "settings.html")]
pub struct SettingsPage {
    pub shell: Shell,
    pub notifications_enabled: bool,
}
