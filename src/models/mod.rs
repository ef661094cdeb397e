// src/models/mod.rs
pub mod approval;
pub mod certificate;
pub mod group;
pub mod metrics;
pub mod notification;
pub mod opportunity;
pub mod user;

/// Teto de horas aceite num formulário (carga horária, horas solicitadas).
pub const MAX_HOURS: u32 = 10_000;
/// Teto de vagas por oportunidade.
pub const MAX_VACANCIES: u32 = 10_000;
/// Uma presença cobre no máximo um dia.
pub const MAX_ATTENDANCE_HOURS: u32 = 24;

/// Registos que pertencem a um utilizador (filtro por dono no perfil discente).
pub trait Owned {
    fn owner_id(&self) -> &str;
}

impl Owned for approval::ApprovalRequest {
    fn owner_id(&self) -> &str {
        &self.user_id
    }
}

impl Owned for certificate::Certificate {
    fn owner_id(&self) -> &str {
        &self.user_id
    }
}

impl Owned for notification::Notification {
    fn owner_id(&self) -> &str {
        &self.user_id
    }
}
