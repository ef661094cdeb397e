// src/services/settings_service.rs
use crate::{
    error::AppResult,
    models::user::Role,
    services::session_service::SessionContext,
};
use tokio::sync::RwLock;

/// Cookie assinada com a preferência de alto contraste (por navegador).
pub const HIGH_CONTRAST_COOKIE: &str = "portal_high_contrast";

/// Configuração global, partilhada por todos os pedidos.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalSettings {
    /// Quando desligado, comunicados e decisões não geram notificações.
    pub notifications_enabled: bool,
}

impl Default for PortalSettings {
    fn default() -> Self {
        Self {
            notifications_enabled: true,
        }
    }
}

pub async fn notifications_enabled(settings: &RwLock<PortalSettings>) -> bool {
    settings.read().await.notifications_enabled
}

/// Só a administração altera a configuração global.
pub async fn set_notifications_enabled(
    settings: &RwLock<PortalSettings>,
    ctx: &SessionContext,
    enabled: bool,
) -> AppResult<()> {
    ctx.require_role(&[Role::Administrador])?;
    settings.write().await.notifications_enabled = enabled;
    tracing::info!("⚙️ Notificações globais: {}", if enabled { "ativadas" } else { "desativadas" });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::AppError, fixtures};

    #[tokio::test]
    async fn only_admin_toggles_notifications() {
        let settings = RwLock::new(PortalSettings::default());
        assert!(notifications_enabled(&settings).await);

        let secretary = SessionContext::for_tests(fixtures::users().remove(3), Role::Secretaria);
        assert!(matches!(
            set_notifications_enabled(&settings, &secretary, false).await,
            Err(AppError::Forbidden)
        ));
        assert!(notifications_enabled(&settings).await);

        let admin = SessionContext::for_tests(fixtures::users().remove(4), Role::Administrador);
        set_notifications_enabled(&settings, &admin, false).await.unwrap();
        assert!(!notifications_enabled(&settings).await);
    }
}
