// src/state.rs
use crate::{
    repository::PortalRepository,
    services::settings_service::{self, PortalSettings},
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_cookies::Key;

/// Estado partilhado por todos os handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn PortalRepository>,
    /// Chave das cookies assinadas (preferência de alto contraste).
    pub cookie_key: Key,
    pub settings: Arc<RwLock<PortalSettings>>,
}

impl AppState {
    pub fn new(repo: Arc<dyn PortalRepository>, cookie_key: Key) -> Self {
        Self {
            repo,
            cookie_key,
            settings: Arc::new(RwLock::new(PortalSettings::default())),
        }
    }

    pub async fn notifications_enabled(&self) -> bool {
        settings_service::notifications_enabled(&self.settings).await
    }
}
