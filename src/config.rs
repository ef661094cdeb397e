// src/config.rs
use crate::error::{AppError, AppResult};
use std::{env, net::SocketAddr, time::Duration};

/// Onde ficam os dados do portal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// Base SQLite em `DATABASE_URL` (padrão).
    Sqlite,
    /// Dados de demonstração em memória, perdidos ao reiniciar.
    Memory,
}

/// Configuração lida das variáveis de ambiente (e do `.env`).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    /// Chave das cookies assinadas e das sessões. Env var: `SESSION_SECRET`.
    pub session_secret: String,
    /// Endereço de escuta (padrão 0.0.0.0:3000). Env var: `PORTAL_ADDR`.
    pub bind_addr: SocketAddr,
    /// Env var: `PORTAL_STORAGE` (`sqlite` ou `memory`).
    pub storage: StorageBackend,
    /// Tempo máximo por pedido. Env var: `PORTAL_REQUEST_TIMEOUT_SECS`.
    pub request_timeout: Duration,
}

impl AppConfig {
    /// Espera que o `.env` já tenha sido carregado por `main`.
    pub fn from_env() -> AppResult<Self> {
        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://extensao.db".to_string());
        let session_secret = env::var("SESSION_SECRET")?;

        let bind_addr = match env::var("PORTAL_ADDR") {
            Ok(raw) => raw.parse().map_err(|e| {
                tracing::error!("PORTAL_ADDR inválido '{}': {}", raw, e);
                AppError::Validation(format!("PORTAL_ADDR inválido: {}", raw))
            })?,
            Err(_) => SocketAddr::from(([0, 0, 0, 0], 3000)),
        };

        let storage = match env::var("PORTAL_STORAGE").as_deref() {
            Ok("memory") => StorageBackend::Memory,
            Ok("sqlite") | Err(_) => StorageBackend::Sqlite,
            Ok(other) => {
                return Err(AppError::Validation(format!(
                    "PORTAL_STORAGE desconhecido: '{}' (use sqlite ou memory)",
                    other
                )))
            }
        };

        let request_timeout = env::var("PORTAL_REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(30));

        Ok(Self {
            database_url,
            session_secret,
            bind_addr,
            storage,
            request_timeout,
        })
    }
}
