// src/main.rs
use axum::serve;
use portal_extensao::{
    build_app,
    config::{AppConfig, StorageBackend},
    db,
    repository::{InMemoryRepository, PortalRepository, SqliteRepository},
    state::AppState,
};
use std::{env, sync::Arc};
use time::Duration;
use tokio::net::TcpListener;
use tower_cookies::Key;
use tower_sessions::{ExpiredDeletion, Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::SqliteStore;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Configuração do Logging (Tracing) ---
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            env::var("RUST_LOG")
                .unwrap_or_else(|_| {
                    "portal_extensao=debug,tower_http=info,sqlx=warn,tower_sessions=info".into()
                })
                .into()
        }))
        .with(fmt::layer())
        .init();

    tracing::info!("🚀 Iniciando o Portal de Extensão...");

    let config = AppConfig::from_env()
        .map_err(|e| anyhow::anyhow!("!!! Configuração inválida: {}", e))?;

    // --- Base de Dados (também guarda as sessões) ---
    let db_pool = match db::create_db_pool(&config.database_url).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("❌ Falha crítica ao inicializar a base de dados: {}", e);
            return Err(anyhow::anyhow!("Falha ao conectar/migrar DB: {}", e));
        }
    };

    let repo: Arc<dyn PortalRepository> = match config.storage {
        StorageBackend::Sqlite => {
            let repo = SqliteRepository::new(db_pool.clone());
            repo.seed_if_empty().await?;
            Arc::new(repo)
        }
        StorageBackend::Memory => {
            tracing::warn!("⚠️ PORTAL_STORAGE=memory: os dados perdem-se ao reiniciar.");
            Arc::new(InMemoryRepository::seeded())
        }
    };
    tracing::info!("🗄️ Armazenamento: {:?}", config.storage);

    // --- Configuração das Sessões ---
    let session_store = SqliteStore::new(db_pool.clone())
        .with_table_name("sessions")
        .map_err(|e| anyhow::anyhow!("Falha ao criar session store: {}", e))?;
    session_store.migrate().await?;

    let session_store_clone = session_store.clone();
    tokio::spawn(async move {
        if let Err(e) = session_store_clone
            .continuously_delete_expired(tokio::time::Duration::from_secs(60 * 60))
            .await
        {
            tracing::error!("Erro na task de limpeza de sessões: {:?}", e);
        }
    });
    tracing::info!("🧹 Tarefa de limpeza de sessões iniciada.");

    let cookie_key = match Key::try_from(config.session_secret.as_bytes()) {
        Ok(key) => key,
        Err(e) => {
            tracing::warn!("⚠️ SESSION_SECRET curta ({}); usando chave aleatória, as preferências não sobrevivem a reinícios.", e);
            Key::generate()
        }
    };

    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(false)
        .with_http_only(true)
        .with_expiry(Expiry::OnInactivity(Duration::days(1)));
    tracing::info!("🔑 Camada de sessão configurada.");

    let app_state = AppState::new(repo, cookie_key);

    // --- Listener ---
    tracing::info!("📡 Servidor escutando em http://{}", config.bind_addr);
    let listener = match TcpListener::bind(config.bind_addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("❌ Falha ao iniciar listener em {}: {}", config.bind_addr, e);
            return Err(e.into());
        }
    };

    tracing::info!("🛠️ Construindo router e aplicando middlewares...");
    let app = build_app(app_state, session_layer, config.request_timeout);

    tracing::info!("👂 Servidor pronto para aceitar conexões...");
    if let Err(e) = serve(listener, app.into_make_service()).await {
        tracing::error!("❌ Erro fatal no servidor: {}", e);
        return Err(e.into());
    }

    Ok(())
}
