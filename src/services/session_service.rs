// src/services/session_service.rs
//! Contexto de sessão: utilizador autenticado e perfil ativo, persistidos no
//! armazenamento durável sob as chaves `currentUser` e `currentRole`.
use crate::{
    error::{AppError, AppResult},
    models::user::{Role, User},
    repository::PortalRepository,
    services::navigation::Page,
};
use async_trait::async_trait;
use tower_sessions::Session;

pub const CURRENT_USER_KEY: &str = "currentUser";
pub const CURRENT_ROLE_KEY: &str = "currentRole";

/// Armazenamento chave/valor que sobrevive entre pedidos.
#[async_trait]
pub trait DurableStore: Send + Sync {
    async fn load(&self, key: &str) -> AppResult<Option<String>>;
    async fn save(&self, key: &str, value: String) -> AppResult<()>;
    async fn remove(&self, key: &str) -> AppResult<()>;
    /// Gera um novo identificador de sessão (após login).
    async fn renew_id(&self) -> AppResult<()> {
        Ok(())
    }
}

#[async_trait]
impl DurableStore for Session {
    async fn load(&self, key: &str) -> AppResult<Option<String>> {
        self.get::<String>(key)
            .await
            .map_err(|e| AppError::SessionError(format!("Falha ao ler '{}': {}", key, e)))
    }

    async fn save(&self, key: &str, value: String) -> AppResult<()> {
        self.insert(key, value)
            .await
            .map_err(|e| AppError::SessionError(format!("Falha ao inserir '{}' na sessão: {}", key, e)))
    }

    async fn remove(&self, key: &str) -> AppResult<()> {
        self.remove::<String>(key)
            .await
            .map(|_| ())
            .map_err(|e| AppError::SessionError(format!("Falha ao remover '{}': {}", key, e)))
    }

    async fn renew_id(&self) -> AppResult<()> {
        self.cycle_id()
            .await
            .map_err(|e| AppError::SessionError(format!("Falha ao rodar ID: {}", e)))
    }
}

/// Quem está a usar o portal neste pedido. Reconstruído a partir do
/// armazenamento durável em cada pedido e passado como extensão.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionContext {
    user: Option<User>,
    role: Option<Role>,
}

impl SessionContext {
    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn role(&self) -> Option<Role> {
        self.role
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// Utilizador autenticado, ou `Unauthorized`.
    pub fn current_user(&self) -> AppResult<&User> {
        self.user.as_ref().ok_or(AppError::Unauthorized)
    }

    pub fn active_role(&self) -> AppResult<Role> {
        self.role.ok_or(AppError::Unauthorized)
    }

    /// Falha com `Forbidden` se o perfil ativo não for um dos indicados.
    pub fn require_role(&self, allowed: &[Role]) -> AppResult<Role> {
        let role = self.active_role()?;
        if allowed.contains(&role) {
            Ok(role)
        } else {
            tracing::warn!("Perfil '{}' sem permissão (esperado um de {:?})", role.as_str(), allowed);
            Err(AppError::Forbidden)
        }
    }

    pub fn can_view(&self, page: Page) -> bool {
        self.role.is_some_and(|role| page.is_visible_to(role))
    }

    #[cfg(test)]
    pub(crate) fn for_tests(user: User, role: Role) -> Self {
        Self {
            user: Some(user),
            role: Some(role),
        }
    }

    fn sign_in(&mut self, user: User, role: Role) {
        self.user = Some(user);
        self.role = Some(role);
    }

    fn clear(&mut self) {
        self.user = None;
        self.role = None;
    }

    /// Troca o perfil ativo se pertencer ao utilizador. Devolve se mudou.
    fn set_role(&mut self, role: Role) -> bool {
        match &self.user {
            Some(user) if user.has_role(role) => {
                self.role = Some(role);
                true
            }
            _ => false,
        }
    }
}

/// Autentica pelo e-mail. A senha não é verificada neste portal de
/// demonstração; um e-mail desconhecido devolve `false` sem tocar na sessão.
pub async fn login(
    repo: &dyn PortalRepository,
    store: &dyn DurableStore,
    ctx: &mut SessionContext,
    email: &str,
    _password: &str,
) -> AppResult<bool> {
    let Some(user) = repo.find_user_by_email(email).await? else {
        tracing::warn!("Login falhou: e-mail '{}' não encontrado.", email.trim());
        return Ok(false);
    };
    let Some(role) = user.default_role() else {
        tracing::warn!("Login recusado: utilizador '{}' sem perfis.", user.id);
        return Ok(false);
    };

    store.renew_id().await?;
    store
        .save(CURRENT_USER_KEY, serde_json::to_string(&user)?)
        .await?;
    store.save(CURRENT_ROLE_KEY, role.as_str().to_string()).await?;

    tracing::info!("✅ Login bem-sucedido para: {} ({})", user.email, role.as_str());
    ctx.sign_in(user, role);
    Ok(true)
}

pub async fn logout(store: &dyn DurableStore, ctx: &mut SessionContext) -> AppResult<()> {
    if let Some(user) = ctx.user() {
        tracing::info!("🚪 Utilizador '{}' desligado.", user.email);
    }
    store.remove(CURRENT_USER_KEY).await?;
    store.remove(CURRENT_ROLE_KEY).await?;
    ctx.clear();
    Ok(())
}

/// Troca de perfil. Um perfil que o utilizador não tem é ignorado.
pub async fn switch_role(
    store: &dyn DurableStore,
    ctx: &mut SessionContext,
    role: Role,
) -> AppResult<bool> {
    if !ctx.set_role(role) {
        tracing::debug!("Troca de perfil ignorada: '{}' não pertence ao utilizador.", role.as_str());
        return Ok(false);
    }
    store.save(CURRENT_ROLE_KEY, role.as_str().to_string()).await?;
    tracing::info!("Perfil ativo alterado para '{}'.", role.as_str());
    Ok(true)
}

/// Reconstrói o contexto a partir do armazenamento. Um perfil guardado em
/// falta ou inválido cai para o primeiro perfil do utilizador.
pub async fn rehydrate(store: &dyn DurableStore) -> AppResult<SessionContext> {
    let mut ctx = SessionContext::default();
    let Some(raw_user) = store.load(CURRENT_USER_KEY).await? else {
        return Ok(ctx);
    };
    let user: User = match serde_json::from_str(&raw_user) {
        Ok(user) => user,
        Err(e) => {
            tracing::warn!("Utilizador guardado na sessão ilegível, ignorando: {}", e);
            return Ok(ctx);
        }
    };

    let stored_role = store
        .load(CURRENT_ROLE_KEY)
        .await?
        .and_then(|raw| raw.parse::<Role>().ok())
        .filter(|role| user.has_role(*role));
    match stored_role.or_else(|| user.default_role()) {
        Some(role) => ctx.sign_in(user, role),
        None => tracing::warn!("Utilizador '{}' na sessão sem perfis.", user.id),
    }
    Ok(ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryRepository;
    use std::{collections::HashMap, sync::Mutex};

    #[derive(Default)]
    struct MapStore {
        values: Mutex<HashMap<String, String>>,
    }

    impl MapStore {
        fn get(&self, key: &str) -> Option<String> {
            self.values.lock().unwrap().get(key).cloned()
        }
    }

    #[async_trait]
    impl DurableStore for MapStore {
        async fn load(&self, key: &str) -> AppResult<Option<String>> {
            Ok(self.get(key))
        }

        async fn save(&self, key: &str, value: String) -> AppResult<()> {
            self.values.lock().unwrap().insert(key.to_string(), value);
            Ok(())
        }

        async fn remove(&self, key: &str) -> AppResult<()> {
            self.values.lock().unwrap().remove(key);
            Ok(())
        }
    }

    async fn logged_in(email: &str) -> (InMemoryRepository, MapStore, SessionContext) {
        let repo = InMemoryRepository::seeded();
        let store = MapStore::default();
        let mut ctx = SessionContext::default();
        assert!(login(&repo, &store, &mut ctx, email, "qualquer").await.unwrap());
        (repo, store, ctx)
    }

    #[tokio::test]
    async fn login_sets_first_role_and_persists_both_keys() {
        let (_, store, ctx) = logged_in("carlos.mendes@universidade.edu.br").await;
        assert!(ctx.is_authenticated());
        assert_eq!(ctx.role(), Some(Role::Coordenador));
        assert_eq!(store.get(CURRENT_ROLE_KEY).as_deref(), Some("coordenador"));

        let stored: User = serde_json::from_str(&store.get(CURRENT_USER_KEY).unwrap()).unwrap();
        assert_eq!(Some(&stored), ctx.user());
    }

    #[tokio::test]
    async fn unknown_email_leaves_everything_untouched() {
        let repo = InMemoryRepository::seeded();
        let store = MapStore::default();
        let mut ctx = SessionContext::default();
        let ok = login(&repo, &store, &mut ctx, "nonexistent@x.com", "whatever")
            .await
            .unwrap();
        assert!(!ok);
        assert!(!ctx.is_authenticated());
        assert_eq!(ctx.role(), None);
        assert!(store.get(CURRENT_USER_KEY).is_none());
        assert!(store.get(CURRENT_ROLE_KEY).is_none());
    }

    #[tokio::test]
    async fn email_lookup_is_case_insensitive_and_password_is_ignored() {
        let (_, _, ctx) = logged_in("  Joao.Silva@Universidade.edu.br ").await;
        assert_eq!(ctx.user().map(|u| u.id.as_str()), Some("1"));
        assert_eq!(ctx.role(), Some(Role::Discente));
    }

    #[tokio::test]
    async fn switch_role_only_accepts_own_roles() {
        let (_, store, mut ctx) = logged_in("carlos.mendes@universidade.edu.br").await;

        assert!(switch_role(&store, &mut ctx, Role::Docente).await.unwrap());
        assert_eq!(ctx.role(), Some(Role::Docente));
        assert_eq!(store.get(CURRENT_ROLE_KEY).as_deref(), Some("docente"));

        assert!(!switch_role(&store, &mut ctx, Role::Administrador).await.unwrap());
        assert_eq!(ctx.role(), Some(Role::Docente));
        assert_eq!(store.get(CURRENT_ROLE_KEY).as_deref(), Some("docente"));
    }

    #[tokio::test]
    async fn switch_role_without_user_is_a_noop() {
        let store = MapStore::default();
        let mut ctx = SessionContext::default();
        assert!(!switch_role(&store, &mut ctx, Role::Discente).await.unwrap());
        assert!(store.get(CURRENT_ROLE_KEY).is_none());
    }

    #[tokio::test]
    async fn logout_clears_context_and_store() {
        let (_, store, mut ctx) = logged_in("admin@universidade.edu.br").await;
        logout(&store, &mut ctx).await.unwrap();
        assert!(!ctx.is_authenticated());
        assert_eq!(ctx.role(), None);
        assert!(store.get(CURRENT_USER_KEY).is_none());
        assert!(store.get(CURRENT_ROLE_KEY).is_none());
        assert_eq!(rehydrate(&store).await.unwrap(), SessionContext::default());
    }

    #[tokio::test]
    async fn rehydrate_restores_the_switched_role() {
        let (_, store, mut ctx) = logged_in("carlos.mendes@universidade.edu.br").await;
        switch_role(&store, &mut ctx, Role::Docente).await.unwrap();

        let restored = rehydrate(&store).await.unwrap();
        assert_eq!(restored, ctx);
    }

    #[tokio::test]
    async fn rehydrate_falls_back_to_first_role_on_bad_stored_role() {
        let (_, store, _) = logged_in("carlos.mendes@universidade.edu.br").await;
        for bad in ["reitor", "administrador"] {
            store.save(CURRENT_ROLE_KEY, bad.to_string()).await.unwrap();
            let restored = rehydrate(&store).await.unwrap();
            assert_eq!(restored.role(), Some(Role::Coordenador));
        }
        store.remove(CURRENT_ROLE_KEY).await.unwrap();
        assert_eq!(rehydrate(&store).await.unwrap().role(), Some(Role::Coordenador));
    }

    #[tokio::test]
    async fn role_is_always_one_of_the_user_roles() {
        let (_, store, mut ctx) = logged_in("carlos.mendes@universidade.edu.br").await;
        for role in Role::ALL {
            switch_role(&store, &mut ctx, role).await.unwrap();
            let user = ctx.user().unwrap();
            assert!(user.has_role(ctx.role().unwrap()));
        }
    }

    #[tokio::test]
    async fn require_role_rejects_other_profiles() {
        let (_, _, ctx) = logged_in("joao.silva@universidade.edu.br").await;
        assert_eq!(ctx.require_role(&[Role::Discente]).unwrap(), Role::Discente);
        assert!(matches!(
            ctx.require_role(&[Role::Coordenador, Role::Secretaria]),
            Err(AppError::Forbidden)
        ));
        assert!(matches!(
            SessionContext::default().require_role(&[Role::Discente]),
            Err(AppError::Unauthorized)
        ));
    }
}
