// src/services/user_service.rs
use crate::{
    error::{AppError, AppResult},
    models::user::{is_plausible_email, normalize_email, NewUser, Role, User},
    repository::PortalRepository,
    services::session_service::SessionContext,
};
use serde::{Deserialize, Serialize};

/// Domínio obrigatório no cadastro de discentes.
pub const INSTITUTIONAL_DOMAIN: &str = "@universidade.edu.br";

// --- Administração de utilizadores ---

/// Pesquisa por nome ou e-mail (vazio = todos).
pub async fn search_users(repo: &dyn PortalRepository, ctx: &SessionContext, term: &str) -> AppResult<Vec<User>> {
    ctx.require_role(&[Role::Administrador])?;
    let term = term.trim().to_lowercase();
    let users = repo.list_users().await?;
    tracing::debug!("Pesquisa de utilizadores '{}' sobre {} registos", term, users.len());
    Ok(users
        .into_iter()
        .filter(|u| {
            term.is_empty() || u.name.to_lowercase().contains(&term) || u.email.to_lowercase().contains(&term)
        })
        .collect())
}

pub async fn create_user(repo: &dyn PortalRepository, ctx: &SessionContext, new_user: NewUser) -> AppResult<User> {
    ctx.require_role(&[Role::Administrador])?;
    new_user.validate()?;
    let user = repo.create_user(new_user).await?;
    tracing::info!("✅ Utilizador '{}' criado pela administração.", user.email);
    Ok(user)
}

/// Substitui os perfis de um utilizador. A ordem dada é a ordem guardada.
pub async fn set_user_roles(
    repo: &dyn PortalRepository,
    ctx: &SessionContext,
    user_id: &str,
    roles: &[Role],
) -> AppResult<User> {
    ctx.require_role(&[Role::Administrador])?;
    if roles.is_empty() {
        return Err(AppError::Validation(
            "Selecione pelo menos um perfil.".to_string(),
        ));
    }
    let mut unique: Vec<Role> = Vec::with_capacity(roles.len());
    for role in roles {
        if !unique.contains(role) {
            unique.push(*role);
        }
    }
    let user = repo.set_user_roles(user_id, &unique).await?;
    tracing::info!("✅ Perfis de '{}' atualizados: {:?}", user_id, unique);
    Ok(user)
}

pub async fn delete_user(repo: &dyn PortalRepository, ctx: &SessionContext, user_id: &str) -> AppResult<()> {
    ctx.require_role(&[Role::Administrador])?;
    if ctx.current_user()?.id == user_id {
        return Err(AppError::Validation(
            "Não é possível remover a própria conta.".to_string(),
        ));
    }
    repo.delete_user(user_id).await?;
    tracing::info!("🗑️ Utilizador '{}' removido.", user_id);
    Ok(())
}

// --- Cadastro de discentes ---

/// Dados do primeiro passo do cadastro, guardados na sessão até à verificação.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingSignup {
    pub name: String,
    pub registration: String,
    pub email: String,
}

impl PendingSignup {
    pub fn into_new_user(self) -> NewUser {
        NewUser {
            name: self.name,
            email: self.email,
            registration: self.registration,
            roles: vec![Role::Discente],
            course: None,
            semester: None,
        }
    }
}

/// Primeiro passo: valida o e-mail institucional e a unicidade.
pub async fn start_signup(
    repo: &dyn PortalRepository,
    name: &str,
    registration: &str,
    email: &str,
) -> AppResult<PendingSignup> {
    let email = normalize_email(email);
    if name.trim().is_empty() || registration.trim().is_empty() {
        return Err(AppError::Validation(
            "Nome e matrícula são obrigatórios.".to_string(),
        ));
    }
    if !is_plausible_email(&email) || !email.ends_with(INSTITUTIONAL_DOMAIN) {
        return Err(AppError::Validation(format!(
            "Use o seu e-mail institucional ({}).",
            INSTITUTIONAL_DOMAIN
        )));
    }
    if repo.find_user_by_email(&email).await?.is_some() {
        return Err(AppError::Conflict(
            "Este e-mail já está cadastrado. Faça login ou recupere a senha.".to_string(),
        ));
    }
    tracing::info!("Código de verificação enviado para '{}' (modo demonstração).", email);
    Ok(PendingSignup {
        name: name.trim().to_string(),
        registration: registration.trim().to_string(),
        email,
    })
}

/// Segundo passo: qualquer código de 6 dígitos é aceite em modo demonstração.
pub async fn complete_signup(repo: &dyn PortalRepository, pending: PendingSignup, code: &str) -> AppResult<User> {
    let code = code.trim();
    if code.len() != 6 || !code.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::Validation(
            "O código de verificação tem 6 dígitos.".to_string(),
        ));
    }
    let user = repo.create_user(pending.into_new_user()).await?;
    tracing::info!("✅ Cadastro concluído para '{}'.", user.email);
    Ok(user)
}

/// Recuperação de senha: regista o pedido e confirma sempre, exista ou não a conta.
pub async fn request_password_reset(repo: &dyn PortalRepository, email: &str) -> AppResult<()> {
    let email = normalize_email(email);
    if !is_plausible_email(&email) {
        return Err(AppError::Validation("E-mail inválido.".to_string()));
    }
    let known = repo.find_user_by_email(&email).await?.is_some();
    tracing::info!("Pedido de recuperação de senha para '{}' (conta existente: {})", email, known);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{fixtures, repository::InMemoryRepository};

    fn admin() -> SessionContext {
        SessionContext::for_tests(fixtures::users().remove(4), Role::Administrador)
    }

    #[tokio::test]
    async fn search_matches_name_or_email() {
        let repo = InMemoryRepository::seeded();
        let found = search_users(&repo, &admin(), "maria").await.unwrap();
        assert_eq!(found.len(), 2);
        let found = search_users(&repo, &admin(), "ADMIN@").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(search_users(&repo, &admin(), "").await.unwrap().len(), fixtures::users().len());
    }

    #[tokio::test]
    async fn only_admins_manage_users() {
        let repo = InMemoryRepository::seeded();
        let coordinator = SessionContext::for_tests(fixtures::users().remove(2), Role::Coordenador);
        assert!(matches!(
            search_users(&repo, &coordinator, "").await,
            Err(AppError::Forbidden)
        ));
        assert!(matches!(
            delete_user(&repo, &coordinator, "1").await,
            Err(AppError::Forbidden)
        ));
    }

    #[tokio::test]
    async fn roles_must_be_non_empty_and_are_deduplicated() {
        let repo = InMemoryRepository::seeded();
        assert!(matches!(
            set_user_roles(&repo, &admin(), "2", &[]).await,
            Err(AppError::Validation(_))
        ));
        let user = set_user_roles(&repo, &admin(), "2", &[Role::Docente, Role::Coordenador, Role::Docente])
            .await
            .unwrap();
        assert_eq!(user.roles, vec![Role::Docente, Role::Coordenador]);
    }

    #[tokio::test]
    async fn admin_cannot_remove_own_account() {
        let repo = InMemoryRepository::seeded();
        assert!(matches!(
            delete_user(&repo, &admin(), "5").await,
            Err(AppError::Validation(_))
        ));
        delete_user(&repo, &admin(), "7").await.unwrap();
        assert!(repo.find_user_by_id("7").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn signup_requires_institutional_email_and_six_digits() {
        let repo = InMemoryRepository::seeded();
        assert!(matches!(
            start_signup(&repo, "Lia", "2025001", "lia@gmail.com").await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            start_signup(&repo, "João", "1", "joao.silva@universidade.edu.br").await,
            Err(AppError::Conflict(_))
        ));

        let pending = start_signup(&repo, " Lia Prado ", "2025001", "Lia.Prado@universidade.edu.br")
            .await
            .unwrap();
        assert_eq!(pending.email, "lia.prado@universidade.edu.br");
        assert!(complete_signup(&repo, pending.clone(), "12ab56").await.is_err());

        let user = complete_signup(&repo, pending, "123456").await.unwrap();
        assert_eq!(user.roles, vec![Role::Discente]);
        assert!(repo.find_user_by_email("lia.prado@universidade.edu.br").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn password_reset_never_reveals_accounts() {
        let repo = InMemoryRepository::seeded();
        assert!(request_password_reset(&repo, "joao.silva@universidade.edu.br").await.is_ok());
        assert!(request_password_reset(&repo, "ninguem@universidade.edu.br").await.is_ok());
        assert!(request_password_reset(&repo, "sem-arroba").await.is_err());
    }
}
