// src/models/user.rs
use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Perfis de acesso do portal. A ordem da enumeração é a ordem de exibição.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Discente,
    Docente,
    Coordenador,
    Secretaria,
    Administrador,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Discente,
        Role::Docente,
        Role::Coordenador,
        Role::Secretaria,
        Role::Administrador,
    ];

    /// Valor guardado na sessão e na base de dados.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Discente => "discente",
            Role::Docente => "docente",
            Role::Coordenador => "coordenador",
            Role::Secretaria => "secretaria",
            Role::Administrador => "administrador",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Role::Discente => "Discente",
            Role::Docente => "Docente",
            Role::Coordenador => "Coordenador",
            Role::Secretaria => "Secretaria",
            Role::Administrador => "Administrador",
        }
    }

    /// Coordenação e secretaria analisam solicitações de aproveitamento.
    pub fn is_reviewer(&self) -> bool {
        matches!(self, Role::Coordenador | Role::Secretaria)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| AppError::Validation(format!("Perfil desconhecido: '{}'", s)))
    }
}

/// Utilizador do portal. É este registo completo que fica guardado na sessão.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub registration: String, // matrícula ou SIAPE
    pub roles: Vec<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semester: Option<u32>,
}

impl User {
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    /// Perfil ativo por omissão logo após o login.
    pub fn default_role(&self) -> Option<Role> {
        self.roles.first().copied()
    }

    pub fn initials(&self) -> String {
        self.name
            .split_whitespace()
            .filter_map(|part| part.chars().next())
            .take(2)
            .collect::<String>()
            .to_uppercase()
    }
}

/// Dados para criar um utilizador (administração ou cadastro).
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub registration: String,
    pub roles: Vec<Role>,
    pub course: Option<String>,
    pub semester: Option<u32>,
}

impl NewUser {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.name.trim().is_empty() || self.registration.trim().is_empty() {
            return Err(AppError::Validation(
                "Nome e matrícula são obrigatórios.".to_string(),
            ));
        }
        if !is_plausible_email(&self.email) {
            return Err(AppError::Validation("E-mail inválido.".to_string()));
        }
        if self.roles.is_empty() {
            return Err(AppError::Validation(
                "Selecione pelo menos um perfil.".to_string(),
            ));
        }
        Ok(())
    }
}

// Struct para dados do formulário de login
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Normaliza um e-mail para comparação (chave de login).
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn is_plausible_email(email: &str) -> bool {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_its_storage_value() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert_eq!(" Coordenador ".parse::<Role>().unwrap(), Role::Coordenador);
        assert!("reitor".parse::<Role>().is_err());
    }

    #[test]
    fn user_serializes_like_the_stored_session_record() {
        let user = User {
            id: "1".into(),
            name: "João Silva".into(),
            email: "joao.silva@universidade.edu.br".into(),
            registration: "2021001234".into(),
            roles: vec![Role::Discente],
            course: None,
            semester: Some(6),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["roles"][0], "discente");
        assert_eq!(json["semester"], 6);
        assert!(json.get("course").is_none());
        assert_eq!(user.initials(), "JS");
    }

    #[test]
    fn new_user_requires_at_least_one_role() {
        let mut new_user = NewUser {
            name: "Ana".into(),
            email: "ana@universidade.edu.br".into(),
            registration: "123".into(),
            roles: vec![],
            course: None,
            semester: None,
        };
        assert!(matches!(new_user.validate(), Err(AppError::Validation(_))));
        new_user.roles.push(Role::Secretaria);
        assert!(new_user.validate().is_ok());
        new_user.email = "sem-arroba".into();
        assert!(new_user.validate().is_err());
    }
}
