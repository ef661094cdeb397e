// src/models/group.rs
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupMember {
    pub user_id: String,
    pub user_name: String,
    pub role: Option<String>, // cargo dentro do grupo
    pub joined_at: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    pub name: String,
    pub description: String,
    pub email: String,
    pub responsible_id: String,
    pub responsible_name: String,
    pub members: Vec<GroupMember>,
    pub created_at: DateTime<Utc>,
}

/// Versão do Projeto Pedagógico do Curso.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ppc {
    pub id: String,
    pub version: String,
    pub minimum_workload: u32,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub effective_from: NaiveDate,
    pub effective_until: Option<NaiveDate>,
}

impl Ppc {
    /// A versão vigente é a que não tem data de fim.
    pub fn is_current(&self) -> bool {
        self.effective_until.is_none()
    }
}

/// Versão vigente entre as fornecidas (a mais recente sem data de fim).
pub fn current_ppc(ppcs: &[Ppc]) -> Option<&Ppc> {
    ppcs.iter()
        .filter(|ppc| ppc.is_current())
        .max_by_key(|ppc| ppc.effective_from)
}
