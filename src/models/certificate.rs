// src/models/certificate.rs
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Certificate {
    pub id: String,
    pub code: String, // código de validação legível
    pub user_id: String,
    pub user_name: String,
    pub opportunity_id: Option<String>,
    pub opportunity_title: String,
    pub workload: u32,
    pub issue_date: NaiveDate,
    pub qr_code: String,
}

impl Certificate {
    /// Normaliza o código digitado pelo utilizador antes da comparação.
    pub fn normalize_code(code: &str) -> String {
        code.trim().to_uppercase()
    }

    /// Caminho de validação codificado no QR do certificado.
    pub fn qr_path(code: &str) -> String {
        format!("/validate-certificate?code={}", urlencoding::encode(code))
    }

    /// Gera um código novo no formato `EXT-XXXXXXXX`.
    pub fn generate_code() -> String {
        let raw = uuid::Uuid::new_v4().simple().to_string();
        format!("EXT-{}", raw[..8].to_uppercase())
    }

    pub fn matches_search(&self, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        term.is_empty()
            || self.opportunity_title.to_lowercase().contains(&term)
            || self.code.to_lowercase().contains(&term)
            || self.user_name.to_lowercase().contains(&term)
    }
}
