// src/services/mod.rs
pub mod approval_service;
pub mod certificate_service;
pub mod communication_service;
pub mod dashboard_service;
pub mod navigation;
pub mod opportunity_service;
pub mod report_service;
pub mod session_service;
pub mod settings_service;
pub mod user_service;
