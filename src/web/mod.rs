// src/web/mod.rs
pub mod admin_handlers;
pub mod approval_handlers;
pub mod auth_handlers;
pub mod certificate_handlers;
pub mod coordination_handlers;
pub mod dashboard_handlers;
pub mod mw_auth;
pub mod mw_page;
pub mod opportunity_handlers;
pub mod routes;
pub mod shell;
