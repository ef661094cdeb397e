// src/lib.rs
pub mod config;
pub mod db;
pub mod error;
pub mod fixtures;
pub mod models;
pub mod repository;
pub mod services;
pub mod state;
pub mod templates;
pub mod web;

use crate::state::AppState;
use axum::Router;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_cookies::CookieManagerLayer;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tower_sessions::{SessionManagerLayer, SessionStore};

/// Router completo com as camadas partilhadas (tracing, timeout, cookies, sessão).
pub fn build_app<S>(app_state: AppState, session_layer: SessionManagerLayer<S>, request_timeout: Duration) -> Router
where
    S: SessionStore + Clone,
{
    web::routes::create_router(app_state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(TimeoutLayer::new(request_timeout))
            .layer(CookieManagerLayer::new())
            .layer(session_layer),
    )
}
