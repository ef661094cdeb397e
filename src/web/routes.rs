// src/web/routes.rs
use crate::{
    services::navigation::Page,
    state::AppState,
    web::{
        admin_handlers, approval_handlers, auth_handlers, certificate_handlers, coordination_handlers,
        dashboard_handlers, mw_auth, mw_page, opportunity_handlers,
    },
};
use axum::{
    middleware,
    response::Redirect,
    routing::{get, post},
    Router,
};

/// Rotas de uma página, barradas aos perfis que não a veem.
fn gated(page: Page, router: Router<AppState>) -> Router<AppState> {
    router.route_layer(middleware::from_fn_with_state(page, mw_page::require_page))
}

pub fn create_router(app_state: AppState) -> Router {
    // --- Rotas Públicas ---
    let public_routes = Router::new()
        .route("/", get(|| async { Redirect::to("/login") }))
        .route("/login", get(auth_handlers::show_login_form).post(auth_handlers::handle_login))
        .route("/logout", get(auth_handlers::handle_logout))
        .route("/signup", get(auth_handlers::show_signup_form).post(auth_handlers::handle_signup))
        .route("/signup/verify", get(auth_handlers::show_verify_form).post(auth_handlers::handle_verify))
        .route(
            "/forgot-password",
            get(auth_handlers::show_forgot_password).post(auth_handlers::handle_forgot_password),
        )
        .route(
            "/validate-certificate",
            get(certificate_handlers::show_validate_certificate).post(certificate_handlers::handle_validate_certificate),
        )
        .route("/public-portal", get(opportunity_handlers::public_portal_page));

    // --- Páginas por perfil ---
    let opportunity_routes = gated(
        Page::Opportunities,
        Router::new()
            .route(
                "/opportunities",
                get(opportunity_handlers::opportunities_page).post(opportunity_handlers::handle_create_opportunity),
            )
            .route("/opportunities/{id}", get(opportunity_handlers::opportunity_detail_page))
            .route("/opportunities/{id}/action", post(opportunity_handlers::handle_action))
            .route("/opportunities/{id}/enroll", post(opportunity_handlers::handle_enroll))
            .route("/opportunities/{id}/attendance", post(opportunity_handlers::handle_attendance)),
    );

    let enrollment_routes = gated(
        Page::MyEnrollments,
        Router::new().route("/my-enrollments", get(opportunity_handlers::my_enrollments_page)),
    );

    let approval_routes = gated(
        Page::ApprovalRequests,
        Router::new()
            .route(
                "/approval-requests",
                get(approval_handlers::approval_requests_page).post(approval_handlers::handle_submit_request),
            )
            .route("/approval-requests/{id}/review", post(approval_handlers::handle_review)),
    );

    let certificate_routes = gated(
        Page::Certificates,
        Router::new()
            .route("/certificates", get(certificate_handlers::certificates_page))
            .route("/certificates/issue", post(certificate_handlers::handle_issue)),
    );

    let coordination_routes = Router::new()
        .merge(gated(Page::Groups, Router::new().route("/groups", get(coordination_handlers::groups_page))))
        .merge(gated(Page::Ppc, Router::new().route("/ppc", get(coordination_handlers::ppc_page))))
        .merge(gated(
            Page::Reports,
            Router::new()
                .route("/reports", get(coordination_handlers::reports_page))
                .route("/reports/export.csv", get(coordination_handlers::export_report_csv)),
        ))
        .merge(gated(
            Page::Communications,
            Router::new().route(
                "/communications",
                get(coordination_handlers::communications_page).post(coordination_handlers::handle_send_communication),
            ),
        ));

    let admin_routes = Router::new()
        .merge(gated(
            Page::Users,
            Router::new()
                .route("/users", get(admin_handlers::users_page).post(admin_handlers::handle_create_user))
                .route("/users/{id}/roles", post(admin_handlers::handle_set_roles))
                .route("/users/{id}/delete", post(admin_handlers::handle_delete_user)),
        ))
        .merge(gated(
            Page::Settings,
            Router::new().route("/settings", get(admin_handlers::settings_page).post(admin_handlers::handle_settings)),
        ));

    // --- Rotas Autenticadas ---
    // require_auth corre antes de qualquer require_page
    let authenticated_routes = Router::new()
        .route("/dashboard", get(dashboard_handlers::dashboard_page))
        .route("/session/role", post(auth_handlers::handle_switch_role))
        .route("/notifications/read", post(dashboard_handlers::mark_notifications_read))
        .route("/preferences/contrast", post(dashboard_handlers::set_high_contrast))
        .merge(opportunity_routes)
        .merge(enrollment_routes)
        .merge(approval_routes)
        .merge(certificate_routes)
        .merge(coordination_routes)
        .merge(admin_routes)
        .route_layer(middleware::from_fn(mw_auth::require_auth));

    // --- Router Final ---
    Router::new()
        .merge(public_routes)
        .merge(authenticated_routes)
        .with_state(app_state)
}
