// tests/portal_flow.rs
use axum::http::StatusCode;
use axum_test::TestServer;
use portal_extensao::{
    build_app,
    repository::InMemoryRepository,
    services::certificate_service::{EMPTY_CODE_MESSAGE, INVALID_CODE_MESSAGE},
    state::AppState,
    web::auth_handlers::LOGIN_ERROR,
};
use std::{sync::Arc, time::Duration};
use tower_cookies::Key;
use tower_sessions::{MemoryStore, SessionManagerLayer};

const JOAO: &str = "joao.silva@universidade.edu.br";
const PEDRO: &str = "pedro.costa@universidade.edu.br";
const CARLOS: &str = "carlos.mendes@universidade.edu.br";
const ADMIN: &str = "admin@universidade.edu.br";

fn server() -> TestServer {
    let state = AppState::new(Arc::new(InMemoryRepository::seeded()), Key::generate());
    let session_layer = SessionManagerLayer::new(MemoryStore::default()).with_secure(false);
    let app = build_app(state, session_layer, Duration::from_secs(5));
    TestServer::builder()
        .save_cookies()
        .build(app)
        .expect("servidor de teste")
}

async fn login(server: &TestServer, email: &str) {
    let response = server
        .post("/login")
        .form(&[("email", email), ("password", "qualquer")])
        .await;
    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/dashboard");
}

fn location(response: &axum_test::TestResponse) -> String {
    response
        .header("location")
        .to_str()
        .expect("location ascii")
        .to_string()
}

#[tokio::test]
async fn pages_require_login() {
    let server = server();
    let response = server.get("/dashboard").await;
    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");
}

#[tokio::test]
async fn student_login_shows_student_sidebar() {
    let server = server();
    login(&server, JOAO).await;

    let page = server.get("/dashboard").await;
    page.assert_status_ok();
    let html = page.text();
    assert!(html.contains("João Silva"));
    assert!(html.contains("Minhas Inscrições"));
    assert!(!html.contains("Gerenciar Usuários"));

    // Já logado: /login devolve ao painel
    let again = server.get("/login").await;
    assert_eq!(location(&again), "/dashboard");
}

#[tokio::test]
async fn unknown_email_keeps_user_on_login_page() {
    let server = server();
    let response = server
        .post("/login")
        .form(&[("email", "ninguem@universidade.edu.br"), ("password", "x")])
        .await;
    response.assert_status_ok();
    assert!(response.text().contains(LOGIN_ERROR));
    server.get("/dashboard").await.assert_status(StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn logout_closes_the_session() {
    let server = server();
    login(&server, JOAO).await;
    server.get("/dashboard").await.assert_status_ok();

    server.get("/logout").await.assert_status(StatusCode::SEE_OTHER);
    let after = server.get("/opportunities").await;
    assert_eq!(location(&after), "/login");
}

#[tokio::test]
async fn pages_outside_the_role_are_forbidden() {
    let server = server();
    login(&server, JOAO).await;
    server.get("/users").await.assert_status(StatusCode::FORBIDDEN);
    server.get("/reports").await.assert_status(StatusCode::FORBIDDEN);
    server.get("/my-enrollments").await.assert_status_ok();
}

#[tokio::test]
async fn switching_role_changes_what_carlos_can_open() {
    let server = server();
    login(&server, CARLOS).await;
    server.get("/approval-requests").await.assert_status_ok();

    let switched = server.post("/session/role").form(&[("role", "docente")]).await;
    switched.assert_status(StatusCode::SEE_OTHER);
    assert!(location(&switched).starts_with("/dashboard?success="));

    server.get("/approval-requests").await.assert_status(StatusCode::FORBIDDEN);
    server.get("/groups").await.assert_status_ok();

    // Perfil que o Carlos não tem: nada muda
    server.post("/session/role").form(&[("role", "administrador")]).await;
    server.get("/users").await.assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn certificate_validation_is_public() {
    let server = server();

    let valid = server.get("/validate-certificate").add_query_param("code", "valido123").await;
    valid.assert_status_ok();
    let html = valid.text();
    assert!(html.contains("Certificado válido!"));
    assert!(html.contains("React.js"));

    let empty = server.post("/validate-certificate").form(&[("code", "   ")]).await;
    assert!(empty.text().contains(EMPTY_CODE_MESSAGE));

    let invalid = server.post("/validate-certificate").form(&[("code", "NAOEXISTE")]).await;
    assert!(invalid.text().contains(INVALID_CODE_MESSAGE));
}

#[tokio::test]
async fn public_portal_needs_no_login() {
    let server = server();
    let page = server.get("/public-portal").await;
    page.assert_status_ok();
    let html = page.text();
    assert!(html.contains("Assessoria Jurídica Popular"));
    assert!(!html.contains("Oficina de Escrita Acadêmica"));
}

#[tokio::test]
async fn enrolling_takes_a_vacancy() {
    let server = server();
    login(&server, PEDRO).await;

    let response = server.post("/opportunities/5/enroll").form(&[("version", "1")]).await;
    response.assert_status(StatusCode::SEE_OTHER);
    assert!(location(&response).starts_with("/opportunities/5?success="));

    let detail = server.get("/opportunities/5").await.text();
    assert!(detail.contains("2 de 10 disponíveis"));

    // Mesma versão outra vez: a oportunidade mudou entretanto
    let stale = server.post("/opportunities/5/enroll").form(&[("version", "1")]).await;
    assert!(location(&stale).starts_with("/opportunities/5?error="));

    let enrollments = server.get("/my-enrollments").await.text();
    assert!(enrollments.contains("Assessoria Jurídica Popular"));
}

#[tokio::test]
async fn a_request_is_reviewed_only_once() {
    let server = server();
    login(&server, CARLOS).await;

    let first = server
        .post("/approval-requests/1/review")
        .form(&[("decision", "aprovado"), ("feedback", ""), ("version", "1")])
        .await;
    assert!(location(&first).starts_with("/approval-requests?success="));

    let second = server
        .post("/approval-requests/1/review")
        .form(&[("decision", "indeferido"), ("feedback", "Duplicado"), ("version", "1")])
        .await;
    assert!(location(&second).starts_with("/approval-requests?error="));
}

#[tokio::test]
async fn admin_manages_users() {
    let server = server();
    login(&server, ADMIN).await;
    server.get("/users").await.assert_status_ok();

    let created = server
        .post("/users")
        .form(&[
            ("name", "Lucas Ferreira"),
            ("email", "lucas.ferreira@universidade.edu.br"),
            ("registration", "2024009999"),
            ("roles", "discente"),
            ("roles", "docente"),
            ("course", ""),
            ("semester", ""),
        ])
        .await;
    assert!(location(&created).starts_with("/users?success="));

    let listing = server.get("/users").add_query_param("search", "lucas").await.text();
    assert!(listing.contains("Lucas Ferreira"));
    assert!(listing.contains("Discente, Docente"));
}

#[tokio::test]
async fn signup_completes_with_the_emailed_code() {
    let server = server();
    let started = server
        .post("/signup")
        .form(&[
            ("name", "Beatriz Alves"),
            ("registration", "2024001111"),
            ("email", "beatriz.alves@universidade.edu.br"),
        ])
        .await;
    assert_eq!(location(&started), "/signup/verify");

    let wrong = server.post("/signup/verify").form(&[("code", "12ab")]).await;
    wrong.assert_status_ok();
    assert!(wrong.text().contains("6 dígitos"));

    let done = server.post("/signup/verify").form(&[("code", "482913")]).await;
    assert!(location(&done).starts_with("/login?success="));

    login(&server, "beatriz.alves@universidade.edu.br").await;
    server.get("/my-enrollments").await.assert_status_ok();
}

#[tokio::test]
async fn preference_redirects_stay_inside_the_portal() {
    let server = server();
    login(&server, JOAO).await;

    let local = server
        .post("/preferences/contrast")
        .form(&[("high_contrast", "on"), ("next", "/certificates")])
        .await;
    assert_eq!(location(&local), "/certificates");

    for next in ["//evil.example", "/\\evil.example", "https://evil.example"] {
        let response = server
            .post("/preferences/contrast")
            .form(&[("next", next)])
            .await;
        assert_eq!(location(&response), "/dashboard", "{}", next);
    }
}

#[tokio::test]
async fn coordination_exports_the_report_as_csv() {
    let server = server();
    login(&server, CARLOS).await;

    server.get("/reports").add_query_param("period", "2025.1").await.assert_status_ok();
    server
        .get("/reports")
        .add_query_param("period", "2025.9")
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let csv = server.get("/reports/export.csv").await;
    csv.assert_status_ok();
    assert!(csv
        .header("content-type")
        .to_str()
        .unwrap()
        .starts_with("text/csv"));
    let body = csv.text();
    assert!(body.starts_with("Nome;Curso;"));
    assert!(body.contains("João Silva"));
    assert_eq!(body.lines().count(), 4); // cabeçalho + 3 discentes
}

#[tokio::test]
async fn students_cannot_export_reports() {
    let server = server();
    login(&server, JOAO).await;
    server
        .get("/reports/export.csv")
        .await
        .assert_status(StatusCode::FORBIDDEN);
}
