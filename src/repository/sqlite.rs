// src/repository/sqlite.rs
use crate::{
    error::{AppError, AppResult},
    fixtures,
    models::{
        approval::{ApprovalRequest, CertificateMetadata, Review},
        certificate::Certificate,
        group::{Group, GroupMember, Ppc},
        notification::Notification,
        opportunity::{AttendanceRecord, Opportunity, OpportunityFilter, OpportunityStatus, Participant},
        user::{normalize_email, NewUser, Role, User},
    },
    repository::PortalRepository,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use std::collections::HashMap;

/// Repositório sobre SQLite. As escritas concorrentes são protegidas por
/// `UPDATE ... WHERE version = ?` dentro de transações.
#[derive(Debug, Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
}

// --- Linhas da base de dados ---

#[derive(Debug, FromRow)]
struct UserRow {
    id: String,
    name: String,
    email: String,
    registration: String,
    course: Option<String>,
    semester: Option<u32>,
}

#[derive(Debug, FromRow)]
struct UserRoleRow {
    user_id: String,
    role: String,
}

#[derive(Debug, FromRow)]
struct OpportunityRow {
    id: String,
    title: String,
    description: String,
    modality: String,
    workload: u32,
    start_date: NaiveDate,
    end_date: NaiveDate,
    vacancies: u32,
    available_vacancies: u32,
    status: String,
    responsible_id: String,
    responsible_name: String,
    created_by: String,
    created_at: DateTime<Utc>,
    version: i64,
}

#[derive(Debug, FromRow)]
struct ParticipantRow {
    opportunity_id: String,
    user_id: String,
    user_name: String,
    user_email: String,
    status: String,
    enrolled_at: DateTime<Utc>,
    completed_hours: u32,
    attendance: String, // JSON
}

#[derive(Debug, FromRow)]
struct ApprovalRequestRow {
    id: String,
    user_id: String,
    user_name: String,
    user_email: String,
    description: String,
    requested_hours: u32,
    certificate_file: String,
    issuer: String,
    certificate_date: NaiveDate,
    certificate_title: String,
    status: String,
    submitted_at: DateTime<Utc>,
    reviewed_at: Option<DateTime<Utc>>,
    reviewed_by: Option<String>,
    reviewer_name: Option<String>,
    feedback: Option<String>,
    deadline: Option<NaiveDate>,
    version: i64,
}

#[derive(Debug, FromRow)]
struct CertificateRow {
    id: String,
    code: String,
    user_id: String,
    user_name: String,
    opportunity_id: Option<String>,
    opportunity_title: String,
    workload: u32,
    issue_date: NaiveDate,
    qr_code: String,
}

#[derive(Debug, FromRow)]
struct GroupRow {
    id: String,
    name: String,
    description: String,
    email: String,
    responsible_id: String,
    responsible_name: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct GroupMemberRow {
    group_id: String,
    user_id: String,
    user_name: String,
    role: Option<String>,
    joined_at: NaiveDate,
}

#[derive(Debug, FromRow)]
struct PpcRow {
    id: String,
    version: String,
    minimum_workload: u32,
    created_by: String,
    created_at: DateTime<Utc>,
    effective_from: NaiveDate,
    effective_until: Option<NaiveDate>,
}

#[derive(Debug, FromRow)]
struct NotificationRow {
    id: String,
    user_id: String,
    kind: String,
    title: String,
    message: String,
    read: bool,
    created_at: DateTime<Utc>,
    action_url: Option<String>,
}

// --- Conversões ---

impl UserRow {
    fn into_user(self, roles: Vec<Role>) -> User {
        User {
            id: self.id,
            name: self.name,
            email: self.email,
            registration: self.registration,
            roles,
            course: self.course,
            semester: self.semester,
        }
    }
}

impl ParticipantRow {
    fn into_participant(self) -> AppResult<Participant> {
        Ok(Participant {
            user_id: self.user_id,
            user_name: self.user_name,
            user_email: self.user_email,
            status: self.status.parse()?,
            enrolled_at: self.enrolled_at,
            completed_hours: self.completed_hours,
            attendance: serde_json::from_str(&self.attendance)?,
        })
    }
}

impl OpportunityRow {
    fn into_opportunity(self, participants: Vec<Participant>) -> AppResult<Opportunity> {
        Ok(Opportunity {
            id: self.id,
            title: self.title,
            description: self.description,
            modality: self.modality.parse()?,
            workload: self.workload,
            start_date: self.start_date,
            end_date: self.end_date,
            vacancies: self.vacancies,
            available_vacancies: self.available_vacancies,
            status: self.status.parse()?,
            responsible_id: self.responsible_id,
            responsible_name: self.responsible_name,
            created_by: self.created_by,
            created_at: self.created_at,
            participants,
            version: self.version,
        })
    }
}

impl TryFrom<ApprovalRequestRow> for ApprovalRequest {
    type Error = AppError;

    fn try_from(row: ApprovalRequestRow) -> AppResult<Self> {
        Ok(ApprovalRequest {
            id: row.id,
            user_id: row.user_id,
            user_name: row.user_name,
            user_email: row.user_email,
            description: row.description,
            requested_hours: row.requested_hours,
            certificate_file: row.certificate_file,
            certificate_metadata: CertificateMetadata {
                issuer: row.issuer,
                date: row.certificate_date,
                title: row.certificate_title,
            },
            status: row.status.parse()?,
            submitted_at: row.submitted_at,
            reviewed_at: row.reviewed_at,
            reviewed_by: row.reviewed_by,
            reviewer_name: row.reviewer_name,
            feedback: row.feedback,
            deadline: row.deadline,
            version: row.version,
        })
    }
}

impl From<CertificateRow> for Certificate {
    fn from(row: CertificateRow) -> Self {
        Certificate {
            id: row.id,
            code: row.code,
            user_id: row.user_id,
            user_name: row.user_name,
            opportunity_id: row.opportunity_id,
            opportunity_title: row.opportunity_title,
            workload: row.workload,
            issue_date: row.issue_date,
            qr_code: row.qr_code,
        }
    }
}

impl From<PpcRow> for Ppc {
    fn from(row: PpcRow) -> Self {
        Ppc {
            id: row.id,
            version: row.version,
            minimum_workload: row.minimum_workload,
            created_by: row.created_by,
            created_at: row.created_at,
            effective_from: row.effective_from,
            effective_until: row.effective_until,
        }
    }
}

impl TryFrom<NotificationRow> for Notification {
    type Error = AppError;

    fn try_from(row: NotificationRow) -> AppResult<Self> {
        Ok(Notification {
            id: row.id,
            user_id: row.user_id,
            kind: row.kind.parse()?,
            title: row.title,
            message: row.message,
            read: row.read,
            created_at: row.created_at,
            action_url: row.action_url,
        })
    }
}

const OPPORTUNITY_COLUMNS: &str = "id, title, description, modality, workload, start_date, end_date, \
     vacancies, available_vacancies, status, responsible_id, responsible_name, created_by, \
     created_at, version";

const PARTICIPANT_COLUMNS: &str = "opportunity_id, user_id, user_name, user_email, status, \
     enrolled_at, completed_hours, attendance";

const REQUEST_COLUMNS: &str = "id, user_id, user_name, user_email, description, requested_hours, \
     certificate_file, issuer, certificate_date, certificate_title, status, submitted_at, \
     reviewed_at, reviewed_by, reviewer_name, feedback, deadline, version";

const CERTIFICATE_COLUMNS: &str = "id, code, user_id, user_name, opportunity_id, \
     opportunity_title, workload, issue_date, qr_code";

// --- Escritas partilhadas (semente e operações) ---

async fn insert_user(conn: &mut SqliteConnection, user: &User) -> AppResult<()> {
    let inserted = sqlx::query(
        "INSERT INTO users (id, name, email, registration, course, semester) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )
    .bind(&user.id)
    .bind(&user.name)
    .bind(&user.email)
    .bind(&user.registration)
    .bind(&user.course)
    .bind(user.semester)
    .execute(&mut *conn)
    .await;

    if let Err(sqlx::Error::Database(db_err)) = &inserted {
        if db_err.is_unique_violation() {
            tracing::warn!("Falha ao criar utilizador: e-mail '{}' já existe.", user.email);
            return Err(AppError::Conflict(format!(
                "Já existe um utilizador com o e-mail {}.",
                user.email
            )));
        }
    }
    inserted?;
    replace_roles(conn, &user.id, &user.roles).await
}

async fn replace_roles(conn: &mut SqliteConnection, user_id: &str, roles: &[Role]) -> AppResult<()> {
    sqlx::query("DELETE FROM user_roles WHERE user_id = ?1")
        .bind(user_id)
        .execute(&mut *conn)
        .await?;
    for (position, role) in roles.iter().enumerate() {
        sqlx::query("INSERT INTO user_roles (user_id, role, position) VALUES (?1, ?2, ?3)")
            .bind(user_id)
            .bind(role.as_str())
            .bind(position as i64)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

async fn insert_opportunity(conn: &mut SqliteConnection, o: &Opportunity) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO opportunities (id, title, description, modality, workload, start_date, end_date,
            vacancies, available_vacancies, status, responsible_id, responsible_name, created_by,
            created_at, version)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
        "#,
    )
    .bind(&o.id)
    .bind(&o.title)
    .bind(&o.description)
    .bind(o.modality.as_str())
    .bind(o.workload)
    .bind(o.start_date)
    .bind(o.end_date)
    .bind(o.vacancies)
    .bind(o.available_vacancies)
    .bind(o.status.as_str())
    .bind(&o.responsible_id)
    .bind(&o.responsible_name)
    .bind(&o.created_by)
    .bind(o.created_at)
    .bind(o.version)
    .execute(&mut *conn)
    .await?;

    for participant in &o.participants {
        upsert_participant(conn, &o.id, participant).await?;
    }
    Ok(())
}

async fn upsert_participant(
    conn: &mut SqliteConnection,
    opportunity_id: &str,
    p: &Participant,
) -> AppResult<()> {
    let attendance = serde_json::to_string(&p.attendance)?;
    sqlx::query(
        r#"
        INSERT INTO participants (opportunity_id, user_id, user_name, user_email, status,
            enrolled_at, completed_hours, attendance)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        ON CONFLICT (opportunity_id, user_id) DO UPDATE SET
            status = excluded.status,
            completed_hours = excluded.completed_hours,
            attendance = excluded.attendance
        "#,
    )
    .bind(opportunity_id)
    .bind(&p.user_id)
    .bind(&p.user_name)
    .bind(&p.user_email)
    .bind(p.status.as_str())
    .bind(p.enrolled_at)
    .bind(p.completed_hours)
    .bind(attendance)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn insert_request(conn: &mut SqliteConnection, r: &ApprovalRequest) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO approval_requests (id, user_id, user_name, user_email, description,
            requested_hours, certificate_file, issuer, certificate_date, certificate_title, status,
            submitted_at, reviewed_at, reviewed_by, reviewer_name, feedback, deadline, version)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)
        "#,
    )
    .bind(&r.id)
    .bind(&r.user_id)
    .bind(&r.user_name)
    .bind(&r.user_email)
    .bind(&r.description)
    .bind(r.requested_hours)
    .bind(&r.certificate_file)
    .bind(&r.certificate_metadata.issuer)
    .bind(r.certificate_metadata.date)
    .bind(&r.certificate_metadata.title)
    .bind(r.status.as_str())
    .bind(r.submitted_at)
    .bind(r.reviewed_at)
    .bind(&r.reviewed_by)
    .bind(&r.reviewer_name)
    .bind(&r.feedback)
    .bind(r.deadline)
    .bind(r.version)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn insert_certificate(conn: &mut SqliteConnection, c: &Certificate) -> AppResult<()> {
    let inserted = sqlx::query(
        r#"
        INSERT INTO certificates (id, code, user_id, user_name, opportunity_id, opportunity_title,
            workload, issue_date, qr_code)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )
    .bind(&c.id)
    .bind(&c.code)
    .bind(&c.user_id)
    .bind(&c.user_name)
    .bind(&c.opportunity_id)
    .bind(&c.opportunity_title)
    .bind(c.workload)
    .bind(c.issue_date)
    .bind(&c.qr_code)
    .execute(&mut *conn)
    .await;

    if let Err(sqlx::Error::Database(db_err)) = &inserted {
        if db_err.is_unique_violation() {
            return Err(AppError::Conflict("Código de certificado duplicado.".to_string()));
        }
    }
    inserted?;
    Ok(())
}

async fn insert_notification(conn: &mut SqliteConnection, n: &Notification) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO notifications (id, user_id, kind, title, message, read, created_at, action_url)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&n.id)
    .bind(&n.user_id)
    .bind(n.kind.as_str())
    .bind(&n.title)
    .bind(&n.message)
    .bind(n.read)
    .bind(n.created_at)
    .bind(&n.action_url)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn insert_group(conn: &mut SqliteConnection, g: &Group) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO groups (id, name, description, email, responsible_id, responsible_name, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&g.id)
    .bind(&g.name)
    .bind(&g.description)
    .bind(&g.email)
    .bind(&g.responsible_id)
    .bind(&g.responsible_name)
    .bind(g.created_at)
    .execute(&mut *conn)
    .await?;

    for member in &g.members {
        sqlx::query(
            "INSERT INTO group_members (group_id, user_id, user_name, role, joined_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&g.id)
        .bind(&member.user_id)
        .bind(&member.user_name)
        .bind(&member.role)
        .bind(member.joined_at)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

async fn insert_ppc(conn: &mut SqliteConnection, p: &Ppc) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO ppcs (id, version, minimum_workload, created_by, created_at, effective_from, effective_until)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&p.id)
    .bind(&p.version)
    .bind(p.minimum_workload)
    .bind(&p.created_by)
    .bind(p.created_at)
    .bind(p.effective_from)
    .bind(p.effective_until)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Avança a versão de uma linha se ainda estiver na versão esperada.
/// Devolve `NotFound` se a linha não existir e `Conflict` se a versão mudou.
async fn bump_version(
    conn: &mut SqliteConnection,
    table: &'static str,
    what: &'static str,
    id: &str,
    expected_version: i64,
) -> AppResult<()> {
    let sql = format!(
        "UPDATE {} SET version = version + 1 WHERE id = ?1 AND version = ?2",
        table
    );
    let result = sqlx::query(&sql)
        .bind(id)
        .bind(expected_version)
        .execute(&mut *conn)
        .await?;
    if result.rows_affected() == 1 {
        return Ok(());
    }

    let exists: Option<i64> = sqlx::query_scalar(&format!("SELECT version FROM {} WHERE id = ?1", table))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    match exists {
        None => Err(AppError::NotFound(what)),
        Some(found) => {
            tracing::warn!(
                "Conflito de versão em {} '{}': esperada {}, encontrada {}",
                what,
                id,
                expected_version,
                found
            );
            Err(AppError::Conflict(format!(
                "Este registo ({}) foi alterado por outra pessoa. Recarregue a página e tente novamente.",
                what
            )))
        }
    }
}

impl SqliteRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Carrega os dados de demonstração numa base vazia.
    pub async fn seed_if_empty(&self) -> AppResult<()> {
        let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        if users > 0 {
            tracing::debug!("Base já tem {} utilizadores; sem semente.", users);
            return Ok(());
        }

        tracing::info!("🌱 Base vazia, carregando dados de demonstração...");
        let mut tx = self.pool.begin().await?;
        for user in fixtures::users() {
            insert_user(&mut tx, &user).await?;
        }
        for opportunity in fixtures::opportunities() {
            insert_opportunity(&mut tx, &opportunity).await?;
        }
        for request in fixtures::approval_requests() {
            insert_request(&mut tx, &request).await?;
        }
        for certificate in fixtures::certificates() {
            insert_certificate(&mut tx, &certificate).await?;
        }
        for group in fixtures::groups() {
            insert_group(&mut tx, &group).await?;
        }
        for ppc in fixtures::ppcs() {
            insert_ppc(&mut tx, &ppc).await?;
        }
        for notification in fixtures::notifications() {
            insert_notification(&mut tx, &notification).await?;
        }
        tx.commit().await?;
        tracing::info!("Dados de demonstração carregados.");
        Ok(())
    }

    async fn roles_by_user(&self) -> AppResult<HashMap<String, Vec<Role>>> {
        let rows = sqlx::query_as::<_, UserRoleRow>(
            "SELECT user_id, role FROM user_roles ORDER BY user_id, position",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut roles: HashMap<String, Vec<Role>> = HashMap::new();
        for row in rows {
            roles.entry(row.user_id).or_default().push(row.role.parse()?);
        }
        Ok(roles)
    }

    async fn user_with_roles(&self, row: UserRow) -> AppResult<User> {
        let roles = sqlx::query_scalar::<_, String>(
            "SELECT role FROM user_roles WHERE user_id = ?1 ORDER BY position",
        )
        .bind(&row.id)
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(|role| role.parse())
        .collect::<AppResult<Vec<Role>>>()?;
        Ok(row.into_user(roles))
    }

    async fn load_opportunity(conn: &mut SqliteConnection, id: &str) -> AppResult<Option<Opportunity>> {
        let row = sqlx::query_as::<_, OpportunityRow>(&format!(
            "SELECT {} FROM opportunities WHERE id = ?1",
            OPPORTUNITY_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
        let Some(row) = row else {
            return Ok(None);
        };

        let participants = sqlx::query_as::<_, ParticipantRow>(&format!(
            "SELECT {} FROM participants WHERE opportunity_id = ?1 ORDER BY enrolled_at",
            PARTICIPANT_COLUMNS
        ))
        .bind(id)
        .fetch_all(&mut *conn)
        .await?
        .into_iter()
        .map(ParticipantRow::into_participant)
        .collect::<AppResult<Vec<_>>>()?;

        row.into_opportunity(participants).map(Some)
    }
}

#[async_trait]
impl PortalRepository for SqliteRepository {
    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let email = normalize_email(email);
        tracing::debug!("Buscando utilizador por e-mail: {}", email);
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, name, email, registration, course, semester FROM users WHERE email = ?1",
        )
        .bind(&email)
        .fetch_optional(&self.pool)
        .await?;
        match row {
            Some(row) => self.user_with_roles(row).await.map(Some),
            None => Ok(None),
        }
    }

    async fn find_user_by_id(&self, id: &str) -> AppResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, name, email, registration, course, semester FROM users WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        match row {
            Some(row) => self.user_with_roles(row).await.map(Some),
            None => Ok(None),
        }
    }

    async fn list_users(&self) -> AppResult<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(
            "SELECT id, name, email, registration, course, semester FROM users ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        let mut roles = self.roles_by_user().await?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let user_roles = roles.remove(&row.id).unwrap_or_default();
                row.into_user(user_roles)
            })
            .collect())
    }

    async fn create_user(&self, new_user: NewUser) -> AppResult<User> {
        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            name: new_user.name.trim().to_string(),
            email: normalize_email(&new_user.email),
            registration: new_user.registration.trim().to_string(),
            roles: new_user.roles,
            course: new_user.course,
            semester: new_user.semester,
        };
        let mut tx = self.pool.begin().await?;
        insert_user(&mut tx, &user).await?;
        tx.commit().await?;
        tracing::info!("Utilizador '{}' criado com perfis {:?}.", user.email, user.roles);
        Ok(user)
    }

    async fn set_user_roles(&self, user_id: &str, roles: &[Role]) -> AppResult<User> {
        let mut tx = self.pool.begin().await?;
        let exists: Option<String> = sqlx::query_scalar("SELECT id FROM users WHERE id = ?1")
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(AppError::NotFound("utilizador"));
        }
        replace_roles(&mut tx, user_id, roles).await?;
        tx.commit().await?;
        self.find_user_by_id(user_id)
            .await?
            .ok_or(AppError::NotFound("utilizador"))
    }

    async fn delete_user(&self, user_id: &str) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("utilizador"));
        }
        Ok(())
    }

    async fn list_opportunities(&self, filter: &OpportunityFilter) -> AppResult<Vec<Opportunity>> {
        let rows = sqlx::query_as::<_, OpportunityRow>(&format!(
            "SELECT {} FROM opportunities ORDER BY start_date, title",
            OPPORTUNITY_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        let mut participants: HashMap<String, Vec<Participant>> = HashMap::new();
        let participant_rows = sqlx::query_as::<_, ParticipantRow>(&format!(
            "SELECT {} FROM participants ORDER BY enrolled_at",
            PARTICIPANT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        for row in participant_rows {
            let opportunity_id = row.opportunity_id.clone();
            participants
                .entry(opportunity_id)
                .or_default()
                .push(row.into_participant()?);
        }

        let mut opportunities = Vec::with_capacity(rows.len());
        for row in rows {
            let list = participants.remove(&row.id).unwrap_or_default();
            let opportunity = row.into_opportunity(list)?;
            if filter.matches(&opportunity) {
                opportunities.push(opportunity);
            }
        }
        Ok(opportunities)
    }

    async fn find_opportunity(&self, id: &str) -> AppResult<Option<Opportunity>> {
        let mut conn = self.pool.acquire().await?;
        Self::load_opportunity(&mut conn, id).await
    }

    async fn create_opportunity(&self, opportunity: Opportunity) -> AppResult<Opportunity> {
        let mut tx = self.pool.begin().await?;
        insert_opportunity(&mut tx, &opportunity).await?;
        tx.commit().await?;
        Ok(opportunity)
    }

    async fn update_opportunity_status(
        &self,
        id: &str,
        expected_version: i64,
        next: OpportunityStatus,
    ) -> AppResult<Opportunity> {
        let mut tx = self.pool.begin().await?;
        bump_version(&mut tx, "opportunities", "oportunidade", id, expected_version).await?;
        sqlx::query("UPDATE opportunities SET status = ?1 WHERE id = ?2")
            .bind(next.as_str())
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let updated = Self::load_opportunity(&mut tx, id)
            .await?
            .ok_or(AppError::NotFound("oportunidade"))?;
        tx.commit().await?;
        Ok(updated)
    }

    async fn enroll(
        &self,
        opportunity_id: &str,
        expected_version: i64,
        participant: Participant,
    ) -> AppResult<Opportunity> {
        let mut tx = self.pool.begin().await?;
        let mut opportunity = Self::load_opportunity(&mut tx, opportunity_id)
            .await?
            .ok_or(AppError::NotFound("oportunidade"))?;
        // Versão primeiro: um erro de validação depois disto desfaz a transação
        bump_version(&mut tx, "opportunities", "oportunidade", opportunity_id, expected_version).await?;
        opportunity.apply_enrollment(participant.clone())?;

        sqlx::query("UPDATE opportunities SET available_vacancies = ?1 WHERE id = ?2")
            .bind(opportunity.available_vacancies)
            .bind(opportunity_id)
            .execute(&mut *tx)
            .await?;
        upsert_participant(&mut tx, opportunity_id, &participant).await?;
        tx.commit().await?;
        Ok(opportunity)
    }

    async fn record_attendance(
        &self,
        opportunity_id: &str,
        expected_version: i64,
        user_id: &str,
        record: AttendanceRecord,
    ) -> AppResult<Opportunity> {
        let mut tx = self.pool.begin().await?;
        let mut opportunity = Self::load_opportunity(&mut tx, opportunity_id)
            .await?
            .ok_or(AppError::NotFound("oportunidade"))?;
        bump_version(&mut tx, "opportunities", "oportunidade", opportunity_id, expected_version).await?;
        opportunity.apply_attendance(user_id, record)?;

        if let Some(participant) = opportunity.participant(user_id) {
            upsert_participant(&mut tx, opportunity_id, participant).await?;
        }
        tx.commit().await?;
        Ok(opportunity)
    }

    async fn list_approval_requests(&self) -> AppResult<Vec<ApprovalRequest>> {
        sqlx::query_as::<_, ApprovalRequestRow>(&format!(
            "SELECT {} FROM approval_requests ORDER BY submitted_at DESC",
            REQUEST_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(ApprovalRequest::try_from)
        .collect()
    }

    async fn find_approval_request(&self, id: &str) -> AppResult<Option<ApprovalRequest>> {
        sqlx::query_as::<_, ApprovalRequestRow>(&format!(
            "SELECT {} FROM approval_requests WHERE id = ?1",
            REQUEST_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(ApprovalRequest::try_from)
        .transpose()
    }

    async fn submit_approval_request(&self, request: ApprovalRequest) -> AppResult<ApprovalRequest> {
        let mut conn = self.pool.acquire().await?;
        insert_request(&mut conn, &request).await?;
        Ok(request)
    }

    async fn review_approval_request(
        &self,
        id: &str,
        expected_version: i64,
        review: &Review,
    ) -> AppResult<ApprovalRequest> {
        let mut tx = self.pool.begin().await?;
        let mut request: ApprovalRequest = sqlx::query_as::<_, ApprovalRequestRow>(&format!(
            "SELECT {} FROM approval_requests WHERE id = ?1",
            REQUEST_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::NotFound("solicitação"))?
        .try_into()?;

        bump_version(&mut tx, "approval_requests", "solicitação", id, expected_version).await?;
        request.apply_review(review)?;

        sqlx::query(
            r#"
            UPDATE approval_requests
            SET status = ?1, reviewed_at = ?2, reviewed_by = ?3, reviewer_name = ?4, feedback = ?5
            WHERE id = ?6
            "#,
        )
        .bind(request.status.as_str())
        .bind(request.reviewed_at)
        .bind(&request.reviewed_by)
        .bind(&request.reviewer_name)
        .bind(&request.feedback)
        .bind(id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(request)
    }

    async fn list_certificates(&self) -> AppResult<Vec<Certificate>> {
        let rows = sqlx::query_as::<_, CertificateRow>(&format!(
            "SELECT {} FROM certificates ORDER BY issue_date DESC",
            CERTIFICATE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Certificate::from).collect())
    }

    async fn find_certificate_by_code(&self, code: &str) -> AppResult<Option<Certificate>> {
        // A coluna usa COLLATE NOCASE
        let row = sqlx::query_as::<_, CertificateRow>(&format!(
            "SELECT {} FROM certificates WHERE code = ?1",
            CERTIFICATE_COLUMNS
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Certificate::from))
    }

    async fn issue_certificate(&self, certificate: Certificate) -> AppResult<Certificate> {
        let mut conn = self.pool.acquire().await?;
        insert_certificate(&mut conn, &certificate).await?;
        Ok(certificate)
    }

    async fn list_groups(&self) -> AppResult<Vec<Group>> {
        let rows = sqlx::query_as::<_, GroupRow>(
            "SELECT id, name, description, email, responsible_id, responsible_name, created_at FROM groups ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        let member_rows = sqlx::query_as::<_, GroupMemberRow>(
            "SELECT group_id, user_id, user_name, role, joined_at FROM group_members ORDER BY joined_at",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut members: HashMap<String, Vec<GroupMember>> = HashMap::new();
        for row in member_rows {
            members.entry(row.group_id).or_default().push(GroupMember {
                user_id: row.user_id,
                user_name: row.user_name,
                role: row.role,
                joined_at: row.joined_at,
            });
        }

        Ok(rows
            .into_iter()
            .map(|row| Group {
                members: members.remove(&row.id).unwrap_or_default(),
                id: row.id,
                name: row.name,
                description: row.description,
                email: row.email,
                responsible_id: row.responsible_id,
                responsible_name: row.responsible_name,
                created_at: row.created_at,
            })
            .collect())
    }

    async fn list_ppcs(&self) -> AppResult<Vec<Ppc>> {
        let rows = sqlx::query_as::<_, PpcRow>(
            "SELECT id, version, minimum_workload, created_by, created_at, effective_from, effective_until FROM ppcs ORDER BY effective_from DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Ppc::from).collect())
    }

    async fn list_notifications(&self, user_id: &str) -> AppResult<Vec<Notification>> {
        sqlx::query_as::<_, NotificationRow>(
            "SELECT id, user_id, kind, title, message, read, created_at, action_url FROM notifications WHERE user_id = ?1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(Notification::try_from)
        .collect()
    }

    async fn push_notifications(&self, notifications: Vec<Notification>) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;
        for notification in &notifications {
            insert_notification(&mut tx, notification).await?;
        }
        tx.commit().await?;
        tracing::debug!("{} notificações gravadas.", notifications.len());
        Ok(())
    }

    async fn mark_notifications_read(&self, user_id: &str) -> AppResult<usize> {
        let result = sqlx::query("UPDATE notifications SET read = 1 WHERE user_id = ?1 AND read = 0")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::create_memory_pool,
        models::{approval::ReviewDecision, opportunity::EnrollmentStatus},
    };

    async fn seeded_repo() -> SqliteRepository {
        let pool = create_memory_pool().await.unwrap();
        let repo = SqliteRepository::new(pool);
        repo.seed_if_empty().await.unwrap();
        repo
    }

    fn participant(user_id: &str) -> Participant {
        Participant {
            user_id: user_id.into(),
            user_name: "Aluno".into(),
            user_email: format!("{}@universidade.edu.br", user_id),
            status: EnrollmentStatus::Inscrito,
            enrolled_at: Utc::now(),
            completed_hours: 0,
            attendance: vec![],
        }
    }

    #[tokio::test]
    async fn seeding_is_idempotent_and_keeps_role_order() {
        let repo = seeded_repo().await;
        repo.seed_if_empty().await.unwrap();
        let users = repo.list_users().await.unwrap();
        assert_eq!(users.len(), fixtures::users().len());

        let carlos = repo
            .find_user_by_email("CARLOS.MENDES@universidade.edu.br")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(carlos.roles, vec![Role::Coordenador, Role::Docente]);
    }

    #[tokio::test]
    async fn opportunities_round_trip_with_participants() {
        let repo = seeded_repo().await;
        let expected = fixtures::opportunities();
        let loaded = repo.list_opportunities(&OpportunityFilter::default()).await.unwrap();
        assert_eq!(loaded.len(), expected.len());

        let running = repo.find_opportunity("2").await.unwrap().unwrap();
        let fixture = expected.iter().find(|o| o.id == "2").unwrap();
        assert_eq!(running.participants.len(), fixture.participants.len());
        assert_eq!(running.status, OpportunityStatus::EmExecucao);
    }

    #[tokio::test]
    async fn enrollment_with_stale_version_is_a_conflict() {
        let repo = seeded_repo().await;
        let opportunity = repo.find_opportunity("5").await.unwrap().unwrap();
        let updated = repo
            .enroll("5", opportunity.version, participant("novo"))
            .await
            .unwrap();
        assert_eq!(updated.available_vacancies, opportunity.available_vacancies - 1);

        let err = repo
            .enroll("5", opportunity.version, participant("outro"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let stored = repo.find_opportunity("5").await.unwrap().unwrap();
        assert_eq!(stored.available_vacancies, updated.available_vacancies);
        assert!(stored.is_enrolled("novo"));
        assert!(!stored.is_enrolled("outro"));
    }

    #[tokio::test]
    async fn attendance_checks_the_version_before_the_record() {
        let repo = seeded_repo().await;
        let running = repo.find_opportunity("2").await.unwrap().unwrap();
        let user_id = running.participants[0].user_id.clone();
        let empty = AttendanceRecord {
            date: Utc::now().date_naive(),
            hours: 0,
            description: "Sem horas".into(),
        };

        let err = repo
            .record_attendance("2", running.version - 1, &user_id, empty.clone())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        // Registo inválido na versão certa: nada fica gravado
        let err = repo
            .record_attendance("2", running.version, &user_id, empty)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        let stored = repo.find_opportunity("2").await.unwrap().unwrap();
        assert_eq!(stored.version, running.version);
    }

    #[tokio::test]
    async fn second_review_is_rejected() {
        let repo = seeded_repo().await;
        let request = repo.find_approval_request("1").await.unwrap().unwrap();
        let review = Review {
            decision: ReviewDecision::Aprovado,
            reviewer_id: "3".into(),
            reviewer_name: "Carlos Mendes".into(),
            feedback: "Ok".into(),
            reviewed_at: Utc::now(),
        };
        let reviewed = repo
            .review_approval_request("1", request.version, &review)
            .await
            .unwrap();
        assert_eq!(reviewed.status.as_str(), "aprovado");

        let again = repo
            .review_approval_request("1", reviewed.version, &review)
            .await
            .unwrap_err();
        assert!(matches!(again, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn certificate_lookup_ignores_case() {
        let repo = seeded_repo().await;
        let cert = repo.find_certificate_by_code("valido123").await.unwrap().unwrap();
        assert_eq!(cert.user_name, "João Silva");
        assert_eq!(cert.workload, 40);
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let repo = seeded_repo().await;
        let err = repo
            .create_user(NewUser {
                name: "Admin 2".into(),
                email: "Admin@universidade.edu.br".into(),
                registration: "X1".into(),
                roles: vec![Role::Administrador],
                course: None,
                semester: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }
}
