use anyhow::Context;
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};
use uuid::Uuid;

use super::{Store, StoreError, StoreResult};
use crate::auth::repo_types::{NewUser, Role, User, UserRow};
use crate::contacts::repo_types::{Lead, LeadRow, LeadWithAgent, LeadWithAgentRow, NewLead};

const USER_COLUMNS: &str =
    "id, first_name, last_name, email, username, password_hash, role, referral_code, created_at";

const LEAD_COLUMNS: &str = "id, name, email, phone, message, destination, travel_date, \
     number_of_travelers, budget, referred_by, status, created_at";

/// Postgres-backed store.
#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let db = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .context("connect to database")?;
        Ok(Self { db })
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.db)
            .await
            .context("run migrations")?;
        Ok(())
    }

    async fn fetch_user(&self, sql: &str, binds: &[&str]) -> StoreResult<Option<User>> {
        let mut q = sqlx::query_as::<_, UserRow>(sql);
        for b in binds {
            q = q.bind(*b);
        }
        let row = q.fetch_optional(&self.db).await.map_err(backend)?;
        row.map(User::try_from).transpose().map_err(StoreError::Backend)
    }
}

fn backend(e: sqlx::Error) -> StoreError {
    StoreError::Backend(anyhow::Error::new(e))
}

#[async_trait]
impl Store for PgStore {
    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .map_err(backend)?;
        row.map(User::try_from).transpose().map_err(StoreError::Backend)
    }

    async fn find_user_by_login(&self, email_or_username: &str) -> StoreResult<Option<User>> {
        self.fetch_user(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1 OR username = $1 \
                 ORDER BY (email = $1) DESC LIMIT 1"),
            &[email_or_username],
        )
        .await
    }

    async fn find_user_by_email_or_username(
        &self,
        email: &str,
        username: &str,
    ) -> StoreResult<Option<User>> {
        self.fetch_user(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1 OR username = $2 LIMIT 1"),
            &[email, username],
        )
        .await
    }

    async fn find_agent_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        self.fetch_user(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1 AND role = 'agent'"),
            &[username],
        )
        .await
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO users (id, first_name, last_name, email, username, password_hash, role, referral_code)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(&user.referral_code)
        .fetch_one(&self.db)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => StoreError::Duplicate,
            other => backend(other),
        })?;
        Ok(User::try_from(row)?)
    }

    async fn list_agents(&self) -> StoreResult<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE role = $1 ORDER BY created_at DESC"
        ))
        .bind(Role::Agent.as_str())
        .fetch_all(&self.db)
        .await
        .map_err(backend)?;
        rows.into_iter()
            .map(User::try_from)
            .collect::<anyhow::Result<_>>()
            .map_err(StoreError::Backend)
    }

    async fn create_lead(&self, lead: NewLead) -> StoreResult<Lead> {
        let row = sqlx::query_as::<_, LeadRow>(&format!(
            r#"
            INSERT INTO leads (id, name, email, phone, message, destination, travel_date,
                               number_of_travelers, budget, referred_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {LEAD_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&lead.name)
        .bind(&lead.email)
        .bind(&lead.phone)
        .bind(&lead.message)
        .bind(&lead.destination)
        .bind(&lead.travel_date)
        .bind(&lead.number_of_travelers)
        .bind(&lead.budget)
        .bind(lead.referred_by)
        .fetch_one(&self.db)
        .await
        .map_err(backend)?;
        Ok(Lead::try_from(row)?)
    }

    async fn list_leads_with_agents(&self) -> StoreResult<Vec<LeadWithAgent>> {
        let rows = sqlx::query_as::<_, LeadWithAgentRow>(
            r#"
            SELECT l.id, l.name, l.email, l.phone, l.message, l.destination, l.travel_date,
                   l.number_of_travelers, l.budget, l.referred_by, l.status, l.created_at,
                   u.first_name AS agent_first_name,
                   u.last_name  AS agent_last_name,
                   u.email      AS agent_email,
                   u.username   AS agent_username
              FROM leads l
              JOIN users u ON u.id = l.referred_by
             ORDER BY l.created_at DESC
            "#,
        )
        .fetch_all(&self.db)
        .await
        .map_err(backend)?;
        rows.into_iter()
            .map(LeadWithAgent::try_from)
            .collect::<anyhow::Result<_>>()
            .map_err(StoreError::Backend)
    }

    async fn list_leads_for_agent(&self, agent_id: Uuid) -> StoreResult<Vec<Lead>> {
        let rows = sqlx::query_as::<_, LeadRow>(&format!(
            "SELECT {LEAD_COLUMNS} FROM leads WHERE referred_by = $1 ORDER BY created_at DESC"
        ))
        .bind(agent_id)
        .fetch_all(&self.db)
        .await
        .map_err(backend)?;
        rows.into_iter()
            .map(Lead::try_from)
            .collect::<anyhow::Result<_>>()
            .map_err(StoreError::Backend)
    }
}
