//! Credential and lead store.
//!
//! Every write is a single-row insert; uniqueness of email and username is
//! enforced by the backend at insert time and reported as
//! [`StoreError::Duplicate`].

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use uuid::Uuid;

use crate::auth::repo_types::{NewUser, User};
use crate::contacts::repo_types::{Lead, LeadWithAgent, NewLead};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("email or username already taken")]
    Duplicate,
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait Store: Send + Sync {
    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;

    /// Match a lower-cased identifier against email or username.
    async fn find_user_by_login(&self, email_or_username: &str) -> StoreResult<Option<User>>;

    async fn find_user_by_email_or_username(
        &self,
        email: &str,
        username: &str,
    ) -> StoreResult<Option<User>>;

    /// Only users with role `agent` resolve.
    async fn find_agent_by_username(&self, username: &str) -> StoreResult<Option<User>>;

    async fn create_user(&self, user: NewUser) -> StoreResult<User>;

    async fn list_agents(&self) -> StoreResult<Vec<User>>;

    async fn create_lead(&self, lead: NewLead) -> StoreResult<Lead>;

    /// All leads, newest first, with the referring agent expanded.
    async fn list_leads_with_agents(&self) -> StoreResult<Vec<LeadWithAgent>>;

    /// Leads referred by one agent, newest first.
    async fn list_leads_for_agent(&self, agent_id: Uuid) -> StoreResult<Vec<Lead>>;
}
