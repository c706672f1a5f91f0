use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Store, StoreError, StoreResult};
use crate::auth::repo_types::{NewUser, Role, User};
use crate::contacts::repo_types::{AgentRef, Lead, LeadStatus, LeadWithAgent, NewLead};

#[derive(Default)]
struct Inner {
    users: Vec<User>,
    leads: Vec<Lead>,
}

/// In-process store for tests and local runs without Postgres.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn user_count(&self) -> usize {
        self.inner.read().await.users.len()
    }
}

fn newest_first(leads: &mut [Lead]) {
    leads.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_login(&self, email_or_username: &str) -> StoreResult<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .iter()
            .find(|u| u.email == email_or_username)
            .or_else(|| inner.users.iter().find(|u| u.username == email_or_username))
            .cloned())
    }

    async fn find_user_by_email_or_username(
        &self,
        email: &str,
        username: &str,
    ) -> StoreResult<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .iter()
            .find(|u| u.email == email || u.username == username)
            .cloned())
    }

    async fn find_agent_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .iter()
            .find(|u| u.username == username && u.role == Role::Agent)
            .cloned())
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        // Check and insert under one write lock, like a unique index would.
        let mut inner = self.inner.write().await;
        if inner
            .users
            .iter()
            .any(|u| u.email == user.email || u.username == user.username)
        {
            return Err(StoreError::Duplicate);
        }
        let created = User {
            id: Uuid::new_v4(),
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            username: user.username,
            password_hash: user.password_hash,
            role: user.role,
            referral_code: user.referral_code,
            created_at: OffsetDateTime::now_utc(),
        };
        inner.users.push(created.clone());
        Ok(created)
    }

    async fn list_agents(&self) -> StoreResult<Vec<User>> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .iter()
            .filter(|u| u.role == Role::Agent)
            .cloned()
            .collect())
    }

    async fn create_lead(&self, lead: NewLead) -> StoreResult<Lead> {
        let mut inner = self.inner.write().await;
        if !inner.users.iter().any(|u| u.id == lead.referred_by) {
            return Err(StoreError::Backend(anyhow::anyhow!(
                "referring user {} does not exist",
                lead.referred_by
            )));
        }
        let created = Lead {
            id: Uuid::new_v4(),
            name: lead.name,
            email: lead.email,
            phone: lead.phone,
            message: lead.message,
            destination: lead.destination,
            travel_date: lead.travel_date,
            number_of_travelers: lead.number_of_travelers,
            budget: lead.budget,
            referred_by: lead.referred_by,
            status: LeadStatus::New,
            created_at: OffsetDateTime::now_utc(),
        };
        inner.leads.push(created.clone());
        Ok(created)
    }

    async fn list_leads_with_agents(&self) -> StoreResult<Vec<LeadWithAgent>> {
        let inner = self.inner.read().await;
        let mut leads = inner.leads.clone();
        newest_first(&mut leads);
        Ok(leads
            .into_iter()
            .filter_map(|lead| {
                let agent = inner.users.iter().find(|u| u.id == lead.referred_by)?;
                let agent = AgentRef {
                    id: agent.id,
                    first_name: agent.first_name.clone(),
                    last_name: agent.last_name.clone(),
                    email: agent.email.clone(),
                    username: agent.username.clone(),
                };
                Some(LeadWithAgent::new(lead, agent))
            })
            .collect())
    }

    async fn list_leads_for_agent(&self, agent_id: Uuid) -> StoreResult<Vec<Lead>> {
        let inner = self.inner.read().await;
        let mut leads: Vec<Lead> = inner
            .leads
            .iter()
            .filter(|l| l.referred_by == agent_id)
            .cloned()
            .collect();
        newest_first(&mut leads);
        Ok(leads)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str, username: &str, role: Role) -> NewUser {
        NewUser {
            first_name: "First".into(),
            last_name: "Last".into(),
            email: email.into(),
            username: username.into(),
            password_hash: "hash".into(),
            role,
            referral_code: "AAAAAA".into(),
        }
    }

    fn new_lead(name: &str, referred_by: Uuid) -> NewLead {
        NewLead {
            name: name.into(),
            email: "lead@example.com".into(),
            phone: "123".into(),
            message: "hello".into(),
            destination: "Rome".into(),
            travel_date: "2026-12-01".into(),
            number_of_travelers: "3".into(),
            budget: "4000".into(),
            referred_by,
        }
    }

    #[tokio::test]
    async fn create_user_rejects_duplicate_email_or_username() {
        let store = MemoryStore::new();
        store
            .create_user(new_user("a@x.com", "alice", Role::Agent))
            .await
            .expect("first insert");

        let same_email = store
            .create_user(new_user("a@x.com", "other", Role::Agent))
            .await;
        assert!(matches!(same_email, Err(StoreError::Duplicate)));

        let same_username = store
            .create_user(new_user("b@x.com", "alice", Role::Agent))
            .await;
        assert!(matches!(same_username, Err(StoreError::Duplicate)));
        assert_eq!(store.user_count().await, 1);
    }

    #[tokio::test]
    async fn find_agent_ignores_admins() {
        let store = MemoryStore::new();
        store
            .create_user(new_user("root@x.com", "root", Role::Admin))
            .await
            .unwrap();
        assert!(store.find_agent_by_username("root").await.unwrap().is_none());
        assert!(store.find_user_by_login("root").await.unwrap().is_some());
        assert!(store.find_user_by_login("root@x.com").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn login_lookup_prefers_email_match() {
        let store = MemoryStore::new();
        let owner = store
            .create_user(new_user("victim@x.com", "victim", Role::Agent))
            .await
            .unwrap();
        store
            .create_user(new_user("b@x.com", "victim@x.com", Role::Agent))
            .await
            .unwrap();
        let found = store.find_user_by_login("victim@x.com").await.unwrap().unwrap();
        assert_eq!(found.id, owner.id);
    }

    #[tokio::test]
    async fn agent_leads_are_listed_newest_first() {
        let store = MemoryStore::new();
        let agent = store
            .create_user(new_user("a@x.com", "alice", Role::Agent))
            .await
            .unwrap();
        let other = store
            .create_user(new_user("b@x.com", "bob", Role::Agent))
            .await
            .unwrap();
        store.create_lead(new_lead("first", agent.id)).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        store.create_lead(new_lead("second", agent.id)).await.unwrap();
        store.create_lead(new_lead("elsewhere", other.id)).await.unwrap();

        let leads = store.list_leads_for_agent(agent.id).await.unwrap();
        let names: Vec<_> = leads.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["second", "first"]);

        let all = store.list_leads_with_agents().await.unwrap();
        assert_eq!(all.len(), 3);
        assert!(all.iter().any(|l| l.referred_by.username == "bob"));
    }
}
