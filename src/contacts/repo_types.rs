use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LeadStatus {
    #[default]
    New,
    Contacted,
    Completed,
}

impl std::str::FromStr for LeadStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(LeadStatus::New),
            "contacted" => Ok(LeadStatus::Contacted),
            "completed" => Ok(LeadStatus::Completed),
            other => anyhow::bail!("unknown lead status {other:?}"),
        }
    }
}

/// A persisted contact-form submission.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub message: String,
    pub destination: String,
    pub travel_date: String,
    pub number_of_travelers: String,
    pub budget: String,
    pub referred_by: Uuid,
    pub status: LeadStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Identity of the referring agent, expanded in admin listings.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRef {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub username: String,
}

/// Lead as listed to admins, with `referredBy` expanded to the agent.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadWithAgent {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub message: String,
    pub destination: String,
    pub travel_date: String,
    pub number_of_travelers: String,
    pub budget: String,
    pub referred_by: AgentRef,
    pub status: LeadStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl LeadWithAgent {
    pub fn new(lead: Lead, agent: AgentRef) -> Self {
        Self {
            id: lead.id,
            name: lead.name,
            email: lead.email,
            phone: lead.phone,
            message: lead.message,
            destination: lead.destination,
            travel_date: lead.travel_date,
            number_of_travelers: lead.number_of_travelers,
            budget: lead.budget,
            referred_by: agent,
            status: lead.status,
            created_at: lead.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
pub struct LeadRow {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub message: String,
    pub destination: String,
    pub travel_date: String,
    pub number_of_travelers: String,
    pub budget: String,
    pub referred_by: Uuid,
    pub status: String,
    pub created_at: OffsetDateTime,
}

impl TryFrom<LeadRow> for Lead {
    type Error = anyhow::Error;

    fn try_from(r: LeadRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            name: r.name,
            email: r.email,
            phone: r.phone,
            message: r.message,
            destination: r.destination,
            travel_date: r.travel_date,
            number_of_travelers: r.number_of_travelers,
            budget: r.budget,
            referred_by: r.referred_by,
            status: r.status.parse()?,
            created_at: r.created_at,
        })
    }
}

/// Lead joined with the columns of its referring agent.
#[derive(Debug, FromRow)]
pub struct LeadWithAgentRow {
    #[sqlx(flatten)]
    pub lead: LeadRow,
    pub agent_first_name: String,
    pub agent_last_name: String,
    pub agent_email: String,
    pub agent_username: String,
}

impl TryFrom<LeadWithAgentRow> for LeadWithAgent {
    type Error = anyhow::Error;

    fn try_from(r: LeadWithAgentRow) -> Result<Self, Self::Error> {
        let agent = AgentRef {
            id: r.lead.referred_by,
            first_name: r.agent_first_name,
            last_name: r.agent_last_name,
            email: r.agent_email,
            username: r.agent_username,
        };
        Ok(Self::new(r.lead.try_into()?, agent))
    }
}

/// Values for a lead about to be inserted.
#[derive(Debug, Clone)]
pub struct NewLead {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub message: String,
    pub destination: String,
    pub travel_date: String,
    pub number_of_travelers: String,
    pub budget: String,
    pub referred_by: Uuid,
}
