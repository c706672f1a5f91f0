use tracing::{info, warn};

use super::dto::SubmitContactRequest;
use super::repo_types::{Lead, NewLead};
use crate::auth::repo_types::User;
use crate::auth::services::require_fields;
use crate::error::AppError;
use crate::notify::{self, Notification};
use crate::state::AppState;

/// Persists a lead for the named agent, then notifies admin and agent.
/// The lead is kept whatever happens to the notifications.
pub async fn submit(state: &AppState, req: SubmitContactRequest) -> Result<Lead, AppError> {
    require_fields(&[
        ("name", req.name.as_str()),
        ("email", req.email.as_str()),
        ("phone", req.phone.as_str()),
        ("message", req.message.as_str()),
        ("destination", req.destination.as_str()),
        ("travelDate", req.travel_date.as_str()),
        ("numberOfTravelers", req.number_of_travelers.as_str()),
        ("budget", req.budget.as_str()),
        ("agentUsername", req.agent_username.as_str()),
    ])?;

    let username = req.agent_username.trim().to_lowercase();
    let agent = state
        .store
        .find_agent_by_username(&username)
        .await?
        .ok_or_else(|| {
            warn!(agent_username = %username, "lead for unknown agent");
            AppError::BadRequest("Invalid agent username".into())
        })?;

    let lead = state
        .store
        .create_lead(NewLead {
            name: req.name.trim().to_string(),
            email: req.email.trim().to_string(),
            phone: req.phone.trim().to_string(),
            message: req.message,
            destination: req.destination.trim().to_string(),
            travel_date: req.travel_date.trim().to_string(),
            number_of_travelers: req.number_of_travelers.trim().to_string(),
            budget: req.budget.trim().to_string(),
            referred_by: agent.id,
        })
        .await?;
    info!(lead_id = %lead.id, agent_id = %agent.id, "lead stored");

    notify::dispatch(
        state.mailer.as_ref(),
        &state.config.mail,
        vec![
            Notification::LeadForAdmin {
                lead: lead.clone(),
                agent_username: agent.username.clone(),
            },
            Notification::LeadForAgent {
                lead: lead.clone(),
                agent_email: agent.email.clone(),
            },
        ],
    )
    .await;

    Ok(lead)
}

pub async fn agent_submissions(state: &AppState, agent: &User) -> Result<Vec<Lead>, AppError> {
    Ok(state.store.list_leads_for_agent(agent.id).await?)
}
