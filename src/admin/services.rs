use axum::extract::FromRef;
use tracing::{info, warn};

use super::dto::GenerateLinkResponse;
use crate::auth::dto::AgentSummary;
use crate::auth::jwt::JwtKeys;
use crate::auth::repo_types::User;
use crate::auth::services::is_valid_email;
use crate::contacts::repo_types::LeadWithAgent;
use crate::error::AppError;
use crate::notify::{self, Notification};
use crate::state::AppState;

/// Signs an invitation for `email` and mails the resulting link to it.
pub async fn generate_registration_link(
    state: &AppState,
    admin: &User,
    email: &str,
) -> Result<GenerateLinkResponse, AppError> {
    let email = email.trim().to_lowercase();
    if email.is_empty() {
        return Err(AppError::BadRequest("Email is required".into()));
    }
    if !is_valid_email(&email) {
        warn!(email = %email, "invalid invitation email");
        return Err(AppError::BadRequest("Invalid email".into()));
    }

    let token = JwtKeys::from_ref(state)
        .issue_invitation(&email)
        .map_err(|e| AppError::Internal(anyhow::Error::new(e).context("sign invitation")))?;
    let link = state.config.registration_link(&token);
    info!(admin_id = %admin.id, email = %email, "registration link generated");

    notify::dispatch(
        state.mailer.as_ref(),
        &state.config.mail,
        vec![Notification::Invitation {
            email,
            link: link.clone(),
        }],
    )
    .await;

    Ok(GenerateLinkResponse {
        message: "Registration link sent successfully".into(),
        registration_link: link,
    })
}

pub async fn list_agents(state: &AppState) -> Result<Vec<AgentSummary>, AppError> {
    let agents = state.store.list_agents().await?;
    Ok(agents.iter().map(AgentSummary::from).collect())
}

pub async fn list_contacts(state: &AppState) -> Result<Vec<LeadWithAgent>, AppError> {
    Ok(state.store.list_leads_with_agents().await?)
}
