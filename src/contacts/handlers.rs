use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use super::dto::{SubmitContactRequest, SubmitContactResponse};
use super::repo_types::Lead;
use super::services;
use crate::{auth::extractors::AgentUser, error::AppError, json::AppJson, state::AppState};

pub fn contact_routes() -> Router<AppState> {
    Router::new()
        .route("/contact/submit", post(submit))
        .route("/contact/agent-submissions", get(agent_submissions))
}

#[instrument(skip(state, payload))]
pub async fn submit(
    State(state): State<AppState>,
    AppJson(payload): AppJson<SubmitContactRequest>,
) -> Result<(StatusCode, Json<SubmitContactResponse>), AppError> {
    services::submit(&state, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(SubmitContactResponse {
            message: "Contact form submitted successfully".into(),
        }),
    ))
}

#[instrument(skip_all, fields(agent_id = %agent.id))]
pub async fn agent_submissions(
    State(state): State<AppState>,
    AgentUser(agent): AgentUser,
) -> Result<Json<Vec<Lead>>, AppError> {
    services::agent_submissions(&state, &agent).await.map(Json)
}
