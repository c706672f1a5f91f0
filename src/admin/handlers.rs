use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use super::dto::{GenerateLinkRequest, GenerateLinkResponse};
use super::services;
use crate::{
    auth::{dto::AgentSummary, extractors::AdminUser},
    contacts::repo_types::LeadWithAgent,
    error::AppError,
    json::AppJson,
    state::AppState,
};

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/generate-registration-link", post(generate_registration_link))
        .route("/admin/agents", get(list_agents))
        .route("/admin/contacts", get(list_contacts))
}

#[instrument(skip_all, fields(admin_id = %admin.id))]
pub async fn generate_registration_link(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    AppJson(payload): AppJson<GenerateLinkRequest>,
) -> Result<Json<GenerateLinkResponse>, AppError> {
    services::generate_registration_link(&state, &admin, &payload.email)
        .await
        .map(Json)
}

#[instrument(skip_all, fields(admin_id = %admin.id))]
pub async fn list_agents(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
) -> Result<Json<Vec<AgentSummary>>, AppError> {
    services::list_agents(&state).await.map(Json)
}

#[instrument(skip_all, fields(admin_id = %admin.id))]
pub async fn list_contacts(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
) -> Result<Json<Vec<LeadWithAgent>>, AppError> {
    services::list_contacts(&state).await.map(Json)
}
