use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        dto::{AuthResponse, ContactFormLinkResponse, LoginRequest, PublicUser, RegisterRequest},
        extractors::{AgentUser, AuthUser},
        services,
    },
    error::AppError,
    json::AppJson,
    state::AppState,
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users/register", post(register))
        .route("/users/login", post(login))
        .route("/users/profile", get(profile))
        .route("/users/contact-form-link", get(contact_form_link))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let resp = services::register(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    services::login(&state, payload).await.map(Json)
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn profile(AuthUser(user): AuthUser) -> Json<PublicUser> {
    Json(PublicUser::from(&user))
}

#[instrument(skip_all, fields(user_id = %agent.id))]
pub async fn contact_form_link(
    State(state): State<AppState>,
    AgentUser(agent): AgentUser,
) -> Json<ContactFormLinkResponse> {
    Json(ContactFormLinkResponse {
        contact_form_link: state.config.contact_form_link(&agent.username),
    })
}
