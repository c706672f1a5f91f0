use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;

use super::jwt::JwtKeys;
use super::repo_types::{Role, User};
use crate::{error::AppError, state::AppState};

/// Any authenticated user, loaded from the store.
pub struct AuthUser(pub User);

/// Authenticated user with role `admin`.
pub struct AdminUser(pub User);

/// Authenticated user with role `agent`.
pub struct AgentUser(pub User);

fn bearer_token(parts: &Parts) -> Result<&str, AppError> {
    let header = parts
        .headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthenticated("Authentication required".into()))?;

    header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Unauthenticated("Authentication required".into()))
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;

        let keys = JwtKeys::from_ref(state);
        let claims = keys.verify_session(token).map_err(|e| {
            warn!(error = %e, "session token rejected");
            AppError::Unauthenticated("Invalid or expired token".into())
        })?;

        let user = state
            .store
            .find_user_by_id(claims.sub)
            .await?
            .ok_or_else(|| {
                warn!(user_id = %claims.sub, "token for unknown user");
                AppError::Unauthenticated("User not found".into())
            })?;

        Ok(AuthUser(user))
    }
}

async fn with_role(parts: &mut Parts, state: &AppState, role: Role) -> Result<User, AppError> {
    let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;
    if user.role != role {
        warn!(user_id = %user.id, required = role.as_str(), "role check failed");
        return Err(AppError::Forbidden(format!(
            "{} access required",
            match role {
                Role::Admin => "Admin",
                Role::Agent => "Agent",
            }
        )));
    }
    Ok(user)
}

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        with_role(parts, state, Role::Admin).await.map(AdminUser)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AgentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        with_role(parts, state, Role::Agent).await.map(AgentUser)
    }
}
