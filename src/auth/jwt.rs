use std::time::Duration;

use axum::extract::FromRef;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{de::DeserializeOwned, Serialize};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use super::claims::{InvitationClaims, Kinded, SessionClaims, TokenKind};
use crate::{config::JwtConfig, state::AppState};

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,
    #[error("invalid token")]
    Invalid,
    #[error("unexpected token type")]
    WrongKind,
    #[error("failed to sign token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

/// Signing and verification keys with token settings.
#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub issuer: String,
    pub audience: String,
    pub session_ttl: Duration,
    pub invitation_ttl: Duration,
}

impl From<&JwtConfig> for JwtKeys {
    fn from(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            session_ttl: Duration::from_secs(cfg.session_ttl_minutes.max(1) as u64 * 60),
            invitation_ttl: Duration::from_secs(cfg.invitation_ttl_minutes.max(1) as u64 * 60),
        }
    }
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        JwtKeys::from(&state.config.jwt)
    }
}

fn window(issued_at: OffsetDateTime, ttl: Duration) -> (usize, usize) {
    let exp = issued_at + TimeDuration::seconds(ttl.as_secs() as i64);
    (
        issued_at.unix_timestamp() as usize,
        exp.unix_timestamp() as usize,
    )
}

impl JwtKeys {
    fn sign<T: Serialize>(&self, claims: &T) -> Result<String, TokenError> {
        encode(&Header::default(), claims, &self.encoding).map_err(TokenError::Signing)
    }

    fn decode_kind<T: DeserializeOwned + Kinded>(
        &self,
        token: &str,
        expected: TokenKind,
    ) -> Result<T, TokenError> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<T>(token, &self.decoding, &validation).map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Invalid,
        })?;
        if data.claims.kind() != expected {
            return Err(TokenError::WrongKind);
        }
        Ok(data.claims)
    }

    pub(crate) fn issue_session_at(
        &self,
        user_id: Uuid,
        issued_at: OffsetDateTime,
    ) -> Result<String, TokenError> {
        let (iat, exp) = window(issued_at, self.session_ttl);
        let token = self.sign(&SessionClaims {
            sub: user_id,
            iat,
            exp,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            kind: TokenKind::Session,
        })?;
        debug!(user_id = %user_id, "session token signed");
        Ok(token)
    }

    pub fn issue_session(&self, user_id: Uuid) -> Result<String, TokenError> {
        self.issue_session_at(user_id, OffsetDateTime::now_utc())
    }

    pub(crate) fn issue_invitation_at(
        &self,
        email: &str,
        issued_at: OffsetDateTime,
    ) -> Result<String, TokenError> {
        let (iat, exp) = window(issued_at, self.invitation_ttl);
        let email = email.trim().to_lowercase();
        let token = self.sign(&InvitationClaims {
            email: email.clone(),
            iat,
            exp,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            kind: TokenKind::Registration,
        })?;
        debug!(email = %email, "invitation token signed");
        Ok(token)
    }

    pub fn issue_invitation(&self, email: &str) -> Result<String, TokenError> {
        self.issue_invitation_at(email, OffsetDateTime::now_utc())
    }

    pub fn verify_session(&self, token: &str) -> Result<SessionClaims, TokenError> {
        let claims: SessionClaims = self.decode_kind(token, TokenKind::Session)?;
        debug!(user_id = %claims.sub, "session token verified");
        Ok(claims)
    }

    pub fn verify_invitation(&self, token: &str) -> Result<InvitationClaims, TokenError> {
        self.decode_kind(token, TokenKind::Registration)
    }
}
