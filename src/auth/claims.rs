use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Discriminates the two token families signed with the same secret.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Session,
    Registration,
}

/// Session token payload: identifies an authenticated user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: Uuid,   // user ID
    pub iat: usize,  // issued at (unix timestamp)
    pub exp: usize,  // expires at (unix timestamp)
    pub iss: String, // issuer
    pub aud: String, // audience
    #[serde(rename = "type")]
    pub kind: TokenKind,
}

/// Invitation payload: authorizes one (lower-cased) email to register.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvitationClaims {
    #[serde(default)]
    pub email: String,
    pub iat: usize,
    pub exp: usize,
    pub iss: String,
    pub aud: String,
    #[serde(rename = "type")]
    pub kind: TokenKind,
}

/// Access to the kind tag shared by both payloads.
pub trait Kinded {
    fn kind(&self) -> TokenKind;
}

impl Kinded for SessionClaims {
    fn kind(&self) -> TokenKind {
        self.kind
    }
}

impl Kinded for InvitationClaims {
    fn kind(&self) -> TokenKind {
        self.kind
    }
}
