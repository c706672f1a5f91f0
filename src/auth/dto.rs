use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{Role, User};
use crate::json::null_as_empty;

/// Request body for agent registration. Missing fields deserialize as empty
/// and are reported together as a 400.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegisterRequest {
    #[serde(deserialize_with = "null_as_empty")]
    pub first_name: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub last_name: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub email: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub username: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub password: String,
    pub registration_token: Option<String>,
}

/// Request body for login.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoginRequest {
    #[serde(deserialize_with = "null_as_empty")]
    pub email_or_username: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub password: String,
}

/// Response returned after login or register.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub message: String,
    pub token: String,
    pub user: PublicUser,
}

/// Public part of the user returned to the client.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub username: String,
    pub role: Role,
    pub referral_code: String,
}

impl From<&User> for PublicUser {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            first_name: u.first_name.clone(),
            last_name: u.last_name.clone(),
            email: u.email.clone(),
            username: u.username.clone(),
            role: u.role,
            referral_code: u.referral_code.clone(),
        }
    }
}

/// Agent as listed to admins.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSummary {
    #[serde(flatten)]
    pub user: PublicUser,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<&User> for AgentSummary {
    fn from(u: &User) -> Self {
        Self {
            user: u.into(),
            created_at: u.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactFormLinkResponse {
    pub contact_form_link: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_request_tolerates_missing_fields() {
        let req: RegisterRequest =
            serde_json::from_str(r#"{"email":"a@x.com","registrationToken":"t"}"#).unwrap();
        assert_eq!(req.email, "a@x.com");
        assert!(req.first_name.is_empty());
        assert_eq!(req.registration_token.as_deref(), Some("t"));
    }

    #[test]
    fn null_fields_read_as_empty() {
        let req: LoginRequest =
            serde_json::from_str(r#"{"emailOrUsername":null,"password":null}"#).unwrap();
        assert!(req.email_or_username.is_empty());
        assert!(req.password.is_empty());

        let req: RegisterRequest =
            serde_json::from_str(r#"{"firstName":null,"registrationToken":null}"#).unwrap();
        assert!(req.first_name.is_empty());
        assert!(req.registration_token.is_none());
    }

    #[test]
    fn public_user_uses_camel_case() {
        let user = PublicUser {
            id: Uuid::new_v4(),
            first_name: "Ada".into(),
            last_name: "L".into(),
            email: "test@example.com".into(),
            username: "ada".into(),
            role: Role::Agent,
            referral_code: "X1Y2Z3".into(),
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(json.contains("\"firstName\":\"Ada\""));
        assert!(json.contains("\"referralCode\""));
        assert!(!json.contains("password"));
    }
}
