use axum::extract::FromRef;
use lazy_static::lazy_static;
use rand::Rng;
use regex::Regex;
use tracing::{info, warn};

use super::dto::{AuthResponse, LoginRequest, PublicUser, RegisterRequest};
use super::jwt::{JwtKeys, TokenError};
use super::password::{check_password_strength, hash_password, verify_password};
use super::repo_types::{NewUser, Role, User};
use crate::config::BootstrapAdmin;
use crate::error::AppError;
use crate::notify::{self, Notification};
use crate::state::AppState;

const REFERRAL_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
pub const REFERRAL_CODE_LEN: usize = 6;

const BAD_CREDENTIALS: &str = "Invalid email/username or password";

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Lower-case letters, digits, `.`, `_` and `-`. Keeps usernames apart from
/// emails, which share the login field, and safe inside a query string.
pub(crate) fn is_valid_username(username: &str) -> bool {
    lazy_static! {
        static ref USERNAME_RE: Regex = Regex::new(r"^[a-z0-9._-]+$").unwrap();
    }
    USERNAME_RE.is_match(username)
}

/// Names of the fields that are empty after trimming.
pub(crate) fn missing_fields<'a>(fields: &[(&'a str, &str)]) -> Vec<&'a str> {
    fields
        .iter()
        .filter(|(_, v)| v.trim().is_empty())
        .map(|(name, _)| *name)
        .collect()
}

pub(crate) fn require_fields(fields: &[(&str, &str)]) -> Result<(), AppError> {
    let missing = missing_fields(fields);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(AppError::BadRequest(format!(
            "Missing required fields: {}",
            missing.join(", ")
        )))
    }
}

/// Six uppercase alphanumerics. Collisions are tolerated.
pub fn generate_referral_code() -> String {
    let mut rng = rand::thread_rng();
    (0..REFERRAL_CODE_LEN)
        .map(|_| REFERRAL_ALPHABET[rng.gen_range(0..REFERRAL_ALPHABET.len())] as char)
        .collect()
}

fn signing_failed(e: TokenError) -> AppError {
    AppError::Internal(anyhow::Error::new(e).context("sign session token"))
}

pub async fn register(state: &AppState, req: RegisterRequest) -> Result<AuthResponse, AppError> {
    let invitation = req
        .registration_token
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Forbidden("Registration token required".into()))?;

    require_fields(&[
        ("firstName", req.first_name.as_str()),
        ("lastName", req.last_name.as_str()),
        ("email", req.email.as_str()),
        ("username", req.username.as_str()),
        ("password", req.password.as_str()),
    ])?;

    let email = req.email.trim().to_lowercase();
    let username = req.username.trim().to_lowercase();
    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(AppError::BadRequest("Invalid email".into()));
    }
    if !is_valid_username(&username) {
        warn!(username = %username, "invalid username");
        return Err(AppError::BadRequest(
            "Username may only contain letters, digits, '.', '_' and '-'".into(),
        ));
    }
    check_password_strength(&req.password).map_err(|e| AppError::BadRequest(e.to_string()))?;

    let keys = JwtKeys::from_ref(state);
    let claims = keys.verify_invitation(invitation).map_err(|e| {
        warn!(error = %e, "registration token rejected");
        match e {
            TokenError::Expired => AppError::Forbidden("Registration token has expired".into()),
            TokenError::WrongKind => {
                AppError::Forbidden("Invalid registration token type".into())
            }
            _ => AppError::Forbidden("Invalid registration token".into()),
        }
    })?;
    if claims.email.to_lowercase() != email {
        warn!(invited = %claims.email, submitted = %email, "registration email mismatch");
        return Err(AppError::Forbidden(
            "Email does not match registration token".into(),
        ));
    }

    if state
        .store
        .find_user_by_email_or_username(&email, &username)
        .await?
        .is_some()
    {
        warn!(email = %email, username = %username, "user already exists");
        return Err(AppError::Conflict("User already exists".into()));
    }

    let password_hash = hash_password(&req.password)?;
    let user = state
        .store
        .create_user(NewUser {
            first_name: req.first_name.trim().to_string(),
            last_name: req.last_name.trim().to_string(),
            email,
            username,
            password_hash,
            role: Role::Agent,
            referral_code: generate_referral_code(),
        })
        .await?;
    info!(user_id = %user.id, username = %user.username, "agent registered");

    notify::dispatch(
        state.mailer.as_ref(),
        &state.config.mail,
        vec![
            Notification::Welcome {
                email: user.email.clone(),
                first_name: user.first_name.clone(),
            },
            Notification::AgentRegistered(user.clone()),
        ],
    )
    .await;

    let token = keys.issue_session(user.id).map_err(signing_failed)?;
    Ok(AuthResponse {
        message: "Agent registered successfully".into(),
        token,
        user: PublicUser::from(&user),
    })
}

pub async fn login(state: &AppState, req: LoginRequest) -> Result<AuthResponse, AppError> {
    if req.email_or_username.trim().is_empty() || req.password.is_empty() {
        return Err(AppError::BadRequest(
            "Email/username and password are required".into(),
        ));
    }
    let login = req.email_or_username.trim().to_lowercase();

    let user = match state.store.find_user_by_login(&login).await? {
        Some(u) => u,
        None => {
            warn!(login = %login, "login for unknown user");
            return Err(AppError::Unauthenticated(BAD_CREDENTIALS.into()));
        }
    };

    if !verify_password(&req.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AppError::Unauthenticated(BAD_CREDENTIALS.into()));
    }

    let token = JwtKeys::from_ref(state)
        .issue_session(user.id)
        .map_err(signing_failed)?;
    info!(user_id = %user.id, "user logged in");
    Ok(AuthResponse {
        message: "Login successful".into(),
        token,
        user: PublicUser::from(&user),
    })
}

/// Creates the configured admin account unless it already exists. Fails when
/// the email or username belongs to a non-admin account.
pub async fn ensure_admin(state: &AppState, admin: &BootstrapAdmin) -> anyhow::Result<User> {
    let email = admin.email.trim().to_lowercase();
    let username = admin.username.trim().to_lowercase();
    if !is_valid_email(&email) || !is_valid_username(&username) {
        anyhow::bail!("bootstrap admin email or username is malformed");
    }
    if let Some(existing) = state
        .store
        .find_user_by_email_or_username(&email, &username)
        .await?
    {
        if existing.role != Role::Admin {
            anyhow::bail!(
                "bootstrap admin {email}/{username} collides with {} account {}",
                existing.role.as_str(),
                existing.id
            );
        }
        info!(user_id = %existing.id, "bootstrap admin already present");
        return Ok(existing);
    }
    let user = state
        .store
        .create_user(NewUser {
            first_name: "Admin".into(),
            last_name: "User".into(),
            email,
            username,
            password_hash: hash_password(&admin.password)?,
            role: Role::Admin,
            referral_code: "ADMIN1".into(),
        })
        .await?;
    info!(user_id = %user.id, "bootstrap admin created");
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::extractors::AuthUser;
    use crate::mailer::{EmailMessage, Mailer};
    use axum::extract::FromRequestParts;
    use axum::http::{Request, StatusCode};
    use std::sync::Arc;
    use time::{Duration as TimeDuration, OffsetDateTime};

    struct DownMailer;

    #[async_trait::async_trait]
    impl Mailer for DownMailer {
        async fn send(&self, _m: &EmailMessage) -> anyhow::Result<()> {
            anyhow::bail!("smtp unreachable")
        }
    }

    fn register_req(email: &str, username: &str, token: Option<String>) -> RegisterRequest {
        RegisterRequest {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: email.into(),
            username: username.into(),
            password: "s3cret-pass".into(),
            registration_token: token,
        }
    }

    fn invite(state: &AppState, email: &str) -> String {
        JwtKeys::from_ref(state).issue_invitation(email).unwrap()
    }

    async fn user_exists(state: &AppState, login: &str) -> bool {
        state.store.find_user_by_login(login).await.unwrap().is_some()
    }

    #[test]
    fn referral_codes_are_six_uppercase_alphanumerics() {
        for _ in 0..50 {
            let code = generate_referral_code();
            assert_eq!(code.len(), REFERRAL_CODE_LEN);
            assert!(code
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        }
    }

    #[test]
    fn username_validation() {
        assert!(is_valid_username("ada.l_99-x"));
        assert!(!is_valid_username("victim@x.com"));
        assert!(!is_valid_username("a&b c"));
        assert!(!is_valid_username("Ada"));
    }

    #[test]
    fn email_validation() {
        assert!(is_valid_email("a@x.com"));
        assert!(!is_valid_email("a@x"));
        assert!(!is_valid_email("a x@y.com"));
    }

    #[tokio::test]
    async fn register_without_token_is_forbidden_and_creates_nothing() {
        let state = AppState::fake();
        let err = register(&state, register_req("a@x.com", "ada", None))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);

        let blank = register(&state, register_req("a@x.com", "ada", Some("  ".into())))
            .await
            .unwrap_err();
        assert_eq!(blank.status(), StatusCode::FORBIDDEN);
        assert!(!user_exists(&state, "ada").await);
    }

    #[tokio::test]
    async fn register_with_missing_fields_is_bad_request() {
        let state = AppState::fake();
        let mut req = register_req("a@x.com", "", Some(invite(&state, "a@x.com")));
        req.last_name = " ".into();
        let err = register(&state, req).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(err.to_string().contains("lastName"));
        assert!(err.to_string().contains("username"));
    }

    #[tokio::test]
    async fn register_matches_invited_email_case_insensitively() {
        let state = AppState::fake();
        let token = invite(&state, "A@X.com");
        let resp = register(&state, register_req("a@x.com", "Ada", Some(token)))
            .await
            .expect("registration succeeds");

        assert_eq!(resp.user.email, "a@x.com");
        assert_eq!(resp.user.username, "ada");
        assert_eq!(resp.user.role, Role::Agent);
        assert_eq!(resp.user.referral_code.len(), REFERRAL_CODE_LEN);

        let stored = state.store.find_user_by_login("ada").await.unwrap().unwrap();
        assert_ne!(stored.password_hash, "s3cret-pass");
        assert!(verify_password("s3cret-pass", &stored.password_hash).unwrap());
    }

    #[tokio::test]
    async fn register_rejects_mismatched_email() {
        let state = AppState::fake();
        let token = invite(&state, "invited@x.com");
        let err = register(&state, register_req("intruder@x.com", "eve", Some(token)))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
        assert!(!user_exists(&state, "eve").await);
    }

    #[tokio::test]
    async fn register_reports_expired_invitation() {
        let state = AppState::fake();
        let token = JwtKeys::from_ref(&state)
            .issue_invitation_at("a@x.com", OffsetDateTime::now_utc() - TimeDuration::hours(25))
            .unwrap();
        let err = register(&state, register_req("a@x.com", "ada", Some(token)))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
        assert_eq!(err.to_string(), "Registration token has expired");
    }

    #[tokio::test]
    async fn session_token_is_not_a_registration_token() {
        let state = AppState::fake();
        let session = JwtKeys::from_ref(&state)
            .issue_session(uuid::Uuid::new_v4())
            .unwrap();
        let err = register(&state, register_req("a@x.com", "ada", Some(session)))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
        assert_eq!(err.to_string(), "Invalid registration token type");
    }

    #[tokio::test]
    async fn reusing_invitation_after_success_conflicts() {
        let state = AppState::fake();
        let token = invite(&state, "a@x.com");
        register(&state, register_req("a@x.com", "ada", Some(token.clone())))
            .await
            .unwrap();
        let err = register(&state, register_req("a@x.com", "ada2", Some(token)))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::CONFLICT);

        let other = invite(&state, "b@x.com");
        let err = register(&state, register_req("b@x.com", "ADA", Some(other)))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn registration_survives_mail_outage() {
        let state = AppState::fake_with_mailer(Arc::new(DownMailer));
        let token = invite(&state, "a@x.com");
        let resp = register(&state, register_req("a@x.com", "ada", Some(token))).await;
        assert!(resp.is_ok());
        assert!(user_exists(&state, "a@x.com").await);
    }

    #[tokio::test]
    async fn login_token_resolves_to_same_user() {
        let state = AppState::fake();
        let token = invite(&state, "a@x.com");
        let registered = register(&state, register_req("a@x.com", "ada", Some(token)))
            .await
            .unwrap();

        for login_as in ["a@x.com", "A@X.COM", "Ada"] {
            let resp = login(
                &state,
                LoginRequest {
                    email_or_username: login_as.into(),
                    password: "s3cret-pass".into(),
                },
            )
            .await
            .expect("login succeeds");

            let mut parts = Request::builder()
                .header("Authorization", format!("Bearer {}", resp.token))
                .body(())
                .unwrap()
                .into_parts()
                .0;
            let AuthUser(user) = AuthUser::from_request_parts(&mut parts, &state)
                .await
                .ok()
                .unwrap();
            assert_eq!(user.id, registered.user.id);
        }
    }

    #[tokio::test]
    async fn login_failures_share_one_message() {
        let state = AppState::fake();
        let token = invite(&state, "a@x.com");
        register(&state, register_req("a@x.com", "ada", Some(token)))
            .await
            .unwrap();

        let wrong_password = login(
            &state,
            LoginRequest {
                email_or_username: "a@x.com".into(),
                password: "nope-nope".into(),
            },
        )
        .await
        .unwrap_err();
        let unknown_user = login(
            &state,
            LoginRequest {
                email_or_username: "ghost".into(),
                password: "s3cret-pass".into(),
            },
        )
        .await
        .unwrap_err();

        assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(unknown_user.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(wrong_password.public_message(), unknown_user.public_message());
        assert_eq!(wrong_password.public_message(), BAD_CREDENTIALS);
    }

    #[tokio::test]
    async fn login_requires_both_fields() {
        let state = AppState::fake();
        let err = login(&state, LoginRequest::default()).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn ensure_admin_is_idempotent() {
        let state = AppState::fake();
        let cfg = BootstrapAdmin {
            email: "Root@Example.com".into(),
            username: "root".into(),
            password: "root-password".into(),
        };
        let first = ensure_admin(&state, &cfg).await.unwrap();
        let second = ensure_admin(&state, &cfg).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(first.role, Role::Admin);
        assert_eq!(first.email, "root@example.com");
    }

    #[tokio::test]
    async fn ensure_admin_refuses_to_adopt_an_agent() {
        let state = AppState::fake();
        let token = invite(&state, "root@example.com");
        register(&state, register_req("root@example.com", "root", Some(token)))
            .await
            .unwrap();

        let cfg = BootstrapAdmin {
            email: "root@example.com".into(),
            username: "root".into(),
            password: "root-password".into(),
        };
        let err = ensure_admin(&state, &cfg).await.unwrap_err();
        assert!(err.to_string().contains("agent account"));
    }

    #[tokio::test]
    async fn username_shaped_like_an_email_is_rejected() {
        let state = AppState::fake();
        let first = invite(&state, "victim@x.com");
        register(&state, register_req("victim@x.com", "victim", Some(first)))
            .await
            .unwrap();

        let second = invite(&state, "b@x.com");
        let err = register(&state, register_req("b@x.com", "victim@x.com", Some(second)))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(!user_exists(&state, "b@x.com").await);

        let resolved = state
            .store
            .find_user_by_login("victim@x.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(resolved.username, "victim");
    }
}
