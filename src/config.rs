use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub session_ttl_minutes: i64,
    pub invitation_ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    pub from: String,
    /// Fixed recipient of admin notices (new agents, new leads).
    pub admin_recipient: String,
    pub relay_url: Option<String>,
    pub relay_api_key: Option<String>,
    pub timeout_secs: u64,
}

/// Admin account ensured at start-up when all three variables are set.
#[derive(Debug, Clone, Deserialize)]
pub struct BootstrapAdmin {
    pub email: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub frontend_url: String,
    pub cors_origins: Vec<String>,
    pub mail: MailConfig,
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

fn env_required(key: &str) -> anyhow::Result<String> {
    std::env::var(key).with_context(|| format!("{key} must be set"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.into())
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_num<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

pub(crate) fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(|o| o.trim_end_matches('/').to_string())
        .collect()
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env_required("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: env_required("JWT_SECRET")?,
            issuer: env_or("JWT_ISSUER", "referral-desk"),
            audience: env_or("JWT_AUDIENCE", "referral-desk-users"),
            session_ttl_minutes: env_num("JWT_SESSION_TTL_MINUTES", 60 * 24),
            invitation_ttl_minutes: env_num("JWT_INVITATION_TTL_MINUTES", 60 * 24),
        };
        let mail = MailConfig {
            from: env_or("MAIL_FROM", "Referral Desk <no-reply@localhost>"),
            admin_recipient: env_or("MAIL_ADMIN_RECIPIENT", "admin@localhost"),
            relay_url: env_opt("MAIL_RELAY_URL"),
            relay_api_key: env_opt("MAIL_RELAY_API_KEY"),
            timeout_secs: env_num("MAIL_TIMEOUT_SECS", 10),
        };
        let bootstrap_admin = match (
            env_opt("BOOTSTRAP_ADMIN_EMAIL"),
            env_opt("BOOTSTRAP_ADMIN_USERNAME"),
            env_opt("BOOTSTRAP_ADMIN_PASSWORD"),
        ) {
            (Some(email), Some(username), Some(password)) => Some(BootstrapAdmin {
                email,
                username,
                password,
            }),
            _ => None,
        };

        Ok(Self {
            database_url,
            jwt,
            frontend_url: env_or("FRONTEND_URL", "http://localhost:5173")
                .trim_end_matches('/')
                .to_string(),
            cors_origins: parse_origins(&env_or("CORS_ALLOWED_ORIGINS", "")),
            mail,
            bootstrap_admin,
        })
    }

    /// Link an invited agent follows to finish registration.
    pub fn registration_link(&self, token: &str) -> String {
        format!("{}/register?token={}", self.frontend_url, token)
    }

    /// Personal contact-form link handed out by an agent.
    pub fn contact_form_link(&self, username: &str) -> String {
        let agent: String = url::form_urlencoded::byte_serialize(username.as_bytes()).collect();
        format!("{}/contact?agent={}", self.frontend_url, agent)
    }
}
