use argon2::{
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::error;

pub const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PasswordPolicyError {
    #[error("Password must be at least {} characters", MIN_PASSWORD_LEN)]
    TooShort,
}

/// Policy applied to agent passwords before hashing.
pub fn check_password_strength(plain: &str) -> Result<(), PasswordPolicyError> {
    if plain.chars().count() < MIN_PASSWORD_LEN {
        return Err(PasswordPolicyError::TooShort);
    }
    Ok(())
}

fn argon_failure(step: &'static str) -> impl Fn(password_hash::Error) -> anyhow::Error {
    move |e| {
        error!(error = %e, step, "argon2 failure");
        anyhow::anyhow!("argon2 {step}: {e}")
    }
}

/// Salted Argon2 hash in PHC string format, as stored in `users.password_hash`.
pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(argon_failure("hash"))
}

/// `Ok(false)` on a wrong password; `Err` only when the stored hash is unreadable.
pub fn verify_password(plain: &str, stored: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(stored).map_err(argon_failure("parse stored hash"))?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}
