//! Account registration, password login and bootstrap admin.
//!
//! Passwords are stored as `salt$sha256(salt || password)` hex pairs and
//! compared in constant time. Emails are the natural account key and are
//! normalized to lowercase before every lookup.

use rand::Rng;
use sha2::{Digest, Sha256};
use sqlx::{PgPool, Row};
use tracing::info;
use uuid::Uuid;

use crate::config::BootstrapAdmin;
use crate::db::is_unique_violation;
use crate::services::referral;
use crate::services::session::bytes_to_hex;

pub const MIN_PASSWORD_LEN: usize = 6;
const SALT_LEN: usize = 16;
const REFERRAL_CODE_ATTEMPTS: usize = 5;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid email")]
    InvalidEmail,
    #[error("password must be at least {MIN_PASSWORD_LEN} characters")]
    WeakPassword,
    #[error("email already registered")]
    EmailTaken,
    #[error("unknown referral code")]
    InvalidReferralCode,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("account is banned")]
    Banned,
    #[error("could not allocate a unique referral code")]
    CodeExhausted,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl crate::error::ErrorCode for AuthError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidEmail => "E_INVALID_EMAIL",
            Self::WeakPassword => "E_WEAK_PASSWORD",
            Self::EmailTaken => "E_EMAIL_TAKEN",
            Self::InvalidReferralCode => "E_INVALID_REFERRAL_CODE",
            Self::InvalidCredentials => "E_INVALID_CREDENTIALS",
            Self::Banned => "E_BANNED",
            Self::CodeExhausted => "E_CODE_EXHAUSTED",
            Self::Database(_) => "E_DATABASE",
        }
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub referral_code: Option<String>,
}

// =============================================================================
// NORMALIZATION + HASHING
// =============================================================================

#[must_use]
pub fn normalize_email(email: &str) -> Option<String> {
    let normalized = email.trim().to_ascii_lowercase();
    let mut parts = normalized.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return None;
    };
    if local.is_empty() || domain.is_empty() {
        return None;
    }
    Some(normalized)
}

fn name_from_email(email: &str) -> String {
    email
        .split('@')
        .next()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or("player")
        .to_owned()
}

fn sha256_hex(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    bytes_to_hex(&hasher.finalize())
}

#[must_use]
pub fn hash_password(password: &str) -> String {
    let salt_bytes: [u8; SALT_LEN] = rand::rng().random();
    let salt = bytes_to_hex(&salt_bytes);
    let digest = sha256_hex(&salt, password);
    format!("{salt}${digest}")
}

#[must_use]
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt, digest)) = stored.split_once('$') else {
        return false;
    };
    constant_time_eq(sha256_hex(salt, password).as_bytes(), digest.as_bytes())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

// =============================================================================
// REGISTRATION / LOGIN
// =============================================================================

/// Create a new player account. Returns the new user's id.
///
/// # Errors
///
/// Fails on malformed input, a duplicate email, or an unknown referral code.
pub async fn register(pool: &PgPool, reg: &Registration) -> Result<Uuid, AuthError> {
    let email = normalize_email(&reg.email).ok_or(AuthError::InvalidEmail)?;
    if reg.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::WeakPassword);
    }
    let name = reg
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map_or_else(|| name_from_email(&email), str::to_owned);

    let referred_by = match reg.referral_code.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
        Some(code) => Some(
            referral::resolve_referrer(pool, code)
                .await?
                .ok_or(AuthError::InvalidReferralCode)?,
        ),
        None => None,
    };

    let password_hash = hash_password(&reg.password);
    for _ in 0..REFERRAL_CODE_ATTEMPTS {
        let code = referral::generate_referral_code();
        let inserted = sqlx::query(
            r"INSERT INTO users (email, name, phone, password_hash, referral_code, referred_by)
              VALUES ($1, $2, $3, $4, $5, $6)
              RETURNING id",
        )
        .bind(&email)
        .bind(&name)
        .bind(reg.phone.as_deref())
        .bind(&password_hash)
        .bind(&code)
        .bind(referred_by)
        .fetch_one(pool)
        .await;

        match inserted {
            Ok(row) => {
                let id: Uuid = row.get("id");
                info!(%id, referred = referred_by.is_some(), "user registered");
                return Ok(id);
            }
            Err(sqlx::Error::Database(db)) if db.constraint() == Some("users_email_key") => {
                return Err(AuthError::EmailTaken);
            }
            Err(e) if is_unique_violation(&e) => {}
            Err(e) => return Err(e.into()),
        }
    }
    Err(AuthError::CodeExhausted)
}

/// Check credentials and return the user id.
///
/// # Errors
///
/// Returns `InvalidCredentials` for unknown emails and bad passwords alike.
pub async fn login(pool: &PgPool, email: &str, password: &str) -> Result<Uuid, AuthError> {
    let email = normalize_email(email).ok_or(AuthError::InvalidCredentials)?;
    let row = sqlx::query("SELECT id, password_hash, banned FROM users WHERE email = $1")
        .bind(&email)
        .fetch_optional(pool)
        .await?
        .ok_or(AuthError::InvalidCredentials)?;

    let stored: String = row.get("password_hash");
    if !verify_password(password, &stored) {
        return Err(AuthError::InvalidCredentials);
    }
    if row.get::<bool, _>("banned") {
        return Err(AuthError::Banned);
    }
    Ok(row.get("id"))
}

/// Replace a user's password after checking the current one.
pub async fn change_password(pool: &PgPool, user_id: Uuid, current: &str, new: &str) -> Result<(), AuthError> {
    if new.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::WeakPassword);
    }
    let stored: String = sqlx::query_scalar("SELECT password_hash FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AuthError::InvalidCredentials)?;
    if !verify_password(current, &stored) {
        return Err(AuthError::InvalidCredentials);
    }

    sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
        .bind(user_id)
        .bind(hash_password(new))
        .execute(pool)
        .await?;
    Ok(())
}

/// Create the configured admin, or promote and re-key an existing account.
pub async fn ensure_bootstrap_admin(pool: &PgPool, admin: &BootstrapAdmin) -> Result<Uuid, AuthError> {
    let email = normalize_email(&admin.email).ok_or(AuthError::InvalidEmail)?;
    let existing: Option<Uuid> = sqlx::query_scalar("SELECT id FROM users WHERE email = $1")
        .bind(&email)
        .fetch_optional(pool)
        .await?;

    let id = match existing {
        Some(id) => {
            sqlx::query("UPDATE users SET role = 'admin', password_hash = $2, banned = false WHERE id = $1")
                .bind(id)
                .bind(hash_password(&admin.password))
                .execute(pool)
                .await?;
            id
        }
        None => {
            let reg = Registration {
                email: email.clone(),
                password: admin.password.clone(),
                name: Some("admin".into()),
                phone: None,
                referral_code: None,
            };
            let id = register(pool, &reg).await?;
            sqlx::query("UPDATE users SET role = 'admin' WHERE id = $1")
                .bind(id)
                .execute(pool)
                .await?;
            id
        }
    };
    info!(%id, "bootstrap admin ensured");
    Ok(id)
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
