//! Promo codes: admin-issued vouchers credited to the deposit wallet.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::services::settings::{self, SettingsError};
use crate::services::wallet::{self, NewTransaction, TxKind, WalletError, WalletKind};

const MIN_CODE_LEN: usize = 4;
const MAX_CODE_LEN: usize = 20;

#[derive(Debug, thiserror::Error)]
pub enum PromoError {
    #[error("invalid promo code: {0}")]
    Invalid(String),
    #[error("promo code not found")]
    NotFound,
    #[error("promo code already exists")]
    Duplicate,
    #[error("promo code is inactive")]
    Inactive,
    #[error("promo code has expired")]
    Expired,
    #[error("promo code has been fully used")]
    Exhausted,
    #[error("promo code already redeemed")]
    AlreadyRedeemed,
    #[error("promo codes are currently disabled")]
    Disabled,
    #[error("user not found: {0}")]
    UserNotFound(Uuid),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl crate::error::ErrorCode for PromoError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Invalid(_) => "E_INVALID_PROMO",
            Self::NotFound | Self::UserNotFound(_) => "E_NOT_FOUND",
            Self::Duplicate => "E_DUPLICATE",
            Self::Inactive => "E_PROMO_INACTIVE",
            Self::Expired => "E_PROMO_EXPIRED",
            Self::Exhausted => "E_PROMO_EXHAUSTED",
            Self::AlreadyRedeemed => "E_ALREADY_REDEEMED",
            Self::Disabled => "E_DISABLED",
            Self::Database(_) => "E_DATABASE",
        }
    }
}

impl From<WalletError> for PromoError {
    fn from(err: WalletError) -> Self {
        match err {
            WalletError::UserNotFound(id) => Self::UserNotFound(id),
            WalletError::Database(e) => Self::Database(e),
            other => Self::Invalid(other.to_string()),
        }
    }
}

impl From<SettingsError> for PromoError {
    fn from(err: SettingsError) -> Self {
        match err {
            SettingsError::Database(e) => Self::Database(e),
            other => Self::Invalid(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PromoCode {
    pub code: String,
    pub amount: i64,
    pub max_uses: i32,
    pub used_count: i32,
    #[serde(with = "time::serde::rfc3339::option")]
    pub expires_at: Option<OffsetDateTime>,
    pub active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl PromoCode {
    /// Why this code can't be redeemed right now, if anything.
    #[must_use]
    pub fn unavailable_reason(&self, now: OffsetDateTime) -> Option<PromoError> {
        if !self.active {
            return Some(PromoError::Inactive);
        }
        if self.expires_at.is_some_and(|at| at <= now) {
            return Some(PromoError::Expired);
        }
        if self.used_count >= self.max_uses {
            return Some(PromoError::Exhausted);
        }
        None
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPromoCode {
    pub code: String,
    pub amount: i64,
    pub max_uses: i32,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub expires_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Redemption {
    pub amount: i64,
    pub deposit: i64,
}

const PROMO_COLUMNS: &str = "code, amount, max_uses, used_count, expires_at, active, created_at";

/// Uppercase and check the `[A-Z0-9]{4,20}` shape.
///
/// # Errors
///
/// Returns `Invalid` describing the violation.
pub fn normalize_code(code: &str) -> Result<String, PromoError> {
    let code = code.trim().to_ascii_uppercase();
    if !(MIN_CODE_LEN..=MAX_CODE_LEN).contains(&code.len()) {
        return Err(PromoError::Invalid(format!("code must be {MIN_CODE_LEN}-{MAX_CODE_LEN} characters")));
    }
    if !code.bytes().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit()) {
        return Err(PromoError::Invalid("code may only contain letters and digits".into()));
    }
    Ok(code)
}

pub async fn create_promo(pool: &PgPool, input: &NewPromoCode) -> Result<PromoCode, PromoError> {
    let code = normalize_code(&input.code)?;
    if input.amount <= 0 {
        return Err(PromoError::Invalid("amount must be positive".into()));
    }
    if input.max_uses < 1 {
        return Err(PromoError::Invalid("max_uses must be at least 1".into()));
    }

    let row = sqlx::query_as::<_, PromoCode>(&format!(
        "INSERT INTO promo_codes (code, amount, max_uses, expires_at) VALUES ($1, $2, $3, $4) RETURNING {PROMO_COLUMNS}"
    ))
    .bind(&code)
    .bind(input.amount)
    .bind(input.max_uses)
    .bind(input.expires_at)
    .fetch_one(pool)
    .await
    .map_err(|e| if crate::db::is_unique_violation(&e) { PromoError::Duplicate } else { PromoError::Database(e) })?;

    info!(code = %row.code, amount = row.amount, max_uses = row.max_uses, "promo code created");
    Ok(row)
}

pub async fn list_promos(pool: &PgPool) -> Result<Vec<PromoCode>, PromoError> {
    let rows = sqlx::query_as::<_, PromoCode>(&format!("SELECT {PROMO_COLUMNS} FROM promo_codes ORDER BY created_at DESC"))
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

pub async fn set_active(pool: &PgPool, code: &str, active: bool) -> Result<PromoCode, PromoError> {
    let code = normalize_code(code)?;
    sqlx::query_as::<_, PromoCode>(&format!(
        "UPDATE promo_codes SET active = $2 WHERE code = $1 RETURNING {PROMO_COLUMNS}"
    ))
    .bind(&code)
    .bind(active)
    .fetch_optional(pool)
    .await?
    .ok_or(PromoError::NotFound)
}

pub async fn delete_promo(pool: &PgPool, code: &str) -> Result<(), PromoError> {
    let code = normalize_code(code)?;
    let result = sqlx::query("DELETE FROM promo_codes WHERE code = $1")
        .bind(&code)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(PromoError::NotFound);
    }
    info!(%code, "promo code deleted");
    Ok(())
}

/// Redeem `code` for `user_id`, crediting the deposit wallet.
///
/// # Errors
///
/// Fails for unknown, inactive, expired or exhausted codes and for a
/// second redemption by the same user.
pub async fn redeem(pool: &PgPool, user_id: Uuid, code: &str) -> Result<Redemption, PromoError> {
    let code = normalize_code(code).map_err(|_| PromoError::NotFound)?;

    let mut tx = pool.begin().await?;
    let doc = settings::load_in(&mut tx).await?;
    if !doc.settings.promo_codes_enabled {
        return Err(PromoError::Disabled);
    }

    let promo = sqlx::query_as::<_, PromoCode>(&format!("SELECT {PROMO_COLUMNS} FROM promo_codes WHERE code = $1 FOR UPDATE"))
        .bind(&code)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(PromoError::NotFound)?;
    if let Some(reason) = promo.unavailable_reason(OffsetDateTime::now_utc()) {
        return Err(reason);
    }

    let inserted = sqlx::query(
        "INSERT INTO promo_redemptions (code, user_id) VALUES ($1, $2) ON CONFLICT (code, user_id) DO NOTHING",
    )
    .bind(&code)
    .bind(user_id)
    .execute(&mut *tx)
    .await?;
    if inserted.rows_affected() == 0 {
        return Err(PromoError::AlreadyRedeemed);
    }

    let balances = wallet::lock_balances(&mut tx, user_id).await?;
    wallet::apply_delta(&mut tx, user_id, WalletKind::Deposit, promo.amount).await?;
    wallet::record(
        &mut tx,
        &NewTransaction::completed(user_id, TxKind::Promo, WalletKind::Deposit, promo.amount).reference(&code),
    )
    .await?;
    sqlx::query("UPDATE promo_codes SET used_count = used_count + 1 WHERE code = $1")
        .bind(&code)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    info!(%user_id, %code, amount = promo.amount, "promo code redeemed");
    Ok(Redemption { amount: promo.amount, deposit: balances.deposit + promo.amount })
}

#[cfg(test)]
#[path = "promo_test.rs"]
mod tests;
