//! Referral codes and the one-time referral reward.
//!
//! A referred user becomes eligible once they have joined a match. Claiming
//! credits both sides' deposit balances and flips `referral_reward_claimed`
//! under the referee's row lock, so the reward is paid at most once even if
//! the automatic post-join claim races a manual claim.

use rand::Rng;
use serde::Serialize;
use sqlx::{PgPool, Row};
use tracing::{info, warn};
use uuid::Uuid;

use crate::services::settings::{self, SettingsError};
use crate::services::wallet::{self, NewTransaction, TxKind, WalletError, WalletKind};
use crate::services::notification;

pub const REFERRAL_CODE_LEN: usize = 8;
const REFERRAL_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

#[derive(Debug, thiserror::Error)]
pub enum ReferralError {
    #[error("referrals are currently disabled")]
    Disabled,
    #[error("user was not referred")]
    NotReferred,
    #[error("referral reward already claimed")]
    AlreadyClaimed,
    #[error("join a match before claiming the referral reward")]
    NotEligible,
    #[error("user not found: {0}")]
    UserNotFound(Uuid),
    /// A wallet or settings failure that isn't the caller's doing.
    #[error("referral reward failed: {0}")]
    Internal(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl crate::error::ErrorCode for ReferralError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Disabled => "E_DISABLED",
            Self::NotReferred => "E_NOT_REFERRED",
            Self::AlreadyClaimed => "E_ALREADY_CLAIMED",
            Self::NotEligible => "E_NOT_ELIGIBLE",
            Self::UserNotFound(_) => "E_NOT_FOUND",
            Self::Internal(_) => "E_INTERNAL",
            Self::Database(_) => "E_DATABASE",
        }
    }
}

impl From<WalletError> for ReferralError {
    fn from(err: WalletError) -> Self {
        match err {
            WalletError::UserNotFound(id) => Self::UserNotFound(id),
            WalletError::Database(e) => Self::Database(e),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<SettingsError> for ReferralError {
    fn from(err: SettingsError) -> Self {
        match err {
            SettingsError::Database(e) => Self::Database(e),
            other => Self::Internal(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReferralSummary {
    pub referral_code: String,
    pub referred_count: i64,
    pub rewards_earned: i64,
    pub reward_claimed: bool,
    pub referred_by: Option<Uuid>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ReferralReward {
    pub referrer_id: Uuid,
    pub referrer_amount: i64,
    pub referee_amount: i64,
}

#[must_use]
pub fn generate_referral_code() -> String {
    let mut rng = rand::rng();
    (0..REFERRAL_CODE_LEN)
        .map(|_| {
            let idx = rng.random_range(0..REFERRAL_CODE_ALPHABET.len());
            char::from(REFERRAL_CODE_ALPHABET[idx])
        })
        .collect()
}

#[must_use]
pub fn normalize_referral_code(code: &str) -> Option<String> {
    let normalized = code.trim().to_ascii_uppercase();
    let valid = normalized.len() == REFERRAL_CODE_LEN && normalized.bytes().all(|b| REFERRAL_CODE_ALPHABET.contains(&b));
    valid.then_some(normalized)
}

/// Look up the user owning a referral code.
pub async fn resolve_referrer(pool: &PgPool, code: &str) -> Result<Option<Uuid>, sqlx::Error> {
    let Some(code) = normalize_referral_code(code) else {
        return Ok(None);
    };
    sqlx::query_scalar("SELECT id FROM users WHERE referral_code = $1")
        .bind(code)
        .fetch_optional(pool)
        .await
}

pub async fn referral_summary(pool: &PgPool, user_id: Uuid) -> Result<ReferralSummary, ReferralError> {
    let row = sqlx::query(
        r"SELECT u.referral_code, u.referral_reward_claimed, u.referred_by,
                 (SELECT COUNT(*) FROM users r WHERE r.referred_by = u.id) AS referred_count,
                 (SELECT COALESCE(SUM(t.amount), 0)::BIGINT FROM transactions t
                   WHERE t.user_id = u.id AND t.kind = 'Referral') AS rewards_earned
          FROM users u WHERE u.id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or(ReferralError::UserNotFound(user_id))?;

    Ok(ReferralSummary {
        referral_code: row.get("referral_code"),
        referred_count: row.get("referred_count"),
        rewards_earned: row.get("rewards_earned"),
        reward_claimed: row.get("referral_reward_claimed"),
        referred_by: row.get("referred_by"),
    })
}

/// Pay the referral reward for `user_id` (the referee).
///
/// # Errors
///
/// Fails when referrals are disabled, the user wasn't referred, already
/// claimed, or hasn't joined a match yet.
pub async fn claim_reward(pool: &PgPool, user_id: Uuid) -> Result<ReferralReward, ReferralError> {
    let mut tx = pool.begin().await?;
    let doc = settings::load_in(&mut tx).await?;
    if !doc.settings.referrals_enabled {
        return Err(ReferralError::Disabled);
    }

    let row = sqlx::query(
        r"SELECT referred_by,
                 EXISTS(SELECT 1 FROM match_players mp WHERE mp.user_id = users.id) AS has_joined
          FROM users WHERE id = $1",
    )
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(ReferralError::UserNotFound(user_id))?;

    let referrer_id: Uuid = row.get::<Option<Uuid>, _>("referred_by").ok_or(ReferralError::NotReferred)?;
    if !row.get::<bool, _>("has_joined") {
        return Err(ReferralError::NotEligible);
    }

    // User rows are locked in ascending id order.
    let mut lock_order = [user_id, referrer_id];
    lock_order.sort();
    for id in lock_order {
        wallet::lock_balances(&mut tx, id).await?;
    }
    let claimed: bool = sqlx::query_scalar("SELECT referral_reward_claimed FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;
    if claimed {
        return Err(ReferralError::AlreadyClaimed);
    }

    let referrer_amount = doc.settings.referral_reward_referrer;
    let referee_amount = doc.settings.referral_reward_referee;

    for (recipient, amount, note) in [
        (referrer_id, referrer_amount, "referral bonus"),
        (user_id, referee_amount, "welcome referral bonus"),
    ] {
        if amount <= 0 {
            continue;
        }
        wallet::apply_delta(&mut tx, recipient, WalletKind::Deposit, amount).await?;
        wallet::record(
            &mut tx,
            &NewTransaction::completed(recipient, TxKind::Referral, WalletKind::Deposit, amount).note(Some(note)),
        )
        .await?;
        notification::notify(&mut tx, recipient, "Referral reward", &format!("{amount} was added to your deposit wallet."))
            .await?;
    }

    sqlx::query("UPDATE users SET referral_reward_claimed = true WHERE id = $1")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    info!(%user_id, %referrer_id, referrer_amount, referee_amount, "referral reward paid");
    Ok(ReferralReward { referrer_id, referrer_amount, referee_amount })
}

/// Best-effort claim after a successful match join. Ineligibility is the
/// common case and stays silent; storage failures are logged.
pub async fn claim_after_join(pool: &PgPool, user_id: Uuid) -> Option<ReferralReward> {
    match claim_reward(pool, user_id).await {
        Ok(reward) => Some(reward),
        Err(e @ (ReferralError::Internal(_) | ReferralError::Database(_))) => {
            warn!(%user_id, error = %e, "referral reward claim failed");
            None
        }
        Err(_) => None,
    }
}

#[cfg(test)]
#[path = "referral_test.rs"]
mod tests;
