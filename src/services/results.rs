//! Match results, winnings distribution and reversal.
//!
//! Results are stored per player with the winning already computed, so
//! distribution and reversal replay exactly the same amounts. The
//! `winnings_distributed` flag on the match row (read under `FOR UPDATE`)
//! is what makes distribution happen at most once.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::services::matches::{self, MatchError, MatchType};
use crate::services::notification;
use crate::services::wallet::{self, NewTransaction, TxKind, WalletError, WalletKind, capped_debit};

#[derive(Debug, thiserror::Error)]
pub enum ResultsError {
    #[error("match not found: {0}")]
    NotFound(Uuid),
    #[error("invalid results: {0}")]
    Invalid(String),
    #[error("winnings already distributed")]
    AlreadyDistributed,
    #[error("winnings have not been distributed")]
    NotDistributed,
    #[error("no results submitted for this match")]
    NoResults,
    #[error("match is {0}")]
    InvalidState(MatchType),
    #[error("user not found: {0}")]
    UserNotFound(Uuid),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl crate::error::ErrorCode for ResultsError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) | Self::UserNotFound(_) => "E_NOT_FOUND",
            Self::Invalid(_) => "E_INVALID_RESULTS",
            Self::AlreadyDistributed => "E_ALREADY_DISTRIBUTED",
            Self::NotDistributed => "E_NOT_DISTRIBUTED",
            Self::NoResults => "E_NO_RESULTS",
            Self::InvalidState(_) => "E_INVALID_STATE",
            Self::Database(_) => "E_DATABASE",
        }
    }
}

impl From<MatchError> for ResultsError {
    fn from(err: MatchError) -> Self {
        match err {
            MatchError::NotFound(id) => Self::NotFound(id),
            MatchError::UserNotFound(id) => Self::UserNotFound(id),
            MatchError::Database(e) => Self::Database(e),
            other => Self::Invalid(other.to_string()),
        }
    }
}

impl From<WalletError> for ResultsError {
    fn from(err: WalletError) -> Self {
        match err {
            WalletError::UserNotFound(id) => Self::UserNotFound(id),
            WalletError::Database(e) => Self::Database(e),
            other => Self::Invalid(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ResultEntry {
    pub user_id: Uuid,
    pub rank: i32,
    #[serde(default)]
    pub kills: i32,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ResultRow {
    pub user_id: Uuid,
    pub name: String,
    pub in_game_name: String,
    pub rank: i32,
    pub kills: i32,
    pub winning: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DistributionSummary {
    pub match_id: Uuid,
    pub players: usize,
    pub total_paid: i64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Shortfall {
    pub user_id: Uuid,
    pub amount: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReversalSummary {
    pub match_id: Uuid,
    pub players: usize,
    pub total_reversed: i64,
    pub shortfalls: Vec<Shortfall>,
}

/// `kills * per_kill + rank_prizes[rank - 1]`; ranks past the prize table
/// only earn kill money.
#[must_use]
pub fn compute_winning(rank: i32, kills: i32, per_kill: i64, rank_prizes: &[i64]) -> i64 {
    let kill_money = i64::from(kills.max(0)).saturating_mul(per_kill.max(0));
    let rank_prize = usize::try_from(rank)
        .ok()
        .and_then(|r| r.checked_sub(1))
        .and_then(|idx| rank_prizes.get(idx))
        .copied()
        .unwrap_or(0)
        .max(0);
    kill_money.saturating_add(rank_prize)
}

/// Check a submitted result set against the players in the match.
///
/// # Errors
///
/// Returns `Invalid` for an empty set, bad numbers, duplicate ranks or
/// players, or a player who isn't in the match.
pub fn validate_entries(entries: &[ResultEntry], joined: &HashSet<Uuid>) -> Result<(), ResultsError> {
    if entries.is_empty() {
        return Err(ResultsError::Invalid("at least one result is required".into()));
    }
    let mut ranks = HashSet::new();
    let mut players = HashSet::new();
    for entry in entries {
        if entry.rank < 1 {
            return Err(ResultsError::Invalid(format!("rank must be at least 1 (got {})", entry.rank)));
        }
        if entry.kills < 0 {
            return Err(ResultsError::Invalid("kills must not be negative".into()));
        }
        if !joined.contains(&entry.user_id) {
            return Err(ResultsError::Invalid(format!("user {} did not join this match", entry.user_id)));
        }
        if !ranks.insert(entry.rank) {
            return Err(ResultsError::Invalid(format!("rank {} appears more than once", entry.rank)));
        }
        if !players.insert(entry.user_id) {
            return Err(ResultsError::Invalid(format!("user {} appears more than once", entry.user_id)));
        }
    }
    Ok(())
}

/// Results exist only once a match has started; before that the player
/// list can still change.
pub fn ensure_results_open(match_type: MatchType) -> Result<(), ResultsError> {
    match match_type {
        MatchType::Ongoing | MatchType::Results => Ok(()),
        other => Err(ResultsError::InvalidState(other)),
    }
}

/// Store results, replacing any earlier undistributed set.
pub async fn submit_results(pool: &PgPool, match_id: Uuid, entries: &[ResultEntry]) -> Result<Vec<ResultRow>, ResultsError> {
    let mut tx = pool.begin().await?;
    let m = matches::lock_match(&mut tx, match_id).await?;
    if m.winnings_distributed {
        return Err(ResultsError::AlreadyDistributed);
    }
    ensure_results_open(m.match_type)?;

    let joined: HashSet<Uuid> = sqlx::query_scalar::<_, Uuid>("SELECT user_id FROM match_players WHERE match_id = $1")
        .bind(match_id)
        .fetch_all(&mut *tx)
        .await?
        .into_iter()
        .collect();
    validate_entries(entries, &joined)?;

    sqlx::query("DELETE FROM match_results WHERE match_id = $1")
        .bind(match_id)
        .execute(&mut *tx)
        .await?;
    for entry in entries {
        let winning = compute_winning(entry.rank, entry.kills, m.per_kill, &m.rank_prizes);
        sqlx::query("INSERT INTO match_results (match_id, user_id, rank, kills, winning) VALUES ($1, $2, $3, $4, $5)")
            .bind(match_id)
            .bind(entry.user_id)
            .bind(entry.rank)
            .bind(entry.kills)
            .bind(winning)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;

    info!(%match_id, entries = entries.len(), "match results submitted");
    get_results(pool, match_id).await
}

pub async fn get_results(pool: &PgPool, match_id: Uuid) -> Result<Vec<ResultRow>, ResultsError> {
    let rows = sqlx::query_as::<_, ResultRow>(
        r"SELECT r.user_id, u.name, COALESCE(mp.in_game_name, '') AS in_game_name, r.rank, r.kills, r.winning
          FROM match_results r
          JOIN users u ON u.id = r.user_id
          LEFT JOIN match_players mp ON mp.match_id = r.match_id AND mp.user_id = r.user_id
          WHERE r.match_id = $1
          ORDER BY r.rank ASC",
    )
    .bind(match_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Credit every stored result to the players' winnings and mark the match
/// as finished.
///
/// # Errors
///
/// `AlreadyDistributed` on a second call; `NoResults` when nothing was
/// submitted.
pub async fn distribute_winnings(pool: &PgPool, match_id: Uuid) -> Result<DistributionSummary, ResultsError> {
    let mut tx = pool.begin().await?;
    let m = matches::lock_match(&mut tx, match_id).await?;
    if m.winnings_distributed {
        return Err(ResultsError::AlreadyDistributed);
    }
    ensure_results_open(m.match_type)?;

    let results: Vec<(Uuid, i32, i32, i64)> =
        sqlx::query_as("SELECT user_id, rank, kills, winning FROM match_results WHERE match_id = $1 ORDER BY user_id")
            .bind(match_id)
            .fetch_all(&mut *tx)
            .await?;
    if results.is_empty() {
        return Err(ResultsError::NoResults);
    }

    let mut total_paid = 0i64;
    for (user_id, rank, kills, winning) in &results {
        wallet::lock_balances(&mut tx, *user_id).await?;
        sqlx::query(
            r"UPDATE users
              SET winnings = winnings + $2, total_winnings = total_winnings + $2,
                  kills = kills + $3, matches = matches + 1
              WHERE id = $1",
        )
        .bind(user_id)
        .bind(winning)
        .bind(kills)
        .execute(&mut *tx)
        .await?;

        if *winning > 0 {
            wallet::record(
                &mut tx,
                &NewTransaction::completed(*user_id, TxKind::Winnings, WalletKind::Winnings, *winning).match_id(match_id),
            )
            .await?;
            notification::notify(
                &mut tx,
                *user_id,
                "Winnings credited",
                &format!("You placed #{rank} in {} and won {winning}.", m.title),
            )
            .await?;
        }
        total_paid = total_paid.saturating_add(*winning);
    }

    sqlx::query(
        "UPDATE matches SET winnings_distributed = true, match_type = 'Results', updated_at = now() WHERE id = $1",
    )
    .bind(match_id)
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;

    info!(%match_id, players = results.len(), total_paid, "winnings distributed");
    Ok(DistributionSummary { match_id, players: results.len(), total_paid })
}

/// Undo a distribution. Winnings never go negative: each debit is capped
/// at the player's current balance and the uncollected remainder is
/// reported as a shortfall.
pub async fn reverse_winnings(pool: &PgPool, match_id: Uuid) -> Result<ReversalSummary, ResultsError> {
    let mut tx = pool.begin().await?;
    let m = matches::lock_match(&mut tx, match_id).await?;
    if !m.winnings_distributed {
        return Err(ResultsError::NotDistributed);
    }

    let results: Vec<(Uuid, i32, i64)> =
        sqlx::query_as("SELECT user_id, kills, winning FROM match_results WHERE match_id = $1 ORDER BY user_id")
            .bind(match_id)
            .fetch_all(&mut *tx)
            .await?;

    let mut total_reversed = 0i64;
    let mut shortfalls = Vec::new();
    for (user_id, kills, winning) in &results {
        let balances = wallet::lock_balances(&mut tx, *user_id).await?;
        let (debited, shortfall) = capped_debit(balances.winnings, *winning);
        sqlx::query(
            r"UPDATE users
              SET winnings = winnings - $2,
                  total_winnings = GREATEST(total_winnings - $3, 0),
                  kills = GREATEST(kills - $4, 0),
                  matches = GREATEST(matches - 1, 0)
              WHERE id = $1",
        )
        .bind(user_id)
        .bind(debited)
        .bind(winning)
        .bind(kills)
        .execute(&mut *tx)
        .await?;

        if debited > 0 {
            wallet::record(
                &mut tx,
                &NewTransaction::completed(*user_id, TxKind::WinningsReversal, WalletKind::Winnings, -debited)
                    .match_id(match_id),
            )
            .await?;
        }
        if shortfall > 0 {
            warn!(%match_id, %user_id, shortfall, "winnings reversal capped at balance");
            shortfalls.push(Shortfall { user_id: *user_id, amount: shortfall });
        }
        total_reversed = total_reversed.saturating_add(debited);
    }

    sqlx::query("UPDATE matches SET winnings_distributed = false, updated_at = now() WHERE id = $1")
        .bind(match_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    info!(%match_id, players = results.len(), total_reversed, shortfalls = shortfalls.len(), "winnings reversed");
    Ok(ReversalSummary { match_id, players: results.len(), total_reversed, shortfalls })
}

#[cfg(test)]
#[path = "results_test.rs"]
mod tests;
