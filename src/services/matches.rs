//! Match service: tournament CRUD, lifecycle and slot allocation.
//!
//! DESIGN
//! ======
//! A match moves `Upcoming → Ongoing → Results`; `Upcoming` and `Ongoing`
//! may also move to `Cancelled`, which refunds every entry fee. Players can
//! only join or leave while the match is `Upcoming`.
//!
//! Joining is one transaction: lock the match row, lock the player's wallet,
//! pick the lowest free slot, charge the entry fee (deposit first, then
//! winnings), insert the player and bump `filled_slots`. The amounts taken
//! from each balance are stored on the player row so a leave or a cancel
//! refunds exactly what was paid, to the balance it came from.
//!
//! Lock order is always match row first, then user rows in ascending id
//! order, to keep concurrent multi-user operations deadlock-free.

use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use crate::services::notification;
use crate::services::referral;
use crate::services::wallet::{self, NewTransaction, TxKind, WalletError, WalletKind, split_charge};

pub const MAX_PLAYERS_LIMIT: i32 = 1000;
const MAX_IN_GAME_NAME_LEN: usize = 32;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum MatchError {
    #[error("match not found: {0}")]
    NotFound(Uuid),
    #[error("invalid match: {0}")]
    Invalid(String),
    #[error("match is {0}; {1}")]
    InvalidState(MatchType, &'static str),
    #[error("match is full")]
    Full,
    #[error("already joined this match")]
    AlreadyJoined,
    #[error("not joined in this match")]
    NotJoined,
    #[error("match has {0} registered players")]
    HasPlayers(i32),
    #[error("account is banned")]
    Banned,
    #[error("insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: i64, available: i64 },
    #[error("user not found: {0}")]
    UserNotFound(Uuid),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl crate::error::ErrorCode for MatchError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) | Self::UserNotFound(_) => "E_NOT_FOUND",
            Self::Invalid(_) => "E_INVALID_MATCH",
            Self::InvalidState(..) => "E_INVALID_STATE",
            Self::Full => "E_MATCH_FULL",
            Self::AlreadyJoined => "E_ALREADY_JOINED",
            Self::NotJoined => "E_NOT_JOINED",
            Self::HasPlayers(_) => "E_HAS_PLAYERS",
            Self::Banned => "E_BANNED",
            Self::InsufficientFunds { .. } => "E_INSUFFICIENT_FUNDS",
            Self::Database(_) => "E_DATABASE",
        }
    }
}

impl From<WalletError> for MatchError {
    fn from(err: WalletError) -> Self {
        match err {
            WalletError::UserNotFound(id) => Self::UserNotFound(id),
            WalletError::InsufficientFunds { needed, available } => Self::InsufficientFunds { needed, available },
            WalletError::Database(e) => Self::Database(e),
            other => Self::Invalid(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchType {
    Upcoming,
    Ongoing,
    Results,
    Cancelled,
}

impl MatchType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Upcoming => "Upcoming",
            Self::Ongoing => "Ongoing",
            Self::Results => "Results",
            Self::Cancelled => "Cancelled",
        }
    }

    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "Upcoming" => Some(Self::Upcoming),
            "Ongoing" => Some(Self::Ongoing),
            "Results" => Some(Self::Results),
            "Cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Whether the lifecycle allows moving from `self` to `to`.
    #[must_use]
    pub fn can_transition(self, to: Self) -> bool {
        matches!(
            (self, to),
            (Self::Upcoming, Self::Ongoing)
                | (Self::Ongoing, Self::Results)
                | (Self::Upcoming | Self::Ongoing, Self::Cancelled)
        )
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Results | Self::Cancelled)
    }
}

impl std::fmt::Display for MatchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for MatchType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_str(&value).ok_or_else(|| format!("unknown match type {value:?}"))
    }
}

/// A match as stored. Room credentials are stripped by `redacted` before
/// being shown to anyone who hasn't joined.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct MatchRow {
    pub id: Uuid,
    pub title: String,
    pub game: String,
    pub map: String,
    pub mode: String,
    #[serde(with = "time::serde::rfc3339::option")]
    pub scheduled_at: Option<OffsetDateTime>,
    #[sqlx(try_from = "String")]
    #[serde(rename = "type")]
    pub match_type: MatchType,
    pub max_players: i32,
    pub filled_slots: i32,
    pub entry_fee: i64,
    pub per_kill: i64,
    pub prize_pool: i64,
    #[sqlx(json)]
    pub rank_prizes: Vec<i64>,
    pub room_id: Option<String>,
    pub room_password: Option<String>,
    pub winnings_distributed: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl MatchRow {
    #[must_use]
    pub fn redacted(mut self) -> Self {
        self.room_id = None;
        self.room_password = None;
        self
    }

    #[must_use]
    pub fn open_slots(&self) -> i32 {
        (self.max_players - self.filled_slots).max(0)
    }
}

const MATCH_COLUMNS: &str = "id, title, game, map, mode, scheduled_at, match_type, max_players, filled_slots, \
     entry_fee, per_kill, prize_pool, rank_prizes, room_id, room_password, winnings_distributed, created_at";

#[derive(Debug, Clone, Deserialize)]
pub struct MatchInput {
    pub title: String,
    #[serde(default)]
    pub game: String,
    #[serde(default)]
    pub map: String,
    #[serde(default)]
    pub mode: String,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub scheduled_at: Option<OffsetDateTime>,
    pub max_players: i32,
    #[serde(default)]
    pub entry_fee: i64,
    #[serde(default)]
    pub per_kill: i64,
    #[serde(default)]
    pub prize_pool: i64,
    #[serde(default)]
    pub rank_prizes: Vec<i64>,
}

impl MatchInput {
    /// # Errors
    ///
    /// Returns `Invalid` naming the first bad field.
    pub fn validate(&self) -> Result<(), MatchError> {
        if self.title.trim().is_empty() {
            return Err(MatchError::Invalid("title is required".into()));
        }
        if !(1..=MAX_PLAYERS_LIMIT).contains(&self.max_players) {
            return Err(MatchError::Invalid(format!("max_players must be between 1 and {MAX_PLAYERS_LIMIT}")));
        }
        if self.entry_fee < 0 || self.per_kill < 0 || self.prize_pool < 0 {
            return Err(MatchError::Invalid("entry_fee, per_kill and prize_pool must not be negative".into()));
        }
        if self.rank_prizes.iter().any(|p| *p < 0) {
            return Err(MatchError::Invalid("rank prizes must not be negative".into()));
        }
        if self.rank_prizes.len() > usize::try_from(self.max_players).unwrap_or(0) {
            return Err(MatchError::Invalid("more rank prizes than players".into()));
        }
        Ok(())
    }
}

/// Partial update; absent fields keep their value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MatchPatch {
    pub title: Option<String>,
    pub game: Option<String>,
    pub map: Option<String>,
    pub mode: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub scheduled_at: Option<OffsetDateTime>,
    pub max_players: Option<i32>,
    pub entry_fee: Option<i64>,
    pub per_kill: Option<i64>,
    pub prize_pool: Option<i64>,
    pub rank_prizes: Option<Vec<i64>>,
}

impl MatchPatch {
    /// Merge onto the current row, producing a full input to validate.
    #[must_use]
    pub fn apply(&self, current: &MatchRow) -> MatchInput {
        MatchInput {
            title: self.title.clone().unwrap_or_else(|| current.title.clone()),
            game: self.game.clone().unwrap_or_else(|| current.game.clone()),
            map: self.map.clone().unwrap_or_else(|| current.map.clone()),
            mode: self.mode.clone().unwrap_or_else(|| current.mode.clone()),
            scheduled_at: self.scheduled_at.or(current.scheduled_at),
            max_players: self.max_players.unwrap_or(current.max_players),
            entry_fee: self.entry_fee.unwrap_or(current.entry_fee),
            per_kill: self.per_kill.unwrap_or(current.per_kill),
            prize_pool: self.prize_pool.unwrap_or(current.prize_pool),
            rank_prizes: self.rank_prizes.clone().unwrap_or_else(|| current.rank_prizes.clone()),
        }
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct MatchPlayerRow {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub slot: i32,
    pub in_game_name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub joined_at: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct JoinReceipt {
    pub match_id: Uuid,
    pub slot: i32,
    pub paid_deposit: i64,
    pub paid_winnings: i64,
}

/// A user's view of a match they joined, with their result if declared.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct JoinedMatchDetail {
    pub match_id: Uuid,
    pub title: String,
    #[sqlx(try_from = "String")]
    #[serde(rename = "type")]
    pub match_type: MatchType,
    #[serde(with = "time::serde::rfc3339::option")]
    pub scheduled_at: Option<OffsetDateTime>,
    pub slot: i32,
    pub in_game_name: String,
    pub entry_fee: i64,
    pub rank: Option<i32>,
    pub kills: Option<i32>,
    pub winning: Option<i64>,
}

// =============================================================================
// PURE RULES
// =============================================================================

/// Lowest slot in `1..=max` not present in `taken`.
#[must_use]
pub fn lowest_free_slot(taken: &[i32], max: i32) -> Option<i32> {
    let mut sorted = taken.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    let mut candidate = 1;
    for slot in sorted {
        if slot < candidate {
            continue;
        }
        if slot > candidate {
            break;
        }
        candidate += 1;
    }
    (candidate <= max).then_some(candidate)
}

/// Trim and bound an in-game name.
///
/// # Errors
///
/// Rejects empty or overlong names.
pub fn normalize_in_game_name(name: &str) -> Result<String, MatchError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(MatchError::Invalid("in-game name is required".into()));
    }
    if name.chars().count() > MAX_IN_GAME_NAME_LEN {
        return Err(MatchError::Invalid(format!("in-game name is limited to {MAX_IN_GAME_NAME_LEN} characters")));
    }
    Ok(name.to_owned())
}

// =============================================================================
// CRUD
// =============================================================================

pub async fn create_match(pool: &PgPool, input: &MatchInput) -> Result<MatchRow, MatchError> {
    input.validate()?;
    let row = sqlx::query_as::<_, MatchRow>(&format!(
        "INSERT INTO matches (title, game, map, mode, scheduled_at, max_players, entry_fee, per_kill, prize_pool, rank_prizes)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
         RETURNING {MATCH_COLUMNS}"
    ))
    .bind(input.title.trim())
    .bind(&input.game)
    .bind(&input.map)
    .bind(&input.mode)
    .bind(input.scheduled_at)
    .bind(input.max_players)
    .bind(input.entry_fee)
    .bind(input.per_kill)
    .bind(input.prize_pool)
    .bind(sqlx::types::Json(&input.rank_prizes))
    .fetch_one(pool)
    .await?;
    info!(match_id = %row.id, title = %row.title, "match created");
    Ok(row)
}

pub async fn get_match(pool: &PgPool, match_id: Uuid) -> Result<MatchRow, MatchError> {
    sqlx::query_as::<_, MatchRow>(&format!("SELECT {MATCH_COLUMNS} FROM matches WHERE id = $1"))
        .bind(match_id)
        .fetch_optional(pool)
        .await?
        .ok_or(MatchError::NotFound(match_id))
}

/// List matches, optionally filtered by type. Upcoming matches sort by
/// schedule; everything else newest first.
pub async fn list_matches(pool: &PgPool, match_type: Option<MatchType>) -> Result<Vec<MatchRow>, MatchError> {
    let rows = match match_type {
        Some(MatchType::Upcoming) => {
            sqlx::query_as::<_, MatchRow>(&format!(
                "SELECT {MATCH_COLUMNS} FROM matches WHERE match_type = 'Upcoming'
                 ORDER BY scheduled_at ASC NULLS LAST, created_at ASC"
            ))
            .fetch_all(pool)
            .await?
        }
        Some(other) => {
            sqlx::query_as::<_, MatchRow>(&format!(
                "SELECT {MATCH_COLUMNS} FROM matches WHERE match_type = $1
                 ORDER BY scheduled_at DESC NULLS LAST, created_at DESC"
            ))
            .bind(other.as_str())
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, MatchRow>(&format!(
                "SELECT {MATCH_COLUMNS} FROM matches ORDER BY scheduled_at DESC NULLS LAST, created_at DESC"
            ))
            .fetch_all(pool)
            .await?
        }
    };
    Ok(rows)
}

pub async fn update_match(pool: &PgPool, match_id: Uuid, patch: &MatchPatch) -> Result<MatchRow, MatchError> {
    let mut tx = pool.begin().await?;
    let current = lock_match(&mut tx, match_id).await?;
    if current.match_type.is_terminal() {
        return Err(MatchError::InvalidState(current.match_type, "it can no longer be edited"));
    }
    let next = patch.apply(&current);
    next.validate()?;
    if next.max_players < current.filled_slots {
        return Err(MatchError::Invalid(format!(
            "max_players cannot drop below the {} registered players",
            current.filled_slots
        )));
    }
    if current.filled_slots > 0 && next.entry_fee != current.entry_fee {
        return Err(MatchError::HasPlayers(current.filled_slots));
    }

    let row = sqlx::query_as::<_, MatchRow>(&format!(
        "UPDATE matches SET title = $2, game = $3, map = $4, mode = $5, scheduled_at = $6, max_players = $7,
                entry_fee = $8, per_kill = $9, prize_pool = $10, rank_prizes = $11, updated_at = now()
         WHERE id = $1
         RETURNING {MATCH_COLUMNS}"
    ))
    .bind(match_id)
    .bind(next.title.trim())
    .bind(&next.game)
    .bind(&next.map)
    .bind(&next.mode)
    .bind(next.scheduled_at)
    .bind(next.max_players)
    .bind(next.entry_fee)
    .bind(next.per_kill)
    .bind(next.prize_pool)
    .bind(sqlx::types::Json(&next.rank_prizes))
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;
    Ok(row)
}

/// What `delete_match` ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DeleteOutcome {
    Deleted,
    /// Players had joined, so the match was cancelled and refunded instead.
    Cancelled { refunded: usize },
}

/// Delete a match nobody joined. A match with players is cancelled
/// instead, refunding every entry fee.
pub async fn delete_match(pool: &PgPool, match_id: Uuid) -> Result<DeleteOutcome, MatchError> {
    let mut tx = pool.begin().await?;
    lock_match(&mut tx, match_id).await?;
    let players: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM match_players WHERE match_id = $1")
        .bind(match_id)
        .fetch_one(&mut *tx)
        .await?;
    if players > 0 {
        tx.rollback().await?;
        let refunded = cancel_match(pool, match_id).await?;
        return Ok(DeleteOutcome::Cancelled { refunded });
    }
    sqlx::query("DELETE FROM matches WHERE id = $1")
        .bind(match_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    info!(%match_id, "match deleted");
    Ok(DeleteOutcome::Deleted)
}

/// Move a match along its lifecycle. `Cancelled` goes through
/// `cancel_match` so entry fees are refunded.
pub async fn set_match_type(pool: &PgPool, match_id: Uuid, to: MatchType) -> Result<MatchRow, MatchError> {
    if to == MatchType::Cancelled {
        cancel_match(pool, match_id).await?;
        return get_match(pool, match_id).await;
    }

    let mut tx = pool.begin().await?;
    let current = lock_match(&mut tx, match_id).await?;
    if !current.match_type.can_transition(to) {
        return Err(MatchError::InvalidState(current.match_type, "that transition is not allowed"));
    }
    let row = sqlx::query_as::<_, MatchRow>(&format!(
        "UPDATE matches SET match_type = $2, updated_at = now() WHERE id = $1 RETURNING {MATCH_COLUMNS}"
    ))
    .bind(match_id)
    .bind(to.as_str())
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;
    info!(%match_id, from = %current.match_type, to = %to, "match type changed");
    Ok(row)
}

/// Publish room credentials and tell every registered player.
pub async fn set_room(pool: &PgPool, match_id: Uuid, room_id: &str, room_password: &str) -> Result<MatchRow, MatchError> {
    let room_id = room_id.trim();
    if room_id.is_empty() {
        return Err(MatchError::Invalid("room_id is required".into()));
    }

    let mut tx = pool.begin().await?;
    let current = lock_match(&mut tx, match_id).await?;
    if current.match_type.is_terminal() {
        return Err(MatchError::InvalidState(current.match_type, "room details can no longer change"));
    }
    let row = sqlx::query_as::<_, MatchRow>(&format!(
        "UPDATE matches SET room_id = $2, room_password = $3, updated_at = now() WHERE id = $1 RETURNING {MATCH_COLUMNS}"
    ))
    .bind(match_id)
    .bind(room_id)
    .bind(room_password.trim())
    .fetch_one(&mut *tx)
    .await?;

    let players: Vec<Uuid> = sqlx::query_scalar("SELECT user_id FROM match_players WHERE match_id = $1")
        .bind(match_id)
        .fetch_all(&mut *tx)
        .await?;
    let body = format!("Room details for {} are now available.", row.title);
    for user_id in &players {
        notification::notify(&mut tx, *user_id, "Room details", &body).await?;
    }
    tx.commit().await?;

    info!(%match_id, notified = players.len(), "room details published");
    Ok(row)
}

pub async fn list_players(pool: &PgPool, match_id: Uuid) -> Result<Vec<MatchPlayerRow>, MatchError> {
    let rows = sqlx::query_as::<_, MatchPlayerRow>(
        r"SELECT mp.user_id, u.name, u.email, mp.slot, mp.in_game_name, mp.joined_at
          FROM match_players mp
          JOIN users u ON u.id = mp.user_id
          WHERE mp.match_id = $1
          ORDER BY mp.slot ASC",
    )
    .bind(match_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn has_joined(pool: &PgPool, match_id: Uuid, user_id: Uuid) -> Result<bool, MatchError> {
    let joined = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM match_players WHERE match_id = $1 AND user_id = $2)")
        .bind(match_id)
        .bind(user_id)
        .fetch_one(pool)
        .await?;
    Ok(joined)
}

pub async fn joined_matches(pool: &PgPool, user_id: Uuid) -> Result<Vec<JoinedMatchDetail>, MatchError> {
    let rows = sqlx::query_as::<_, JoinedMatchDetail>(
        r"SELECT m.id AS match_id, m.title, m.match_type, m.scheduled_at, mp.slot, mp.in_game_name, m.entry_fee,
                 r.rank, r.kills, r.winning
          FROM match_players mp
          JOIN matches m ON m.id = mp.match_id
          LEFT JOIN match_results r ON r.match_id = mp.match_id AND r.user_id = mp.user_id
          WHERE mp.user_id = $1
          ORDER BY mp.joined_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

// =============================================================================
// JOIN / LEAVE / CANCEL
// =============================================================================

/// Reserve a slot for `user_id` and charge the entry fee.
///
/// # Errors
///
/// Fails if the match isn't open, is full, the user already joined, is
/// banned, or can't cover the fee.
pub async fn join_match(pool: &PgPool, match_id: Uuid, user_id: Uuid, in_game_name: &str) -> Result<JoinReceipt, MatchError> {
    let in_game_name = normalize_in_game_name(in_game_name)?;

    let mut tx = pool.begin().await?;
    let m = lock_match(&mut tx, match_id).await?;
    if m.match_type != MatchType::Upcoming {
        return Err(MatchError::InvalidState(m.match_type, "registration is closed"));
    }
    if m.filled_slots >= m.max_players {
        return Err(MatchError::Full);
    }

    let banned: bool = sqlx::query_scalar("SELECT banned FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(MatchError::UserNotFound(user_id))?;
    if banned {
        return Err(MatchError::Banned);
    }

    let taken: Vec<(Uuid, i32)> = sqlx::query_as("SELECT user_id, slot FROM match_players WHERE match_id = $1")
        .bind(match_id)
        .fetch_all(&mut *tx)
        .await?;
    if taken.iter().any(|(uid, _)| *uid == user_id) {
        return Err(MatchError::AlreadyJoined);
    }
    let slots = taken.iter().map(|(_, slot)| *slot).collect::<Vec<_>>();
    let slot = lowest_free_slot(&slots, m.max_players).ok_or(MatchError::Full)?;

    let balances = wallet::lock_balances(&mut tx, user_id).await?;
    let (from_deposit, from_winnings) = split_charge(m.entry_fee, balances.deposit, balances.winnings)
        .ok_or(MatchError::InsufficientFunds { needed: m.entry_fee, available: balances.spendable() })?;

    for (wallet_kind, amount) in [(WalletKind::Deposit, from_deposit), (WalletKind::Winnings, from_winnings)] {
        if amount == 0 {
            continue;
        }
        wallet::apply_delta(&mut tx, user_id, wallet_kind, -amount).await?;
        wallet::record(
            &mut tx,
            &NewTransaction::completed(user_id, TxKind::EntryFee, wallet_kind, -amount).match_id(match_id),
        )
        .await?;
    }

    sqlx::query(
        r"INSERT INTO match_players (match_id, user_id, slot, in_game_name, paid_deposit, paid_winnings)
          VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(match_id)
    .bind(user_id)
    .bind(slot)
    .bind(&in_game_name)
    .bind(from_deposit)
    .bind(from_winnings)
    .execute(&mut *tx)
    .await?;
    sqlx::query("UPDATE matches SET filled_slots = filled_slots + 1, updated_at = now() WHERE id = $1")
        .bind(match_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    info!(%match_id, %user_id, slot, fee = m.entry_fee, "player joined match");

    if let Some(reward) = referral::claim_after_join(pool, user_id).await {
        info!(%user_id, referrer = %reward.referrer_id, "referral reward paid after first join");
    }

    Ok(JoinReceipt { match_id, slot, paid_deposit: from_deposit, paid_winnings: from_winnings })
}

/// Give up a slot before the match starts, refunding the entry fee.
pub async fn leave_match(pool: &PgPool, match_id: Uuid, user_id: Uuid) -> Result<(), MatchError> {
    let mut tx = pool.begin().await?;
    let m = lock_match(&mut tx, match_id).await?;
    if m.match_type != MatchType::Upcoming {
        return Err(MatchError::InvalidState(m.match_type, "players can only leave before it starts"));
    }
    let has_result: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM match_results WHERE match_id = $1 AND user_id = $2)")
            .bind(match_id)
            .bind(user_id)
            .fetch_one(&mut *tx)
            .await?;
    if has_result {
        return Err(MatchError::InvalidState(m.match_type, "a result is already recorded for this player"));
    }

    let paid: (i64, i64) = sqlx::query_as(
        "DELETE FROM match_players WHERE match_id = $1 AND user_id = $2 RETURNING paid_deposit, paid_winnings",
    )
    .bind(match_id)
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(MatchError::NotJoined)?;

    refund_player(&mut tx, match_id, user_id, paid, "left match").await?;
    sqlx::query("UPDATE matches SET filled_slots = GREATEST(filled_slots - 1, 0), updated_at = now() WHERE id = $1")
        .bind(match_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    info!(%match_id, %user_id, "player left match");
    Ok(())
}

/// Cancel a match and refund every registered player. Returns how many
/// players were refunded.
pub async fn cancel_match(pool: &PgPool, match_id: Uuid) -> Result<usize, MatchError> {
    let mut tx = pool.begin().await?;
    let m = lock_match(&mut tx, match_id).await?;
    if !m.match_type.can_transition(MatchType::Cancelled) {
        return Err(MatchError::InvalidState(m.match_type, "it can no longer be cancelled"));
    }

    let players: Vec<(Uuid, i64, i64)> = sqlx::query_as(
        "SELECT user_id, paid_deposit, paid_winnings FROM match_players WHERE match_id = $1 ORDER BY user_id",
    )
    .bind(match_id)
    .fetch_all(&mut *tx)
    .await?;

    for (user_id, paid_deposit, paid_winnings) in &players {
        refund_player(&mut tx, match_id, *user_id, (*paid_deposit, *paid_winnings), "match cancelled").await?;
        notification::notify(
            &mut tx,
            *user_id,
            "Match cancelled",
            &format!("{} was cancelled and your entry fee has been refunded.", m.title),
        )
        .await?;
    }

    sqlx::query("UPDATE matches SET match_type = 'Cancelled', updated_at = now() WHERE id = $1")
        .bind(match_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    warn!(%match_id, refunded = players.len(), "match cancelled");
    Ok(players.len())
}

// =============================================================================
// HELPERS
// =============================================================================

pub(crate) async fn lock_match(conn: &mut PgConnection, match_id: Uuid) -> Result<MatchRow, MatchError> {
    sqlx::query_as::<_, MatchRow>(&format!("SELECT {MATCH_COLUMNS} FROM matches WHERE id = $1 FOR UPDATE"))
        .bind(match_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(MatchError::NotFound(match_id))
}

async fn refund_player(
    conn: &mut PgConnection,
    match_id: Uuid,
    user_id: Uuid,
    (paid_deposit, paid_winnings): (i64, i64),
    note: &str,
) -> Result<(), MatchError> {
    wallet::lock_balances(&mut *conn, user_id).await?;
    for (wallet_kind, amount) in [(WalletKind::Deposit, paid_deposit), (WalletKind::Winnings, paid_winnings)] {
        if amount <= 0 {
            continue;
        }
        wallet::apply_delta(&mut *conn, user_id, wallet_kind, amount).await?;
        wallet::record(
            &mut *conn,
            &NewTransaction::completed(user_id, TxKind::Refund, wallet_kind, amount)
                .match_id(match_id)
                .note(Some(note)),
        )
        .await?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "matches_test.rs"]
mod tests;
