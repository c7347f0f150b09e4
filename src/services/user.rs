//! User directory, profiles, moderation and the leaderboard.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use crate::services::access::{self, Permission, Role};
use crate::services::session::{self, SessionUser};

const MAX_NAME_LEN: usize = 60;
pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error("user not found: {0}")]
    NotFound(Uuid),
    #[error("invalid profile: {0}")]
    Invalid(String),
    #[error("{0}")]
    Forbidden(&'static str),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl crate::error::ErrorCode for UserError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "E_NOT_FOUND",
            Self::Invalid(_) => "E_INVALID_PROFILE",
            Self::Forbidden(_) => "E_FORBIDDEN",
            Self::Database(_) => "E_DATABASE",
        }
    }
}

#[derive(sqlx::FromRow)]
struct UserRecord {
    id: Uuid,
    email: String,
    name: String,
    phone: Option<String>,
    avatar_url: Option<String>,
    role: String,
    permissions: serde_json::Value,
    deposit: i64,
    winnings: i64,
    total_winnings: i64,
    kills: i32,
    matches: i32,
    referral_code: String,
    referred_by: Option<Uuid>,
    referral_reward_claimed: bool,
    banned: bool,
    created_at: OffsetDateTime,
}

const USER_COLUMNS: &str = "id, email, name, phone, avatar_url, role, permissions, deposit, winnings, total_winnings, \
     kills, matches, referral_code, referred_by, referral_reward_claimed, banned, created_at";

#[derive(Debug, Clone, Serialize)]
pub struct UserDetail {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
    pub role: Role,
    pub permissions: BTreeSet<Permission>,
    pub deposit: i64,
    pub winnings: i64,
    pub total_winnings: i64,
    pub kills: i32,
    pub matches: i32,
    pub referral_code: String,
    pub referred_by: Option<Uuid>,
    pub referral_reward_claimed: bool,
    pub banned: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<UserRecord> for UserDetail {
    fn from(r: UserRecord) -> Self {
        let role = Role::from_str(&r.role).unwrap_or(Role::User);
        let granted = access::permissions_from_json(&r.permissions);
        Self {
            id: r.id,
            email: r.email,
            name: r.name,
            phone: r.phone,
            avatar_url: r.avatar_url,
            role,
            permissions: access::effective_permissions(role, &granted),
            deposit: r.deposit,
            winnings: r.winnings,
            total_winnings: r.total_winnings,
            kills: r.kills,
            matches: r.matches,
            referral_code: r.referral_code,
            referred_by: r.referred_by,
            referral_reward_claimed: r.referral_reward_claimed,
            banned: r.banned,
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UserPage {
    pub users: Vec<UserDetail>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
}

impl ProfileUpdate {
    /// Trim fields and reject malformed ones. Empty phone/avatar clear the
    /// stored value.
    ///
    /// # Errors
    ///
    /// Returns `Invalid` naming the offending field.
    pub fn normalized(&self) -> Result<Self, UserError> {
        let name = match self.name.as_deref().map(str::trim) {
            Some("") => return Err(UserError::Invalid("name must not be empty".into())),
            Some(n) if n.chars().count() > MAX_NAME_LEN => {
                return Err(UserError::Invalid(format!("name is limited to {MAX_NAME_LEN} characters")));
            }
            other => other.map(str::to_owned),
        };
        let phone = self.phone.as_deref().map(str::trim).map(str::to_owned);
        if let Some(p) = phone.as_deref().filter(|p| !p.is_empty()) {
            let digits = p.strip_prefix('+').unwrap_or(p);
            if !(7..=15).contains(&digits.len()) || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return Err(UserError::Invalid("phone must be 7-15 digits, optionally prefixed with +".into()));
            }
        }
        let avatar_url = self.avatar_url.as_deref().map(str::trim).map(str::to_owned);
        let bad_avatar = avatar_url
            .as_deref()
            .is_some_and(|u| !u.is_empty() && !(u.starts_with("https://") || u.starts_with("http://")));
        if bad_avatar {
            return Err(UserError::Invalid("avatar_url must be an http(s) URL".into()));
        }
        Ok(Self { name, phone, avatar_url })
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct LeaderboardEntry {
    pub rank: i64,
    pub user_id: Uuid,
    pub name: String,
    pub avatar_url: Option<String>,
    pub total_winnings: i64,
    pub kills: i32,
    pub matches: i32,
}

/// Clamp client pagination to sane bounds.
#[must_use]
pub fn page_bounds(limit: Option<i64>, offset: Option<i64>) -> (i64, i64) {
    let limit = limit.unwrap_or(50).clamp(1, MAX_PAGE_SIZE);
    let offset = offset.unwrap_or(0).max(0);
    (limit, offset)
}

/// Escape `%`, `_` and `\` so user input matches literally inside ILIKE.
#[must_use]
pub fn like_pattern(query: &str) -> String {
    let mut out = String::with_capacity(query.len() + 2);
    out.push('%');
    for c in query.trim().chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('%');
    out
}

pub async fn list_users(pool: &PgPool, query: Option<&str>, limit: i64, offset: i64) -> Result<UserPage, UserError> {
    let pattern = query.filter(|q| !q.trim().is_empty()).map(like_pattern);
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE $1::TEXT IS NULL OR email ILIKE $1 OR name ILIKE $1")
        .bind(pattern.as_deref())
        .fetch_one(pool)
        .await?;
    let rows = sqlx::query_as::<_, UserRecord>(&format!(
        "SELECT {USER_COLUMNS} FROM users
         WHERE $1::TEXT IS NULL OR email ILIKE $1 OR name ILIKE $1
         ORDER BY created_at DESC
         LIMIT $2 OFFSET $3"
    ))
    .bind(pattern.as_deref())
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(UserPage { users: rows.into_iter().map(UserDetail::from).collect(), total, limit, offset })
}

pub async fn get_user(pool: &PgPool, user_id: Uuid) -> Result<UserDetail, UserError> {
    sqlx::query_as::<_, UserRecord>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .map(UserDetail::from)
        .ok_or(UserError::NotFound(user_id))
}

pub async fn update_profile(pool: &PgPool, user_id: Uuid, update: &ProfileUpdate) -> Result<UserDetail, UserError> {
    let update = update.normalized()?;
    let row = sqlx::query_as::<_, UserRecord>(&format!(
        "UPDATE users SET
            name = COALESCE($2, name),
            phone = CASE WHEN $3::TEXT IS NULL THEN phone ELSE NULLIF($3, '') END,
            avatar_url = CASE WHEN $4::TEXT IS NULL THEN avatar_url ELSE NULLIF($4, '') END
         WHERE id = $1
         RETURNING {USER_COLUMNS}"
    ))
    .bind(user_id)
    .bind(update.name.as_deref())
    .bind(update.phone.as_deref())
    .bind(update.avatar_url.as_deref())
    .fetch_optional(pool)
    .await?
    .ok_or(UserError::NotFound(user_id))?;
    Ok(row.into())
}

/// Change a user's role and granted permissions. Admin only, and admins
/// can't change their own role.
pub async fn set_role(
    pool: &PgPool,
    actor: &SessionUser,
    user_id: Uuid,
    role: Role,
    permissions: &BTreeSet<Permission>,
) -> Result<UserDetail, UserError> {
    if !actor.is_admin() {
        return Err(UserError::Forbidden("only admins can change roles"));
    }
    if actor.id == user_id && role != Role::Admin {
        return Err(UserError::Forbidden("admins cannot demote themselves"));
    }
    let stored = match role {
        Role::Staff => access::permissions_to_json(permissions),
        Role::User | Role::Admin => serde_json::json!({}),
    };
    let row = sqlx::query_as::<_, UserRecord>(&format!(
        "UPDATE users SET role = $2, permissions = $3 WHERE id = $1 RETURNING {USER_COLUMNS}"
    ))
    .bind(user_id)
    .bind(role.as_str())
    .bind(&stored)
    .fetch_optional(pool)
    .await?
    .ok_or(UserError::NotFound(user_id))?;

    warn!(actor = %actor.id, %user_id, role = role.as_str(), "user role changed");
    Ok(row.into())
}

/// Ban or unban. Banning also ends every session of the user.
pub async fn set_banned(pool: &PgPool, actor: &SessionUser, user_id: Uuid, banned: bool) -> Result<UserDetail, UserError> {
    if actor.id == user_id {
        return Err(UserError::Forbidden("you cannot ban yourself"));
    }
    let target_role: String = sqlx::query_scalar("SELECT role FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or(UserError::NotFound(user_id))?;
    if target_role == Role::Admin.as_str() && !actor.is_admin() {
        return Err(UserError::Forbidden("only admins can ban admins"));
    }

    let row = sqlx::query_as::<_, UserRecord>(&format!("UPDATE users SET banned = $2 WHERE id = $1 RETURNING {USER_COLUMNS}"))
        .bind(user_id)
        .bind(banned)
        .fetch_optional(pool)
        .await?
        .ok_or(UserError::NotFound(user_id))?;
    if banned {
        let dropped = session::delete_user_sessions(pool, user_id).await?;
        warn!(actor = %actor.id, %user_id, sessions = dropped, "user banned");
    } else {
        info!(actor = %actor.id, %user_id, "user unbanned");
    }
    Ok(row.into())
}

/// Delete a user; child rows cascade. Matches the user had joined give
/// their slot back in the same transaction.
pub async fn delete_user(pool: &PgPool, actor: &SessionUser, user_id: Uuid) -> Result<(), UserError> {
    if actor.id == user_id {
        return Err(UserError::Forbidden("you cannot delete your own account here"));
    }

    let mut tx = pool.begin().await?;
    let joined: Vec<Uuid> = sqlx::query_scalar(
        r"SELECT m.id FROM matches m
          JOIN match_players mp ON mp.match_id = m.id
          WHERE mp.user_id = $1
          ORDER BY m.id
          FOR UPDATE OF m",
    )
    .bind(user_id)
    .fetch_all(&mut *tx)
    .await?;

    let result = sqlx::query("DELETE FROM users WHERE id = $1 AND (role <> 'admin' OR $2)")
        .bind(user_id)
        .bind(actor.is_admin())
        .execute(&mut *tx)
        .await?;
    if result.rows_affected() == 0 {
        tx.rollback().await?;
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
            .bind(user_id)
            .fetch_one(pool)
            .await?;
        return Err(if exists {
            UserError::Forbidden("only admins can delete admins")
        } else {
            UserError::NotFound(user_id)
        });
    }

    if !joined.is_empty() {
        sqlx::query("UPDATE matches SET filled_slots = GREATEST(filled_slots - 1, 0), updated_at = now() WHERE id = ANY($1)")
            .bind(&joined)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;

    warn!(actor = %actor.id, %user_id, freed_slots = joined.len(), "user deleted");
    Ok(())
}

/// Top players by lifetime winnings, ties broken by kills.
pub async fn leaderboard(pool: &PgPool, limit: i64) -> Result<Vec<LeaderboardEntry>, UserError> {
    let rows = sqlx::query_as::<_, LeaderboardEntry>(
        r"SELECT ROW_NUMBER() OVER (ORDER BY total_winnings DESC, kills DESC, created_at ASC) AS rank,
                 id AS user_id, name, avatar_url, total_winnings, kills, matches
          FROM users
          WHERE NOT banned AND role = 'user'
          ORDER BY rank
          LIMIT $1",
    )
    .bind(limit.max(0))
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

#[cfg(test)]
#[path = "user_test.rs"]
mod tests;
