//! Notification service: per-user inbox, staff broadcasts.
//!
//! Broadcasts fan out into one row per user so read state stays per user
//! and the inbox query never needs a union.

use serde::Serialize;
use sqlx::{PgConnection, PgPool};
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

const MAX_TITLE_LEN: usize = 120;
const MAX_BODY_LEN: usize = 2000;

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("invalid notification: {0}")]
    Invalid(&'static str),
    #[error("notification not found: {0}")]
    NotFound(Uuid),
    #[error("user not found: {0}")]
    UserNotFound(Uuid),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl crate::error::ErrorCode for NotificationError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Invalid(_) => "E_INVALID_NOTIFICATION",
            Self::NotFound(_) | Self::UserNotFound(_) => "E_NOT_FOUND",
            Self::Database(_) => "E_DATABASE",
        }
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct NotificationRow {
    pub id: Uuid,
    pub title: String,
    pub body: String,
    pub read: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Trim and bound a title/body pair.
///
/// # Errors
///
/// Rejects empty or oversized fields.
pub fn validate_message(title: &str, body: &str) -> Result<(String, String), NotificationError> {
    let title = title.trim();
    let body = body.trim();
    if title.is_empty() {
        return Err(NotificationError::Invalid("title is required"));
    }
    if body.is_empty() {
        return Err(NotificationError::Invalid("body is required"));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(NotificationError::Invalid("title is too long"));
    }
    if body.chars().count() > MAX_BODY_LEN {
        return Err(NotificationError::Invalid("body is too long"));
    }
    Ok((title.to_owned(), body.to_owned()))
}

/// Insert a notification inside a caller's transaction.
pub(crate) async fn notify(conn: &mut PgConnection, user_id: Uuid, title: &str, body: &str) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO notifications (user_id, title, body) VALUES ($1, $2, $3)")
        .bind(user_id)
        .bind(title)
        .bind(body)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Staff message to a single user.
pub async fn send_to_user(pool: &PgPool, user_id: Uuid, title: &str, body: &str) -> Result<(), NotificationError> {
    let (title, body) = validate_message(title, body)?;
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
        .bind(user_id)
        .fetch_one(pool)
        .await?;
    if !exists {
        return Err(NotificationError::UserNotFound(user_id));
    }
    let mut conn = pool.acquire().await?;
    notify(&mut conn, user_id, &title, &body).await?;
    Ok(())
}

/// Staff message to every non-banned user. Returns how many were queued.
pub async fn broadcast(pool: &PgPool, title: &str, body: &str) -> Result<u64, NotificationError> {
    let (title, body) = validate_message(title, body)?;
    let result = sqlx::query(
        r"INSERT INTO notifications (user_id, title, body)
          SELECT id, $1, $2 FROM users WHERE NOT banned",
    )
    .bind(&title)
    .bind(&body)
    .execute(pool)
    .await?;
    info!(recipients = result.rows_affected(), "notification broadcast");
    Ok(result.rows_affected())
}

pub async fn list_for_user(pool: &PgPool, user_id: Uuid, limit: i64) -> Result<Vec<NotificationRow>, NotificationError> {
    let rows = sqlx::query_as::<_, NotificationRow>(
        "SELECT id, title, body, read, created_at FROM notifications
         WHERE user_id = $1
         ORDER BY created_at DESC
         LIMIT $2",
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn unread_count(pool: &PgPool, user_id: Uuid) -> Result<i64, NotificationError> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND NOT read")
        .bind(user_id)
        .fetch_one(pool)
        .await?;
    Ok(count)
}

pub async fn mark_read(pool: &PgPool, user_id: Uuid, notification_id: Uuid) -> Result<(), NotificationError> {
    let result = sqlx::query("UPDATE notifications SET read = true WHERE id = $1 AND user_id = $2")
        .bind(notification_id)
        .bind(user_id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(NotificationError::NotFound(notification_id));
    }
    Ok(())
}

pub async fn mark_all_read(pool: &PgPool, user_id: Uuid) -> Result<u64, NotificationError> {
    let result = sqlx::query("UPDATE notifications SET read = true WHERE user_id = $1 AND NOT read")
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
#[path = "notification_test.rs"]
mod tests;
