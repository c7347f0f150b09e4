//! Notification routes: user inbox and staff sends.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::routes::auth::AuthUser;
use crate::services::access::Permission;
use crate::services::notification::{self, NotificationError, NotificationRow};
use crate::state::AppState;

const MAX_INBOX_PAGE: i64 = 200;

#[derive(Deserialize)]
pub struct InboxQuery {
    pub limit: Option<i64>,
}

/// `GET /api/notifications`: Newest first.
pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<InboxQuery>,
) -> Result<Json<Vec<NotificationRow>>, ApiError> {
    let limit = query.limit.unwrap_or(50).clamp(1, MAX_INBOX_PAGE);
    let rows = notification::list_for_user(&state.pool, auth.user.id, limit)
        .await
        .map_err(notification_error_to_api)?;
    Ok(Json(rows))
}

/// `GET /api/notifications/unread-count`
pub async fn unread_count(State(state): State<AppState>, auth: AuthUser) -> Result<Json<serde_json::Value>, ApiError> {
    let count = notification::unread_count(&state.pool, auth.user.id)
        .await
        .map_err(notification_error_to_api)?;
    Ok(Json(serde_json::json!({ "unread": count })))
}

/// `POST /api/notifications/:id/read`
pub async fn mark_read(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(notification_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    notification::mark_read(&state.pool, auth.user.id, notification_id)
        .await
        .map_err(notification_error_to_api)?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/notifications/read-all`
pub async fn mark_all_read(State(state): State<AppState>, auth: AuthUser) -> Result<Json<serde_json::Value>, ApiError> {
    let updated = notification::mark_all_read(&state.pool, auth.user.id)
        .await
        .map_err(notification_error_to_api)?;
    Ok(Json(serde_json::json!({ "updated": updated })))
}

#[derive(Deserialize)]
pub struct SendBody {
    /// Absent for a broadcast to every user.
    pub user_id: Option<Uuid>,
    pub title: String,
    pub body: String,
}

/// `POST /api/admin/notifications`
pub async fn send(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<SendBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    auth.require(Permission::ManageNotifications)?;
    let recipients = match body.user_id {
        Some(user_id) => {
            notification::send_to_user(&state.pool, user_id, &body.title, &body.body)
                .await
                .map_err(notification_error_to_api)?;
            1
        }
        None => notification::broadcast(&state.pool, &body.title, &body.body)
            .await
            .map_err(notification_error_to_api)?,
    };
    tracing::info!(actor = %auth.user.id, recipients, "notification sent");
    Ok(Json(serde_json::json!({ "recipients": recipients })))
}

pub(crate) fn notification_error_to_api(err: NotificationError) -> ApiError {
    let status = match &err {
        NotificationError::Invalid(_) => StatusCode::BAD_REQUEST,
        NotificationError::NotFound(_) | NotificationError::UserNotFound(_) => StatusCode::NOT_FOUND,
        NotificationError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    ApiError::from_service(status, &err)
}

#[cfg(test)]
#[path = "notifications_test.rs"]
mod tests;
