//! User directory, profile, moderation, referral and leaderboard routes.

use std::collections::BTreeSet;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::routes::auth::AuthUser;
use crate::routes::settings::settings_error_to_api;
use crate::routes::wallet::wallet_error_to_api;
use crate::services::access::{Permission, Role};
use crate::services::referral::{self, ReferralError, ReferralReward, ReferralSummary};
use crate::services::settings;
use crate::services::user::{self, LeaderboardEntry, ProfileUpdate, UserDetail, UserError, UserPage};
use crate::services::wallet::{self, Balances, WalletKind};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ListUsersQuery {
    pub q: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// `GET /api/users`: Search the user directory.
pub async fn list_users(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<UserPage>, ApiError> {
    auth.require(Permission::ManageUsers)?;
    let (limit, offset) = user::page_bounds(query.limit, query.offset);
    let page = user::list_users(&state.pool, query.q.as_deref(), limit, offset)
        .await
        .map_err(user_error_to_api)?;
    Ok(Json(page))
}

/// `GET /api/users/:id`: Full user detail; staff or the user themselves.
pub async fn get_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(user_id): Path<Uuid>,
) -> Result<Json<UserDetail>, ApiError> {
    if auth.user.id != user_id {
        auth.require(Permission::ManageUsers)?;
    }
    let detail = user::get_user(&state.pool, user_id).await.map_err(user_error_to_api)?;
    Ok(Json(detail))
}

/// `GET /api/me`: Own profile with balances and stats.
pub async fn my_profile(State(state): State<AppState>, auth: AuthUser) -> Result<Json<UserDetail>, ApiError> {
    let detail = user::get_user(&state.pool, auth.user.id).await.map_err(user_error_to_api)?;
    Ok(Json(detail))
}

/// `PATCH /api/me`: Update own name, phone or avatar.
pub async fn update_my_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<ProfileUpdate>,
) -> Result<Json<UserDetail>, ApiError> {
    let detail = user::update_profile(&state.pool, auth.user.id, &body)
        .await
        .map_err(user_error_to_api)?;
    Ok(Json(detail))
}

#[derive(Deserialize)]
pub struct SetRoleBody {
    pub role: Role,
    #[serde(default)]
    pub permissions: BTreeSet<Permission>,
}

/// `PUT /api/users/:id/role`: Admin only.
pub async fn set_role(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(user_id): Path<Uuid>,
    Json(body): Json<SetRoleBody>,
) -> Result<Json<UserDetail>, ApiError> {
    let detail = user::set_role(&state.pool, &auth.user, user_id, body.role, &body.permissions)
        .await
        .map_err(user_error_to_api)?;
    Ok(Json(detail))
}

#[derive(Deserialize)]
pub struct BanBody {
    pub banned: bool,
}

/// `PUT /api/users/:id/ban`: Ban or unban.
pub async fn set_banned(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(user_id): Path<Uuid>,
    Json(body): Json<BanBody>,
) -> Result<Json<UserDetail>, ApiError> {
    auth.require(Permission::ManageUsers)?;
    let detail = user::set_banned(&state.pool, &auth.user, user_id, body.banned)
        .await
        .map_err(user_error_to_api)?;
    Ok(Json(detail))
}

#[derive(Deserialize)]
pub struct AdjustBody {
    pub wallet: WalletKind,
    pub delta: i64,
    pub note: String,
}

/// `POST /api/users/:id/adjust`: Staff balance correction.
pub async fn adjust_balance(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(user_id): Path<Uuid>,
    Json(body): Json<AdjustBody>,
) -> Result<Json<Balances>, ApiError> {
    auth.require(Permission::ManageUsers)?;
    let balances = wallet::adjust_balance(&state.pool, user_id, body.wallet, body.delta, &body.note)
        .await
        .map_err(wallet_error_to_api)?;
    tracing::info!(actor = %auth.user.id, %user_id, delta = body.delta, "balance adjustment applied");
    Ok(Json(balances))
}

/// `DELETE /api/users/:id`
pub async fn delete_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(user_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    auth.require(Permission::ManageUsers)?;
    user::delete_user(&state.pool, &auth.user, user_id)
        .await
        .map_err(user_error_to_api)?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/leaderboard`
pub async fn leaderboard(State(state): State<AppState>, _auth: AuthUser) -> Result<Json<Vec<LeaderboardEntry>>, ApiError> {
    let doc = settings::load(&state.pool).await.map_err(settings_error_to_api)?;
    if !doc.settings.show_leaderboard {
        return Err(ApiError::new(StatusCode::FORBIDDEN, "E_DISABLED", "leaderboard is disabled"));
    }
    let entries = user::leaderboard(&state.pool, doc.settings.leaderboard_size)
        .await
        .map_err(user_error_to_api)?;
    Ok(Json(entries))
}

/// `GET /api/me/referrals`
pub async fn referral_summary(State(state): State<AppState>, auth: AuthUser) -> Result<Json<ReferralSummary>, ApiError> {
    let summary = referral::referral_summary(&state.pool, auth.user.id)
        .await
        .map_err(referral_error_to_api)?;
    Ok(Json(summary))
}

/// `POST /api/me/referrals/claim`
pub async fn claim_referral_reward(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ReferralReward>, ApiError> {
    let reward = referral::claim_reward(&state.pool, auth.user.id)
        .await
        .map_err(referral_error_to_api)?;
    Ok(Json(reward))
}

pub(crate) fn user_error_to_api(err: UserError) -> ApiError {
    let status = match &err {
        UserError::NotFound(_) => StatusCode::NOT_FOUND,
        UserError::Invalid(_) => StatusCode::BAD_REQUEST,
        UserError::Forbidden(_) => StatusCode::FORBIDDEN,
        UserError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    ApiError::from_service(status, &err)
}

pub(crate) fn referral_error_to_api(err: ReferralError) -> ApiError {
    let status = match &err {
        ReferralError::Disabled => StatusCode::FORBIDDEN,
        ReferralError::NotReferred | ReferralError::NotEligible => StatusCode::BAD_REQUEST,
        ReferralError::AlreadyClaimed => StatusCode::CONFLICT,
        ReferralError::UserNotFound(_) => StatusCode::NOT_FOUND,
        ReferralError::Internal(_) | ReferralError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    ApiError::from_service(status, &err)
}

#[cfg(test)]
#[path = "users_test.rs"]
mod tests;
