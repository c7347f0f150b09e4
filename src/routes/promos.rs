//! Promo code routes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;

use crate::error::ApiError;
use crate::rate_limit::RateLimitScope;
use crate::routes::auth::{AuthUser, rate_limit_error_to_api};
use crate::services::access::Permission;
use crate::services::promo::{self, NewPromoCode, PromoCode, PromoError, Redemption};
use crate::state::AppState;

/// `GET /api/promos`
pub async fn list_promos(State(state): State<AppState>, auth: AuthUser) -> Result<Json<Vec<PromoCode>>, ApiError> {
    auth.require(Permission::ManagePromos)?;
    let rows = promo::list_promos(&state.pool).await.map_err(promo_error_to_api)?;
    Ok(Json(rows))
}

/// `POST /api/promos`
pub async fn create_promo(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<NewPromoCode>,
) -> Result<(StatusCode, Json<PromoCode>), ApiError> {
    auth.require(Permission::ManagePromos)?;
    let row = promo::create_promo(&state.pool, &body).await.map_err(promo_error_to_api)?;
    Ok((StatusCode::CREATED, Json(row)))
}

#[derive(Deserialize)]
pub struct ToggleBody {
    pub active: bool,
}

/// `PATCH /api/promos/:code`
pub async fn set_active(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(code): Path<String>,
    Json(body): Json<ToggleBody>,
) -> Result<Json<PromoCode>, ApiError> {
    auth.require(Permission::ManagePromos)?;
    let row = promo::set_active(&state.pool, &code, body.active)
        .await
        .map_err(promo_error_to_api)?;
    Ok(Json(row))
}

/// `DELETE /api/promos/:code`
pub async fn delete_promo(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(code): Path<String>,
) -> Result<StatusCode, ApiError> {
    auth.require(Permission::ManagePromos)?;
    promo::delete_promo(&state.pool, &code).await.map_err(promo_error_to_api)?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct RedeemBody {
    pub code: String,
}

/// `POST /api/promos/redeem`: Rate limited per user.
pub async fn redeem(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<RedeemBody>,
) -> Result<Json<Redemption>, ApiError> {
    state
        .rate_limiter
        .check_and_record(RateLimitScope::Redeem, &auth.user.id.to_string())
        .map_err(|e| rate_limit_error_to_api(&e))?;
    let redemption = promo::redeem(&state.pool, auth.user.id, &body.code)
        .await
        .map_err(promo_error_to_api)?;
    Ok(Json(redemption))
}

pub(crate) fn promo_error_to_api(err: PromoError) -> ApiError {
    let status = match &err {
        PromoError::Invalid(_) => StatusCode::BAD_REQUEST,
        PromoError::NotFound | PromoError::UserNotFound(_) => StatusCode::NOT_FOUND,
        PromoError::Duplicate | PromoError::AlreadyRedeemed | PromoError::Exhausted => StatusCode::CONFLICT,
        PromoError::Inactive | PromoError::Expired => StatusCode::GONE,
        PromoError::Disabled => StatusCode::FORBIDDEN,
        PromoError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    ApiError::from_service(status, &err)
}

#[cfg(test)]
#[path = "promos_test.rs"]
mod tests;
