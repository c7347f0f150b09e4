//! Catalog routes: promotion banners, in-app ads, payment methods.
//!
//! Listing endpoints return active entries to everyone; `?all=true` shows
//! inactive ones too and needs the matching staff permission.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::routes::auth::AuthUser;
use crate::routes::settings::settings_error_to_api;
use crate::services::access::Permission;
use crate::services::catalog::{
    self, AdInput, CatalogError, InAppAd, NewAd, PaymentMethod, PaymentMethodInput, Promotion, PromotionInput,
};
use crate::services::settings;
use crate::state::AppState;

#[derive(Deserialize, Default)]
pub struct ListQuery {
    #[serde(default)]
    pub all: bool,
}

/// Resolve `?all=true` into "active only" after checking the permission.
fn active_only(auth: &AuthUser, query: &ListQuery, permission: Permission) -> Result<bool, ApiError> {
    if query.all {
        auth.require(permission)?;
    }
    Ok(!query.all)
}

// =============================================================================
// PROMOTIONS
// =============================================================================

/// `GET /api/promotions`
pub async fn list_promotions(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Promotion>>, ApiError> {
    let active_only = active_only(&auth, &query, Permission::ManagePromos)?;
    let rows = catalog::list_promotions(&state.pool, active_only)
        .await
        .map_err(catalog_error_to_api)?;
    Ok(Json(rows))
}

/// `POST /api/promotions`
pub async fn create_promotion(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<PromotionInput>,
) -> Result<(StatusCode, Json<Promotion>), ApiError> {
    auth.require(Permission::ManagePromos)?;
    let row = catalog::create_promotion(&state.pool, &body).await.map_err(catalog_error_to_api)?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// `PUT /api/promotions/:id`
pub async fn update_promotion(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<PromotionInput>,
) -> Result<Json<Promotion>, ApiError> {
    auth.require(Permission::ManagePromos)?;
    let row = catalog::update_promotion(&state.pool, id, &body)
        .await
        .map_err(catalog_error_to_api)?;
    Ok(Json(row))
}

/// `DELETE /api/promotions/:id`
pub async fn delete_promotion(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    auth.require(Permission::ManagePromos)?;
    catalog::delete_promotion(&state.pool, id).await.map_err(catalog_error_to_api)?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// IN-APP ADS
// =============================================================================

/// `GET /api/ads`: Empty for users while ads are switched off.
pub async fn list_ads(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<InAppAd>>, ApiError> {
    let active_only = active_only(&auth, &query, Permission::ManagePromos)?;
    if active_only {
        let doc = settings::load(&state.pool).await.map_err(settings_error_to_api)?;
        if !doc.settings.in_app_ads_enabled {
            return Ok(Json(Vec::new()));
        }
    }
    let rows = catalog::list_ads(&state.pool, active_only).await.map_err(catalog_error_to_api)?;
    Ok(Json(rows))
}

/// `POST /api/ads`
pub async fn create_ad(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<NewAd>,
) -> Result<(StatusCode, Json<InAppAd>), ApiError> {
    auth.require(Permission::ManagePromos)?;
    let row = catalog::create_ad(&state.pool, &body).await.map_err(catalog_error_to_api)?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// `PUT /api/ads/:id`
pub async fn update_ad(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
    Json(body): Json<AdInput>,
) -> Result<Json<InAppAd>, ApiError> {
    auth.require(Permission::ManagePromos)?;
    let row = catalog::update_ad(&state.pool, &id, &body).await.map_err(catalog_error_to_api)?;
    Ok(Json(row))
}

/// `DELETE /api/ads/:id`
pub async fn delete_ad(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    auth.require(Permission::ManagePromos)?;
    catalog::delete_ad(&state.pool, &id).await.map_err(catalog_error_to_api)?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// PAYMENT METHODS
// =============================================================================

/// `GET /api/payment-methods`
pub async fn list_payment_methods(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<PaymentMethod>>, ApiError> {
    let active_only = active_only(&auth, &query, Permission::ManageDeposits)?;
    let rows = catalog::list_payment_methods(&state.pool, active_only)
        .await
        .map_err(catalog_error_to_api)?;
    Ok(Json(rows))
}

/// `POST /api/payment-methods`
pub async fn create_payment_method(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<PaymentMethodInput>,
) -> Result<(StatusCode, Json<PaymentMethod>), ApiError> {
    auth.require(Permission::ManageDeposits)?;
    let row = catalog::create_payment_method(&state.pool, &body)
        .await
        .map_err(catalog_error_to_api)?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// `PUT /api/payment-methods/:id`
pub async fn update_payment_method(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<PaymentMethodInput>,
) -> Result<Json<PaymentMethod>, ApiError> {
    auth.require(Permission::ManageDeposits)?;
    let row = catalog::update_payment_method(&state.pool, id, &body)
        .await
        .map_err(catalog_error_to_api)?;
    Ok(Json(row))
}

/// `DELETE /api/payment-methods/:id`
pub async fn delete_payment_method(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    auth.require(Permission::ManageDeposits)?;
    catalog::delete_payment_method(&state.pool, id)
        .await
        .map_err(catalog_error_to_api)?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) fn catalog_error_to_api(err: CatalogError) -> ApiError {
    let status = match &err {
        CatalogError::Invalid(_) => StatusCode::BAD_REQUEST,
        CatalogError::NotFound(_) => StatusCode::NOT_FOUND,
        CatalogError::Conflict(_) => StatusCode::CONFLICT,
        CatalogError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    ApiError::from_service(status, &err)
}

#[cfg(test)]
#[path = "catalog_test.rs"]
mod tests;
