//! App settings routes. Reading is open to any client so the apps can
//! check maintenance mode and feature flags before sign-in.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;

use crate::error::ApiError;
use crate::routes::auth::AuthUser;
use crate::services::access::Permission;
use crate::services::settings::{self, SettingsDoc, SettingsError};
use crate::state::AppState;

/// `GET /api/settings`
pub async fn get_settings(State(state): State<AppState>) -> Result<Json<SettingsDoc>, ApiError> {
    let doc = settings::load(&state.pool).await.map_err(settings_error_to_api)?;
    Ok(Json(doc))
}

#[derive(Deserialize)]
pub struct UpdateSettingsBody {
    pub patch: serde_json::Value,
    pub expected_version: Option<i64>,
}

/// `PATCH /api/settings`
pub async fn update_settings(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<UpdateSettingsBody>,
) -> Result<Json<SettingsDoc>, ApiError> {
    auth.require(Permission::ManageSettings)?;
    let doc = settings::update(&state.pool, &body.patch, body.expected_version)
        .await
        .map_err(settings_error_to_api)?;
    tracing::info!(actor = %auth.user.id, version = doc.version, "settings patched");
    Ok(Json(doc))
}

#[derive(Deserialize)]
pub struct BannerLineBody {
    pub line: String,
    pub expected_version: Option<i64>,
}

/// `POST /api/settings/banner-lines`
pub async fn add_banner_line(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<BannerLineBody>,
) -> Result<Json<SettingsDoc>, ApiError> {
    auth.require(Permission::ManageSettings)?;
    let doc = settings::add_banner_line(&state.pool, &body.line, body.expected_version)
        .await
        .map_err(settings_error_to_api)?;
    Ok(Json(doc))
}

#[derive(Deserialize)]
pub struct VersionQuery {
    pub expected_version: Option<i64>,
}

/// `DELETE /api/settings/banner-lines/:index`
pub async fn remove_banner_line(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(index): Path<usize>,
    Query(query): Query<VersionQuery>,
) -> Result<Json<SettingsDoc>, ApiError> {
    auth.require(Permission::ManageSettings)?;
    let doc = settings::remove_banner_line(&state.pool, index, query.expected_version)
        .await
        .map_err(settings_error_to_api)?;
    Ok(Json(doc))
}

pub(crate) fn settings_error_to_api(err: SettingsError) -> ApiError {
    let status = match &err {
        SettingsError::InvalidPatch(_) | SettingsError::LastBannerLine => StatusCode::BAD_REQUEST,
        SettingsError::VersionConflict { .. } => StatusCode::CONFLICT,
        SettingsError::BannerLineNotFound(_) => StatusCode::NOT_FOUND,
        SettingsError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    ApiError::from_service(status, &err)
}

#[cfg(test)]
#[path = "settings_test.rs"]
mod tests;
