//! Match routes: listing, staff CRUD and lifecycle, join/leave, results.

use std::collections::HashSet;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::routes::auth::AuthUser;
use crate::services::access::Permission;
use crate::services::matches::{
    self, DeleteOutcome, JoinReceipt, JoinedMatchDetail, MatchError, MatchInput, MatchPatch, MatchPlayerRow, MatchRow, MatchType,
};
use crate::services::results::{self, DistributionSummary, ResultEntry, ResultRow, ResultsError, ReversalSummary};
use crate::state::AppState;

/// Strip room credentials unless the viewer may see them.
pub(crate) fn view(row: MatchRow, reveal: bool) -> MatchRow {
    if reveal { row } else { row.redacted() }
}

#[derive(Deserialize)]
pub struct ListMatchesQuery {
    #[serde(rename = "type")]
    pub match_type: Option<MatchType>,
}

/// `GET /api/matches?type=Upcoming`
pub async fn list_matches(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ListMatchesQuery>,
) -> Result<Json<Vec<MatchRow>>, ApiError> {
    let rows = matches::list_matches(&state.pool, query.match_type)
        .await
        .map_err(match_error_to_api)?;
    let staff = auth.user.can(Permission::ManageMatches);
    let joined: HashSet<Uuid> = if staff {
        HashSet::new()
    } else {
        matches::joined_matches(&state.pool, auth.user.id)
            .await
            .map_err(match_error_to_api)?
            .into_iter()
            .map(|m| m.match_id)
            .collect()
    };
    let rows = rows
        .into_iter()
        .map(|m| {
            let reveal = staff || joined.contains(&m.id);
            view(m, reveal)
        })
        .collect();
    Ok(Json(rows))
}

/// `GET /api/matches/:id`
pub async fn get_match(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(match_id): Path<Uuid>,
) -> Result<Json<MatchRow>, ApiError> {
    let row = matches::get_match(&state.pool, match_id).await.map_err(match_error_to_api)?;
    let reveal = auth.user.can(Permission::ManageMatches)
        || matches::has_joined(&state.pool, match_id, auth.user.id)
            .await
            .map_err(match_error_to_api)?;
    Ok(Json(view(row, reveal)))
}

/// `POST /api/matches`
pub async fn create_match(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<MatchInput>,
) -> Result<(StatusCode, Json<MatchRow>), ApiError> {
    auth.require(Permission::ManageMatches)?;
    let row = matches::create_match(&state.pool, &body).await.map_err(match_error_to_api)?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// `PATCH /api/matches/:id`
pub async fn update_match(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(match_id): Path<Uuid>,
    Json(body): Json<MatchPatch>,
) -> Result<Json<MatchRow>, ApiError> {
    auth.require(Permission::ManageMatches)?;
    let row = matches::update_match(&state.pool, match_id, &body)
        .await
        .map_err(match_error_to_api)?;
    Ok(Json(row))
}

/// `DELETE /api/matches/:id`: Cancels instead when players have joined.
pub async fn delete_match(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(match_id): Path<Uuid>,
) -> Result<Json<DeleteOutcome>, ApiError> {
    auth.require(Permission::ManageMatches)?;
    let outcome = matches::delete_match(&state.pool, match_id).await.map_err(match_error_to_api)?;
    Ok(Json(outcome))
}

#[derive(Deserialize)]
pub struct SetTypeBody {
    #[serde(rename = "type")]
    pub match_type: MatchType,
}

/// `PUT /api/matches/:id/type`
pub async fn set_type(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(match_id): Path<Uuid>,
    Json(body): Json<SetTypeBody>,
) -> Result<Json<MatchRow>, ApiError> {
    auth.require(Permission::ManageMatches)?;
    let row = matches::set_match_type(&state.pool, match_id, body.match_type)
        .await
        .map_err(match_error_to_api)?;
    Ok(Json(row))
}

#[derive(Deserialize)]
pub struct RoomBody {
    pub room_id: String,
    #[serde(default)]
    pub room_password: String,
}

/// `PUT /api/matches/:id/room`
pub async fn set_room(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(match_id): Path<Uuid>,
    Json(body): Json<RoomBody>,
) -> Result<Json<MatchRow>, ApiError> {
    auth.require(Permission::ManageMatches)?;
    let row = matches::set_room(&state.pool, match_id, &body.room_id, &body.room_password)
        .await
        .map_err(match_error_to_api)?;
    Ok(Json(row))
}

/// `POST /api/matches/:id/cancel`: Cancel and refund every player.
pub async fn cancel_match(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(match_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    auth.require(Permission::ManageMatches)?;
    let refunded = matches::cancel_match(&state.pool, match_id)
        .await
        .map_err(match_error_to_api)?;
    Ok(Json(serde_json::json!({ "ok": true, "refunded": refunded })))
}

/// `GET /api/matches/:id/players`
pub async fn list_players(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(match_id): Path<Uuid>,
) -> Result<Json<Vec<MatchPlayerRow>>, ApiError> {
    auth.require(Permission::ManageMatches)?;
    let rows = matches::list_players(&state.pool, match_id).await.map_err(match_error_to_api)?;
    Ok(Json(rows))
}

#[derive(Deserialize)]
pub struct JoinBody {
    pub in_game_name: String,
}

/// `POST /api/matches/:id/join`
pub async fn join_match(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(match_id): Path<Uuid>,
    Json(body): Json<JoinBody>,
) -> Result<Json<JoinReceipt>, ApiError> {
    let receipt = matches::join_match(&state.pool, match_id, auth.user.id, &body.in_game_name)
        .await
        .map_err(match_error_to_api)?;
    Ok(Json(receipt))
}

/// `POST /api/matches/:id/leave`
pub async fn leave_match(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(match_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    matches::leave_match(&state.pool, match_id, auth.user.id)
        .await
        .map_err(match_error_to_api)?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/me/matches`
pub async fn my_matches(State(state): State<AppState>, auth: AuthUser) -> Result<Json<Vec<JoinedMatchDetail>>, ApiError> {
    let rows = matches::joined_matches(&state.pool, auth.user.id)
        .await
        .map_err(match_error_to_api)?;
    Ok(Json(rows))
}

// =============================================================================
// RESULTS
// =============================================================================

/// `GET /api/matches/:id/results`
pub async fn get_results(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(match_id): Path<Uuid>,
) -> Result<Json<Vec<ResultRow>>, ApiError> {
    let rows = results::get_results(&state.pool, match_id).await.map_err(results_error_to_api)?;
    Ok(Json(rows))
}

#[derive(Deserialize)]
pub struct SubmitResultsBody {
    pub results: Vec<ResultEntry>,
}

/// `PUT /api/matches/:id/results`
pub async fn submit_results(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(match_id): Path<Uuid>,
    Json(body): Json<SubmitResultsBody>,
) -> Result<Json<Vec<ResultRow>>, ApiError> {
    auth.require(Permission::ManageResults)?;
    let rows = results::submit_results(&state.pool, match_id, &body.results)
        .await
        .map_err(results_error_to_api)?;
    Ok(Json(rows))
}

/// `POST /api/matches/:id/distribute`
pub async fn distribute(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(match_id): Path<Uuid>,
) -> Result<Json<DistributionSummary>, ApiError> {
    auth.require(Permission::ManageResults)?;
    let summary = results::distribute_winnings(&state.pool, match_id)
        .await
        .map_err(results_error_to_api)?;
    tracing::info!(actor = %auth.user.id, %match_id, total = summary.total_paid, "distribution requested");
    Ok(Json(summary))
}

/// `POST /api/matches/:id/reverse`
pub async fn reverse(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(match_id): Path<Uuid>,
) -> Result<Json<ReversalSummary>, ApiError> {
    auth.require(Permission::ManageResults)?;
    let summary = results::reverse_winnings(&state.pool, match_id)
        .await
        .map_err(results_error_to_api)?;
    tracing::warn!(actor = %auth.user.id, %match_id, total = summary.total_reversed, "reversal requested");
    Ok(Json(summary))
}

pub(crate) fn match_error_to_api(err: MatchError) -> ApiError {
    let status = match &err {
        MatchError::NotFound(_) | MatchError::UserNotFound(_) => StatusCode::NOT_FOUND,
        MatchError::Invalid(_) => StatusCode::BAD_REQUEST,
        MatchError::InvalidState(..)
        | MatchError::Full
        | MatchError::AlreadyJoined
        | MatchError::NotJoined
        | MatchError::HasPlayers(_) => StatusCode::CONFLICT,
        MatchError::Banned => StatusCode::FORBIDDEN,
        MatchError::InsufficientFunds { .. } => StatusCode::PAYMENT_REQUIRED,
        MatchError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    ApiError::from_service(status, &err)
}

pub(crate) fn results_error_to_api(err: ResultsError) -> ApiError {
    let status = match &err {
        ResultsError::NotFound(_) | ResultsError::UserNotFound(_) => StatusCode::NOT_FOUND,
        ResultsError::Invalid(_) | ResultsError::NoResults => StatusCode::BAD_REQUEST,
        ResultsError::AlreadyDistributed | ResultsError::NotDistributed | ResultsError::InvalidState(_) => {
            StatusCode::CONFLICT
        }
        ResultsError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    ApiError::from_service(status, &err)
}

#[cfg(test)]
#[path = "matches_test.rs"]
mod tests;
