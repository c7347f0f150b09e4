//! Wallet routes: balances, deposit and withdrawal requests, staff review.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::routes::auth::AuthUser;
use crate::services::access::Permission;
use crate::services::wallet::{self, PendingTransaction, TransactionRow, TxKind, WalletError, WalletSummary, WithdrawalDetails};
use crate::state::AppState;

const MAX_TRANSACTIONS_PAGE: i64 = 200;

/// `GET /api/wallet`: Balances plus recent transactions.
pub async fn summary(State(state): State<AppState>, auth: AuthUser) -> Result<Json<WalletSummary>, ApiError> {
    let summary = wallet::wallet_summary(&state.pool, auth.user.id)
        .await
        .map_err(wallet_error_to_api)?;
    Ok(Json(summary))
}

#[derive(Deserialize)]
pub struct PageQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// `GET /api/wallet/transactions`
pub async fn transactions(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<PageQuery>,
) -> Result<Json<Vec<TransactionRow>>, ApiError> {
    let limit = query.limit.unwrap_or(50).clamp(1, MAX_TRANSACTIONS_PAGE);
    let offset = query.offset.unwrap_or(0).max(0);
    let rows = wallet::list_transactions(&state.pool, auth.user.id, limit, offset)
        .await
        .map_err(wallet_error_to_api)?;
    Ok(Json(rows))
}

#[derive(Deserialize)]
pub struct DepositBody {
    pub amount: i64,
    pub reference: String,
}

/// `POST /api/wallet/deposits`: Submit a payment reference for review.
pub async fn request_deposit(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<DepositBody>,
) -> Result<(StatusCode, Json<TransactionRow>), ApiError> {
    let row = wallet::request_deposit(&state.pool, auth.user.id, body.amount, &body.reference)
        .await
        .map_err(wallet_error_to_api)?;
    Ok((StatusCode::CREATED, Json(row)))
}

#[derive(Deserialize)]
pub struct WithdrawalBody {
    pub amount: i64,
    pub details: WithdrawalDetails,
}

/// `POST /api/wallet/withdrawals`: Debit winnings and queue a payout.
pub async fn request_withdrawal(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<WithdrawalBody>,
) -> Result<(StatusCode, Json<TransactionRow>), ApiError> {
    let row = wallet::request_withdrawal(&state.pool, auth.user.id, body.amount, &body.details)
        .await
        .map_err(wallet_error_to_api)?;
    Ok((StatusCode::CREATED, Json(row)))
}

#[derive(Deserialize)]
pub struct PendingQuery {
    pub kind: TxKind,
}

/// `GET /api/admin/transactions/pending?kind=Deposit|Withdrawal`
pub async fn list_pending(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<PendingQuery>,
) -> Result<Json<Vec<PendingTransaction>>, ApiError> {
    let permission = match query.kind {
        TxKind::Deposit => Permission::ManageDeposits,
        TxKind::Withdrawal => Permission::ManageWithdrawals,
        _ => return Err(ApiError::bad_request("only Deposit and Withdrawal requests are reviewed")),
    };
    auth.require(permission)?;
    let rows = wallet::list_pending(&state.pool, query.kind)
        .await
        .map_err(wallet_error_to_api)?;
    Ok(Json(rows))
}

#[derive(Deserialize, Default)]
pub struct ReviewBody {
    pub note: Option<String>,
}

/// `POST /api/admin/deposits/:id/approve`
pub async fn approve_deposit(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(tx_id): Path<Uuid>,
    body: Option<Json<ReviewBody>>,
) -> Result<Json<TransactionRow>, ApiError> {
    review_deposit(&state, &auth, tx_id, true, body).await
}

/// `POST /api/admin/deposits/:id/reject`
pub async fn reject_deposit(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(tx_id): Path<Uuid>,
    body: Option<Json<ReviewBody>>,
) -> Result<Json<TransactionRow>, ApiError> {
    review_deposit(&state, &auth, tx_id, false, body).await
}

async fn review_deposit(
    state: &AppState,
    auth: &AuthUser,
    tx_id: Uuid,
    approve: bool,
    body: Option<Json<ReviewBody>>,
) -> Result<Json<TransactionRow>, ApiError> {
    auth.require(Permission::ManageDeposits)?;
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let row = wallet::review_deposit(&state.pool, tx_id, approve, body.note.as_deref())
        .await
        .map_err(wallet_error_to_api)?;
    tracing::info!(actor = %auth.user.id, %tx_id, approve, "deposit reviewed");
    Ok(Json(row))
}

/// `POST /api/admin/withdrawals/:id/approve`
pub async fn approve_withdrawal(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(tx_id): Path<Uuid>,
    body: Option<Json<ReviewBody>>,
) -> Result<Json<TransactionRow>, ApiError> {
    auth.require(Permission::ManageWithdrawals)?;
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let row = wallet::approve_withdrawal(&state.pool, tx_id, body.note.as_deref())
        .await
        .map_err(wallet_error_to_api)?;
    tracing::info!(actor = %auth.user.id, %tx_id, "withdrawal approved");
    Ok(Json(row))
}

/// `POST /api/admin/withdrawals/:id/reject`: Refunds the winnings.
pub async fn reject_withdrawal(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(tx_id): Path<Uuid>,
    body: Option<Json<ReviewBody>>,
) -> Result<Json<TransactionRow>, ApiError> {
    auth.require(Permission::ManageWithdrawals)?;
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let row = wallet::reject_withdrawal(&state.pool, tx_id, body.note.as_deref())
        .await
        .map_err(wallet_error_to_api)?;
    tracing::info!(actor = %auth.user.id, %tx_id, "withdrawal rejected");
    Ok(Json(row))
}

pub(crate) fn wallet_error_to_api(err: WalletError) -> ApiError {
    let status = match &err {
        WalletError::InvalidAmount(_) | WalletError::InvalidDetails(_) => StatusCode::BAD_REQUEST,
        WalletError::InsufficientFunds { .. } => StatusCode::PAYMENT_REQUIRED,
        WalletError::Disabled(_) => StatusCode::FORBIDDEN,
        WalletError::DuplicateReference | WalletError::InvalidState { .. } => StatusCode::CONFLICT,
        WalletError::UserNotFound(_) | WalletError::NotFound(_) => StatusCode::NOT_FOUND,
        WalletError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    ApiError::from_service(status, &err)
}

#[cfg(test)]
#[path = "wallet_test.rs"]
mod tests;
