//! Wallet service: balances, transaction ledger, deposits and withdrawals.
//!
//! DESIGN
//! ======
//! Each user has two balances: `deposit` (spendable on entry fees, never
//! withdrawable) and `winnings` (spendable and withdrawable). Every balance
//! change writes a `transactions` row in the same database transaction, with
//! the user row locked via `SELECT ... FOR UPDATE`, so the ledger and the
//! balances cannot drift apart and concurrent requests serialize per user.
//!
//! Other services (matches, results, promos, referrals) move money through
//! the `pub(crate)` ledger helpers at the bottom of this module rather than
//! issuing their own balance updates.
//!
//! ERROR HANDLING
//! ==============
//! Review operations (approve/reject) lock the transaction row and require
//! `Pending`, so a double click or two staff members racing on the same
//! request resolves to one success and one `InvalidState`.

use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool, Row};
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::is_unique_violation;
use crate::services::notification;
use crate::services::settings::{self, AppSettings};

const RECENT_TRANSACTIONS: i64 = 50;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
    #[error("insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: i64, available: i64 },
    #[error("{0} are currently disabled")]
    Disabled(&'static str),
    #[error("invalid withdrawal details: {0}")]
    InvalidDetails(String),
    #[error("payment reference already used")]
    DuplicateReference,
    #[error("user not found: {0}")]
    UserNotFound(Uuid),
    #[error("transaction not found: {0}")]
    NotFound(Uuid),
    #[error("transaction {id} is {status}, not Pending")]
    InvalidState { id: Uuid, status: TxStatus },
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl crate::error::ErrorCode for WalletError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidAmount(_) => "E_INVALID_AMOUNT",
            Self::InsufficientFunds { .. } => "E_INSUFFICIENT_FUNDS",
            Self::Disabled(_) => "E_DISABLED",
            Self::InvalidDetails(_) => "E_INVALID_DETAILS",
            Self::DuplicateReference => "E_DUPLICATE_REFERENCE",
            Self::UserNotFound(_) | Self::NotFound(_) => "E_NOT_FOUND",
            Self::InvalidState { .. } => "E_INVALID_STATE",
            Self::Database(_) => "E_DATABASE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxKind {
    Deposit,
    Withdrawal,
    Winnings,
    EntryFee,
    Refund,
    Promo,
    Referral,
    Adjustment,
    WinningsReversal,
}

impl TxKind {
    pub const ALL: [Self; 9] = [
        Self::Deposit,
        Self::Withdrawal,
        Self::Winnings,
        Self::EntryFee,
        Self::Refund,
        Self::Promo,
        Self::Referral,
        Self::Adjustment,
        Self::WinningsReversal,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Deposit => "Deposit",
            Self::Withdrawal => "Withdrawal",
            Self::Winnings => "Winnings",
            Self::EntryFee => "EntryFee",
            Self::Refund => "Refund",
            Self::Promo => "Promo",
            Self::Referral => "Referral",
            Self::Adjustment => "Adjustment",
            Self::WinningsReversal => "WinningsReversal",
        }
    }
}

impl TryFrom<String> for TxKind {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == value)
            .ok_or_else(|| format!("unknown transaction kind {value:?}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxStatus {
    Pending,
    Completed,
    Rejected,
}

impl TxStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Completed => "Completed",
            Self::Rejected => "Rejected",
        }
    }
}

impl std::fmt::Display for TxStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for TxStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "Pending" => Ok(Self::Pending),
            "Completed" => Ok(Self::Completed),
            "Rejected" => Ok(Self::Rejected),
            _ => Err(format!("unknown transaction status {value:?}")),
        }
    }
}

/// Which balance a transaction moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletKind {
    Deposit,
    Winnings,
}

impl WalletKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::Winnings => "winnings",
        }
    }
}

impl TryFrom<String> for WalletKind {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "deposit" => Ok(Self::Deposit),
            "winnings" => Ok(Self::Winnings),
            _ => Err(format!("unknown wallet {value:?}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TransactionRow {
    pub id: Uuid,
    pub user_id: Uuid,
    #[sqlx(try_from = "String")]
    pub kind: TxKind,
    #[sqlx(try_from = "String")]
    pub wallet: WalletKind,
    pub amount: i64,
    #[sqlx(try_from = "String")]
    pub status: TxStatus,
    pub reference: Option<String>,
    pub withdrawal_details: Option<serde_json::Value>,
    pub match_id: Option<Uuid>,
    pub note: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Pending request plus who asked, for the staff review queue.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PendingTransaction {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub transaction: TransactionRow,
    pub user_email: String,
    pub user_name: String,
}

#[derive(Debug, Clone, Copy, Serialize, sqlx::FromRow)]
pub struct Balances {
    pub deposit: i64,
    pub winnings: i64,
    pub total_winnings: i64,
}

impl Balances {
    #[must_use]
    pub fn spendable(&self) -> i64 {
        self.deposit.saturating_add(self.winnings)
    }

    #[must_use]
    pub fn get(&self, wallet: WalletKind) -> i64 {
        match wallet {
            WalletKind::Deposit => self.deposit,
            WalletKind::Winnings => self.winnings,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WalletSummary {
    pub balances: Balances,
    pub transactions: Vec<TransactionRow>,
}

/// Where a withdrawal should be paid out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawalDetails {
    pub method: String,
    pub account_name: Option<String>,
    pub account_number: Option<String>,
    pub ifsc: Option<String>,
    pub upi_id: Option<String>,
}

impl WithdrawalDetails {
    /// Require a method and some destination to pay into.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDetails` describing what is missing.
    pub fn validate(&self) -> Result<(), WalletError> {
        if self.method.trim().is_empty() {
            return Err(WalletError::InvalidDetails("method is required".into()));
        }
        let has = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        if !has(&self.upi_id) && !has(&self.account_number) {
            return Err(WalletError::InvalidDetails("upi_id or account_number is required".into()));
        }
        Ok(())
    }
}

// =============================================================================
// PURE RULES
// =============================================================================

/// Split a charge across balances: deposit first, then winnings.
/// Returns `(from_deposit, from_winnings)` or `None` if funds are short.
#[must_use]
pub fn split_charge(amount: i64, deposit: i64, winnings: i64) -> Option<(i64, i64)> {
    if amount <= 0 {
        return Some((0, 0));
    }
    let from_deposit = amount.min(deposit.max(0));
    let from_winnings = amount - from_deposit;
    (from_winnings <= winnings.max(0)).then_some((from_deposit, from_winnings))
}

/// Debit up to `amount` from `balance` without going negative.
/// Returns `(debited, shortfall)`.
#[must_use]
pub fn capped_debit(balance: i64, amount: i64) -> (i64, i64) {
    let debited = amount.min(balance.max(0)).max(0);
    (debited, amount - debited)
}

/// Balance after a staff adjustment of `delta`.
///
/// # Errors
///
/// Rejects a zero or out-of-range delta and any result below zero.
pub fn adjusted_balance(current: i64, delta: i64) -> Result<i64, WalletError> {
    if delta == 0 {
        return Err(WalletError::InvalidAmount("adjustment must be non-zero".into()));
    }
    let next = current
        .checked_add(delta)
        .ok_or_else(|| WalletError::InvalidAmount("adjustment is out of range".into()))?;
    if next < 0 {
        return Err(WalletError::InsufficientFunds { needed: delta.saturating_neg(), available: current });
    }
    Ok(next)
}

/// Validate a withdrawal request against the current winnings and settings.
///
/// # Errors
///
/// Fails when withdrawals are disabled, the amount is outside the configured
/// bounds, or it exceeds the withdrawable balance.
pub fn check_withdrawal(amount: i64, winnings: i64, settings: &AppSettings) -> Result<(), WalletError> {
    if !settings.withdrawals_enabled {
        return Err(WalletError::Disabled("withdrawals"));
    }
    if amount <= 0 {
        return Err(WalletError::InvalidAmount("amount must be positive".into()));
    }
    if amount < settings.min_withdrawal {
        return Err(WalletError::InvalidAmount(format!("minimum withdrawal is {}", settings.min_withdrawal)));
    }
    if amount > settings.max_withdrawal {
        return Err(WalletError::InvalidAmount(format!("maximum withdrawal is {}", settings.max_withdrawal)));
    }
    if amount > winnings {
        return Err(WalletError::InsufficientFunds { needed: amount, available: winnings });
    }
    Ok(())
}

/// Validate a deposit request amount against settings.
///
/// # Errors
///
/// Fails when deposits are disabled or the amount is out of bounds.
pub fn check_deposit(amount: i64, settings: &AppSettings) -> Result<(), WalletError> {
    if !settings.deposits_enabled {
        return Err(WalletError::Disabled("deposits"));
    }
    if amount <= 0 {
        return Err(WalletError::InvalidAmount("amount must be positive".into()));
    }
    if amount < settings.min_deposit || amount > settings.max_deposit {
        return Err(WalletError::InvalidAmount(format!(
            "deposit must be between {} and {}",
            settings.min_deposit, settings.max_deposit
        )));
    }
    Ok(())
}

// =============================================================================
// QUERIES
// =============================================================================

const TRANSACTION_COLUMNS: &str =
    "t.id, t.user_id, t.kind, t.wallet, t.amount, t.status, t.reference, t.withdrawal_details, t.match_id, t.note, t.created_at";

/// Balances plus the most recent ledger entries.
pub async fn wallet_summary(pool: &PgPool, user_id: Uuid) -> Result<WalletSummary, WalletError> {
    let balances = sqlx::query_as::<_, Balances>("SELECT deposit, winnings, total_winnings FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or(WalletError::UserNotFound(user_id))?;
    let transactions = list_transactions(pool, user_id, RECENT_TRANSACTIONS, 0).await?;
    Ok(WalletSummary { balances, transactions })
}

pub async fn list_transactions(
    pool: &PgPool,
    user_id: Uuid,
    limit: i64,
    offset: i64,
) -> Result<Vec<TransactionRow>, WalletError> {
    let rows = sqlx::query_as::<_, TransactionRow>(&format!(
        "SELECT {TRANSACTION_COLUMNS} FROM transactions t
         WHERE t.user_id = $1
         ORDER BY t.created_at DESC
         LIMIT $2 OFFSET $3"
    ))
    .bind(user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Staff review queue for one request kind, oldest first.
pub async fn list_pending(pool: &PgPool, kind: TxKind) -> Result<Vec<PendingTransaction>, WalletError> {
    let rows = sqlx::query_as::<_, PendingTransaction>(&format!(
        "SELECT {TRANSACTION_COLUMNS}, u.email AS user_email, u.name AS user_name
         FROM transactions t
         JOIN users u ON u.id = t.user_id
         WHERE t.kind = $1 AND t.status = 'Pending'
         ORDER BY t.created_at ASC"
    ))
    .bind(kind.as_str())
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

// =============================================================================
// DEPOSITS
// =============================================================================

/// Record a user-submitted deposit awaiting staff verification.
pub async fn request_deposit(pool: &PgPool, user_id: Uuid, amount: i64, reference: &str) -> Result<TransactionRow, WalletError> {
    let reference = reference.trim();
    if reference.is_empty() {
        return Err(WalletError::InvalidDetails("payment reference is required".into()));
    }

    let mut tx = pool.begin().await?;
    let doc = settings::load_in(&mut tx).await.map_err(settings_to_wallet)?;
    check_deposit(amount, &doc.settings)?;

    let entry = NewTransaction::new(user_id, TxKind::Deposit, WalletKind::Deposit, amount, TxStatus::Pending).reference(reference);
    let id = match record(&mut tx, &entry).await {
        Ok(id) => id,
        Err(e) if is_unique_violation(&e) => return Err(WalletError::DuplicateReference),
        Err(e) => return Err(e.into()),
    };
    let row = fetch_transaction(&mut tx, id).await?;
    tx.commit().await?;

    info!(%user_id, transaction_id = %id, amount, "deposit requested");
    Ok(row)
}

/// Approve (credit) or reject a pending deposit.
pub async fn review_deposit(pool: &PgPool, transaction_id: Uuid, approve: bool, note: Option<&str>) -> Result<TransactionRow, WalletError> {
    let mut tx = pool.begin().await?;
    let pending = lock_pending(&mut tx, transaction_id, TxKind::Deposit).await?;

    let status = if approve {
        lock_balances(&mut tx, pending.user_id).await?;
        apply_delta(&mut tx, pending.user_id, WalletKind::Deposit, pending.amount).await?;
        TxStatus::Completed
    } else {
        TxStatus::Rejected
    };
    set_status(&mut tx, transaction_id, status, note).await?;

    let (title, body) = if approve {
        ("Deposit approved", format!("{} has been added to your wallet.", pending.amount))
    } else {
        ("Deposit rejected", format!("Your deposit of {} could not be verified.", pending.amount))
    };
    notification::notify(&mut tx, pending.user_id, title, &body).await?;

    let row = fetch_transaction(&mut tx, transaction_id).await?;
    tx.commit().await?;

    info!(%transaction_id, user_id = %pending.user_id, approve, "deposit reviewed");
    Ok(row)
}

// =============================================================================
// WITHDRAWALS
// =============================================================================

/// Debit winnings and queue a withdrawal for staff payout.
pub async fn request_withdrawal(
    pool: &PgPool,
    user_id: Uuid,
    amount: i64,
    details: &WithdrawalDetails,
) -> Result<TransactionRow, WalletError> {
    details.validate()?;
    let details_json = serde_json::to_value(details).map_err(|e| WalletError::InvalidDetails(e.to_string()))?;

    let mut tx = pool.begin().await?;
    let doc = settings::load_in(&mut tx).await.map_err(settings_to_wallet)?;
    let balances = lock_balances(&mut tx, user_id).await?;
    check_withdrawal(amount, balances.winnings, &doc.settings)?;

    apply_delta(&mut tx, user_id, WalletKind::Winnings, -amount).await?;
    let entry = NewTransaction::new(user_id, TxKind::Withdrawal, WalletKind::Winnings, -amount, TxStatus::Pending)
        .withdrawal_details(&details_json);
    let id = record(&mut tx, &entry).await?;
    let row = fetch_transaction(&mut tx, id).await?;
    tx.commit().await?;

    info!(%user_id, transaction_id = %id, amount, "withdrawal requested");
    Ok(row)
}

/// Mark a pending withdrawal as paid out.
pub async fn approve_withdrawal(pool: &PgPool, transaction_id: Uuid, note: Option<&str>) -> Result<TransactionRow, WalletError> {
    let mut tx = pool.begin().await?;
    let pending = lock_pending(&mut tx, transaction_id, TxKind::Withdrawal).await?;
    set_status(&mut tx, transaction_id, TxStatus::Completed, note).await?;
    notification::notify(
        &mut tx,
        pending.user_id,
        "Withdrawal approved",
        &format!("Your withdrawal of {} has been processed.", -pending.amount),
    )
    .await?;
    let row = fetch_transaction(&mut tx, transaction_id).await?;
    tx.commit().await?;

    info!(%transaction_id, user_id = %pending.user_id, "withdrawal approved");
    Ok(row)
}

/// Reject a pending withdrawal and refund the held winnings.
pub async fn reject_withdrawal(pool: &PgPool, transaction_id: Uuid, reason: Option<&str>) -> Result<TransactionRow, WalletError> {
    let mut tx = pool.begin().await?;
    let pending = lock_pending(&mut tx, transaction_id, TxKind::Withdrawal).await?;
    let refund = -pending.amount;

    lock_balances(&mut tx, pending.user_id).await?;
    apply_delta(&mut tx, pending.user_id, WalletKind::Winnings, refund).await?;
    set_status(&mut tx, transaction_id, TxStatus::Rejected, reason).await?;
    record(
        &mut tx,
        &NewTransaction::completed(pending.user_id, TxKind::Refund, WalletKind::Winnings, refund).note(Some("withdrawal rejected")),
    )
    .await?;

    let body = match reason {
        Some(reason) => format!("Your withdrawal of {refund} was rejected: {reason}. The amount is back in your winnings."),
        None => format!("Your withdrawal of {refund} was rejected. The amount is back in your winnings."),
    };
    notification::notify(&mut tx, pending.user_id, "Withdrawal rejected", &body).await?;

    let row = fetch_transaction(&mut tx, transaction_id).await?;
    tx.commit().await?;

    warn!(%transaction_id, user_id = %pending.user_id, refund, "withdrawal rejected");
    Ok(row)
}

// =============================================================================
// ADJUSTMENTS
// =============================================================================

/// Staff correction of a balance, positive or negative. Balances never go
/// below zero.
pub async fn adjust_balance(
    pool: &PgPool,
    user_id: Uuid,
    wallet: WalletKind,
    delta: i64,
    note: &str,
) -> Result<Balances, WalletError> {
    if delta == 0 {
        return Err(WalletError::InvalidAmount("adjustment must be non-zero".into()));
    }
    if note.trim().is_empty() {
        return Err(WalletError::InvalidDetails("a reason is required".into()));
    }

    let mut tx = pool.begin().await?;
    let balances = lock_balances(&mut tx, user_id).await?;
    adjusted_balance(balances.get(wallet), delta)?;
    apply_delta(&mut tx, user_id, wallet, delta).await?;
    record(&mut tx, &NewTransaction::completed(user_id, TxKind::Adjustment, wallet, delta).note(Some(note.trim()))).await?;
    let updated = lock_balances(&mut tx, user_id).await?;
    tx.commit().await?;

    warn!(%user_id, wallet = wallet.as_str(), delta, "balance adjusted");
    Ok(updated)
}

// =============================================================================
// LEDGER HELPERS
// =============================================================================

/// A ledger row about to be written.
#[derive(Debug, Clone)]
pub(crate) struct NewTransaction<'a> {
    pub user_id: Uuid,
    pub kind: TxKind,
    pub wallet: WalletKind,
    pub amount: i64,
    pub status: TxStatus,
    pub reference: Option<&'a str>,
    pub withdrawal_details: Option<&'a serde_json::Value>,
    pub match_id: Option<Uuid>,
    pub note: Option<&'a str>,
}

impl<'a> NewTransaction<'a> {
    pub fn new(user_id: Uuid, kind: TxKind, wallet: WalletKind, amount: i64, status: TxStatus) -> Self {
        Self {
            user_id,
            kind,
            wallet,
            amount,
            status,
            reference: None,
            withdrawal_details: None,
            match_id: None,
            note: None,
        }
    }

    pub fn completed(user_id: Uuid, kind: TxKind, wallet: WalletKind, amount: i64) -> Self {
        Self::new(user_id, kind, wallet, amount, TxStatus::Completed)
    }

    pub fn reference(mut self, reference: &'a str) -> Self {
        self.reference = Some(reference);
        self
    }

    pub fn withdrawal_details(mut self, details: &'a serde_json::Value) -> Self {
        self.withdrawal_details = Some(details);
        self
    }

    pub fn match_id(mut self, match_id: Uuid) -> Self {
        self.match_id = Some(match_id);
        self
    }

    pub fn note(mut self, note: Option<&'a str>) -> Self {
        self.note = note;
        self
    }
}

/// Insert a ledger row and return its id.
pub(crate) async fn record(conn: &mut PgConnection, entry: &NewTransaction<'_>) -> Result<Uuid, sqlx::Error> {
    sqlx::query_scalar(
        r"INSERT INTO transactions (user_id, kind, wallet, amount, status, reference, withdrawal_details, match_id, note)
          VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
          RETURNING id",
    )
    .bind(entry.user_id)
    .bind(entry.kind.as_str())
    .bind(entry.wallet.as_str())
    .bind(entry.amount)
    .bind(entry.status.as_str())
    .bind(entry.reference)
    .bind(entry.withdrawal_details)
    .bind(entry.match_id)
    .bind(entry.note)
    .fetch_one(&mut *conn)
    .await
}

/// Lock a user row for the rest of the transaction and read its balances.
pub(crate) async fn lock_balances(conn: &mut PgConnection, user_id: Uuid) -> Result<Balances, WalletError> {
    sqlx::query_as::<_, Balances>("SELECT deposit, winnings, total_winnings FROM users WHERE id = $1 FOR UPDATE")
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(WalletError::UserNotFound(user_id))
}

/// Add `delta` to one balance. Callers hold the row lock and have checked
/// the result stays non-negative; the table CHECK constraint backs this up.
pub(crate) async fn apply_delta(conn: &mut PgConnection, user_id: Uuid, wallet: WalletKind, delta: i64) -> Result<(), sqlx::Error> {
    let sql = match wallet {
        WalletKind::Deposit => "UPDATE users SET deposit = deposit + $2 WHERE id = $1",
        WalletKind::Winnings => "UPDATE users SET winnings = winnings + $2 WHERE id = $1",
    };
    sqlx::query(sql).bind(user_id).bind(delta).execute(&mut *conn).await?;
    Ok(())
}

struct PendingRef {
    user_id: Uuid,
    amount: i64,
}

async fn lock_pending(conn: &mut PgConnection, transaction_id: Uuid, kind: TxKind) -> Result<PendingRef, WalletError> {
    let row = sqlx::query("SELECT user_id, amount, status FROM transactions WHERE id = $1 AND kind = $2 FOR UPDATE")
        .bind(transaction_id)
        .bind(kind.as_str())
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(WalletError::NotFound(transaction_id))?;

    let status = TxStatus::try_from(row.get::<String, _>("status")).map_err(|e| sqlx::Error::Decode(e.into()))?;
    if status != TxStatus::Pending {
        return Err(WalletError::InvalidState { id: transaction_id, status });
    }
    Ok(PendingRef { user_id: row.get("user_id"), amount: row.get("amount") })
}

async fn set_status(conn: &mut PgConnection, transaction_id: Uuid, status: TxStatus, note: Option<&str>) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE transactions SET status = $2, note = COALESCE($3, note), updated_at = now() WHERE id = $1")
        .bind(transaction_id)
        .bind(status.as_str())
        .bind(note)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

async fn fetch_transaction(conn: &mut PgConnection, transaction_id: Uuid) -> Result<TransactionRow, sqlx::Error> {
    sqlx::query_as::<_, TransactionRow>(&format!("SELECT {TRANSACTION_COLUMNS} FROM transactions t WHERE t.id = $1"))
        .bind(transaction_id)
        .fetch_one(&mut *conn)
        .await
}

fn settings_to_wallet(err: settings::SettingsError) -> WalletError {
    match err {
        settings::SettingsError::Database(e) => WalletError::Database(e),
        other => WalletError::InvalidDetails(other.to_string()),
    }
}

#[cfg(test)]
#[path = "wallet_test.rs"]
mod tests;
