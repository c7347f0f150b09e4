use super::*;
use crate::error::ErrorCode;

// =============================================================================
// split_charge
// =============================================================================

#[test]
fn split_charge_prefers_deposit() {
    assert_eq!(split_charge(30, 50, 100), Some((30, 0)));
}

#[test]
fn split_charge_spills_into_winnings() {
    assert_eq!(split_charge(30, 10, 100), Some((10, 20)));
}

#[test]
fn split_charge_exact_total() {
    assert_eq!(split_charge(30, 10, 20), Some((10, 20)));
}

#[test]
fn split_charge_insufficient() {
    assert_eq!(split_charge(31, 10, 20), None);
}

#[test]
fn split_charge_free_entry() {
    assert_eq!(split_charge(0, 0, 0), Some((0, 0)));
}

// =============================================================================
// capped_debit
// =============================================================================

#[test]
fn capped_debit_within_balance() {
    assert_eq!(capped_debit(100, 40), (40, 0));
}

#[test]
fn capped_debit_reports_shortfall() {
    assert_eq!(capped_debit(25, 40), (25, 15));
}

#[test]
fn capped_debit_empty_balance() {
    assert_eq!(capped_debit(0, 40), (0, 40));
}

// =============================================================================
// check_withdrawal / check_deposit
// =============================================================================

fn settings() -> AppSettings {
    AppSettings { min_withdrawal: 50, max_withdrawal: 1000, min_deposit: 10, max_deposit: 500, ..AppSettings::default() }
}

#[test]
fn withdrawal_within_bounds_passes() {
    assert!(check_withdrawal(100, 200, &settings()).is_ok());
}

#[test]
fn withdrawal_below_minimum_rejected() {
    assert!(matches!(check_withdrawal(49, 200, &settings()), Err(WalletError::InvalidAmount(_))));
}

#[test]
fn withdrawal_above_maximum_rejected() {
    assert!(matches!(check_withdrawal(1001, 5000, &settings()), Err(WalletError::InvalidAmount(_))));
}

#[test]
fn withdrawal_beyond_winnings_rejected() {
    assert!(matches!(
        check_withdrawal(300, 200, &settings()),
        Err(WalletError::InsufficientFunds { needed: 300, available: 200 })
    ));
}

#[test]
fn withdrawal_disabled_rejected_first() {
    let disabled = AppSettings { withdrawals_enabled: false, ..settings() };
    assert!(matches!(check_withdrawal(100, 200, &disabled), Err(WalletError::Disabled("withdrawals"))));
}

#[test]
fn withdrawal_non_positive_rejected() {
    assert!(matches!(check_withdrawal(0, 200, &settings()), Err(WalletError::InvalidAmount(_))));
    assert!(matches!(check_withdrawal(-5, 200, &settings()), Err(WalletError::InvalidAmount(_))));
}

#[test]
fn deposit_bounds() {
    assert!(check_deposit(10, &settings()).is_ok());
    assert!(check_deposit(500, &settings()).is_ok());
    assert!(check_deposit(9, &settings()).is_err());
    assert!(check_deposit(501, &settings()).is_err());
    let disabled = AppSettings { deposits_enabled: false, ..settings() };
    assert!(matches!(check_deposit(100, &disabled), Err(WalletError::Disabled("deposits"))));
}

// =============================================================================
// WithdrawalDetails
// =============================================================================

fn details(method: &str, upi: Option<&str>, account: Option<&str>) -> WithdrawalDetails {
    WithdrawalDetails {
        method: method.into(),
        account_name: None,
        account_number: account.map(Into::into),
        ifsc: None,
        upi_id: upi.map(Into::into),
    }
}

#[test]
fn withdrawal_details_need_destination() {
    assert!(details("upi", Some("player@bank"), None).validate().is_ok());
    assert!(details("bank", None, Some("123456789")).validate().is_ok());
    assert!(details("upi", Some("  "), None).validate().is_err());
    assert!(details("upi", None, None).validate().is_err());
    assert!(details(" ", Some("player@bank"), None).validate().is_err());
}

// =============================================================================
// enums + codes
// =============================================================================

#[test]
fn tx_kind_roundtrip() {
    for kind in TxKind::ALL {
        assert_eq!(TxKind::try_from(kind.as_str().to_owned()), Ok(kind));
        let json = serde_json::to_value(kind).unwrap();
        assert_eq!(json.as_str(), Some(kind.as_str()));
    }
    assert!(TxKind::try_from("Bonus".to_owned()).is_err());
}

#[test]
fn tx_status_roundtrip() {
    for status in [TxStatus::Pending, TxStatus::Completed, TxStatus::Rejected] {
        assert_eq!(TxStatus::try_from(status.as_str().to_owned()), Ok(status));
    }
    assert!(TxStatus::try_from("pending".to_owned()).is_err());
}

#[test]
fn wallet_kind_roundtrip() {
    for wallet in [WalletKind::Deposit, WalletKind::Winnings] {
        assert_eq!(WalletKind::try_from(wallet.as_str().to_owned()), Ok(wallet));
        assert_eq!(serde_json::to_value(wallet).unwrap().as_str(), Some(wallet.as_str()));
    }
}

#[test]
fn balances_helpers() {
    let b = Balances { deposit: 30, winnings: 70, total_winnings: 500 };
    assert_eq!(b.spendable(), 100);
    assert_eq!(b.get(WalletKind::Deposit), 30);
    assert_eq!(b.get(WalletKind::Winnings), 70);
}

#[test]
fn error_codes_are_stable() {
    assert_eq!(
        WalletError::InsufficientFunds { needed: 1, available: 0 }.error_code(),
        "E_INSUFFICIENT_FUNDS"
    );
    assert_eq!(
        WalletError::InvalidState { id: Uuid::nil(), status: TxStatus::Completed }.error_code(),
        "E_INVALID_STATE"
    );
    assert_eq!(WalletError::DuplicateReference.error_code(), "E_DUPLICATE_REFERENCE");
}

#[test]
fn invalid_state_message_names_status() {
    let err = WalletError::InvalidState { id: Uuid::nil(), status: TxStatus::Rejected };
    assert!(err.to_string().contains("Rejected"));
}

// =============================================================================
// adjusted_balance
// =============================================================================

#[test]
fn adjustment_moves_balance_both_ways() {
    assert_eq!(adjusted_balance(100, 25).unwrap(), 125);
    assert_eq!(adjusted_balance(100, -100).unwrap(), 0);
}

#[test]
fn adjustment_below_zero_reports_shortfall() {
    let err = adjusted_balance(40, -50).unwrap_err();
    assert!(matches!(err, WalletError::InsufficientFunds { needed: 50, available: 40 }));
}

#[test]
fn adjustment_extremes_do_not_overflow() {
    let err = adjusted_balance(1, i64::MAX).unwrap_err();
    assert_eq!(err.error_code(), "E_INVALID_AMOUNT");

    let err = adjusted_balance(0, i64::MIN).unwrap_err();
    assert!(matches!(err, WalletError::InsufficientFunds { needed: i64::MAX, available: 0 }));

    assert_eq!(adjusted_balance(i64::MAX, i64::MIN).unwrap_err().error_code(), "E_INSUFFICIENT_FUNDS");
}

#[test]
fn zero_adjustment_rejected() {
    assert_eq!(adjusted_balance(10, 0).unwrap_err().error_code(), "E_INVALID_AMOUNT");
}

#[cfg(feature = "live-db-tests")]
mod live {
    use super::*;

    async fn pool() -> PgPool {
        let url = std::env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL must be set");
        crate::db::init_pool(&url, 2).await.expect("pool")
    }

    async fn user_with(pool: &PgPool, deposit: i64, winnings: i64) -> Uuid {
        sqlx::query_scalar(
            r"INSERT INTO users (email, name, password_hash, referral_code, deposit, winnings)
              VALUES ($1, 'w', 'x', $2, $3, $4) RETURNING id",
        )
        .bind(format!("wallet-{}@example.com", Uuid::new_v4()))
        .bind(crate::services::referral::generate_referral_code())
        .bind(deposit)
        .bind(winnings)
        .fetch_one(pool)
        .await
        .expect("insert user")
    }

    async fn balances(pool: &PgPool, user_id: Uuid) -> Balances {
        wallet_summary(pool, user_id).await.expect("summary").balances
    }

    fn upi() -> WithdrawalDetails {
        WithdrawalDetails {
            method: "upi".into(),
            account_name: None,
            account_number: None,
            ifsc: None,
            upi_id: Some("player@upi".into()),
        }
    }

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL"]
    async fn withdrawal_debits_now_and_rejection_refunds() {
        let pool = pool().await;
        let user = user_with(&pool, 0, 200).await;

        let pending = request_withdrawal(&pool, user, 100, &upi()).await.expect("request");
        assert_eq!(pending.status, TxStatus::Pending);
        assert_eq!(pending.amount, -100);
        assert_eq!(balances(&pool, user).await.winnings, 100);

        let rejected = reject_withdrawal(&pool, pending.id, Some("wrong UPI")).await.expect("reject");
        assert_eq!(rejected.status, TxStatus::Rejected);
        assert_eq!(balances(&pool, user).await.winnings, 200);

        let refunds: Vec<i64> =
            sqlx::query_scalar("SELECT amount FROM transactions WHERE user_id = $1 AND kind = 'Refund'")
                .bind(user)
                .fetch_all(&pool)
                .await
                .unwrap();
        assert_eq!(refunds, vec![100]);

        assert!(matches!(reject_withdrawal(&pool, pending.id, None).await, Err(WalletError::InvalidState { .. })));
        assert!(matches!(approve_withdrawal(&pool, pending.id, None).await, Err(WalletError::InvalidState { .. })));
        assert_eq!(balances(&pool, user).await.winnings, 200);
    }

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL"]
    async fn approved_withdrawal_cannot_be_reviewed_again() {
        let pool = pool().await;
        let user = user_with(&pool, 0, 80).await;
        let pending = request_withdrawal(&pool, user, 60, &upi()).await.expect("request");

        assert_eq!(approve_withdrawal(&pool, pending.id, None).await.expect("approve").status, TxStatus::Completed);
        assert!(matches!(reject_withdrawal(&pool, pending.id, None).await, Err(WalletError::InvalidState { .. })));
        assert_eq!(balances(&pool, user).await.winnings, 20);
    }

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL"]
    async fn deposit_reference_is_single_use_and_reviewed_once() {
        let pool = pool().await;
        let user = user_with(&pool, 0, 0).await;
        let other = user_with(&pool, 0, 0).await;
        let reference = format!("UTR{}", Uuid::new_v4().simple());

        let pending = request_deposit(&pool, user, 500, &reference).await.expect("request");
        assert!(matches!(
            request_deposit(&pool, other, 500, &reference).await,
            Err(WalletError::DuplicateReference)
        ));

        review_deposit(&pool, pending.id, true, None).await.expect("approve");
        assert_eq!(balances(&pool, user).await.deposit, 500);
        assert!(matches!(review_deposit(&pool, pending.id, true, None).await, Err(WalletError::InvalidState { .. })));
        assert!(matches!(review_deposit(&pool, pending.id, false, None).await, Err(WalletError::InvalidState { .. })));
        assert_eq!(balances(&pool, user).await.deposit, 500);
    }
}
