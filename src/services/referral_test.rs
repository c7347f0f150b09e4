use super::*;
use crate::error::ErrorCode;

#[test]
fn generated_code_shape() {
    let code = generate_referral_code();
    assert_eq!(code.len(), REFERRAL_CODE_LEN);
    assert!(code.bytes().all(|b| REFERRAL_CODE_ALPHABET.contains(&b)));
}

#[test]
fn generated_code_roundtrips_through_normalize() {
    let code = generate_referral_code();
    assert_eq!(normalize_referral_code(&code), Some(code.clone()));
    assert_eq!(normalize_referral_code(&code.to_ascii_lowercase()), Some(code));
}

#[test]
fn normalize_rejects_bad_shapes() {
    assert_eq!(normalize_referral_code("ABC"), None);
    assert_eq!(normalize_referral_code("ABCDEFGHJ"), None);
    // 0, O, 1 and I are excluded as ambiguous.
    assert_eq!(normalize_referral_code("ABCDEFG0"), None);
    assert_eq!(normalize_referral_code("ABCDEFGI"), None);
    assert_eq!(normalize_referral_code("ABCD-EFG"), None);
}

#[test]
fn normalize_trims_whitespace() {
    assert_eq!(normalize_referral_code("  abcdefgh "), Some("ABCDEFGH".to_owned()));
}

#[test]
fn wallet_errors_convert() {
    let id = Uuid::new_v4();
    assert!(matches!(ReferralError::from(WalletError::UserNotFound(id)), ReferralError::UserNotFound(got) if got == id));
    assert!(matches!(
        ReferralError::from(WalletError::Database(sqlx::Error::RowNotFound)),
        ReferralError::Database(_)
    ));
}

#[test]
fn error_codes_are_stable() {
    assert_eq!(ReferralError::AlreadyClaimed.error_code(), "E_ALREADY_CLAIMED");
    assert_eq!(ReferralError::NotEligible.error_code(), "E_NOT_ELIGIBLE");
    assert_eq!(ReferralError::Disabled.error_code(), "E_DISABLED");
}

#[test]
fn non_storage_failures_stay_out_of_database_variant() {
    let err = ReferralError::from(SettingsError::LastBannerLine);
    assert!(matches!(err, ReferralError::Internal(_)));
    assert_eq!(err.error_code(), "E_INTERNAL");

    let err = ReferralError::from(WalletError::InvalidAmount("negative".into()));
    assert!(matches!(err, ReferralError::Internal(ref msg) if msg.contains("negative")));
}

#[cfg(feature = "live-db-tests")]
mod live {
    use super::*;
    use crate::services::matches::{MatchInput, create_match, join_match};

    async fn pool() -> PgPool {
        let url = std::env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL must be set");
        crate::db::init_pool(&url, 2).await.expect("pool")
    }

    async fn user(pool: &PgPool, referred_by: Option<Uuid>) -> Uuid {
        sqlx::query_scalar(
            r"INSERT INTO users (email, name, password_hash, referral_code, referred_by)
              VALUES ($1, 'r', 'x', $2, $3) RETURNING id",
        )
        .bind(format!("referral-{}@example.com", Uuid::new_v4()))
        .bind(generate_referral_code())
        .bind(referred_by)
        .fetch_one(pool)
        .await
        .expect("insert user")
    }

    async fn deposit(pool: &PgPool, user_id: Uuid) -> i64 {
        sqlx::query_scalar("SELECT deposit FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL"]
    async fn reward_paid_once_after_first_join() {
        let pool = pool().await;
        let referrer = user(&pool, None).await;
        let referee = user(&pool, Some(referrer)).await;

        assert!(matches!(claim_reward(&pool, referee).await, Err(ReferralError::NotEligible)));
        assert!(matches!(claim_reward(&pool, referrer).await, Err(ReferralError::NotReferred)));

        let m = create_match(
            &pool,
            &MatchInput {
                title: "Free entry".into(),
                game: String::new(),
                map: String::new(),
                mode: String::new(),
                scheduled_at: None,
                max_players: 10,
                entry_fee: 0,
                per_kill: 0,
                prize_pool: 0,
                rank_prizes: Vec::new(),
            },
        )
        .await
        .expect("create");
        // Joining claims the reward on the user's behalf.
        join_match(&pool, m.id, referee, "Rookie").await.expect("join");

        let rewards = settings::load(&pool).await.expect("settings").settings;
        assert_eq!(deposit(&pool, referee).await, rewards.referral_reward_referee);
        assert_eq!(deposit(&pool, referrer).await, rewards.referral_reward_referrer);

        assert!(matches!(claim_reward(&pool, referee).await, Err(ReferralError::AlreadyClaimed)));
        let paid: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM transactions WHERE user_id = $1 AND kind = 'Referral'")
            .bind(referee)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(paid, 1);
    }
}
