use super::*;
use crate::error::ErrorCode;
use time::Duration;

fn promo() -> PromoCode {
    PromoCode {
        code: "WELCOME50".into(),
        amount: 50,
        max_uses: 10,
        used_count: 3,
        expires_at: None,
        active: true,
        created_at: OffsetDateTime::UNIX_EPOCH,
    }
}

#[test]
fn normalize_uppercases_and_trims() {
    assert_eq!(normalize_code(" diwali25 ").unwrap(), "DIWALI25");
}

#[test]
fn normalize_enforces_length() {
    assert!(normalize_code("ABC").is_err());
    assert!(normalize_code("ABCD").is_ok());
    assert!(normalize_code(&"A".repeat(20)).is_ok());
    assert!(normalize_code(&"A".repeat(21)).is_err());
}

#[test]
fn normalize_rejects_symbols() {
    assert!(matches!(normalize_code("FREE-100"), Err(PromoError::Invalid(_))));
    assert!(normalize_code("FREE 100").is_err());
    assert!(normalize_code("ÉCOLE1").is_err());
}

#[test]
fn available_promo_has_no_reason() {
    assert!(promo().unavailable_reason(OffsetDateTime::now_utc()).is_none());
}

#[test]
fn inactive_promo_rejected() {
    let mut p = promo();
    p.active = false;
    assert!(matches!(p.unavailable_reason(OffsetDateTime::now_utc()), Some(PromoError::Inactive)));
}

#[test]
fn expired_promo_rejected() {
    let now = OffsetDateTime::now_utc();
    let mut p = promo();
    p.expires_at = Some(now - Duration::hours(1));
    assert!(matches!(p.unavailable_reason(now), Some(PromoError::Expired)));

    p.expires_at = Some(now + Duration::hours(1));
    assert!(p.unavailable_reason(now).is_none());
}

#[test]
fn exhausted_promo_rejected() {
    let mut p = promo();
    p.used_count = p.max_uses;
    let reason = p.unavailable_reason(OffsetDateTime::now_utc()).unwrap();
    assert_eq!(reason.error_code(), "E_PROMO_EXHAUSTED");
}

#[test]
fn new_promo_deserializes_optional_expiry() {
    let input: NewPromoCode =
        serde_json::from_value(serde_json::json!({ "code": "win10", "amount": 10, "max_uses": 100 })).unwrap();
    assert!(input.expires_at.is_none());

    let input: NewPromoCode = serde_json::from_value(serde_json::json!({
        "code": "win10", "amount": 10, "max_uses": 100, "expires_at": "2030-01-01T00:00:00Z"
    }))
    .unwrap();
    assert!(input.expires_at.is_some());
}

#[cfg(feature = "live-db-tests")]
mod live {
    use super::*;

    async fn pool() -> PgPool {
        let url = std::env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL must be set");
        crate::db::init_pool(&url, 2).await.expect("pool")
    }

    async fn user(pool: &PgPool) -> Uuid {
        sqlx::query_scalar(
            "INSERT INTO users (email, name, password_hash, referral_code) VALUES ($1, 'p', 'x', $2) RETURNING id",
        )
        .bind(format!("promo-{}@example.com", Uuid::new_v4()))
        .bind(crate::services::referral::generate_referral_code())
        .fetch_one(pool)
        .await
        .expect("insert user")
    }

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL"]
    async fn redeemed_once_per_user_until_exhausted() {
        let pool = pool().await;
        let code = format!("T{}", &Uuid::new_v4().simple().to_string()[..12]);
        let promo = create_promo(&pool, &NewPromoCode { code, amount: 25, max_uses: 2, expires_at: None })
            .await
            .expect("create");

        let (first, second, third) = (user(&pool).await, user(&pool).await, user(&pool).await);
        let redemption = redeem(&pool, first, &promo.code).await.expect("first redeem");
        assert_eq!((redemption.amount, redemption.deposit), (25, 25));
        assert!(matches!(redeem(&pool, first, &promo.code).await, Err(PromoError::AlreadyRedeemed)));

        redeem(&pool, second, &promo.code).await.expect("second user");
        assert!(matches!(redeem(&pool, third, &promo.code).await, Err(PromoError::Exhausted)));

        let used: i32 = sqlx::query_scalar("SELECT used_count FROM promo_codes WHERE code = $1")
            .bind(&promo.code)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(used, 2);
        let third_deposit: i64 = sqlx::query_scalar("SELECT deposit FROM users WHERE id = $1")
            .bind(third)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(third_deposit, 0);
    }
}
