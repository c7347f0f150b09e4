use super::*;

fn small_config() -> RateLimitConfig {
    RateLimitConfig {
        login_limit: 3,
        login_window: Duration::from_secs(60),
        redeem_limit: 2,
        redeem_window: Duration::from_secs(30),
        global_limit: 10,
        global_window: Duration::from_secs(60),
    }
}

#[test]
fn per_key_allows_up_to_limit() {
    let rl = RateLimiter::new(small_config());
    let now = Instant::now();

    for i in 0..3 {
        assert!(
            rl.check_and_record_at(RateLimitScope::Login, "a@example.com", now).is_ok(),
            "attempt {i} should succeed"
        );
    }
    assert!(matches!(
        rl.check_and_record_at(RateLimitScope::Login, "a@example.com", now),
        Err(RateLimitError::PerKeyExceeded { limit: 3, window_secs: 60 })
    ));
}

#[test]
fn scopes_are_counted_separately() {
    let rl = RateLimiter::new(small_config());
    let now = Instant::now();

    for _ in 0..2 {
        rl.check_and_record_at(RateLimitScope::Redeem, "user-1", now).unwrap();
    }
    assert!(rl.check_and_record_at(RateLimitScope::Redeem, "user-1", now).is_err());
    assert!(rl.check_and_record_at(RateLimitScope::Login, "user-1", now).is_ok());
}

#[test]
fn global_limit_spans_keys() {
    let rl = RateLimiter::new(small_config());
    let now = Instant::now();

    for i in 0..10 {
        let key = format!("user-{i}");
        rl.check_and_record_at(RateLimitScope::Login, &key, now).unwrap();
    }
    assert!(matches!(
        rl.check_and_record_at(RateLimitScope::Login, "fresh", now),
        Err(RateLimitError::GlobalExceeded { limit: 10, .. })
    ));
}

#[test]
fn window_expiry_allows_new_requests() {
    let rl = RateLimiter::new(small_config());
    let start = Instant::now();

    for _ in 0..2 {
        rl.check_and_record_at(RateLimitScope::Redeem, "k", start).unwrap();
    }
    assert!(rl.check_and_record_at(RateLimitScope::Redeem, "k", start).is_err());

    let after_window = start + Duration::from_secs(30) + Duration::from_millis(1);
    assert!(rl.check_and_record_at(RateLimitScope::Redeem, "k", after_window).is_ok());
}

#[test]
fn rejected_requests_are_not_recorded() {
    let rl = RateLimiter::new(small_config());
    let start = Instant::now();

    for _ in 0..3 {
        rl.check_and_record_at(RateLimitScope::Login, "k", start).unwrap();
    }
    for _ in 0..5 {
        assert!(rl.check_and_record_at(RateLimitScope::Login, "k", start).is_err());
    }

    let later = start + Duration::from_secs(61);
    for _ in 0..3 {
        assert!(rl.check_and_record_at(RateLimitScope::Login, "k", later).is_ok());
    }
}

#[test]
fn reset_clears_key_window() {
    let rl = RateLimiter::new(small_config());
    let now = Instant::now();

    for _ in 0..3 {
        rl.check_and_record_at(RateLimitScope::Login, "k", now).unwrap();
    }
    assert!(rl.check_and_record_at(RateLimitScope::Login, "k", now).is_err());

    rl.reset(RateLimitScope::Login, "k");
    assert!(rl.check_and_record_at(RateLimitScope::Login, "k", now).is_ok());
}

#[test]
fn distinct_keys_do_not_interfere() {
    let rl = RateLimiter::new(small_config());
    let now = Instant::now();

    for _ in 0..3 {
        rl.check_and_record_at(RateLimitScope::Login, "a", now).unwrap();
    }
    assert!(rl.check_and_record_at(RateLimitScope::Login, "a", now).is_err());
    assert!(rl.check_and_record_at(RateLimitScope::Login, "b", now).is_ok());
}

fn tracked_keys(rl: &RateLimiter) -> usize {
    rl.inner.lock().unwrap().keyed.len()
}

#[test]
fn expired_keys_are_evicted() {
    let rl = RateLimiter::new(small_config());
    let now = Instant::now();

    for key in ["a", "b", "c"] {
        rl.check_and_record_at(RateLimitScope::Login, key, now).unwrap();
    }
    rl.check_and_record_at(RateLimitScope::Redeem, "user-1", now).unwrap();
    assert_eq!(tracked_keys(&rl), 4);

    // Redeem window (30s) has passed, login window (60s) has not.
    let later = now + Duration::from_secs(31);
    rl.check_and_record_at(RateLimitScope::Login, "a", later).unwrap();
    assert_eq!(tracked_keys(&rl), 3);

    let much_later = now + Duration::from_secs(200);
    rl.check_and_record_at(RateLimitScope::Login, "d", much_later).unwrap();
    assert_eq!(tracked_keys(&rl), 1);
}

#[test]
fn many_distinct_failed_logins_do_not_accumulate() {
    let rl = RateLimiter::new(small_config());
    let start = Instant::now();

    for i in 0..5000u64 {
        let at = start + Duration::from_secs(i * 61);
        rl.check_and_record_at(RateLimitScope::Login, &format!("guess-{i}@example.com"), at).unwrap();
    }
    assert!(tracked_keys(&rl) <= 1);
}
