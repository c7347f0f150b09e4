use super::*;
use crate::error::ErrorCode;

fn entry(user_id: Uuid, rank: i32, kills: i32) -> ResultEntry {
    ResultEntry { user_id, rank, kills }
}

// =============================================================================
// compute_winning
// =============================================================================

#[test]
fn rank_prize_plus_kill_money() {
    let prizes = [300, 200, 100];
    assert_eq!(compute_winning(1, 4, 10, &prizes), 340);
    assert_eq!(compute_winning(3, 0, 10, &prizes), 100);
}

#[test]
fn rank_beyond_table_earns_kills_only() {
    assert_eq!(compute_winning(4, 2, 10, &[300, 200, 100]), 20);
    assert_eq!(compute_winning(1, 2, 10, &[]), 20);
}

#[test]
fn invalid_rank_earns_no_prize() {
    assert_eq!(compute_winning(0, 1, 5, &[100]), 5);
    assert_eq!(compute_winning(-3, 0, 5, &[100]), 0);
}

#[test]
fn negative_inputs_clamp_to_zero() {
    assert_eq!(compute_winning(1, -2, 10, &[50]), 50);
    assert_eq!(compute_winning(1, 2, -10, &[-50]), 0);
}

#[test]
fn large_values_saturate() {
    assert_eq!(compute_winning(1, i32::MAX, i64::MAX, &[1]), i64::MAX);
}

// =============================================================================
// validate_entries
// =============================================================================

#[test]
fn accepts_joined_players_with_unique_ranks() {
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
    let joined = HashSet::from([a, b]);
    assert!(validate_entries(&[entry(a, 1, 3), entry(b, 2, 0)], &joined).is_ok());
}

#[test]
fn partial_result_sets_are_fine() {
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
    let joined = HashSet::from([a, b]);
    assert!(validate_entries(&[entry(b, 1, 0)], &joined).is_ok());
}

#[test]
fn rejects_empty_set() {
    assert!(matches!(validate_entries(&[], &HashSet::new()), Err(ResultsError::Invalid(_))));
}

#[test]
fn rejects_duplicate_rank() {
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
    let joined = HashSet::from([a, b]);
    let err = validate_entries(&[entry(a, 1, 0), entry(b, 1, 0)], &joined).unwrap_err();
    assert!(err.to_string().contains("rank 1"));
}

#[test]
fn rejects_duplicate_player() {
    let a = Uuid::new_v4();
    let joined = HashSet::from([a]);
    assert!(validate_entries(&[entry(a, 1, 0), entry(a, 2, 0)], &joined).is_err());
}

#[test]
fn rejects_player_outside_match() {
    let a = Uuid::new_v4();
    let joined = HashSet::from([a]);
    let stranger = Uuid::new_v4();
    let err = validate_entries(&[entry(stranger, 1, 0)], &joined).unwrap_err();
    assert_eq!(err.error_code(), "E_INVALID_RESULTS");
}

#[test]
fn rejects_zero_rank_and_negative_kills() {
    let a = Uuid::new_v4();
    let joined = HashSet::from([a]);
    assert!(validate_entries(&[entry(a, 0, 0)], &joined).is_err());
    assert!(validate_entries(&[entry(a, 1, -1)], &joined).is_err());
}

#[test]
fn entries_deserialize_with_default_kills() {
    let id = Uuid::new_v4();
    let parsed: ResultEntry = serde_json::from_value(serde_json::json!({ "user_id": id, "rank": 2 })).unwrap();
    assert_eq!(parsed.user_id, id);
    assert_eq!(parsed.kills, 0);
}

#[test]
fn match_errors_convert() {
    let id = Uuid::new_v4();
    assert!(matches!(ResultsError::from(MatchError::NotFound(id)), ResultsError::NotFound(got) if got == id));
    assert_eq!(ResultsError::AlreadyDistributed.error_code(), "E_ALREADY_DISTRIBUTED");
}

// =============================================================================
// ensure_results_open
// =============================================================================

#[test]
fn results_need_a_started_match() {
    assert!(ensure_results_open(MatchType::Ongoing).is_ok());
    assert!(ensure_results_open(MatchType::Results).is_ok());
}

#[test]
fn results_rejected_before_start_or_after_cancel() {
    for match_type in [MatchType::Upcoming, MatchType::Cancelled] {
        let err = ensure_results_open(match_type).unwrap_err();
        assert_eq!(err.error_code(), "E_INVALID_STATE");
        assert!(err.to_string().contains(match_type.as_str()));
    }
}

#[cfg(feature = "live-db-tests")]
mod live {
    use super::*;
    use crate::services::matches::{MatchInput, create_match, join_match, leave_match, set_match_type};

    async fn pool() -> PgPool {
        let url = std::env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL must be set");
        crate::db::init_pool(&url, 2).await.expect("pool")
    }

    fn input() -> MatchInput {
        MatchInput {
            title: "Finals".into(),
            game: String::new(),
            map: String::new(),
            mode: String::new(),
            scheduled_at: None,
            max_players: 4,
            entry_fee: 0,
            per_kill: 5,
            prize_pool: 100,
            rank_prizes: vec![100],
        }
    }

    async fn user(pool: &PgPool) -> Uuid {
        sqlx::query_scalar(
            "INSERT INTO users (email, name, password_hash, referral_code) VALUES ($1, 'w', 'x', $2) RETURNING id",
        )
        .bind(format!("winner-{}@example.com", Uuid::new_v4()))
        .bind(crate::services::referral::generate_referral_code())
        .fetch_one(pool)
        .await
        .expect("user")
    }

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL"]
    async fn results_wait_until_match_starts() {
        let pool = pool().await;
        let m = create_match(&pool, &input()).await.expect("create");
        let player = user(&pool).await;
        join_match(&pool, m.id, player, "Early").await.expect("join");

        let err = submit_results(&pool, m.id, &[entry(player, 1, 0)]).await.unwrap_err();
        assert!(matches!(err, ResultsError::InvalidState(MatchType::Upcoming)));

        // Leaving stays possible and leaves nothing behind to pay out.
        leave_match(&pool, m.id, player).await.expect("leave");
        set_match_type(&pool, m.id, MatchType::Ongoing).await.expect("start");
        assert!(matches!(distribute_winnings(&pool, m.id).await, Err(ResultsError::NoResults)));
        assert!(matches!(
            submit_results(&pool, m.id, &[entry(player, 1, 0)]).await,
            Err(ResultsError::Invalid(_))
        ));
    }

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL"]
    async fn reversal_is_capped_at_current_winnings() {
        let pool = pool().await;
        let m = create_match(&pool, &input()).await.expect("create");
        let player = user(&pool).await;
        join_match(&pool, m.id, player, "Spender").await.expect("join");
        set_match_type(&pool, m.id, MatchType::Ongoing).await.expect("start");
        submit_results(&pool, m.id, &[entry(player, 1, 0)]).await.expect("submit");
        distribute_winnings(&pool, m.id).await.expect("distribute");

        // Player already withdrew most of the prize.
        sqlx::query("UPDATE users SET winnings = 30 WHERE id = $1").bind(player).execute(&pool).await.unwrap();

        let reversal = reverse_winnings(&pool, m.id).await.expect("reverse");
        assert_eq!(reversal.total_reversed, 30);
        assert_eq!(reversal.shortfalls.len(), 1);
        assert_eq!(reversal.shortfalls[0].user_id, player);
        assert_eq!(reversal.shortfalls[0].amount, 70);
        let winnings: i64 = sqlx::query_scalar("SELECT winnings FROM users WHERE id = $1")
            .bind(player)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(winnings, 0);
    }

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL"]
    async fn distribute_once_then_reverse() {
        let url = std::env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL must be set");
        let pool = crate::db::init_pool(&url, 2).await.expect("pool");

        let m = create_match(
            &pool,
            &MatchInput {
                title: "Finals".into(),
                game: String::new(),
                map: String::new(),
                mode: String::new(),
                scheduled_at: None,
                max_players: 4,
                entry_fee: 0,
                per_kill: 5,
                prize_pool: 100,
                rank_prizes: vec![100],
            },
        )
        .await
        .expect("create");

        let user: Uuid = sqlx::query_scalar(
            "INSERT INTO users (email, name, password_hash, referral_code) VALUES ($1, 'w', 'x', $2) RETURNING id",
        )
        .bind(format!("winner-{}@example.com", Uuid::new_v4()))
        .bind(crate::services::referral::generate_referral_code())
        .fetch_one(&pool)
        .await
        .expect("user");
        join_match(&pool, m.id, user, "Winner").await.expect("join");
        set_match_type(&pool, m.id, MatchType::Ongoing).await.expect("start");

        submit_results(&pool, m.id, &[entry(user, 1, 2)]).await.expect("submit");
        let summary = distribute_winnings(&pool, m.id).await.expect("distribute");
        assert_eq!(summary.total_paid, 110);
        assert!(matches!(distribute_winnings(&pool, m.id).await, Err(ResultsError::AlreadyDistributed)));

        let reversal = reverse_winnings(&pool, m.id).await.expect("reverse");
        assert_eq!(reversal.total_reversed, 110);
        assert!(reversal.shortfalls.is_empty());
    }
}
