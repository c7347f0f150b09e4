use super::*;
use time::OffsetDateTime;

fn row() -> MatchRow {
    MatchRow {
        id: Uuid::new_v4(),
        title: "Sanhok Duo".into(),
        game: "BGMI".into(),
        map: "Sanhok".into(),
        mode: "Duo".into(),
        scheduled_at: None,
        match_type: MatchType::Ongoing,
        max_players: 40,
        filled_slots: 12,
        entry_fee: 15,
        per_kill: 3,
        prize_pool: 300,
        rank_prizes: vec![150, 100, 50],
        room_id: Some("987654".into()),
        room_password: Some("duo123".into()),
        winnings_distributed: false,
        created_at: OffsetDateTime::UNIX_EPOCH,
    }
}

#[test]
fn view_reveals_for_entitled_viewer() {
    let m = view(row(), true);
    assert_eq!(m.room_id.as_deref(), Some("987654"));
    assert_eq!(m.room_password.as_deref(), Some("duo123"));
}

#[test]
fn view_redacts_for_everyone_else() {
    let m = view(row(), false);
    assert!(m.room_id.is_none());
    assert!(m.room_password.is_none());
}

#[test]
fn list_query_parses_type() {
    let q: ListMatchesQuery = serde_json::from_value(serde_json::json!({ "type": "Upcoming" })).unwrap();
    assert_eq!(q.match_type, Some(MatchType::Upcoming));
    let q: ListMatchesQuery = serde_json::from_value(serde_json::json!({})).unwrap();
    assert!(q.match_type.is_none());
}

#[test]
fn match_errors_map_to_statuses() {
    assert_eq!(match_error_to_api(MatchError::Full).status, StatusCode::CONFLICT);
    assert_eq!(match_error_to_api(MatchError::AlreadyJoined).status, StatusCode::CONFLICT);
    assert_eq!(match_error_to_api(MatchError::NotFound(Uuid::nil())).status, StatusCode::NOT_FOUND);
    assert_eq!(match_error_to_api(MatchError::Banned).status, StatusCode::FORBIDDEN);
    assert_eq!(
        match_error_to_api(MatchError::InsufficientFunds { needed: 15, available: 3 }).status,
        StatusCode::PAYMENT_REQUIRED
    );
}

#[test]
fn results_errors_map_to_statuses() {
    let err = results_error_to_api(ResultsError::AlreadyDistributed);
    assert_eq!(err.status, StatusCode::CONFLICT);
    assert_eq!(err.code, "E_ALREADY_DISTRIBUTED");
    assert_eq!(results_error_to_api(ResultsError::Invalid("rank".into())).status, StatusCode::BAD_REQUEST);
    assert_eq!(results_error_to_api(ResultsError::NoResults).status, StatusCode::BAD_REQUEST);
}

#[test]
fn submit_body_parses_entries() {
    let id = Uuid::new_v4();
    let body: SubmitResultsBody = serde_json::from_value(serde_json::json!({
        "results": [{ "user_id": id, "rank": 1, "kills": 7 }]
    }))
    .unwrap();
    assert_eq!(body.results.len(), 1);
    assert_eq!(body.results[0].kills, 7);
}
