use super::*;

#[test]
fn validate_message_trims() {
    let (title, body) = validate_message("  Room ready ", "\nJoin now\n").unwrap();
    assert_eq!(title, "Room ready");
    assert_eq!(body, "Join now");
}

#[test]
fn validate_message_requires_both_fields() {
    assert!(matches!(validate_message("", "body"), Err(NotificationError::Invalid("title is required"))));
    assert!(matches!(validate_message("title", "   "), Err(NotificationError::Invalid("body is required"))));
}

#[test]
fn validate_message_bounds_length() {
    let long_title = "x".repeat(MAX_TITLE_LEN + 1);
    assert!(validate_message(&long_title, "body").is_err());
    let max_title = "x".repeat(MAX_TITLE_LEN);
    assert!(validate_message(&max_title, "body").is_ok());

    let long_body = "y".repeat(MAX_BODY_LEN + 1);
    assert!(validate_message("title", &long_body).is_err());
}

#[test]
fn validate_message_counts_chars_not_bytes() {
    let title = "é".repeat(MAX_TITLE_LEN);
    assert!(validate_message(&title, "body").is_ok());
}
