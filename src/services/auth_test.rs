use super::*;
use crate::error::ErrorCode;

#[test]
fn normalize_email_accepts_basic_address() {
    assert_eq!(normalize_email("  Player@Example.com "), Some("player@example.com".to_owned()));
}

#[test]
fn normalize_email_rejects_invalid_values() {
    assert_eq!(normalize_email(""), None);
    assert_eq!(normalize_email("player"), None);
    assert_eq!(normalize_email("@example.com"), None);
    assert_eq!(normalize_email("player@"), None);
    assert_eq!(normalize_email("a@b@c"), None);
}

#[test]
fn name_from_email_uses_local_part() {
    assert_eq!(name_from_email("sniper99@example.com"), "sniper99");
}

#[test]
fn hash_password_verifies() {
    let stored = hash_password("hunter22");
    assert!(verify_password("hunter22", &stored));
    assert!(!verify_password("hunter23", &stored));
}

#[test]
fn hash_password_is_salted() {
    let a = hash_password("same-password");
    let b = hash_password("same-password");
    assert_ne!(a, b);
    assert!(verify_password("same-password", &a));
    assert!(verify_password("same-password", &b));
}

#[test]
fn hash_password_shape() {
    let stored = hash_password("pw123456");
    let (salt, digest) = stored.split_once('$').expect("salt separator");
    assert_eq!(salt.len(), SALT_LEN * 2);
    assert_eq!(digest.len(), 64);
}

#[test]
fn verify_password_rejects_malformed_hash() {
    assert!(!verify_password("pw", "no-separator"));
    assert!(!verify_password("pw", "salt$short"));
    assert!(!verify_password("pw", ""));
}

#[test]
fn constant_time_eq_behaves_like_eq() {
    assert!(constant_time_eq(b"abc", b"abc"));
    assert!(!constant_time_eq(b"abc", b"abd"));
    assert!(!constant_time_eq(b"abc", b"abcd"));
    assert!(constant_time_eq(b"", b""));
}

#[test]
fn auth_error_codes_are_stable() {
    assert_eq!(AuthError::EmailTaken.error_code(), "E_EMAIL_TAKEN");
    assert_eq!(AuthError::InvalidCredentials.error_code(), "E_INVALID_CREDENTIALS");
    assert_eq!(AuthError::Banned.error_code(), "E_BANNED");
    assert_eq!(AuthError::WeakPassword.error_code(), "E_WEAK_PASSWORD");
}

#[test]
fn weak_password_message_names_minimum() {
    assert!(AuthError::WeakPassword.to_string().contains(&MIN_PASSWORD_LEN.to_string()));
}
