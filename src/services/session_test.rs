use super::*;

// =============================================================================
// bytes_to_hex
// =============================================================================

#[test]
fn bytes_to_hex_empty() {
    assert_eq!(bytes_to_hex(&[]), "");
}

#[test]
fn bytes_to_hex_leading_zero() {
    assert_eq!(bytes_to_hex(&[0x0a]), "0a");
}

#[test]
fn bytes_to_hex_multi_byte() {
    assert_eq!(bytes_to_hex(&[0xde, 0xad, 0xbe, 0xef]), "deadbeef");
}

// =============================================================================
// generate_token
// =============================================================================

#[test]
fn generate_token_is_64_hex_chars() {
    let token = generate_token();
    assert_eq!(token.len(), 64);
    assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn generate_token_two_calls_differ() {
    assert_ne!(generate_token(), generate_token());
}

// =============================================================================
// SessionUser
// =============================================================================

fn session_user(role: Role, permissions: &[Permission]) -> SessionUser {
    SessionUser {
        id: Uuid::new_v4(),
        email: "player@example.com".into(),
        name: "player".into(),
        role,
        permissions: permissions.iter().copied().collect(),
    }
}

#[test]
fn session_user_can_follows_role() {
    let staff = session_user(Role::Staff, &[Permission::ManageWithdrawals]);
    assert!(staff.can(Permission::ManageWithdrawals));
    assert!(!staff.can(Permission::ManageUsers));
    assert!(!staff.is_admin());

    let admin = session_user(Role::Admin, &[]);
    assert!(admin.can(Permission::ManageSettings));
    assert!(admin.is_admin());

    let user = session_user(Role::User, &[Permission::ManageUsers]);
    assert!(!user.can(Permission::ManageUsers));
}

#[test]
fn session_user_serializes_role_and_permissions() {
    let staff = session_user(Role::Staff, &[Permission::ManagePromos]);
    let json = serde_json::to_value(&staff).unwrap();
    assert_eq!(json["role"], "staff");
    assert_eq!(json["permissions"], serde_json::json!(["manage_promos"]));
}
