use super::*;

#[test]
fn role_roundtrip_str() {
    for role in [Role::User, Role::Staff, Role::Admin] {
        assert_eq!(Role::from_str(role.as_str()), Some(role));
    }
}

#[test]
fn role_from_str_is_case_sensitive() {
    assert_eq!(Role::from_str("ADMIN"), None);
    assert_eq!(Role::from_str("owner"), None);
    assert_eq!(Role::from_str(""), None);
}

#[test]
fn permission_roundtrip_str() {
    for perm in Permission::ALL {
        assert_eq!(Permission::from_str(perm.as_str()), Some(perm));
    }
}

#[test]
fn permission_serde_matches_as_str() {
    for perm in Permission::ALL {
        let json = serde_json::to_value(perm).unwrap();
        assert_eq!(json.as_str(), Some(perm.as_str()));
    }
}

#[test]
fn permissions_from_json_keeps_only_granted_known_keys() {
    let value = serde_json::json!({
        "manage_users": true,
        "manage_results": false,
        "manage_settings": "yes",
        "launch_rockets": true,
    });
    let perms = permissions_from_json(&value);
    assert_eq!(perms.len(), 1);
    assert!(perms.contains(&Permission::ManageUsers));
}

#[test]
fn permissions_from_json_non_object_is_empty() {
    assert!(permissions_from_json(&serde_json::json!(null)).is_empty());
    assert!(permissions_from_json(&serde_json::json!(["manage_users"])).is_empty());
}

#[test]
fn permissions_json_roundtrip() {
    let perms: BTreeSet<_> = [Permission::ManageDeposits, Permission::ManageWithdrawals].into_iter().collect();
    let json = permissions_to_json(&perms);
    assert_eq!(permissions_from_json(&json), perms);
}

#[test]
fn admin_has_everything() {
    let none = BTreeSet::new();
    for perm in Permission::ALL {
        assert!(has_permission(Role::Admin, &none, perm));
    }
    assert_eq!(effective_permissions(Role::Admin, &none).len(), Permission::ALL.len());
}

#[test]
fn staff_has_only_granted() {
    let granted: BTreeSet<_> = [Permission::ManageResults].into_iter().collect();
    assert!(has_permission(Role::Staff, &granted, Permission::ManageResults));
    assert!(!has_permission(Role::Staff, &granted, Permission::ManageSettings));
    assert_eq!(effective_permissions(Role::Staff, &granted), granted);
}

#[test]
fn user_has_nothing_even_with_stored_grants() {
    let granted: BTreeSet<_> = Permission::ALL.into_iter().collect();
    for perm in Permission::ALL {
        assert!(!has_permission(Role::User, &granted, perm));
    }
    assert!(effective_permissions(Role::User, &granted).is_empty());
}
