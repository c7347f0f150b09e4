//! Roles and staff permissions.
//!
//! Admins hold every permission. Staff hold exactly the permissions set to
//! `true` in their stored permissions map; unknown keys in that map are
//! ignored so older rows keep loading after a permission is retired.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Staff,
    Admin,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Staff => "staff",
            Self::Admin => "admin",
        }
    }

    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "user" => Some(Self::User),
            "staff" => Some(Self::Staff),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    ManageUsers,
    ManageMatches,
    ManageResults,
    ManageWithdrawals,
    ManageDeposits,
    ManagePromos,
    ManageNotifications,
    ManageSettings,
}

impl Permission {
    pub const ALL: [Self; 8] = [
        Self::ManageUsers,
        Self::ManageMatches,
        Self::ManageResults,
        Self::ManageWithdrawals,
        Self::ManageDeposits,
        Self::ManagePromos,
        Self::ManageNotifications,
        Self::ManageSettings,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ManageUsers => "manage_users",
            Self::ManageMatches => "manage_matches",
            Self::ManageResults => "manage_results",
            Self::ManageWithdrawals => "manage_withdrawals",
            Self::ManageDeposits => "manage_deposits",
            Self::ManagePromos => "manage_promos",
            Self::ManageNotifications => "manage_notifications",
            Self::ManageSettings => "manage_settings",
        }
    }

    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.as_str() == value)
    }
}

/// Parse a stored `{"manage_users": true, ...}` map into a permission set.
#[must_use]
pub fn permissions_from_json(value: &serde_json::Value) -> BTreeSet<Permission> {
    let Some(map) = value.as_object() else {
        return BTreeSet::new();
    };
    map.iter()
        .filter(|(_, granted)| granted.as_bool() == Some(true))
        .filter_map(|(key, _)| Permission::from_str(key))
        .collect()
}

/// Render a permission set as the stored JSON map (granted keys only).
#[must_use]
pub fn permissions_to_json(perms: &BTreeSet<Permission>) -> serde_json::Value {
    let map = perms
        .iter()
        .map(|p| (p.as_str().to_owned(), serde_json::Value::Bool(true)))
        .collect::<serde_json::Map<_, _>>();
    serde_json::Value::Object(map)
}

/// Effective permissions for a role + stored grants.
#[must_use]
pub fn effective_permissions(role: Role, granted: &BTreeSet<Permission>) -> BTreeSet<Permission> {
    match role {
        Role::Admin => Permission::ALL.into_iter().collect(),
        Role::Staff => granted.clone(),
        Role::User => BTreeSet::new(),
    }
}

#[must_use]
pub fn has_permission(role: Role, granted: &BTreeSet<Permission>, permission: Permission) -> bool {
    match role {
        Role::Admin => true,
        Role::Staff => granted.contains(&permission),
        Role::User => false,
    }
}

#[cfg(test)]
#[path = "access_test.rs"]
mod tests;
