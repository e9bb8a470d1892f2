//! Role and capability models.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// CRUD action a capability grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
}

impl Action {
    pub const ALL: [Self; 4] = [Self::Create, Self::Read, Self::Update, Self::Delete];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }

    /// Map the one-letter form used in role definitions (`c`, `r`, `u`, `d`).
    #[must_use]
    pub fn from_abbreviation(abbr: &str) -> Option<Self> {
        match abbr.trim() {
            "c" => Some(Self::Create),
            "r" => Some(Self::Read),
            "u" => Some(Self::Update),
            "d" => Some(Self::Delete),
            _ => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resource type a capability is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Users,
    Posts,
    Roles,
    Quotations,
    Profile,
}

impl ResourceKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Posts => "posts",
            Self::Roles => "roles",
            Self::Quotations => "quotations",
            Self::Profile => "profile",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored permission name for a capability, e.g. `create-posts`.
#[must_use]
pub fn permission_name(action: Action, kind: ResourceKind) -> String {
    format!("{action}-{kind}")
}

/// Role with its hierarchy rank and granted permission names.
///
/// Lower `hierarchy` means more privileged; 0 is the top of the hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    pub hierarchy: i32,
    pub permissions: BTreeSet<String>,
}

impl Role {
    /// Check a raw permission name.
    #[must_use]
    pub fn has_permission(&self, name: &str) -> bool {
        self.permissions.contains(name)
    }

    /// Check whether this role grants `action` on `kind`.
    #[must_use]
    pub fn grants(&self, action: Action, kind: ResourceKind) -> bool {
        self.has_permission(&permission_name(action, kind))
    }

    /// Top-of-hierarchy roles are exempt from assignment restrictions.
    #[must_use]
    pub const fn is_top(&self) -> bool {
        self.hierarchy == 0
    }
}

impl From<&Role> for pb_common::RoleResource {
    fn from(role: &Role) -> Self {
        Self {
            id: role.id,
            name: role.name.clone(),
            hierarchy: role.hierarchy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_name_format() {
        assert_eq!(permission_name(Action::Create, ResourceKind::Posts), "create-posts");
        assert_eq!(permission_name(Action::Read, ResourceKind::Profile), "read-profile");
    }

    #[test]
    fn test_abbreviations() {
        assert_eq!(Action::from_abbreviation("c"), Some(Action::Create));
        assert_eq!(Action::from_abbreviation(" d "), Some(Action::Delete));
        assert_eq!(Action::from_abbreviation("x"), None);
        assert_eq!(Action::from_abbreviation(""), None);
    }

    #[test]
    fn test_role_grants() {
        let role = Role {
            id: Uuid::now_v7(),
            name: "editor".into(),
            hierarchy: 2,
            permissions: ["create-posts".to_string(), "read-profile".to_string()]
                .into_iter()
                .collect(),
        };

        assert!(role.grants(Action::Create, ResourceKind::Posts));
        assert!(!role.grants(Action::Delete, ResourceKind::Posts));
        assert!(!role.is_top());
    }
}
