//! Role structure loaded once at startup.
//!
//! Roles are declared in order: the first role is the top of the hierarchy
//! (0) and each following role ranks one below the previous. Capabilities
//! use the compact `"c,r,u,d"` form per resource.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use super::models::{permission_name, Action, ResourceKind};

/// One role as written in the configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct RoleDefinition {
    pub name: String,
    #[serde(default)]
    pub permissions: BTreeMap<ResourceKind, String>,
}

/// A role ready to be written to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedRole {
    pub name: String,
    pub hierarchy: i32,
    pub permissions: BTreeSet<String>,
}

#[derive(Debug, Error)]
pub enum RolesConfigError {
    #[error("Failed to read roles config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid roles config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Role structure must declare at least one role")]
    Empty,

    #[error("Role name must not be blank")]
    BlankName,

    #[error("Role '{0}' is declared more than once")]
    DuplicateRole(String),

    #[error("Role '{role}' uses unknown action '{abbreviation}' for {resource}")]
    UnknownAction {
        role: String,
        resource: ResourceKind,
        abbreviation: String,
    },
}

/// Immutable role structure shared through application state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RolesConfig {
    roles: Vec<SeedRole>,
}

impl RolesConfig {
    /// Build from ordered definitions, expanding capability abbreviations.
    pub fn from_definitions(definitions: Vec<RoleDefinition>) -> Result<Self, RolesConfigError> {
        if definitions.is_empty() {
            return Err(RolesConfigError::Empty);
        }

        let mut seen = HashSet::new();
        let mut roles = Vec::with_capacity(definitions.len());

        for (hierarchy, definition) in definitions.into_iter().enumerate() {
            let name = definition.name.trim().to_string();
            if name.is_empty() {
                return Err(RolesConfigError::BlankName);
            }
            if !seen.insert(name.clone()) {
                return Err(RolesConfigError::DuplicateRole(name));
            }

            let mut permissions = BTreeSet::new();
            for (resource, actions) in &definition.permissions {
                for abbreviation in actions.split(',').filter(|a| !a.trim().is_empty()) {
                    let action = Action::from_abbreviation(abbreviation).ok_or_else(|| {
                        RolesConfigError::UnknownAction {
                            role: name.clone(),
                            resource: *resource,
                            abbreviation: abbreviation.trim().to_string(),
                        }
                    })?;
                    permissions.insert(permission_name(action, *resource));
                }
            }

            roles.push(SeedRole {
                name,
                hierarchy: hierarchy as i32,
                permissions,
            });
        }

        Ok(Self { roles })
    }

    /// Parse a JSON array of role definitions.
    pub fn from_json(json: &str) -> Result<Self, RolesConfigError> {
        let definitions: Vec<RoleDefinition> = serde_json::from_str(json)?;
        Self::from_definitions(definitions)
    }

    /// Load the role structure from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RolesConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Roles in hierarchy order, top first.
    #[must_use]
    pub fn roles(&self) -> &[SeedRole] {
        &self.roles
    }

    /// Every permission name referenced by any role.
    #[must_use]
    pub fn permission_names(&self) -> BTreeSet<String> {
        self.roles
            .iter()
            .flat_map(|r| r.permissions.iter().cloned())
            .collect()
    }
}

impl Default for RolesConfig {
    /// superadmin > admin > editor > user.
    fn default() -> Self {
        use Action::{Create, Delete, Read, Update};
        use ResourceKind::{Posts, Profile, Quotations, Roles, Users};

        const CRUD: &[Action] = &[Create, Read, Update, Delete];
        const READ_DELETE: &[Action] = &[Read, Delete];
        const READ_UPDATE: &[Action] = &[Read, Update];
        const READ: &[Action] = &[Read];

        let structure: [(&str, &[(ResourceKind, &[Action])]); 4] = [
            (
                "superadmin",
                &[
                    (Users, CRUD),
                    (Posts, CRUD),
                    (Roles, CRUD),
                    (Quotations, READ_DELETE),
                    (Profile, READ_UPDATE),
                ],
            ),
            (
                "admin",
                &[
                    (Users, CRUD),
                    (Posts, CRUD),
                    (Roles, READ),
                    (Quotations, READ_DELETE),
                    (Profile, READ_UPDATE),
                ],
            ),
            ("editor", &[(Posts, CRUD), (Profile, READ_UPDATE)]),
            ("user", &[(Profile, READ_UPDATE)]),
        ];

        let roles = structure
            .iter()
            .enumerate()
            .map(|(hierarchy, (name, grants))| SeedRole {
                name: (*name).to_string(),
                hierarchy: hierarchy as i32,
                permissions: grants
                    .iter()
                    .flat_map(|(kind, actions)| {
                        actions.iter().map(|action| permission_name(*action, *kind))
                    })
                    .collect(),
            })
            .collect();

        Self { roles }
    }
}
