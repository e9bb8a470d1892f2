//! Role hierarchy guard.
//!
//! Prevents an actor from assigning a role at or above their own rank.
//! Hierarchy is inverted: 0 is the most privileged role.

use thiserror::Error;
use uuid::Uuid;

use super::models::Role;
use crate::db::{RoleStore, StoreError};

/// Request field the role identifier arrives in.
pub const ROLE_FIELD: &str = "role_id";

/// Which rule allowed an assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentGrant {
    /// The target role is the actor's own role.
    SelfAssignment,
    /// The actor sits at the top of the hierarchy and is unrestricted.
    TopOfHierarchy,
    /// The target role ranks strictly below the actor's role.
    LowerRank,
}

/// Target role ranks at or above the actor's role.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("The {field} have a higher hierarchy than the allowed.")]
pub struct HierarchyViolation {
    pub field: &'static str,
    pub actor_hierarchy: i32,
    pub target_hierarchy: i32,
}

/// Errors from [`check_role_assignment`].
#[derive(Debug, Error)]
pub enum RoleAssignmentError {
    #[error("Role not found")]
    NotFound,

    #[error(transparent)]
    Hierarchy(#[from] HierarchyViolation),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Decide whether `actor_role` may hand out `target`.
///
/// The two exemptions are checked before the rank comparison:
/// 1. Self-assignment always passes
/// 2. Hierarchy 0 is unrestricted
/// 3. Otherwise the target must rank strictly lower (greater number)
pub fn ensure_assignable(
    actor_role: &Role,
    target: &Role,
) -> Result<AssignmentGrant, HierarchyViolation> {
    if target.id == actor_role.id {
        return Ok(AssignmentGrant::SelfAssignment);
    }

    if actor_role.is_top() {
        return Ok(AssignmentGrant::TopOfHierarchy);
    }

    if target.hierarchy > actor_role.hierarchy {
        return Ok(AssignmentGrant::LowerRank);
    }

    Err(HierarchyViolation {
        field: ROLE_FIELD,
        actor_hierarchy: actor_role.hierarchy,
        target_hierarchy: target.hierarchy,
    })
}

/// Resolve `target_role_id` and check it against the actor's role.
///
/// Returns the resolved role so the caller can persist the assignment.
#[tracing::instrument(skip(roles, actor_role), fields(actor_role = %actor_role.name))]
pub async fn check_role_assignment(
    roles: &dyn RoleStore,
    actor_role: &Role,
    target_role_id: Uuid,
) -> Result<Role, RoleAssignmentError> {
    let target = roles
        .find_role(target_role_id)
        .await?
        .ok_or(RoleAssignmentError::NotFound)?;

    let grant = ensure_assignable(actor_role, &target)?;
    tracing::debug!(target_role = %target.name, ?grant, "Role assignment allowed");

    Ok(target)
}
