//! Roles, capabilities and authorization rules.
//!
//! - Capabilities: `{action}-{resource}` names granted through roles
//! - Authorizer: the single decision point for capability and ownership checks
//! - Hierarchy guard: who may hand out which role

pub mod hierarchy;
pub mod models;
pub mod resolver;
pub mod seed;

pub use hierarchy::{
    check_role_assignment, ensure_assignable, AssignmentGrant, HierarchyViolation,
    RoleAssignmentError,
};
pub use models::{permission_name, Action, ResourceKind, Role};
pub use resolver::{authorize, Resource};
pub use seed::{RolesConfig, RolesConfigError, SeedRole};
