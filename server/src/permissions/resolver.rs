//! Authorization decisions.
//!
//! Every capability check in the API funnels through [`authorize`].

use uuid::Uuid;

use super::models::{Action, ResourceKind, Role};

/// What an action is performed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    /// The post collection (creating, listing own posts).
    Posts,
    /// A specific post.
    Post { owner_id: Uuid },
    /// The user collection.
    Users,
    /// A specific user account.
    User { id: Uuid },
    /// The role collection.
    Roles,
    /// The caller's own profile.
    Profile,
}

/// Decide whether `actor_id` holding `role` may perform `action` on `resource`.
///
/// Rules:
/// 1. Collections require the matching capability on the role
/// 2. Any post may be read; visibility is enforced by the caller
/// 3. Post owners may update and delete their own posts
/// 4. Users may read and update their own account with the `profile` capability
pub fn authorize(actor_id: Uuid, role: &Role, action: Action, resource: Resource) -> bool {
    match resource {
        Resource::Posts => role.grants(action, ResourceKind::Posts),
        Resource::Users => role.grants(action, ResourceKind::Users),
        Resource::Roles => role.grants(action, ResourceKind::Roles),
        Resource::Profile => role.grants(action, ResourceKind::Profile),
        Resource::Post { owner_id } => match action {
            Action::Read => true,
            Action::Create => role.grants(Action::Create, ResourceKind::Posts),
            Action::Update | Action::Delete => {
                owner_id == actor_id || role.grants(action, ResourceKind::Posts)
            }
        },
        Resource::User { id } => {
            if role.grants(action, ResourceKind::Users) {
                return true;
            }
            id == actor_id
                && matches!(action, Action::Read | Action::Update)
                && role.grants(action, ResourceKind::Profile)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::models::permission_name;

    fn role_with(perms: &[(Action, ResourceKind)]) -> Role {
        Role {
            id: Uuid::now_v7(),
            name: "test".into(),
            hierarchy: 3,
            permissions: perms
                .iter()
                .map(|(a, k)| permission_name(*a, *k))
                .collect(),
        }
    }

    #[test]
    fn test_collection_requires_capability() {
        let actor = Uuid::now_v7();
        let editor = role_with(&[(Action::Create, ResourceKind::Posts)]);
        let basic = role_with(&[(Action::Read, ResourceKind::Profile)]);

        assert!(authorize(actor, &editor, Action::Create, Resource::Posts));
        assert!(!authorize(actor, &basic, Action::Create, Resource::Posts));
        assert!(!authorize(actor, &editor, Action::Read, Resource::Roles));
    }

    #[test]
    fn test_owner_can_update_and_delete_own_post() {
        let owner = Uuid::now_v7();
        let basic = role_with(&[]);
        let post = Resource::Post { owner_id: owner };

        assert!(authorize(owner, &basic, Action::Update, post));
        assert!(authorize(owner, &basic, Action::Delete, post));
    }

    #[test]
    fn test_non_owner_needs_capability() {
        let owner = Uuid::now_v7();
        let other = Uuid::now_v7();
        let basic = role_with(&[]);
        let moderator = role_with(&[
            (Action::Update, ResourceKind::Posts),
            (Action::Delete, ResourceKind::Posts),
        ]);
        let post = Resource::Post { owner_id: owner };

        assert!(!authorize(other, &basic, Action::Update, post));
        assert!(!authorize(other, &basic, Action::Delete, post));
        assert!(authorize(other, &moderator, Action::Update, post));
        assert!(authorize(other, &moderator, Action::Delete, post));
    }

    #[test]
    fn test_self_profile_access() {
        let me = Uuid::now_v7();
        let someone = Uuid::now_v7();
        let basic = role_with(&[
            (Action::Read, ResourceKind::Profile),
            (Action::Update, ResourceKind::Profile),
        ]);

        assert!(authorize(me, &basic, Action::Update, Resource::User { id: me }));
        assert!(!authorize(me, &basic, Action::Delete, Resource::User { id: me }));
        assert!(!authorize(me, &basic, Action::Update, Resource::User { id: someone }));
    }

    #[test]
    fn test_profile_follows_profile_capability() {
        let actor = Uuid::now_v7();
        let basic = role_with(&[(Action::Read, ResourceKind::Profile)]);
        let none = role_with(&[]);

        assert!(authorize(actor, &basic, Action::Read, Resource::Profile));
        assert!(!authorize(actor, &basic, Action::Update, Resource::Profile));
        assert!(!authorize(actor, &none, Action::Read, Resource::Profile));
    }
}
