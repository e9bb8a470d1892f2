//! User persistence rules.
//!
//! Saving a user clears verification when the email changes and asks for
//! verification while the address is unverified.

use uuid::Uuid;

use super::events::{publish, EventSender, UserEvent};
use crate::api::{ApiError, ApiResult};
use crate::db::{Store, StoreError, User};

/// Profile fields to change. `None` keeps the current value.
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub name: Option<String>,
    pub email: Option<String>,
}

/// Apply `changes` to `user` and persist.
///
/// Emits [`UserEvent::VerificationRequested`] when the email changed or the
/// saved user is still unverified.
#[tracing::instrument(skip(store, events, user, changes), fields(user_id = %user.id))]
pub async fn save_user(
    store: &dyn Store,
    events: &EventSender,
    mut user: User,
    changes: ProfileChanges,
) -> ApiResult<User> {
    if let Some(name) = changes.name {
        user.name = name;
    }

    let email_changed = match changes.email {
        Some(email) if email != user.email => {
            user.email = email;
            user.email_verified_at = None;
            true
        }
        _ => false,
    };

    let saved = store.save_user(&user).await.map_err(|e| match e {
        StoreError::Conflict(_) => ApiError::invalid("email", "The email has already been taken."),
        other => ApiError::Store(other),
    })?;

    if email_changed || !saved.is_verified() {
        publish(
            events,
            UserEvent::VerificationRequested {
                user_id: saved.id,
                email: saved.email.clone(),
            },
        );
    }

    Ok(saved)
}

/// Revoke a user's roles and remove the account.
#[tracing::instrument(skip(store))]
pub async fn delete_user(store: &dyn Store, user_id: Uuid) -> ApiResult<()> {
    if store.delete_user(user_id).await? {
        tracing::info!(%user_id, "User deleted");
        Ok(())
    } else {
        Err(ApiError::NotFound("User"))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use tokio::sync::broadcast::error::TryRecvError;

    use super::*;
    use crate::db::{MemoryStore, NewUser, RoleStore, UserStore};
    use crate::permissions::RolesConfig;
    use crate::users::events;

    async fn verified_user(store: &MemoryStore) -> User {
        store
            .create_user(NewUser {
                name: "Ann".into(),
                email: "ann@example.com".into(),
                password_hash: "hash".into(),
                email_verified_at: Some(Utc::now()),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_email_change_clears_verification_and_emits_once() {
        let store = MemoryStore::new();
        let (tx, mut rx) = events::channel();
        let user = verified_user(&store).await;

        let saved = save_user(
            &store,
            &tx,
            user,
            ProfileChanges {
                name: None,
                email: Some("new@example.com".into()),
            },
        )
        .await
        .unwrap();

        assert_eq!(saved.email, "new@example.com");
        assert!(saved.email_verified_at.is_none());
        assert_eq!(
            rx.try_recv().unwrap(),
            UserEvent::VerificationRequested {
                user_id: saved.id,
                email: "new@example.com".into(),
            }
        );
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn test_name_change_keeps_verification() {
        let store = MemoryStore::new();
        let (tx, mut rx) = events::channel();
        let user = verified_user(&store).await;

        let saved = save_user(
            &store,
            &tx,
            user,
            ProfileChanges {
                name: Some("Annie".into()),
                email: Some("ann@example.com".into()),
            },
        )
        .await
        .unwrap();

        assert_eq!(saved.name, "Annie");
        assert!(saved.is_verified());
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn test_unverified_user_is_reminded_on_save() {
        let store = MemoryStore::new();
        let (tx, mut rx) = events::channel();
        let mut user = verified_user(&store).await;
        user.email_verified_at = None;

        save_user(&store, &tx, user, ProfileChanges::default())
            .await
            .unwrap();

        assert!(rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_duplicate_email_is_validation_error() {
        let store = MemoryStore::new();
        let (tx, _rx) = events::channel();
        let user = verified_user(&store).await;
        store
            .create_user(NewUser {
                name: "Bob".into(),
                email: "bob@example.com".into(),
                password_hash: "hash".into(),
                email_verified_at: None,
            })
            .await
            .unwrap();

        let result = save_user(
            &store,
            &tx,
            user,
            ProfileChanges {
                name: None,
                email: Some("bob@example.com".into()),
            },
        )
        .await;

        assert!(matches!(result, Err(ApiError::ValidationFailed(f)) if f.contains_key("email")));
    }

    #[tokio::test]
    async fn test_delete_revokes_roles() {
        let store = MemoryStore::new();
        let roles = store.seed_roles(&RolesConfig::default()).await.unwrap();
        let user = verified_user(&store).await;
        store.attach_role(user.id, roles[2].id).await.unwrap();

        delete_user(&store, user.id).await.unwrap();

        assert!(store.find_user(user.id).await.unwrap().is_none());
        assert!(store.roles_for_user(user.id).await.unwrap().is_empty());
        assert!(matches!(
            delete_user(&store, user.id).await,
            Err(ApiError::NotFound("User"))
        ));
    }
}
