//! Tests for auth module
//!
//! These tests verify core authentication functionality including:
//! - Synthetic email derivation
//! - Account provisioning (first login, repeat login, create race)
//! - Store failure propagation

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::Utc;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;
    use uuid::Uuid;

    use super::super::models::{synthetic_email, LineAuthPayload};
    use super::super::provision::provision_account;
    use crate::services::accounts::{
        MetadataUpdate, NewAccount, StoreError, StoredUser, UserStore,
    };
    use crate::services::line::LineProfile;

    /// In-memory stand-in for the hosted account store.
    ///
    /// `conflict_next_create` simulates the cross-request race: the next
    /// create call behaves as if a concurrent request committed first, so it
    /// inserts the winner's row and reports a unique-email conflict.
    #[derive(Default)]
    struct MockUserStore {
        users: Mutex<HashMap<String, StoredUser>>,
        conflict_next_create: AtomicBool,
        conflict_without_insert: AtomicBool,
        fail_lookup: bool,
        fail_update: bool,
    }

    const RACE_WINNER_ID: &str = "8f7d3a4e-race-winner";

    #[async_trait]
    impl UserStore for MockUserStore {
        fn ensure_configured(&self) -> Result<(), StoreError> {
            Ok(())
        }

        async fn find_by_email(&self, email: &str) -> Result<Option<StoredUser>, StoreError> {
            if self.fail_lookup {
                return Err(StoreError::Unavailable("connection refused".to_string()));
            }
            Ok(self.users.lock().unwrap().get(email).cloned())
        }

        async fn create(&self, account: NewAccount) -> Result<StoredUser, StoreError> {
            if self.conflict_without_insert.swap(false, Ordering::SeqCst) {
                return Err(StoreError::Conflict("already been registered".to_string()));
            }
            if self.conflict_next_create.swap(false, Ordering::SeqCst) {
                let winner = StoredUser {
                    id: RACE_WINNER_ID.to_string(),
                    email: account.email.clone(),
                    display_name: Some("Race Winner".to_string()),
                    avatar_url: None,
                    line_user_id: Some(account.line_user_id.clone()),
                    created_at: Some(Utc::now()),
                    last_login_at: Some(Utc::now()),
                };
                self.users
                    .lock()
                    .unwrap()
                    .insert(account.email.clone(), winner);
                return Err(StoreError::Conflict("already been registered".to_string()));
            }

            let mut users = self.users.lock().unwrap();
            if users.contains_key(&account.email) {
                return Err(StoreError::Conflict("already been registered".to_string()));
            }
            let user = StoredUser {
                id: Uuid::new_v4().to_string(),
                email: account.email.clone(),
                display_name: Some(account.display_name.clone()),
                avatar_url: account.avatar_url.clone(),
                line_user_id: Some(account.line_user_id.clone()),
                created_at: Some(Utc::now()),
                last_login_at: Some(account.last_login_at),
            };
            users.insert(account.email.clone(), user.clone());
            Ok(user)
        }

        async fn update_metadata(
            &self,
            id: &str,
            update: MetadataUpdate,
        ) -> Result<(), StoreError> {
            if self.fail_update {
                return Err(StoreError::Unavailable("connection refused".to_string()));
            }
            let mut users = self.users.lock().unwrap();
            let user = users
                .values_mut()
                .find(|u| u.id == id)
                .ok_or_else(|| StoreError::Unexpected(format!("no user with id {}", id)))?;
            user.display_name = Some(update.display_name);
            user.avatar_url = update.avatar_url;
            user.last_login_at = Some(update.last_login_at);
            Ok(())
        }
    }

    fn line_profile() -> LineProfile {
        LineProfile {
            user_id: "U1234".to_string(),
            display_name: "Taro".to_string(),
            picture_url: Some("https://profile.line-scdn.net/abc".to_string()),
        }
    }

    #[test]
    fn test_synthetic_email_is_deterministic() {
        assert_eq!(synthetic_email("U1234"), synthetic_email("U1234"));
        assert_eq!(synthetic_email("U1234"), "line_U1234@line.interconnect.app");
        assert_ne!(synthetic_email("U1234"), synthetic_email("U5678"));
    }

    #[test]
    fn test_payload_tolerates_missing_fields() {
        let payload: LineAuthPayload = serde_json::from_str("{}").unwrap();
        assert!(payload.code.is_none());
        assert!(payload.redirect_uri.is_none());

        let payload: LineAuthPayload =
            serde_json::from_str(r#"{ "code": "abc", "redirect_uri": "http://x" }"#).unwrap();
        assert_eq!(payload.code.as_deref(), Some("abc"));
        assert_eq!(payload.redirect_uri.as_deref(), Some("http://x"));
    }

    #[tokio::test]
    async fn test_first_login_creates_account() {
        let store = MockUserStore::default();

        let provisioned = provision_account(&store, &line_profile()).await.unwrap();

        assert!(provisioned.is_new_user);
        assert_eq!(provisioned.user.email, "line_U1234@line.interconnect.app");
        assert_eq!(provisioned.user.display_name.as_deref(), Some("Taro"));
        assert_eq!(provisioned.user.line_user_id.as_deref(), Some("U1234"));
        assert_eq!(store.users.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_repeat_login_is_idempotent() {
        let store = MockUserStore::default();

        let first = provision_account(&store, &line_profile()).await.unwrap();
        let second = provision_account(&store, &line_profile()).await.unwrap();

        assert!(first.is_new_user);
        assert!(!second.is_new_user);
        assert_eq!(first.user.id, second.user.id);
        assert_eq!(store.users.lock().unwrap().len(), 1);
        assert!(second.user.last_login_at >= first.user.last_login_at);
    }

    #[tokio::test]
    async fn test_repeat_login_refreshes_metadata() {
        let store = MockUserStore::default();
        provision_account(&store, &line_profile()).await.unwrap();

        let renamed = LineProfile {
            display_name: "Taro (renamed)".to_string(),
            picture_url: None,
            ..line_profile()
        };
        let second = provision_account(&store, &renamed).await.unwrap();

        assert_eq!(second.user.display_name.as_deref(), Some("Taro (renamed)"));
        assert_eq!(second.user.avatar_url, None);
    }

    #[tokio::test]
    async fn test_create_race_resolves_to_single_account() {
        let store = MockUserStore::default();
        store.conflict_next_create.store(true, Ordering::SeqCst);

        let provisioned = provision_account(&store, &line_profile()).await.unwrap();

        // The conflict is swallowed and the caller gets the winner's account
        assert!(!provisioned.is_new_user);
        assert_eq!(provisioned.user.id, RACE_WINNER_ID);
        assert_eq!(store.users.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_conflict_with_vanished_account_is_unexpected() {
        let store = MockUserStore::default();
        store.conflict_without_insert.store(true, Ordering::SeqCst);

        let result = provision_account(&store, &line_profile()).await;

        assert!(matches!(result, Err(StoreError::Unexpected(_))));
    }

    #[tokio::test]
    async fn test_metadata_update_failure_does_not_fail_login() {
        let store = MockUserStore::default();
        provision_account(&store, &line_profile()).await.unwrap();
        let store = MockUserStore {
            users: Mutex::new(store.users.lock().unwrap().clone()),
            fail_update: true,
            ..Default::default()
        };

        let renamed = LineProfile {
            display_name: "Taro (renamed)".to_string(),
            ..line_profile()
        };
        let provisioned = provision_account(&store, &renamed).await.unwrap();

        // Authentication succeeds with the stale metadata
        assert!(!provisioned.is_new_user);
        assert_eq!(provisioned.user.display_name.as_deref(), Some("Taro"));
    }

    #[tokio::test]
    async fn test_lookup_failure_propagates() {
        let store = MockUserStore {
            fail_lookup: true,
            ..Default::default()
        };

        let result = provision_account(&store, &line_profile()).await;

        assert!(matches!(result, Err(StoreError::Unavailable(_))));
    }
}
