//! Account resolution and provisioning for LINE identities.
//!
//! Maps an external LINE profile to exactly one local account: look the
//! account up by its synthetic email, create it on first login, refresh its
//! metadata on every subsequent login. Two near-simultaneous first logins
//! can both observe "not found" and race to create; the store's unique-email
//! constraint rejects the loser, which then re-resolves once and proceeds as
//! a returning login instead of failing.

use chrono::Utc;
use tracing::{debug, info, warn};

use super::models::synthetic_email;
use crate::common::safe_email_log;
use crate::services::accounts::{MetadataUpdate, NewAccount, StoreError, StoredUser, UserStore};
use crate::services::line::LineProfile;

/// Outcome of provisioning: the account plus whether this login created it
#[derive(Debug)]
pub struct ProvisionedAccount {
    pub user: StoredUser,
    pub is_new_user: bool,
}

/// Resolve the LINE profile to a local account, creating or refreshing it.
pub async fn provision_account(
    store: &dyn UserStore,
    profile: &LineProfile,
) -> Result<ProvisionedAccount, StoreError> {
    let email = synthetic_email(&profile.user_id);

    match store.find_by_email(&email).await? {
        Some(user) => {
            debug!(
                user_id = %user.id,
                email = %safe_email_log(&email),
                "Found existing account for LINE identity"
            );
            let user = refresh_metadata(store, user, profile).await;
            Ok(ProvisionedAccount {
                user,
                is_new_user: false,
            })
        }
        None => {
            debug!(
                email = %safe_email_log(&email),
                "No existing account, creating one"
            );
            create_account(store, &email, profile).await
        }
    }
}

async fn create_account(
    store: &dyn UserStore,
    email: &str,
    profile: &LineProfile,
) -> Result<ProvisionedAccount, StoreError> {
    let account = NewAccount {
        email: email.to_string(),
        display_name: profile.display_name.clone(),
        avatar_url: profile.picture_url.clone(),
        line_user_id: profile.user_id.clone(),
        last_login_at: Utc::now(),
    };

    match store.create(account).await {
        Ok(user) => {
            info!(
                user_id = %user.id,
                email = %safe_email_log(email),
                "Created new account via LINE login"
            );
            Ok(ProvisionedAccount {
                user,
                is_new_user: true,
            })
        }
        Err(StoreError::Conflict(detail)) => {
            // A concurrent request won the create race. Re-resolve once and
            // continue as a returning login.
            warn!(
                email = %safe_email_log(email),
                detail = %detail,
                "Account already exists, re-resolving"
            );
            match store.find_by_email(email).await? {
                Some(user) => {
                    let user = refresh_metadata(store, user, profile).await;
                    Ok(ProvisionedAccount {
                        user,
                        is_new_user: false,
                    })
                }
                None => Err(StoreError::Unexpected(
                    "account creation conflicted but re-lookup found no account".to_string(),
                )),
            }
        }
        Err(e) => Err(e),
    }
}

/// Overwrite the account's profile metadata with current values.
///
/// A stale display name is an acceptable degraded outcome, being
/// unauthenticated is not, so failures here are logged and swallowed.
async fn refresh_metadata(
    store: &dyn UserStore,
    mut user: StoredUser,
    profile: &LineProfile,
) -> StoredUser {
    let update = MetadataUpdate {
        display_name: profile.display_name.clone(),
        avatar_url: profile.picture_url.clone(),
        last_login_at: Utc::now(),
    };

    match store.update_metadata(&user.id, update.clone()).await {
        Ok(()) => {
            user.display_name = Some(update.display_name);
            user.avatar_url = update.avatar_url;
            user.last_login_at = Some(update.last_login_at);
        }
        Err(e) => {
            warn!(
                user_id = %user.id,
                error = %e,
                "Failed to refresh account metadata, keeping stale values"
            );
        }
    }

    user
}
