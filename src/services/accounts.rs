// src/services/accounts.rs
//! Account store client for the hosted user-management API.
//!
//! The store enforces email uniqueness; this client only classifies a
//! constraint violation as a recoverable [`StoreError::Conflict`] so the
//! provisioning flow can fall back to re-resolving the account.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error};

/// Users fetched per page when scanning the admin user list
const LIST_PAGE_SIZE: usize = 200;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Account store not configured")]
    NotConfigured,

    #[error("Account already exists: {0}")]
    Conflict(String),

    #[error("Account store unavailable: {0}")]
    Unavailable(String),

    #[error("Unexpected account store response: {0}")]
    Unexpected(String),
}

/// Local account record held in the account store
#[derive(Debug, Clone, Serialize)]
pub struct StoredUser {
    pub id: String,
    pub email: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub line_user_id: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub last_login_at: Option<DateTime<Utc>>,
}

/// Fields written when creating a new account
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub line_user_id: String,
    pub last_login_at: DateTime<Utc>,
}

/// Metadata overwritten on every successful login
#[derive(Debug, Clone)]
pub struct MetadataUpdate {
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub last_login_at: DateTime<Utc>,
}

/// Seam between the provisioning flow and the hosted account store
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Verify the store credentials are present. Handlers call this before
    /// any upstream request so a misconfigured deployment fails without
    /// making outbound calls.
    fn ensure_configured(&self) -> Result<(), StoreError>;

    /// Exact-match lookup by email. A missing account is `Ok(None)`, not an
    /// error.
    async fn find_by_email(&self, email: &str) -> Result<Option<StoredUser>, StoreError>;

    async fn create(&self, account: NewAccount) -> Result<StoredUser, StoreError>;

    async fn update_metadata(&self, id: &str, update: MetadataUpdate) -> Result<(), StoreError>;
}

// ---- Supabase GoTrue admin implementation ----

/// Admin user record as returned by the GoTrue admin API
#[derive(Debug, Deserialize)]
struct AdminUser {
    id: String,
    email: Option<String>,
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    user_metadata: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct AdminUserList {
    users: Vec<AdminUser>,
}

impl AdminUser {
    fn into_stored(self) -> StoredUser {
        let meta = self.user_metadata;
        let meta_str =
            |key: &str| meta.get(key).and_then(|v| v.as_str()).map(str::to_string);

        let last_login_at = meta_str("last_login_at")
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&Utc));

        StoredUser {
            id: self.id,
            email: self.email.unwrap_or_default(),
            display_name: meta_str("display_name"),
            avatar_url: meta_str("avatar_url"),
            line_user_id: meta_str("line_user_id"),
            created_at: self.created_at,
            last_login_at,
        }
    }
}

/// Classify a failed create call. The store's unique-email constraint shows
/// up as a 409/422 or an "already been registered" message; both are the
/// benign cross-request race, everything else is a hard store failure.
fn classify_create_failure(status: u16, body: &str) -> StoreError {
    if status == 409 || status == 422 || body.contains("already been registered") {
        StoreError::Conflict(format!("HTTP {}: {}", status, body))
    } else {
        StoreError::Unavailable(format!("HTTP {}: {}", status, body))
    }
}

#[derive(Debug, Clone)]
pub struct SupabaseUserStore {
    client: Client,
    base_url: Option<String>,
    service_key: Option<String>,
}

impl SupabaseUserStore {
    pub fn new(client: Client, base_url: Option<String>, service_key: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.map(|u| u.trim_end_matches('/').to_string()),
            service_key,
        }
    }

    fn config(&self) -> Result<(&str, &str), StoreError> {
        match (self.base_url.as_deref(), self.service_key.as_deref()) {
            (Some(url), Some(key)) => Ok((url, key)),
            _ => Err(StoreError::NotConfigured),
        }
    }
}

#[async_trait]
impl UserStore for SupabaseUserStore {
    fn ensure_configured(&self) -> Result<(), StoreError> {
        self.config().map(|_| ())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<StoredUser>, StoreError> {
        let (base_url, service_key) = self.config()?;

        // The admin API pages rather than filters, so scan pages for an
        // exact email match.
        let mut page = 1usize;
        loop {
            let response = self
                .client
                .get(format!("{}/auth/v1/admin/users", base_url))
                .query(&[("page", page), ("per_page", LIST_PAGE_SIZE)])
                .header("apikey", service_key)
                .bearer_auth(service_key)
                .send()
                .await
                .map_err(|e| StoreError::Unavailable(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                let body = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());
                error!(status = %status, error = %body, "Admin user list failed");
                return Err(StoreError::Unavailable(format!(
                    "HTTP {}: {}",
                    status, body
                )));
            }

            let list = response
                .json::<AdminUserList>()
                .await
                .map_err(|e| StoreError::Unexpected(e.to_string()))?;

            let page_len = list.users.len();
            if let Some(user) = list
                .users
                .into_iter()
                .find(|u| u.email.as_deref() == Some(email))
            {
                return Ok(Some(user.into_stored()));
            }

            if page_len < LIST_PAGE_SIZE {
                return Ok(None);
            }
            page += 1;
        }
    }

    async fn create(&self, account: NewAccount) -> Result<StoredUser, StoreError> {
        let (base_url, service_key) = self.config()?;

        // The identity is already verified by the external provider, so the
        // account is created pre-confirmed.
        let body = serde_json::json!({
            "email": account.email,
            "email_confirm": true,
            "user_metadata": {
                "display_name": account.display_name,
                "avatar_url": account.avatar_url,
                "line_user_id": account.line_user_id,
                "provider": "line",
                "last_login_at": account.last_login_at.to_rfc3339(),
            },
        });

        debug!("Creating account in store");

        let response = self
            .client
            .post(format!("{}/auth/v1/admin/users", base_url))
            .header("apikey", service_key)
            .bearer_auth(service_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(classify_create_failure(status.as_u16(), &body));
        }

        let user = response
            .json::<AdminUser>()
            .await
            .map_err(|e| StoreError::Unexpected(e.to_string()))?;

        Ok(user.into_stored())
    }

    async fn update_metadata(&self, id: &str, update: MetadataUpdate) -> Result<(), StoreError> {
        let (base_url, service_key) = self.config()?;

        let body = serde_json::json!({
            "user_metadata": {
                "display_name": update.display_name,
                "avatar_url": update.avatar_url,
                "last_login_at": update.last_login_at.to_rfc3339(),
            },
        });

        let response = self
            .client
            .put(format!("{}/auth/v1/admin/users/{}", base_url, id))
            .header("apikey", service_key)
            .bearer_auth(service_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(StoreError::Unavailable(format!(
                "HTTP {}: {}",
                status, body
            )));
        }

        Ok(())
    }
}
