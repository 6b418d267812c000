// src/services/line.rs
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::common::safe_token_log;

const TOKEN_ENDPOINT: &str = "https://api.line.me/oauth2/v2.1/token";
const PROFILE_ENDPOINT: &str = "https://api.line.me/v2/profile";
const AUTHORIZE_ENDPOINT: &str = "https://access.line.me/oauth2/v2.1/authorize";

#[derive(Debug, Error)]
pub enum LineError {
    #[error("LINE login not configured")]
    NotConfigured,

    #[error("Token exchange failed: HTTP {status}: {body}")]
    TokenExchange { status: u16, body: String },

    #[error("Profile fetch failed: HTTP {status}: {body}")]
    ProfileFetch { status: u16, body: String },

    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// LINE Login channel credentials resolved from the environment
#[derive(Debug, Clone)]
pub struct LineConfig {
    pub channel_id: String,
    pub channel_secret: String,
}

/// Token response from LINE's token endpoint (standard OAuth 2.0)
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub token_type: Option<String>,
}

/// Profile returned by LINE's profile endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct LineProfile {
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "displayName")]
    pub display_name: String,
    #[serde(rename = "pictureUrl")]
    pub picture_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LineService {
    client: Client,
    channel_id: Option<String>,
    channel_secret: Option<String>,
}

impl LineService {
    pub fn new(client: Client, channel_id: Option<String>, channel_secret: Option<String>) -> Self {
        Self {
            client,
            channel_id,
            channel_secret,
        }
    }

    /// Resolve channel credentials, failing before any network call when the
    /// deployment is missing either value.
    pub fn config(&self) -> Result<LineConfig, LineError> {
        let channel_id = self.channel_id.clone().ok_or(LineError::NotConfigured)?;
        let channel_secret = self
            .channel_secret
            .clone()
            .ok_or(LineError::NotConfigured)?;
        Ok(LineConfig {
            channel_id,
            channel_secret,
        })
    }

    /// Build the LINE authorization URL for the browser redirect
    pub fn authorization_url(&self, redirect_uri: &str, state: &str) -> Result<String, LineError> {
        let config = self.config()?;

        let scope = "profile openid";
        let url = format!(
            "{}?response_type=code&client_id={}&redirect_uri={}&state={}&scope={}",
            AUTHORIZE_ENDPOINT,
            urlencoding::encode(&config.channel_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(state),
            urlencoding::encode(scope)
        );

        debug!("Generated LINE authorization URL");
        Ok(url)
    }

    /// Exchange an authorization code for an access token.
    ///
    /// Authorization codes are single-use, so a failed exchange is terminal:
    /// there is no retry.
    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<TokenResponse, LineError> {
        let config = self.config()?;

        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("client_id", config.channel_id.as_str()),
            ("client_secret", config.channel_secret.as_str()),
        ];

        debug!("Exchanging authorization code for access token");

        let response = self
            .client
            .post(TOKEN_ENDPOINT)
            .form(&params)
            .send()
            .await
            .map_err(|e| LineError::RequestFailed(e.to_string()))?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!(status = %status, error = %error_text, "Token exchange failed");
            return Err(LineError::TokenExchange {
                status: status.as_u16(),
                body: error_text,
            });
        }

        let token_response = response
            .json::<TokenResponse>()
            .await
            .map_err(|e| LineError::Serialization(e.to_string()))?;

        info!(
            access_token = %safe_token_log(&token_response.access_token),
            expires_in = ?token_response.expires_in,
            "Successfully exchanged authorization code for access token"
        );
        Ok(token_response)
    }

    /// Fetch the LINE profile for an access token
    pub async fn fetch_profile(&self, access_token: &str) -> Result<LineProfile, LineError> {
        let response = self
            .client
            .get(PROFILE_ENDPOINT)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| LineError::RequestFailed(e.to_string()))?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!(status = %status, error = %error_text, "Profile fetch failed");
            return Err(LineError::ProfileFetch {
                status: status.as_u16(),
                body: error_text,
            });
        }

        let profile = response
            .json::<LineProfile>()
            .await
            .map_err(|e| LineError::Serialization(e.to_string()))?;

        debug!(line_user_id = %profile.user_id, "Fetched LINE profile");
        Ok(profile)
    }
}
