//! Authentication handlers

use axum::extract::{Extension, Json};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::models::LineAuthPayload;
use super::provision::provision_account;
use crate::common::{safe_email_log, safe_token_log, ApiError, AppState};

/// POST /api/auth/line
/// Authenticates a user via a LINE Login authorization code
///
/// # Request Body
/// ```json
/// {
///   "code": "<authorization code>",
///   "redirect_uri": "<redirect uri used to obtain the code>"
/// }
/// ```
///
/// # Response
/// ```json
/// {
///   "success": true,
///   "user": {
///     "id": "...",
///     "email": "line_U1234@line.interconnect.app",
///     "display_name": "...",
///     "picture_url": "...",
///     "external_user_id": "U1234",
///     "is_new_user": true
///   }
/// }
/// ```
pub async fn line_auth(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    Json(payload): Json<LineAuthPayload>,
) -> Result<Json<serde_json::Value>, ApiError> {
    info!("🔐 Received LINE auth request");
    let state = state_lock.read().await.clone();

    let code = payload.code.filter(|c| !c.is_empty());
    let redirect_uri = payload.redirect_uri.filter(|r| !r.is_empty());
    let (code, redirect_uri) = match (code, redirect_uri) {
        (Some(code), Some(redirect_uri)) => (code, redirect_uri),
        _ => {
            warn!("LINE auth request missing code or redirect_uri");
            return Err(ApiError::BadRequest(
                "Missing code or redirect_uri".to_string(),
            ));
        }
    };

    // Validate the full configuration up front so a misconfigured deployment
    // fails before any outbound call is made.
    state.line_service.config()?;
    state.user_store.ensure_configured()?;

    let token = state.line_service.exchange_code(&code, &redirect_uri).await?;
    debug!(
        access_token = %safe_token_log(&token.access_token),
        "Token exchange successful, fetching profile"
    );

    let profile = state.line_service.fetch_profile(&token.access_token).await?;
    debug!(
        line_user_id = %profile.user_id,
        display_name = %profile.display_name,
        "LINE profile fetched, resolving account"
    );

    let provisioned = provision_account(state.user_store.as_ref(), &profile).await?;

    info!(
        user_id = %provisioned.user.id,
        email = %safe_email_log(&provisioned.user.email),
        is_new_user = provisioned.is_new_user,
        "User authentication successful via LINE"
    );

    let resp = serde_json::json!({
        "success": true,
        "user": {
            "id": provisioned.user.id,
            "email": provisioned.user.email,
            "display_name": provisioned.user.display_name,
            "picture_url": provisioned.user.avatar_url,
            "external_user_id": provisioned.user.line_user_id,
            "is_new_user": provisioned.is_new_user,
        },
    });

    Ok(Json(resp))
}

/// GET /auth/line - Start LINE Login flow
/// Redirects the browser to LINE's authorization page
pub async fn line_login_start(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
) -> Result<axum::response::Redirect, ApiError> {
    let state = state_lock.read().await;

    let redirect_uri = std::env::var("LINE_REDIRECT_URI")
        .unwrap_or_else(|_| "http://localhost:3000/line-callback.html".to_string());

    let nonce = Uuid::new_v4().to_string();
    let auth_url = state.line_service.authorization_url(&redirect_uri, &nonce)?;

    info!("Redirecting to LINE authorization with redirect_uri: {}", redirect_uri);
    Ok(axum::response::Redirect::to(&auth_url))
}
