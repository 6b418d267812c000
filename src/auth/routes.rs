//! Authentication routes

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers;

/// Creates and returns the authentication router
///
/// # Routes
/// - `POST /api/auth/line` - LINE Login code exchange and account provisioning
/// - `GET /auth/line` - Redirect to LINE's authorization page
pub fn auth_routes() -> Router {
    Router::new()
        .route("/api/auth/line", post(handlers::line_auth))
        .route("/auth/line", get(handlers::line_login_start))
}
