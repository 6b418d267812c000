// src/main.rs
use axum::{extract::Extension, middleware, Router};
use dotenv::dotenv;
use reqwest::Client;
use std::env;
use std::{net::SocketAddr, sync::Arc};
use tokio::{net::TcpListener, sync::RwLock};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod auth;
mod common;
mod logging_middleware;
mod services;

use common::AppState;
use services::{LineService, SupabaseUserStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    // ========================================================================
    // ENVIRONMENT CONFIGURATION
    // ========================================================================

    // Credentials are held as optional values and validated per request, so
    // a misconfigured deployment still boots and answers with a
    // configuration error instead of crashing at startup.
    let line_channel_id = env::var("LINE_CHANNEL_ID").ok();
    let line_channel_secret = env::var("LINE_CHANNEL_SECRET").ok();
    let supabase_url = env::var("SUPABASE_URL").ok();
    let supabase_service_key = env::var("SUPABASE_SERVICE_KEY").ok();

    if line_channel_id.is_none() || line_channel_secret.is_none() {
        tracing::warn!("LINE_CHANNEL_ID / LINE_CHANNEL_SECRET not set, LINE login will fail");
    }
    if supabase_url.is_none() || supabase_service_key.is_none() {
        tracing::warn!("SUPABASE_URL / SUPABASE_SERVICE_KEY not set, account store calls will fail");
    }

    // ========================================================================
    // SERVICE INITIALIZATION
    // ========================================================================

    let http_client = Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()?;

    let line_service = Arc::new(LineService::new(
        http_client.clone(),
        line_channel_id,
        line_channel_secret,
    ));
    info!("LineService initialized");

    let user_store = Arc::new(SupabaseUserStore::new(
        http_client,
        supabase_url,
        supabase_service_key,
    ));
    info!("SupabaseUserStore initialized");

    // ========================================================================
    // APPLICATION STATE
    // ========================================================================

    let app_state = AppState {
        line_service,
        user_store,
    };

    let shared = Arc::new(RwLock::new(app_state));

    // ========================================================================
    // ROUTER COMPOSITION
    // ========================================================================

    let app = Router::new()
        .merge(auth::auth_routes())
        // Add request/response body logging in debug mode
        .layer(middleware::from_fn(logging_middleware::log_request_response))
        .layer(Extension(shared.clone()))
        .layer({
            // Preflight requests from the browser get permissive CORS unless
            // specific origins are configured
            let cors_origins = std::env::var("CORS_ORIGINS").unwrap_or_default();
            if cors_origins.trim().is_empty() || cors_origins.trim() == "*" {
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any)
            } else {
                let origins: Vec<axum::http::HeaderValue> = cors_origins
                    .split(',')
                    .filter_map(|origin| origin.trim().parse().ok())
                    .collect();

                CorsLayer::new()
                    .allow_origin(origins)
                    .allow_methods([
                        axum::http::Method::GET,
                        axum::http::Method::POST,
                        axum::http::Method::OPTIONS,
                    ])
                    .allow_headers([axum::http::header::CONTENT_TYPE])
            }
        })
        .layer(TraceLayer::new_for_http());

    // ========================================================================
    // SERVER STARTUP
    // ========================================================================

    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
