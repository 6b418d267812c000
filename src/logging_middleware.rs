// src/logging_middleware.rs
//! Middleware for logging request and response bodies in debug mode.
//!
//! Bodies pass through an auth endpoint, so credential-bearing JSON fields
//! are redacted before anything reaches the log.

use axum::body::to_bytes;
use axum::{
    body::Body,
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use serde_json::Value;
use tracing::debug;

/// JSON keys whose values must never appear in logs
const REDACTED_FIELDS: &[&str] = &["code", "access_token", "id_token", "refresh_token"];

fn redact_sensitive(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, val) in map.iter_mut() {
                if REDACTED_FIELDS.contains(&key.as_str()) {
                    *val = Value::String("***".to_string());
                } else {
                    redact_sensitive(val);
                }
            }
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                redact_sensitive(item);
            }
        }
        _ => {}
    }
}

/// Middleware to log request and response bodies in debug mode
pub async fn log_request_response(request: Request, next: Next) -> Result<Response, StatusCode> {
    let (parts, body) = request.into_parts();

    // Read request body
    let bytes = to_bytes(body, usize::MAX)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    // Log request body if not empty
    if !bytes.is_empty() {
        if let Ok(mut json) = serde_json::from_slice::<Value>(&bytes) {
            redact_sensitive(&mut json);
            debug!(
                method = %parts.method,
                uri = %parts.uri,
                request_body = %serde_json::to_string_pretty(&json).unwrap_or_default(),
                "📥 Request"
            );
        } else {
            debug!(
                method = %parts.method,
                uri = %parts.uri,
                request_body_bytes = bytes.len(),
                "📥 Request (non-JSON body not logged)"
            );
        }
    }

    // Reconstruct request
    let request = Request::from_parts(parts, Body::from(bytes));

    // Call next middleware/handler
    let response = next.run(request).await;

    // Extract response parts
    let (parts, body) = response.into_parts();

    // Read response body
    let bytes = to_bytes(body, usize::MAX)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    // Log response body if not empty
    if !bytes.is_empty() {
        if let Ok(mut json) = serde_json::from_slice::<Value>(&bytes) {
            redact_sensitive(&mut json);
            debug!(
                status = %parts.status,
                response_body = %serde_json::to_string_pretty(&json).unwrap_or_default(),
                "📤 Response"
            );
        } else {
            debug!(
                status = %parts.status,
                response_body_bytes = bytes.len(),
                "📤 Response (non-JSON body not logged)"
            );
        }
    }

    // Reconstruct response
    let response = Response::from_parts(parts, Body::from(bytes));

    Ok(response)
}
