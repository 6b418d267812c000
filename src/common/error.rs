// Error handling types for the API

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use std::fmt;
use tracing::error;

use crate::services::accounts::StoreError;
use crate::services::line::LineError;

/// API error types
#[derive(Debug)]
pub enum ApiError {
    /// Malformed or incomplete request body
    BadRequest(String),
    /// The identity provider rejected the code or token. Authorization codes
    /// are single-use, so these are never retried.
    UpstreamAuth {
        message: String,
        details: Option<String>,
    },
    /// Required deployment configuration is missing
    Configuration(String),
    /// The account store is unreachable or returned an error
    StoreUnavailable {
        message: String,
        details: Option<String>,
    },
    InternalServer(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            ApiError::UpstreamAuth { message, .. } => write!(f, "Upstream Auth Error: {}", message),
            ApiError::Configuration(msg) => write!(f, "Configuration Error: {}", msg),
            ApiError::StoreUnavailable { message, .. } => {
                write!(f, "Store Unavailable: {}", message)
            }
            ApiError::InternalServer(msg) => write!(f, "Internal Server Error: {}", msg),
        }
    }
}

/// JSON error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_message, code, details) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, "BAD_REQUEST", None),
            ApiError::UpstreamAuth { message, details } => (
                StatusCode::BAD_REQUEST,
                message,
                "UPSTREAM_AUTH_ERROR",
                details,
            ),
            ApiError::Configuration(msg) => {
                error!(error = %msg, "Deployment configuration error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    msg,
                    "CONFIGURATION_ERROR",
                    None,
                )
            }
            ApiError::StoreUnavailable { message, details } => {
                error!(error = %message, details = ?details, "Account store error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    message,
                    "STORE_UNAVAILABLE",
                    details,
                )
            }
            ApiError::InternalServer(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                msg,
                "INTERNAL_SERVER_ERROR",
                None,
            ),
        };

        let error_response = ErrorResponse {
            error: error_message,
            code: code.to_string(),
            details,
        };

        (status, Json(error_response)).into_response()
    }
}

impl From<LineError> for ApiError {
    fn from(err: LineError) -> Self {
        match err {
            LineError::NotConfigured => {
                ApiError::Configuration("LINE login is not configured".to_string())
            }
            LineError::TokenExchange { status, body } => ApiError::UpstreamAuth {
                message: "Failed to get access token".to_string(),
                details: Some(format!("HTTP {}: {}", status, body)),
            },
            LineError::ProfileFetch { status, body } => ApiError::UpstreamAuth {
                message: "Failed to get LINE profile".to_string(),
                details: Some(format!("HTTP {}: {}", status, body)),
            },
            LineError::RequestFailed(msg) => ApiError::InternalServer(format!(
                "LINE authentication service unavailable: {}",
                msg
            )),
            LineError::Serialization(msg) => {
                ApiError::InternalServer(format!("Unexpected LINE response: {}", msg))
            }
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotConfigured => {
                ApiError::Configuration("Account store is not configured".to_string())
            }
            StoreError::Conflict(details) => ApiError::StoreUnavailable {
                message: "Account store conflict".to_string(),
                details: Some(details),
            },
            StoreError::Unavailable(details) => ApiError::StoreUnavailable {
                message: "Account store request failed".to_string(),
                details: Some(details),
            },
            StoreError::Unexpected(details) => {
                ApiError::InternalServer(format!("Unexpected account store error: {}", details))
            }
        }
    }
}
