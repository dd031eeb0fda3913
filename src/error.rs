use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Stable reason codes surfaced in API error bodies and logged for support.
pub mod msg {
    pub const ORDER_NOT_FOUND: &str = "order_not_found";
    pub const APPLICATION_NOT_FOUND: &str = "application_not_found";
    pub const STRIPE_NOT_CONFIGURED: &str = "stripe_not_configured";
    pub const SIGNATURE_VERIFICATION_FAILED: &str = "signature_verification_failed";
    pub const INVALID_SIGNATURE_FORMAT: &str = "invalid_signature_format";
    pub const INVALID_TIMESTAMP_IN_SIGNATURE: &str = "invalid_timestamp_in_signature";
    pub const INVALID_WEBHOOK_SECRET: &str = "invalid_webhook_secret";
    pub const INVALID_REDIRECT_ORIGIN: &str = "invalid_redirect_origin";
    pub const CONSENT_VERSION_MISMATCH: &str = "consent_version_mismatch";
    pub const CONSENT_NOT_GIVEN: &str = "consent_not_given";
    pub const SESSION_NOT_PAID: &str = "session_not_paid";
    pub const ORDER_NOT_FINALIZED: &str = "order_not_finalized";
    pub const ALREADY_PAID: &str = "already_paid";
    pub const UNKNOWN_TIER: &str = "unknown_tier";
    pub const UNKNOWN_ADDON: &str = "unknown_addon";
    pub const REPORT_LINK_EXPIRED: &str = "report_link_expired";
    pub const REPORT_LINK_INVALID: &str = "report_link_invalid";
}

/// Extension trait for converting `Option<T>` lookups into tagged errors.
pub trait OptionExt<T> {
    fn or_not_found(self, code: &str) -> Result<T>;
    fn or_bad_request(self, code: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn or_not_found(self, code: &str) -> Result<T> {
        self.ok_or_else(|| AppError::NotFound(code.to_string()))
    }

    fn or_bad_request(self, code: &str) -> Result<T> {
        self.ok_or_else(|| AppError::BadRequest(code.to_string()))
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    ok: bool,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::NotFound(code) => (StatusCode::NOT_FOUND, code.clone(), None),
            AppError::BadRequest(code) => (StatusCode::BAD_REQUEST, code.clone(), None),
            AppError::Conflict(code) => (StatusCode::CONFLICT, code.clone(), None),
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error".to_string(),
                    None,
                )
            }
            AppError::Pool(e) => {
                tracing::error!("Pool error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error".to_string(),
                    None,
                )
            }
            AppError::Json(e) => (
                StatusCode::BAD_REQUEST,
                "invalid_json".to_string(),
                Some(e.to_string()),
            ),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error".to_string(),
                    None,
                )
            }
        };

        let body = ErrorResponse {
            ok: false,
            error,
            details,
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
