//! Error codes for the wager engine.
//!
//! All variants map to a stable HTTP status and, where useful, a stable
//! error code string a client can branch on. Errors are grouped by category
//! for readability, mirroring how the component design documents them.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde::Serialize;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // ========================================================================
    // Validation errors
    // ========================================================================
    /// Bad input: field/message pairs surfaced verbatim to the caller.
    #[error("validation error: {0}")]
    Validation(String),

    // ========================================================================
    // Not-found errors
    // ========================================================================
    #[error("{0} not found")]
    NotFound(&'static str),

    // ========================================================================
    // Conflict / state errors
    // ========================================================================
    /// A named, stable error code plus human message, e.g.
    /// `RoundClosed`, `AlreadyClaimed`, `RoundSettled`, `ACTIVE_SESSION_EXISTS`.
    #[error("{code}: {message}")]
    Conflict { code: &'static str, message: String },

    /// Insufficient balance / over the per-bet limit. Discloses current balance.
    #[error("insufficient balance: have {balance}, need {needed}")]
    InsufficientBalance { balance: Decimal, needed: Decimal },

    // ========================================================================
    // Auth errors
    // ========================================================================
    #[error("unauthorized: {0}")]
    Unauthorized(&'static str),

    #[error("forbidden: {0}")]
    Forbidden(&'static str),

    // ========================================================================
    // Integrity errors (fail-closed)
    // ========================================================================
    /// E.g. "cannot revoke existing refresh tokens during login" — login is
    /// denied rather than proceeding with a stale session in place.
    #[error("integrity failure: {0}")]
    Integrity(String),

    // ========================================================================
    // Unexpected errors
    // ========================================================================
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    code: Option<&'static str>,
    balance: Option<Decimal>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, None, msg.clone()),
            AppError::NotFound(what) => {
                (StatusCode::NOT_FOUND, None, format!("{what} not found"))
            }
            AppError::Conflict { code, message } => {
                let status = if *code == "ACTIVE_SESSION_EXISTS" {
                    StatusCode::FORBIDDEN
                } else {
                    StatusCode::BAD_REQUEST
                };
                (status, Some(*code), message.clone())
            }
            AppError::InsufficientBalance { balance, needed } => (
                StatusCode::BAD_REQUEST,
                Some("INSUFFICIENT_BALANCE"),
                format!("balance {balance} is less than required {needed}"),
            ),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, None, msg.to_string()),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, None, msg.to_string()),
            AppError::Integrity(msg) => {
                tracing::error!(error = %msg, "integrity failure, failing closed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    None,
                    "internal error".to_string(),
                )
            }
            AppError::Unexpected(err) => {
                tracing::error!(error = %err, "unexpected error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    None,
                    "internal error".to_string(),
                )
            }
            AppError::Database(err) => {
                tracing::error!(error = %err, "database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    None,
                    "internal error".to_string(),
                )
            }
        };

        let balance = match &self {
            AppError::InsufficientBalance { balance, .. } => Some(*balance),
            _ => None,
        };

        (
            status,
            Json(ErrorBody {
                error: message,
                code,
                balance,
            }),
        )
            .into_response()
    }
}
