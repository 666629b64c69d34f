//! API error types and responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Unauthorized - missing or invalid credentials.
    #[error("unauthorized")]
    Unauthorized,

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Bad request - invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Conflict - resource already exists or lost a write race.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Insufficient credits for a debit.
    #[error("insufficient credits: available={available}, required={required}")]
    InsufficientCredits {
        /// Credits currently available.
        available: i64,
        /// Credits the debit required.
        required: i64,
    },

    /// Deferred balance below the invoicing minimum.
    #[error("deferred balance {balance_cents} below minimum {minimum_cents}")]
    BelowMinimum {
        /// Current deferred balance in cents.
        balance_cents: i64,
        /// Configured minimum in cents.
        minimum_cents: i64,
    },

    /// Payment amount outside the matching tolerance.
    #[error("amount mismatch: expected {expected_cents}, got {got_cents}")]
    AmountMismatch {
        /// Invoice total in cents.
        expected_cents: i64,
        /// Paid amount in cents.
        got_cents: i64,
    },

    /// The invoice was already settled.
    #[error("invoice already paid: {0}")]
    AlreadyPaid(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),

    /// External service error.
    #[error("external service error: {0}")]
    ExternalService(String),
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                self.to_string(),
                None,
            ),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone(), None),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone(), None),
            Self::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone(), None),
            Self::InsufficientCredits {
                available,
                required,
            } => (
                StatusCode::PAYMENT_REQUIRED,
                "insufficient_credits",
                self.to_string(),
                Some(serde_json::json!({
                    "available": available,
                    "required": required
                })),
            ),
            Self::BelowMinimum {
                balance_cents,
                minimum_cents,
            } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "below_minimum",
                self.to_string(),
                Some(serde_json::json!({
                    "balance_cents": balance_cents,
                    "minimum_cents": minimum_cents
                })),
            ),
            Self::AmountMismatch {
                expected_cents,
                got_cents,
            } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "amount_mismatch",
                self.to_string(),
                Some(serde_json::json!({
                    "expected_cents": expected_cents,
                    "got_cents": got_cents
                })),
            ),
            Self::AlreadyPaid(number) => (
                StatusCode::CONFLICT,
                "already_paid",
                format!("Invoice {number} is already paid"),
                None,
            ),
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
            Self::ExternalService(msg) => (
                StatusCode::BAD_GATEWAY,
                "external_service_error",
                msg.clone(),
                None,
            ),
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<tally_store::StoreError> for ApiError {
    fn from(err: tally_store::StoreError) -> Self {
        use tally_store::StoreError;
        match err {
            StoreError::NotFound { entity, id } => Self::NotFound(format!("{entity} not found: {id}")),
            StoreError::AlreadyExists { entity, id } => {
                Self::Conflict(format!("{entity} already exists: {id}"))
            }
            StoreError::InsufficientCredits {
                available,
                required,
            } => Self::InsufficientCredits {
                available,
                required,
            },
            StoreError::BelowMinimum {
                balance_cents,
                minimum_cents,
            } => Self::BelowMinimum {
                balance_cents,
                minimum_cents,
            },
            StoreError::AlreadyPaid { invoice_number } => Self::AlreadyPaid(invoice_number),
            StoreError::AmountMismatch {
                expected_cents,
                got_cents,
            } => Self::AmountMismatch {
                expected_cents,
                got_cents,
            },
            StoreError::InvalidEntry(msg) => Self::BadRequest(msg),
            StoreError::Conflict(msg) => Self::Conflict(msg),
            StoreError::Database(msg) | StoreError::Serialization(msg) => Self::Internal(msg),
        }
    }
}
