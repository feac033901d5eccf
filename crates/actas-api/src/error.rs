//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps engine errors from `actas-state` to HTTP status codes and JSON
//! bodies carrying a machine-readable code.
//!
//! | Engine error              | Status | Code                      |
//! |---------------------------|--------|---------------------------|
//! | `Authorization`           | 403    | `FORBIDDEN`               |
//! | `NotFound`                | 404    | `NOT_FOUND`               |
//! | `Guard`                   | 400    | `GUARD_VIOLATION`         |
//! | `Validation`              | 400    | `VALIDATION_FAILED`       |
//! | `InvalidInput`            | 400    | `BAD_REQUEST`             |
//! | `StateConflict`           | 409    | `STATE_CONFLICT`          |
//! | `AlreadyInTerminalState`  | 409    | `ALREADY_TERMINAL`        |
//! | `EventNotAllowed`         | 409    | `EVENT_NOT_ALLOWED`       |
//! | `Repository`              | 500    | `INTERNAL_ERROR`          |

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use actas_state::EngineError;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "NOT_FOUND", "GUARD_VIOLATION").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Additional context, present only for client errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Application-level error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Request body or path could not be parsed, or failed a business rule (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// A transition guard failed (400). `condition` names the unmet guard.
    #[error("{message}")]
    Guard {
        condition: &'static str,
        message: String,
    },

    /// An academic batch failed validation (400). Carries the full report.
    #[error("academic batch failed validation")]
    InvalidBatch(serde_json::Value),

    /// Missing or invalid credentials (401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Caller lacks the required capability (403).
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Conflict with the current request status (409).
    #[error("{message}")]
    Conflict { code: &'static str, message: String },

    /// Internal server error (500). Message is logged but not returned to client.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Guard { .. } => (StatusCode::BAD_REQUEST, "GUARD_VIOLATION"),
            Self::InvalidBatch(_) => (StatusCode::BAD_REQUEST, "VALIDATION_FAILED"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            Self::Conflict { code, .. } => (StatusCode::CONFLICT, code),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            Self::Guard { condition, .. } => Some(serde_json::json!({ "condition": condition })),
            Self::InvalidBatch(report) => Some(report.clone()),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        };

        if matches!(&self, Self::Internal(_)) {
            tracing::error!(error = %self, "internal server error");
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details: self.details(),
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Authorization { .. } => Self::Forbidden(err.to_string()),
            EngineError::NotFound { .. } => Self::NotFound(err.to_string()),
            EngineError::Guard(violation) => Self::Guard {
                condition: violation.code(),
                message: violation.to_string(),
            },
            EngineError::Validation(report) => match serde_json::to_value(&*report) {
                Ok(details) => Self::InvalidBatch(details),
                Err(e) => Self::Internal(format!("failed to serialize validation report: {e}")),
            },
            EngineError::InvalidInput(message) => Self::BadRequest(message),
            EngineError::StateConflict { .. } => Self::Conflict {
                code: "STATE_CONFLICT",
                message: err.to_string(),
            },
            EngineError::AlreadyInTerminalState { .. } => Self::Conflict {
                code: "ALREADY_TERMINAL",
                message: err.to_string(),
            },
            EngineError::EventNotAllowed { .. } => Self::Conflict {
                code: "EVENT_NOT_ALLOWED",
                message: err.to_string(),
            },
            EngineError::Repository(e) => Self::Internal(e.to_string()),
        }
    }
}
