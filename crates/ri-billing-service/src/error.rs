//! API error types and responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use ri_billing_engine::{EngineError, RunSummary};
use ri_billing_store::StoreError;

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

    /// Conflict - a record changed while it was being written.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The run completed but some writes failed.
    #[error("{failed_operations} write operation(s) failed")]
    PartialFailure {
        /// Number of operations that were not written.
        failed_operations: usize,
        /// Outcome of the run.
        summary: Box<RunSummary>,
    },

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),

    /// External service error.
    #[error("external service error: {0}")]
    ExternalService(String),

    /// A required integration is not configured.
    #[error("service unavailable: {0}")]
    Unavailable(String),
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
            Self::PartialFailure {
                failed_operations,
                summary,
            } => {
                tracing::error!(
                    customer_id = %summary.customer,
                    failed_operations,
                    "Attribution run finished with failed writes"
                );
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "partial_failure",
                    self.to_string(),
                    Some(serde_json::json!({
                        "failed_operations": failed_operations,
                        "summary": summary,
                    })),
                )
            }
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
            Self::Unavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "service_unavailable",
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

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => Self::NotFound(format!("{entity} not found: {id}")),
            StoreError::Conflict { entity, id } => {
                Self::Conflict(format!("{entity} {id} was modified concurrently"))
            }
            StoreError::Database(msg) | StoreError::Serialization(msg) => Self::Internal(msg),
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Store(e) => e.into(),
            EngineError::Report(e) => Self::ExternalService(e.to_string()),
            EngineError::Commit { failures, summary } => Self::PartialFailure {
                failed_operations: failures.iter().map(|f| f.operations.len()).sum(),
                summary,
            },
            e @ (EngineError::Attribution(_) | EngineError::Config(_)) => {
                Self::Internal(e.to_string())
            }
        }
    }
}
