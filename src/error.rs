//! Error taxonomy and HTTP status code mapping.
//!
//! [`ErrorKind`] is the classification shared by both cores. Adapters and
//! transaction steps fail with a [`StepError`]; the coordinator reports a
//! [`TransactionError`]; the hub reports a [`HubError`]. [`GatewayError`] is
//! the HTTP-facing enum every handler returns, with a structured JSON body.

use std::fmt;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::ProjectId;
use crate::txn::CompensationOutcome;

/// Classification of every failure the coordinator and the hub can observe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed input: bad id format, missing field, unknown tag.
    Validation,
    /// Requested entity is absent. Collapsed to success for compensations.
    NotFound,
    /// Uniqueness or precondition violated.
    Conflict,
    /// Git gateway call failed (transport, timeout, non-2xx).
    RemoteFailure,
    /// Relational store error.
    LocalFailure,
    /// At least one compensating action failed after an abort.
    CompensationFailure,
    /// Caller cancellation or hub shutdown.
    Cancelled,
}

impl ErrorKind {
    /// Returns the snake-case name of this kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::RemoteFailure => "remote_failure",
            Self::LocalFailure => "local_failure",
            Self::CompensationFailure => "compensation_failure",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of a single adapter call or transaction step.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct StepError {
    kind: ErrorKind,
    message: String,
}

impl StepError {
    /// Creates an error of the given kind.
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Shorthand for [`ErrorKind::Validation`].
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Shorthand for [`ErrorKind::NotFound`].
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Shorthand for [`ErrorKind::Conflict`].
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    /// Shorthand for [`ErrorKind::RemoteFailure`].
    #[must_use]
    pub fn remote(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RemoteFailure, message)
    }

    /// Shorthand for [`ErrorKind::LocalFailure`].
    #[must_use]
    pub fn local(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::LocalFailure, message)
    }

    /// Shorthand for [`ErrorKind::Cancelled`].
    #[must_use]
    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Cancelled, message)
    }

    /// Returns the error classification.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the human-readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns `true` for [`ErrorKind::NotFound`].
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }
}

/// Terminal failure of [`crate::txn::Coordinator::execute`] or of a
/// service workflow built on it.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransactionError {
    /// Refused before any step ran (invalid input, missing entity, or a
    /// transaction that is no longer pending). Nothing was compensated.
    #[error("transaction rejected: {0}")]
    Rejected(StepError),

    /// A forward action failed and every prior step was compensated.
    #[error("transaction aborted at step `{step}`: {cause}")]
    Aborted {
        /// Step whose forward action failed.
        step: String,
        /// The originating error.
        cause: StepError,
    },

    /// A forward action failed and at least one compensation failed too.
    #[error(
        "transaction failed at step `{step}`: {cause}; {failed} compensation(s) failed",
        failed = .compensations.iter().filter(|c| c.is_failure()).count()
    )]
    Failed {
        /// Step whose forward action failed.
        step: String,
        /// The originating error.
        cause: StepError,
        /// Every compensation outcome, in execution (LIFO) order.
        compensations: Vec<CompensationOutcome>,
    },
}

impl TransactionError {
    /// Returns the kind surfaced to callers: the originating kind for
    /// rejections and aborts, [`ErrorKind::CompensationFailure`] otherwise.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Rejected(cause) | Self::Aborted { cause, .. } => cause.kind(),
            Self::Failed { .. } => ErrorKind::CompensationFailure,
        }
    }

    /// Returns the originating error.
    #[must_use]
    pub const fn cause(&self) -> &StepError {
        match self {
            Self::Rejected(cause) | Self::Aborted { cause, .. } | Self::Failed { cause, .. } => {
                cause
            }
        }
    }

    /// Returns the compensation outcomes of a partially rolled back
    /// transaction, or an empty slice.
    #[must_use]
    pub fn compensations(&self) -> &[CompensationOutcome] {
        match self {
            Self::Failed { compensations, .. } => compensations,
            _ => &[],
        }
    }
}

/// Failure reported by the collaboration hub.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HubError {
    /// The hub event loop is no longer running.
    #[error("collaboration hub is stopped")]
    Stopped,

    /// No room exists for the given project.
    #[error("room not found: {0}")]
    RoomNotFound(ProjectId),

    /// An event could not be accepted (unknown or reserved tag).
    #[error("invalid event: {0}")]
    InvalidEvent(String),
}

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 1001,
///     "message": "invalid request: username must not be empty",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub details: Option<serde_json::Value>,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category        | HTTP Status                  |
/// |-----------|-----------------|------------------------------|
/// | 1000–1999 | Validation      | 400 Bad Request              |
/// | 2000–2999 | State/Not Found | 404 Not Found / 409 Conflict |
/// | 3000–3999 | Server          | 500 / 502 / 503              |
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Requested entity was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Collaboration room does not exist.
    #[error("room not found: {0}")]
    RoomNotFound(ProjectId),

    /// Uniqueness or precondition violated.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Git gateway failure.
    #[error("git gateway error: {0}")]
    RemoteFailure(String),

    /// Persistence layer failure.
    #[error("persistence error: {0}")]
    PersistenceError(String),

    /// Rollback left the gateway and the local store inconsistent.
    #[error("partial rollback: {message}")]
    CompensationFailed {
        /// Summary of the failure.
        message: String,
        /// Outcome of each compensation.
        compensations: Vec<CompensationOutcome>,
    },

    /// Operation cancelled or the hub is shutting down.
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::NotFound(_) => 2001,
            Self::RoomNotFound(_) => 2002,
            Self::Conflict(_) => 2003,
            Self::Internal(_) => 3000,
            Self::PersistenceError(_) => 3001,
            Self::RemoteFailure(_) => 3002,
            Self::Unavailable(_) => 3003,
            Self::CompensationFailed { .. } => 3004,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) | Self::RoomNotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::RemoteFailure(_) => StatusCode::BAD_GATEWAY,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::PersistenceError(_) | Self::CompensationFailed { .. } | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<StepError> for GatewayError {
    fn from(err: StepError) -> Self {
        let message = err.message().to_string();
        match err.kind() {
            ErrorKind::Validation => Self::InvalidRequest(message),
            ErrorKind::NotFound => Self::NotFound(message),
            ErrorKind::Conflict => Self::Conflict(message),
            ErrorKind::RemoteFailure => Self::RemoteFailure(message),
            ErrorKind::LocalFailure => Self::PersistenceError(message),
            ErrorKind::Cancelled => Self::Unavailable(message),
            ErrorKind::CompensationFailure => Self::CompensationFailed {
                message,
                compensations: Vec::new(),
            },
        }
    }
}

impl From<TransactionError> for GatewayError {
    fn from(err: TransactionError) -> Self {
        let message = err.to_string();
        match err {
            TransactionError::Rejected(cause) | TransactionError::Aborted { cause, .. } => {
                cause.into()
            }
            TransactionError::Failed { compensations, .. } => Self::CompensationFailed {
                message,
                compensations,
            },
        }
    }
}

impl From<HubError> for GatewayError {
    fn from(err: HubError) -> Self {
        match err {
            HubError::Stopped => Self::Unavailable(err.to_string()),
            HubError::RoomNotFound(project_id) => Self::RoomNotFound(project_id),
            HubError::InvalidEvent(reason) => Self::InvalidRequest(reason),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let details = match &self {
            Self::CompensationFailed { compensations, .. } => {
                serde_json::to_value(compensations).ok()
            }
            _ => None,
        };
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}
