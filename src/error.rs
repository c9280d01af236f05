//! Error types for transfer-tracker
//!
//! This module provides:
//! - The top-level [`Error`] returned by public operations
//! - [`RegistryError`] for job-store conflicts and lookups
//! - [`BackendError`] for failures reported by a [`TransferBackend`](crate::backend::TransferBackend)
//! - HTTP status mapping and structured JSON bodies for the REST API

use crate::types::{JobId, JobStatus};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for transfer-tracker operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for transfer-tracker
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "tracking.poll_interval_ms")
        key: Option<String>,
    },

    /// Submitted URL is empty, malformed or uses an unsupported scheme
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The backend refused to start the transfer
    #[error("transfer request rejected: {0}")]
    InvalidRequest(String),

    /// Job store conflict or lookup failure
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Backend failure other than a rejected request
    #[error("transfer backend error: {0}")]
    Backend(BackendError),

    /// Operation not allowed in the job's current state
    #[error("cannot {operation} job {id}: job is {current_state}")]
    InvalidState {
        /// Job the operation targeted
        id: JobId,
        /// Operation that was attempted (e.g. "forget")
        operation: String,
        /// Status at the time of the attempt
        current_state: JobStatus,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Shutdown in progress, not accepting new jobs
    #[error("shutdown in progress: not accepting new jobs")]
    ShuttingDown,

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),
}

/// Job registry errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A job with this id is already registered
    #[error("job {id} is already registered")]
    Duplicate {
        /// Conflicting id
        id: JobId,
    },

    /// No job with this id
    #[error("job {id} not found")]
    NotFound {
        /// Missing id
        id: JobId,
    },

    /// The job already reached a terminal status and accepts no further writes
    #[error("job {id} is already {status}")]
    TerminalState {
        /// Job that rejected the write
        id: JobId,
        /// Terminal status it holds
        status: JobStatus,
    },
}

/// Errors reported by a transfer backend
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// The backend refused the request (bad destination, unsupported URL, ...)
    #[error("invalid transfer request: {0}")]
    InvalidRequest(String),

    /// The backend has no record of the transfer
    #[error("transfer {id} not found")]
    NotFound {
        /// Unknown id
        id: JobId,
    },

    /// Temporary failure talking to the backend; the query may succeed later
    #[error("transient I/O error: {0}")]
    TransientIo(String),
}

impl BackendError {
    /// Whether retrying the same query later can succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, BackendError::TransientIo(_))
    }
}

impl From<BackendError> for Error {
    fn from(error: BackendError) -> Self {
        match error {
            BackendError::InvalidRequest(message) => Error::InvalidRequest(message),
            other => Error::Backend(other),
        }
    }
}

/// API error response format
///
/// ```json
/// {
///   "error": {
///     "code": "job_not_found",
///     "message": "registry error: job 42 not found",
///     "details": { "job_id": "42" }
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "job_not_found", "invalid_input")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Create an API error with additional details
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    /// Create a "validation error" error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new("validation_error", message)
    }

    /// Create an "internal server error"
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("internal_error", message)
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request
            Error::InvalidInput(_) => 400,

            // 404 Not Found
            Error::Registry(RegistryError::NotFound { .. }) => 404,

            // 409 Conflict
            Error::Registry(RegistryError::Duplicate { .. }) => 409,
            Error::Registry(RegistryError::TerminalState { .. }) => 409,
            Error::InvalidState { .. } => 409,

            // 422 Unprocessable Entity
            Error::InvalidRequest(_) => 422,
            Error::Backend(BackendError::InvalidRequest(_)) => 422,

            // 502 Bad Gateway
            Error::Backend(_) => 502,

            // 500 Internal Server Error
            Error::Config { .. } => 500,
            Error::Io(_) => 500,
            Error::ApiServerError(_) => 500,

            // 503 Service Unavailable
            Error::ShuttingDown => 503,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::InvalidInput(_) => "invalid_input",
            Error::InvalidRequest(_) => "invalid_request",
            Error::Registry(e) => match e {
                RegistryError::Duplicate { .. } => "duplicate_job",
                RegistryError::NotFound { .. } => "job_not_found",
                RegistryError::TerminalState { .. } => "terminal_state",
            },
            Error::Backend(e) => match e {
                BackendError::InvalidRequest(_) => "invalid_request",
                BackendError::NotFound { .. } => "transfer_not_found",
                BackendError::TransientIo(_) => "backend_unavailable",
            },
            Error::InvalidState { .. } => "invalid_state",
            Error::Io(_) => "io_error",
            Error::ShuttingDown => "shutting_down",
            Error::ApiServerError(_) => "api_server_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        let details = match &error {
            Error::Registry(RegistryError::NotFound { id })
            | Error::Registry(RegistryError::Duplicate { id })
            | Error::Backend(BackendError::NotFound { id }) => Some(serde_json::json!({
                "job_id": id,
            })),
            Error::Registry(RegistryError::TerminalState { id, status }) => {
                Some(serde_json::json!({
                    "job_id": id,
                    "status": status,
                }))
            }
            Error::InvalidState {
                id,
                operation,
                current_state,
            } => Some(serde_json::json!({
                "job_id": id,
                "operation": operation,
                "current_state": current_state,
            })),
            Error::Config { key: Some(key), .. } => Some(serde_json::json!({
                "key": key,
            })),
            _ => None,
        };

        ApiError {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        }
    }
}
