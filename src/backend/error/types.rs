/**
 * Backend Error Types
 *
 * `BackendError` is what HTTP and WebSocket handlers return. It wraps the
 * domain taxonomy and adds the failures that only exist at the edge of the
 * server (missing credentials, malformed requests).
 *
 * # Status Code Mapping
 *
 * - `Unauthorized` - 401
 * - `Domain(Forbidden | NotPermitted)` - 403
 * - `Domain(NotFound)` - 404
 * - `Domain(Validation)` - 400
 * - `Domain(Persistence)` - 500
 * - `HandlerError` - the status it carries
 */

use thiserror::Error;
use axum::http::StatusCode;
use crate::backend::error::domain::DomainError;
use crate::shared::SharedError;

/// Backend-specific error types
///
/// # Usage
///
/// ```rust
/// use boardsync::backend::error::BackendError;
/// use axum::http::StatusCode;
///
/// let err = BackendError::handler(StatusCode::BAD_REQUEST, "Invalid request");
/// assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
/// ```
#[derive(Debug, Error)]
pub enum BackendError {
    /// Handler error (e.g. malformed request)
    #[error("Handler error: {message}")]
    HandlerError {
        /// HTTP status code for this error
        status: StatusCode,
        /// Human-readable error message
        message: String,
    },

    /// Missing or invalid credentials
    #[error("Unauthorized: {message}")]
    Unauthorized {
        message: String,
    },

    /// Error raised by a domain service
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Shared error (from shared module)
    #[error(transparent)]
    SharedError(#[from] SharedError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl BackendError {
    /// Create a new handler error with a status code
    ///
    /// # Arguments
    ///
    /// * `status` - HTTP status code
    /// * `message` - Error message
    pub fn handler(status: StatusCode, message: impl Into<String>) -> Self {
        Self::HandlerError {
            status,
            message: message.into(),
        }
    }

    /// Create a new unauthorized error
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::HandlerError { status, .. } => *status,
            Self::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Self::Domain(err) => match err {
                DomainError::Forbidden { .. } | DomainError::NotPermitted { .. } => StatusCode::FORBIDDEN,
                DomainError::NotFound { .. } => StatusCode::NOT_FOUND,
                DomainError::Validation { .. } => StatusCode::BAD_REQUEST,
                DomainError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::SharedError(SharedError::SerializationError { .. }) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::SerializationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the client-facing error message
    ///
    /// Storage details are not exposed; they are logged when the response
    /// is built.
    pub fn message(&self) -> String {
        match self {
            Self::HandlerError { message, .. } => message.clone(),
            Self::Unauthorized { message } => message.clone(),
            Self::Domain(DomainError::Persistence(_)) => "internal storage error".to_string(),
            Self::Domain(err) => err.to_string(),
            Self::SharedError(err) => err.to_string(),
            Self::SerializationError(err) => err.to_string(),
        }
    }
}
