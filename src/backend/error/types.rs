/**
 * Backend Error Types
 *
 * This module defines error types specific to the backend server.
 *
 * # Error Categories
 *
 * ## Handler Errors
 *
 * Raised while admitting an HTTP request: missing session cookie, expired
 * session, disallowed origin.
 *
 * ## Protocol Errors
 *
 * A frame on a live socket that cannot be acted upon. These never leave the
 * connection task; they are logged and the frame is dropped.
 *
 * ## Database Errors
 *
 * Failures from the chat or session store.
 *
 * ## Hub Errors
 *
 * The hub task has stopped and no longer accepts commands.
 */

use crate::shared::SharedError;
use axum::http::StatusCode;
use thiserror::Error;

/// Backend-specific error types
///
/// # Usage
///
/// ```rust
/// use social_hub::backend::error::BackendError;
/// use axum::http::StatusCode;
///
/// let err = BackendError::handler(StatusCode::UNAUTHORIZED, "missing session cookie");
/// let err = BackendError::protocol("unknown action");
/// ```
#[derive(Debug, Error)]
pub enum BackendError {
    /// Request-level failure with an explicit status
    #[error("Handler error: {message}")]
    HandlerError {
        /// HTTP status code for this error
        status: StatusCode,
        /// Human-readable error message
        message: String,
    },

    /// Malformed or unusable client envelope
    #[error("Protocol error: {message}")]
    ProtocolError {
        /// Human-readable error message
        message: String,
    },

    /// The hub task is gone
    #[error("Hub unavailable")]
    HubUnavailable,

    /// Store query failure
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Schema migration failure at startup
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Shared error (from shared module)
    #[error(transparent)]
    SharedError(#[from] SharedError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl BackendError {
    /// Create a new handler error with a status code
    pub fn handler(status: StatusCode, message: impl Into<String>) -> Self {
        Self::HandlerError {
            status,
            message: message.into(),
        }
    }

    /// Shorthand for a 401 handler error
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::handler(StatusCode::UNAUTHORIZED, message)
    }

    /// Create a new protocol error
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::ProtocolError {
            message: message.into(),
        }
    }

    /// Get the HTTP status code for this error
    ///
    /// # Status Code Mapping
    ///
    /// - `HandlerError` - Uses the status code from the error
    /// - `ProtocolError` / validation - 400 Bad Request
    /// - `HubUnavailable` - 503 Service Unavailable
    /// - everything else - 500 Internal Server Error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::HandlerError { status, .. } => *status,
            Self::ProtocolError { .. } => StatusCode::BAD_REQUEST,
            Self::HubUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::SharedError(SharedError::ValidationError { .. }) => StatusCode::BAD_REQUEST,
            Self::SharedError(SharedError::SerializationError { .. }) => StatusCode::BAD_REQUEST,
            Self::Database(_) | Self::Migration(_) | Self::SerializationError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get the error message
    ///
    /// Store failures are not echoed to clients verbatim.
    pub fn message(&self) -> String {
        match self {
            Self::HandlerError { message, .. } => message.clone(),
            Self::ProtocolError { message } => message.clone(),
            Self::Database(_) | Self::Migration(_) => "Internal storage error".to_string(),
            other => other.to_string(),
        }
    }
}
