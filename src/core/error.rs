//! Error type system for the bugtrackin backend
//!
//! Every fallible operation in the service funnels into [`BugtrackError`],
//! which maps onto the HTTP error taxonomy (401/403/404/409/422/500)
//! and renders the stable `{ success: false, message, errors? }` envelope.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single field-level validation failure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Collection of field errors attached to a `ValidationFailed` response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ValidationErrors(pub Vec<FieldError>);

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.push(FieldError::new(field, message));
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<&str> = self.0.iter().map(|e| e.field.as_str()).collect();
        write!(f, "{}", fields.join(", "))
    }
}

/// Main error type for the bugtrackin backend
#[derive(Debug, thiserror::Error)]
pub enum BugtrackError {
    // Request-level errors
    #[error("Validation error: {0}")]
    ValidationFailed(ValidationErrors),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Unauthorized access")]
    Unauthorized,

    #[error("Access forbidden")]
    Forbidden,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    AlreadyExists(String),

    // System-level errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl BugtrackError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            BugtrackError::ValidationFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
            BugtrackError::InvalidCredentials | BugtrackError::Unauthorized => {
                StatusCode::UNAUTHORIZED
            }
            BugtrackError::Forbidden => StatusCode::FORBIDDEN,
            BugtrackError::NotFound(_) => StatusCode::NOT_FOUND,
            BugtrackError::AlreadyExists(_) => StatusCode::CONFLICT,
            BugtrackError::ConfigError(_)
            | BugtrackError::DatabaseError(_)
            | BugtrackError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error type name for logs
    pub fn error_type(&self) -> &'static str {
        match self {
            BugtrackError::ValidationFailed(_) => "ValidationFailed",
            BugtrackError::InvalidCredentials => "InvalidCredentials",
            BugtrackError::Unauthorized => "Unauthorized",
            BugtrackError::Forbidden => "Forbidden",
            BugtrackError::NotFound(_) => "NotFound",
            BugtrackError::AlreadyExists(_) => "AlreadyExists",
            BugtrackError::ConfigError(_) => "ConfigError",
            BugtrackError::DatabaseError(_) => "DatabaseError",
            BugtrackError::Internal(_) => "Internal",
        }
    }

    /// Message safe to return to the caller. 500-class causes stay in the
    /// server logs; the response body carries a generic message.
    fn public_message(&self) -> String {
        match self {
            BugtrackError::ValidationFailed(_) => "Validation error".to_string(),
            BugtrackError::ConfigError(_)
            | BugtrackError::DatabaseError(_)
            | BugtrackError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

/// Error response envelope: `{ success: false, message, errors? }`
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            errors: None,
        }
    }

    pub fn with_errors(message: impl Into<String>, errors: serde_json::Value) -> Self {
        Self {
            success: false,
            message: message.into(),
            errors: Some(errors),
        }
    }

    pub fn from_error(error: &BugtrackError) -> Self {
        match error {
            BugtrackError::ValidationFailed(fields) => Self::with_errors(
                error.public_message(),
                serde_json::to_value(&fields.0).unwrap_or_default(),
            ),
            other => Self::new(other.public_message()),
        }
    }
}

/// Implement IntoResponse so handlers can return `Result<_, BugtrackError>`
impl IntoResponse for BugtrackError {
    fn into_response(self) -> Response {
        let status_code = self.status_code();

        if status_code.is_server_error() {
            // Full cause stays server-side
            tracing::error!(
                error_type = self.error_type(),
                status_code = %status_code,
                "Request failed: {}",
                self
            );
        } else {
            tracing::warn!(
                error_type = self.error_type(),
                status_code = %status_code,
                "Request rejected: {}",
                self
            );
        }

        let error_response = ErrorResponse::from_error(&self);
        (status_code, Json(error_response)).into_response()
    }
}

/// Result type alias for operations that can fail with BugtrackError
pub type Result<T> = std::result::Result<T, BugtrackError>;
