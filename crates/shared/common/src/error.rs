//! Unified error handling for the admin console.
//!
//! Provides a single error type that is:
//! - produced by the backend client when it normalizes remote failures
//! - shared (it is `Clone`) by every subscriber of one in-flight query
//! - rendered as an Axum HTTP response by the gateway

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use domain::DomainError;
use serde::Serialize;
use thiserror::Error;

/// Application error types.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    // Authentication & Authorization
    #[error("Authentication required")]
    Unauthorized,

    #[error("Session expired")]
    SessionExpired,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Access denied")]
    Forbidden,

    // Validation
    #[error("{0}")]
    Validation(String),

    #[error("Invalid input: {0}")]
    BadRequest(String),

    // Resource errors
    #[error("Resource not found")]
    NotFound,

    #[error("{0} already exists")]
    Conflict(String),

    /// The row no longer holds the status the write was planned against
    #[error("{0} was changed by someone else")]
    StaleRecord(String),

    // Remote service errors
    #[error("Network error: {0}")]
    Network(String),

    #[error("Service unavailable")]
    ServiceUnavailable(String),

    #[error("Remote error ({status}): {message}")]
    Remote { status: u16, message: String },

    // Workflow
    #[error("A submission is already in progress")]
    InFlight,

    // Startup
    #[error("Configuration error: {0}")]
    Config(String),

    // Internal
    #[error("Internal server error")]
    Internal(String),
}

/// Error response body for HTTP
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
}

impl AppError {
    /// Get error code for client
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Unauthorized => "UNAUTHORIZED",
            AppError::SessionExpired => "SESSION_EXPIRED",
            AppError::InvalidCredentials => "INVALID_CREDENTIALS",
            AppError::Forbidden => "FORBIDDEN",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::NotFound => "NOT_FOUND",
            AppError::Conflict(_) | AppError::StaleRecord(_) => "CONFLICT",
            AppError::Network(_) => "NETWORK_ERROR",
            AppError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            AppError::Remote { .. } => "REMOTE_ERROR",
            AppError::InFlight => "IN_FLIGHT",
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Get HTTP status code
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized | AppError::SessionExpired | AppError::InvalidCredentials => {
                StatusCode::UNAUTHORIZED
            }
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Conflict(_) | AppError::StaleRecord(_) | AppError::InFlight => {
                StatusCode::CONFLICT
            }
            AppError::Network(_) => StatusCode::BAD_GATEWAY,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Remote { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            AppError::Config(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get user-facing message (hides internal details)
    pub fn user_message(&self) -> String {
        match self {
            // Show full message for client errors
            AppError::Validation(msg) => msg.clone(),
            AppError::BadRequest(msg) => msg.clone(),
            AppError::Conflict(msg) => {
                if msg.ends_with("already exists") {
                    msg.clone()
                } else {
                    format!("{} already exists", msg)
                }
            }
            AppError::SessionExpired => "Your session has expired. Please sign in again".to_string(),
            AppError::InvalidCredentials => "Invalid email or password".to_string(),

            // Hide details for remote/internal errors
            AppError::Network(msg) => {
                tracing::error!("Network error: {}", msg);
                "Could not reach the server. Check your connection and try again".to_string()
            }
            AppError::ServiceUnavailable(msg) => {
                tracing::error!("Service unavailable: {}", msg);
                "The service is temporarily unavailable".to_string()
            }
            AppError::Remote { status, message } => {
                tracing::error!("Remote error {}: {}", status, message);
                "The server rejected the request".to_string()
            }
            AppError::Config(msg) => {
                tracing::error!("Configuration error: {}", msg);
                "The application is not configured correctly".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "An internal error occurred".to_string()
            }

            // Use default message for others
            _ => self.to_string(),
        }
    }

    /// Whether a read may be retried after this error
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AppError::Network(_) | AppError::ServiceUnavailable(_)
        )
    }

    /// Whether the error means the caller has no usable session
    pub fn is_auth(&self) -> bool {
        matches!(self, AppError::Unauthorized | AppError::SessionExpired)
    }
}

// =============================================================================
// HTTP Response (Axum)
// =============================================================================

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.code().to_string(),
                message: self.user_message(),
            },
        };

        (status, Json(body)).into_response()
    }
}

// =============================================================================
// Domain Error Conversion
// =============================================================================

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) => AppError::Validation(msg),
            err @ DomainError::InvalidTransition { .. } => AppError::BadRequest(err.to_string()),
            DomainError::NotFound(_) => AppError::NotFound,
            DomainError::Conflict(msg) => AppError::Conflict(msg),
            DomainError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

// =============================================================================
// Transport Error Conversion (reqwest)
// =============================================================================

#[cfg(feature = "http-client")]
impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            AppError::Internal(format!("Malformed response: {}", err))
        } else if err.is_builder() {
            AppError::Config(err.to_string())
        } else {
            AppError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(format!("Malformed row: {}", err))
    }
}

/// Result type alias
pub type AppResult<T> = Result<T, AppError>;

/// Extension trait for Option -> AppError conversion
pub trait OptionExt<T> {
    fn ok_or_not_found(self) -> AppResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_not_found(self) -> AppResult<T> {
        self.ok_or(AppError::NotFound)
    }
}

/// Convenience constructors
impl AppError {
    pub fn conflict(entity: impl Into<String>) -> Self {
        AppError::Conflict(entity.into())
    }

    pub fn stale(entity: impl Into<String>) -> Self {
        AppError::StaleRecord(entity.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        AppError::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }

    pub fn network(msg: impl Into<String>) -> Self {
        AppError::Network(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        AppError::Config(msg.into())
    }

    pub fn service_unavailable(service: impl Into<String>) -> Self {
        AppError::ServiceUnavailable(service.into())
    }

    pub fn remote(status: u16, message: impl Into<String>) -> Self {
        AppError::Remote {
            status,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn test_transient_errors() {
        assert!(AppError::network("timeout").is_transient());
        assert!(AppError::service_unavailable("502").is_transient());
        assert!(!AppError::NotFound.is_transient());
        assert!(!AppError::InvalidCredentials.is_transient());
        assert!(!AppError::remote(418, "teapot").is_transient());
    }

    #[test]
    fn test_domain_conversion() {
        let err: AppError = DomainError::validation("A rejection reason is required").into();
        assert_eq!(err, AppError::Validation("A rejection reason is required".into()));

        let err: AppError = DomainError::InvalidTransition {
            entity: "seller",
            action: "approve",
            status: "verified",
        }
        .into();
        assert_eq!(err.code(), "BAD_REQUEST");
        assert!(err.user_message().contains("Cannot approve a seller"));
    }

    #[test]
    fn test_conflict_message_not_duplicated() {
        assert_eq!(
            AppError::conflict("Category 'audio'").user_message(),
            "Category 'audio' already exists"
        );
        assert_eq!(
            AppError::conflict("slug already exists").user_message(),
            "slug already exists"
        );
    }

    #[test]
    fn test_stale_record_is_a_conflict() {
        let err = AppError::stale("Seller 42");
        assert_eq!(err.code(), "CONFLICT");
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.user_message(), "Seller 42 was changed by someone else");
        assert!(!err.is_transient());
    }

    #[test]
    fn test_remote_status_passthrough() {
        assert_eq!(AppError::remote(418, "x").status(), StatusCode::IM_A_TEAPOT);
        assert_eq!(AppError::remote(42, "x").status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_error_response_body() {
        let response = AppError::InFlight.into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["code"], "IN_FLIGHT");
        assert_eq!(body["error"]["message"], "A submission is already in progress");
    }
}
