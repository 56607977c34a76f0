use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    auth::AuthError, gateway::GatewayError, notifications::NotificationError, store::StoreError,
};

fn current_request_id() -> Option<String> {
    crate::tracing::current_request_id().map(|rid| rid.as_str().to_string())
}

/// Error envelope returned by every failing endpoint
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "success": false,
    "error": "Validation error: email must look like local@domain.tld",
    "request_id": "req-abc123xyz",
    "timestamp": "2026-03-09T10:30:00.000Z"
}))]
pub struct ErrorResponse {
    /// Always `false`
    pub success: bool,
    /// Human-readable error description
    pub error: String,
    /// Unique request identifier for support and debugging
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// ISO 8601 timestamp when error occurred
    pub timestamp: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    #[error("Payment verification failed: {0}")]
    PaymentVerificationFailed(String),

    #[error("Persistence error: {0}")]
    PersistenceError(#[from] StoreError),

    #[error("Payment gateway error: {0}")]
    GatewayError(#[from] GatewayError),

    #[error("Auth provider error: {0}")]
    AuthError(#[from] AuthError),

    #[error("Notification error: {0}")]
    NotificationError(#[from] NotificationError),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::SerializationError(err.to_string())
    }
}

impl ServiceError {
    /// Returns the HTTP status code for this error.
    /// This is the single source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ValidationError(_) | Self::PaymentVerificationFailed(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::InvalidStatus(_) => StatusCode::CONFLICT,
            Self::AuthError(err) if err.is_rejection() => StatusCode::UNAUTHORIZED,
            Self::PersistenceError(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::PersistenceError(_)
            | Self::GatewayError(_)
            | Self::AuthError(_)
            | Self::NotificationError(_)
            | Self::SerializationError(_)
            | Self::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the error message suitable for HTTP responses.
    /// Upstream errors return generic messages to avoid leaking collaborator details.
    pub fn response_message(&self) -> String {
        match self {
            Self::PersistenceError(StoreError::NotFound(what)) => format!("Not found: {}", what),
            Self::PersistenceError(_) => {
                "Could not save your request right now, please try again".to_string()
            }
            Self::GatewayError(_) => {
                "Payment gateway is unavailable, please try again".to_string()
            }
            Self::AuthError(err) if err.is_rejection() => "Invalid or expired session".to_string(),
            Self::AuthError(_) => "Authentication service unavailable".to_string(),
            Self::NotificationError(_) | Self::SerializationError(_) | Self::InternalError(_) => {
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let err = ErrorResponse {
            success: false,
            error: self.response_message(),
            request_id: current_request_id(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(err)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_maps_to_bad_request() {
        let err = ServiceError::ValidationError("email".into());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.response_message(), "Validation error: email");
    }

    #[test]
    fn store_errors_hide_upstream_details() {
        let err = ServiceError::from(StoreError::Api {
            status: 503,
            body: "pg connection reset".into(),
        });
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.response_message().contains("pg connection"));
    }

    #[test]
    fn missing_record_is_not_found() {
        let err = ServiceError::from(StoreError::NotFound("orders/abc".into()));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn rejected_tokens_are_unauthorized() {
        let err = ServiceError::from(AuthError::InvalidSession);
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn rejected_transition_is_conflict() {
        let err = ServiceError::InvalidStatus("paid -> paid".into());
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }
}
