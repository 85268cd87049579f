//! Error Types for the Roscoe API
//!
//! This module defines error handling for the HTTP layer:
//! - ApiError struct carrying a code and a caller-safe message
//! - ErrorCode enum mapping each category to an HTTP status
//! - IntoResponse implementation producing the `{success, error}` envelope
//!
//! Conversions from the service errors log the full internal error and keep
//! only a generic message for the caller.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use roscoe_core::{LookupError, QueueError, StoreError, MAX_STORABLE_USER_ID};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::ApiResponse;

// ============================================================================
// ERROR CODE ENUM
// ============================================================================

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // ========================================================================
    // Authentication Errors (401)
    // ========================================================================
    /// Missing or unknown auth token
    Unauthorized,

    // ========================================================================
    // Validation Errors (400)
    // ========================================================================
    /// Malformed body or invalid id value
    InvalidInput,

    /// Path segment is not a number
    InvalidFormat,

    /// Batch exceeds the configured limit
    InvalidRange,

    // ========================================================================
    // Conflict Errors (409)
    // ========================================================================
    /// User already carries a flag
    AlreadyFlagged,

    /// User was queued inside the retention window
    RecentlyQueued,

    // ========================================================================
    // Server Errors (500)
    // ========================================================================
    /// Internal server error
    InternalError,

    /// Remote store operation failed
    DatabaseError,
}

impl ErrorCode {
    /// Get the HTTP status code for this error code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,

            ErrorCode::InvalidInput | ErrorCode::InvalidFormat | ErrorCode::InvalidRange => {
                StatusCode::BAD_REQUEST
            }

            ErrorCode::AlreadyFlagged | ErrorCode::RecentlyQueued => StatusCode::CONFLICT,

            ErrorCode::InternalError | ErrorCode::DatabaseError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get a default message for this error code.
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::Unauthorized => "Unauthorized",
            ErrorCode::InvalidInput => "Invalid request body",
            ErrorCode::InvalidFormat => "Invalid ID format",
            ErrorCode::InvalidRange => "Batch size too large",
            ErrorCode::AlreadyFlagged => "User is already flagged or confirmed",
            ErrorCode::RecentlyQueued => "User was queued within the past 7 days",
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Internal server error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ============================================================================
// API ERROR STRUCT
// ============================================================================

/// Structured error for API operations.
///
/// Only `message` reaches the caller, inside the response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ApiError {
    /// Error code categorizing the error
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,
}

impl ApiError {
    /// Create a new API error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Create a new API error with the given code, using the default message.
    pub fn from_code(code: ErrorCode) -> Self {
        Self::new(code, code.default_message())
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        self.code.status_code()
    }

    // ========================================================================
    // Convenience constructors for common errors
    // ========================================================================

    pub fn unauthorized() -> Self {
        Self::from_code(ErrorCode::Unauthorized)
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// Malformed JSON body.
    pub fn invalid_body() -> Self {
        Self::from_code(ErrorCode::InvalidInput)
    }

    /// Zero id in a single-id request.
    pub fn invalid_id() -> Self {
        Self::invalid_input("Invalid ID: must be greater than 0")
    }

    /// Id above the largest value the remote store can hold.
    pub fn id_out_of_range() -> Self {
        Self::invalid_input(format!(
            "Invalid ID: must not exceed {}",
            MAX_STORABLE_USER_ID
        ))
    }

    /// Path segment that does not parse as an id.
    pub fn invalid_id_format(raw: &str) -> Self {
        Self::new(ErrorCode::InvalidFormat, format!("Invalid ID format: {}", raw))
    }

    /// Batch lookup above the configured limit.
    pub fn batch_too_large(max: usize) -> Self {
        Self::new(
            ErrorCode::InvalidRange,
            format!("Batch size too large (max {})", max),
        )
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    pub fn database_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DatabaseError, message)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

// ============================================================================
// AXUM INTEGRATION
// ============================================================================

/// Errors render as the shared envelope: `{"success": false, "error": "..."}`.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(ApiResponse::<()>::failure(self.message));
        (status, body).into_response()
    }
}

// ============================================================================
// CONVERSIONS FROM SERVICE ERRORS
// ============================================================================

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        tracing::error!(error = %err, "Remote store error");
        ApiError::database_error(ErrorCode::DatabaseError.default_message())
    }
}

impl From<LookupError> for ApiError {
    fn from(err: LookupError) -> Self {
        match err {
            LookupError::InvalidId => ApiError::invalid_id(),
            LookupError::Store(inner) => {
                tracing::error!(error = %inner, "Error getting user flags");
                ApiError::internal_error("Internal server error")
            }
        }
    }
}

impl From<QueueError> for ApiError {
    fn from(err: QueueError) -> Self {
        match err {
            QueueError::InvalidUserId => ApiError::invalid_id(),
            QueueError::IdOutOfRange { .. } => ApiError::id_out_of_range(),
            QueueError::AlreadyFlagged { .. } => ApiError::from_code(ErrorCode::AlreadyFlagged),
            QueueError::RecentlyQueued { .. } => ApiError::from_code(ErrorCode::RecentlyQueued),
            other => {
                tracing::error!(error = %other, "Error queueing user");
                ApiError::internal_error("Failed to queue user")
            }
        }
    }
}

// ============================================================================
// RESULT TYPE ALIAS
// ============================================================================

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_status_mapping() {
        assert_eq!(ErrorCode::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ErrorCode::InvalidInput.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::InvalidRange.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::AlreadyFlagged.status_code(), StatusCode::CONFLICT);
        assert_eq!(ErrorCode::RecentlyQueued.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            ErrorCode::InternalError.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_api_error_constructors() {
        let err = ApiError::batch_too_large(100);
        assert_eq!(err.message, "Batch size too large (max 100)");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let err = ApiError::invalid_id_format("abc");
        assert_eq!(err.message, "Invalid ID format: abc");

        assert_eq!(ApiError::unauthorized().message, "Unauthorized");
        assert_eq!(ApiError::invalid_body().message, "Invalid request body");
    }

    #[test]
    fn test_queue_errors_map_to_caller_messages() {
        let err = ApiError::from(QueueError::AlreadyFlagged { user_id: 1 });
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(err.message, "User is already flagged or confirmed");

        let err = ApiError::from(QueueError::RecentlyQueued { user_id: 1 });
        assert_eq!(err.message, "User was queued within the past 7 days");

        let err = ApiError::from(QueueError::InvalidUserId);
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let err = ApiError::from(QueueError::IdOutOfRange { user_id: u64::MAX });
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "Invalid ID: must not exceed 9223372036854775807");
    }

    #[test]
    fn test_internal_details_not_leaked() {
        let err = ApiError::from(QueueError::Store(StoreError::Transport {
            reason: "dial tcp 10.0.0.1: refused".to_string(),
        }));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, "Failed to queue user");

        let err = ApiError::from(LookupError::Store(StoreError::LockPoisoned));
        assert_eq!(err.message, "Internal server error");
    }

    #[test]
    fn test_error_serialization() -> Result<(), serde_json::Error> {
        let err = ApiError::unauthorized();
        let json = serde_json::to_string(&err)?;
        assert!(json.contains("UNAUTHORIZED"));

        let deserialized: ApiError = serde_json::from_str(&json)?;
        assert_eq!(deserialized, err);
        Ok(())
    }

    #[test]
    fn test_error_display() {
        let err = ApiError::database_error("Connection failed");
        let display = format!("{}", err);
        assert!(display.contains("DatabaseError"));
        assert!(display.contains("Connection failed"));
    }
}
