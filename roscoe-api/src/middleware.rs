//! Axum Middleware for Authentication
//!
//! The functional routes require an `X-Auth-Token` header whose value is a
//! key registered in the API key table. The layer is only installed when
//! `ApiConfig::require_auth` is set.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::ApiError;
use crate::services::ApiKeyService;

/// Header carrying the caller's API key.
pub const AUTH_TOKEN_HEADER: &str = "x-auth-token";

// ============================================================================
// MIDDLEWARE STATE
// ============================================================================

/// State for the authentication middleware.
#[derive(Clone)]
pub struct AuthMiddlewareState {
    pub keys: ApiKeyService,
}

impl AuthMiddlewareState {
    pub fn new(keys: ApiKeyService) -> Self {
        Self { keys }
    }
}

// ============================================================================
// AUTHENTICATION MIDDLEWARE
// ============================================================================

/// Reject requests without a registered `X-Auth-Token`.
///
/// Missing and unknown tokens are indistinguishable to the caller (401).
/// A registry failure is a 500 and is logged.
pub async fn auth_middleware(
    State(state): State<AuthMiddlewareState>,
    request: Request,
    next: Next,
) -> Result<Response, AuthMiddlewareError> {
    let token = request
        .headers()
        .get(AUTH_TOKEN_HEADER)
        .and_then(|h| h.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let valid = state.keys.validate(&token).await.map_err(|e| {
        tracing::error!(error = %e, "Error validating API key");
        AuthMiddlewareError(ApiError::internal_error("Internal server error"))
    })?;

    if !valid {
        tracing::debug!(path = %request.uri().path(), "Rejected request with invalid token");
        return Err(AuthMiddlewareError(ApiError::unauthorized()));
    }

    Ok(next.run(request).await)
}

// ============================================================================
// ERROR HANDLING
// ============================================================================

/// Error wrapper for middleware that implements IntoResponse.
#[derive(Debug)]
pub struct AuthMiddlewareError(pub ApiError);

impl IntoResponse for AuthMiddlewareError {
    fn into_response(self) -> Response {
        self.0.into_response()
    }
}
