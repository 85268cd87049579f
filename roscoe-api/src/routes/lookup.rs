//! Flag Lookup Routes
//!
//! - `POST /lookup` resolves a batch of user ids
//! - `GET /lookup/:id` resolves a single user id

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::{get, post},
    Json, Router,
};
use roscoe_core::{FlagView, LookupConfig, UserId};
use std::sync::Arc;

use crate::{
    error::{ApiError, ApiResult},
    services::FlagService,
    types::{ApiResponse, LookupRequest, UserFlagResponse},
};

// ============================================================================
// SHARED STATE
// ============================================================================

/// Shared state for lookup routes.
#[derive(Clone)]
pub struct LookupState {
    pub flags: FlagService,
    pub config: LookupConfig,
}

impl LookupState {
    pub fn new(flags: FlagService, config: LookupConfig) -> Self {
        Self { flags, config }
    }
}

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// POST /lookup - Resolve flags for a batch of users
///
/// Results come back in request order, one entry per requested id.
#[utoipa::path(
    post,
    path = "/lookup",
    tag = "Lookup",
    request_body = LookupRequest,
    responses(
        (status = 200, description = "Flags resolved", body = ApiResponse<Vec<UserFlagResponse>>),
        (
            status = 400,
            description = "Malformed body, zero id or batch too large",
            body = ApiResponse<String>
        ),
        (status = 401, description = "Unauthorized", body = ApiResponse<String>),
        (status = 500, description = "Remote store failure", body = ApiResponse<String>),
    ),
    security(("auth_token" = []))
)]
pub async fn batch_lookup(
    State(state): State<Arc<LookupState>>,
    payload: Result<Json<LookupRequest>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<Vec<UserFlagResponse>>>> {
    let Json(req) = payload.map_err(|rejection| {
        tracing::debug!(error = %rejection, "Rejected lookup body");
        ApiError::invalid_body()
    })?;

    if req.ids.len() > state.config.batch_limit {
        return Err(ApiError::batch_too_large(state.config.batch_limit));
    }
    if req.ids.contains(&0) {
        return Err(ApiError::invalid_input(
            "Invalid ID in batch: must be greater than 0",
        ));
    }

    let views = state.flags.resolve(&req.ids).await?;

    let data = req
        .ids
        .iter()
        .map(|id| UserFlagResponse::from_view(*id, views.get(id).unwrap_or(&FlagView::None)))
        .collect();

    Ok(Json(ApiResponse::ok(data)))
}

/// GET /lookup/{id} - Resolve flags for one user
#[utoipa::path(
    get,
    path = "/lookup/{id}",
    tag = "Lookup",
    params(
        ("id" = u64, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "Flag resolved", body = ApiResponse<UserFlagResponse>),
        (status = 400, description = "Invalid or zero id", body = ApiResponse<String>),
        (status = 401, description = "Unauthorized", body = ApiResponse<String>),
        (status = 500, description = "Remote store failure", body = ApiResponse<String>),
    ),
    security(("auth_token" = []))
)]
pub async fn get_lookup(
    State(state): State<Arc<LookupState>>,
    Path(raw): Path<String>,
) -> ApiResult<Json<ApiResponse<UserFlagResponse>>> {
    let id = parse_user_id(&raw)?;
    let view = state.flags.resolve_one(id).await?;
    Ok(Json(ApiResponse::ok(UserFlagResponse::from_view(id, &view))))
}

fn parse_user_id(raw: &str) -> ApiResult<UserId> {
    let id: UserId = raw
        .parse()
        .map_err(|_| ApiError::invalid_id_format(raw))?;
    if id == 0 {
        return Err(ApiError::invalid_id());
    }
    Ok(id)
}

// ============================================================================
// ROUTER
// ============================================================================

pub fn create_router(flags: FlagService, config: LookupConfig) -> Router {
    let state = Arc::new(LookupState::new(flags, config));

    Router::new()
        .route("/lookup", post(batch_lookup))
        .route("/lookup/:id", get(get_lookup))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_user_id() -> Result<(), ApiError> {
        assert_eq!(parse_user_id("42")?, 42);
        assert_eq!(
            parse_user_id("abc").map_err(|e| e.message),
            Err("Invalid ID format: abc".to_string())
        );
        assert_eq!(
            parse_user_id("-1").map_err(|e| e.message),
            Err("Invalid ID format: -1".to_string())
        );
        assert_eq!(
            parse_user_id("0").map_err(|e| e.message),
            Err("Invalid ID: must be greater than 0".to_string())
        );
        Ok(())
    }
}
