//! Queue Admission Route
//!
//! `POST /queue` admits a user into the review queue.

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use std::sync::Arc;

use crate::{
    error::{ApiError, ApiResult},
    services::QueueService,
    types::{ApiResponse, QueueRequest, QueuedResponse},
};

/// Shared state for the queue route.
#[derive(Clone)]
pub struct QueueState {
    pub queue: QueueService,
}

impl QueueState {
    pub fn new(queue: QueueService) -> Self {
        Self { queue }
    }
}

/// POST /queue - Queue a user for review
#[utoipa::path(
    post,
    path = "/queue",
    tag = "Queue",
    request_body = QueueRequest,
    responses(
        (status = 200, description = "User queued", body = ApiResponse<QueuedResponse>),
        (
            status = 400,
            description = "Malformed body, zero id or id beyond storable range",
            body = ApiResponse<String>
        ),
        (status = 401, description = "Unauthorized", body = ApiResponse<String>),
        (
            status = 409,
            description = "Already flagged or recently queued",
            body = ApiResponse<String>
        ),
        (status = 500, description = "Failed to queue user", body = ApiResponse<String>),
    ),
    security(("auth_token" = []))
)]
pub async fn queue_user(
    State(state): State<Arc<QueueState>>,
    payload: Result<Json<QueueRequest>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<QueuedResponse>>> {
    let Json(req) = payload.map_err(|rejection| {
        tracing::debug!(error = %rejection, "Rejected queue body");
        ApiError::invalid_body()
    })?;

    let admission = state.queue.admit(req.id).await?;
    tracing::debug!(user_id = req.id, outcome = admission.as_str(), "User queued");

    Ok(Json(ApiResponse::ok(QueuedResponse { queued: req.id })))
}

pub fn create_router(queue: QueueService) -> Router {
    let state = Arc::new(QueueState::new(queue));

    Router::new()
        .route("/queue", post(queue_user))
        .with_state(state)
}
