//! REST API Routes Module
//!
//! - Flag lookups and queue admission (auth required unless disabled)
//! - Health check endpoints
//! - Prometheus metrics and the OpenAPI document

pub mod health;
pub mod lookup;
pub mod queue;

use axum::{
    middleware::{from_fn, from_fn_with_state},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::middleware::{auth_middleware, AuthMiddlewareState};
use crate::openapi::ApiDoc;
use crate::state::AppState;
use crate::telemetry::{metrics_handler, observability_middleware};

pub use health::create_router as health_router;
pub use lookup::create_router as lookup_router;
pub use queue::create_router as queue_router;

/// Handler for /openapi.json endpoint.
async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

/// Create the complete API router.
///
/// # Middleware Order (outer to inner)
/// 1. Observability - metrics and request logging
/// 2. Trace - tower-http request spans
/// 3. Auth (only on the functional routes, when enabled)
pub fn create_api_router(state: &AppState) -> Router {
    let mut functional = Router::new()
        .merge(lookup::create_router(
            state.flags.clone(),
            state.config.lookup,
        ))
        .merge(queue::create_router(state.queue.clone()));

    if state.config.require_auth {
        let auth_state = AuthMiddlewareState::new(state.keys.clone());
        functional = functional.layer(from_fn_with_state(auth_state, auth_middleware));
    } else {
        tracing::warn!("Authentication disabled, functional routes are open");
    }

    Router::new()
        .merge(functional)
        .nest(
            "/health",
            health::create_router(state.executor.clone(), state.start_time),
        )
        .route("/metrics", get(metrics_handler))
        .route("/openapi.json", get(openapi_json))
        .layer(TraceLayer::new_for_http())
        .layer(from_fn(observability_middleware))
}
