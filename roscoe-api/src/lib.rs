//! Roscoe API - Sync Pipeline, Queue Admission and HTTP Layer
//!
//! This crate holds the services that move flags from the primary store
//! into the remote store and answer questions about them:
//!
//! - [`services::SyncService`] replicates the flag dataset with a bounded
//!   worker pool and swaps the new generation in atomically
//! - [`services::QueueService`] admits users into the review queue
//! - [`services::FlagService`] resolves flag state for batches of users
//! - [`services::ApiKeyService`] manages the tokens that may call the API
//!
//! The Axum router in [`routes`] exposes lookups and admission over HTTP.

pub mod config;
pub mod error;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod services;
pub mod state;
pub mod telemetry;
pub mod types;

pub use config::{ApiConfig, StoreTarget};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use middleware::{auth_middleware, AuthMiddlewareState, AUTH_TOKEN_HEADER};
pub use openapi::ApiDoc;
pub use routes::create_api_router;
pub use services::{
    generate_key, Admission, ApiKeyService, FlagService, QueueService, SyncProgress, SyncReport,
    SyncService,
};
pub use state::AppState;
pub use types::*;
