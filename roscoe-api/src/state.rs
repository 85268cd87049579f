//! Shared application state for Axum routers.

use roscoe_core::QueueConfig;
use roscoe_storage::RemoteExecutor;
use std::sync::Arc;
use std::time::Instant;

use crate::config::ApiConfig;
use crate::services::{ApiKeyService, FlagService, QueueService};

/// Services and settings shared by every router.
///
/// All services hold the same executor, so a single remote store backs the
/// whole server.
#[derive(Clone)]
pub struct AppState {
    pub executor: Arc<dyn RemoteExecutor>,
    pub flags: FlagService,
    pub queue: QueueService,
    pub keys: ApiKeyService,
    pub config: ApiConfig,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(executor: Arc<dyn RemoteExecutor>, config: ApiConfig, queue: QueueConfig) -> Self {
        let flags = FlagService::new(Arc::clone(&executor));
        let queue = QueueService::new(Arc::clone(&executor), flags.clone(), queue);
        let keys = ApiKeyService::new(Arc::clone(&executor));

        Self {
            executor,
            flags,
            queue,
            keys,
            config,
            start_time: Instant::now(),
        }
    }
}
