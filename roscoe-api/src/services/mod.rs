//! Service Layer
//!
//! Business logic over the remote store. Routes and the CLI are thin
//! adapters around these services.

mod api_key_service;
mod flag_service;
mod queue_service;
mod sync_service;

pub use api_key_service::*;
pub use flag_service::*;
pub use queue_service::*;
pub use sync_service::*;
