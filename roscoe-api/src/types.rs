//! Request and response types for the HTTP API.
//!
//! Field names are part of the public contract (`flagType` is camelCase).

use roscoe_core::{parse_reasons, FlagView, Reasons, UserId};
use serde::{Deserialize, Serialize};

// ============================================================================
// ENVELOPE
// ============================================================================

/// Envelope wrapping every response of the functional routes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

// ============================================================================
// LOOKUP
// ============================================================================

/// Body of `POST /lookup`.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct LookupRequest {
    pub ids: Vec<UserId>,
}

/// Flag state of one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserFlagResponse {
    pub id: UserId,
    /// 0 none, 1 flagged, 2 confirmed, 3 resolved positive in the queue.
    pub flag_type: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    /// Reasons keyed by category, each shaped like `Reason`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub reasons: Option<Reasons>,
}

impl UserFlagResponse {
    /// Build the response for `id`. Unparsable reasons are logged and dropped.
    pub fn from_view(id: UserId, view: &FlagView) -> Self {
        let reasons = view.reasons().and_then(|text| match parse_reasons(text) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(user_id = id, error = %e, "Failed to parse reasons");
                None
            }
        });

        Self {
            id,
            flag_type: view.flag_code(),
            confidence: view.confidence(),
            reasons,
        }
    }
}

// ============================================================================
// QUEUE
// ============================================================================

/// Body of `POST /queue`.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct QueueRequest {
    pub id: UserId,
}

/// Data of a successful `POST /queue`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct QueuedResponse {
    pub queued: UserId,
}
