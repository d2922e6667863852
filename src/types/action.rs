//! Deferred write-like actions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A write-like operation persisted locally for later delivery.
///
/// Keyed by `tag`; at most one pending action per tag — a later enqueue
/// under the same tag overwrites the stored payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeferredAction {
    pub tag: String,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl DeferredAction {
    pub fn new(tag: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            tag: tag.into(),
            payload,
            created_at: Utc::now(),
        }
    }
}
