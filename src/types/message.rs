//! Control and notification message shapes.
//!
//! The control channel accepts typed commands from the hosting application;
//! the notification channel broadcasts gateway events to every connected
//! session. Both serialise to the tagged-JSON wire shape
//! (`{"type": "GET_VERSION"}` etc.).

use serde::{Deserialize, Serialize};

/// Inbound control commands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlMessage {
    /// Ask the gateway for its version string.
    GetVersion,
    /// Force immediate activation, skipping the waiting state.
    SkipWaiting,
    /// Enqueue a deferred action for later delivery.
    BackgroundSync {
        tag: String,
        payload: serde_json::Value,
    },
    /// Purge the primary (precache) cache.
    ClearCache,
}

/// Reply to a control command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlReply {
    Version { version: String },
    Done,
    Failed { reason: String },
}

/// Outbound notifications broadcast to all connected sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Notice {
    /// A new gateway generation activated.
    SwUpdated { version: String },
}
