//! Fafnir error types

use std::time::Duration;

/// Fafnir error types
#[derive(Debug, thiserror::Error)]
pub enum FafnirError {
    // Storage errors
    #[error("storage fault: {0}")]
    Storage(String),

    // Network errors
    #[error("network failure: {0}")]
    Network(String),

    #[error("network timeout after {after:?}")]
    Timeout { after: Duration },

    /// Non-success or cross-origin response. Never cached, and treated the
    /// same as a network failure when deciding strategy fallbacks.
    #[error("invalid response for {url}: {reason}")]
    InvalidResponse { url: String, reason: String },

    /// Both network and cache were exhausted for a request.
    #[error("no source available for {0}")]
    NoSource(String),

    // Lifecycle errors
    #[error("install failed: {0}")]
    InstallFailed(String),

    // Deferred sync errors
    #[error("sync delivery failed for tag '{tag}': {reason}")]
    SyncDelivery { tag: String, reason: String },

    #[error("no pending action for tag '{0}'")]
    NoPendingAction(String),

    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),

    // Data errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl FafnirError {
    /// Whether this error counts as a network failure for strategy fallback
    /// purposes.
    ///
    /// Timeouts and aborted fetches are indistinguishable from the transport
    /// going away, and invalid (non-success / cross-origin) responses are
    /// specified to fall back the same way.
    pub fn is_network_failure(&self) -> bool {
        matches!(
            self,
            FafnirError::Network(_)
                | FafnirError::Timeout { .. }
                | FafnirError::InvalidResponse { .. }
        )
    }

    /// Whether this error originated in the persistent store.
    pub fn is_storage_fault(&self) -> bool {
        matches!(self, FafnirError::Storage(_))
    }
}

impl From<reqwest::Error> for FafnirError {
    fn from(err: reqwest::Error) -> Self {
        FafnirError::Network(err.to_string())
    }
}

impl From<tokio_rusqlite::Error> for FafnirError {
    fn from(err: tokio_rusqlite::Error) -> Self {
        FafnirError::Storage(err.to_string())
    }
}

impl From<tokio_rusqlite::rusqlite::Error> for FafnirError {
    fn from(err: tokio_rusqlite::rusqlite::Error) -> Self {
        FafnirError::Storage(err.to_string())
    }
}

/// Result type alias for Fafnir operations
pub type Result<T> = std::result::Result<T, FafnirError>;
