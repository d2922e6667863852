//! Delivery of deferred actions to their remote endpoints.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::error::FafnirError;
use crate::types::DeferredAction;
use crate::Result;

/// Tag-specific remote submission of a deferred action.
///
/// A delivery either confirms success (`Ok`) or fails, in which case the
/// queue keeps the record for a later trigger.
#[async_trait]
pub trait SyncDispatcher: Send + Sync {
    async fn deliver(&self, action: &DeferredAction) -> Result<()>;
}

/// Dispatcher that POSTs the action payload as JSON to a per-tag endpoint.
#[derive(Clone)]
pub struct HttpSyncDispatcher {
    client: reqwest::Client,
    endpoints: HashMap<String, Url>,
    timeout: Duration,
}

impl HttpSyncDispatcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoints: HashMap::new(),
            timeout: Duration::from_secs(10),
        }
    }

    /// Register the endpoint for a tag (e.g. `"share"` → the share API).
    pub fn endpoint(mut self, tag: impl Into<String>, url: Url) -> Self {
        self.endpoints.insert(tag.into(), url);
        self
    }

    /// Bound each delivery attempt.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for HttpSyncDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SyncDispatcher for HttpSyncDispatcher {
    async fn deliver(&self, action: &DeferredAction) -> Result<()> {
        let url = self
            .endpoints
            .get(&action.tag)
            .ok_or_else(|| FafnirError::SyncDelivery {
                tag: action.tag.clone(),
                reason: "no endpoint registered for tag".into(),
            })?;

        let send = self
            .client
            .post(url.clone())
            .json(&action.payload)
            .send();
        let response = tokio::time::timeout(self.timeout, send)
            .await
            .map_err(|_| FafnirError::SyncDelivery {
                tag: action.tag.clone(),
                reason: format!("timed out after {:?}", self.timeout),
            })?
            .map_err(|e| FafnirError::SyncDelivery {
                tag: action.tag.clone(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(FafnirError::SyncDelivery {
                tag: action.tag.clone(),
                reason: format!("endpoint replied {}", response.status()),
            });
        }
        Ok(())
    }
}
