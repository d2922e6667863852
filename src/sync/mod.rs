//! Deferred action queue.
//!
//! Write-like operations that cannot be confirmed online (a share, a
//! feedback POST) are persisted here, keyed by tag, and replayed when a
//! connectivity-restoration trigger fires. One pending record per tag —
//! a later enqueue overwrites the stored payload. Delivery is best-effort:
//! there is no backoff and no attempt ceiling, so a record survives until
//! some replay confirms success.

mod dispatch;

pub use dispatch::{HttpSyncDispatcher, SyncDispatcher};

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::FafnirError;
use crate::store::ActionStore;
use crate::telemetry;
use crate::types::DeferredAction;
use crate::Result;

/// Durable store + replay engine for deferred actions.
pub struct DeferredActionQueue {
    store: Arc<dyn ActionStore>,
    dispatcher: Arc<dyn SyncDispatcher>,
    connectivity: Option<watch::Receiver<bool>>,
}

impl DeferredActionQueue {
    pub fn new(store: Arc<dyn ActionStore>, dispatcher: Arc<dyn SyncDispatcher>) -> Self {
        Self {
            store,
            dispatcher,
            connectivity: None,
        }
    }

    /// Wire up a connectivity signal (`true` = online). With one
    /// configured, each enqueue registers a replay for the next online
    /// transition instead of firing immediately.
    pub fn with_connectivity(mut self, connectivity: watch::Receiver<bool>) -> Self {
        self.connectivity = Some(connectivity);
        self
    }

    /// Persist an action for later delivery.
    ///
    /// Registers the replay with the connectivity trigger when one is
    /// available; otherwise spawns an immediate best-effort attempt. In
    /// both cases the record is durable before this returns, and failure
    /// of the attempt itself is never reported to the caller.
    pub async fn enqueue(&self, tag: impl Into<String>, payload: serde_json::Value) -> Result<()> {
        let action = DeferredAction::new(tag, payload);
        let tag = action.tag.clone();
        self.store.put_action(action).await?;
        debug!(%tag, "deferred action enqueued");

        let store = Arc::clone(&self.store);
        let dispatcher = Arc::clone(&self.dispatcher);
        match self.connectivity.clone() {
            Some(mut connectivity) => {
                tokio::spawn(async move {
                    while !*connectivity.borrow() {
                        if connectivity.changed().await.is_err() {
                            return; // signal source dropped, a later replay_all picks it up
                        }
                    }
                    if let Err(e) = replay_record(store.as_ref(), dispatcher.as_ref(), &tag).await
                    {
                        if !matches!(e, FafnirError::NoPendingAction(_)) {
                            warn!(%tag, error = %e, "triggered replay failed, record retained");
                        }
                    }
                });
            }
            None => {
                tokio::spawn(async move {
                    if let Err(e) = replay_record(store.as_ref(), dispatcher.as_ref(), &tag).await
                    {
                        debug!(%tag, error = %e, "immediate replay attempt failed, record retained");
                    }
                });
            }
        }
        Ok(())
    }

    /// Replay one pending action. Deletes the record only on confirmed
    /// delivery; on failure the record stays for a later trigger.
    pub async fn replay(&self, tag: &str) -> Result<()> {
        replay_record(self.store.as_ref(), self.dispatcher.as_ref(), tag).await
    }

    /// Replay every pending action. One failed delivery does not stop the
    /// rest; returns the number delivered.
    pub async fn replay_all(&self) -> Result<usize> {
        let mut delivered = 0;
        for action in self.store.list_actions().await? {
            match replay_record(self.store.as_ref(), self.dispatcher.as_ref(), &action.tag).await
            {
                Ok(()) => delivered += 1,
                Err(FafnirError::NoPendingAction(_)) => {}
                Err(e) => warn!(tag = %action.tag, error = %e, "replay failed, record retained"),
            }
        }
        Ok(delivered)
    }

    /// All pending actions, oldest first.
    pub async fn pending(&self) -> Result<Vec<DeferredAction>> {
        self.store.list_actions().await
    }

    /// Spawn the standing loop that replays every pending record on each
    /// offline→online transition of the connectivity signal. Returns
    /// `None` when no signal is configured.
    ///
    /// Per-enqueue registrations die with the process; this loop is what
    /// picks up records persisted by a previous run.
    pub fn spawn_replay_on_reconnect(&self) -> Option<tokio::task::JoinHandle<()>> {
        let mut connectivity = self.connectivity.clone()?;
        let store = Arc::clone(&self.store);
        let dispatcher = Arc::clone(&self.dispatcher);
        Some(tokio::spawn(async move {
            let mut was_online = *connectivity.borrow();
            loop {
                if connectivity.changed().await.is_err() {
                    return;
                }
                let online = *connectivity.borrow();
                if online && !was_online {
                    match store.list_actions().await {
                        Ok(actions) => {
                            for action in actions {
                                let replayed = replay_record(
                                    store.as_ref(),
                                    dispatcher.as_ref(),
                                    &action.tag,
                                )
                                .await;
                                match replayed {
                                    Ok(()) | Err(FafnirError::NoPendingAction(_)) => {}
                                    Err(e) => {
                                        warn!(tag = %action.tag, error = %e,
                                            "replay failed, record retained");
                                    }
                                }
                            }
                        }
                        Err(e) => warn!(error = %e, "listing pending actions failed"),
                    }
                }
                was_online = online;
            }
        }))
    }
}

async fn replay_record(
    store: &dyn ActionStore,
    dispatcher: &dyn SyncDispatcher,
    tag: &str,
) -> Result<()> {
    let Some(action) = store.get_action(tag).await? else {
        return Err(FafnirError::NoPendingAction(tag.to_owned()));
    };
    match dispatcher.deliver(&action).await {
        Ok(()) => {
            store.delete_action(tag).await?;
            metrics::counter!(telemetry::SYNC_REPLAYS_TOTAL,
                "tag" => tag.to_owned(), "status" => "ok")
            .increment(1);
            debug!(tag, "deferred action delivered");
            Ok(())
        }
        Err(e) => {
            metrics::counter!(telemetry::SYNC_REPLAYS_TOTAL,
                "tag" => tag.to_owned(), "status" => "error")
            .increment(1);
            Err(e)
        }
    }
}
