//! Periodic re-synchronization of public lists

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use super::registry::ListRegistry;

/// Handle to a running refresh task
///
/// Dropping the handle leaves the task running until the runtime stops;
/// call [`RefreshHandle::stop`] to end it deterministically.
#[derive(Debug)]
pub struct RefreshHandle {
    shutdown_tx: broadcast::Sender<()>,
    handle: JoinHandle<()>,
}

impl RefreshHandle {
    /// Signal the task and wait for it to exit
    pub async fn stop(self) {
        if self.shutdown_tx.send(()).is_err() {
            debug!("refresh task already gone");
        }
        if let Err(e) = self.handle.await {
            error!("refresh task ended abnormally: {}", e);
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl ListRegistry {
    /// Re-fetch every public list each `interval` until stopped
    ///
    /// The first refresh happens one full interval after spawning; lists are
    /// fetched at registration already. Must be called inside a tokio runtime.
    pub fn spawn_refresh(self: &Arc<Self>, interval: Duration) -> RefreshHandle {
        let (shutdown_tx, mut shutdown_rx) = broadcast::channel(1);
        let registry = Arc::clone(self);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;
            info!(interval = ?interval, "public list refresh started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        for (namespace, result) in registry.refresh_all_public().await {
                            if let Err(e) = result {
                                warn!(namespace, error = %e, "scheduled refresh failed");
                            }
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        info!("public list refresh stopped");
                        break;
                    }
                }
            }
        });

        RefreshHandle { shutdown_tx, handle }
    }
}
