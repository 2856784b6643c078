//! Background status poller
//!
//! One polling task runs while at least one transfer is non-terminal and
//! exits once the in-flight set drains. Its lifecycle is derived purely from
//! record state: executing a transfer (or booting with records in flight)
//! ensures it is running; nothing toggles it by hand.

use crate::bridge::BridgeApi;
use crate::storage::Storage;
use crate::tracker::{Tracker, TrackerConfig};
use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info};

/// Handle for starting the polling task when records are in flight
#[derive(Clone)]
pub struct PollerHandle {
    running: Arc<AtomicBool>,
    redis_url: String,
    bridge: Arc<dyn BridgeApi>,
    interval_secs: u64,
}

impl PollerHandle {
    pub fn new(redis_url: String, bridge: Arc<dyn BridgeApi>, interval_secs: u64) -> Self {
        Self {
            running: Arc::new(AtomicBool::new(false)),
            redis_url,
            bridge,
            interval_secs,
        }
    }

    /// Spawn the polling task unless one is already running
    pub fn ensure_running(&self) {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }

        let handle = self.clone();
        tokio::spawn(async move {
            if let Err(e) = handle.run().await {
                error!("Transfer poller error: {:#}", e);
            }
            handle.running.store(false, Ordering::SeqCst);
        });
    }

    /// Poll until every transfer settles
    async fn run(&self) -> Result<()> {
        info!(
            "Transfer poller started (polling every {} seconds)",
            self.interval_secs
        );

        let storage = Storage::new(&self.redis_url).await?;
        let mut tracker = Tracker::new(storage, self.bridge.clone(), TrackerConfig::default());

        loop {
            let remaining = match tracker.poll_cycle().await {
                Ok(remaining) => remaining,
                Err(e) => {
                    // keep the loop alive; records keep their last status
                    error!("Error polling transfers: {:#}", e);
                    1
                }
            };

            if remaining == 0 {
                info!("All transfers settled, poller stopping");
                return Ok(());
            }

            sleep(Duration::from_secs(self.interval_secs)).await;
        }
    }
}
