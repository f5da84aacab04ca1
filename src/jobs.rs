use crate::services::store::UrlStore;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

/// Background task that reclaims storage held by expired links.
///
/// Correctness does not depend on it: every read applies the liveness
/// cutoff, so a record the sweeper has not reached yet is already invisible.
pub struct Sweeper {
    store: UrlStore,
    interval: Duration,
}

impl Sweeper {
    /// Create a new sweeper
    pub fn new(store: UrlStore, interval_seconds: u64) -> Self {
        Self {
            store,
            interval: Duration::from_secs(interval_seconds),
        }
    }

    /// Run the sweeper until the shutdown signal fires
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!("Expiry sweeper started");

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => self.sweep_once().await,
                _ = shutdown.changed() => break,
            }
        }

        info!("Expiry sweeper stopped");
    }

    /// Perform a single sweep pass
    async fn sweep_once(&self) {
        match self.store.purge_expired().await {
            Ok(0) => {}
            Ok(purged) => info!(purged, "removed expired links"),
            Err(e) => error!("expiry sweep failed: {}", e),
        }
    }
}
