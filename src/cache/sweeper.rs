//! Periodic removal of expired cache entries.

use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time;

use crate::cache::ResponseCache;
use crate::resilience::timeouts::millis;

/// `tokio::time::interval` panics on a zero period.
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Background task that sweeps a [`ResponseCache`] on a fixed interval.
pub struct CacheSweeper {
    cache: ResponseCache,
    interval: Duration,
}

impl CacheSweeper {
    pub fn new(cache: ResponseCache, interval: Duration) -> Self {
        Self {
            cache,
            interval: interval.max(MIN_INTERVAL),
        }
    }

    /// Sweep until a shutdown signal arrives.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            interval_ms = millis(self.interval),
            "Cache sweeper starting"
        );

        let mut ticker = time::interval(self.interval);
        // The first tick completes immediately; there is nothing to sweep yet.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = self.cache.sweep();
                    if removed > 0 {
                        tracing::debug!(removed, remaining = self.cache.len(), "Swept expired cache entries");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Cache sweeper received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}
