//! Cache Sweep Task
//!
//! Background task that periodically drops expired cache entries, so entries
//! nobody reads again do not linger until their next lookup.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::cache::CacheStore;

/// Spawns the sweep loop. It runs every `cleanup_interval_secs` seconds until
/// `shutdown` is cancelled.
pub fn spawn_cleanup_task(
    cache: Arc<RwLock<CacheStore>>,
    cleanup_interval_secs: u64,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    let interval = Duration::from_secs(cleanup_interval_secs.max(1));

    tokio::spawn(async move {
        info!(interval_secs = interval.as_secs(), "Starting cache sweep task");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }

            let removed = cache.write().await.cleanup_expired();
            if removed > 0 {
                info!(removed, "Cache sweep removed expired entries");
            } else {
                debug!("Cache sweep found no expired entries");
            }
        }

        info!("Cache sweep task stopped");
    })
}
