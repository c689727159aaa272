//! Stats Reporting Task
//!
//! Background task that periodically logs cache statistics.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::SharedCache;

/// Spawns a background task that periodically logs a cache snapshot.
///
/// Reading statistics mutates nothing, so the task only ever takes the
/// shared half of the cache lock and cannot delay in-flight relays any
/// more than another reader would.
///
/// # Arguments
/// * `cache` - Shared cache handle
/// * `interval_secs` - Seconds between snapshots
///
/// # Returns
/// A JoinHandle used to abort the task during graceful shutdown.
pub fn spawn_stats_task(cache: SharedCache, interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(interval_secs);

    tokio::spawn(async move {
        info!(
            "Starting stats reporting task with interval of {} seconds",
            interval_secs
        );

        loop {
            tokio::time::sleep(interval).await;

            let stats = {
                let cache = cache.read().await;
                cache.stats()
            };

            if stats.hits + stats.misses > 0 {
                info!(
                    hits = stats.hits,
                    misses = stats.misses,
                    evictions = stats.evictions,
                    insertions = stats.insertions,
                    entries = stats.total_entries,
                    bytes = stats.total_bytes,
                    hit_rate = stats.hit_rate(),
                    "cache statistics"
                );
            } else {
                debug!("cache statistics: no traffic yet");
            }
        }
    })
}
