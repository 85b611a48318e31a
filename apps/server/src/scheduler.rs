//! Background maintenance of the cache and training progress channels.

use std::sync::Arc;
use tokio::time::{interval, Duration};
use tracing::{debug, info};

use coinlens_market_data::CacheStore;

use crate::main_lib::AppState;

/// How often expired entries are swept.
const EVICTION_INTERVAL_SECS: u64 = 5 * 60;

/// How long past its TTL an entry is kept as a stale fallback.
const STALE_GRACE_SECS: u64 = 60 * 60;

/// Starts the periodic sweep of long-expired cache entries and idle
/// progress channels.
pub fn start_housekeeping(state: Arc<AppState>) {
    tokio::spawn(async move {
        info!("Housekeeping scheduler started");
        let mut ticker = interval(Duration::from_secs(EVICTION_INTERVAL_SECS));
        // first tick is immediate
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let evicted = state
                .gateway
                .evict_expired(Duration::from_secs(STALE_GRACE_SECS));
            debug!(
                "Evicted {} expired cache entries, {} remain",
                evicted,
                state.gateway.cache().len()
            );

            let released = state.progress().sweep_idle();
            debug!(
                "Released {} idle progress channels, {} remain",
                released,
                state.progress().len()
            );
        }
    });
}
